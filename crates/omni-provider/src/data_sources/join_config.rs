//! `omni_default_machine_join_config` data source

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::DataSource;
use crate::diagnostics::{Diagnostics, WithSummary};
use crate::state::Management;

pub const JOIN_CONFIG_DATA_SOURCE: &str = "omni_default_machine_join_config";
pub const DEFAULT_JOIN_CONFIG_ID: &str = "default";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinConfigModel {
    pub id: String,
    pub kernel_args: Vec<String>,
    pub config: String,
}

pub struct JoinConfigDataSource<M: ?Sized> {
    management: Arc<M>,
}

impl<M: Management + ?Sized> JoinConfigDataSource<M> {
    pub fn new(management: Arc<M>) -> Self {
        Self { management }
    }
}

#[async_trait]
impl<M: Management + ?Sized> DataSource for JoinConfigDataSource<M> {
    type Config = ();
    type Model = JoinConfigModel;

    fn type_name(&self) -> &'static str {
        JOIN_CONFIG_DATA_SOURCE
    }

    async fn read(&self, _config: ()) -> Result<JoinConfigModel, Diagnostics> {
        let join_config = self
            .management
            .machine_join_config()
            .await
            .summary("Error retrieving machine join config")?;
        tracing::debug!(kernel_args = ?join_config.kernel_args, "machine join config");

        Ok(JoinConfigModel {
            id: DEFAULT_JOIN_CONFIG_ID.to_string(),
            kernel_args: join_config.kernel_args,
            config: join_config.config,
        })
    }
}
