//! `omni_cluster_kubeconfig` resource
//!
//! Issues a service account kubeconfig for a cluster and exposes its
//! clusters, contexts and users.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use omni_core::{KubeConfig, NamedCluster, NamedContext, NamedUser};
use serde::{Deserialize, Serialize};

use super::{Resource, now};
use crate::diagnostics::{Diagnostics, WithSummary};
use crate::state::{Management, ServiceAccountOptions};

pub const KUBECONFIG_RESOURCE: &str = "omni_cluster_kubeconfig";

pub const DEFAULT_USER: &str = "admin";
pub const DEFAULT_GROUPS: &[&str] = &["system:masters"];
pub const DEFAULT_KUBECONFIG_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KubeconfigModel {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub last_updated: String,
    pub cluster: String,
    /// Service account user (default `admin`)
    #[serde(default)]
    pub user: Option<String>,
    /// Service account groups (default `system:masters`)
    #[serde(default)]
    pub groups: Option<Vec<String>>,
    #[serde(default)]
    pub clusters: Vec<NamedCluster>,
    #[serde(default)]
    pub contexts: Vec<NamedContext>,
    #[serde(default)]
    pub users: Vec<NamedUser>,
    #[serde(default)]
    pub yaml: String,
}

impl KubeconfigModel {
    pub fn service_account_options(&self) -> ServiceAccountOptions {
        ServiceAccountOptions {
            ttl: DEFAULT_KUBECONFIG_TTL,
            user: self
                .user
                .clone()
                .filter(|user| !user.is_empty())
                .unwrap_or_else(|| DEFAULT_USER.to_string()),
            groups: self
                .groups
                .clone()
                .unwrap_or_else(|| DEFAULT_GROUPS.iter().map(|g| g.to_string()).collect()),
        }
    }
}

pub struct KubeconfigResource<M: ?Sized> {
    management: Arc<M>,
}

impl<M: Management + ?Sized> KubeconfigResource<M> {
    pub fn new(management: Arc<M>) -> Self {
        Self { management }
    }

    /// Issue a kubeconfig and fill in the decoded lists
    async fn issue(&self, mut plan: KubeconfigModel) -> Result<KubeconfigModel, Diagnostics> {
        let options = plan.service_account_options();
        let kubeconfig = self
            .management
            .kubeconfig(&plan.cluster, &options)
            .await
            .summary("Error encountered getting cluster kubeconfig")?;

        let decoded =
            KubeConfig::from_slice(&kubeconfig).summary("Could not unmarshal kubeconfig")?;
        tracing::debug!(
            cluster = %plan.cluster,
            user = %options.user,
            clusters = decoded.clusters.len(),
            contexts = decoded.contexts.len(),
            users = decoded.users.len(),
            "issued kubeconfig"
        );

        plan.clusters = decoded.clusters;
        plan.contexts = decoded.contexts;
        plan.users = decoded.users;
        plan.yaml = String::from_utf8(kubeconfig).summary("Could not unmarshal kubeconfig")?;
        plan.id = plan.cluster.clone();
        Ok(plan)
    }
}

#[async_trait]
impl<M: Management + ?Sized> Resource for KubeconfigResource<M> {
    type Model = KubeconfigModel;

    fn type_name(&self) -> &'static str {
        KUBECONFIG_RESOURCE
    }

    async fn create(&self, plan: KubeconfigModel) -> Result<KubeconfigModel, Diagnostics> {
        let mut model = self.issue(plan).await?;
        let timestamp = now();
        model.created_at = timestamp.clone();
        model.last_updated = timestamp;
        Ok(model)
    }

    async fn read(&self, state: KubeconfigModel) -> Result<KubeconfigModel, Diagnostics> {
        tracing::debug!(cluster = %state.cluster, "read cluster kubeconfig from state");
        Ok(state)
    }

    async fn update(
        &self,
        plan: KubeconfigModel,
        state: KubeconfigModel,
    ) -> Result<KubeconfigModel, Diagnostics> {
        let mut model = self.issue(plan).await?;
        model.created_at = state.created_at;
        model.last_updated = now();
        Ok(model)
    }

    async fn delete(&self, _state: KubeconfigModel) -> Result<(), Diagnostics> {
        Ok(())
    }
}
