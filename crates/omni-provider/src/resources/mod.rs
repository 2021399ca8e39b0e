//! Managed resources
//!
//! Each resource implements the CRUD contract the surrounding framework
//! drives: `create` and `update` receive the planned model, `read` and
//! `delete` the model recorded in state. Failures come back as diagnostics
//! and leave the recorded state untouched.

mod cluster;
mod kubeconfig;
mod machine_set;
mod machines;

pub use cluster::{CLUSTER_RESOURCE, ClusterModel, ClusterResource};
pub use kubeconfig::{
    DEFAULT_GROUPS, DEFAULT_KUBECONFIG_TTL, DEFAULT_USER, KUBECONFIG_RESOURCE, KubeconfigModel,
    KubeconfigResource,
};
pub use machine_set::{
    MACHINE_SET_TEMPLATE_RESOURCE, MachineSetTemplateModel, MachineSetTemplateResource,
    sanitize_machine_ids,
};
pub use machines::{
    InstallModel, MACHINES_TEMPLATE_RESOURCE, MachinesTemplateModel, MachinesTemplateResource,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use omni_core::Patch;
use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostics;

/// RFC 850 layout used for `created_at` / `last_updated`
const TIMESTAMP_FORMAT: &str = "%A, %d-%b-%y %H:%M:%S %Z";

/// CRUD contract of a managed resource
#[async_trait]
pub trait Resource: Send + Sync {
    type Model: Send + Sync;

    /// Full type name, e.g. `omni_cluster`
    fn type_name(&self) -> &'static str;

    async fn create(&self, plan: Self::Model) -> Result<Self::Model, Diagnostics>;

    async fn read(&self, state: Self::Model) -> Result<Self::Model, Diagnostics>;

    async fn update(&self, plan: Self::Model, state: Self::Model)
    -> Result<Self::Model, Diagnostics>;

    async fn delete(&self, state: Self::Model) -> Result<(), Diagnostics>;
}

pub(crate) fn timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

pub(crate) fn now() -> String {
    timestamp(Utc::now())
}

/// Config patch as written in resource configuration
///
/// `inline` holds a YAML mapping as a string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchModel {
    #[serde(default)]
    pub id_override: String,
    #[serde(default)]
    pub labels: IndexMap<String, String>,
    #[serde(default)]
    pub annotations: IndexMap<String, String>,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub inline: Option<String>,
}

impl PatchModel {
    pub fn to_patch(&self) -> omni_core::Result<Patch> {
        let inline = match &self.inline {
            Some(inline) => Patch::parse_inline(inline)?,
            None => None,
        };

        Ok(Patch {
            id_override: Some(self.id_override.clone()).filter(|id| !id.is_empty()),
            labels: self.labels.clone(),
            annotations: self.annotations.clone(),
            file: self.file.clone(),
            inline,
            ..Default::default()
        })
    }
}

pub(crate) fn convert_patches(patches: &[PatchModel]) -> omni_core::Result<Vec<Patch>> {
    patches.iter().map(PatchModel::to_patch).collect()
}
