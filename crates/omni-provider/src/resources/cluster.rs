//! `omni_cluster` resource
//!
//! Owns a whole cluster template. The template fragments are composed into
//! one stream, synced to Omni and the resource waits for the cluster to
//! report ready. Reads export the template back and split it into fragments.

use std::sync::Arc;

use async_trait::async_trait;
use omni_core::{TemplateBundle, TemplateDocument, yaml_equivalent};
use serde::{Deserialize, Serialize};

use super::{Resource, now};
use crate::diagnostics::{Diagnostics, WithSummary};
use crate::poller::ReadinessPoller;
use crate::state::{MachineStatus, OmniState};

pub const CLUSTER_RESOURCE: &str = "omni_cluster";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterModel {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub last_updated: String,
    /// Tear down machine links after the cluster is gone (default false)
    #[serde(default)]
    pub delete_machine_links: Option<bool>,
    pub cluster_template: String,
    pub control_plane_template: String,
    #[serde(default)]
    pub workers_template: Vec<String>,
    #[serde(default)]
    pub machines_template: Vec<String>,
    /// Composed template as last synced or exported
    #[serde(default)]
    pub yaml: String,
}

impl ClusterModel {
    fn bundle(&self) -> TemplateBundle {
        TemplateBundle {
            cluster: self.cluster_template.clone(),
            control_plane: self.control_plane_template.clone(),
            workers: self.workers_template.clone(),
            machines: self.machines_template.clone(),
        }
    }

    /// Machine IDs named by the machine documents
    fn machine_ids(&self) -> Result<Vec<String>, Diagnostics> {
        let mut ids = Vec::new();
        for template in &self.machines_template {
            if let Some(TemplateDocument::Machine(machine)) =
                TemplateDocument::parse(template).summary("Invalid machine template")?
            {
                ids.push(machine.name);
            }
        }
        Ok(ids)
    }
}

pub struct ClusterResource<S: ?Sized> {
    state: Arc<S>,
    poller: ReadinessPoller,
}

impl<S: OmniState + ?Sized> ClusterResource<S> {
    pub fn new(state: Arc<S>, poller: ReadinessPoller) -> Self {
        Self { state, poller }
    }

    /// Import an existing cluster by name
    pub fn import(&self, id: &str) -> ClusterModel {
        ClusterModel {
            id: id.to_string(),
            ..Default::default()
        }
    }

    /// Compose the planned fragments, sync them and wait for the cluster
    async fn sync(&self, plan: &ClusterModel, cluster: &str) -> Result<String, Diagnostics> {
        let template = plan.bundle().compose().map_err(|e| {
            Diagnostics::error(
                "Error constructing YAML template",
                format!("Encountered an error constructing the YAML template: {}", e),
            )
        })?;
        tracing::debug!(cluster, "constructed template:\n{}", template);

        self.state
            .sync_template(&template)
            .await
            .summary("Error syncing template")?;
        self.poller
            .await_ready(&*self.state, cluster)
            .await
            .summary("Error waiting for cluster to become ready")?;

        Ok(template)
    }
}

#[async_trait]
impl<S: OmniState + ?Sized> Resource for ClusterResource<S> {
    type Model = ClusterModel;

    fn type_name(&self) -> &'static str {
        CLUSTER_RESOURCE
    }

    async fn create(&self, mut plan: ClusterModel) -> Result<ClusterModel, Diagnostics> {
        plan.delete_machine_links.get_or_insert(false);

        let cluster = omni_core::cluster_name(&plan.cluster_template)
            .summary("Invalid cluster template")?;
        let template = self.sync(&plan, &cluster).await?;

        let timestamp = now();
        plan.id = cluster;
        plan.yaml = template;
        plan.created_at = timestamp.clone();
        plan.last_updated = timestamp;
        Ok(plan)
    }

    async fn read(&self, mut state: ClusterModel) -> Result<ClusterModel, Diagnostics> {
        let exported = self
            .state
            .export_template(&state.id)
            .await
            .map_err(|e| {
                Diagnostics::error(
                    "Problem exporting template",
                    format!(
                        "Encountered a problem exporting the cluster template for {} from Omni. Error: {}",
                        state.id, e
                    ),
                )
            })?;
        tracing::debug!(cluster = %state.id, "exported template on read:\n{}", exported);

        let bundle = omni_core::split(&exported).summary("Error splitting exported template")?;
        tracing::debug!(
            cluster = %state.id,
            workers = bundle.workers.len(),
            machines = bundle.machines.len(),
            "split exported template"
        );

        state.cluster_template = keep_equivalent(&state.cluster_template, bundle.cluster);
        state.control_plane_template =
            keep_equivalent(&state.control_plane_template, bundle.control_plane);
        state.workers_template = keep_equivalent_list(&state.workers_template, bundle.workers);
        state.machines_template = keep_equivalent_list(&state.machines_template, bundle.machines);
        state.yaml = exported;
        Ok(state)
    }

    async fn update(
        &self,
        mut plan: ClusterModel,
        state: ClusterModel,
    ) -> Result<ClusterModel, Diagnostics> {
        plan.delete_machine_links.get_or_insert(false);

        // Poll the cluster the synced template names, which may differ from the stored id
        let cluster = omni_core::cluster_name(&plan.cluster_template)
            .summary("Invalid cluster template")?;
        let template = self.sync(&plan, &cluster).await?;

        plan.id = state.id;
        plan.created_at = state.created_at;
        plan.yaml = template;
        plan.last_updated = now();
        Ok(plan)
    }

    async fn delete(&self, state: ClusterModel) -> Result<(), Diagnostics> {
        let machine_ids = state.machine_ids()?;
        tracing::debug!(cluster = %state.id, machines = ?machine_ids, "collected machine IDs");

        let statuses = self
            .state
            .list_machine_statuses()
            .await
            .summary("Error listing machine statuses")?;
        let cluster_machines: Vec<MachineStatus> = statuses
            .into_iter()
            .filter(|status| machine_ids.iter().any(|id| id == status.id()))
            .collect();

        self.state
            .delete_cluster(&state.id)
            .await
            .summary("Error deleting cluster")?;
        tracing::debug!(cluster = %state.id, "deletion sent, monitoring status");

        self.poller
            .await_deleted(&*self.state, &state.id)
            .await
            .summary("Error waiting for cluster deletion")?;

        if state.delete_machine_links.unwrap_or(false) {
            for machine in &cluster_machines {
                tracing::debug!(machine = machine.id(), "removing machine link");
                let ready = self
                    .state
                    .teardown_machine_link(machine.id())
                    .await
                    .summary("Error during teardown")?;
                if ready {
                    self.state
                        .destroy_machine_link(machine.id())
                        .await
                        .summary("Error during destroy")?;
                }
            }
        }

        Ok(())
    }
}

/// Keep the prior fragment when the exported one means the same thing
fn keep_equivalent(prior: &str, exported: String) -> String {
    if !prior.is_empty() && yaml_equivalent(prior, &exported).unwrap_or(false) {
        prior.to_string()
    } else {
        exported
    }
}

fn keep_equivalent_list(prior: &[String], exported: Vec<String>) -> Vec<String> {
    exported
        .into_iter()
        .enumerate()
        .map(|(i, fragment)| match prior.get(i) {
            Some(previous) => keep_equivalent(previous, fragment),
            None => fragment,
        })
        .collect()
}
