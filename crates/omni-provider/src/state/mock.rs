//! Mock Omni state for testing
//!
//! Stores templates, statuses and machine links in memory, useful for unit
//! tests without an Omni instance. Cluster statuses can be scripted per
//! cluster; once a script runs out, a synced cluster reports ready and an
//! unknown one is not found.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{
    ClusterDestroyStatus, ClusterStatus, JoinConfig, LINK_TYPE, Management, MachineStatus,
    OmniState, ServiceAccountOptions,
};
use crate::error::{ProviderError, Result};

/// Counts of operations performed for testing assertions
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OperationCounts {
    pub syncs: usize,
    pub exports: usize,
    pub deletes: usize,
    pub status_gets: usize,
    pub destroy_status_gets: usize,
    pub machine_lists: usize,
    pub teardowns: usize,
    pub destroys: usize,
    pub kubeconfigs: usize,
}

#[derive(Default)]
struct Inner {
    /// cluster name -> last synced template
    templates: HashMap<String, String>,
    statuses: HashMap<String, VecDeque<Result<ClusterStatus>>>,
    destroy_statuses: HashMap<String, VecDeque<Result<ClusterDestroyStatus>>>,
    machines: Vec<MachineStatus>,
    links: HashSet<String>,
    torn_down: Vec<String>,
    destroyed: Vec<String>,
    sync_failure: Option<String>,
    delete_failure: Option<String>,
    kubeconfig_requests: Vec<(String, ServiceAccountOptions)>,
    join_config: JoinConfig,
    operations: OperationCounts,
}

/// In-memory Omni state for testing
#[derive(Clone, Default)]
pub struct MockOmniState {
    inner: Arc<Mutex<Inner>>,
}

impl MockOmniState {
    /// Create a new empty mock
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Pre-populate machine statuses, each with a machine link
    pub fn with_machines(self, machines: Vec<MachineStatus>) -> Self {
        {
            let mut inner = self.lock();
            for machine in &machines {
                inner.links.insert(machine.id().to_string());
            }
            inner.machines = machines;
        }
        self
    }

    pub fn with_join_config(self, join_config: JoinConfig) -> Self {
        self.lock().join_config = join_config;
        self
    }

    /// Store a template as if it had been synced earlier
    pub fn insert_template(&self, cluster: &str, template: &str) {
        self.lock()
            .templates
            .insert(cluster.to_string(), template.to_string());
    }

    /// Queue a status returned by the next `cluster_status` lookup
    pub fn push_cluster_status(&self, cluster: &str, status: ClusterStatus) {
        self.lock()
            .statuses
            .entry(cluster.to_string())
            .or_default()
            .push_back(Ok(status));
    }

    pub fn push_cluster_status_error(&self, cluster: &str, error: ProviderError) {
        self.lock()
            .statuses
            .entry(cluster.to_string())
            .or_default()
            .push_back(Err(error));
    }

    /// Queue a destroy status returned by the next `cluster_destroy_status` lookup
    pub fn push_destroy_status(&self, cluster: &str, phase: &str) {
        self.lock()
            .destroy_statuses
            .entry(cluster.to_string())
            .or_default()
            .push_back(Ok(ClusterDestroyStatus {
                phase: phase.to_string(),
            }));
    }

    pub fn push_destroy_status_error(&self, cluster: &str, error: ProviderError) {
        self.lock()
            .destroy_statuses
            .entry(cluster.to_string())
            .or_default()
            .push_back(Err(error));
    }

    /// Make every following `sync_template` fail
    pub fn fail_sync(&self, message: &str) {
        self.lock().sync_failure = Some(message.to_string());
    }

    /// Make every following `delete_cluster` fail
    pub fn fail_delete(&self, message: &str) {
        self.lock().delete_failure = Some(message.to_string());
    }

    /// Get operation counts for assertions
    pub fn operation_counts(&self) -> OperationCounts {
        self.lock().operations.clone()
    }

    /// Last synced template of a cluster
    pub fn template(&self, cluster: &str) -> Option<String> {
        self.lock().templates.get(cluster).cloned()
    }

    /// Machine IDs whose link was torn down, in call order
    pub fn torn_down_links(&self) -> Vec<String> {
        self.lock().torn_down.clone()
    }

    /// Machine IDs whose link was destroyed, in call order
    pub fn destroyed_links(&self) -> Vec<String> {
        self.lock().destroyed.clone()
    }

    /// Kubeconfig requests received so far
    pub fn kubeconfig_requests(&self) -> Vec<(String, ServiceAccountOptions)> {
        self.lock().kubeconfig_requests.clone()
    }
}

#[async_trait]
impl OmniState for MockOmniState {
    async fn sync_template(&self, template: &str) -> Result<()> {
        let mut inner = self.lock();
        inner.operations.syncs += 1;

        let cluster = omni_core::cluster_name(template)?;
        if let Some(message) = &inner.sync_failure {
            return Err(ProviderError::Sync {
                cluster,
                message: message.clone(),
            });
        }

        inner.templates.insert(cluster, template.to_string());
        Ok(())
    }

    async fn export_template(&self, cluster: &str) -> Result<String> {
        let mut inner = self.lock();
        inner.operations.exports += 1;

        inner
            .templates
            .get(cluster)
            .cloned()
            .ok_or_else(|| ProviderError::not_found("Cluster", cluster))
    }

    async fn delete_cluster(&self, cluster: &str) -> Result<()> {
        let mut inner = self.lock();
        inner.operations.deletes += 1;

        if let Some(message) = &inner.delete_failure {
            return Err(ProviderError::Delete {
                cluster: cluster.to_string(),
                message: message.clone(),
            });
        }

        inner
            .templates
            .remove(cluster)
            .map(|_| ())
            .ok_or_else(|| ProviderError::not_found("Cluster", cluster))
    }

    async fn cluster_status(&self, cluster: &str) -> Result<ClusterStatus> {
        let mut inner = self.lock();
        inner.operations.status_gets += 1;

        if let Some(scripted) = inner.statuses.get_mut(cluster).and_then(VecDeque::pop_front) {
            return scripted;
        }

        if inner.templates.contains_key(cluster) {
            Ok(ClusterStatus::ready())
        } else {
            Err(ProviderError::not_found("ClusterStatus", cluster))
        }
    }

    async fn cluster_destroy_status(&self, cluster: &str) -> Result<ClusterDestroyStatus> {
        let mut inner = self.lock();
        inner.operations.destroy_status_gets += 1;

        inner
            .destroy_statuses
            .get_mut(cluster)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Err(ProviderError::not_found("ClusterDestroyStatus", cluster)))
    }

    async fn list_machine_statuses(&self) -> Result<Vec<MachineStatus>> {
        let mut inner = self.lock();
        inner.operations.machine_lists += 1;
        Ok(inner.machines.clone())
    }

    async fn teardown_machine_link(&self, machine: &str) -> Result<bool> {
        let mut inner = self.lock();
        inner.operations.teardowns += 1;

        if !inner.links.contains(machine) {
            return Err(ProviderError::not_found(LINK_TYPE, machine));
        }
        inner.torn_down.push(machine.to_string());
        Ok(true)
    }

    async fn destroy_machine_link(&self, machine: &str) -> Result<()> {
        let mut inner = self.lock();
        inner.operations.destroys += 1;

        if !inner.links.remove(machine) {
            return Err(ProviderError::not_found(LINK_TYPE, machine));
        }
        inner.destroyed.push(machine.to_string());
        Ok(())
    }
}

#[async_trait]
impl Management for MockOmniState {
    async fn kubeconfig(&self, cluster: &str, options: &ServiceAccountOptions) -> Result<Vec<u8>> {
        let mut inner = self.lock();
        inner.operations.kubeconfigs += 1;
        inner
            .kubeconfig_requests
            .push((cluster.to_string(), options.clone()));

        let context = format!("omni-{}-{}", cluster, options.user);
        let kubeconfig = format!(
            "apiVersion: v1\nkind: Config\ncurrent-context: {context}\nclusters:\n  - name: omni-{cluster}\n    cluster:\n      server: https://omni.example.com/kubernetes/{cluster}\ncontexts:\n  - name: {context}\n    context:\n      cluster: omni-{cluster}\n      namespace: default\n      user: {context}\nusers:\n  - name: {context}\n    user:\n      token: token-{requests}\n",
            requests = inner.operations.kubeconfigs,
        );
        Ok(kubeconfig.into_bytes())
    }

    async fn machine_join_config(&self) -> Result<JoinConfig> {
        Ok(self.lock().join_config.clone())
    }
}
