//! Provider entry point
//!
//! `OmniProvider` validates the provider configuration and binds one Omni
//! client to every resource and data source.

use std::sync::Arc;

use url::Url;

use crate::config::{ProviderConfig, ResolvedConfig};
use crate::data_sources::{
    CLUSTER_TEMPLATE_DATA_SOURCE, ClusterTemplateDataSource, JOIN_CONFIG_DATA_SOURCE,
    JoinConfigDataSource, MACHINE_STATUS_DATA_SOURCE, MachineStatusDataSource,
};
use crate::diagnostics::Diagnostics;
use crate::poller::ReadinessPoller;
use crate::resources::{
    CLUSTER_RESOURCE, ClusterResource, KUBECONFIG_RESOURCE, KubeconfigResource,
    MACHINE_SET_TEMPLATE_RESOURCE, MACHINES_TEMPLATE_RESOURCE, MachineSetTemplateResource,
    MachinesTemplateResource,
};
use crate::state::{Management, OmniState};

/// Provider type name, the prefix of every resource name
pub const PROVIDER_TYPE_NAME: &str = "omni";

#[derive(Debug, Clone)]
pub struct OmniProvider {
    version: String,
}

impl Default for OmniProvider {
    fn default() -> Self {
        Self::new(env!("CARGO_PKG_VERSION"))
    }
}

impl OmniProvider {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        PROVIDER_TYPE_NAME
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn resource_names(&self) -> &'static [&'static str] {
        &[
            CLUSTER_RESOURCE,
            MACHINE_SET_TEMPLATE_RESOURCE,
            MACHINES_TEMPLATE_RESOURCE,
            KUBECONFIG_RESOURCE,
        ]
    }

    pub fn data_source_names(&self) -> &'static [&'static str] {
        &[
            MACHINE_STATUS_DATA_SOURCE,
            CLUSTER_TEMPLATE_DATA_SOURCE,
            JOIN_CONFIG_DATA_SOURCE,
        ]
    }

    /// Resolve the configuration against the environment and bind the client
    pub fn configure<S>(
        &self,
        config: &ProviderConfig,
        client: Arc<S>,
    ) -> Result<ConfiguredProvider<S>, Diagnostics>
    where
        S: OmniState + Management + ?Sized,
    {
        tracing::info!(version = %self.version, "configuring Omni client");
        let resolved = config.resolve()?;
        Ok(self.configure_resolved(resolved, client))
    }

    pub fn configure_resolved<S>(
        &self,
        resolved: ResolvedConfig,
        client: Arc<S>,
    ) -> ConfiguredProvider<S>
    where
        S: OmniState + Management + ?Sized,
    {
        tracing::info!(
            omni_endpoint = %resolved.endpoint,
            omni_service_account_key = ?resolved.service_account_key,
            timeout = ?resolved.poll.timeout,
            "configured Omni client"
        );

        ConfiguredProvider {
            endpoint: resolved.endpoint,
            client,
            poller: ReadinessPoller::new(resolved.poll),
        }
    }
}

/// Provider bound to one Omni client
pub struct ConfiguredProvider<S: ?Sized> {
    endpoint: Url,
    client: Arc<S>,
    poller: ReadinessPoller,
}

impl<S> ConfiguredProvider<S>
where
    S: OmniState + Management + ?Sized,
{
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn client(&self) -> &Arc<S> {
        &self.client
    }

    pub fn poller(&self) -> &ReadinessPoller {
        &self.poller
    }

    pub fn cluster(&self) -> ClusterResource<S> {
        ClusterResource::new(self.client.clone(), self.poller.clone())
    }

    pub fn machine_set_template(&self) -> MachineSetTemplateResource {
        MachineSetTemplateResource
    }

    pub fn machines_template(&self) -> MachinesTemplateResource {
        MachinesTemplateResource
    }

    pub fn kubeconfig(&self) -> KubeconfigResource<S> {
        KubeconfigResource::new(self.client.clone())
    }

    pub fn machine_status(&self) -> MachineStatusDataSource<S> {
        MachineStatusDataSource::new(self.client.clone())
    }

    pub fn cluster_template(&self) -> ClusterTemplateDataSource {
        ClusterTemplateDataSource
    }

    pub fn default_machine_join_config(&self) -> JoinConfigDataSource<S> {
        JoinConfigDataSource::new(self.client.clone())
    }
}
