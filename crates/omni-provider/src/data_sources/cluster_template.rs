//! `omni_cluster_template` data source
//!
//! Renders a Cluster document from typed configuration.

use std::time::Duration;

use async_trait::async_trait;
use humantime_serde::re::humantime;
use indexmap::IndexMap;
use omni_core::{
    BackupConfiguration, ClusterDocument, ClusterFeatures, TemplateDocument, VersionSettings,
};
use serde::{Deserialize, Serialize};

use super::DataSource;
use crate::diagnostics::{Diagnostics, WithSummary};
use crate::resources::{PatchModel, convert_patches};

pub const CLUSTER_TEMPLATE_DATA_SOURCE: &str = "omni_cluster_template";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionModel {
    pub version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupConfigurationModel {
    /// Any humantime duration (`1h`, `90m`, `1h30m`)
    pub interval: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterFeaturesModel {
    pub disk_encryption: bool,
    pub enable_workload_proxy: bool,
    pub use_embedded_discovery_service: bool,
    pub backup_configuration: Option<BackupConfigurationModel>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterTemplateConfig {
    pub name: String,
    #[serde(default)]
    pub labels: IndexMap<String, String>,
    #[serde(default)]
    pub annotations: IndexMap<String, String>,
    pub kubernetes: VersionModel,
    pub talos: VersionModel,
    #[serde(default)]
    pub features: ClusterFeaturesModel,
    #[serde(default)]
    pub patches: Vec<PatchModel>,
    #[serde(default)]
    pub system_extensions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterTemplateModel {
    pub id: String,
    #[serde(flatten)]
    pub config: ClusterTemplateConfig,
    pub yaml: String,
}

/// Render a duration the way Go prints `time.Duration` (`1h0m0s`, `30m0s`, `1.5s`, `500ms`)
pub fn go_duration(duration: Duration) -> String {
    let nanos = duration.as_nanos();
    if nanos == 0 {
        return "0s".to_string();
    }

    // Below one second Go switches to the largest unit that fits
    if nanos < 1_000 {
        return format!("{}ns", nanos);
    }
    if nanos < 1_000_000 {
        return format!("{}µs", decimal(nanos / 1_000, nanos % 1_000, 3));
    }
    if nanos < 1_000_000_000 {
        return format!("{}ms", decimal(nanos / 1_000_000, nanos % 1_000_000, 6));
    }

    let total = duration.as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    let seconds = decimal(u128::from(seconds), u128::from(duration.subsec_nanos()), 9);

    if hours > 0 {
        format!("{}h{}m{}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m{}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// `whole.fraction` with trailing zeros dropped
fn decimal(whole: u128, fraction: u128, digits: usize) -> String {
    if fraction == 0 {
        return whole.to_string();
    }
    let rendered = format!("{}.{:0width$}", whole, fraction, width = digits);
    rendered.trim_end_matches('0').to_string()
}

impl ClusterTemplateConfig {
    fn render(&self) -> Result<String, Diagnostics> {
        let backup_configuration = match &self.features.backup_configuration {
            Some(backup) => {
                let interval = humantime::parse_duration(&backup.interval).map_err(|e| {
                    let mut diagnostics = Diagnostics::new();
                    diagnostics.add_attribute_error(
                        "features.backup_configuration.interval",
                        "Invalid backup interval",
                        format!("`{}` is not a duration: {}", backup.interval, e),
                    );
                    diagnostics
                })?;
                Some(BackupConfiguration {
                    interval: go_duration(interval),
                    ..Default::default()
                })
            }
            None => None,
        };

        let document = TemplateDocument::Cluster(ClusterDocument {
            name: self.name.clone(),
            labels: self.labels.clone(),
            annotations: self.annotations.clone(),
            kubernetes: Some(VersionSettings::new(self.kubernetes.version.clone())),
            talos: Some(VersionSettings::new(self.talos.version.clone())),
            features: ClusterFeatures {
                disk_encryption: self.features.disk_encryption,
                enable_workload_proxy: self.features.enable_workload_proxy,
                use_embedded_discovery_service: self.features.use_embedded_discovery_service,
                backup_configuration,
                ..Default::default()
            },
            patches: convert_patches(&self.patches).summary("Invalid patch")?,
            system_extensions: self.system_extensions.clone(),
            ..Default::default()
        });

        document.to_yaml().summary("Could not template YAML")
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ClusterTemplateDataSource;

#[async_trait]
impl DataSource for ClusterTemplateDataSource {
    type Config = ClusterTemplateConfig;
    type Model = ClusterTemplateModel;

    fn type_name(&self) -> &'static str {
        CLUSTER_TEMPLATE_DATA_SOURCE
    }

    async fn read(
        &self,
        config: ClusterTemplateConfig,
    ) -> Result<ClusterTemplateModel, Diagnostics> {
        let yaml = config.render()?;
        Ok(ClusterTemplateModel {
            id: config.name.clone(),
            config,
            yaml,
        })
    }
}
