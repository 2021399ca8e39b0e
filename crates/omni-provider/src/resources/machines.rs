//! `omni_cluster_machines_template` resource
//!
//! Renders a Machine document for a single machine ID.

use async_trait::async_trait;
use indexmap::IndexMap;
use omni_core::{CoreError, MachineDocument, MachineInstall, TemplateDocument};
use serde::{Deserialize, Serialize};

use super::{PatchModel, Resource, convert_patches, now, sanitize_machine_ids};
use crate::diagnostics::{Diagnostics, WithSummary};

pub const MACHINES_TEMPLATE_RESOURCE: &str = "omni_cluster_machines_template";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallModel {
    pub disk: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachinesTemplateModel {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub last_updated: String,
    #[serde(default = "default_kind")]
    pub kind: String,
    /// Machine ID
    pub name: String,
    #[serde(default)]
    pub labels: IndexMap<String, String>,
    #[serde(default)]
    pub annotations: IndexMap<String, String>,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub install: Option<InstallModel>,
    #[serde(default)]
    pub patches: Vec<PatchModel>,
    #[serde(default)]
    pub system_extensions: Vec<String>,
    #[serde(default)]
    pub yaml: String,
}

fn default_kind() -> String {
    omni_core::DocumentKind::Machine.to_string()
}

impl Default for MachinesTemplateModel {
    fn default() -> Self {
        Self {
            id: String::new(),
            created_at: String::new(),
            last_updated: String::new(),
            kind: default_kind(),
            name: String::new(),
            labels: IndexMap::new(),
            annotations: IndexMap::new(),
            locked: false,
            install: None,
            patches: Vec::new(),
            system_extensions: Vec::new(),
            yaml: String::new(),
        }
    }
}

impl MachinesTemplateModel {
    /// Render the machine document and derive the ID
    pub fn compile(mut self) -> omni_core::Result<Self> {
        let name = sanitize_machine_ids(std::slice::from_ref(&self.name))?
            .pop()
            .ok_or_else(|| CoreError::MissingField {
                field: "name".to_string(),
            })?;

        let document = TemplateDocument::Machine(MachineDocument {
            name: name.clone(),
            labels: self.labels.clone(),
            annotations: self.annotations.clone(),
            locked: self.locked,
            install: self.install.as_ref().map(|install| MachineInstall {
                disk: install.disk.clone(),
                ..Default::default()
            }),
            patches: convert_patches(&self.patches)?,
            system_extensions: self.system_extensions.clone(),
            ..Default::default()
        });

        self.kind = default_kind();
        self.yaml = document.to_yaml()?;
        self.name = name.clone();
        self.id = name;
        Ok(self)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MachinesTemplateResource;

#[async_trait]
impl Resource for MachinesTemplateResource {
    type Model = MachinesTemplateModel;

    fn type_name(&self) -> &'static str {
        MACHINES_TEMPLATE_RESOURCE
    }

    async fn create(
        &self,
        plan: MachinesTemplateModel,
    ) -> Result<MachinesTemplateModel, Diagnostics> {
        let mut model = plan.compile().summary("Could not template YAML")?;
        let timestamp = now();
        model.created_at = timestamp.clone();
        model.last_updated = timestamp;
        Ok(model)
    }

    async fn read(
        &self,
        state: MachinesTemplateModel,
    ) -> Result<MachinesTemplateModel, Diagnostics> {
        Ok(state)
    }

    async fn update(
        &self,
        plan: MachinesTemplateModel,
        state: MachinesTemplateModel,
    ) -> Result<MachinesTemplateModel, Diagnostics> {
        let mut model = plan.compile().summary("Could not template YAML")?;
        model.created_at = state.created_at;
        model.last_updated = now();
        Ok(model)
    }

    async fn delete(&self, _state: MachinesTemplateModel) -> Result<(), Diagnostics> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_machine() {
        let model = MachinesTemplateModel {
            name: "430d882a-51a8-48b3-ae00-90c5b0b5b0b0\n".to_string(),
            locked: true,
            install: Some(InstallModel {
                disk: "/dev/nvme0n1".to_string(),
            }),
            patches: vec![PatchModel {
                inline: Some("machine:\n  install:\n    wipe: true\n".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        }
        .compile()
        .unwrap();

        assert_eq!(model.id, "430d882a-51a8-48b3-ae00-90c5b0b5b0b0");
        assert_eq!(model.kind, "Machine");
        insta::assert_snapshot!(model.yaml, @r"
        kind: Machine
        name: 430d882a-51a8-48b3-ae00-90c5b0b5b0b0
        locked: true
        install:
          disk: /dev/nvme0n1
        patches:
        - inline:
            machine:
              install:
                wipe: true
        ");
    }

    #[test]
    fn test_empty_name_rejected() {
        let err = MachinesTemplateModel::default().compile().unwrap_err();
        assert!(matches!(err, CoreError::InvalidMachineId { .. }));
    }

    #[tokio::test]
    async fn test_invalid_inline_patch_fails_create() {
        let plan = MachinesTemplateModel {
            name: "m-1".to_string(),
            patches: vec![PatchModel {
                inline: Some("- not\n- a mapping\n".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        };

        let diagnostics = MachinesTemplateResource.create(plan).await.unwrap_err();
        assert!(diagnostics.has_errors());
    }
}
