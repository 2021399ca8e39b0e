//! `omni_cluster_machine_set_template` resource
//!
//! Renders a ControlPlane or Workers document from typed configuration. No
//! remote calls are made; the rendered YAML is fed to `omni_cluster`.

use async_trait::async_trait;
use indexmap::IndexMap;
use omni_core::{CoreError, MachineSetDocument, TemplateDocument};
use serde::{Deserialize, Serialize};

use super::{PatchModel, Resource, convert_patches, now};
use crate::diagnostics::Diagnostics;

pub const MACHINE_SET_TEMPLATE_RESOURCE: &str = "omni_cluster_machine_set_template";

const KIND_CONTROL_PLANE: &str = "controlplane";
const KIND_WORKER: &str = "worker";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineSetTemplateModel {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub last_updated: String,
    /// Required when `kind` is `worker`
    #[serde(default)]
    pub name: String,
    /// `controlplane` or `worker`
    pub kind: String,
    #[serde(default)]
    pub labels: IndexMap<String, String>,
    #[serde(default)]
    pub annotations: IndexMap<String, String>,
    #[serde(default)]
    pub machines: Vec<String>,
    #[serde(default)]
    pub patches: Vec<PatchModel>,
    #[serde(default)]
    pub system_extensions: Vec<String>,
    #[serde(default)]
    pub yaml: String,
}

/// Trim machine IDs and strip line breaks
///
/// An ID that ends up empty is an error.
pub fn sanitize_machine_ids(ids: &[String]) -> omni_core::Result<Vec<String>> {
    ids.iter()
        .map(|id| {
            let sanitized: String = id
                .trim()
                .chars()
                .filter(|c| !matches!(c, '\n' | '\r'))
                .collect();
            if sanitized.is_empty() {
                Err(CoreError::InvalidMachineId { id: id.clone() })
            } else {
                Ok(sanitized)
            }
        })
        .collect()
}

impl MachineSetTemplateModel {
    /// Render the machine set document and derive the ID
    pub fn compile(mut self) -> omni_core::Result<Self> {
        let set = MachineSetDocument {
            name: self.name.clone(),
            labels: self.labels.clone(),
            annotations: self.annotations.clone(),
            machines: sanitize_machine_ids(&self.machines)?,
            patches: convert_patches(&self.patches)?,
            system_extensions: self.system_extensions.clone(),
            ..Default::default()
        };

        let document = match self.kind.as_str() {
            KIND_CONTROL_PLANE => TemplateDocument::ControlPlane(set),
            KIND_WORKER if self.name.trim().is_empty() => {
                return Err(CoreError::MissingField {
                    field: "name".to_string(),
                });
            }
            KIND_WORKER => TemplateDocument::Workers(set),
            other => {
                return Err(CoreError::InvalidMachineSetKind {
                    kind: other.to_string(),
                });
            }
        };

        self.yaml = document.to_yaml()?;
        self.id = self.name.clone();
        Ok(self)
    }
}

fn compile_error(e: CoreError) -> Diagnostics {
    let mut diagnostics = Diagnostics::new();
    match &e {
        CoreError::InvalidMachineSetKind { .. } => {
            diagnostics.add_attribute_error("kind", "Kind not determined", e.to_string())
        }
        CoreError::MissingField { field } => {
            diagnostics.add_attribute_error(
                field.clone(),
                "Missing machine set name",
                e.to_string(),
            )
        }
        CoreError::InvalidMachineId { .. } => {
            diagnostics.add_attribute_error("machines", "Invalid machine ID", e.to_string())
        }
        _ => diagnostics.add_error("Could not template YAML", e.to_string()),
    }
    diagnostics
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MachineSetTemplateResource;

#[async_trait]
impl Resource for MachineSetTemplateResource {
    type Model = MachineSetTemplateModel;

    fn type_name(&self) -> &'static str {
        MACHINE_SET_TEMPLATE_RESOURCE
    }

    async fn create(
        &self,
        plan: MachineSetTemplateModel,
    ) -> Result<MachineSetTemplateModel, Diagnostics> {
        let mut model = plan.compile().map_err(compile_error)?;
        let timestamp = now();
        model.created_at = timestamp.clone();
        model.last_updated = timestamp;
        Ok(model)
    }

    async fn read(
        &self,
        state: MachineSetTemplateModel,
    ) -> Result<MachineSetTemplateModel, Diagnostics> {
        Ok(state)
    }

    async fn update(
        &self,
        plan: MachineSetTemplateModel,
        state: MachineSetTemplateModel,
    ) -> Result<MachineSetTemplateModel, Diagnostics> {
        let mut model = plan.compile().map_err(compile_error)?;
        model.created_at = state.created_at;
        model.last_updated = now();
        Ok(model)
    }

    async fn delete(&self, _state: MachineSetTemplateModel) -> Result<(), Diagnostics> {
        Ok(())
    }
}
