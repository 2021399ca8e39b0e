//! Typed template documents
//!
//! Each document kind has its own struct and codec. The `kind` discriminator
//! lives outside the structs: decoding reads and strips it, encoding writes it
//! back as the first key. Fields that are not modeled are kept in `extra` so
//! they survive a decode/encode cycle.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::error::{CoreError, Result};
use crate::kind::DocumentKind;

/// Key of the discriminator field
pub const KIND_KEY: &str = "kind";

pub type Labels = IndexMap<String, String>;
pub type Annotations = IndexMap<String, String>;

/// A single document of a cluster template
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateDocument {
    Cluster(ClusterDocument),
    ControlPlane(MachineSetDocument),
    Workers(MachineSetDocument),
    Machine(MachineDocument),
}

/// `kind: Cluster`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterDocument {
    /// Empty when the document has none; `validate` reports it
    #[serde(
        default,
        deserialize_with = "scalar::string",
        skip_serializing_if = "String::is_empty"
    )]
    pub name: String,

    #[serde(
        default,
        deserialize_with = "scalar::string_map",
        skip_serializing_if = "IndexMap::is_empty"
    )]
    pub labels: Labels,

    #[serde(
        default,
        deserialize_with = "scalar::string_map",
        skip_serializing_if = "IndexMap::is_empty"
    )]
    pub annotations: Annotations,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubernetes: Option<VersionSettings>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub talos: Option<VersionSettings>,

    #[serde(default, skip_serializing_if = "ClusterFeatures::is_empty")]
    pub features: ClusterFeatures,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patches: Vec<Patch>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub system_extensions: Vec<String>,

    #[serde(flatten)]
    pub extra: Mapping,
}

/// `kubernetes:` / `talos:` blocks
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionSettings {
    #[serde(default, deserialize_with = "scalar::string")]
    pub version: String,

    #[serde(flatten)]
    pub extra: Mapping,
}

impl VersionSettings {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            extra: Mapping::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterFeatures {
    #[serde(default, skip_serializing_if = "is_false")]
    pub disk_encryption: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub enable_workload_proxy: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub use_embedded_discovery_service: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_configuration: Option<BackupConfiguration>,

    #[serde(flatten)]
    pub extra: Mapping,
}

impl ClusterFeatures {
    pub fn is_empty(&self) -> bool {
        self == &ClusterFeatures::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupConfiguration {
    /// Go-style duration, e.g. `1h0m0s`
    #[serde(default, deserialize_with = "scalar::string")]
    pub interval: String,

    #[serde(flatten)]
    pub extra: Mapping,
}

/// `kind: ControlPlane` and `kind: Workers`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineSetDocument {
    /// Optional for the control plane, required for worker sets
    #[serde(
        default,
        deserialize_with = "scalar::string",
        skip_serializing_if = "String::is_empty"
    )]
    pub name: String,

    #[serde(
        default,
        deserialize_with = "scalar::string_map",
        skip_serializing_if = "IndexMap::is_empty"
    )]
    pub labels: Labels,

    #[serde(
        default,
        deserialize_with = "scalar::string_map",
        skip_serializing_if = "IndexMap::is_empty"
    )]
    pub annotations: Annotations,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub machines: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patches: Vec<Patch>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub system_extensions: Vec<String>,

    #[serde(flatten)]
    pub extra: Mapping,
}

/// `kind: Machine`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineDocument {
    /// Machine ID, empty when the document has none
    #[serde(
        default,
        deserialize_with = "scalar::string",
        skip_serializing_if = "String::is_empty"
    )]
    pub name: String,

    #[serde(
        default,
        deserialize_with = "scalar::string_map",
        skip_serializing_if = "IndexMap::is_empty"
    )]
    pub labels: Labels,

    #[serde(
        default,
        deserialize_with = "scalar::string_map",
        skip_serializing_if = "IndexMap::is_empty"
    )]
    pub annotations: Annotations,

    #[serde(default, skip_serializing_if = "is_false")]
    pub locked: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install: Option<MachineInstall>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patches: Vec<Patch>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub system_extensions: Vec<String>,

    #[serde(flatten)]
    pub extra: Mapping,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineInstall {
    #[serde(default, deserialize_with = "scalar::string")]
    pub disk: String,

    #[serde(flatten)]
    pub extra: Mapping,
}

/// Config patch attached to a cluster, machine set or machine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_override: Option<String>,

    #[serde(
        default,
        deserialize_with = "scalar::string_map",
        skip_serializing_if = "IndexMap::is_empty"
    )]
    pub labels: Labels,

    #[serde(
        default,
        deserialize_with = "scalar::string_map",
        skip_serializing_if = "IndexMap::is_empty"
    )]
    pub annotations: Annotations,

    /// Path to a patch file, resolved by Omni
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline: Option<Value>,

    #[serde(flatten)]
    pub extra: Mapping,
}

/// Lenient decoding of string fields
///
/// YAML scalars of any type are read as their string form (`tier: 1` is the
/// label value `"1"`), and null reads as empty.
mod scalar {
    use indexmap::IndexMap;
    use serde::de::{Deserialize, Deserializer, Error};
    use serde_yaml::Value;

    fn to_string(value: Value) -> std::result::Result<String, String> {
        match value {
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            Value::Null => Ok(String::new()),
            Value::Sequence(_) | Value::Mapping(_) | Value::Tagged(_) => {
                Err("expected a scalar value".to_string())
            }
        }
    }

    pub fn string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        to_string(Value::deserialize(deserializer)?).map_err(D::Error::custom)
    }

    pub fn string_map<'de, D>(
        deserializer: D,
    ) -> std::result::Result<IndexMap<String, String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let Some(entries) = Option::<IndexMap<Value, Value>>::deserialize(deserializer)? else {
            return Ok(IndexMap::new());
        };
        entries
            .into_iter()
            .map(|(key, value)| Ok((to_string(key)?, to_string(value)?)))
            .collect::<std::result::Result<_, String>>()
            .map_err(D::Error::custom)
    }
}

impl Patch {
    /// Decode an inline patch given as a YAML string
    ///
    /// An empty string means "no inline patch". Anything else must be a YAML
    /// mapping.
    pub fn parse_inline(inline: &str) -> Result<Option<Value>> {
        if inline.trim().is_empty() {
            return Ok(None);
        }
        let value: Value =
            serde_yaml::from_str(inline).map_err(|e| CoreError::parse("inline patch", e))?;
        match value {
            Value::Mapping(_) => Ok(Some(value)),
            Value::Null => Ok(None),
            _ => Err(CoreError::InvalidPatch {
                message: "inline patch must be a YAML mapping".to_string(),
            }),
        }
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl TemplateDocument {
    pub fn kind(&self) -> DocumentKind {
        match self {
            TemplateDocument::Cluster(_) => DocumentKind::Cluster,
            TemplateDocument::ControlPlane(_) => DocumentKind::ControlPlane,
            TemplateDocument::Workers(_) => DocumentKind::Workers,
            TemplateDocument::Machine(_) => DocumentKind::Machine,
        }
    }

    /// Name of the document (cluster name, machine set name or machine ID)
    pub fn name(&self) -> &str {
        match self {
            TemplateDocument::Cluster(doc) => &doc.name,
            TemplateDocument::ControlPlane(doc) | TemplateDocument::Workers(doc) => &doc.name,
            TemplateDocument::Machine(doc) => &doc.name,
        }
    }

    /// Read the discriminator of a decoded document
    ///
    /// Returns `None` when the document is not a mapping, has no `kind` key,
    /// or the value is not a string.
    pub fn raw_kind(value: &Value) -> Option<&str> {
        value.as_mapping()?.get(KIND_KEY)?.as_str()
    }

    /// Decode a document from a parsed YAML value
    ///
    /// `Ok(None)` means there is no recognized discriminator.
    pub fn from_value(value: Value) -> Result<Option<Self>> {
        let Some(kind) = Self::raw_kind(&value).and_then(|k| k.parse::<DocumentKind>().ok())
        else {
            return Ok(None);
        };

        let Value::Mapping(mut mapping) = value else {
            return Ok(None);
        };
        mapping.shift_remove(KIND_KEY);
        let body = Value::Mapping(mapping);
        let context = format!("{} document", kind);

        let document = match kind {
            DocumentKind::Cluster => TemplateDocument::Cluster(
                serde_yaml::from_value(body).map_err(|e| CoreError::parse(context, e))?,
            ),
            DocumentKind::ControlPlane => TemplateDocument::ControlPlane(
                serde_yaml::from_value(body).map_err(|e| CoreError::parse(context, e))?,
            ),
            DocumentKind::Workers => TemplateDocument::Workers(
                serde_yaml::from_value(body).map_err(|e| CoreError::parse(context, e))?,
            ),
            DocumentKind::Machine => TemplateDocument::Machine(
                serde_yaml::from_value(body).map_err(|e| CoreError::parse(context, e))?,
            ),
        };

        Ok(Some(document))
    }

    /// Encode into a YAML value with `kind` as the first key
    pub fn to_value(&self) -> Result<Value> {
        let kind = self.kind();
        let body = match self {
            TemplateDocument::Cluster(doc) => serde_yaml::to_value(doc),
            TemplateDocument::ControlPlane(doc) | TemplateDocument::Workers(doc) => {
                serde_yaml::to_value(doc)
            }
            TemplateDocument::Machine(doc) => serde_yaml::to_value(doc),
        }
        .map_err(|e| CoreError::serialize(format!("{} document", kind), e))?;

        let mut mapping = Mapping::new();
        mapping.insert(
            Value::String(KIND_KEY.to_string()),
            Value::String(kind.as_str().to_string()),
        );
        if let Value::Mapping(fields) = body {
            for (key, value) in fields {
                mapping.insert(key, value);
            }
        }

        Ok(Value::Mapping(mapping))
    }

    /// Parse a single-document YAML string
    pub fn parse(yaml: &str) -> Result<Option<Self>> {
        let value: Value =
            serde_yaml::from_str(yaml).map_err(|e| CoreError::parse("template document", e))?;
        Self::from_value(value)
    }

    /// Render the document as YAML (2-space indentation)
    pub fn to_yaml(&self) -> Result<String> {
        let value = self.to_value()?;
        serde_yaml::to_string(&value)
            .map_err(|e| CoreError::serialize(format!("{} document", self.kind()), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_cluster_document() {
        let yaml = r#"
kind: Cluster
name: prod
labels:
  env: prod
kubernetes:
  version: v1.30.1
talos:
  version: v1.7.4
features:
  diskEncryption: true
  backupConfiguration:
    interval: 1h0m0s
systemExtensions:
  - siderolabs/iscsi-tools
"#;
        let doc = TemplateDocument::parse(yaml).unwrap().unwrap();
        let TemplateDocument::Cluster(cluster) = doc else {
            panic!("expected a cluster document");
        };

        assert_eq!(cluster.name, "prod");
        assert_eq!(cluster.labels.get("env").map(String::as_str), Some("prod"));
        assert_eq!(cluster.kubernetes, Some(VersionSettings::new("v1.30.1")));
        assert!(cluster.features.disk_encryption);
        assert!(!cluster.features.enable_workload_proxy);
        assert_eq!(
            cluster.features.backup_configuration.unwrap().interval,
            "1h0m0s"
        );
        assert_eq!(cluster.system_extensions, vec!["siderolabs/iscsi-tools"]);
        assert!(cluster.extra.is_empty());
    }

    #[test]
    fn test_encode_puts_kind_first() {
        let doc = TemplateDocument::Workers(MachineSetDocument {
            name: "workers".to_string(),
            machines: vec!["m-1".to_string(), "m-2".to_string()],
            ..Default::default()
        });

        let yaml = doc.to_yaml().unwrap();
        assert!(yaml.starts_with("kind: Workers\n"));
        assert!(yaml.contains("name: workers"));
        assert!(yaml.contains("- m-1"));
        assert!(!yaml.contains("labels"));
        assert!(!yaml.contains("patches"));
    }

    #[test]
    fn test_unmodeled_fields_survive() {
        let yaml = "kind: ControlPlane\nmachineClass:\n  name: large\n  size: 3\nmachines:\n- a\n";
        let doc = TemplateDocument::parse(yaml).unwrap().unwrap();

        let TemplateDocument::ControlPlane(set) = &doc else {
            panic!("expected a control plane document");
        };
        assert!(set.extra.contains_key("machineClass"));

        let encoded = doc.to_yaml().unwrap();
        assert!(encoded.contains("machineClass:"));
        assert!(encoded.contains("size: 3"));
        assert_eq!(encoded.matches("kind:").count(), 1);
    }

    #[test]
    fn test_unrecognized_discriminators() {
        assert!(TemplateDocument::parse("kind: cluster\nname: a").unwrap().is_none());
        assert!(TemplateDocument::parse("name: a").unwrap().is_none());
        assert!(TemplateDocument::parse("kind: [Cluster]\nname: a").unwrap().is_none());
        assert!(TemplateDocument::parse("- kind: Cluster").unwrap().is_none());
    }

    #[test]
    fn test_missing_name_decodes_empty() {
        let doc = TemplateDocument::parse("kind: Machine\nlocked: true").unwrap().unwrap();
        assert_eq!(doc.name(), "");

        let doc = TemplateDocument::parse("kind: Cluster\nlabels: {a: b}").unwrap().unwrap();
        assert_eq!(doc.name(), "");
        assert!(!doc.to_yaml().unwrap().contains("name"));
    }

    #[test]
    fn test_scalar_labels_read_as_strings() {
        let doc = TemplateDocument::parse(
            "kind: Cluster\nname: prod\nlabels:\n  tier: 1\n  canary: true\nkubernetes:\n  version: 1.30\n",
        )
        .unwrap()
        .unwrap();

        let TemplateDocument::Cluster(cluster) = &doc else {
            panic!("expected a cluster document");
        };
        assert_eq!(cluster.labels["tier"], "1");
        assert_eq!(cluster.labels["canary"], "true");
        assert_eq!(cluster.kubernetes.as_ref().unwrap().version, "1.3");

        let err = TemplateDocument::parse("kind: Cluster\nname: prod\nlabels:\n  tier: [1]\n")
            .unwrap_err();
        assert!(matches!(err, CoreError::Parse { .. }));
    }

    #[test]
    fn test_unmodeled_nested_fields_survive() {
        let yaml = r#"
kind: Cluster
name: prod
kubernetes:
  version: v1.30.1
  extra: keep
features:
  diskEncryption: true
  newFeature: true
  backupConfiguration:
    interval: 1h0m0s
    retention: 7
patches:
  - name: legacy-name
    weight: 10
    inline:
      machine: {}
"#;
        let doc = TemplateDocument::parse(yaml).unwrap().unwrap();
        let encoded = doc.to_yaml().unwrap();

        for expected in [
            "extra: keep",
            "newFeature: true",
            "retention: 7",
            "name: legacy-name",
            "weight: 10",
        ] {
            assert!(encoded.contains(expected), "missing {:?} in:\n{}", expected, encoded);
        }
        assert_eq!(TemplateDocument::parse(&encoded).unwrap().unwrap(), doc);

        let machine = TemplateDocument::parse(
            "kind: Machine\nname: m-1\ninstall:\n  disk: /dev/sda\n  wipe: true\n",
        )
        .unwrap()
        .unwrap();
        assert!(machine.to_yaml().unwrap().contains("wipe: true"));
    }

    #[test]
    fn test_machine_document_install() {
        let doc = TemplateDocument::parse(
            "kind: Machine\nname: 430d882a\nlocked: true\ninstall:\n  disk: /dev/sda\n",
        )
        .unwrap()
        .unwrap();

        let TemplateDocument::Machine(machine) = doc else {
            panic!("expected a machine document");
        };
        assert!(machine.locked);
        assert_eq!(machine.install.unwrap().disk, "/dev/sda");
    }

    #[test]
    fn test_parse_inline_patch() {
        let inline = "machine:\n  network:\n    hostname: cp-1\n";
        let value = Patch::parse_inline(inline).unwrap().unwrap();
        assert!(value.get("machine").is_some());

        assert!(Patch::parse_inline("").unwrap().is_none());
        assert!(Patch::parse_inline("   ").unwrap().is_none());
        assert!(Patch::parse_inline("just a string").is_err());
        assert!(Patch::parse_inline("machine: [").is_err());
    }
}
