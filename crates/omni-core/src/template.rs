//! Cluster template composition and splitting
//!
//! A cluster template is a multi-document YAML stream holding one Cluster
//! document, one ControlPlane machine set, any number of Workers machine sets
//! and any number of Machine documents. The provider keeps each document as a
//! separate fragment; this module turns the fragments into one stream and the
//! stream back into fragments.

use std::collections::{HashMap, HashSet};

use serde::Deserialize;
use serde_yaml::Value;

use crate::document::TemplateDocument;
use crate::error::{ComposeError, CoreError, Result, SplitError};
use crate::kind::{DocumentKind, suggest_kind};

/// Separator emitted between documents of a composed stream
const DOCUMENT_SEPARATOR: &str = "---\n";

/// How the splitter treats documents without a recognized `kind`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SplitMode {
    /// Drop them silently
    #[default]
    Lenient,
    /// Fail with `UnknownKind` / `MissingKind`
    Strict,
}

/// The fragments of a cluster template, grouped by kind
///
/// Empty strings stand for absent documents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateBundle {
    pub cluster: String,
    pub control_plane: String,
    pub workers: Vec<String>,
    pub machines: Vec<String>,
}

impl TemplateBundle {
    pub fn new(cluster: impl Into<String>, control_plane: impl Into<String>) -> Self {
        Self {
            cluster: cluster.into(),
            control_plane: control_plane.into(),
            workers: Vec::new(),
            machines: Vec::new(),
        }
    }

    pub fn with_worker(mut self, worker: impl Into<String>) -> Self {
        self.workers.push(worker.into());
        self
    }

    pub fn with_machine(mut self, machine: impl Into<String>) -> Self {
        self.machines.push(machine.into());
        self
    }

    /// Total number of present fragments
    pub fn len(&self) -> usize {
        let singles = [&self.cluster, &self.control_plane]
            .iter()
            .filter(|s| !s.is_empty())
            .count();
        singles + self.workers.len() + self.machines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn compose(&self) -> std::result::Result<String, ComposeError> {
        compose(self)
    }

    fn insert(&mut self, kind: DocumentKind, yaml: String) {
        match kind {
            DocumentKind::Cluster => self.cluster = yaml,
            DocumentKind::ControlPlane => self.control_plane = yaml,
            DocumentKind::Workers => self.workers.push(yaml),
            DocumentKind::Machine => self.machines.push(yaml),
        }
    }
}

/// Compose the fragments into one multi-document stream
///
/// Output order is cluster, control plane, workers, machines. Empty fragments
/// are skipped. On failure the error carries everything composed so far.
pub fn compose(bundle: &TemplateBundle) -> std::result::Result<String, ComposeError> {
    let fragments = std::iter::once(("cluster template".to_string(), &bundle.cluster))
        .chain(std::iter::once((
            "control plane template".to_string(),
            &bundle.control_plane,
        )))
        .chain(
            bundle
                .workers
                .iter()
                .enumerate()
                .map(|(i, w)| (format!("workers template #{}", i), w)),
        )
        .chain(
            bundle
                .machines
                .iter()
                .enumerate()
                .map(|(i, m)| (format!("machine template #{}", i), m)),
        );

    let mut output = String::new();
    let mut count = 0;

    for (context, fragment) in fragments {
        if fragment.trim().is_empty() {
            continue;
        }

        let encoded = match encode_fragment(&context, fragment, count) {
            Ok(encoded) => encoded,
            Err(source) => {
                return Err(ComposeError {
                    partial: output,
                    source,
                });
            }
        };

        if count > 0 {
            output.push_str(DOCUMENT_SEPARATOR);
        }
        output.push_str(&encoded);
        count += 1;
    }

    tracing::debug!(documents = count, "composed cluster template:\n{}", output);
    Ok(output)
}

fn encode_fragment(context: &str, fragment: &str, index: usize) -> Result<String> {
    let value: Value =
        serde_yaml::from_str(fragment).map_err(|e| CoreError::parse(context, e))?;

    let raw_kind = TemplateDocument::raw_kind(&value).map(str::to_string);
    match TemplateDocument::from_value(value)? {
        Some(document) => document.to_yaml(),
        None => Err(unrecognized(index, raw_kind)),
    }
}

fn unrecognized(index: usize, raw_kind: Option<String>) -> CoreError {
    match raw_kind {
        Some(kind) => CoreError::UnknownKind {
            index,
            suggestion: suggest_kind(&kind),
            kind,
        },
        None => CoreError::MissingKind { index },
    }
}

/// Split a multi-document stream into fragments (lenient mode)
pub fn split(stream: &str) -> std::result::Result<TemplateBundle, SplitError> {
    split_with_mode(stream, SplitMode::Lenient)
}

/// Split a multi-document stream into fragments
///
/// Documents are decoded one at a time. A later Cluster or ControlPlane
/// document replaces an earlier one; Workers and Machine documents keep their
/// encounter order.
pub fn split_with_mode(
    stream: &str,
    mode: SplitMode,
) -> std::result::Result<TemplateBundle, SplitError> {
    let mut bundle = TemplateBundle::default();

    let result = for_each_document(stream, mode, |_, document| {
        let yaml = document.to_yaml()?;
        bundle.insert(document.kind(), yaml);
        Ok(())
    });

    match result {
        Ok(()) => {
            tracing::debug!(
                workers = bundle.workers.len(),
                machines = bundle.machines.len(),
                "split cluster template"
            );
            Ok(bundle)
        }
        Err(source) => Err(SplitError {
            partial: bundle,
            source,
        }),
    }
}

/// Decode every recognized document of a stream, in order
fn for_each_document<F>(stream: &str, mode: SplitMode, mut visit: F) -> Result<()>
where
    F: FnMut(usize, TemplateDocument) -> Result<()>,
{
    for (index, document) in serde_yaml::Deserializer::from_str(stream).enumerate() {
        let value = Value::deserialize(document)
            .map_err(|e| CoreError::parse(format!("document {}", index), e))?;

        if value.is_null() {
            continue;
        }

        let raw_kind = TemplateDocument::raw_kind(&value).map(str::to_string);
        match TemplateDocument::from_value(value)? {
            Some(document) => visit(index, document)?,
            None if mode == SplitMode::Strict => return Err(unrecognized(index, raw_kind)),
            None => {
                tracing::debug!(
                    index,
                    kind = raw_kind.as_deref().unwrap_or("<none>"),
                    "dropping document without a recognized kind"
                );
            }
        }
    }

    Ok(())
}

/// Name of the cluster described by a template stream
pub fn cluster_name(stream: &str) -> Result<String> {
    let mut name = None;
    for_each_document(stream, SplitMode::Lenient, |_, document| {
        if let TemplateDocument::Cluster(cluster) = document {
            name = Some(cluster.name);
        }
        Ok(())
    })?;

    name.ok_or(CoreError::MissingDocument {
        kind: DocumentKind::Cluster,
    })
}

/// Validate a full cluster template and return its fragments
///
/// Every document must have a recognized kind. Problems found by the
/// structural checks are reported together.
pub fn validate(stream: &str) -> Result<TemplateBundle> {
    let mut documents = Vec::new();
    for_each_document(stream, SplitMode::Strict, |_, document| {
        documents.push(document);
        Ok(())
    })?;

    let mut problems = Vec::new();
    let count = |kind: DocumentKind| documents.iter().filter(|d| d.kind() == kind).count();

    match count(DocumentKind::Cluster) {
        0 => problems.push("template has no Cluster document".to_string()),
        1 => {}
        n => problems.push(format!("template has {} Cluster documents, expected 1", n)),
    }
    match count(DocumentKind::ControlPlane) {
        0 => problems.push("template has no ControlPlane document".to_string()),
        1 => {}
        n => problems.push(format!(
            "template has {} ControlPlane documents, expected 1",
            n
        )),
    }

    let mut worker_names = HashSet::new();
    let mut machine_names = HashSet::new();
    let mut machine_owners: HashMap<&str, &str> = HashMap::new();

    for document in &documents {
        match document {
            TemplateDocument::Cluster(cluster) if cluster.name.trim().is_empty() => {
                problems.push("Cluster document has an empty name".to_string());
            }
            TemplateDocument::Workers(set) if set.name.trim().is_empty() => {
                problems.push("Workers document has an empty name".to_string());
            }
            TemplateDocument::Workers(set) if !worker_names.insert(set.name.as_str()) => {
                problems.push(format!("Workers `{}` is defined more than once", set.name));
            }
            TemplateDocument::Machine(machine) if machine.name.trim().is_empty() => {
                problems.push("Machine document has an empty name".to_string());
            }
            TemplateDocument::Machine(machine) if !machine_names.insert(machine.name.as_str()) => {
                problems.push(format!("Machine `{}` is defined more than once", machine.name));
            }
            _ => {}
        }

        if let TemplateDocument::ControlPlane(set) | TemplateDocument::Workers(set) = document {
            let owner = if set.name.is_empty() {
                document.kind().as_str()
            } else {
                set.name.as_str()
            };
            for machine in &set.machines {
                if let Some(previous) = machine_owners.insert(machine.as_str(), owner) {
                    problems.push(format!(
                        "machine `{}` belongs to both `{}` and `{}`",
                        machine, previous, owner
                    ));
                }
            }
        }
    }

    if !problems.is_empty() {
        return Err(CoreError::InvalidTemplate { problems });
    }

    let mut bundle = TemplateBundle::default();
    for document in documents {
        let yaml = document.to_yaml()?;
        bundle.insert(document.kind(), yaml);
    }
    Ok(bundle)
}
