//! Template document kinds
//!
//! Every document of an Omni cluster template carries a `kind` field at the
//! top of its mapping. Matching is exact and case-sensitive.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Maximum Levenshtein distance to consider for suggestions
const MAX_SUGGESTION_DISTANCE: usize = 3;

pub const KIND_CLUSTER: &str = "Cluster";
pub const KIND_CONTROL_PLANE: &str = "ControlPlane";
pub const KIND_WORKERS: &str = "Workers";
pub const KIND_MACHINE: &str = "Machine";

/// Discriminator of a template document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentKind {
    Cluster,
    ControlPlane,
    Workers,
    Machine,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 4] = [
        DocumentKind::Cluster,
        DocumentKind::ControlPlane,
        DocumentKind::Workers,
        DocumentKind::Machine,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Cluster => KIND_CLUSTER,
            DocumentKind::ControlPlane => KIND_CONTROL_PLANE,
            DocumentKind::Workers => KIND_WORKERS,
            DocumentKind::Machine => KIND_MACHINE,
        }
    }

    /// Whether this kind describes a machine set
    pub fn is_machine_set(&self) -> bool {
        matches!(self, DocumentKind::ControlPlane | DocumentKind::Workers)
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not one of the four recognized kinds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnrecognizedKind(pub String);

impl fmt::Display for UnrecognizedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unrecognized document kind `{}`", self.0)
    }
}

impl std::error::Error for UnrecognizedKind {}

impl FromStr for DocumentKind {
    type Err = UnrecognizedKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            KIND_CLUSTER => Ok(DocumentKind::Cluster),
            KIND_CONTROL_PLANE => Ok(DocumentKind::ControlPlane),
            KIND_WORKERS => Ok(DocumentKind::Workers),
            KIND_MACHINE => Ok(DocumentKind::Machine),
            other => Err(UnrecognizedKind(other.to_string())),
        }
    }
}

/// Closest recognized kind for a misspelled discriminator
pub fn suggest_kind(input: &str) -> Option<&'static str> {
    DocumentKind::ALL
        .iter()
        .map(|kind| (kind.as_str(), strsim::levenshtein(input, kind.as_str())))
        .filter(|(_, distance)| *distance > 0 && *distance <= MAX_SUGGESTION_DISTANCE)
        .min_by_key(|(_, distance)| *distance)
        .map(|(kind, _)| kind)
}
