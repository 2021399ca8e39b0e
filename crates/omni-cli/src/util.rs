//! Shared helpers for reading and writing templates

use std::io::Read;
use std::path::Path;

use crate::error::{CliError, Result};

/// Read a template from a file, or from stdin when the path is `-`
pub fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut input = String::new();
        std::io::stdin().read_to_string(&mut input)?;
        return Ok(input);
    }
    std::fs::read_to_string(path).map_err(|e| CliError::io_at(path, e))
}

pub fn write_file(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content).map_err(|e| CliError::io_at(path, e))
}

/// Number of documents in a composed stream
#[must_use]
pub fn document_count(stream: &str) -> usize {
    if stream.trim().is_empty() {
        0
    } else {
        stream.matches("\n---\n").count() + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_count() {
        assert_eq!(document_count(""), 0);
        assert_eq!(document_count("kind: Cluster\nname: a\n"), 1);
        assert_eq!(
            document_count("kind: Cluster\nname: a\n---\nkind: ControlPlane\n"),
            2
        );
    }

    #[test]
    fn test_read_input_names_missing_file() {
        let err = read_input(Path::new("/nonexistent/cluster.yaml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/cluster.yaml"));
    }
}
