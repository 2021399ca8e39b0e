//! Compose command - join template fragments into one cluster template

use console::style;
use omni_core::TemplateBundle;
use std::path::{Path, PathBuf};

use crate::error::{CliError, Result};
use crate::util::{document_count, read_input, write_file};

pub fn run(
    cluster: &Path,
    control_plane: &Path,
    workers: &[PathBuf],
    machines: &[PathBuf],
    output: Option<&Path>,
) -> Result<()> {
    let mut bundle = TemplateBundle::new(read_input(cluster)?, read_input(control_plane)?);
    for path in workers {
        bundle = bundle.with_worker(read_input(path)?);
    }
    for path in machines {
        bundle = bundle.with_machine(read_input(path)?);
    }

    let template = bundle.compose().map_err(|e| {
        CliError::template_with_help(
            e.to_string(),
            format!(
                "{} document(s) composed before the failing fragment",
                document_count(&e.partial)
            ),
        )
    })?;

    match output {
        Some(path) => {
            write_file(path, &template)?;
            eprintln!(
                "{} Composed {} document(s) into {}",
                style("✓").green(),
                document_count(&template),
                path.display()
            );
        }
        None => print!("{}", template),
    }

    Ok(())
}
