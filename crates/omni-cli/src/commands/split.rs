//! Split command - break a cluster template into fragments

use console::style;
use omni_core::{SplitMode, TemplateBundle};
use std::path::{Path, PathBuf};

use crate::display::bundle_summary;
use crate::error::{CliError, Result};
use crate::util::{read_input, write_file};

pub fn run(file: &Path, output_dir: Option<&Path>, strict: bool) -> Result<()> {
    let stream = read_input(file)?;
    let mode = if strict {
        SplitMode::Strict
    } else {
        SplitMode::Lenient
    };

    let bundle = omni_core::split_with_mode(&stream, mode).map_err(|e| CliError::from(e.source))?;

    match output_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(|e| CliError::io_at(dir, e))?;
            for (path, fragment) in fragment_files(dir, &bundle) {
                write_file(&path, fragment)?;
                println!("{} Wrote {}", style("✓").green(), path.display());
            }
        }
        None => {
            println!(
                "{} Split {} into {} document(s)",
                style("→").blue(),
                file.display(),
                bundle.len()
            );
            for line in bundle_summary(&bundle) {
                println!("  {}", line);
            }
        }
    }

    Ok(())
}

/// Target file for each present fragment
fn fragment_files<'a>(dir: &Path, bundle: &'a TemplateBundle) -> Vec<(PathBuf, &'a str)> {
    let mut files = Vec::new();
    if !bundle.cluster.is_empty() {
        files.push((dir.join("cluster.yaml"), bundle.cluster.as_str()));
    }
    if !bundle.control_plane.is_empty() {
        files.push((dir.join("control-plane.yaml"), bundle.control_plane.as_str()));
    }
    for (i, workers) in bundle.workers.iter().enumerate() {
        files.push((dir.join(format!("workers-{}.yaml", i)), workers.as_str()));
    }
    for (i, machine) in bundle.machines.iter().enumerate() {
        files.push((dir.join(format!("machine-{}.yaml", i)), machine.as_str()));
    }
    files
}
