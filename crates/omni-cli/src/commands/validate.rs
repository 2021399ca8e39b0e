//! Validate command - structural checks on a cluster template

use console::style;
use omni_core::CoreError;
use serde::Serialize;
use std::path::Path;

use crate::display::print_problems;
use crate::error::{CliError, Result};
use crate::util::read_input;

#[derive(Debug, Serialize)]
struct ValidationOutput {
    valid: bool,
    cluster: Option<String>,
    workers: usize,
    machines: usize,
    problems: Vec<String>,
}

pub fn run(file: &Path, json_output: bool) -> Result<()> {
    let stream = read_input(file)?;
    let report = check(&stream);

    if json_output {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if report.valid {
        println!(
            "{} {} is a valid cluster template",
            style("✓").green(),
            file.display()
        );
        println!(
            "  cluster `{}`, {} worker set(s), {} machine(s)",
            report.cluster.as_deref().unwrap_or_default(),
            report.workers,
            report.machines
        );
    } else {
        println!(
            "{} {} has {} problem(s)",
            style("✗").red(),
            file.display(),
            report.problems.len()
        );
        print_problems(&report.problems);
    }

    if report.valid {
        Ok(())
    } else {
        Err(CliError::validation_with_help(
            format!("{} problem(s) found in {}", report.problems.len(), file.display()),
            "fix the problems above and run validate again",
        ))
    }
}

fn check(stream: &str) -> ValidationOutput {
    match omni_core::validate(stream) {
        Ok(bundle) => ValidationOutput {
            valid: true,
            cluster: omni_core::cluster_name(stream).ok(),
            workers: bundle.workers.len(),
            machines: bundle.machines.len(),
            problems: Vec::new(),
        },
        Err(err) => {
            let problems = match err {
                CoreError::InvalidTemplate { problems } => problems,
                other => vec![other.to_string()],
            };
            ValidationOutput {
                valid: false,
                cluster: omni_core::cluster_name(stream).ok(),
                workers: 0,
                machines: 0,
                problems,
            }
        }
    }
}
