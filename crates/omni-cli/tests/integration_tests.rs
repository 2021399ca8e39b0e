//! Integration tests for CLI commands

use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::io::Write;

use tempfile::TempDir;

/// Helper to run the omni-template binary
fn omni_template(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_omni-template"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute omni-template")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

const TEMPLATE: &str = "kind: Cluster\nname: prod\n---\nkind: ControlPlane\nmachines:\n- cp-1\n---\nkind: Workers\nname: general\nmachines:\n- w-1\n---\nkind: Machine\nname: cp-1\n";

mod compose_command {
    use super::*;

    #[test]
    fn test_compose_to_stdout() {
        let dir = TempDir::new().unwrap();
        let cluster = write(dir.path(), "cluster.yaml", "name: prod\nkind: Cluster\n");
        let control_plane = write(dir.path(), "cp.yaml", "kind: ControlPlane\nname: cp\n");
        let workers = write(dir.path(), "workers.yaml", "kind: Workers\nname: wk\n");

        let output = omni_template(&[
            "compose",
            "--cluster",
            arg(&cluster),
            "--control-plane",
            arg(&control_plane),
            "--workers",
            arg(&workers),
        ]);

        assert!(output.status.success(), "stderr: {}", stderr(&output));
        insta::assert_snapshot!(stdout(&output), @r"
        kind: Cluster
        name: prod
        ---
        kind: ControlPlane
        name: cp
        ---
        kind: Workers
        name: wk
        ");
    }

    #[test]
    fn test_compose_to_file() {
        let dir = TempDir::new().unwrap();
        let cluster = write(dir.path(), "cluster.yaml", "kind: Cluster\nname: prod\n");
        let control_plane = write(dir.path(), "cp.yaml", "kind: ControlPlane\n");
        let machine = write(dir.path(), "m.yaml", "kind: Machine\nname: cp-1\n");
        let out = dir.path().join("template.yaml");

        let output = omni_template(&[
            "compose",
            "--cluster",
            arg(&cluster),
            "--control-plane",
            arg(&control_plane),
            "--machines",
            arg(&machine),
            "-o",
            arg(&out),
        ]);

        assert!(output.status.success(), "stderr: {}", stderr(&output));
        assert!(stderr(&output).contains("Composed 3 document(s)"));
        let written = std::fs::read_to_string(&out).unwrap();
        assert!(written.ends_with("kind: Machine\nname: cp-1\n"));
    }

    #[test]
    fn test_compose_rejects_unknown_kind() {
        let dir = TempDir::new().unwrap();
        let cluster = write(dir.path(), "cluster.yaml", "kind: Cluster\nname: prod\n");
        let control_plane = write(dir.path(), "cp.yaml", "kind: ControlPlanes\n");

        let output = omni_template(&[
            "compose",
            "--cluster",
            arg(&cluster),
            "--control-plane",
            arg(&control_plane),
        ]);

        assert_eq!(output.status.code(), Some(3));
        assert!(stderr(&output).contains("ControlPlane"));
    }

    #[test]
    fn test_compose_missing_file() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.yaml");

        let output = omni_template(&[
            "compose",
            "--cluster",
            arg(&missing),
            "--control-plane",
            arg(&missing),
        ]);

        assert_eq!(output.status.code(), Some(5));
        assert!(stderr(&output).contains("missing.yaml"));
    }
}

mod split_command {
    use super::*;

    #[test]
    fn test_split_writes_fragments() {
        let dir = TempDir::new().unwrap();
        let template = write(dir.path(), "template.yaml", TEMPLATE);
        let out = dir.path().join("fragments");

        let output = omni_template(&["split", arg(&template), "--output-dir", arg(&out)]);

        assert!(output.status.success(), "stderr: {}", stderr(&output));
        for name in [
            "cluster.yaml",
            "control-plane.yaml",
            "workers-0.yaml",
            "machine-0.yaml",
        ] {
            assert!(out.join(name).exists(), "missing {}", name);
        }
        assert_eq!(
            std::fs::read_to_string(out.join("cluster.yaml")).unwrap(),
            "kind: Cluster\nname: prod\n"
        );
    }

    #[test]
    fn test_split_summary_from_stdin() {
        let mut child = Command::new(env!("CARGO_BIN_EXE_omni-template"))
            .args(["split", "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .unwrap();
        child
            .stdin
            .take()
            .unwrap()
            .write_all(TEMPLATE.as_bytes())
            .unwrap();
        let output = child.wait_with_output().unwrap();

        assert!(output.status.success());
        let out = stdout(&output);
        assert!(out.contains("into 4 document(s)"));
        assert!(out.contains("Workers       general (1 machine(s))"));
        assert!(out.contains("Machine       cp-1"));
    }

    #[test]
    fn test_split_strict_rejects_unknown_documents() {
        let dir = TempDir::new().unwrap();
        let template = write(
            dir.path(),
            "template.yaml",
            "kind: Cluster\nname: prod\n---\napiVersion: v1\nkind: ConfigMap\n",
        );

        let lenient = omni_template(&["split", arg(&template)]);
        assert!(lenient.status.success());
        assert!(stdout(&lenient).contains("into 1 document(s)"));

        let strict = omni_template(&["split", arg(&template), "--strict"]);
        assert_eq!(strict.status.code(), Some(3));
        assert!(stderr(&strict).contains("ConfigMap"));
    }
}

mod validate_command {
    use super::*;

    #[test]
    fn test_validate_valid_template() {
        let dir = TempDir::new().unwrap();
        let template = write(dir.path(), "template.yaml", TEMPLATE);

        let output = omni_template(&["validate", arg(&template)]);

        assert!(output.status.success(), "stderr: {}", stderr(&output));
        let out = stdout(&output);
        assert!(out.contains("is a valid cluster template"));
        assert!(out.contains("cluster `prod`, 1 worker set(s), 1 machine(s)"));
    }

    #[test]
    fn test_validate_reports_problems() {
        let dir = TempDir::new().unwrap();
        let template = write(
            dir.path(),
            "template.yaml",
            "kind: Cluster\nname: prod\n---\nkind: ControlPlane\nmachines: [m-1]\n---\nkind: Workers\nname: general\nmachines: [m-1]\n",
        );

        let output = omni_template(&["validate", arg(&template)]);

        assert_eq!(output.status.code(), Some(2));
        let out = stdout(&output);
        assert!(out.contains("1 problem(s)"));
        assert!(out.contains("machine `m-1` belongs to both `ControlPlane` and `general`"));
    }

    #[test]
    fn test_validate_json_output() {
        let dir = TempDir::new().unwrap();
        let template = write(dir.path(), "template.yaml", "kind: Cluster\nname: prod\n");

        let output = omni_template(&["validate", arg(&template), "--json"]);

        assert_eq!(output.status.code(), Some(2));
        let json: serde_json::Value =
            serde_json::from_str(&stdout(&output)).expect("Output should be valid JSON");
        assert_eq!(json["valid"], false);
        assert_eq!(json["cluster"], "prod");
        assert_eq!(
            json["problems"][0],
            "template has no ControlPlane document"
        );
    }
}

mod diff_command {
    use super::*;

    #[test]
    fn test_diff_equivalent_templates() {
        let dir = TempDir::new().unwrap();
        let old = write(dir.path(), "old.yaml", "kind: Cluster\nname: prod\n");
        let new = write(dir.path(), "new.yaml", "name: prod\nkind: Cluster\n");

        let output = omni_template(&["diff", arg(&old), arg(&new)]);

        assert!(output.status.success());
        let out = stdout(&output);
        assert!(out.contains("Templates are equivalent"));
        assert!(out.contains("formatting differs"));
    }

    #[test]
    fn test_diff_shows_changed_lines() {
        let dir = TempDir::new().unwrap();
        let old = write(dir.path(), "old.yaml", "kind: Cluster\nname: prod\n");
        let new = write(dir.path(), "new.yaml", "kind: Cluster\nname: staging\n");

        let output = omni_template(&["diff", arg(&old), arg(&new)]);

        assert!(output.status.success());
        let out = stdout(&output);
        assert!(out.contains("Templates differ"));
        assert!(out.contains("-name: prod"));
        assert!(out.contains("+name: staging"));
    }
}

#[test]
fn test_debug_flag_logs_to_stderr() {
    let dir = TempDir::new().unwrap();
    let template = write(dir.path(), "template.yaml", TEMPLATE);

    let output = omni_template(&["--debug", "split", arg(&template)]);

    assert!(output.status.success());
    assert!(stderr(&output).contains("split cluster template"));
    assert!(!stdout(&output).contains("split cluster template"));
}
