//! CLI integration tests for the htan2 binary.
//!
//! Every test runs in its own temp directory and only uses dry runs or
//! local files, so no credentials are needed.

#![allow(deprecated)] // Command::cargo_bin deprecation only affects custom build dirs

use assert_cmd::Command;
use assert_fs::TempDir;
use assert_fs::prelude::*;
use predicates::prelude::*;
use serde_json::Value;

struct TestContext {
    temp_dir: TempDir,
}

impl TestContext {
    fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("htan2").expect("failed to find binary");
        cmd.current_dir(self.temp_dir.path())
            .env("NO_COLOR", "1")
            .env("HOME", self.temp_dir.path())
            .env("XDG_CONFIG_HOME", self.temp_dir.path().join(".config"))
            .env_remove("SYNAPSE_AUTH_TOKEN")
            .env_remove("ORGANIZATION_NAME");
        cmd
    }

    fn write(&self, name: &str, content: &str) {
        let path = self.temp_dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("failed to create dir");
        }
        self.temp_dir
            .child(name)
            .write_str(content)
            .expect("failed to write file");
    }

    fn read(&self, name: &str) -> String {
        std::fs::read_to_string(self.temp_dir.path().join(name)).expect("failed to read file")
    }
}

const BINDING_FILE: &str = "\
schema_bindings:
  file_based:
    BulkWESLevel1:
      projects:
      - name: HTAN2_Ovarian
        subfolder: v8_staging/WES/Level_1
        synapse_id: syn101
      - name: HTAN2_Ovarian
        subfolder: v8_ingest/WES/Level_1
        synapse_id: syn102
  record_based:
    Diagnosis:
      projects:
      - name: HTAN2_Ovarian
        subfolder: v8_staging/Clinical/Diagnosis
        synapse_id: syn103
";

#[test]
fn test_dry_run_folder_create_writes_placeholder_tree() {
    let ctx = TestContext::new();
    ctx.write("projects.yml", "HTAN2_Ovarian: syn111\n");

    ctx.cmd()
        .args(["folders", "create", "--version", "v8", "--tier", "staging", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Provisioned 1 project(s)"));

    let structure = ctx.read("folder_structure_v8.yml");
    assert!(structure.contains("syn_dryrun_"));
    assert!(structure.contains("v8_staging"));
    assert!(!structure.contains("v8_ingest"));

    let bindings = ctx.read("schema_binding_v8.yml");
    assert!(bindings.contains("scRNALevel3_4"));
    assert!(bindings.contains("v8_staging/Clinical/Diagnosis"));
}

#[test]
fn test_folder_create_without_projects_file_fails() {
    let ctx = TestContext::new();

    ctx.cmd()
        .args(["folders", "create", "--version", "v8", "--dry-run"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("projects.yml"));
}

#[test]
fn test_unknown_tier_is_rejected() {
    let ctx = TestContext::new();
    ctx.write("projects.yml", "HTAN2_Ovarian: syn111\n");

    ctx.cmd()
        .args(["folders", "create", "--version", "v8", "--tier", "archive", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown tier"));
}

#[test]
fn test_merge_is_repeatable() {
    let ctx = TestContext::new();
    ctx.write("schema_binding_v8.yml", BINDING_FILE);

    ctx.cmd()
        .args(["bindings", "merge", "--schema-binding-file", "schema_binding_v8.yml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added: 3"));

    ctx.cmd()
        .args(["bindings", "merge", "--schema-binding-file", "schema_binding_v8.yml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added: 0"))
        .stdout(predicate::str::contains("Unchanged: 3"));

    let config = ctx.read("schema_binding_config.yml");
    assert_eq!(config.matches("subfolder: v8_staging/WES/Level_1").count(), 1);
}

#[test]
fn test_merge_dry_run_leaves_config_alone() {
    let ctx = TestContext::new();
    ctx.write("schema_binding_v8.yml", BINDING_FILE);

    ctx.cmd()
        .args([
            "bindings",
            "merge",
            "--schema-binding-file",
            "schema_binding_v8.yml",
            "--tier-filter",
            "v8_staging",
            "--dry-run",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added: 2"))
        .stdout(predicate::str::contains("Filtered out: 1"));

    assert!(!ctx.temp_dir.path().join("schema_binding_config.yml").exists());
}

#[test]
fn test_merge_missing_binding_file_fails() {
    let ctx = TestContext::new();

    ctx.cmd()
        .args(["bindings", "merge", "--schema-binding-file", "nope.yml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope.yml"));
}

#[test]
fn test_bind_all_dry_run_records_skips() {
    let ctx = TestContext::new();
    ctx.write("schema_binding_config.yml", BINDING_FILE);
    ctx.write("schemas/HTAN.BulkWESLevel1-v1.0.0-schema.json", "{}");

    ctx.cmd()
        .args(["schema", "bind-all", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Skipped: 2"));

    let results: Value = serde_json::from_str(&ctx.read("binding_results.json")).unwrap();
    assert_eq!(results["skipped"].as_array().unwrap().len(), 2);
    assert_eq!(results["successful"].as_array().unwrap().len(), 0);
    assert!(results["generated_at"].is_string());
}

#[test]
fn test_fileviews_backfill_from_results() {
    let ctx = TestContext::new();
    ctx.write("schema_binding_config.yml", BINDING_FILE);
    ctx.write(
        "binding_results.json",
        r#"{"successful": [{"schema": "BulkWESLevel1", "project": "HTAN2_Ovarian",
            "subfolder": "v8_staging/WES/Level_1", "synapse_id": "syn101",
            "fileview_id": "syn901"}]}"#,
    );

    ctx.cmd()
        .args(["bindings", "fileviews", "--results-file", "binding_results.json"])
        .assert()
        .success();

    let config = ctx.read("schema_binding_config.yml");
    assert!(config.contains("fileview_id: syn901"));
}

#[test]
fn test_live_command_without_token_fails() {
    let ctx = TestContext::new();

    ctx.cmd()
        .args(["report", "validate-one", "--folder-id", "syn1", "--fileview-id", "syn2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("SYNAPSE_AUTH_TOKEN"));
}
