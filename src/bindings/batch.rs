//! Batch binding driver and retry pass.
//!
//! Each binding runs the binder as a separate process under a wall-clock
//! limit. Outcomes are folded into a [`BindingResults`]; no single failure
//! stops the batch.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tokio::process::Command;
use tokio::runtime::Runtime;
use tracing::{info, warn};

use super::binder::SchemaName;
use crate::catalog::Category;
use crate::config::files::{BindingOutcome, BindingResults, SchemaBindingConfig, read_json};
use crate::error::{Error, Result};

pub const MAX_ERROR_LEN: usize = 500;

static FILEVIEW_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^fileview: (syn\d+)\s*$").expect("fileview line regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindJob {
    pub schema: String,
    pub category: Option<Category>,
    pub project: String,
    pub subfolder: String,
    pub synapse_id: String,
    pub schema_file: PathBuf,
}

impl BindJob {
    fn outcome(&self) -> BindingOutcome {
        BindingOutcome {
            schema: self.schema.clone(),
            category: self.category,
            project: self.project.clone(),
            subfolder: self.subfolder.clone(),
            synapse_id: self.synapse_id.clone(),
            schema_file: Some(self.schema_file.display().to_string()),
            fileview_id: None,
            error: None,
            reason: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Succeeded { fileview_id: Option<String> },
    Failed(String),
    TimedOut(Duration),
    Skipped(String),
}

/// Runs one binding. Implementations must not panic on failure; every
/// problem is reported through [`RunOutcome`].
pub trait BindRunner {
    fn run(&self, job: &BindJob, timeout: Duration) -> RunOutcome;
}

/// Runs `htan2 schema bind` as a child process, killing it on timeout.
pub struct SubprocessRunner {
    runtime: Runtime,
    program: PathBuf,
    organization: String,
    settings: Option<PathBuf>,
}

impl SubprocessRunner {
    pub fn new(program: PathBuf, organization: &str, settings: Option<PathBuf>) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self {
            runtime,
            program,
            organization: organization.to_string(),
            settings,
        })
    }

    fn command(&self, job: &BindJob) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(["schema", "bind", "--path"])
            .arg(&job.schema_file)
            .args(["--target", job.synapse_id.as_str(), "--org", self.organization.as_str()])
            .arg("--create-fileview");
        if let Some(settings) = &self.settings {
            cmd.arg("--settings").arg(settings);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

impl BindRunner for SubprocessRunner {
    fn run(&self, job: &BindJob, timeout: Duration) -> RunOutcome {
        let mut cmd = self.command(job);
        let output = self.runtime.block_on(async {
            let child = cmd.spawn()?;
            Ok::<_, std::io::Error>(tokio::time::timeout(timeout, child.wait_with_output()).await)
        });

        match output {
            Err(e) => RunOutcome::Failed(format!("could not start binder: {e}")),
            Ok(Err(_elapsed)) => RunOutcome::TimedOut(timeout),
            Ok(Ok(Err(e))) => RunOutcome::Failed(e.to_string()),
            Ok(Ok(Ok(output))) => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                if output.status.success() {
                    RunOutcome::Succeeded {
                        fileview_id: parse_fileview_line(&stdout),
                    }
                } else {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    let message = if stderr.trim().is_empty() {
                        format!("binder exited with {}", output.status)
                    } else {
                        stderr.trim().to_string()
                    };
                    RunOutcome::Failed(message)
                }
            }
        }
    }
}

/// Runner for dry runs: reports every job as skipped.
pub struct DryRunRunner;

impl BindRunner for DryRunRunner {
    fn run(&self, job: &BindJob, _timeout: Duration) -> RunOutcome {
        info!("dry run: would bind {} to {}", job.schema, job.synapse_id);
        RunOutcome::Skipped("dry run".to_string())
    }
}

/// Reads the `fileview: synNNN` line the binder prints on success.
#[must_use]
pub fn parse_fileview_line(stdout: &str) -> Option<String> {
    FILEVIEW_LINE.captures(stdout).map(|c| c[1].to_string())
}

/// Cuts `message` to at most [`MAX_ERROR_LEN`] characters.
#[must_use]
pub fn truncate(message: &str) -> String {
    message.chars().take(MAX_ERROR_LEN).collect()
}

/// `.json` files directly under `dir`, sorted by name.
pub fn list_schema_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::Config(format!("schemas dir {} not found", dir.display())));
    }
    let pattern = dir.join("*.json");
    let entries = glob::glob(&pattern.to_string_lossy())
        .map_err(|e| Error::Config(format!("bad schemas dir {}: {e}", dir.display())))?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_file())
        .collect();
    files.sort();
    Ok(files)
}

/// Picks the file for `schema`: a file whose parsed component equals the
/// schema name, else the first whose name contains it ignoring case.
#[must_use]
pub fn resolve_schema_file(schema: &str, files: &[PathBuf]) -> Option<PathBuf> {
    fn file_name(path: &Path) -> Option<String> {
        path.file_name().and_then(|n| n.to_str()).map(str::to_string)
    }
    let exact = files.iter().find(|path| {
        file_name(path)
            .and_then(|name| SchemaName::from_file_name(&name).ok())
            .is_some_and(|parsed| parsed.component == schema)
    });
    let needle = schema.to_lowercase();
    exact
        .or_else(|| {
            files.iter().find(|path| {
                file_name(path).is_some_and(|name| name.to_lowercase().contains(&needle))
            })
        })
        .cloned()
}

#[derive(Debug, Clone, Copy)]
pub struct BatchOptions {
    pub timeout: Duration,
    pub include_record_based: bool,
}

/// Binds every recorded binding in `config`.
pub fn bind_all(
    config: &SchemaBindingConfig,
    schemas_dir: &Path,
    runner: &dyn BindRunner,
    options: BatchOptions,
) -> Result<BindingResults> {
    let files = list_schema_files(schemas_dir)?;
    let mut results = BindingResults::default();
    let selected: Vec<_> = config
        .entries()
        .filter(|(category, _, _)| options.include_record_based || *category == Category::FileBased)
        .collect();
    let total = selected.len();

    for (index, (category, schema, record)) in selected.into_iter().enumerate() {
        let skipped = |reason: &str| BindingOutcome {
            schema: schema.to_string(),
            category: Some(category),
            project: record.name.clone(),
            subfolder: record.subfolder.clone(),
            synapse_id: record.synapse_id.clone().unwrap_or_default(),
            schema_file: None,
            fileview_id: None,
            error: None,
            reason: Some(reason.to_string()),
        };
        let Some(synapse_id) = record.synapse_id.clone() else {
            warn!("{schema} for {} has no folder id; skipping", record.name);
            results.skipped.push(skipped("no folder id"));
            continue;
        };
        let Some(schema_file) = resolve_schema_file(schema, &files) else {
            warn!("schema file for {schema} not found in {}", schemas_dir.display());
            results.skipped.push(skipped("schema file not found"));
            continue;
        };

        info!("[{}/{total}] binding {schema} to {} ({synapse_id})", index + 1, record.name);
        let job = BindJob {
            schema: schema.to_string(),
            category: Some(category),
            project: record.name.clone(),
            subfolder: record.subfolder.clone(),
            synapse_id,
            schema_file,
        };
        fold(&mut results, &job, runner.run(&job, options.timeout));
    }
    Ok(results)
}

/// Failed entries of every readable results file, deduplicated by
/// (schema, project, folder id). Unreadable files are logged and skipped.
#[must_use]
pub fn load_failed(results_files: &[PathBuf]) -> Vec<BindingOutcome> {
    let mut seen = HashSet::new();
    let mut failed = Vec::new();
    for path in results_files {
        let results: BindingResults = match read_json(path) {
            Ok(results) => results,
            Err(e) => {
                warn!("skipping {}: {e}", path.display());
                continue;
            }
        };
        info!("found {} failed bindings in {}", results.failed.len(), path.display());
        for outcome in results.failed {
            let key = (outcome.schema.clone(), outcome.project.clone(), outcome.synapse_id.clone());
            if seen.insert(key) {
                failed.push(outcome);
            }
        }
    }
    failed
}

/// Re-runs previously failed bindings with `timeout`. A binding without a
/// recorded schema file is resolved against `schemas_dir`.
pub fn retry_failed(
    results_files: &[PathBuf],
    schemas_dir: &Path,
    runner: &dyn BindRunner,
    timeout: Duration,
) -> BindingResults {
    let failed = load_failed(results_files);
    let files = list_schema_files(schemas_dir).unwrap_or_else(|e| {
        warn!("{e}");
        Vec::new()
    });
    let mut results = BindingResults::default();
    let total = failed.len();

    for (index, previous) in failed.into_iter().enumerate() {
        let schema_file = previous
            .schema_file
            .as_ref()
            .map(PathBuf::from)
            .filter(|path| path.exists())
            .or_else(|| resolve_schema_file(&previous.schema, &files));
        let Some(schema_file) = schema_file else {
            warn!("cannot determine schema file for {}", previous.schema);
            results.skipped.push(BindingOutcome {
                error: None,
                reason: Some("schema file not found".to_string()),
                ..previous
            });
            continue;
        };

        info!(
            "[{}/{total}] retrying {} for {} ({})",
            index + 1,
            previous.schema,
            previous.project,
            previous.synapse_id
        );
        let job = BindJob {
            schema: previous.schema,
            category: previous.category,
            project: previous.project,
            subfolder: previous.subfolder,
            synapse_id: previous.synapse_id,
            schema_file,
        };
        fold(&mut results, &job, runner.run(&job, timeout));
    }
    results
}

fn fold(results: &mut BindingResults, job: &BindJob, outcome: RunOutcome) {
    let mut entry = job.outcome();
    match outcome {
        RunOutcome::Succeeded { fileview_id } => {
            info!("bound {} to {}", job.schema, job.project);
            entry.fileview_id = fileview_id;
            results.successful.push(entry);
        }
        RunOutcome::Failed(error) => {
            warn!("binding {} to {} failed: {error}", job.schema, job.project);
            entry.error = Some(truncate(&error));
            results.failed.push(entry);
        }
        RunOutcome::TimedOut(limit) => {
            warn!("binding {} to {} timed out", job.schema, job.project);
            entry.error = Some(format!("timed out after {} seconds", limit.as_secs()));
            results.failed.push(entry);
        }
        RunOutcome::Skipped(reason) => {
            entry.reason = Some(reason);
            results.skipped.push(entry);
        }
    }
}
