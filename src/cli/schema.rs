use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;

use super::Context;
use crate::bindings::{
    BatchOptions, BindOptions, BindRunner, DryRunRunner, SchemaBinder, SchemaFile, SubprocessRunner,
    bind_all, retry_failed,
};
use crate::config::files::{BindingResults, SchemaBindingConfig, read_yaml, write_json};

pub fn run_schema_bind(
    ctx: &Context,
    path: PathBuf,
    target: String,
    org: Option<String>,
    access_requirement: bool,
    create_fileview: bool,
) -> anyhow::Result<()> {
    let organization = org.unwrap_or_else(|| ctx.settings.organization.clone());
    let file = SchemaFile::load(&path)?;
    let platform = ctx.platform(false)?;
    let binder = SchemaBinder::new(platform.as_ref(), &organization);
    let report = binder.bind(
        &file,
        &target,
        BindOptions {
            access_requirement,
            create_fileview,
        },
    )?;

    println!("Bound {} to {target}", report.uri);
    if report.derived_annotations {
        println!("  Derived annotations: enabled");
    }
    if let Some(view) = &report.fileview_id {
        if !report.wiki_written {
            println!("  Documentation page not written");
        }
        // Read back by the batch driver.
        println!("fileview: {view}");
    }
    Ok(())
}

/// The child runner for a live batch, or one that skips everything.
fn runner(ctx: &Context, dry_run: bool) -> anyhow::Result<Box<dyn BindRunner>> {
    if dry_run {
        return Ok(Box::new(DryRunRunner));
    }
    let program = std::env::current_exe()?;
    Ok(Box::new(SubprocessRunner::new(
        program,
        &ctx.settings.organization,
        ctx.settings_path.clone(),
    )?))
}

fn write_results(output: &Path, mut results: BindingResults) -> anyhow::Result<()> {
    results.generated_at = Some(Utc::now());
    write_json(output, &results)?;

    println!();
    println!("Bindings: {} total", results.total());
    println!("  Successful: {}", results.successful.len());
    println!("  Failed: {}", results.failed.len());
    println!("  Skipped: {}", results.skipped.len());
    for failed in &results.failed {
        println!(
            "  FAILED {} {} ({}): {}",
            failed.schema,
            failed.project,
            failed.synapse_id,
            failed.error.as_deref().unwrap_or("unknown error")
        );
    }
    println!("  Results written to {}", output.display());
    println!();
    Ok(())
}

pub fn run_schema_bind_all(
    ctx: &Context,
    config_file: PathBuf,
    schemas_dir: Option<PathBuf>,
    timeout: Option<u64>,
    include_record_based: bool,
    output: PathBuf,
    dry_run: bool,
) -> anyhow::Result<()> {
    let config: SchemaBindingConfig = read_yaml(&config_file)?;
    let schemas_dir = schemas_dir.unwrap_or_else(|| ctx.settings.schemas_dir.clone());
    let options = BatchOptions {
        timeout: timeout.map_or_else(|| ctx.settings.bind_timeout(), Duration::from_secs),
        include_record_based,
    };
    let runner = runner(ctx, dry_run)?;
    let results = bind_all(&config, &schemas_dir, runner.as_ref(), options)?;
    write_results(&output, results)
}

pub fn run_schema_retry(
    ctx: &Context,
    results_files: Vec<PathBuf>,
    schemas_dir: Option<PathBuf>,
    timeout: Option<u64>,
    output: PathBuf,
    dry_run: bool,
) -> anyhow::Result<()> {
    let schemas_dir = schemas_dir.unwrap_or_else(|| ctx.settings.schemas_dir.clone());
    let timeout = timeout.map_or_else(|| ctx.settings.retry_timeout(), Duration::from_secs);
    let runner = runner(ctx, dry_run)?;
    let results = retry_failed(&results_files, &schemas_dir, runner.as_ref(), timeout);
    write_results(&output, results)
}
