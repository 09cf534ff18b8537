use std::path::{Path, PathBuf};

use super::{Context, tiers_or_all};
use crate::bindings::config::{fileview_ids_from_results, fileview_ids_from_wikis};
use crate::bindings::{MergeSummary, record_bindings};
use crate::config::files::{
    BindingResults, FolderStructure, SchemaBindingConfig, read_json, read_yaml, schema_binding_file,
    write_yaml,
};
use crate::provision::{Provisioner, load_projects};
use crate::types::{Tier, Version};

pub fn run_bindings_generate(
    ctx: &Context,
    version: Version,
    tiers: Vec<Tier>,
    projects_file: PathBuf,
    output: Option<PathBuf>,
    dry_run: bool,
) -> anyhow::Result<()> {
    let tiers = tiers_or_all(tiers);
    let projects = load_projects(&projects_file)?;
    let platform = ctx.platform(false)?;
    let provisioner = Provisioner::new(platform.as_ref());

    let mut structure = FolderStructure::default();
    let mut missing = 0;
    for project in &projects {
        let outcome = provisioner.discover(project, &version, &tiers);
        missing += outcome.missing.len();
        for failure in &outcome.failures {
            println!("  ERROR {}/{}: {}", project.name, failure.path, failure.error);
        }
        structure.insert(&version, project.name.clone(), outcome.folders);
    }

    let bindings = record_bindings(&structure, &version, &tiers);
    let output = output.unwrap_or_else(|| PathBuf::from(schema_binding_file(&version)));
    if !dry_run {
        write_yaml(&output, &bindings)?;
    }

    println!();
    println!("Recorded {} binding(s) for {} project(s)", bindings.len(), projects.len());
    if missing > 0 {
        println!("  {missing} expected folder(s) not found");
    }
    if dry_run {
        println!("  Dry run: {} not written", output.display());
    } else {
        println!("  Written to {}", output.display());
    }
    println!();
    Ok(())
}

/// The master config at `path`, or an empty one if it does not exist yet.
pub(super) fn load_or_default(path: &Path) -> anyhow::Result<SchemaBindingConfig> {
    if path.exists() {
        Ok(read_yaml(path)?)
    } else {
        Ok(SchemaBindingConfig::default())
    }
}

pub(super) fn print_merge_summary(summary: &MergeSummary) {
    println!("  Added: {}", summary.added);
    println!("  Updated: {}", summary.updated);
    println!("  Unchanged: {}", summary.unchanged);
    if summary.filtered > 0 {
        println!("  Filtered out: {}", summary.filtered);
    }
}

pub fn run_bindings_merge(
    schema_binding_file: PathBuf,
    config_file: PathBuf,
    tier_filter: Option<String>,
    dry_run: bool,
) -> anyhow::Result<()> {
    let incoming: SchemaBindingConfig = read_yaml(&schema_binding_file)?;
    if incoming.is_empty() {
        anyhow::bail!("No bindings found in {}", schema_binding_file.display());
    }
    let mut config = load_or_default(&config_file)?;
    let summary = config.merge(&incoming, tier_filter.as_deref());

    println!();
    if dry_run {
        println!("Dry run: {} would change as follows", config_file.display());
    } else {
        write_yaml(&config_file, &config)?;
        println!("Merged {} into {}", schema_binding_file.display(), config_file.display());
    }
    if let Some(filter) = &tier_filter {
        println!("  Filter: {filter}");
    }
    print_merge_summary(&summary);
    println!();
    Ok(())
}

pub fn run_bindings_fileviews(
    ctx: &Context,
    config_file: PathBuf,
    results_file: Option<PathBuf>,
    dry_run: bool,
) -> anyhow::Result<()> {
    let mut config: SchemaBindingConfig = read_yaml(&config_file)?;
    let ids = match &results_file {
        Some(path) => {
            let results: BindingResults = read_json(path)?;
            fileview_ids_from_results(&results)
        }
        None => {
            let platform = ctx.platform(false)?;
            fileview_ids_from_wikis(platform.as_ref(), &config)
        }
    };
    let changed = config.apply_fileview_ids(&ids);

    println!();
    println!("Found {} fileview id(s), {changed} record(s) to update", ids.len());
    if changed > 0 && !dry_run {
        write_yaml(&config_file, &config)?;
        println!("  Written to {}", config_file.display());
    }
    println!();
    Ok(())
}
