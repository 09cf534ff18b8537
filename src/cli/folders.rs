use std::path::{Path, PathBuf};

use tracing::info;

use super::{Context, output_path, tiers_or_all};
use crate::bindings::record_bindings;
use crate::config::files::{
    FolderStructure, SchemaBindingConfig, folder_structure_file, read_yaml, schema_binding_file,
    write_yaml,
};
use crate::platform::Platform;
use crate::provision::folders::RenameStatus;
use crate::provision::registry::select;
use crate::provision::{GrantOutcome, GrantStatus, PolicyEngine, Provisioner, load_projects};
use crate::types::{Tier, Version};

/// Applied, skipped, and failed grant counts across a run.
#[derive(Debug, Default, Clone, Copy)]
pub(super) struct GrantTally {
    pub applied: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl GrantTally {
    pub fn add(&mut self, outcomes: &[GrantOutcome]) {
        for outcome in outcomes {
            match outcome.status {
                GrantStatus::Applied => self.applied += 1,
                GrantStatus::Skipped(_) => self.skipped += 1,
                GrantStatus::Failed(_) => self.failed += 1,
            }
        }
    }
}

pub(super) struct ProvisionRun {
    pub structure_path: PathBuf,
    pub binding_path: PathBuf,
    pub bindings: SchemaBindingConfig,
    pub projects: usize,
    pub folder_failures: usize,
    pub grants: GrantTally,
}

/// Reads an existing structure file so other versions survive a rewrite.
fn existing_structure(path: &Path) -> anyhow::Result<FolderStructure> {
    if path.exists() {
        Ok(read_yaml(path)?)
    } else {
        Ok(FolderStructure::default())
    }
}

/// Provisions every selected project, applies access unless skipped, and
/// writes the structure and binding files into `output_dir`.
#[allow(clippy::too_many_arguments)]
pub(super) fn provision_projects(
    ctx: &Context,
    platform: &dyn Platform,
    projects_file: &Path,
    names: &[String],
    version: &Version,
    tiers: &[Tier],
    output_dir: &Path,
    skip_permissions: bool,
) -> anyhow::Result<ProvisionRun> {
    let projects = select(load_projects(projects_file)?, names);
    if projects.is_empty() {
        anyhow::bail!("No projects selected from {}", projects_file.display());
    }

    let provisioner = Provisioner::new(platform);
    let engine = PolicyEngine::new(platform, ctx.settings.teams);
    let structure_path = output_path(output_dir, &folder_structure_file(version));
    let mut structure = existing_structure(&structure_path)?;
    let mut folder_failures = 0;
    let mut grants = GrantTally::default();

    for project in &projects {
        let outcome = provisioner.provision(project, version, tiers);
        folder_failures += outcome.failures.len();
        for failure in &outcome.failures {
            println!("  FAILED {}/{}: {}", project.name, failure.path, failure.error);
        }
        if !skip_permissions {
            for (tier, folder_id) in outcome.tier_folders() {
                grants.add(&engine.apply(folder_id, tier, &project.name));
            }
        }
        structure.insert(version, project.name.clone(), outcome.folders);
    }

    write_yaml(&structure_path, &structure)?;
    info!("wrote {}", structure_path.display());

    let bindings = record_bindings(&structure, version, tiers);
    let binding_path = output_path(output_dir, &schema_binding_file(version));
    write_yaml(&binding_path, &bindings)?;
    info!("wrote {}", binding_path.display());

    Ok(ProvisionRun {
        structure_path,
        binding_path,
        bindings,
        projects: projects.len(),
        folder_failures,
        grants,
    })
}

pub(super) fn print_provision_summary(run: &ProvisionRun, skip_permissions: bool) {
    println!();
    println!("Provisioned {} project(s)", run.projects);
    println!("  Folder failures: {}", run.folder_failures);
    if skip_permissions {
        println!("  Permissions: skipped");
    } else {
        println!(
            "  Grants: {} applied, {} skipped, {} failed",
            run.grants.applied, run.grants.skipped, run.grants.failed
        );
    }
    println!("  Bindings recorded: {}", run.bindings.len());
    println!("  Folder structure: {}", run.structure_path.display());
    println!("  Binding file: {}", run.binding_path.display());
    println!();
}

#[allow(clippy::too_many_arguments)]
pub fn run_folders_create(
    ctx: &Context,
    version: Version,
    tiers: Vec<Tier>,
    projects_file: PathBuf,
    projects: Vec<String>,
    output_dir: PathBuf,
    skip_permissions: bool,
    dry_run: bool,
) -> anyhow::Result<()> {
    let tiers = tiers_or_all(tiers);
    let platform = ctx.platform(dry_run)?;
    let run = provision_projects(
        ctx,
        platform.as_ref(),
        &projects_file,
        &projects,
        &version,
        &tiers,
        &output_dir,
        skip_permissions,
    )?;
    print_provision_summary(&run, skip_permissions);
    Ok(())
}

pub fn run_folders_rename(
    ctx: &Context,
    version: Version,
    tiers: Vec<Tier>,
    from: String,
    to: String,
    projects_file: PathBuf,
    dry_run: bool,
) -> anyhow::Result<()> {
    if from == to {
        anyhow::bail!("--from and --to are both '{from}'");
    }
    let tiers = tiers_or_all(tiers);
    let projects = load_projects(&projects_file)?;
    let platform = ctx.platform(dry_run)?;
    let provisioner = Provisioner::new(platform.as_ref());

    let mut renamed = 0;
    let mut already = 0;
    let mut not_found = 0;
    let mut failed = 0;
    println!();
    for project in &projects {
        for outcome in provisioner.rename_module_folders(project, &version, &tiers, &from, &to) {
            let label = format!("{}/{}", outcome.project, outcome.tier_folder);
            match outcome.status {
                RenameStatus::Renamed { id } => {
                    renamed += 1;
                    println!("  renamed   {label}/{from} -> {to} ({id})");
                }
                RenameStatus::AlreadyRenamed { .. } => already += 1,
                RenameStatus::NotFound => not_found += 1,
                RenameStatus::Failed { error } => {
                    failed += 1;
                    println!("  FAILED    {label}: {error}");
                }
            }
        }
    }
    println!();
    println!("Renamed {renamed}, already renamed {already}, not found {not_found}, failed {failed}");
    println!();
    Ok(())
}
