use std::path::PathBuf;

use super::folders::GrantTally;
use super::{Context, tiers_or_all};
use crate::config::files::{FolderStructure, ProjectFolders, folder_structure_file, read_yaml};
use crate::provision::{AclReport, GrantStatus, PolicyEngine};
use crate::types::{Tier, Version};

/// Recorded tier folders of `version` as (project, tier, folder id).
fn tier_folders(
    structure_file: Option<PathBuf>,
    version: &Version,
    tiers: &[Tier],
    projects: &[String],
) -> anyhow::Result<Vec<(String, Tier, String)>> {
    let path = structure_file.unwrap_or_else(|| PathBuf::from(folder_structure_file(version)));
    let structure: FolderStructure = read_yaml(&path)?;
    let Some(recorded) = structure.projects(version) else {
        anyhow::bail!("No projects recorded for {version} in {}", path.display());
    };

    let selected = recorded
        .iter()
        .filter(|(name, _)| projects.is_empty() || projects.contains(name));
    let mut folders = Vec::new();
    for (name, project) in selected {
        folders.extend(project_tiers(project, version, tiers).map(|(tier, id)| (name.clone(), tier, id)));
    }
    Ok(folders)
}

fn project_tiers<'a>(
    project: &'a ProjectFolders,
    version: &'a Version,
    tiers: &'a [Tier],
) -> impl Iterator<Item = (Tier, String)> + 'a {
    tiers.iter().filter_map(move |&tier| {
        project
            .folders
            .get(&tier.folder_name(version))
            .map(|folder| (tier, folder.synapse_id.clone()))
    })
}

pub fn run_permissions_apply(
    ctx: &Context,
    version: Version,
    tiers: Vec<Tier>,
    structure_file: Option<PathBuf>,
    projects: Vec<String>,
    dry_run: bool,
) -> anyhow::Result<()> {
    let tiers = tiers_or_all(tiers);
    let folders = tier_folders(structure_file, &version, &tiers, &projects)?;
    let platform = ctx.platform(dry_run)?;
    let engine = PolicyEngine::new(platform.as_ref(), ctx.settings.teams);
    let mut tally = GrantTally::default();

    println!();
    for (project, tier, folder_id) in &folders {
        let outcomes = engine.apply(folder_id, *tier, project);
        println!("{project} {} ({folder_id})", tier.folder_name(&version));
        for outcome in &outcomes {
            let id = outcome
                .principal_id
                .map_or_else(|| "-".to_string(), |id| id.to_string());
            match &outcome.status {
                GrantStatus::Applied => println!("  applied  {} ({id})", outcome.principal),
                GrantStatus::Skipped(reason) => println!("  skipped  {}: {reason}", outcome.principal),
                GrantStatus::Failed(error) => println!("  FAILED   {} ({id}): {error}", outcome.principal),
            }
        }
        tally.add(&outcomes);
    }
    println!();
    println!(
        "{} folder(s): {} applied, {} skipped, {} failed",
        folders.len(),
        tally.applied,
        tally.skipped,
        tally.failed
    );
    println!();
    Ok(())
}

fn print_report(project: &str, folder_name: &str, report: &AclReport) {
    let verdict = if report.is_conformant() { "OK" } else { "MISMATCH" };
    println!("{verdict:<9}{project} {folder_name} ({})", report.folder_id);
    if report.inherited {
        println!("  access list inherited from an ancestor");
    }
    for check in report.checks.iter().filter(|c| !c.matches()) {
        let actual = check
            .actual
            .map_or_else(|| "none".to_string(), |set| set.to_strings().join(","));
        println!(
            "  {}: expected {}, found {actual}",
            check.principal,
            check.expected.to_strings().join(",")
        );
    }
    if !report.unexpected.is_empty() {
        let ids: Vec<String> = report.unexpected.iter().map(u64::to_string).collect();
        println!("  other principals: {}", ids.join(", "));
    }
    if !report.unknown_access_types.is_empty() {
        println!("  unknown access types: {}", report.unknown_access_types.join(", "));
    }
}

pub fn run_permissions_verify(
    ctx: &Context,
    version: Version,
    tiers: Vec<Tier>,
    structure_file: Option<PathBuf>,
    projects: Vec<String>,
) -> anyhow::Result<()> {
    let tiers = tiers_or_all(tiers);
    let folders = tier_folders(structure_file, &version, &tiers, &projects)?;
    let platform = ctx.platform(false)?;
    let engine = PolicyEngine::new(platform.as_ref(), ctx.settings.teams);
    let mut mismatched = 0;

    println!();
    for (project, tier, folder_id) in &folders {
        let folder_name = tier.folder_name(&version);
        match engine.verify(folder_id, *tier, project) {
            Ok(report) => {
                if !report.is_conformant() {
                    mismatched += 1;
                }
                print_report(project, &folder_name, &report);
            }
            Err(e) => {
                mismatched += 1;
                println!("ERROR    {project} {folder_name} ({folder_id}): {e}");
            }
        }
    }
    println!();
    println!("{} folder(s) checked, {mismatched} not conforming", folders.len());
    println!();
    Ok(())
}
