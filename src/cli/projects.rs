use std::path::PathBuf;

use super::Context;
use crate::provision::GrantStatus;
use crate::provision::registry::{ensure_projects, save_projects};
use crate::provision::load_projects;
use crate::types::Project;

pub fn run_projects_ensure(
    ctx: &Context,
    names: Vec<String>,
    projects_file: PathBuf,
    dry_run: bool,
) -> anyhow::Result<()> {
    let mut known = if projects_file.exists() {
        load_projects(&projects_file)?
    } else {
        Vec::new()
    };
    let platform = ctx.platform(dry_run)?;
    let outcomes = ensure_projects(platform.as_ref(), ctx.settings.teams, &names);

    println!();
    let mut errors = 0;
    for outcome in &outcomes {
        let Some(id) = &outcome.synapse_id else {
            errors += 1;
            println!(
                "FAILED   {}: {}",
                outcome.name,
                outcome.error.as_deref().unwrap_or("unknown error")
            );
            continue;
        };
        let verb = if outcome.created { "created" } else { "found" };
        println!("{verb:<9}{} ({id})", outcome.name);
        for grant in &outcome.grants {
            match &grant.status {
                GrantStatus::Applied => {}
                GrantStatus::Skipped(reason) => println!("  skipped  {}: {reason}", grant.team),
                GrantStatus::Failed(error) => {
                    errors += 1;
                    println!("  FAILED   {}: {error}", grant.team);
                }
            }
        }

        match known.iter_mut().find(|p| p.name == outcome.name) {
            Some(project) => project.synapse_id.clone_from(id),
            None => known.push(Project {
                name: outcome.name.clone(),
                synapse_id: id.clone(),
            }),
        }
    }

    if dry_run {
        println!();
        println!("Dry run: {} not updated", projects_file.display());
    } else {
        save_projects(&projects_file, &known)?;
        println!();
        println!("Recorded {} project(s) in {}", known.len(), projects_file.display());
    }
    if errors > 0 {
        println!("{errors} step(s) failed; see above");
    }
    println!();
    Ok(())
}
