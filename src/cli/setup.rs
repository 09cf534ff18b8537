use std::path::PathBuf;

use clap::Args;

use super::bindings::{load_or_default, print_merge_summary};
use super::folders::{print_provision_summary, provision_projects};
use super::{Context, tiers_or_all};
use crate::config::files::{BINDING_CONFIG_FILE, PROJECTS_FILE, write_yaml};
use crate::types::{Tier, Version};

#[derive(Args)]
pub struct SetupArgs {
    /// Release version, e.g. v8
    #[arg(long)]
    pub version: Version,

    /// Tier to set up (repeatable; defaults to all three)
    #[arg(long = "tier")]
    pub tiers: Vec<Tier>,

    /// Project directory file mapping names to project ids
    #[arg(long, default_value = PROJECTS_FILE)]
    pub projects_file: PathBuf,

    /// Only these projects (repeatable)
    #[arg(long = "project")]
    pub projects: Vec<String>,

    /// Master binding config to merge into
    #[arg(long, default_value = BINDING_CONFIG_FILE)]
    pub config_file: PathBuf,

    /// Directory for the folder structure and binding files
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Create folders without touching access control
    #[arg(long)]
    pub skip_permissions: bool,

    /// Leave the master binding config alone
    #[arg(long)]
    pub skip_merge: bool,

    /// Simulate against an empty in-memory platform
    #[arg(long)]
    pub dry_run: bool,
}

/// Folders, access, binding file, then the merge into the master config.
pub fn run_setup(ctx: &Context, args: SetupArgs) -> anyhow::Result<()> {
    let tiers = tiers_or_all(args.tiers);
    let platform = ctx.platform(args.dry_run)?;

    println!("Step 1: folders and permissions");
    let run = provision_projects(
        ctx,
        platform.as_ref(),
        &args.projects_file,
        &args.projects,
        &args.version,
        &tiers,
        &args.output_dir,
        args.skip_permissions,
    )?;
    print_provision_summary(&run, args.skip_permissions);

    if args.skip_merge {
        println!("Step 2: merge skipped");
        return Ok(());
    }

    println!("Step 2: merge into {}", args.config_file.display());
    let mut config = load_or_default(&args.config_file)?;
    let summary = config.merge(&run.bindings, None);
    if args.dry_run {
        println!("  Dry run: config not written");
    } else {
        write_yaml(&args.config_file, &config)?;
    }
    print_merge_summary(&summary);
    println!();
    Ok(())
}
