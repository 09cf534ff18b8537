use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use htan2_synapse::cli::{
    self, BindingCommands, Context, FolderCommands, PermissionCommands, ProjectCommands,
    ReportCommands, SchemaCommands, SetupArgs,
};

#[derive(Parser)]
#[command(name = "htan2")]
#[command(about = "Provision HTAN2 projects, folders, access, and schema bindings on Synapse", long_about = None)]
struct Cli {
    /// Settings file (defaults to htan2.toml when present)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the versioned folder trees
    Folders {
        #[command(subcommand)]
        command: FolderCommands,
    },

    /// Apply or verify tier access policies
    Permissions {
        #[command(subcommand)]
        command: PermissionCommands,
    },

    /// Build and maintain the schema binding config
    Bindings {
        #[command(subcommand)]
        command: BindingCommands,
    },

    /// Bind JSON schemas to folders
    Schema {
        #[command(subcommand)]
        command: SchemaCommands,
    },

    /// Write validation status reports
    Report {
        #[command(subcommand)]
        command: ReportCommands,
    },

    /// Create and record projects
    Projects {
        #[command(subcommand)]
        command: ProjectCommands,
    },

    /// Create folders, apply access, and merge bindings in one pass
    Setup(SetupArgs),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("htan2_synapse=info".parse()?))
        .init();

    let cli = Cli::parse();
    let ctx = Context::load(cli.settings)?;

    match cli.command {
        Commands::Folders { command } => match command {
            FolderCommands::Create {
                version,
                tiers,
                projects_file,
                projects,
                output_dir,
                skip_permissions,
                dry_run,
            } => cli::run_folders_create(
                &ctx,
                version,
                tiers,
                projects_file,
                projects,
                output_dir,
                skip_permissions,
                dry_run,
            )?,
            FolderCommands::Rename {
                version,
                tiers,
                from,
                to,
                projects_file,
                dry_run,
            } => cli::run_folders_rename(&ctx, version, tiers, from, to, projects_file, dry_run)?,
        },
        Commands::Permissions { command } => match command {
            PermissionCommands::Apply {
                version,
                tiers,
                folder_structure_file,
                projects,
                dry_run,
            } => cli::run_permissions_apply(&ctx, version, tiers, folder_structure_file, projects, dry_run)?,
            PermissionCommands::Verify {
                version,
                tiers,
                folder_structure_file,
                projects,
            } => cli::run_permissions_verify(&ctx, version, tiers, folder_structure_file, projects)?,
        },
        Commands::Bindings { command } => match command {
            BindingCommands::Generate {
                version,
                tiers,
                projects_file,
                output,
                dry_run,
            } => cli::run_bindings_generate(&ctx, version, tiers, projects_file, output, dry_run)?,
            BindingCommands::Merge {
                schema_binding_file,
                config_file,
                tier_filter,
                dry_run,
            } => cli::run_bindings_merge(schema_binding_file, config_file, tier_filter, dry_run)?,
            BindingCommands::Fileviews {
                config_file,
                results_file,
                dry_run,
            } => cli::run_bindings_fileviews(&ctx, config_file, results_file, dry_run)?,
        },
        Commands::Schema { command } => match command {
            SchemaCommands::Bind {
                path,
                target,
                org,
                access_requirement,
                create_fileview,
            } => cli::run_schema_bind(&ctx, path, target, org, access_requirement, create_fileview)?,
            SchemaCommands::BindAll {
                config_file,
                schemas_dir,
                timeout,
                include_record_based,
                output,
                dry_run,
            } => cli::run_schema_bind_all(
                &ctx,
                config_file,
                schemas_dir,
                timeout,
                include_record_based,
                output,
                dry_run,
            )?,
            SchemaCommands::Retry {
                results_files,
                schemas_dir,
                timeout,
                output,
                dry_run,
            } => cli::run_schema_retry(&ctx, results_files, schemas_dir, timeout, output, dry_run)?,
        },
        Commands::Report { command } => match command {
            ReportCommands::Validate {
                config_file,
                output_dir,
            } => cli::run_report_validate(&ctx, config_file, output_dir)?,
            ReportCommands::ValidateOne {
                folder_id,
                fileview_id,
                output,
            } => cli::run_report_validate_one(&ctx, folder_id, fileview_id, output)?,
        },
        Commands::Projects { command } => match command {
            ProjectCommands::Ensure {
                names,
                projects_file,
                dry_run,
            } => cli::run_projects_ensure(&ctx, names, projects_file, dry_run)?,
        },
        Commands::Setup(args) => cli::run_setup(&ctx, args)?,
    }

    Ok(())
}
