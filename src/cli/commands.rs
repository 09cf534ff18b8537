use std::path::PathBuf;

use clap::Subcommand;

use crate::config::files::{
    BINDING_CONFIG_FILE, BINDING_RESULTS_FILE, PROJECTS_FILE, RETRY_RESULTS_FILE,
};
use crate::types::{Tier, Version};

#[derive(Subcommand)]
pub enum FolderCommands {
    /// Create the versioned tier folders for every project and apply access
    Create {
        /// Release version, e.g. v8
        #[arg(long)]
        version: Version,

        /// Tier to create (repeatable; defaults to all three)
        #[arg(long = "tier")]
        tiers: Vec<Tier>,

        /// Project directory file mapping names to project ids
        #[arg(long, default_value = PROJECTS_FILE)]
        projects_file: PathBuf,

        /// Only provision these projects (repeatable)
        #[arg(long = "project")]
        projects: Vec<String>,

        /// Directory for the folder structure and binding files
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,

        /// Create folders without touching access control
        #[arg(long)]
        skip_permissions: bool,

        /// Simulate against an empty in-memory platform
        #[arg(long)]
        dry_run: bool,
    },

    /// Rename a module folder under every project's tier folders
    Rename {
        /// Release version, e.g. v8
        #[arg(long)]
        version: Version,

        /// Tier to visit (repeatable; defaults to all three)
        #[arg(long = "tier")]
        tiers: Vec<Tier>,

        /// Current module folder name
        #[arg(long, default_value = "SpatialTranscriptomics")]
        from: String,

        /// New module folder name
        #[arg(long, default_value = "SpatialOmics")]
        to: String,

        /// Project directory file mapping names to project ids
        #[arg(long, default_value = PROJECTS_FILE)]
        projects_file: PathBuf,

        /// Simulate against an empty in-memory platform
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Subcommand)]
pub enum PermissionCommands {
    /// Apply the access policy to recorded tier folders
    Apply {
        /// Release version, e.g. v8
        #[arg(long)]
        version: Version,

        /// Tier to apply (repeatable; defaults to all three)
        #[arg(long = "tier")]
        tiers: Vec<Tier>,

        /// Folder structure file (defaults to folder_structure_{version}.yml)
        #[arg(long)]
        folder_structure_file: Option<PathBuf>,

        /// Only these projects (repeatable)
        #[arg(long = "project")]
        projects: Vec<String>,

        /// Simulate against an empty in-memory platform
        #[arg(long)]
        dry_run: bool,
    },

    /// Compare live access control lists with the policy
    Verify {
        /// Release version, e.g. v8
        #[arg(long)]
        version: Version,

        /// Tier to verify (repeatable; defaults to all three)
        #[arg(long = "tier")]
        tiers: Vec<Tier>,

        /// Folder structure file (defaults to folder_structure_{version}.yml)
        #[arg(long)]
        folder_structure_file: Option<PathBuf>,

        /// Only these projects (repeatable)
        #[arg(long = "project")]
        projects: Vec<String>,
    },
}

#[derive(Subcommand)]
pub enum BindingCommands {
    /// Build a binding file from the folders that exist on the platform
    Generate {
        /// Release version, e.g. v8
        #[arg(long)]
        version: Version,

        /// Tier to record (repeatable; defaults to all three)
        #[arg(long = "tier")]
        tiers: Vec<Tier>,

        /// Project directory file mapping names to project ids
        #[arg(long, default_value = PROJECTS_FILE)]
        projects_file: PathBuf,

        /// Output file (defaults to schema_binding_{version}.yml)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Report what would be recorded without writing the file
        #[arg(long)]
        dry_run: bool,
    },

    /// Merge a binding file into the master binding config
    Merge {
        /// Binding file to merge
        #[arg(long)]
        schema_binding_file: PathBuf,

        /// Master binding config
        #[arg(long, default_value = BINDING_CONFIG_FILE)]
        config_file: PathBuf,

        /// Only merge records whose subfolder starts with this, e.g. v8_staging
        #[arg(long)]
        tier_filter: Option<String>,

        /// Show what would be merged without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// Fill in fileview ids from a results file or from folder wikis
    Fileviews {
        /// Master binding config
        #[arg(long, default_value = BINDING_CONFIG_FILE)]
        config_file: PathBuf,

        /// Binding results file to read ids from instead of the wikis
        #[arg(long)]
        results_file: Option<PathBuf>,

        /// Show what would change without writing
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Subcommand)]
pub enum SchemaCommands {
    /// Bind one registered schema to one folder
    Bind {
        /// JSON schema file
        #[arg(long)]
        path: PathBuf,

        /// Folder id to bind to
        #[arg(long)]
        target: String,

        /// Schema organization (defaults to the configured one)
        #[arg(long)]
        org: Option<String>,

        /// Bind with derived annotations
        #[arg(long)]
        access_requirement: bool,

        /// Create a fileview and documentation page for the folder
        #[arg(long)]
        create_fileview: bool,
    },

    /// Bind every recorded binding, one subprocess per binding
    BindAll {
        /// Master binding config
        #[arg(long, default_value = BINDING_CONFIG_FILE)]
        config_file: PathBuf,

        /// Directory of JSON schema files (defaults to the configured one)
        #[arg(long)]
        schemas_dir: Option<PathBuf>,

        /// Per-binding time limit in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Also bind record-based schemas
        #[arg(long)]
        include_record_based: bool,

        /// Results file
        #[arg(long, default_value = BINDING_RESULTS_FILE)]
        output: PathBuf,

        /// Record every binding as skipped without running anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Re-run the failed bindings of earlier results files
    Retry {
        /// Results files to read failures from
        #[arg(long, num_args = 1.., default_value = BINDING_RESULTS_FILE)]
        results_files: Vec<PathBuf>,

        /// Directory of JSON schema files (defaults to the configured one)
        #[arg(long)]
        schemas_dir: Option<PathBuf>,

        /// Per-binding time limit in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Results file
        #[arg(long, default_value = RETRY_RESULTS_FILE)]
        output: PathBuf,

        /// Record every retry as skipped without running anything
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Subcommand)]
pub enum ReportCommands {
    /// Write a validation report for every bound fileview
    Validate {
        /// Master binding config
        #[arg(long, default_value = BINDING_CONFIG_FILE)]
        config_file: PathBuf,

        /// Directory for the CSV reports
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
    },

    /// Write a validation report for one folder and fileview
    ValidateOne {
        /// Folder the schema is bound to
        #[arg(long)]
        folder_id: String,

        /// Fileview listing the folder's files
        #[arg(long)]
        fileview_id: String,

        /// CSV report path (defaults to validation_status_{fileview}.csv)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum ProjectCommands {
    /// Find or create projects and their teams, and record them
    Ensure {
        /// Project name (repeatable)
        #[arg(long = "name", required = true)]
        names: Vec<String>,

        /// Project directory file to update
        #[arg(long, default_value = PROJECTS_FILE)]
        projects_file: PathBuf,

        /// Simulate against an empty in-memory platform
        #[arg(long)]
        dry_run: bool,
    },
}
