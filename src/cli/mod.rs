mod bindings;
mod commands;
mod folders;
mod permissions;
mod projects;
mod report;
mod schema;
mod setup;

pub use bindings::{run_bindings_fileviews, run_bindings_generate, run_bindings_merge};
pub use commands::{
    BindingCommands, FolderCommands, PermissionCommands, ProjectCommands, ReportCommands,
    SchemaCommands,
};
pub use folders::{run_folders_create, run_folders_rename};
pub use permissions::{run_permissions_apply, run_permissions_verify};
pub use projects::run_projects_ensure;
pub use report::{run_report_validate, run_report_validate_one};
pub use schema::{run_schema_bind, run_schema_bind_all, run_schema_retry};
pub use setup::{SetupArgs, run_setup};

use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::Settings;
use crate::config::credentials::load_token;
use crate::platform::{MemoryPlatform, Platform, SynapseClient};
use crate::types::Tier;

/// Settings plus the path they came from, shared by every command.
pub struct Context {
    pub settings: Settings,
    pub settings_path: Option<PathBuf>,
}

impl Context {
    pub fn load(settings_path: Option<PathBuf>) -> anyhow::Result<Self> {
        let settings = Settings::load(settings_path.as_deref())?;
        Ok(Self {
            settings,
            settings_path,
        })
    }

    /// The live client, or an empty in-memory platform for a dry run. Only
    /// the live client needs a token.
    pub fn platform(&self, dry_run: bool) -> anyhow::Result<Box<dyn Platform>> {
        if dry_run {
            info!("dry run: working against an empty in-memory platform");
            return Ok(Box::new(MemoryPlatform::placeholder()));
        }
        let token = load_token()?;
        Ok(Box::new(SynapseClient::new(&self.settings, &token)?))
    }
}

/// Requested tiers in canonical order, or all of them when none were given.
pub fn tiers_or_all(mut tiers: Vec<Tier>) -> Vec<Tier> {
    if tiers.is_empty() {
        return Tier::ALL.to_vec();
    }
    tiers.sort();
    tiers.dedup();
    tiers
}

fn output_path(dir: &Path, file_name: &str) -> PathBuf {
    dir.join(file_name)
}
