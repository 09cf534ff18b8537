//! Idempotent creation of the versioned folder tree.
//!
//! A folder is looked up by exact name among its parent's child folders and
//! only created when absent, so re-running over a partially provisioned
//! project fills the gaps and reuses every existing id.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::catalog::{CATALOG, FolderSpec};
use crate::config::files::{FolderNode, ProjectFolders, SubfolderEntry, TierFolder};
use crate::error::Result;
use crate::platform::Platform;
use crate::types::{Project, Tier, Version};

/// Returns the id of the child folder `name` under `parent_id`, creating it
/// when missing. Names match exactly and case-sensitively.
pub fn ensure_folder(platform: &dyn Platform, parent_id: &str, name: &str) -> Result<String> {
    if let Some(id) = find_folder(platform, parent_id, name)? {
        debug!("folder '{name}' already exists: {id}");
        return Ok(id);
    }
    let id = platform.create_folder(parent_id, name)?;
    info!("created folder '{name}': {id}");
    Ok(id)
}

pub fn find_folder(platform: &dyn Platform, parent_id: &str, name: &str) -> Result<Option<String>> {
    Ok(platform
        .list_child_folders(parent_id)?
        .into_iter()
        .find(|child| child.name == name)
        .map(|child| child.id))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FolderFailure {
    /// Slash-separated path below the project, e.g. `v8_ingest/WES/Level_1`.
    pub path: String,
    pub error: String,
}

#[derive(Debug, Clone, Default)]
pub struct ProvisionOutcome {
    pub folders: ProjectFolders,
    pub failures: Vec<FolderFailure>,
    /// Paths a read-only walk did not find.
    pub missing: Vec<String>,
}

impl ProvisionOutcome {
    /// Tier folders that exist after the run, with their ids.
    pub fn tier_folders(&self) -> impl Iterator<Item = (Tier, &str)> {
        self.folders.folders.iter().filter_map(|(name, folder)| {
            Tier::from_folder_name(name).map(|tier| (tier, folder.synapse_id.as_str()))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Walk {
    Create,
    Lookup,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RenameStatus {
    Renamed { id: String },
    AlreadyRenamed { id: String },
    NotFound,
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenameOutcome {
    pub project: String,
    pub tier_folder: String,
    #[serde(flatten)]
    pub status: RenameStatus,
}

pub struct Provisioner<'a> {
    platform: &'a dyn Platform,
}

impl<'a> Provisioner<'a> {
    #[must_use]
    pub fn new(platform: &'a dyn Platform) -> Self {
        Self { platform }
    }

    /// Ensures the catalog tree under one tier folder per requested tier.
    /// Parents are handled before children; a failed folder is recorded and
    /// its subtree skipped while siblings continue.
    pub fn provision(&self, project: &Project, version: &Version, tiers: &[Tier]) -> ProvisionOutcome {
        info!("provisioning {} ({})", project.name, project.synapse_id);
        self.walk(project, version, tiers, Walk::Create)
    }

    /// Read-only walk that reports the existing tree without creating
    /// anything.
    pub fn discover(&self, project: &Project, version: &Version, tiers: &[Tier]) -> ProvisionOutcome {
        debug!("discovering {} ({})", project.name, project.synapse_id);
        self.walk(project, version, tiers, Walk::Lookup)
    }

    fn walk(&self, project: &Project, version: &Version, tiers: &[Tier], mode: Walk) -> ProvisionOutcome {
        let mut outcome = ProvisionOutcome {
            folders: ProjectFolders {
                synapse_id: project.synapse_id.clone(),
                folders: BTreeMap::new(),
            },
            ..ProvisionOutcome::default()
        };

        for tier in tiers {
            let tier_name = tier.folder_name(version);
            let Some(tier_id) = self.resolve(&project.synapse_id, &tier_name, &tier_name, mode, &mut outcome)
            else {
                continue;
            };
            let mut tier_folder = TierFolder {
                synapse_id: tier_id.clone(),
                modules: BTreeMap::new(),
            };
            for module in CATALOG {
                let path = format!("{tier_name}/{}", module.name());
                if let Some(node) = self.node(&tier_id, &module.root, &path, mode, &mut outcome) {
                    tier_folder.modules.insert(module.name().to_string(), node);
                }
            }
            outcome.folders.folders.insert(tier_name, tier_folder);
        }
        outcome
    }

    fn node(
        &self,
        parent_id: &str,
        spec: &FolderSpec,
        path: &str,
        mode: Walk,
        outcome: &mut ProvisionOutcome,
    ) -> Option<FolderNode> {
        let id = self.resolve(parent_id, spec.name, path, mode, outcome)?;
        let mut node = FolderNode::new(id);
        for child in spec.children {
            let child_path = format!("{path}/{}", child.name);
            let entry = if spec.nests_children() || !child.children.is_empty() {
                self.node(&node.synapse_id, child, &child_path, mode, outcome)
                    .map(SubfolderEntry::Nested)
            } else {
                self.resolve(&node.synapse_id, child.name, &child_path, mode, outcome)
                    .map(SubfolderEntry::Id)
            };
            if let Some(entry) = entry {
                node.subfolders.insert(child.name.to_string(), entry);
            }
        }
        Some(node)
    }

    fn resolve(
        &self,
        parent_id: &str,
        name: &str,
        path: &str,
        mode: Walk,
        outcome: &mut ProvisionOutcome,
    ) -> Option<String> {
        let result = match mode {
            Walk::Create => ensure_folder(self.platform, parent_id, name).map(Some),
            Walk::Lookup => find_folder(self.platform, parent_id, name),
        };
        match result {
            Ok(Some(id)) => Some(id),
            Ok(None) => {
                debug!("folder {path} not found");
                outcome.missing.push(path.to_string());
                None
            }
            Err(e) => {
                warn!("failed to provision folder {path}: {e}");
                outcome.failures.push(FolderFailure {
                    path: path.to_string(),
                    error: e.to_string(),
                });
                None
            }
        }
    }

    /// Renames the module folder `from` to `to` under each tier folder of
    /// the project. Folders already carrying the new name are left alone.
    pub fn rename_module_folders(
        &self,
        project: &Project,
        version: &Version,
        tiers: &[Tier],
        from: &str,
        to: &str,
    ) -> Vec<RenameOutcome> {
        let mut outcomes = Vec::new();
        for tier in tiers {
            let tier_folder = tier.folder_name(version);
            let status = match self.rename_one(&project.synapse_id, &tier_folder, from, to) {
                Ok(status) => status,
                Err(e) => {
                    warn!("rename under {}/{tier_folder} failed: {e}", project.name);
                    RenameStatus::Failed {
                        error: e.to_string(),
                    }
                }
            };
            outcomes.push(RenameOutcome {
                project: project.name.clone(),
                tier_folder,
                status,
            });
        }
        outcomes
    }

    fn rename_one(&self, project_id: &str, tier_folder: &str, from: &str, to: &str) -> Result<RenameStatus> {
        let Some(tier_id) = find_folder(self.platform, project_id, tier_folder)? else {
            return Ok(RenameStatus::NotFound);
        };
        let children = self.platform.list_child_folders(&tier_id)?;
        if let Some(done) = children.iter().find(|c| c.name == to) {
            return Ok(RenameStatus::AlreadyRenamed { id: done.id.clone() });
        }
        let Some(old) = children.iter().find(|c| c.name == from) else {
            return Ok(RenameStatus::NotFound);
        };
        let mut entity = self.platform.get_entity(&old.id)?;
        entity.name = to.to_string();
        self.platform.update_entity(&entity)?;
        info!("renamed {} from '{from}' to '{to}'", old.id);
        Ok(RenameStatus::Renamed { id: old.id.clone() })
    }
}
