//! In-process platform used for dry runs and tests.
//!
//! Writes land in a local table and issue sequential ids with a fixed
//! prefix, so two runs over the same input yield the same identifiers.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use super::Platform;
use crate::error::{Error, Result};
use crate::types::*;

const FOLDER_TYPE: &str = "org.sagebionetworks.repo.model.Folder";
const PROJECT_TYPE: &str = "org.sagebionetworks.repo.model.Project";

#[derive(Debug, Clone)]
struct Node {
    name: String,
    parent_id: Option<String>,
    concrete_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaBinding {
    pub uri: String,
    pub derived_annotations: bool,
}

#[derive(Debug, Clone)]
pub struct FileView {
    pub parent_id: String,
    pub name: String,
    pub columns: Vec<Column>,
}

#[derive(Debug, Default)]
struct State {
    next_id: u64,
    nodes: BTreeMap<String, Node>,
    acls: HashMap<String, Vec<ResourceAccess>>,
    teams: Vec<Team>,
    schemas: BTreeSet<String>,
    bindings: HashMap<String, SchemaBinding>,
    views: BTreeMap<String, FileView>,
    view_files: HashMap<String, Vec<ViewFile>>,
    invalid: HashMap<String, Vec<InvalidFile>>,
    wikis: HashMap<String, Wiki>,
    failing_names: HashSet<String>,
    failing_principals: HashSet<u64>,
    failing_acl_writes: bool,
    failing_team_search: bool,
    folder_creations: usize,
}

pub struct MemoryPlatform {
    prefix: String,
    state: Mutex<State>,
}

impl Default for MemoryPlatform {
    fn default() -> Self {
        Self::with_prefix("syn")
    }
}

impl MemoryPlatform {
    #[must_use]
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            state: Mutex::new(State {
                next_id: 1000,
                ..State::default()
            }),
        }
    }

    /// Platform for `--dry-run`: empty, with recognisable placeholder ids.
    #[must_use]
    pub fn placeholder() -> Self {
        let platform = Self::with_prefix("syn_dryrun_");
        platform.state().next_id = 0;
        platform
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn issue_id(&self, state: &mut State) -> String {
        state.next_id += 1;
        if self.prefix == "syn" {
            format!("syn{}", state.next_id)
        } else {
            format!("{}{:06}", self.prefix, state.next_id)
        }
    }

    // Seeding helpers

    pub fn add_project(&self, name: &str) -> String {
        let mut state = self.state();
        let id = self.issue_id(&mut state);
        state.nodes.insert(
            id.clone(),
            Node {
                name: name.to_string(),
                parent_id: None,
                concrete_type: PROJECT_TYPE.to_string(),
            },
        );
        id
    }

    pub fn add_folder(&self, parent_id: &str, name: &str) -> String {
        let mut state = self.state();
        let id = self.issue_id(&mut state);
        state.nodes.insert(
            id.clone(),
            Node {
                name: name.to_string(),
                parent_id: Some(parent_id.to_string()),
                concrete_type: FOLDER_TYPE.to_string(),
            },
        );
        id
    }

    pub fn add_team(&self, id: &str, name: &str) {
        self.state().teams.push(Team {
            id: id.to_string(),
            name: name.to_string(),
        });
    }

    pub fn register_schema(&self, uri: &str) {
        self.state().schemas.insert(uri.to_string());
    }

    pub fn set_acl(&self, entity_id: &str, entries: Vec<ResourceAccess>) {
        self.state().acls.insert(entity_id.to_string(), entries);
    }

    pub fn add_view_file(&self, view_id: &str, file_id: &str, name: &str) {
        self.state()
            .view_files
            .entry(view_id.to_string())
            .or_default()
            .push(ViewFile {
                id: file_id.to_string(),
                name: name.to_string(),
            });
    }

    pub fn add_invalid_file(&self, container_id: &str, file: InvalidFile) {
        self.state()
            .invalid
            .entry(container_id.to_string())
            .or_default()
            .push(file);
    }

    /// Makes every later attempt to create a folder called `name` fail.
    pub fn fail_folder(&self, name: &str) {
        self.state().failing_names.insert(name.to_string());
    }

    pub fn heal_folder(&self, name: &str) {
        self.state().failing_names.remove(name);
    }

    pub fn fail_grants_for(&self, principal_id: u64) {
        self.state().failing_principals.insert(principal_id);
    }

    pub fn fail_acl_writes(&self) {
        self.state().failing_acl_writes = true;
    }

    pub fn fail_team_search(&self) {
        self.state().failing_team_search = true;
    }

    // Inspection helpers

    #[must_use]
    pub fn folder_creations(&self) -> usize {
        self.state().folder_creations
    }

    #[must_use]
    pub fn local_acl(&self, entity_id: &str) -> Option<Vec<ResourceAccess>> {
        self.state().acls.get(entity_id).cloned()
    }

    #[must_use]
    pub fn binding(&self, entity_id: &str) -> Option<SchemaBinding> {
        self.state().bindings.get(entity_id).cloned()
    }

    #[must_use]
    pub fn view(&self, view_id: &str) -> Option<FileView> {
        self.state().views.get(view_id).cloned()
    }

    #[must_use]
    pub fn wiki(&self, owner_id: &str) -> Option<Wiki> {
        self.state().wikis.get(owner_id).cloned()
    }

    #[must_use]
    pub fn name_of(&self, id: &str) -> Option<String> {
        self.state().nodes.get(id).map(|n| n.name.clone())
    }

    fn effective_acl(state: &State, entity_id: &str) -> Acl {
        let mut current = entity_id.to_string();
        loop {
            if let Some(entries) = state.acls.get(&current) {
                return Acl {
                    id: current,
                    etag: None,
                    resource_access: entries.clone(),
                };
            }
            match state.nodes.get(&current).and_then(|n| n.parent_id.clone()) {
                Some(parent) => current = parent,
                None => {
                    return Acl {
                        id: current,
                        etag: None,
                        resource_access: Vec::new(),
                    };
                }
            }
        }
    }
}

impl Platform for MemoryPlatform {
    fn list_child_folders(&self, parent_id: &str) -> Result<Vec<ChildFolder>> {
        let state = self.state();
        Ok(state
            .nodes
            .iter()
            .filter(|(_, n)| n.parent_id.as_deref() == Some(parent_id))
            .filter(|(_, n)| n.concrete_type == FOLDER_TYPE)
            .map(|(id, n)| ChildFolder {
                id: id.clone(),
                name: n.name.clone(),
            })
            .collect())
    }

    fn create_folder(&self, parent_id: &str, name: &str) -> Result<String> {
        let mut state = self.state();
        if state.failing_names.contains(name) {
            return Err(Error::http(500, format!("simulated failure creating '{name}'")));
        }
        let id = self.issue_id(&mut state);
        debug!("memory: create folder {name} ({id}) under {parent_id}");
        state.nodes.insert(
            id.clone(),
            Node {
                name: name.to_string(),
                parent_id: Some(parent_id.to_string()),
                concrete_type: FOLDER_TYPE.to_string(),
            },
        );
        state.folder_creations += 1;
        Ok(id)
    }

    fn get_entity(&self, id: &str) -> Result<Entity> {
        let state = self.state();
        let node = state
            .nodes
            .get(id)
            .ok_or_else(|| Error::NotFound(format!("entity {id}")))?;
        Ok(Entity {
            id: id.to_string(),
            name: node.name.clone(),
            parent_id: node.parent_id.clone(),
            etag: None,
            concrete_type: node.concrete_type.clone(),
            extra: serde_json::Map::new(),
        })
    }

    fn update_entity(&self, entity: &Entity) -> Result<Entity> {
        let mut state = self.state();
        let node = state
            .nodes
            .get_mut(&entity.id)
            .ok_or_else(|| Error::NotFound(format!("entity {}", entity.id)))?;
        node.name = entity.name.clone();
        Ok(entity.clone())
    }

    fn find_project(&self, name: &str) -> Result<Option<String>> {
        let state = self.state();
        Ok(state
            .nodes
            .iter()
            .find(|(_, n)| n.parent_id.is_none() && n.name == name)
            .map(|(id, _)| id.clone()))
    }

    fn create_project(&self, name: &str) -> Result<String> {
        Ok(self.add_project(name))
    }

    fn get_acl(&self, entity_id: &str) -> Result<Acl> {
        Ok(Self::effective_acl(&self.state(), entity_id))
    }

    fn grant_access(&self, entity_id: &str, principal_id: u64, access: AccessSet) -> Result<()> {
        let mut state = self.state();
        if state.failing_principals.contains(&principal_id) || state.failing_acl_writes {
            return Err(Error::http(
                403,
                format!("simulated failure granting {principal_id}"),
            ));
        }
        let mut acl = Self::effective_acl(&state, entity_id);
        acl.upsert(principal_id, access.to_owned_strings());
        state.acls.insert(entity_id.to_string(), acl.resource_access);
        Ok(())
    }

    fn replace_acl(&self, entity_id: &str, entries: &[ResourceAccess]) -> Result<()> {
        let mut state = self.state();
        if state.failing_acl_writes {
            return Err(Error::http(403, "simulated failure replacing ACL"));
        }
        state.acls.insert(entity_id.to_string(), entries.to_vec());
        Ok(())
    }

    fn search_teams(&self, fragment: &str) -> Result<Vec<Team>> {
        let state = self.state();
        if state.failing_team_search {
            return Err(Error::http(503, "simulated team search outage"));
        }
        Ok(state
            .teams
            .iter()
            .filter(|t| t.name.contains(fragment))
            .cloned()
            .collect())
    }

    fn create_team(&self, name: &str) -> Result<Team> {
        let mut state = self.state();
        state.next_id += 1;
        let team = Team {
            id: state.next_id.to_string(),
            name: name.to_string(),
        };
        state.teams.push(team.clone());
        Ok(team)
    }

    fn schema_registered(&self, uri: &str) -> Result<bool> {
        Ok(self.state().schemas.contains(uri))
    }

    fn bind_schema(&self, entity_id: &str, uri: &str, derived_annotations: bool) -> Result<()> {
        self.state().bindings.insert(
            entity_id.to_string(),
            SchemaBinding {
                uri: uri.to_string(),
                derived_annotations,
            },
        );
        Ok(())
    }

    fn create_file_view(
        &self,
        parent_id: &str,
        name: &str,
        _description: &str,
        columns: &[Column],
    ) -> Result<String> {
        let mut state = self.state();
        let id = self.issue_id(&mut state);
        state.views.insert(
            id.clone(),
            FileView {
                parent_id: parent_id.to_string(),
                name: name.to_string(),
                columns: columns.to_vec(),
            },
        );
        Ok(id)
    }

    fn query_view_files(&self, view_id: &str) -> Result<Vec<ViewFile>> {
        let state = self.state();
        if !state.views.contains_key(view_id) && !state.view_files.contains_key(view_id) {
            return Err(Error::http(404, format!("view {view_id} not found")));
        }
        Ok(state.view_files.get(view_id).cloned().unwrap_or_default())
    }

    fn list_invalid_files(&self, container_id: &str) -> Result<Vec<InvalidFile>> {
        Ok(self
            .state()
            .invalid
            .get(container_id)
            .cloned()
            .unwrap_or_default())
    }

    fn get_wiki(&self, owner_id: &str) -> Result<Option<Wiki>> {
        Ok(self.state().wikis.get(owner_id).cloned())
    }

    fn put_wiki(&self, owner_id: &str, wiki: &Wiki) -> Result<Wiki> {
        let mut state = self.state();
        let mut stored = wiki.clone();
        if stored.id.is_none() {
            state.next_id += 1;
            stored.id = Some(state.next_id.to_string());
        }
        state.wikis.insert(owner_id.to_string(), stored.clone());
        Ok(stored)
    }
}
