//! The data-repository platform as seen by this crate.
//!
//! Components receive a `&dyn Platform` instead of reaching for a global
//! client, so a live run binds [`SynapseClient`] and a dry run binds
//! [`MemoryPlatform`].

pub mod http;
pub mod memory;

pub use http::{RetryPolicy, SynapseClient};
pub use memory::MemoryPlatform;

use crate::error::Result;
use crate::types::*;

/// Platform defines the calls the provisioning tools make.
pub trait Platform: Send + Sync {
    // Entity operations
    fn list_child_folders(&self, parent_id: &str) -> Result<Vec<ChildFolder>>;
    fn create_folder(&self, parent_id: &str, name: &str) -> Result<String>;
    fn get_entity(&self, id: &str) -> Result<Entity>;
    fn update_entity(&self, entity: &Entity) -> Result<Entity>;
    fn find_project(&self, name: &str) -> Result<Option<String>>;
    fn create_project(&self, name: &str) -> Result<String>;

    // ACL operations. `get_acl` returns the effective list, which may be
    // owned by an ancestor.
    fn get_acl(&self, entity_id: &str) -> Result<Acl>;
    fn grant_access(&self, entity_id: &str, principal_id: u64, access: AccessSet) -> Result<()>;
    fn replace_acl(&self, entity_id: &str, entries: &[ResourceAccess]) -> Result<()>;

    // Team operations
    fn search_teams(&self, fragment: &str) -> Result<Vec<Team>>;
    fn create_team(&self, name: &str) -> Result<Team>;

    // JSON schema operations
    fn schema_registered(&self, uri: &str) -> Result<bool>;
    fn bind_schema(&self, entity_id: &str, uri: &str, derived_annotations: bool) -> Result<()>;

    // Views and wikis
    fn create_file_view(
        &self,
        parent_id: &str,
        name: &str,
        description: &str,
        columns: &[Column],
    ) -> Result<String>;
    fn query_view_files(&self, view_id: &str) -> Result<Vec<ViewFile>>;
    fn list_invalid_files(&self, container_id: &str) -> Result<Vec<InvalidFile>>;
    fn get_wiki(&self, owner_id: &str) -> Result<Option<Wiki>>;
    fn put_wiki(&self, owner_id: &str, wiki: &Wiki) -> Result<Wiki>;
}
