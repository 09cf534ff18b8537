//! Project, folder, team and permission provisioning.

pub mod folders;
pub mod permissions;
pub mod registry;
pub mod teams;

pub use folders::{FolderFailure, ProvisionOutcome, Provisioner, ensure_folder};
pub use permissions::{AclReport, GrantOutcome, GrantStatus, PolicyEngine, Principal, policy};
pub use registry::load_projects;
pub use teams::TeamResolver;
