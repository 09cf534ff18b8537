//! # htan2-synapse
//!
//! Provisioning, access control, and schema-binding tooling for HTAN2
//! projects on Synapse, usable both as the `htan2` binary and as a library.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! htan2-synapse = { version = "0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use htan2_synapse::platform::MemoryPlatform;
//! use htan2_synapse::provision::Provisioner;
//! use htan2_synapse::types::{Project, Tier, Version};
//!
//! let platform = MemoryPlatform::default();
//! let project = Project {
//!     name: "HTAN2_Ovarian".into(),
//!     synapse_id: platform.add_project("HTAN2_Ovarian"),
//! };
//! let version = Version::parse("v8")?;
//! let outcome = Provisioner::new(&platform).provision(&project, &version, &Tier::ALL);
//! assert!(outcome.failures.is_empty());
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Includes the CLI module. Disable with `default-features = false`.

pub mod bindings;
pub mod catalog;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod platform;
pub mod provision;
pub mod report;
pub mod types;
