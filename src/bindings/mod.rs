//! Schema binding bookkeeping and application.

pub mod batch;
pub mod binder;
pub mod config;
pub mod recorder;

pub use batch::{BatchOptions, BindRunner, DryRunRunner, SubprocessRunner, bind_all, retry_failed};
pub use binder::{BindOptions, BindReport, SchemaBinder, SchemaFile, SchemaName, schema_uri};
pub use config::MergeSummary;
pub use recorder::record_bindings;
