pub mod credentials;
pub mod files;
mod settings;

pub use settings::{DEFAULT_SETTINGS_FILE, RetrySettings, Settings, TeamIds};
