pub mod catalog;
pub mod classify;
pub mod config;
pub mod install;
pub mod store;
pub mod utils;
pub mod version;

// Re-export commonly used types
pub use catalog::{
    parse_descriptor, DirectoryScripts, EmbeddedScripts, ScriptCatalog, ScriptDescriptor,
    ScriptSource, StaticScripts,
};
pub use classify::is_installation_error;
pub use config::{ConfigError, ConfigOverrides, InstallerConfig};
pub use install::{InstallReport, InstallationState, Installer, InstallerError};
pub use store::VersionStore;
pub use version::{binary_version, Version, VersionError};
