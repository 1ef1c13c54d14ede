mod hash;

pub use hash::compute_hash;

/// Current installer version, taken from the package manifest
pub const INSTALLER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the script applied after every install and upgrade
pub const STORED_PROCEDURES_SCRIPT: &str = "StoredProcedures.sql";

/// Default database file used when nothing is configured
pub const DEFAULT_DATABASE: &str = "subtext.db";

/// Get current timestamp in ISO 8601 format
pub fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339()
}
