//! Types for the installation engine.

use crate::version::{Version, VersionError};
use serde::Serialize;
use thiserror::Error;

/// Error types for installation operations.
#[derive(Error, Debug)]
pub enum InstallerError {
    #[error("Required argument missing: {0}")]
    MissingArgument(&'static str),

    #[error("Script {script} failed: {source}")]
    ScriptExecution {
        script: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Script not found: {0}")]
    ScriptNotFound(String),

    #[error("Transaction error: {0}")]
    Transaction(#[source] rusqlite::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Script directory error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Version error: {0}")]
    Version(#[from] VersionError),
}

/// State of the target database relative to the running binary.
///
/// Always derived from the stored version, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InstallationState {
    /// No version has ever been recorded.
    NeedsInstallation,
    /// The recorded version is behind and scripts exist to close the gap.
    NeedsUpgrade,
    /// Nothing left to apply.
    Complete,
}

/// Summary of a committed install or upgrade.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallReport {
    /// The version recorded before the operation, if any.
    pub from_version: Option<Version>,
    /// The version recorded by the operation.
    pub to_version: Version,
    /// Scripts executed, in order. Ends with the stored procedures script.
    pub scripts_applied: Vec<String>,
    /// Commit timestamp (RFC 3339).
    pub completed_at: String,
}
