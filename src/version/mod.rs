//! Version management for the installer.
//!
//! This module provides the four-part version used both for the schema
//! version recorded in the database and for the running binary.

mod types;

pub use types::{Version, VersionError};

use crate::utils::INSTALLER_VERSION;

/// Get the version of the running binary.
///
/// This is the default upgrade target when no explicit version is configured.
pub fn binary_version() -> Version {
    // The crate version is always three numeric parts.
    Version::parse(INSTALLER_VERSION).unwrap_or(Version::BASELINE)
}
