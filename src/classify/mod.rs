//! Recognizes database errors caused by a missing or outdated schema.
//!
//! Such errors mean "the installer has not run yet" rather than an
//! application fault. The check is textual: an error qualifies when a
//! database error in its source chain reports a missing object, or a
//! missing column on a table an upgrade has not altered yet.

use crate::install::InstallerError;
use once_cell::sync::Lazy;
use regex::RegexSet;
use std::error::Error;

static MISSING_OBJECT: Lazy<RegexSet> = Lazy::new(|| {
    RegexSet::new([
        r"(?i)Invalid object name '.*?'",
        r"(?i)Could not find stored procedure '.*?'",
        // SQLite reports missing tables and views alike
        r"(?i)no such table: \S+",
        r"(?i)no such column: \S+",
    ])
    .expect("missing object patterns are valid")
});

/// Whether `error` indicates the schema is not installed or not upgraded.
///
/// Fails with [`InstallerError::MissingArgument`] when no error is given.
pub fn is_installation_error(
    error: Option<&(dyn Error + 'static)>,
) -> Result<bool, InstallerError> {
    let error = error.ok_or(InstallerError::MissingArgument("error"))?;

    let mut current = Some(error);
    while let Some(e) = current {
        if let Some(db_error) = e.downcast_ref::<rusqlite::Error>() {
            if MISSING_OBJECT.is_match(&db_error.to_string()) {
                return Ok(true);
            }
        }
        current = e.source();
    }
    Ok(false)
}
