//! Executes installation scripts against an open transaction.

use super::types::InstallerError;
use crate::utils::compute_hash;
use rusqlite::Transaction;
use tracing::debug;

/// Split a script into batches on `GO` separator lines.
///
/// A separator is a line holding only `GO` (any case, surrounding
/// whitespace allowed). Blank batches are dropped.
pub fn split_batches(sql: &str) -> Vec<&str> {
    let mut batches = Vec::new();
    let mut start = 0;
    let mut offset = 0;

    for line in sql.split_inclusive('\n') {
        if line.trim().eq_ignore_ascii_case("GO") {
            batches.push(&sql[start..offset]);
            start = offset + line.len();
        }
        offset += line.len();
    }
    batches.push(&sql[start..]);

    batches.retain(|batch| !batch.trim().is_empty());
    batches
}

/// Execute every batch of `sql` inside `tx`.
///
/// The first failing statement aborts the script with
/// [`InstallerError::ScriptExecution`].
pub fn execute_script(tx: &Transaction<'_>, name: &str, sql: &str) -> Result<(), InstallerError> {
    let batches = split_batches(sql);
    debug!(
        script = %name,
        checksum = %compute_hash(sql),
        batches = batches.len(),
        "Executing script"
    );

    for batch in batches {
        tx.execute_batch(batch)
            .map_err(|source| InstallerError::ScriptExecution {
                script: name.to_string(),
                source,
            })?;
    }
    Ok(())
}
