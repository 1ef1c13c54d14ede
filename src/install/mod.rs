//! Installation and upgrade engine.
//!
//! # Overview
//!
//! - The installation state is derived on every query from the stored
//!   version and the running binary's version
//! - Install and upgrade select the scripts between the stored version and
//!   the target, run them in catalog order, re-apply the stored procedures
//!   script and record the target version
//! - All of it happens in one exclusive transaction: on any failure nothing
//!   is committed and the original error is returned
//!
//! Nothing here coordinates separate processes. Callers that may run two
//! installers against one database must serialize them.
//!
//! # Usage
//!
//! ```ignore
//! let conn = Connection::open("subtext.db")?;
//! let mut installer = Installer::new(conn, ScriptCatalog::embedded(), binary_version());
//! match installer.status()? {
//!     InstallationState::NeedsInstallation => installer.install(&binary_version())?,
//!     InstallationState::NeedsUpgrade => installer.upgrade()?,
//!     InstallationState::Complete => { /* nothing to do */ }
//! }
//! ```

pub mod runner;
mod types;

pub use types::{InstallReport, InstallationState, InstallerError};

use crate::catalog::ScriptCatalog;
use crate::store::VersionStore;
use crate::utils::{now_iso, STORED_PROCEDURES_SCRIPT};
use crate::version::Version;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::{error, info};

/// Drives installation and upgrade of one database.
pub struct Installer {
    conn: Connection,
    catalog: ScriptCatalog,
    store: VersionStore,
    binary_version: Version,
}

impl Installer {
    /// Create an installer for `conn`.
    ///
    /// `binary_version` is the version of the running application; upgrades
    /// target it.
    pub fn new(conn: Connection, catalog: ScriptCatalog, binary_version: Version) -> Self {
        Self {
            conn,
            catalog,
            store: VersionStore::new(),
            binary_version,
        }
    }

    /// Replace the version store, e.g. to use other procedure names.
    pub fn with_store(mut self, store: VersionStore) -> Self {
        self.store = store;
        self
    }

    /// The underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// The version upgrades target.
    pub fn binary_version(&self) -> &Version {
        &self.binary_version
    }

    /// The script catalog in use.
    pub fn catalog(&self) -> &ScriptCatalog {
        &self.catalog
    }

    /// Get the version recorded in the database.
    pub fn current_version(&self) -> Result<Option<Version>, InstallerError> {
        self.store.current_version(&self.conn)
    }

    /// Get the installation state of the database.
    pub fn status(&self) -> Result<InstallationState, InstallerError> {
        let state = match self.current_version()? {
            None => InstallationState::NeedsInstallation,
            Some(installed) if self.needs_upgrade(Some(&installed))? => {
                InstallationState::NeedsUpgrade
            }
            Some(_) => InstallationState::Complete,
        };
        Ok(state)
    }

    /// Whether a database at `installed` has scripts left to apply.
    ///
    /// `None` is treated as [`Version::BASELINE`]. A stored version behind
    /// the binary with no scripts in between is reported as up to date.
    pub fn needs_upgrade(&self, installed: Option<&Version>) -> Result<bool, InstallerError> {
        let installed = installed.unwrap_or(&Version::BASELINE);
        if installed >= &self.binary_version {
            return Ok(false);
        }

        let scripts = self
            .catalog
            .list_scripts(Some(installed), Some(&self.binary_version))?;
        Ok(!scripts.is_empty())
    }

    /// Install the schema up to `target_version`.
    ///
    /// Applies every script above the stored version, or every script up to
    /// the target when nothing is stored.
    pub fn install(&mut self, target_version: &Version) -> Result<InstallReport, InstallerError> {
        self.apply(target_version, false)
    }

    /// Upgrade the schema to the binary version.
    ///
    /// A database without a stored version is assumed to be at
    /// [`Version::BASELINE`].
    pub fn upgrade(&mut self) -> Result<InstallReport, InstallerError> {
        let target = self.binary_version.clone();
        self.apply(&target, true)
    }

    fn apply(
        &mut self,
        target: &Version,
        assume_baseline: bool,
    ) -> Result<InstallReport, InstallerError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Exclusive)
            .map_err(InstallerError::Transaction)?;

        match apply_scripts(&tx, &self.catalog, &self.store, target, assume_baseline) {
            Ok((from_version, scripts_applied)) => {
                tx.commit().map_err(InstallerError::Transaction)?;

                info!(
                    from = %display_version(from_version.as_ref()),
                    to = %target,
                    count = scripts_applied.len(),
                    "Installation completed successfully"
                );

                Ok(InstallReport {
                    from_version,
                    to_version: target.clone(),
                    scripts_applied,
                    completed_at: now_iso(),
                })
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback() {
                    error!(error = %rollback_err, "Rollback failed");
                }
                Err(e)
            }
        }
    }
}

/// Run steps (a) through (e) of an install inside `tx`.
///
/// Returns the baseline and the names of the scripts that ran.
fn apply_scripts(
    tx: &Transaction<'_>,
    catalog: &ScriptCatalog,
    store: &VersionStore,
    target: &Version,
    assume_baseline: bool,
) -> Result<(Option<Version>, Vec<String>), InstallerError> {
    let mut baseline = store.current_version(tx)?;
    if assume_baseline && baseline.is_none() {
        baseline = Some(Version::BASELINE);
    }

    info!(
        from = %display_version(baseline.as_ref()),
        to = %target,
        "Starting installation"
    );

    let scripts = catalog.select_scripts(baseline.as_ref(), Some(target))?;
    let mut applied = Vec::with_capacity(scripts.len() + 1);
    for script in &scripts {
        info!(
            script = %script.script_name(),
            resource = %script.resource_id(),
            "Applying script"
        );
        let sql = catalog.read(script)?;
        runner::execute_script(tx, script.script_name(), &sql)?;
        applied.push(script.script_name().to_string());
    }

    let sql = catalog.load(STORED_PROCEDURES_SCRIPT)?;
    runner::execute_script(tx, STORED_PROCEDURES_SCRIPT, &sql)?;
    applied.push(STORED_PROCEDURES_SCRIPT.to_string());

    store.update_version(tx, target)?;
    Ok((baseline, applied))
}

fn display_version(version: Option<&Version>) -> String {
    version.map_or_else(|| "none".to_string(), ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StaticScripts;
    use std::sync::Arc;

    const PROCEDURES: &str = "
        CREATE TABLE IF NOT EXISTS subtext_Version (
            Id INTEGER PRIMARY KEY AUTOINCREMENT,
            Major INTEGER NOT NULL,
            Minor INTEGER NOT NULL,
            Build INTEGER NOT NULL
        );
        DROP VIEW IF EXISTS subtext_VersionGetCurrent;
        CREATE VIEW subtext_VersionGetCurrent AS
            SELECT Major, Minor, Build FROM subtext_Version ORDER BY Id DESC LIMIT 1;
        DROP VIEW IF EXISTS subtext_VersionAdd;
        CREATE VIEW subtext_VersionAdd AS SELECT Major, Minor, Build FROM subtext_Version;
        CREATE TRIGGER subtext_VersionAdd_Insert INSTEAD OF INSERT ON subtext_VersionAdd
        BEGIN
            INSERT INTO subtext_Version (Major, Minor, Build) VALUES (NEW.Major, NEW.Minor, NEW.Build);
        END;
    ";

    fn installer(source: StaticScripts, binary: Version) -> Installer {
        let conn = Connection::open_in_memory().unwrap();
        let source = source.with("StoredProcedures.sql", PROCEDURES);
        Installer::new(conn, ScriptCatalog::new(Arc::new(source)), binary)
    }

    fn script_log(installer: &Installer) -> Vec<String> {
        let mut stmt = installer
            .connection()
            .prepare("SELECT name FROM script_log ORDER BY rowid")
            .unwrap();
        let names = stmt
            .query_map([], |r| r.get(0))
            .unwrap()
            .collect::<Result<Vec<String>, _>>()
            .unwrap();
        names
    }

    fn logging(name: &str) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS script_log (name TEXT);\
             INSERT INTO script_log VALUES ('{name}');"
        )
    }

    #[test]
    fn test_needs_upgrade_false_at_or_above_binary() {
        let source = StaticScripts::new().with("Installation.2.0.0.sql", "SELECT 1;");
        let installer = installer(source, Version::new(2, 0, 0));

        assert!(!installer.needs_upgrade(Some(&Version::new(2, 0, 0))).unwrap());
        assert!(!installer.needs_upgrade(Some(&Version::new(3, 1, 0))).unwrap());
    }

    #[test]
    fn test_needs_upgrade_none_is_baseline() {
        let source = StaticScripts::new().with("Installation.1.0.0.sql", "SELECT 1;");
        let installer = installer(source, Version::BASELINE);
        assert!(!installer.needs_upgrade(None).unwrap());

        let source = StaticScripts::new().with("Installation.1.1.0.sql", "SELECT 1;");
        let installer = self::installer(source, Version::new(1, 1, 0));
        assert!(installer.needs_upgrade(None).unwrap());
    }

    #[test]
    fn test_needs_upgrade_gap_without_scripts() {
        // Stored 1.5.0 is behind 2.0.0 but no script covers the gap
        let source = StaticScripts::new().with("Installation.1.5.0.sql", "SELECT 1;");
        let installer = installer(source, Version::new(2, 0, 0));
        assert!(!installer.needs_upgrade(Some(&Version::new(1, 5, 0))).unwrap());
    }

    #[test]
    fn test_install_runs_scripts_in_order_then_procedures() {
        let source = StaticScripts::new()
            .with("Installation.02.00.00.sql", logging("2.0.0"))
            .with("Installation.01.05.00.sql", logging("1.5.0"))
            .with("Installation.03.00.00.sql", logging("3.0.0"));
        let mut installer = installer(source, Version::new(2, 0, 0));

        let report = installer.install(&Version::new(2, 0, 0)).unwrap();
        assert_eq!(report.from_version, None);
        assert_eq!(report.to_version, Version::new(2, 0, 0));
        assert_eq!(
            report.scripts_applied,
            vec![
                "Installation.01.05.00.sql",
                "Installation.02.00.00.sql",
                "StoredProcedures.sql",
            ]
        );
        assert_eq!(script_log(&installer), vec!["1.5.0", "2.0.0"]);
        assert_eq!(
            installer.current_version().unwrap(),
            Some(Version::new(2, 0, 0))
        );
    }

    #[test]
    fn test_upgrade_without_version_skips_baseline_script() {
        let source = StaticScripts::new()
            .with("Installation.1.0.0.sql", logging("1.0.0"))
            .with("Installation.1.1.0.sql", logging("1.1.0"));
        let mut installer = installer(source, Version::new(1, 1, 0));

        let report = installer.upgrade().unwrap();
        assert_eq!(report.from_version, Some(Version::BASELINE));
        assert_eq!(script_log(&installer), vec!["1.1.0"]);
        assert_eq!(installer.status().unwrap(), InstallationState::Complete);
    }

    #[test]
    fn test_failed_script_rolls_back_everything() {
        let source = StaticScripts::new()
            .with("Installation.1.5.0.sql", logging("1.5.0"))
            .with("Installation.2.0.0.sql", "INSERT INTO no_such_table VALUES (1);");
        let mut installer = installer(source, Version::new(2, 0, 0));

        assert_eq!(installer.current_version().unwrap(), None);
        let err = installer.install(&Version::new(2, 0, 0)).unwrap_err();

        assert!(matches!(
            err,
            InstallerError::ScriptExecution { ref script, .. } if script == "Installation.2.0.0.sql"
        ));
        assert_eq!(installer.current_version().unwrap(), None);

        let log_exists: i64 = installer
            .connection()
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE name = 'script_log'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(log_exists, 0, "earlier scripts must not be committed");
    }

    #[test]
    fn test_missing_procedures_script_fails_install() {
        let conn = Connection::open_in_memory().unwrap();
        let source = StaticScripts::new().with("Installation.1.0.0.sql", logging("1.0.0"));
        let mut installer = Installer::new(
            conn,
            ScriptCatalog::new(Arc::new(source)),
            Version::new(1, 0, 0),
        );

        let err = installer.install(&Version::new(1, 0, 0)).unwrap_err();
        assert!(matches!(err, InstallerError::ScriptNotFound(name) if name == "StoredProcedures.sql"));
        assert_eq!(installer.current_version().unwrap(), None);
    }

    #[test]
    fn test_install_runs_prefixed_script() {
        let source = StaticScripts::new().with("OldInstallation.1.1.0.sql", logging("1.1.0"));
        let mut installer = installer(source, Version::new(1, 1, 0));

        let report = installer.install(&Version::new(1, 1, 0)).unwrap();
        assert_eq!(
            report.scripts_applied,
            vec!["Installation.1.1.0.sql", "StoredProcedures.sql"]
        );
        assert_eq!(script_log(&installer), vec!["1.1.0"]);
    }

    #[test]
    fn test_install_runs_each_duplicate_once() {
        let source = StaticScripts::new()
            .with("a/Installation.1.1.0.sql", logging("first"))
            .with("b/Installation.1.1.0.sql", logging("second"));
        let mut installer = installer(source, Version::new(1, 1, 0));

        let report = installer.install(&Version::new(1, 1, 0)).unwrap();
        assert_eq!(
            report.scripts_applied,
            vec![
                "Installation.1.1.0.sql",
                "Installation.1.1.0.sql",
                "StoredProcedures.sql",
            ]
        );
        assert_eq!(script_log(&installer), vec!["first", "second"]);
    }
}
