#![allow(dead_code)]

use rusqlite::Connection;
use std::sync::Arc;
use subtext_installer::{Installer, ScriptCatalog, StaticScripts, Version};
use tempfile::TempDir;

/// Version procedures equivalent to the bundled stored procedures script
pub const PROCEDURES: &str = "
CREATE TABLE IF NOT EXISTS subtext_Version (
    Id INTEGER PRIMARY KEY AUTOINCREMENT,
    Major INTEGER NOT NULL,
    Minor INTEGER NOT NULL,
    Build INTEGER NOT NULL
);
DROP VIEW IF EXISTS subtext_VersionGetCurrent;
CREATE VIEW subtext_VersionGetCurrent AS
    SELECT Major, Minor, Build FROM subtext_Version ORDER BY Id DESC LIMIT 1;
GO
DROP VIEW IF EXISTS subtext_VersionAdd;
CREATE VIEW subtext_VersionAdd AS SELECT Major, Minor, Build FROM subtext_Version;
CREATE TRIGGER subtext_VersionAdd_Insert INSTEAD OF INSERT ON subtext_VersionAdd
BEGIN
    INSERT INTO subtext_Version (Major, Minor, Build) VALUES (NEW.Major, NEW.Minor, NEW.Build);
END;
";

/// Create a temporary directory for test files
pub fn create_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Script that records its own name when executed
pub fn recording_script(name: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS applied_scripts (name TEXT NOT NULL);\n\
         INSERT INTO applied_scripts (name) VALUES ('{name}');\n"
    )
}

/// Names recorded by `recording_script`, in execution order
pub fn applied_scripts(conn: &Connection) -> Vec<String> {
    let exists: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE name = 'applied_scripts'",
            [],
            |r| r.get(0),
        )
        .expect("Should query schema");
    if exists == 0 {
        return Vec::new();
    }

    let mut stmt = conn
        .prepare("SELECT name FROM applied_scripts ORDER BY rowid")
        .expect("Should prepare");
    let names = stmt
        .query_map([], |r| r.get(0))
        .expect("Should query")
        .collect::<Result<Vec<String>, _>>()
        .expect("Should read rows");
    names
}

/// Static source with the version procedures script added
pub fn source_with_procedures(scripts: &[(&str, String)]) -> StaticScripts {
    scripts
        .iter()
        .fold(StaticScripts::new(), |source, (id, sql)| source.with(*id, sql.clone()))
        .with("Scripts.StoredProcedures.sql", PROCEDURES)
}

/// Installer over an in-memory database
pub fn memory_installer(source: StaticScripts, binary_version: Version) -> Installer {
    let conn = Connection::open_in_memory().expect("Should open database");
    Installer::new(conn, ScriptCatalog::new(Arc::new(source)), binary_version)
}
