//! Script sources the catalog can scan.
//!
//! A source exposes resource identifiers and reads script text by exact
//! identifier. Identifiers may carry a prefix (a namespace or a relative
//! path); mapping a script name onto an identifier is the catalog's job.

use crate::install::InstallerError;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A set of migration script resources.
pub trait ScriptSource: Send + Sync {
    /// List every resource identifier in the source.
    fn list(&self) -> Result<Vec<String>, InstallerError>;

    /// Read the resource with exactly this identifier.
    ///
    /// Returns `Ok(None)` when there is no such resource.
    fn read(&self, resource_id: &str) -> Result<Option<String>, InstallerError>;
}

/// Whether `resource_id` names the script `script_name`.
///
/// Matches an equal identifier, or one ending with the name right after a
/// `.`, `/` or `\` separator. Comparison ignores ASCII case.
pub fn resolves(resource_id: &str, script_name: &str) -> bool {
    let id = resource_id.to_ascii_lowercase();
    let name = script_name.to_ascii_lowercase();

    if id == name {
        return true;
    }
    match id.strip_suffix(&name) {
        Some(prefix) => prefix.ends_with(['.', '/', '\\']),
        None => false,
    }
}

const EMBEDDED: &[(&str, &str)] = &[
    (
        "Subtext.Installation.Scripts.Installation.01.00.00.sql",
        include_str!("../../sql/Installation.01.00.00.sql"),
    ),
    (
        "Subtext.Installation.Scripts.Installation.01.05.00.sql",
        include_str!("../../sql/Installation.01.05.00.sql"),
    ),
    (
        "Subtext.Installation.Scripts.Installation.02.00.00.sql",
        include_str!("../../sql/Installation.02.00.00.sql"),
    ),
    (
        "Subtext.Installation.Scripts.StoredProcedures.sql",
        include_str!("../../sql/StoredProcedures.sql"),
    ),
];

/// Scripts compiled into the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedScripts;

impl ScriptSource for EmbeddedScripts {
    fn list(&self) -> Result<Vec<String>, InstallerError> {
        Ok(EMBEDDED.iter().map(|(id, _)| id.to_string()).collect())
    }

    fn read(&self, resource_id: &str) -> Result<Option<String>, InstallerError> {
        Ok(EMBEDDED
            .iter()
            .find(|(id, _)| *id == resource_id)
            .map(|(_, sql)| sql.to_string()))
    }
}

/// Scripts held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticScripts {
    scripts: Vec<(String, String)>,
}

impl StaticScripts {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a script resource.
    pub fn with(mut self, resource_id: impl Into<String>, sql: impl Into<String>) -> Self {
        self.scripts.push((resource_id.into(), sql.into()));
        self
    }
}

impl ScriptSource for StaticScripts {
    fn list(&self) -> Result<Vec<String>, InstallerError> {
        Ok(self.scripts.iter().map(|(id, _)| id.clone()).collect())
    }

    fn read(&self, resource_id: &str) -> Result<Option<String>, InstallerError> {
        Ok(self
            .scripts
            .iter()
            .find(|(id, _)| id == resource_id)
            .map(|(_, sql)| sql.clone()))
    }
}

/// Scripts read from a directory tree.
///
/// Every `.sql` file below the root is a resource; its identifier is the
/// path relative to the root with `/` separators.
#[derive(Debug, Clone)]
pub struct DirectoryScripts {
    root: PathBuf,
}

impl DirectoryScripts {
    /// Create a source rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The directory this source scans.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entries(&self) -> Result<Vec<(String, PathBuf)>, InstallerError> {
        let mut entries = Vec::new();
        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let is_sql = entry
                .path()
                .extension()
                .map(|ext| ext.eq_ignore_ascii_case("sql"))
                .unwrap_or(false);
            if !is_sql {
                continue;
            }

            let relative = entry.path().strip_prefix(&self.root).unwrap_or(entry.path());
            let id = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            entries.push((id, entry.path().to_path_buf()));
        }
        Ok(entries)
    }
}

impl ScriptSource for DirectoryScripts {
    fn list(&self) -> Result<Vec<String>, InstallerError> {
        Ok(self.entries()?.into_iter().map(|(id, _)| id).collect())
    }

    fn read(&self, resource_id: &str) -> Result<Option<String>, InstallerError> {
        match self
            .entries()?
            .into_iter()
            .find(|(id, _)| id == resource_id)
        {
            Some((_, path)) => Ok(Some(std::fs::read_to_string(path)?)),
            None => Ok(None),
        }
    }
}
