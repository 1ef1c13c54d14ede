//! Catalog of versioned installation scripts.
//!
//! Scripts are discovered from a [`ScriptSource`] and recognized by name:
//! `Installation.<major>.<minor>.<build>.sql`, case-insensitive. Anything
//! else in the source is ignored by version listings, though it can still be
//! loaded by name (the stored procedures script, for instance).
//!
//! Each descriptor keeps the identifier it was parsed from, and selected
//! scripts are read back through that identifier, so a listed script is
//! always the resource that gets executed.
//!
//! Listings are sorted by script name as a plain string, not by version.
//! Script authors zero-pad version components so that the two orders agree;
//! names that are not padded (`1.10.0` against `1.9.0`) sort by text.

pub mod source;

pub use source::{resolves, DirectoryScripts, EmbeddedScripts, ScriptSource, StaticScripts};

use crate::install::InstallerError;
use crate::version::Version;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

static SCRIPT_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?P<name>Installation\.(?P<major>\d+)\.(?P<minor>\d+)\.(?P<build>\d+)\.sql)$")
        .expect("script name pattern is valid")
});

/// A versioned script recognized from its resource identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptDescriptor {
    resource_id: String,
    script_name: String,
    version: Version,
}

impl ScriptDescriptor {
    /// The identifier of the resource this script was parsed from.
    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    /// The script name, e.g. `Installation.01.05.00.sql`.
    pub fn script_name(&self) -> &str {
        &self.script_name
    }

    /// The version embedded in the script name.
    pub fn version(&self) -> &Version {
        &self.version
    }
}

/// Parse a resource identifier into a script descriptor.
///
/// Returns `None` for identifiers that are not versioned installation
/// scripts; callers skip those.
pub fn parse_descriptor(resource_id: &str) -> Option<ScriptDescriptor> {
    let captures = SCRIPT_NAME.captures(resource_id)?;
    let component = |group: &str| captures[group].parse::<u32>().ok();

    Some(ScriptDescriptor {
        resource_id: resource_id.to_string(),
        script_name: captures["name"].to_string(),
        version: Version::new(
            component("major")?,
            component("minor")?,
            component("build")?,
        ),
    })
}

/// Versioned view over a script source.
#[derive(Clone)]
pub struct ScriptCatalog {
    source: Arc<dyn ScriptSource>,
}

impl ScriptCatalog {
    /// Create a catalog over the given source.
    pub fn new(source: Arc<dyn ScriptSource>) -> Self {
        Self { source }
    }

    /// Catalog over the scripts compiled into the binary.
    pub fn embedded() -> Self {
        Self::new(Arc::new(EmbeddedScripts))
    }

    /// Every versioned script in the source, in source order.
    pub fn descriptors(&self) -> Result<Vec<ScriptDescriptor>, InstallerError> {
        Ok(self
            .source
            .list()?
            .iter()
            .filter_map(|id| parse_descriptor(id))
            .collect())
    }

    /// Select scripts with a version in `(min_exclusive, max_inclusive]`.
    ///
    /// A `None` bound is open. The result is sorted by script name; scripts
    /// sharing a name keep their source order.
    pub fn select_scripts(
        &self,
        min_exclusive: Option<&Version>,
        max_inclusive: Option<&Version>,
    ) -> Result<Vec<ScriptDescriptor>, InstallerError> {
        let mut scripts: Vec<ScriptDescriptor> = self
            .descriptors()?
            .into_iter()
            .filter(|d| min_exclusive.map_or(true, |min| d.version() > min))
            .filter(|d| max_inclusive.map_or(true, |max| d.version() <= max))
            .collect();

        scripts.sort_by(|a, b| a.script_name.cmp(&b.script_name));
        Ok(scripts)
    }

    /// List script names with a version in `(min_exclusive, max_inclusive]`.
    ///
    /// Same selection and order as [`ScriptCatalog::select_scripts`]; may
    /// contain duplicates if two resources share a script name.
    pub fn list_scripts(
        &self,
        min_exclusive: Option<&Version>,
        max_inclusive: Option<&Version>,
    ) -> Result<Vec<String>, InstallerError> {
        Ok(self
            .select_scripts(min_exclusive, max_inclusive)?
            .into_iter()
            .map(|d| d.script_name)
            .collect())
    }

    /// Read the resource a descriptor was parsed from.
    pub fn read(&self, descriptor: &ScriptDescriptor) -> Result<String, InstallerError> {
        self.source
            .read(&descriptor.resource_id)?
            .ok_or_else(|| InstallerError::ScriptNotFound(descriptor.resource_id.clone()))
    }

    /// Load a script by name.
    ///
    /// The first resource in source order that either ends with the name at
    /// a separator or parses to a versioned script of that name is read.
    pub fn load(&self, script_name: &str) -> Result<String, InstallerError> {
        let resource_id = self.source.list()?.into_iter().find(|id| {
            resolves(id, script_name)
                || parse_descriptor(id)
                    .is_some_and(|d| d.script_name.eq_ignore_ascii_case(script_name))
        });

        match resource_id {
            Some(id) => self
                .source
                .read(&id)?
                .ok_or_else(|| InstallerError::ScriptNotFound(id)),
            None => Err(InstallerError::ScriptNotFound(script_name.to_string())),
        }
    }
}

impl std::fmt::Debug for ScriptCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptCatalog").finish_non_exhaustive()
    }
}
