//! Species table backed by the built-in profiles or a JSON file
//!
//! File format:
//!
//! ```json
//! { "fallback": "Big Brown Bat", "species": [ { "label": "Big Brown Bat", ... } ] }
//! ```

use crate::error::{BatcallError, Result};
use crate::species::builtin::{self, DEFAULT_FALLBACK};
use crate::species::SpeciesCatalog;
use crate::types::SpeciesProfile;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable pointing at a species table
pub const SPECIES_TABLE_ENV: &str = "BATCALL_SPECIES_TABLE";

/// File name looked up in the data directory
const TABLE_FILENAME: &str = "species.json";

/// On-disk layout of a species table
#[derive(Debug, Serialize, Deserialize)]
pub struct SpeciesTableFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
    pub species: Vec<SpeciesProfile>,
}

/// In-memory species catalog with a fallback that is guaranteed to exist
#[derive(Debug, Clone)]
pub struct SpeciesTable {
    profiles: BTreeMap<String, SpeciesProfile>,
    fallback: String,
}

impl SpeciesTable {
    /// Build a table; `fallback` must name one of `profiles`
    pub fn new(profiles: Vec<SpeciesProfile>, fallback: impl Into<String>) -> Result<Self> {
        let fallback = fallback.into();
        let mut map = BTreeMap::new();
        for profile in profiles {
            if let Some(previous) = map.insert(profile.label.clone(), profile) {
                warn!("Duplicate species profile '{}', keeping the later one", previous.label);
            }
        }

        if !map.contains_key(&fallback) {
            return Err(BatcallError::ConfigError(format!(
                "fallback species '{}' is not in the species table (known: {})",
                fallback,
                map.keys().cloned().collect::<Vec<_>>().join(", ")
            )));
        }

        Ok(Self {
            profiles: map,
            fallback,
        })
    }

    /// Profiles shipped with batcall
    pub fn builtin() -> Self {
        let profiles = builtin::profiles()
            .into_iter()
            .map(|p| (p.label.clone(), p))
            .collect();
        Self {
            profiles,
            fallback: DEFAULT_FALLBACK.to_string(),
        }
    }

    /// Same profiles, different fallback
    pub fn with_fallback(mut self, label: &str) -> Result<Self> {
        if !self.profiles.contains_key(label) {
            return Err(BatcallError::ConfigError(format!(
                "fallback species '{}' is not in the species table",
                label
            )));
        }
        self.fallback = label.to_string();
        Ok(self)
    }

    /// Load a table from JSON
    ///
    /// Without an explicit `fallback` in the file, the default label is used
    /// if present, otherwise the first profile in the file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            BatcallError::ConfigError(format!(
                "cannot open species table {}: {}",
                path.display(),
                e
            ))
        })?;
        let parsed: SpeciesTableFile =
            serde_json::from_reader(BufReader::new(file)).map_err(|e| {
                BatcallError::ConfigError(format!(
                    "cannot parse species table {}: {}",
                    path.display(),
                    e
                ))
            })?;

        let Some(first) = parsed.species.first() else {
            return Err(BatcallError::ConfigError(format!(
                "species table {} has no profiles",
                path.display()
            )));
        };

        let fallback = match parsed.fallback {
            Some(label) => label,
            None if parsed.species.iter().any(|p| p.label == DEFAULT_FALLBACK) => {
                DEFAULT_FALLBACK.to_string()
            }
            None => first.label.clone(),
        };

        let table = Self::new(parsed.species, fallback)?;
        info!(
            "Loaded {} species profiles from {}",
            table.profiles.len(),
            path.display()
        );
        Ok(table)
    }

    /// Resolve the table to use for a session
    ///
    /// See [`find_table_path`] for the lookup order; the built-in table is
    /// used when nothing is found. `fallback` overrides the table's own.
    pub fn resolve(explicit: Option<&Path>, fallback: Option<&str>) -> Result<Self> {
        let table = match find_table_path(explicit)? {
            Some(path) => Self::from_json_file(&path)?,
            None => {
                debug!("Using built-in species table");
                Self::builtin()
            }
        };
        match fallback {
            Some(label) => table.with_fallback(label),
            None => Ok(table),
        }
    }

    /// Label of the fallback profile
    pub fn fallback_label(&self) -> &str {
        &self.fallback
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl SpeciesCatalog for SpeciesTable {
    fn get(&self, label: &str) -> Option<&SpeciesProfile> {
        self.profiles.get(label)
    }

    fn fallback(&self) -> &SpeciesProfile {
        // Guaranteed by every constructor
        &self.profiles[&self.fallback]
    }

    fn labels(&self) -> Vec<String> {
        self.profiles.keys().cloned().collect()
    }
}

/// Find a species table file
///
/// Search order:
/// 1. Explicit path (must exist)
/// 2. BATCALL_SPECIES_TABLE environment variable
/// 3. ProjectDirs data: ~/.local/share/batcall/species.json (Linux XDG)
///    or ~/Library/Application Support/org.batcall.batcall/ (macOS)
///
/// Returns `None` when nothing is found, meaning the built-in table applies.
pub fn find_table_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        if path.is_file() {
            return Ok(Some(path.to_path_buf()));
        }
        return Err(BatcallError::ConfigError(format!(
            "species table not found: {}",
            path.display()
        )));
    }

    if let Ok(env_path) = std::env::var(SPECIES_TABLE_ENV) {
        let env_path = PathBuf::from(env_path);
        if env_path.is_file() {
            return Ok(Some(env_path));
        }
        warn!(
            "{}={} does not point at a file, ignoring",
            SPECIES_TABLE_ENV,
            env_path.display()
        );
    }

    if let Some(proj_dirs) = ProjectDirs::from("org", "batcall", "batcall") {
        let data_path = proj_dirs.data_dir().join(TABLE_FILENAME);
        if data_path.is_file() {
            return Ok(Some(data_path));
        }
        debug!("No species table at {}", data_path.display());
    }

    Ok(None)
}
