//! Species reference data
//!
//! Profiles are read-only and never derived from an analysis. Lookups always
//! produce a profile: an unknown label falls back to the catalog's configured
//! default.

pub mod builtin;
pub mod table;

use crate::types::SpeciesProfile;

pub use table::{find_table_path, SpeciesTable};

/// Read-only lookup of species profiles by label
pub trait SpeciesCatalog: Send + Sync {
    /// Exact-label lookup
    fn get(&self, label: &str) -> Option<&SpeciesProfile>;

    /// Profile used when a label is unknown
    fn fallback(&self) -> &SpeciesProfile;

    /// Every known label, sorted
    fn labels(&self) -> Vec<String>;

    /// Lookup with fallback; never fails
    fn profile_for(&self, label: &str) -> &SpeciesProfile {
        self.get(label).unwrap_or_else(|| self.fallback())
    }
}
