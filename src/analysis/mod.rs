//! Detection backends
//!
//! This module provides the analyzer trait and the simulated implementation.
//! The trait abstraction allows swapping backends without changing pipeline code.

pub mod primary;
pub mod simulated;
pub mod traits;

pub use primary::primary_species;
pub use simulated::SimulatedAnalyzer;
pub use traits::Analyzer;
