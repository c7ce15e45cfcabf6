//! Export of results as a JSON report and a PGM image

pub mod json;
pub mod pgm;

pub use json::{read_report, write_report};
pub use pgm::write_pgm;
