pub mod aggregate;
pub mod batch;
pub mod config;
pub mod convention;
pub mod coordinate;
pub mod field;
pub mod harmonize;
pub mod interpolate;
pub mod loader;
pub mod python;
pub mod season;
pub mod trend;
pub mod utils;

pub mod errors;
