//! Numerical helpers shared across the crate.

pub mod regression;
