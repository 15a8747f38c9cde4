pub mod comparison;
pub mod python;
pub mod runner;
pub mod summary;

pub use comparison::{compare_climatology, compare_trends, Comparison, ComparisonSet};
pub use runner::{run_model_comparisons, ComparisonReport, ModelDiagnostics, ReferenceMetrics};
pub use summary::{polar_metrics, tropical_metrics, PolarMetrics, TropicalMetrics};
