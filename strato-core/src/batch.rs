//! Running one unit of work per dataset without letting one failure stop the rest.

use crate::errors::{ErrorKind, StratoResult};
use log::{info, warn};
use serde::{Deserialize, Serialize};

/// Why a dataset was skipped
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DatasetFailure {
    pub dataset: String,
    pub kind: ErrorKind,
    pub message: String,
}

/// Result of processing a single dataset
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum DatasetOutcome<T> {
    Success { dataset: String, value: T },
    Failure(DatasetFailure),
}

impl<T> DatasetOutcome<T> {
    pub fn dataset(&self) -> &str {
        match self {
            DatasetOutcome::Success { dataset, .. } => dataset,
            DatasetOutcome::Failure(failure) => &failure.dataset,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, DatasetOutcome::Success { .. })
    }
}

/// Outcomes of a batch, in the order the datasets were given
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BatchReport<T> {
    pub outcomes: Vec<DatasetOutcome<T>>,
}

impl<T> BatchReport<T> {
    /// Datasets that were processed, with their results
    pub fn succeeded(&self) -> Vec<(&str, &T)> {
        self.outcomes
            .iter()
            .filter_map(|outcome| match outcome {
                DatasetOutcome::Success { dataset, value } => Some((dataset.as_str(), value)),
                DatasetOutcome::Failure(_) => None,
            })
            .collect()
    }

    pub fn failed(&self) -> Vec<&DatasetFailure> {
        self.outcomes
            .iter()
            .filter_map(|outcome| match outcome {
                DatasetOutcome::Failure(failure) => Some(failure),
                DatasetOutcome::Success { .. } => None,
            })
            .collect()
    }

    pub fn failure_for(&self, dataset: &str) -> Option<&DatasetFailure> {
        self.failed().into_iter().find(|f| f.dataset == dataset)
    }

    pub fn value_for(&self, dataset: &str) -> Option<&T> {
        self.succeeded()
            .into_iter()
            .find(|(name, _)| *name == dataset)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

/// Apply `op` to every item, recording each success or failure.
///
/// Items are processed one after another. A failing item is logged and
/// recorded in the report and the batch moves on to the next one.
///
/// ```
/// use strato_core::batch::run_batch;
/// use strato_core::errors::StratoError;
///
/// let report = run_batch(vec!["a", "b"], |s| s.to_string(), |s| match s {
///     "a" => Ok(1),
///     _ => Err(StratoError::Loader("unreachable archive".to_string())),
/// });
/// assert_eq!(report.succeeded(), vec![("a", &1)]);
/// assert!(report.failure_for("b").is_some());
/// ```
pub fn run_batch<I, T, L, F>(items: I, label: L, mut op: F) -> BatchReport<T>
where
    I: IntoIterator,
    L: Fn(&I::Item) -> String,
    F: FnMut(I::Item) -> StratoResult<T>,
{
    let mut outcomes = Vec::new();
    for item in items {
        let dataset = label(&item);
        match op(item) {
            Ok(value) => {
                info!("{}: done", dataset);
                outcomes.push(DatasetOutcome::Success { dataset, value });
            }
            Err(e) => {
                warn!("{}: skipped ({})", dataset, e);
                outcomes.push(DatasetOutcome::Failure(DatasetFailure {
                    dataset,
                    kind: e.kind(),
                    message: e.to_string(),
                }));
            }
        }
    }
    BatchReport { outcomes }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StratoError;

    #[test]
    fn test_failures_do_not_stop_the_batch() {
        let names = vec!["ok-1", "missing", "ok-2"];
        let report = run_batch(names, |n| n.to_string(), |n| {
            if n == "missing" {
                Err(StratoError::MissingAxis {
                    axis: "lat".to_string(),
                    source_name: n.to_string(),
                })
            } else {
                Ok(n.len())
            }
        });

        assert_eq!(report.len(), 3);
        assert_eq!(report.succeeded().len(), 2);
        assert_eq!(report.value_for("ok-2"), Some(&4));

        let failure = report.failure_for("missing").unwrap();
        assert_eq!(failure.kind, ErrorKind::Lookup);
        assert!(failure.message.contains("lat"));
        assert!(report.failure_for("ok-1").is_none());
    }

    #[test]
    fn test_order_is_kept() {
        let report = run_batch(1..=4, |i| format!("m{}", i), |i| {
            if i % 2 == 0 {
                Err(StratoError::Loader("offline".to_string()))
            } else {
                Ok(i)
            }
        });
        let order: Vec<&str> = report.outcomes.iter().map(|o| o.dataset()).collect();
        assert_eq!(order, vec!["m1", "m2", "m3", "m4"]);
        assert!(report.outcomes[0].is_success());
        assert_eq!(report.failed()[1].kind, ErrorKind::Loader);
    }

    #[test]
    fn test_report_serialises() {
        let report = run_batch(vec![1], |i| i.to_string(), |_| {
            Err::<f64, _>(StratoError::InsufficientData {
                needed: 2,
                found: 1,
                detail: "years".to_string(),
            })
        });
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("InsufficientData"));
    }
}
