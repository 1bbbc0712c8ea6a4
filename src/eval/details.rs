use crate::errors::ClientError;
use crate::eval::evaluator::EvalResult;
use chrono::{DateTime, Utc};

/// Details of a feature toggle evaluation.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct EvaluationDetails {
    /// The evaluated state of the feature.
    pub enabled: bool,
    /// Name of the feature toggle.
    pub feature: String,
    /// Indicates whether the fallback value passed to the evaluation method was returned.
    pub is_fallback: bool,
    /// The strategy (if any) that enabled the feature.
    pub matched_strategy: Option<String>,
    /// Error in case the feature could not be evaluated.
    pub error: Option<ClientError>,
    /// Time of the fetch that produced the evaluated feature set (if it was fetched).
    pub fetch_time: Option<DateTime<Utc>>,
}

impl EvaluationDetails {
    pub(crate) fn from_err(fallback: bool, feature: &str, err: ClientError) -> Self {
        Self {
            enabled: fallback,
            feature: feature.to_owned(),
            is_fallback: true,
            error: Some(err),
            ..EvaluationDetails::default()
        }
    }

    pub(crate) fn from_result(
        feature: &str,
        result: EvalResult,
        fetch_time: Option<DateTime<Utc>>,
    ) -> Self {
        let enabled = result.is_enabled();
        Self {
            enabled,
            feature: feature.to_owned(),
            matched_strategy: match result {
                EvalResult::Enabled(strategy) => Some(strategy),
                _ => None,
            },
            fetch_time,
            ..EvaluationDetails::default()
        }
    }
}
