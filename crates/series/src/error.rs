//! Error taxonomy for time-series runs
//!
//! Errors split into two scopes: image-scoped errors drop one image
//! with a warning and never abort sibling images or seasons; run-scoped
//! errors (validation, unreachable backends) abort immediately with no
//! partial series.

use thiserror::Error;

/// Errors produced while building a time series
#[derive(Error, Debug)]
pub enum SeriesError {
    #[error("invalid year range: start year {start} must be before end year {end}")]
    InvalidYearRange { start: i32, end: i32 },

    #[error("invalid season specification: {reason}")]
    InvalidSeasonSpec { reason: String },

    #[error("masking is configured but no companion source is attached")]
    CompanionSourceMissing,

    #[error("no unambiguous companion for scene {id}: {candidates} candidate(s)")]
    MissingCompanion { id: String, candidates: usize },

    #[error("aggregation failed for scene {id}: {reason}")]
    Aggregation { id: String, reason: String },

    #[error("{what} unavailable after {attempts} attempt(s): {reason}")]
    BackendUnavailable {
        what: &'static str,
        attempts: u32,
        reason: String,
    },

    #[error(transparent)]
    Core(#[from] cosecha_core::Error),
}

impl SeriesError {
    /// Whether this error is scoped to a single image.
    ///
    /// Image-scoped errors (missing or ambiguous companion, failed
    /// aggregation, bad per-scene data) drop that image only;
    /// everything else is fatal for the run.
    pub fn is_image_scoped(&self) -> bool {
        matches!(
            self,
            SeriesError::MissingCompanion { .. }
                | SeriesError::Aggregation { .. }
                | SeriesError::Core(_)
        )
    }
}

/// Result type alias for series operations
pub type Result<T> = std::result::Result<T, SeriesError>;
