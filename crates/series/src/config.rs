//! Run configuration
//!
//! Defaults reproduce the constants of the operational scripts this
//! pipeline descends from: cloud probability 65, shadow score 0.02,
//! dark-pixel IR sum 0.3, NDVI water threshold -0.1, 1.5/3.0-cell
//! circular smoothing over 3 passes, cloud heights 200-10000 m in
//! 250 m steps.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use cosecha_algorithms::imagery::{BandMap, IndexKind, ValueAdjustment};
use cosecha_algorithms::masking::{MaskParams, ShadowParams};
use cosecha_algorithms::statistics::ReduceStatistic;

use crate::error::{Result, SeriesError};
use crate::season::SeasonSpec;
use crate::sources::FilterPredicate;

/// Cloud/shadow masking configuration; absent for radar series, which
/// see through clouds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaskingConfig {
    /// Shadow projection parameters
    #[serde(default)]
    pub shadow: ShadowParams,
    /// Smoothing and threshold parameters
    #[serde(default)]
    pub mask: MaskParams,
}

/// Retry budget, backoff base, and reduction timeout
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries beyond the first attempt
    pub max_retries: u32,
    /// Base backoff in milliseconds; attempt n waits `base * 2^(n-1)`
    pub base_backoff_ms: u64,
    /// Wall-clock bound on one zonal reduction
    pub reduce_timeout_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_backoff_ms: 100,
            reduce_timeout_ms: 30_000,
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry attempt `attempt` (1-based)
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.base_backoff_ms * 2u64.pow(attempt.saturating_sub(1)))
    }

    /// Timeout for one zonal reduction
    pub fn reduce_timeout(&self) -> Duration {
        Duration::from_millis(self.reduce_timeout_ms)
    }
}

/// Full configuration of a time-series run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesConfig {
    /// Index to compute per scene
    pub index: IndexKind,
    /// Mapping from formula roles to band names
    #[serde(default)]
    pub bands: BandMap,
    /// Post-processing of the index band (clamp / quality window)
    #[serde(default)]
    pub adjustment: ValueAdjustment,
    /// Season month/day bounds and end rule
    #[serde(default)]
    pub season: SeasonSpec,
    /// First season start year (inclusive)
    pub start_year: i32,
    /// Last year of the range; the final season starts in `end_year - 1`
    pub end_year: i32,
    /// Cloud/shadow masking; `None` skips the companion join and mask
    #[serde(default)]
    pub masking: Option<MaskingConfig>,
    /// Zonal reduction statistic
    #[serde(default)]
    pub statistic: ReduceStatistic,
    /// Retry/backoff/timeout policy
    #[serde(default)]
    pub retry: RetryPolicy,
    /// Opaque acquisition filters forwarded to the raster source
    #[serde(default)]
    pub filters: Vec<FilterPredicate>,
}

impl SeriesConfig {
    /// Configuration with defaults for the given index and year range.
    ///
    /// Optical indices get the default masking pipeline; the radar
    /// cross-ratio gets none.
    pub fn new(index: IndexKind, start_year: i32, end_year: i32) -> Self {
        let masking = if index.is_radar() {
            None
        } else {
            Some(MaskingConfig::default())
        };
        Self {
            index,
            bands: BandMap::default(),
            adjustment: ValueAdjustment::None,
            season: SeasonSpec::default(),
            start_year,
            end_year,
            masking,
            statistic: ReduceStatistic::default(),
            retry: RetryPolicy::default(),
            filters: Vec::new(),
        }
    }

    /// Validate the year range and season specification
    pub fn validate(&self) -> Result<()> {
        if self.start_year >= self.end_year {
            return Err(SeriesError::InvalidYearRange {
                start: self.start_year,
                end: self.end_year,
            });
        }
        self.season.validate()?;
        // Probe one concrete window so calendar-impossible dates fail
        // at validation time, not mid-run
        self.season.window(self.start_year)?;
        Ok(())
    }
}
