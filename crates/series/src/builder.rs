//! Time-series orchestration
//!
//! Drives the season loop: cohort resolution, scene selection,
//! masking, index computation, zonal reduction, and the final merge
//! into one date-ordered series. Scenes within a season run on the
//! rayon pool; each season accumulates into its own buffer and one
//! final sort establishes the output order, so ordering among
//! concurrent producers never matters.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use geo_types::MultiPolygon;
use rayon::prelude::*;
use tracing::{info, warn};

use cosecha_algorithms::imagery::compute_index;
use cosecha_algorithms::masking::{apply_mask, cloud_shadow_mask};
use cosecha_algorithms::statistics::{clip_to_geometry, zonal_reduce};
use cosecha_core::Scene;

use crate::config::SeriesConfig;
use crate::error::{Result, SeriesError};
use crate::join::join_companion;
use crate::retry::{blocking_with_timeout, with_backoff};
use crate::season::{resolve_cohort, Cohort, SeasonContext};
use crate::series::{SeriesRecord, TimeSeries};
use crate::sources::{CompanionSource, ParcelStore, RasterSource};

/// Cooperative cancellation handle.
///
/// Cancelling abandons in-flight per-image work at the next checkpoint;
/// records already committed are still returned.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Result of a run: the series is always reported together with the
/// counts of what was dropped or skipped, never silently incomplete.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Date-ordered series
    pub series: TimeSeries,
    /// Images dropped by per-image errors or no-data reductions
    pub dropped_images: usize,
    /// Seasons with no cultivated parcels
    pub empty_seasons: usize,
    /// Whether the run was cancelled before completing
    pub cancelled: bool,
}

/// Builds a multi-season time series from external sources.
pub struct TimeSeriesBuilder<'a> {
    rasters: &'a dyn RasterSource,
    companions: Option<&'a dyn CompanionSource>,
    parcels: &'a dyn ParcelStore,
    config: SeriesConfig,
}

impl<'a> TimeSeriesBuilder<'a> {
    pub fn new(
        rasters: &'a dyn RasterSource,
        parcels: &'a dyn ParcelStore,
        config: SeriesConfig,
    ) -> Self {
        Self {
            rasters,
            companions: None,
            parcels,
            config,
        }
    }

    /// Attach the companion source required when masking is configured
    pub fn with_companions(mut self, companions: &'a dyn CompanionSource) -> Self {
        self.companions = Some(companions);
        self
    }

    /// Run the season loop and build the series.
    ///
    /// Per-image errors drop that image with a warning; validation
    /// failures and unreachable backends abort the whole run with no
    /// partial series.
    pub fn run(&self, cancel: &CancelToken) -> Result<RunReport> {
        self.config.validate()?;
        if self.config.masking.is_some() && self.companions.is_none() {
            return Err(SeriesError::CompanionSourceMissing);
        }

        let policy = self.config.retry;
        let parcels = with_backoff(&policy, |_| true, || self.parcels.parcels()).map_err(
            |err| SeriesError::BackendUnavailable {
                what: "parcel store",
                attempts: policy.max_retries + 1,
                reason: err.to_string(),
            },
        )?;

        let mut records: Vec<SeriesRecord> = Vec::new();
        let mut dropped_images = 0usize;
        let mut empty_seasons = 0usize;
        let mut cancelled = false;

        for year in self.config.start_year..self.config.end_year {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            let ctx = match resolve_cohort(&parcels, year, &self.config.season)? {
                Cohort::Empty => {
                    warn!(season = year, "no cultivated parcels; season skipped");
                    empty_seasons += 1;
                    continue;
                }
                Cohort::Active(ctx) => ctx,
            };
            info!(
                season = year,
                parcels = ctx.parcel_count,
                window_start = %ctx.window_start,
                window_end = %ctx.window_end,
                "season cohort resolved"
            );

            let scenes = self.select_scenes(&ctx)?;

            // Independent per-image work on the rayon pool; the only
            // shared inputs are read-only
            let geometry = Arc::new(ctx.geometry.clone());
            let outcomes: Vec<Option<Result<Option<SeriesRecord>>>> = scenes
                .par_iter()
                .map(|scene| {
                    if cancel.is_cancelled() {
                        return None;
                    }
                    Some(self.process_scene(scene, &geometry))
                })
                .collect();

            for (scene, outcome) in scenes.iter().zip(outcomes) {
                match outcome {
                    None => cancelled = true,
                    Some(Ok(Some(record))) => records.push(record),
                    Some(Ok(None)) => {
                        dropped_images += 1;
                        warn!(
                            scene = scene.id(),
                            season = year,
                            "no unmasked pixels over the cohort; image skipped"
                        );
                    }
                    Some(Err(err)) if err.is_image_scoped() => {
                        dropped_images += 1;
                        warn!(scene = scene.id(), season = year, error = %err, "image dropped");
                    }
                    Some(Err(err)) => return Err(err),
                }
            }

            if cancelled {
                break;
            }
        }

        let series = TimeSeries::from_unordered(records);
        info!(
            records = series.len(),
            dropped_images, empty_seasons, cancelled, "time series complete"
        );

        Ok(RunReport {
            series,
            dropped_images,
            empty_seasons,
            cancelled,
        })
    }

    /// Query the raster source for the season, enforcing the half-open
    /// window even if a source is sloppy about its bounds.
    fn select_scenes(&self, ctx: &SeasonContext) -> Result<Vec<Scene>> {
        let policy = self.config.retry;
        let mut scenes = with_backoff(&policy, |_| true, || {
            self.rasters.query(
                &ctx.geometry,
                (ctx.window_start, ctx.window_end),
                &self.config.filters,
            )
        })
        .map_err(|err| SeriesError::BackendUnavailable {
            what: "raster source",
            attempts: policy.max_retries + 1,
            reason: err.to_string(),
        })?;

        scenes.retain(|scene| {
            scene.timestamp() >= ctx.window_start && scene.timestamp() < ctx.window_end
        });
        Ok(scenes)
    }

    /// Mask, compute the index, clip and reduce one scene.
    ///
    /// `Ok(None)` means the reduction saw no data (a skip, not an
    /// error).
    fn process_scene(
        &self,
        scene: &Scene,
        geometry: &Arc<MultiPolygon<f64>>,
    ) -> Result<Option<SeriesRecord>> {
        let masked;
        let input = match (&self.config.masking, self.companions) {
            (Some(masking), Some(companions)) => {
                let companion = join_companion(scene, companions, &self.config.retry)?;
                let mask =
                    cloud_shadow_mask(scene, companion.probability(), &masking.shadow, &masking.mask)?;
                masked = apply_mask(scene, &mask)?;
                &masked
            }
            _ => scene,
        };

        let index = compute_index(input, self.config.index, &self.config.bands, &self.config.adjustment)?;
        let clipped = clip_to_geometry(&index, geometry)?;

        // The reduction is potentially slow over a large cohort: run it
        // timeout-bound on its own thread, retrying per policy before
        // surfacing an aggregation error for this image only
        let policy = self.config.retry;
        let statistic = self.config.statistic;
        let band = Arc::new(clipped);
        let value = with_backoff(
            &policy,
            |err: &SeriesError| matches!(err, SeriesError::Aggregation { .. }),
            || {
                let band = Arc::clone(&band);
                let geometry = Arc::clone(geometry);
                match blocking_with_timeout(policy.reduce_timeout(), move || {
                    zonal_reduce(&band, &geometry, statistic)
                }) {
                    Some(result) => result.map_err(|err| SeriesError::Aggregation {
                        id: scene.id().to_string(),
                        reason: err.to_string(),
                    }),
                    None => Err(SeriesError::Aggregation {
                        id: scene.id().to_string(),
                        reason: format!(
                            "zonal reduction exceeded {} ms",
                            policy.reduce_timeout_ms
                        ),
                    }),
                }
            },
        )?;

        Ok(value.map(|v| SeriesRecord::new(scene.timestamp(), v)))
    }
}
