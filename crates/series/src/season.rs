//! Season windows and cohort resolution
//!
//! An agricultural season spans two calendar years: planting in the
//! start year, harvest in the following one. Production is recorded
//! against the harvest year, so the cohort for the season starting in
//! year Y is selected on the production column Y + 1.

use chrono::{DateTime, Duration, TimeZone, Utc};
use geo::BooleanOps;
use geo_types::MultiPolygon;
use serde::{Deserialize, Serialize};

use cosecha_core::Parcel;

use crate::error::{Result, SeriesError};

/// How the season end date bounds the window.
///
/// The source material disagrees on whether the last season day is part
/// of the season (`Jul 31` inclusive vs `Aug 1` exclusive), so the
/// choice is explicit. Either way the window stays half-open:
/// `InclusiveDay` just pushes the exclusive bound one day past the end
/// date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EndRule {
    /// The end date itself is excluded
    #[default]
    Exclusive,
    /// The whole end day is included
    InclusiveDay,
}

/// Month/day bounds of a season, applied to a `(Y, Y + 1)` year pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonSpec {
    pub start_month: u32,
    pub start_day: u32,
    pub end_month: u32,
    pub end_day: u32,
    #[serde(default)]
    pub end_rule: EndRule,
}

impl Default for SeasonSpec {
    fn default() -> Self {
        // Barley in the study area: sown at the start of October,
        // harvested by the end of July
        Self {
            start_month: 10,
            start_day: 1,
            end_month: 8,
            end_day: 1,
            end_rule: EndRule::Exclusive,
        }
    }
}

impl SeasonSpec {
    /// Validate month/day ranges
    pub fn validate(&self) -> Result<()> {
        for (name, month) in [("start_month", self.start_month), ("end_month", self.end_month)] {
            if !(1..=12).contains(&month) {
                return Err(SeriesError::InvalidSeasonSpec {
                    reason: format!("{} {} is out of range 1..=12", name, month),
                });
            }
        }
        for (name, day) in [("start_day", self.start_day), ("end_day", self.end_day)] {
            if !(1..=31).contains(&day) {
                return Err(SeriesError::InvalidSeasonSpec {
                    reason: format!("{} {} is out of range 1..=31", name, day),
                });
            }
        }
        Ok(())
    }

    /// Half-open window `[start, end)` for the season starting in
    /// `start_year`.
    pub fn window(&self, start_year: i32) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
        self.validate()?;

        let start = season_date(start_year, self.start_month, self.start_day)?;
        let mut end = season_date(start_year + 1, self.end_month, self.end_day)?;
        if self.end_rule == EndRule::InclusiveDay {
            end = end + Duration::days(1);
        }

        if start >= end {
            return Err(SeriesError::InvalidSeasonSpec {
                reason: format!("season start {} is not before season end {}", start, end),
            });
        }

        Ok((start, end))
    }
}

fn season_date(year: i32, month: u32, day: u32) -> Result<DateTime<Utc>> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
        .single()
        .ok_or_else(|| SeriesError::InvalidSeasonSpec {
            reason: format!("{}-{:02}-{:02} is not a valid date", year, month, day),
        })
}

/// Immutable per-season context handed to every per-image call.
///
/// Holding the active geometry here, rather than in a shared variable
/// captured by per-image closures, keeps concurrent seasons free of
/// aliasing.
#[derive(Debug, Clone)]
pub struct SeasonContext {
    /// Calendar year the season starts in
    pub start_year: i32,
    /// Inclusive window start
    pub window_start: DateTime<Utc>,
    /// Exclusive window end
    pub window_end: DateTime<Utc>,
    /// Union of the geometries of all parcels cultivated this season
    pub geometry: MultiPolygon<f64>,
    /// Number of parcels in the cohort
    pub parcel_count: usize,
}

/// Outcome of cohort resolution: an empty cohort is an expected state,
/// not an error.
#[derive(Debug, Clone)]
pub enum Cohort {
    Active(SeasonContext),
    Empty,
}

/// Resolve the cohort of parcels cultivated in the season starting in
/// `start_year`.
///
/// A parcel qualifies iff its production in the harvest year
/// (`start_year + 1`) is positive; qualifying geometries are unioned
/// into one `MultiPolygon`.
pub fn resolve_cohort(
    parcels: &[Parcel],
    start_year: i32,
    spec: &SeasonSpec,
) -> Result<Cohort> {
    let (window_start, window_end) = spec.window(start_year)?;
    let harvest_year = start_year + 1;

    let active: Vec<&Parcel> = parcels
        .iter()
        .filter(|parcel| parcel.production(harvest_year) > 0.0)
        .collect();

    let (first, rest) = match active.split_first() {
        Some(split) => split,
        None => return Ok(Cohort::Empty),
    };

    let mut geometry = MultiPolygon::new(vec![first.geometry().clone()]);
    for parcel in rest {
        geometry = geometry.union(&MultiPolygon::new(vec![parcel.geometry().clone()]));
    }

    Ok(Cohort::Active(SeasonContext {
        start_year,
        window_start,
        window_end,
        geometry,
        parcel_count: active.len(),
    }))
}
