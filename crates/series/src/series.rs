//! Time series records and ordering

use chrono::{DateTime, Utc};

/// One `(date, value)` observation, immutable once produced
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesRecord {
    date: DateTime<Utc>,
    value: f64,
}

impl SeriesRecord {
    pub fn new(date: DateTime<Utc>, value: f64) -> Self {
        Self { date, value }
    }

    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}

/// Date-ordered sequence of series records.
///
/// Records accumulate per season in whatever order concurrent
/// processing produces them; one final sort establishes the total
/// order. Gaps (seasons without cultivated parcels or usable images)
/// are simply absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeSeries {
    records: Vec<SeriesRecord>,
}

impl TimeSeries {
    /// Build a series from unordered records, sorting ascending by
    /// date (value breaks ties, keeping runs reproducible).
    pub fn from_unordered(mut records: Vec<SeriesRecord>) -> Self {
        records.sort_by(|a, b| {
            a.date()
                .cmp(&b.date())
                .then_with(|| a.value().partial_cmp(&b.value()).unwrap_or(std::cmp::Ordering::Equal))
        });
        Self { records }
    }

    /// Ordered records
    pub fn records(&self) -> &[SeriesRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// `(date, value)` rows for a tabular sink
    pub fn rows(&self) -> impl Iterator<Item = (DateTime<Utc>, f64)> + '_ {
        self.records.iter().map(|r| (r.date(), r.value()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 10, 30, 0).unwrap()
    }

    #[test]
    fn test_sorts_by_date() {
        let series = TimeSeries::from_unordered(vec![
            SeriesRecord::new(ts(2016, 6, 1), 0.7),
            SeriesRecord::new(ts(2015, 11, 3), 0.3),
            SeriesRecord::new(ts(2016, 1, 15), 0.5),
        ]);

        let dates: Vec<_> = series.records().iter().map(|r| r.date()).collect();
        assert_eq!(dates, vec![ts(2015, 11, 3), ts(2016, 1, 15), ts(2016, 6, 1)]);
    }

    #[test]
    fn test_non_decreasing_after_sort() {
        let series = TimeSeries::from_unordered(vec![
            SeriesRecord::new(ts(2016, 6, 1), 0.7),
            SeriesRecord::new(ts(2016, 6, 1), 0.2),
            SeriesRecord::new(ts(2015, 11, 3), 0.3),
        ]);

        for pair in series.records().windows(2) {
            assert!(pair[0].date() <= pair[1].date());
        }
    }

    #[test]
    fn test_empty_series() {
        let series = TimeSeries::from_unordered(Vec::new());
        assert!(series.is_empty());
        assert_eq!(series.rows().count(), 0);
    }
}
