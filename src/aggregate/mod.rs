//! Volume aggregation.
//!
//! Raw quarter-hour counts are collapsed in three fixed passes: summed per
//! day and hour, averaged across the days of a month, then averaged across
//! the months of a year. The order matters: a mean of means is not the mean
//! of the raw values.

pub mod passes;
pub mod types;
pub mod utility;

use anyhow::Result;
use std::path::Path;
use tracing::info;

use crate::geocode::{Geocoder, GeocodedRecord, geocode_records};
use crate::loader::load_records;
use crate::variant::{DENSITY_YEAR, Variant};
use passes::{FinalKeySet, mean_across_days, mean_across_months, sum_by_day};
use types::{AggregatedRecord, ColorBounds};
use utility::distinct_sorted;

/// The map-ready table, computed once at startup and read-only afterwards.
#[derive(Debug, Clone)]
pub struct AggregatedDataset {
    pub variant: Variant,
    pub records: Vec<AggregatedRecord>,
    pub bounds: Option<ColorBounds>,
}

impl AggregatedDataset {
    /// Runs the three aggregation passes over geocoded records.
    pub fn from_geocoded(variant: Variant, records: &[GeocodedRecord]) -> Self {
        let key_set = if variant.keeps_cross_streets() {
            FinalKeySet::WithCrossStreets
        } else {
            FinalKeySet::WithoutCrossStreets
        };

        let daily = sum_by_day(records);
        let monthly = mean_across_days(&daily);
        let records = mean_across_months(&monthly, key_set);
        let bounds = ColorBounds::from_values(records.iter().map(|r| r.vol));

        info!(
            %variant,
            daily = daily.len(),
            monthly = monthly.len(),
            aggregated = records.len(),
            min_vol = bounds.map(|b| b.min),
            max_vol = bounds.map(|b| b.max),
            "Aggregation complete"
        );

        Self {
            variant,
            records,
            bounds,
        }
    }

    /// Sorted distinct years present in the table.
    pub fn years(&self) -> Vec<i32> {
        distinct_sorted(self.records.iter().map(|r| r.year))
    }

    /// Sorted distinct hours present in the table.
    pub fn hours(&self) -> Vec<u32> {
        distinct_sorted(self.records.iter().map(|r| r.hour))
    }

    /// Year shown before the user picks one.
    pub fn initial_year(&self) -> i32 {
        match self.variant {
            Variant::Scatter => self.years().first().copied().unwrap_or(DENSITY_YEAR),
            Variant::Density => DENSITY_YEAR,
        }
    }

    /// Hour shown before the user picks one.
    pub fn initial_hour(&self) -> u32 {
        self.hours().first().copied().unwrap_or(0)
    }

    /// Rows for one (year, hour) selection, in table order.
    pub fn select(&self, year: i32, hour: u32) -> Vec<&AggregatedRecord> {
        self.records
            .iter()
            .filter(|r| r.year == year && r.hour == hour)
            .collect()
    }
}

/// Loads, geocodes and aggregates the CSV at `path` for `variant`.
#[tracing::instrument(skip_all, fields(path = %path.as_ref().display(), %variant))]
pub fn build_dataset(path: impl AsRef<Path>, variant: Variant) -> Result<AggregatedDataset> {
    let raw = load_records(path, Some(variant.year_range()))?;
    let geocoded = geocode_records(&Geocoder::new(), raw);
    Ok(AggregatedDataset::from_geocoded(variant, &geocoded))
}
