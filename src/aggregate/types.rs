//! Data types used by the aggregation pipeline.

use serde::Serialize;
use std::cmp::Ordering;

/// An `f64` usable as a group-by key.
///
/// Ordered with [`f64::total_cmp`] so positions sort deterministically.
#[derive(Debug, Clone, Copy)]
pub struct Coord(pub f64);

impl PartialEq for Coord {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Coord {}

impl PartialOrd for Coord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Coord {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Group key of the first pass: one location, one day, one hour.
///
/// Field order matches the column order of the group-by, so the derived
/// ordering is the order groups are emitted in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct DayKey {
    pub request_id: i64,
    pub boro: String,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub segment_id: i64,
    pub street: String,
    pub from_st: String,
    pub to_st: String,
    pub direction: String,
    pub latitude: Coord,
    pub longitude: Coord,
}

/// Group key of the second pass: [`DayKey`] without the day.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct MonthKey {
    pub request_id: i64,
    pub boro: String,
    pub year: i32,
    pub month: u32,
    pub hour: u32,
    pub segment_id: i64,
    pub street: String,
    pub from_st: String,
    pub to_st: String,
    pub direction: String,
    pub latitude: Coord,
    pub longitude: Coord,
}

/// Group key of the final pass: [`MonthKey`] without the month.
///
/// `boro`, `from_st` and `to_st` are `None` when the variant drops them.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct YearKey {
    pub request_id: i64,
    pub boro: Option<String>,
    pub year: i32,
    pub hour: u32,
    pub segment_id: i64,
    pub street: String,
    pub from_st: Option<String>,
    pub to_st: Option<String>,
    pub direction: String,
    pub latitude: Coord,
    pub longitude: Coord,
}

/// Summed volume for one [`DayKey`].
#[derive(Debug, Clone, PartialEq)]
pub struct DailyVolume {
    pub key: DayKey,
    pub vol: i64,
}

/// Mean of daily sums for one [`MonthKey`].
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyVolume {
    pub key: MonthKey,
    pub vol: f64,
}

/// A row of the map-ready table: mean hourly volume per location and year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedRecord {
    #[serde(rename = "RequestID")]
    pub request_id: i64,
    #[serde(rename = "Boro")]
    pub boro: Option<String>,
    #[serde(rename = "Yr")]
    pub year: i32,
    #[serde(rename = "HH")]
    pub hour: u32,
    #[serde(rename = "SegmentID")]
    pub segment_id: i64,
    pub street: String,
    #[serde(rename = "fromSt")]
    pub from_st: Option<String>,
    #[serde(rename = "toSt")]
    pub to_st: Option<String>,
    #[serde(rename = "Direction")]
    pub direction: String,
    #[serde(rename = "Latitude")]
    pub latitude: f64,
    #[serde(rename = "Longitude")]
    pub longitude: f64,
    #[serde(rename = "Vol")]
    pub vol: f64,
}

impl AggregatedRecord {
    pub(crate) fn from_key(key: YearKey, vol: f64) -> Self {
        Self {
            request_id: key.request_id,
            boro: key.boro,
            year: key.year,
            hour: key.hour,
            segment_id: key.segment_id,
            street: key.street,
            from_st: key.from_st,
            to_st: key.to_st,
            direction: key.direction,
            latitude: key.latitude.0,
            longitude: key.longitude.0,
            vol,
        }
    }
}

/// Global volume range used to keep the colour legend stable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColorBounds {
    pub min: f64,
    pub max: f64,
}

impl ColorBounds {
    /// Min and max of `values`, or `None` when there are none.
    pub fn from_values<I: IntoIterator<Item = f64>>(values: I) -> Option<Self> {
        values.into_iter().fold(None, |acc, v| match acc {
            None => Some(ColorBounds { min: v, max: v }),
            Some(b) => Some(ColorBounds {
                min: b.min.min(v),
                max: b.max.max(v),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coord_total_order() {
        assert!(Coord(-74.0) < Coord(-73.9));
        assert_eq!(Coord(40.5), Coord(40.5));
    }

    #[test]
    fn test_color_bounds() {
        let b = ColorBounds::from_values([3.0, 1.5, 9.25]).unwrap();
        assert_eq!(b.min, 1.5);
        assert_eq!(b.max, 9.25);
        assert!(ColorBounds::from_values(Vec::<f64>::new()).is_none());
    }
}
