//! CSV loader for automated traffic volume counts.

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};
use std::fs::File;
use std::io::Read;
use std::ops::RangeInclusive;
use std::path::Path;
use tracing::{debug, info};

/// Default input file, relative to the working directory.
pub const DEFAULT_INPUT: &str = "Automated_Traffic_Volume_Counts.csv";

/// Field values read as missing, in addition to an empty field.
///
/// This is the default NA set of the dataframe readers the dataset is usually
/// consumed with, matched exactly (case and surrounding spaces included).
pub const NA_TOKENS: [&str; 18] = [
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// A single sensor reading as it appears in the source CSV.
///
/// Columns not listed here (e.g. the minute column) are ignored. Text columns
/// are optional because the source leaves some of them blank or marks them
/// with an NA token; the numeric columns are required and a malformed value
/// fails the whole load.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawRecord {
    #[serde(rename = "RequestID")]
    pub request_id: i64,
    #[serde(rename = "Boro", deserialize_with = "na_string", default)]
    pub boro: Option<String>,
    #[serde(rename = "Yr")]
    pub year: i32,
    #[serde(rename = "M")]
    pub month: u32,
    #[serde(rename = "D")]
    pub day: u32,
    #[serde(rename = "HH")]
    pub hour: u32,
    #[serde(rename = "SegmentID")]
    pub segment_id: i64,
    #[serde(deserialize_with = "na_string", default)]
    pub street: Option<String>,
    #[serde(rename = "fromSt", deserialize_with = "na_string", default)]
    pub from_st: Option<String>,
    #[serde(rename = "toSt", deserialize_with = "na_string", default)]
    pub to_st: Option<String>,
    #[serde(rename = "Direction", deserialize_with = "na_string", default)]
    pub direction: Option<String>,
    #[serde(rename = "WktGeom", deserialize_with = "na_string", default)]
    pub wkt_geom: Option<String>,
    #[serde(rename = "Vol")]
    pub vol: i64,
}

/// True for an empty field or one of the [`NA_TOKENS`].
pub fn is_missing(value: &str) -> bool {
    value.is_empty() || NA_TOKENS.contains(&value)
}

/// Reads an optional text field, mapping missing values to `None`.
fn na_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|v| !is_missing(v)))
}

/// Reads every record from the CSV at `path`, keeping only those whose year
/// falls in `years` when a range is given.
#[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load_records(
    path: impl AsRef<Path>,
    years: Option<RangeInclusive<i32>>,
) -> Result<Vec<RawRecord>> {
    let path = path.as_ref();
    let file =
        File::open(path).with_context(|| format!("failed to open input {}", path.display()))?;
    let rows = read_records(file, years)
        .with_context(|| format!("failed to read input {}", path.display()))?;

    info!(rows = rows.len(), "Loaded traffic counts");
    Ok(rows)
}

/// Reader-based form of [`load_records`].
pub fn read_records<R: Read>(
    reader: R,
    years: Option<RangeInclusive<i32>>,
) -> Result<Vec<RawRecord>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut rows = Vec::new();
    let mut skipped = 0usize;

    for result in rdr.deserialize() {
        let record: RawRecord = result?;
        match &years {
            Some(range) if !range.contains(&record.year) => skipped += 1,
            _ => rows.push(record),
        }
    }

    if skipped > 0 {
        debug!(skipped, "Records outside year range dropped");
    }

    Ok(rows)
}
