//! Persistence for rendered figures and the aggregated table.
//!
//! Supports the standalone HTML snapshot and a CSV export of the table.

use anyhow::{Context, Result};
use chrono::Utc;
use csv::WriterBuilder;
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

use crate::aggregate::types::AggregatedRecord;
use crate::figure::Figure;

/// Default snapshot path, relative to the working directory.
pub const DEFAULT_SNAPSHOT: &str = "density_map.html";

/// Overwrites `path` with a standalone HTML rendering of `figure`.
pub fn write_snapshot(path: &Path, figure: &Figure) -> Result<()> {
    let html = figure.to_html(Utc::now())?;
    fs::write(path, html).with_context(|| format!("failed to write {}", path.display()))?;
    debug!(path = %path.display(), "Snapshot written");
    Ok(())
}

/// Writes the aggregated table as CSV, with a header row.
pub fn write_aggregated<W: Write>(writer: W, records: &[AggregatedRecord]) -> Result<()> {
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(writer);

    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;

    Ok(())
}

/// File form of [`write_aggregated`]; replaces any existing file.
pub fn export_aggregated(path: &Path, records: &[AggregatedRecord]) -> Result<()> {
    let file = fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    write_aggregated(file, records)?;
    info!(path = %path.display(), rows = records.len(), "Aggregated table exported");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::AggregatedDataset;
    use crate::variant::Variant;

    fn record(boro: Option<&str>, vol: f64) -> AggregatedRecord {
        AggregatedRecord {
            request_id: 4,
            boro: boro.map(str::to_string),
            year: 2022,
            hour: 17,
            segment_id: 88,
            street: "BROADWAY".to_string(),
            from_st: boro.map(|_| "W 34 St".to_string()),
            to_st: boro.map(|_| "W 42 St".to_string()),
            direction: "NB".to_string(),
            latitude: 40.75,
            longitude: -73.98,
            vol,
        }
    }

    #[test]
    fn test_write_aggregated_header_and_rows() {
        let mut buf = Vec::new();
        write_aggregated(&mut buf, &[record(Some("Manhattan"), 12.5), record(Some("Manhattan"), 3.0)])
            .unwrap();

        let content = String::from_utf8(buf).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "RequestID,Boro,Yr,HH,SegmentID,street,fromSt,toSt,Direction,Latitude,Longitude,Vol"
        );
        assert!(lines[1].starts_with("4,Manhattan,2022,17,88,BROADWAY,W 34 St,W 42 St,NB,"));
        assert!(lines[1].ends_with(",12.5"));
    }

    #[test]
    fn test_dropped_columns_are_blank() {
        let mut buf = Vec::new();
        write_aggregated(&mut buf, &[record(None, 1.0)]).unwrap();
        let content = String::from_utf8(buf).unwrap();
        assert!(content.lines().nth(1).unwrap().starts_with("4,,2022,17,88,BROADWAY,,,NB,"));
    }

    #[test]
    fn test_write_snapshot_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("density_map.html");
        fs::write(&path, "stale").unwrap();

        let dataset = AggregatedDataset {
            variant: Variant::Scatter,
            records: vec![record(Some("Manhattan"), 5.0)],
            bounds: None,
        };
        write_snapshot(&path, &Figure::render(&dataset, 2022, 17)).unwrap();

        let html = fs::read_to_string(&path).unwrap();
        assert!(!html.contains("stale"));
        assert!(html.contains("NYC Vehicle Location Density for Hour 17:00 in 2022"));
    }

    #[test]
    fn test_write_snapshot_to_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("map.html");
        let dataset = AggregatedDataset {
            variant: Variant::Density,
            records: vec![],
            bounds: None,
        };
        assert!(write_snapshot(&path, &Figure::render(&dataset, 2022, 0)).is_err());
    }
}
