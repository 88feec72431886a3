//! Reprojection of state-plane point geometries to latitude/longitude.
//!
//! [`Geocoder`] turns the `WktGeom` column (EPSG:2263, US survey feet) into
//! WGS84 degrees. The NAD83 to WGS84 datum shift is treated as identity.
//! Failures never propagate: they are logged and the record is dropped by
//! [`geocode_records`].

pub mod lambert;
pub mod wkt;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::loader::RawRecord;
use lambert::LambertConformal;
use wkt::WktError;

#[derive(Debug, Error, PartialEq)]
pub enum GeocodeError {
    #[error(transparent)]
    Wkt(#[from] WktError),

    #[error("({x}, {y}) has no geographic position")]
    OutOfDomain { x: f64, y: f64 },
}

/// Geographic position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLon {
    pub latitude: f64,
    pub longitude: f64,
}

/// A raw record with its derived position.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedRecord {
    pub raw: RawRecord,
    pub position: LatLon,
}

/// Converts WKT points from the New York Long Island state-plane zone.
#[derive(Debug, Clone)]
pub struct Geocoder {
    projection: LambertConformal,
}

impl Default for Geocoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Geocoder {
    pub fn new() -> Self {
        Self {
            projection: LambertConformal::new_york_long_island(),
        }
    }

    /// Parses and reprojects a single WKT point.
    pub fn try_convert(&self, wkt: &str) -> Result<LatLon, GeocodeError> {
        let (x, y) = wkt::parse_point(wkt)?;
        let (latitude, longitude) = self
            .projection
            .inverse(x, y)
            .ok_or(GeocodeError::OutOfDomain { x, y })?;
        Ok(LatLon {
            latitude,
            longitude,
        })
    }

    /// Infallible form of [`Geocoder::try_convert`].
    ///
    /// Null or blank input yields `None` silently; anything else that fails
    /// is logged and yields `None`.
    pub fn convert(&self, wkt: Option<&str>) -> Option<LatLon> {
        let wkt = wkt.map(str::trim).filter(|s| !s.is_empty())?;
        match self.try_convert(wkt) {
            Ok(position) => Some(position),
            Err(e) => {
                warn!(wkt, error = %e, "Error converting WKT");
                None
            }
        }
    }
}

/// Geocodes every record, dropping those without a usable position.
#[tracing::instrument(skip_all, fields(records = records.len()))]
pub fn geocode_records(geocoder: &Geocoder, records: Vec<RawRecord>) -> Vec<GeocodedRecord> {
    let total = records.len();

    let geocoded: Vec<GeocodedRecord> = records
        .into_iter()
        .filter_map(|raw| {
            let position = geocoder.convert(raw.wkt_geom.as_deref())?;
            Some(GeocodedRecord { raw, position })
        })
        .collect();

    let dropped = total - geocoded.len();
    if dropped > 0 {
        debug!(dropped, "Records without coordinates dropped");
    }
    info!(geocoded = geocoded.len(), dropped, "Geocoding complete");

    geocoded
}
