//! The two map variants served by the tool.
//!
//! Both variants share the loader, geocoder and the first two aggregation
//! passes. They differ in the year window, the key set of the final
//! aggregation pass and the kind of plot drawn.

use clap::ValueEnum;
use serde::Serialize;
use std::fmt;
use std::ops::RangeInclusive;

/// Year the density variant is pinned to.
pub const DENSITY_YEAR: i32 = 2022;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Year + hour dropdowns, markers coloured and sized by volume.
    Scatter,
    /// Hour dropdown only, fixed to 2022, density intensity by volume.
    Density,
}

impl Variant {
    /// Years kept by the loader for this variant.
    pub fn year_range(&self) -> RangeInclusive<i32> {
        match self {
            Variant::Scatter => 2017..=2022,
            Variant::Density => DENSITY_YEAR..=DENSITY_YEAR,
        }
    }

    /// Whether the final aggregation pass keeps Boro, fromSt and toSt in its key.
    pub fn keeps_cross_streets(&self) -> bool {
        matches!(self, Variant::Scatter)
    }

    /// Whether the page offers a year dropdown.
    pub fn has_year_selector(&self) -> bool {
        matches!(self, Variant::Scatter)
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Scatter => write!(f, "scatter"),
            Variant::Density => write!(f, "density"),
        }
    }
}
