//! Declarative map figures rendered by plotly.js in the browser.
//!
//! A [`Figure`] is plain data: the server serializes it to JSON for the
//! interactive page and embeds the same JSON in the standalone snapshot.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::aggregate::AggregatedDataset;
use crate::aggregate::types::{AggregatedRecord, ColorBounds};
use crate::variant::{DENSITY_YEAR, Variant};

/// plotly.js build referenced by every page we emit.
///
/// Pages link this pinned build rather than inlining the library, so viewing
/// a snapshot needs network access.
pub const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

/// Green to red ramp applied over the global volume range.
pub const COLOR_RAMP: [(f64, &str); 5] = [
    (0.0, "lightgreen"),
    (0.25, "green"),
    (0.5, "yellow"),
    (0.75, "orange"),
    (1.0, "red"),
];

const NYC_CENTER: MapCenter = MapCenter {
    lat: 40.7128,
    lon: -74.0060,
};
const ZOOM: f64 = 9.0;
const MAP_STYLE: &str = "carto-positron";
const SIZE_MAX: f64 = 15.0;
const DENSITY_RADIUS: u32 = 30;

#[derive(Debug, Clone, Serialize)]
pub struct Figure {
    pub data: Vec<Trace>,
    pub layout: Layout,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Trace {
    Scattermapbox {
        lat: Vec<f64>,
        lon: Vec<f64>,
        mode: &'static str,
        hovertext: Vec<String>,
        hovertemplate: &'static str,
        marker: Marker,
        showlegend: bool,
    },
    Densitymapbox {
        lat: Vec<f64>,
        lon: Vec<f64>,
        z: Vec<f64>,
        radius: u32,
        hovertext: Vec<String>,
        hovertemplate: &'static str,
        coloraxis: &'static str,
    },
}

impl Trace {
    /// Number of plotted points.
    pub fn len(&self) -> usize {
        match self {
            Trace::Scattermapbox { lat, .. } | Trace::Densitymapbox { lat, .. } => lat.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Marker {
    pub color: Vec<f64>,
    pub size: Vec<f64>,
    pub sizemode: &'static str,
    pub sizeref: f64,
    pub opacity: f64,
    pub coloraxis: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct Layout {
    pub title: Title,
    pub mapbox: Mapbox,
    pub coloraxis: ColorAxis,
    pub margin: Margin,
}

#[derive(Debug, Clone, Serialize)]
pub struct Title {
    pub text: String,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct MapCenter {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Mapbox {
    pub style: &'static str,
    pub center: MapCenter,
    pub zoom: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColorAxis {
    pub colorscale: Vec<(f64, &'static str)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cmin: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cmax: Option<f64>,
    pub colorbar: ColorBar,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColorBar {
    pub title: Title,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Margin {
    pub l: u32,
    pub r: u32,
    pub t: u32,
    pub b: u32,
}

const SCATTER_HOVER: &str =
    "<b>%{hovertext}</b><br><br>Vol=%{marker.color}<br>Latitude=%{lat}<br>Longitude=%{lon}<extra></extra>";
const DENSITY_HOVER: &str =
    "<b>%{hovertext}</b><br><br>Vol=%{z}<br>Latitude=%{lat}<br>Longitude=%{lon}<extra></extra>";

impl Figure {
    /// Builds the map for one (year, hour) selection.
    ///
    /// Pure: the same dataset and selection always give the same figure. A
    /// selection with no rows gives an empty trace over the same base map.
    pub fn render(dataset: &AggregatedDataset, year: i32, hour: u32) -> Self {
        let rows = dataset.select(year, hour);
        let title = match dataset.variant {
            Variant::Scatter => title(year, hour),
            Variant::Density => title(DENSITY_YEAR, hour),
        };

        let trace = match dataset.variant {
            Variant::Scatter => scatter_trace(&rows),
            Variant::Density => density_trace(&rows),
        };

        Figure {
            data: vec![trace],
            layout: layout(title, dataset.bounds),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Standalone HTML page drawing this figure, loading plotly.js from the CDN.
    pub fn to_html(&self, rendered_at: DateTime<Utc>) -> Result<String> {
        // Keep "</script>" inside string values from closing the tag.
        let json = self.to_json()?.replace("</", "<\\/");
        Ok(format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="generated" content="{generated}">
    <title>{title}</title>
    <script src="{cdn}"></script>
    <style>
        html, body {{ margin: 0; height: 100%; }}
        #figure {{ width: 100%; height: 100%; }}
    </style>
</head>
<body>
    <div id="figure"></div>
    <script>
        const figure = {json};
        Plotly.newPlot("figure", figure.data, figure.layout, {{ responsive: true }});
    </script>
</body>
</html>
"#,
            generated = rendered_at.to_rfc3339(),
            title = html_escape(&self.layout.title.text),
            cdn = PLOTLY_CDN,
            json = json,
        ))
    }
}

/// Plot title for a selection.
pub fn title(year: i32, hour: u32) -> String {
    format!("NYC Vehicle Location Density for Hour {}:00 in {}", hour, year)
}

fn scatter_trace(rows: &[&AggregatedRecord]) -> Trace {
    let vols: Vec<f64> = rows.iter().map(|r| r.vol).collect();
    let max = vols.iter().copied().fold(0.0, f64::max);
    // Area sizing: the largest marker gets a diameter of SIZE_MAX pixels.
    let sizeref = if max > 0.0 {
        2.0 * max / (SIZE_MAX * SIZE_MAX)
    } else {
        1.0
    };

    Trace::Scattermapbox {
        lat: rows.iter().map(|r| r.latitude).collect(),
        lon: rows.iter().map(|r| r.longitude).collect(),
        mode: "markers",
        hovertext: rows.iter().map(|r| r.street.clone()).collect(),
        hovertemplate: SCATTER_HOVER,
        marker: Marker {
            color: vols.clone(),
            size: vols,
            sizemode: "area",
            sizeref,
            opacity: 1.0,
            coloraxis: "coloraxis",
        },
        showlegend: false,
    }
}

fn density_trace(rows: &[&AggregatedRecord]) -> Trace {
    Trace::Densitymapbox {
        lat: rows.iter().map(|r| r.latitude).collect(),
        lon: rows.iter().map(|r| r.longitude).collect(),
        z: rows.iter().map(|r| r.vol).collect(),
        radius: DENSITY_RADIUS,
        hovertext: rows.iter().map(|r| r.street.clone()).collect(),
        hovertemplate: DENSITY_HOVER,
        coloraxis: "coloraxis",
    }
}

fn layout(title: String, bounds: Option<ColorBounds>) -> Layout {
    Layout {
        title: Title { text: title },
        mapbox: Mapbox {
            style: MAP_STYLE,
            center: NYC_CENTER,
            zoom: ZOOM,
        },
        coloraxis: ColorAxis {
            colorscale: COLOR_RAMP.to_vec(),
            cmin: bounds.map(|b| b.min),
            cmax: bounds.map(|b| b.max),
            colorbar: ColorBar {
                title: Title {
                    text: "Vol".to_string(),
                },
            },
        },
        margin: Margin {
            l: 0,
            r: 0,
            t: 30,
            b: 10,
        },
    }
}

pub(crate) fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(year: i32, hour: u32, street: &str, vol: f64) -> AggregatedRecord {
        AggregatedRecord {
            request_id: 1,
            boro: Some("Brooklyn".to_string()),
            year,
            hour,
            segment_id: 3,
            street: street.to_string(),
            from_st: Some("A".to_string()),
            to_st: Some("B".to_string()),
            direction: "EB".to_string(),
            latitude: 40.65,
            longitude: -73.95,
            vol,
        }
    }

    fn dataset(variant: Variant) -> AggregatedDataset {
        let records = vec![
            row(2020, 8, "ATLANTIC AVE", 40.0),
            row(2020, 8, "FLATBUSH AVE", 10.0),
            row(2021, 8, "OCEAN PKWY", 90.0),
        ];
        AggregatedDataset {
            variant,
            bounds: ColorBounds::from_values(records.iter().map(|r| r.vol)),
            records,
        }
    }

    #[test]
    fn test_scatter_figure() {
        let fig = Figure::render(&dataset(Variant::Scatter), 2020, 8);

        assert_eq!(fig.layout.title.text, "NYC Vehicle Location Density for Hour 8:00 in 2020");
        assert_eq!(fig.data.len(), 1);
        match &fig.data[0] {
            Trace::Scattermapbox {
                marker, hovertext, ..
            } => {
                assert_eq!(marker.color, vec![40.0, 10.0]);
                assert_eq!(hovertext, &vec!["ATLANTIC AVE".to_string(), "FLATBUSH AVE".to_string()]);
                assert!((marker.sizeref - 2.0 * 40.0 / 225.0).abs() < 1e-12);
            }
            other => panic!("unexpected trace {:?}", other),
        }
    }

    #[test]
    fn test_color_range_is_global() {
        let fig = Figure::render(&dataset(Variant::Scatter), 2020, 8);
        // Bounds come from all years, not just the selection.
        assert_eq!(fig.layout.coloraxis.cmin, Some(10.0));
        assert_eq!(fig.layout.coloraxis.cmax, Some(90.0));
        assert_eq!(fig.layout.coloraxis.colorscale.len(), 5);
        assert_eq!(fig.layout.coloraxis.colorscale[0], (0.0, "lightgreen"));
        assert_eq!(fig.layout.coloraxis.colorscale[4], (1.0, "red"));
    }

    #[test]
    fn test_density_figure_is_pinned_to_2022() {
        let fig = Figure::render(&dataset(Variant::Density), 2020, 8);
        assert_eq!(fig.layout.title.text, "NYC Vehicle Location Density for Hour 8:00 in 2022");
        assert!(matches!(fig.data[0], Trace::Densitymapbox { .. }));
    }

    #[test]
    fn test_empty_selection_renders() {
        let fig = Figure::render(&dataset(Variant::Scatter), 2019, 3);
        assert!(fig.data[0].is_empty());

        let json: serde_json::Value = serde_json::from_str(&fig.to_json().unwrap()).unwrap();
        assert_eq!(json["data"][0]["type"], "scattermapbox");
        assert_eq!(json["data"][0]["lat"].as_array().unwrap().len(), 0);
        assert_eq!(json["data"][0]["marker"]["sizeref"], 1.0);
    }

    #[test]
    fn test_json_shape() {
        let fig = Figure::render(&dataset(Variant::Density), 2020, 8);
        let json: serde_json::Value = serde_json::from_str(&fig.to_json().unwrap()).unwrap();

        assert_eq!(json["data"][0]["type"], "densitymapbox");
        assert_eq!(json["layout"]["mapbox"]["style"], "carto-positron");
        assert_eq!(json["layout"]["mapbox"]["zoom"], 9.0);
        assert_eq!(json["layout"]["margin"]["t"], 30);
        assert_eq!(json["layout"]["coloraxis"]["colorscale"][2][1], "yellow");
        assert_eq!(json["data"][0]["radius"], 30);
    }

    #[test]
    fn test_html_escapes_script_close() {
        let mut ds = dataset(Variant::Scatter);
        ds.records[0].street = "</script><b>".to_string();
        let html = Figure::render(&ds, 2020, 8).to_html(Utc::now()).unwrap();

        assert!(html.contains(PLOTLY_CDN));
        assert!(html.contains("Plotly.newPlot"));
        assert_eq!(html.matches("</script>").count(), 2);
    }

    #[test]
    fn test_snapshot_links_pinned_plotly_build() {
        let html = Figure::render(&dataset(Variant::Density), 2020, 8)
            .to_html(Utc::now())
            .unwrap();

        assert!(PLOTLY_CDN.starts_with("https://cdn.plot.ly/plotly-2."));
        assert!(html.contains(&format!(r#"<script src="{}"></script>"#, PLOTLY_CDN)));
        // One external script tag and one inline figure script, no bundled library.
        assert_eq!(html.matches("<script").count(), 2);
        assert!(html.len() < 100_000);
    }
}
