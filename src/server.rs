//! HTTP front end: the interactive page and the figure endpoint.
//!
//! Routes:
//! - `GET /` page with the dropdowns and the map
//! - `GET /api/options` dropdown domains and initial selection
//! - `GET /api/figure?year=&hour=` rendered figure as JSON; also rewrites the snapshot
//! - `GET /health`

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::Html,
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::aggregate::AggregatedDataset;
use crate::figure::{Figure, PLOTLY_CDN, html_escape};
use crate::output::write_snapshot;
use crate::variant::Variant;

/// One dropdown entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Choice {
    pub label: String,
    pub value: i64,
}

/// Dropdown domains, computed once from the dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Options {
    pub variant: Variant,
    /// `None` when the variant has no year selector.
    pub years: Option<Vec<Choice>>,
    pub hours: Vec<Choice>,
    pub initial_year: i32,
    pub initial_hour: u32,
}

impl Options {
    pub fn from_dataset(dataset: &AggregatedDataset) -> Self {
        let years = dataset.variant.has_year_selector().then(|| {
            dataset
                .years()
                .into_iter()
                .map(|y| Choice {
                    label: y.to_string(),
                    value: i64::from(y),
                })
                .collect::<Vec<_>>()
        });
        let hours = dataset
            .hours()
            .into_iter()
            .map(|h| Choice {
                label: format!("{}:00", h),
                value: i64::from(h),
            })
            .collect::<Vec<_>>();

        Self {
            variant: dataset.variant,
            years,
            hours,
            initial_year: dataset.initial_year(),
            initial_hour: dataset.initial_hour(),
        }
    }
}

/// Read-only state shared by every handler.
pub struct AppState {
    pub dataset: AggregatedDataset,
    pub options: Options,
    pub snapshot_path: PathBuf,
}

impl AppState {
    pub fn new(dataset: AggregatedDataset, snapshot_path: PathBuf) -> Self {
        let options = Options::from_dataset(&dataset);
        Self {
            dataset,
            options,
            snapshot_path,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct FigureQuery {
    pub year: Option<i32>,
    pub hour: Option<u32>,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/api/options", get(options_handler))
        .route("/api/figure", get(figure_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index_handler(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(render_page(&state.options))
}

async fn options_handler(State(state): State<Arc<AppState>>) -> Json<Options> {
    Json(state.options.clone())
}

/// Renders the selection and rewrites the snapshot before answering.
async fn figure_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FigureQuery>,
) -> Result<Json<Figure>, (StatusCode, String)> {
    let year = match state.dataset.variant {
        Variant::Scatter => query.year.unwrap_or(state.options.initial_year),
        Variant::Density => state.options.initial_year,
    };
    let hour = query.hour.unwrap_or(state.options.initial_hour);

    let figure = Figure::render(&state.dataset, year, hour);
    info!(year, hour, points = figure.data[0].len(), "Figure rendered");

    if let Err(e) = write_snapshot(&state.snapshot_path, &figure) {
        error!(error = %e, "Failed to write snapshot");
        return Err((StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", e)));
    }

    Ok(Json(figure))
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "variant": state.dataset.variant,
        "records": state.dataset.records.len(),
    }))
}

fn select_html(id: &str, choices: &[Choice], selected: i64) -> String {
    let options: String = choices
        .iter()
        .map(|c| {
            format!(
                r#"<option value="{}"{}>{}</option>"#,
                c.value,
                if c.value == selected { " selected" } else { "" },
                html_escape(&c.label)
            )
        })
        .collect();
    format!(r#"<select id="{}">{}</select>"#, id, options)
}

/// The interactive page. Dropdowns are server-rendered; the map is drawn
/// client-side from `/api/figure`.
pub fn render_page(options: &Options) -> String {
    let year_select = options
        .years
        .as_deref()
        .map(|years| select_html("year-dropdown", years, i64::from(options.initial_year)))
        .unwrap_or_default();
    let hour_select = select_html("hour-dropdown", &options.hours, i64::from(options.initial_hour));

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>NYC Traffic Volume</title>
    <script src="{cdn}"></script>
    <style>
        body {{ font-family: sans-serif; margin: 0; }}
        .controls {{ display: flex; gap: 12px; padding: 8px; }}
        select {{ min-width: 160px; padding: 4px; }}
        #density-map {{ width: 100%; height: calc(100vh - 60px); }}
        #error {{ color: #b00020; padding: 0 8px; }}
    </style>
</head>
<body>
    <div class="controls">
        {year_select}
        {hour_select}
    </div>
    <div id="error"></div>
    <div id="density-map"></div>
    <script>
        const yearSelect = document.getElementById("year-dropdown");
        const hourSelect = document.getElementById("hour-dropdown");
        const errorBox = document.getElementById("error");

        async function update() {{
            const params = new URLSearchParams({{ hour: hourSelect.value }});
            if (yearSelect) params.set("year", yearSelect.value);
            const resp = await fetch("/api/figure?" + params.toString());
            if (!resp.ok) {{
                errorBox.textContent = await resp.text();
                return;
            }}
            errorBox.textContent = "";
            const figure = await resp.json();
            Plotly.react("density-map", figure.data, figure.layout, {{ responsive: true }});
        }}

        if (yearSelect) yearSelect.addEventListener("change", update);
        hourSelect.addEventListener("change", update);
        update();
    </script>
</body>
</html>
"#,
        cdn = PLOTLY_CDN,
        year_select = year_select,
        hour_select = hour_select,
    )
}
