//! Minimal well-known-text reader for point geometries.

use thiserror::Error;

/// Reasons a WKT string could not be turned into a point.
#[derive(Debug, Error, PartialEq)]
pub enum WktError {
    #[error("unsupported geometry type: {0}")]
    UnsupportedGeometry(String),

    #[error("empty point")]
    EmptyPoint,

    #[error("malformed point: {0}")]
    Malformed(String),

    #[error("invalid coordinate '{0}'")]
    InvalidCoordinate(String),

    #[error("expected 2 to 4 coordinates, found {0}")]
    WrongDimension(usize),
}

/// Parses `POINT (x y)` and returns `(x, y)`.
///
/// The keyword is case-insensitive and whitespace between the keyword and
/// the parenthesis is optional. `Z`, `M` and `ZM` points are accepted; their
/// extra ordinates are dropped.
pub fn parse_point(wkt: &str) -> Result<(f64, f64), WktError> {
    let trimmed = wkt.trim();

    let keyword_end = trimmed
        .find(|c: char| c == '(' || c.is_whitespace())
        .unwrap_or(trimmed.len());
    let keyword = &trimmed[..keyword_end];
    if !keyword.eq_ignore_ascii_case("POINT") {
        return Err(WktError::UnsupportedGeometry(keyword.to_string()));
    }

    let mut rest = trimmed[keyword_end..].trim_start();
    if rest.eq_ignore_ascii_case("EMPTY") {
        return Err(WktError::EmptyPoint);
    }

    // Dimension tag: POINT Z (...) / POINT M (...) / POINT ZM (...)
    if let Some(tag_end) = rest.find('(') {
        let tag = rest[..tag_end].trim();
        let known = ["Z", "M", "ZM"].iter().any(|t| tag.eq_ignore_ascii_case(t));
        if !tag.is_empty() && !known {
            if tag.eq_ignore_ascii_case("EMPTY") {
                return Err(WktError::EmptyPoint);
            }
            return Err(WktError::Malformed(wkt.to_string()));
        }
        rest = &rest[tag_end..];
    } else if rest.to_ascii_uppercase().ends_with("EMPTY") {
        return Err(WktError::EmptyPoint);
    }

    let body = rest
        .strip_prefix('(')
        .and_then(|r| r.strip_suffix(')'))
        .ok_or_else(|| WktError::Malformed(wkt.to_string()))?;

    let coords = body
        .split_whitespace()
        .map(|token| {
            token
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| WktError::InvalidCoordinate(token.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    match coords.as_slice() {
        [] => Err(WktError::EmptyPoint),
        [x, y] | [x, y, _] | [x, y, _, _] => Ok((*x, *y)),
        other => Err(WktError::WrongDimension(other.len())),
    }
}
