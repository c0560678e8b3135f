//! The latest-values snapshot endpoint.
//!
//! The device-side tooling overwrites a flat file with one `key:value`
//! pair per line. `GET /sensor_data` parses it into a key→number JSON
//! mapping so dashboards can fetch the most recent state without a
//! websocket.

use std::{io, path::Path};

use axum::{http::StatusCode, response::IntoResponse, Extension, Json};
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::warn;

use crate::config::Config;

/// Problems reading or parsing the snapshot file.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The file exists but could not be read.
    #[error("Could not read snapshot file: {0}")]
    Read(#[from] io::Error),

    /// A line has no `key:value` shape.
    #[error("Line `{0}` is missing a `:` separator")]
    MissingSeparator(String),

    /// A value is not a number.
    #[error("Could not parse `{0}` as a number")]
    BadNumber(String),
}

/// Parse flat `key:value` lines into a key→number mapping.
///
/// A value containing a decimal point parses as floating-point,
/// anything else as an integer.
pub fn parse_snapshot(contents: &str) -> Result<Map<String, Value>, SnapshotError> {
    let mut data = Map::new();

    for line in contents.lines() {
        let line = line.trim();

        let (key, value) = line
            .split_once(':')
            .ok_or_else(|| SnapshotError::MissingSeparator(line.to_string()))?;

        let value = value.trim();

        let number = if value.contains('.') {
            let float: f64 = value
                .parse()
                .map_err(|_| SnapshotError::BadNumber(value.to_string()))?;

            serde_json::Number::from_f64(float)
                .ok_or_else(|| SnapshotError::BadNumber(value.to_string()))?
        } else {
            let integer: i64 = value
                .parse()
                .map_err(|_| SnapshotError::BadNumber(value.to_string()))?;

            serde_json::Number::from(integer)
        };

        data.insert(key.to_string(), Value::Number(number));
    }

    Ok(data)
}

/// Read and parse the snapshot file.
/// A file which does not exist yields an empty mapping.
pub async fn read_snapshot(path: &Path) -> Result<Map<String, Value>, SnapshotError> {
    let contents = match tokio::fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Map::new()),
        Err(e) => return Err(e.into()),
    };

    parse_snapshot(&contents)
}

pub(crate) async fn sensor_data(Extension(config): Extension<Config>) -> impl IntoResponse {
    match read_snapshot(&config.data_file).await {
        Ok(data) => (StatusCode::OK, Json(Value::Object(data))),
        Err(e) => {
            warn!("Snapshot request failed: {e}");

            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": format!("Failed to read file: {e}") })),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn floats_and_integers_are_typed() {
        let data = parse_snapshot("temp:21.5\nhumidity:40\n").unwrap();

        assert_eq!(
            Value::Object(data),
            json!({ "temp": 21.5, "humidity": 40 })
        );

        let data = parse_snapshot("humidity:40").unwrap();
        assert!(data["humidity"].is_i64());
    }

    #[test]
    fn missing_separator_is_an_error() {
        let result = parse_snapshot("temp:21.5\nhumidity 40\n");

        assert!(matches!(result, Err(SnapshotError::MissingSeparator(_))));
    }

    #[test]
    fn bad_number_is_an_error() {
        let result = parse_snapshot("temp:warm\n");

        assert!(matches!(result, Err(SnapshotError::BadNumber(_))));
    }

    #[test]
    fn empty_file_is_an_empty_mapping() {
        assert!(parse_snapshot("").unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_file_is_an_empty_mapping() {
        let data = read_snapshot(Path::new("definitely-not-here.txt"))
            .await
            .unwrap();

        assert!(data.is_empty());
    }
}
