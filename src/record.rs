use std::fmt::Display;

use serde::de::IgnoredAny;
use thiserror::Error;

/// One validated telemetry record.
///
/// The relay does not interpret the payload; its schema is owned by the
/// device firmware. By construction a record is always well-formed JSON,
/// so subscribers never see a partial or garbled line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryRecord(String);

/// Why a device line could not be turned into a record.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The line was not valid UTF-8.
    #[error("Line is not valid UTF-8")]
    Utf8(#[from] std::str::Utf8Error),

    /// The line was not well-formed JSON.
    #[error("Line is not well-formed JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl TelemetryRecord {
    /// Decode one raw device line.
    ///
    /// The line is decoded as UTF-8, stripped of surrounding whitespace
    /// (including the line terminator) and checked for JSON
    /// well-formedness.
    ///
    /// A line which is empty after stripping yields `Ok(None)`: not a
    /// record, not an error.
    pub fn decode(line: &[u8]) -> Result<Option<Self>, DecodeError> {
        let text = std::str::from_utf8(line)?.trim();

        if text.is_empty() {
            return Ok(None);
        }

        // Validate only; the payload is forwarded verbatim.
        serde_json::from_str::<IgnoredAny>(text)?;

        Ok(Some(Self(text.to_string())))
    }

    /// Borrowed form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The validated payload text.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Display for TelemetryRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = self.0.chars().take(48).collect::<String>();

        write!(f, "{}", s.trim())
    }
}
