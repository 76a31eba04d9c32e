//! Lenient parsing of recorded event streams
//!
//! A recording is a JSON array (or NDJSON stream) of raw events. Entries that
//! do not decode as a [`RawEvent`] are skipped and reported, never fatal: a
//! partially corrupt recording is still worth analyzing.

use crate::error::AnalyzeError;
use crate::schema::raw_event::{RawEvent, ValidationError};
use serde_json::Value;
use tracing::debug;

/// Adapter for turning recording JSON into raw events
pub struct RawEventAdapter;

/// Events recovered from a recording, plus the entries that were dropped
#[derive(Debug, Default)]
pub struct ParsedEvents {
    pub events: Vec<RawEvent>,
    pub skipped: Vec<SkippedEntry>,
}

impl ParsedEvents {
    /// Number of entries present in the input, decodable or not
    pub fn total_entries(&self) -> usize {
        self.events.len() + self.skipped.len()
    }
}

/// An input entry that could not be decoded as a raw event
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedEntry {
    pub index: usize,
    pub reason: String,
}

impl RawEventAdapter {
    /// Parse a JSON array of raw events
    ///
    /// The top level must be an array; individual malformed entries are skipped.
    pub fn parse_array(json: &str) -> Result<ParsedEvents, AnalyzeError> {
        let value: Value = serde_json::from_str(json)?;
        let entries = match value {
            Value::Array(entries) => entries,
            // Some exports wrap the recording as {"events": [...]}
            Value::Object(mut map) => match map.remove("events") {
                Some(Value::Array(entries)) => entries,
                _ => {
                    return Err(AnalyzeError::ParseError(
                        "expected a JSON array of events".to_string(),
                    ))
                }
            },
            _ => {
                return Err(AnalyzeError::ParseError(
                    "expected a JSON array of events".to_string(),
                ))
            }
        };

        let mut parsed = ParsedEvents::default();
        for (index, entry) in entries.into_iter().enumerate() {
            match decode_entry(entry) {
                Ok(event) => parsed.events.push(event),
                Err(reason) => {
                    debug!(index, %reason, "skipping malformed event");
                    parsed.skipped.push(SkippedEntry { index, reason });
                }
            }
        }
        Ok(parsed)
    }

    /// Parse NDJSON (one raw event per line)
    ///
    /// A line that is not JSON at all means the stream itself is corrupt and is
    /// an error; a JSON line with the wrong shape is skipped.
    pub fn parse_ndjson(ndjson: &str) -> Result<ParsedEvents, AnalyzeError> {
        let mut parsed = ParsedEvents::default();
        let mut index = 0;
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let value: Value = serde_json::from_str(trimmed).map_err(|e| {
                AnalyzeError::ParseError(format!("Failed to parse line {}: {}", line_num + 1, e))
            })?;
            match decode_entry(value) {
                Ok(event) => parsed.events.push(event),
                Err(reason) => {
                    debug!(line = line_num + 1, %reason, "skipping malformed event");
                    parsed.skipped.push(SkippedEntry { index, reason });
                }
            }
            index += 1;
        }
        Ok(parsed)
    }

    /// Validate a batch of decoded events, returning only the failures
    pub fn validate_events(events: &[RawEvent]) -> Vec<ValidationResult> {
        events
            .iter()
            .enumerate()
            .filter_map(|(index, event)| {
                event.validate().err().map(|error| ValidationResult {
                    index,
                    event_type: event.event_type,
                    error,
                })
            })
            .collect()
    }
}

/// Decode one entry; only JSON objects are candidates
fn decode_entry(entry: Value) -> Result<RawEvent, String> {
    if !entry.is_object() {
        return Err("entry is not a JSON object".to_string());
    }
    serde_json::from_value(entry).map_err(|e| e.to_string())
}

/// A decoded event that failed schema validation
#[derive(Debug)]
pub struct ValidationResult {
    pub index: usize,
    pub event_type: u64,
    pub error: ValidationError,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_array_skips_malformed_entries() {
        let json = r#"[
            {"type": 4, "timestamp": 1000, "data": {"href": "https://example.com", "width": 1280, "height": 720}},
            {"type": "bogus"},
            {"timestamp": 1200},
            {"type": 3, "timestamp": 1300, "data": {"source": 1, "positions": []}}
        ]"#;

        let parsed = RawEventAdapter::parse_array(json).unwrap();
        assert_eq!(parsed.events.len(), 2);
        assert_eq!(parsed.skipped.len(), 2);
        assert_eq!(parsed.skipped[0].index, 1);
        assert_eq!(parsed.skipped[1].index, 2);
        assert_eq!(parsed.total_entries(), 4);
    }

    #[test]
    fn test_parse_array_accepts_events_wrapper() {
        let json = r#"{"events": [{"type": 1, "timestamp": 5}]}"#;
        let parsed = RawEventAdapter::parse_array(json).unwrap();
        assert_eq!(parsed.events.len(), 1);
    }

    #[test]
    fn test_parse_array_rejects_non_array() {
        assert!(matches!(
            RawEventAdapter::parse_array(r#"{"type": 1}"#),
            Err(AnalyzeError::ParseError(_))
        ));
        assert!(matches!(
            RawEventAdapter::parse_array("not json"),
            Err(AnalyzeError::JsonError(_))
        ));
    }

    #[test]
    fn test_parse_ndjson() {
        let ndjson = r#"{"type": 4, "timestamp": 0, "data": {"href": "https://example.com"}}

{"type": 5, "timestamp": 10, "data": {"tag": "submit", "payload": {}}}
[1, 2, 3]"#;

        let parsed = RawEventAdapter::parse_ndjson(ndjson).unwrap();
        assert_eq!(parsed.events.len(), 2);
        assert_eq!(parsed.skipped.len(), 1);
        assert_eq!(parsed.skipped[0].index, 2);
    }

    #[test]
    fn test_parse_ndjson_rejects_garbage_line() {
        let ndjson = "{\"type\": 1, \"timestamp\": 0}\nnot json";
        let err = RawEventAdapter::parse_ndjson(ndjson).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_validate_events() {
        let parsed = RawEventAdapter::parse_array(
            r#"[
                {"type": 2, "timestamp": 0, "data": {}},
                {"type": 9, "timestamp": 1},
                {"type": 3, "timestamp": 2, "data": {}}
            ]"#,
        )
        .unwrap();

        let failures = RawEventAdapter::validate_events(&parsed.events);
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].index, 1);
        assert_eq!(failures[0].error, ValidationError::UnknownEventType(9));
        assert_eq!(failures[1].error, ValidationError::MissingSource);
    }
}
