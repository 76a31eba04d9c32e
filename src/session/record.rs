//! Persistence envelope
//!
//! Wraps a [`SemanticSession`] with identity and provenance so the caller can
//! store it as an opaque blob next to its session record.

use crate::error::AnalyzeError;
use crate::session::types::SemanticSession;
use crate::{LENS_VERSION, PRODUCER_NAME};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current record format version
pub const RECORD_VERSION: &str = "1.0.0";

/// Who produced a record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Stored analysis of one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    pub record_version: String,
    pub analysis_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub producer: RecordProducer,
    pub computed_at: DateTime<Utc>,
    pub session: SemanticSession,
}

impl AnalysisRecord {
    pub fn to_json(&self) -> Result<String, AnalyzeError> {
        serde_json::to_string(self).map_err(|e| AnalyzeError::EncodingError(e.to_string()))
    }

    pub fn to_json_pretty(&self) -> Result<String, AnalyzeError> {
        serde_json::to_string_pretty(self).map_err(|e| AnalyzeError::EncodingError(e.to_string()))
    }
}

/// Encoder stamping records with a stable producer instance
pub struct RecordEncoder {
    instance_id: String,
}

impl Default for RecordEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordEncoder {
    /// Create an encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn encode(&self, session: SemanticSession, session_id: Option<String>) -> AnalysisRecord {
        AnalysisRecord {
            record_version: RECORD_VERSION.to_string(),
            analysis_id: Uuid::new_v4(),
            session_id,
            producer: RecordProducer {
                name: PRODUCER_NAME.to_string(),
                version: LENS_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            computed_at: Utc::now(),
            session,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::analyze_events;

    #[test]
    fn test_encode_record() {
        let encoder = RecordEncoder::with_instance_id("test-instance".to_string());
        let record = encoder.encode(analyze_events(&[]), Some("sess-42".to_string()));

        assert_eq!(record.record_version, RECORD_VERSION);
        assert_eq!(record.producer.name, "session-lens");
        assert_eq!(record.producer.instance_id, "test-instance");
        assert_eq!(record.session_id.as_deref(), Some("sess-42"));

        let json = record.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value["analysisId"].is_string());
        assert_eq!(value["session"]["eventCount"], 0);
        assert!(value["computedAt"].as_str().unwrap().contains('T'));
    }

    #[test]
    fn test_records_get_distinct_ids() {
        let encoder = RecordEncoder::new();
        let a = encoder.encode(analyze_events(&[]), None);
        let b = encoder.encode(analyze_events(&[]), None);
        assert_ne!(a.analysis_id, b.analysis_id);
        assert_eq!(a.producer.instance_id, b.producer.instance_id);
        assert!(!a.to_json().unwrap().contains("sessionId"));
    }

    #[test]
    fn test_record_round_trips() {
        let record = RecordEncoder::new().encode(analyze_events(&[]), None);
        let parsed: AnalysisRecord = serde_json::from_str(&record.to_json_pretty().unwrap()).unwrap();
        assert_eq!(parsed, record);
    }
}
