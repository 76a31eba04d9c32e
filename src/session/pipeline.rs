//! Session analysis pipeline
//!
//! This module provides the public API for analyzing a recorded session.
//! Pipeline: RawEvent JSON → Adapter → Normalizer → Classifier → Aggregator → SemanticSession

use crate::config::AnalyzerConfig;
use crate::error::AnalyzeError;
use crate::schema::{ParsedEvents, RawEvent, RawEventAdapter};
use crate::session::aggregator::SessionAggregator;
use crate::session::classifier::Classifier;
use crate::session::normalizer::EventNormalizer;
use crate::session::record::{AnalysisRecord, RecordEncoder};
use crate::session::types::SemanticSession;
use tracing::{debug, info};

/// Analyze raw events with the default thresholds
pub fn analyze_events(events: &[RawEvent]) -> SemanticSession {
    SessionAnalyzer::new().analyze(events)
}

/// Convert a JSON array of raw events to semantic session JSON (stateless, one-shot).
///
/// Sessions without a single meaningful interaction are reported as
/// [`AnalyzeError::NoMeaningfulInteractions`] rather than as empty output.
///
/// # Example
/// ```ignore
/// let semantic_json = session_to_semantic_json(recording_json)?;
/// ```
pub fn session_to_semantic_json(events_json: String) -> Result<String, AnalyzeError> {
    let session = SessionAnalyzer::new()
        .analyze_json(&events_json)?
        .require_interactions()?;
    session.to_json()
}

/// Reusable analyzer holding a threshold configuration
///
/// Holds no per-session state, so one analyzer can serve many sessions and
/// threads.
#[derive(Default)]
pub struct SessionAnalyzer {
    config: AnalyzerConfig,
    encoder: RecordEncoder,
}

impl SessionAnalyzer {
    /// Create an analyzer with the default thresholds
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an analyzer with custom thresholds; rejects invalid configs
    pub fn with_config(config: AnalyzerConfig) -> Result<Self, AnalyzeError> {
        config.validate()?;
        Ok(Self {
            config,
            encoder: RecordEncoder::new(),
        })
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Analyze a batch of raw events
    pub fn analyze(&self, events: &[RawEvent]) -> SemanticSession {
        // Stage 1: Normalize, order and label events
        let normalized = EventNormalizer::normalize(events, &self.config);
        let metadata = normalized.metadata;
        debug!(
            raw = events.len(),
            normalized = normalized.events.len(),
            "normalized session events"
        );

        // Stage 2: Classify in one forward pass
        let output = normalized
            .events
            .iter()
            .fold(Classifier::new(&self.config), |mut classifier, event| {
                classifier.observe(event);
                classifier
            })
            .finish(metadata.duration_ms);

        // Stage 3: Finalize summary and derive signals
        let summary = SessionAggregator::finalize(output.summary, metadata.duration_ms);
        let behavioral_signals = SessionAggregator::derive_signals(&summary, &self.config.signals);

        info!(
            events = metadata.event_count,
            logs = output.logs.len(),
            duration_ms = metadata.duration_ms,
            frustrated = behavioral_signals.is_frustrated,
            "analyzed session"
        );

        SemanticSession {
            page_url: metadata.page_url,
            page_title: metadata.page_title,
            total_duration: metadata.duration_ms,
            event_count: metadata.event_count,
            viewport_size: metadata.viewport,
            started_at: metadata.started_at,
            logs: output.logs,
            summary,
            behavioral_signals,
        }
    }

    /// Analyze a JSON array of raw events
    pub fn analyze_json(&self, json: &str) -> Result<SemanticSession, AnalyzeError> {
        let parsed = RawEventAdapter::parse_array(json)?;
        Ok(self.analyze_parsed(parsed))
    }

    /// Analyze an NDJSON stream of raw events
    pub fn analyze_ndjson(&self, ndjson: &str) -> Result<SemanticSession, AnalyzeError> {
        let parsed = RawEventAdapter::parse_ndjson(ndjson)?;
        Ok(self.analyze_parsed(parsed))
    }

    /// Analyze and wrap the result in a persistence record
    pub fn analyze_to_record(
        &self,
        events: &[RawEvent],
        session_id: Option<String>,
    ) -> AnalysisRecord {
        self.encoder.encode(self.analyze(events), session_id)
    }

    fn analyze_parsed(&self, parsed: ParsedEvents) -> SemanticSession {
        if !parsed.skipped.is_empty() {
            debug!(
                skipped = parsed.skipped.len(),
                total = parsed.total_entries(),
                "skipped malformed entries"
            );
        }
        self.analyze(&parsed.events)
    }
}

impl SemanticSession {
    /// Whether anything in the session was worth a log line
    pub fn has_meaningful_interactions(&self) -> bool {
        !self.logs.is_empty()
    }

    /// Pass the session through, or report the no-interaction condition
    pub fn require_interactions(self) -> Result<Self, AnalyzeError> {
        if self.has_meaningful_interactions() {
            Ok(self)
        } else {
            Err(AnalyzeError::NoMeaningfulInteractions {
                event_count: self.event_count,
            })
        }
    }

    pub fn to_json(&self) -> Result<String, AnalyzeError> {
        serde_json::to_string(self).map_err(|e| AnalyzeError::EncodingError(e.to_string()))
    }

    pub fn to_json_pretty(&self) -> Result<String, AnalyzeError> {
        serde_json::to_string_pretty(self).map_err(|e| AnalyzeError::EncodingError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::IncrementalSource;
    use crate::session::types::{LogFlag, SessionSummary};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn click(ts: f64, target: &str) -> RawEvent {
        RawEvent::incremental(
            ts,
            IncrementalSource::MouseInteraction,
            json!({ "type": 2, "target": target }),
        )
    }

    fn sample_recording_json() -> &'static str {
        r#"[
            {"type": 4, "timestamp": 1700000000000, "data": {"href": "https://acme.test/signup", "width": 1280, "height": 720}},
            {"type": 2, "timestamp": 1700000000010, "data": {"node": {"type": 0, "id": 1, "childNodes": [
                {"type": 2, "id": 2, "tagName": "title", "attributes": {}, "childNodes": [{"type": 3, "id": 3, "textContent": "Sign up"}]},
                {"type": 2, "id": 4, "tagName": "input", "attributes": {"id": "email", "type": "email"}, "childNodes": []},
                {"type": 2, "id": 5, "tagName": "button", "attributes": {"type": "submit"}, "childNodes": [{"type": 3, "id": 6, "textContent": "Create account"}]}
            ]}}},
            {"type": 3, "timestamp": 1700000001000, "data": {"source": 5, "id": 4, "text": "a"}},
            {"type": 3, "timestamp": 1700000001200, "data": {"source": 5, "id": 4, "text": "ana@acme.test"}},
            {"type": 3, "timestamp": 1700000003000, "data": {"source": 3, "id": 1, "x": 0, "y": 400}},
            {"type": 3, "timestamp": 1700000004000, "data": {"source": 2, "type": 2, "id": 5}},
            {"type": 3, "timestamp": 1700000004100, "data": {"source": 0, "adds": [], "removes": [{"parentId": 1, "id": 5}], "texts": [], "attributes": []}},
            {"type": 5, "timestamp": 1700000004200, "data": {"tag": "submit", "payload": {"target": "Signup form"}}},
            "garbage"
        ]"#
    }

    #[test]
    fn test_analyze_sample_recording() {
        let session = SessionAnalyzer::new()
            .analyze_json(sample_recording_json())
            .unwrap();

        assert_eq!(session.page_url.as_deref(), Some("https://acme.test/signup"));
        assert_eq!(session.page_title.as_deref(), Some("Sign up"));
        assert_eq!(session.event_count, 8);
        assert_eq!(session.total_duration, 4_200);
        assert_eq!(
            session.started_at.map(|t| t.to_rfc3339()),
            Some("2023-11-14T22:13:20+00:00".to_string())
        );

        let lines: Vec<String> = session.logs.iter().map(|l| l.render()).collect();
        assert_eq!(
            lines,
            vec![
                "[00:01] input: Typed 13 characters into input#email",
                "[00:03] scroll: Scrolled to 400px",
                "[00:04] click: Clicked button \"Create account\"",
                "[00:04] submit: Submitted Signup form",
            ]
        );

        assert_eq!(session.summary.clicks.total_clicks, 1);
        assert_eq!(session.summary.clicks.dead_clicks, 0);
        assert_eq!(session.summary.inputs.total_inputs, 1);
        assert_eq!(session.summary.inputs.form_submissions, 1);
        assert_eq!(session.summary.inputs.abandoned_inputs, 0);
        assert_eq!(session.summary.engagement.time_to_first_interaction, Some(1_000));
        assert!(session.behavioral_signals.completed_goal);
        assert!(!session.behavioral_signals.is_frustrated);
    }

    #[test]
    fn test_empty_input_reports_no_interactions() {
        let session = analyze_events(&[]);
        assert!(session.logs.is_empty());
        assert_eq!(session.summary, SessionSummary::default());
        assert_eq!(session.behavioral_signals, Default::default());
        assert_eq!(session.event_count, 0);
        assert!(!session.has_meaningful_interactions());
        assert!(matches!(
            session.require_interactions(),
            Err(AnalyzeError::NoMeaningfulInteractions { event_count: 0 })
        ));

        let err = session_to_semantic_json("[]".to_string()).unwrap_err();
        assert!(matches!(err, AnalyzeError::NoMeaningfulInteractions { .. }));
    }

    #[test]
    fn test_rage_click_session() {
        let session = analyze_events(&[
            click(0.0, "Submit button"),
            click(400.0, "Submit button"),
            click(800.0, "Submit button"),
        ]);

        let rage_lines = session
            .logs
            .iter()
            .filter(|l| l.has_flag(LogFlag::RageClick))
            .count();
        assert_eq!(rage_lines, 1);
        assert_eq!(session.summary.clicks.rage_clicks, 1);
        assert_eq!(session.summary.clicks.total_clicks, 3);
        assert!(session.behavioral_signals.is_frustrated);
    }

    #[test]
    fn test_dead_click_session() {
        let session = analyze_events(&[click(0.0, "Menu icon")]);
        assert_eq!(session.logs.len(), 1);
        assert!(session.logs[0].has_flag(LogFlag::NoResponse));
        assert_eq!(session.summary.clicks.dead_clicks, 1);
    }

    #[test]
    fn test_hesitation_session() {
        let session = analyze_events(&[
            RawEvent::custom(0.0, "hover_start", json!({ "target": "Tooltip trigger" })),
            RawEvent::custom(2_000.0, "hover_end", json!({ "target": "Tooltip trigger" })),
        ]);
        assert_eq!(session.summary.attention.hesitations, 1);
        assert_eq!(session.summary.attention.hover_time, 2_000);
    }

    #[test]
    fn test_mobile_signal() {
        let touch_only = analyze_events(&[
            RawEvent::incremental(0.0, IncrementalSource::MouseInteraction, json!({ "type": 7, "target": "Menu" })),
            RawEvent::custom(500.0, "swipe", json!({ "target": "Carousel", "direction": "left" })),
        ]);
        assert!(touch_only.behavioral_signals.is_mobile);

        let click_only = analyze_events(&[click(0.0, "Menu")]);
        assert!(!click_only.behavioral_signals.is_mobile);

        let drag_only = analyze_events(&[
            RawEvent::incremental(0.0, IncrementalSource::TouchMove, json!({ "positions": [] })),
            RawEvent::incremental(80.0, IncrementalSource::TouchMove, json!({ "positions": [] })),
        ]);
        assert_eq!(drag_only.summary.touch.touch_events, 1);
        assert!(drag_only.behavioral_signals.is_mobile);
    }

    #[test]
    fn test_submission_completes_goal() {
        let session = analyze_events(&[RawEvent::custom(
            0.0,
            "submit",
            json!({ "target": "Contact form" }),
        )]);
        assert_eq!(session.summary.inputs.form_submissions, 1);
        assert_eq!(session.summary.clicks.rage_clicks, 0);
        assert_eq!(session.summary.clicks.dead_clicks, 0);
        assert!(session.behavioral_signals.completed_goal);
    }

    #[test]
    fn test_analysis_is_idempotent() {
        let analyzer = SessionAnalyzer::new();
        let first = analyzer.analyze_json(sample_recording_json()).unwrap().to_json().unwrap();
        let second = analyzer.analyze_json(sample_recording_json()).unwrap().to_json().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_unordered_input_yields_sorted_logs() {
        let session = analyze_events(&[
            click(5_000.0, "C"),
            click(100.0, "A"),
            RawEvent::custom(3_000.0, "copy", json!({ "target": "Price" })),
            click(900.0, "B"),
            click(900.0, "B"),
            click(950.0, "B"),
        ]);

        assert!(session
            .logs
            .windows(2)
            .all(|w| w[0].offset_ms <= w[1].offset_ms));
        assert!(session.event_count >= session.logs.len());
        let clicks = &session.summary.clicks;
        assert!(clicks.rage_clicks <= clicks.total_clicks);
        assert!(clicks.dead_clicks <= clicks.total_clicks);
    }

    #[test]
    fn test_ndjson_input() {
        let ndjson = "{\"type\": 5, \"timestamp\": 0, \"data\": {\"tag\": \"copy\", \"payload\": {\"target\": \"Coupon\"}}}\n\
                      {\"type\": 5, \"timestamp\": 10, \"data\": {\"tag\": \"paste\", \"payload\": {\"target\": \"Code field\"}}}";
        let session = SessionAnalyzer::new().analyze_ndjson(ndjson).unwrap();
        assert_eq!(session.summary.selection.copy_events, 1);
        assert_eq!(session.summary.selection.paste_events, 1);
    }

    #[test]
    fn test_custom_thresholds() {
        let config = AnalyzerConfig::from_json(r#"{ "rage_click_min_clicks": 2 }"#).unwrap();
        let session = SessionAnalyzer::with_config(config)
            .unwrap()
            .analyze(&[click(0.0, "Buy"), click(300.0, "Buy")]);
        assert_eq!(session.summary.clicks.rage_clicks, 1);
    }

    #[test]
    fn test_with_config_rejects_invalid_thresholds() {
        let config = AnalyzerConfig {
            scroll_depth_milestone_pct: 0,
            ..AnalyzerConfig::default()
        };
        assert!(matches!(
            SessionAnalyzer::with_config(config),
            Err(AnalyzeError::ConfigError(_))
        ));

        let config = AnalyzerConfig {
            rapid_scroll_min_events: 0,
            ..AnalyzerConfig::default()
        };
        assert!(SessionAnalyzer::with_config(config).is_err());
    }

    #[test]
    fn test_semantic_json_shape() {
        let json = session_to_semantic_json(sample_recording_json().to_string()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["pageUrl"], "https://acme.test/signup");
        assert_eq!(value["viewportSize"]["width"], 1280);
        assert_eq!(value["logs"][0]["timestamp"], "[00:01]");
        assert_eq!(value["logs"][0]["offsetMs"], 1000);
        assert_eq!(value["summary"]["inputs"]["formSubmissions"], 1);
        assert_eq!(value["behavioralSignals"]["completedGoal"], true);
    }

    #[test]
    fn test_analyzer_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SessionAnalyzer>();
    }
}
