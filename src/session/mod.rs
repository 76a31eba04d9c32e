//! Session analysis
//!
//! Turns a recorded browsing session into a semantic log, grouped behavioral
//! metrics and session-level signals.
//!
//! Pipeline: RawEvent JSON → Adapter → Normalizer → Classifier → Aggregator → SemanticSession

pub mod aggregator;
pub mod classifier;
pub mod labels;
pub mod normalizer;
pub mod pipeline;
pub mod record;
pub mod renderer;
pub mod types;

pub use pipeline::{analyze_events, session_to_semantic_json, SessionAnalyzer};
pub use record::{AnalysisRecord, RecordEncoder};
pub use renderer::{format_timestamp, render_context, render_transcript};
pub use types::{
    BehavioralSignals, EventKind, EventValue, LogEntry, LogFlag, NormalizedEvent,
    SemanticSession, SessionSummary, Viewport,
};
