//! Session Lens - deterministic analyzer for recorded browsing sessions
//!
//! Lens turns the raw, timestamped event stream captured by an in-page session
//! recorder into evidence a reader (or a language model) can reason about:
//! schema adaptation → normalization and labelling → single-pass
//! classification → aggregation.
//!
//! The output [`SemanticSession`] carries:
//!
//! - a chronological semantic log of `[MM:SS] action: details [FLAGS]` lines
//! - grouped behavioral metrics (clicks, inputs, scrolling, attention, ...)
//! - six behavioral signals (frustrated, confused, exploring, engaged,
//!   mobile, completed goal)
//!
//! ```ignore
//! let session = session_lens::SessionAnalyzer::new().analyze_json(&recording)?;
//! println!("{}", session_lens::render_transcript(&session));
//! ```

pub mod config;
pub mod error;
pub mod schema;
pub mod session;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::{AnalyzerConfig, DeadClickRule, SignalThresholds};
pub use error::AnalyzeError;

// Schema exports
pub use schema::{RawEvent, RawEventAdapter, SCHEMA_VERSION};

// Analysis exports
pub use session::{
    analyze_events, render_context, render_transcript, session_to_semantic_json,
    AnalysisRecord, BehavioralSignals, LogEntry, LogFlag, RecordEncoder, SemanticSession,
    SessionAnalyzer, SessionSummary,
};

/// Library version embedded in analysis records
pub const LENS_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for analysis records
pub const PRODUCER_NAME: &str = "session-lens";
