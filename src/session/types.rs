//! Session analysis data types
//!
//! This module defines the normalized events that flow through the classifier
//! and the [`SemanticSession`] the analyzer hands back to its caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Label used when an element target cannot be resolved
pub const UNKNOWN_TARGET: &str = "unknown element";

/// Label used for events that belong to the page rather than an element
pub const PAGE_TARGET: &str = "page";

/// Semantic category of a normalized event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "click")]
    Click,
    #[serde(rename = "dblclick")]
    DoubleClick,
    #[serde(rename = "rightclick")]
    RightClick,
    #[serde(rename = "scroll")]
    Scroll,
    #[serde(rename = "input")]
    Input,
    #[serde(rename = "submit")]
    Submit,
    #[serde(rename = "hover-start")]
    HoverStart,
    #[serde(rename = "hover-end")]
    HoverEnd,
    #[serde(rename = "touch")]
    Touch,
    #[serde(rename = "swipe")]
    Swipe,
    #[serde(rename = "pinch")]
    Pinch,
    #[serde(rename = "video-play")]
    VideoPlay,
    #[serde(rename = "video-pause")]
    VideoPause,
    #[serde(rename = "select")]
    Select,
    #[serde(rename = "copy")]
    Copy,
    #[serde(rename = "paste")]
    Paste,
    #[serde(rename = "console-error")]
    ConsoleError,
    #[serde(rename = "network-error")]
    NetworkError,
    #[serde(rename = "resize")]
    Resize,
    #[serde(rename = "orientation-change")]
    OrientationChange,
    #[serde(rename = "visibility-change")]
    VisibilityChange,
    /// Page URL changed after the first page view
    #[serde(rename = "navigation")]
    Navigation,
    /// Explicit goal event recorded by the host page
    #[serde(rename = "conversion")]
    Conversion,
    /// DOM changed; answers pending clicks but is never logged
    #[serde(rename = "mutation")]
    Mutation,
    /// Finger movement; counted once per gesture, never logged
    #[serde(rename = "touch-move")]
    TouchMove,
    /// Pointer movement; only feeds idle tracking
    #[serde(rename = "activity")]
    Activity,
}

impl EventKind {
    /// Click-family kinds never count as a response to another click
    pub fn is_click(self) -> bool {
        matches!(
            self,
            EventKind::Click | EventKind::DoubleClick | EventKind::RightClick
        )
    }

    /// Kinds that prove the page reacted, regardless of target
    pub fn is_page_response(self) -> bool {
        matches!(self, EventKind::Mutation | EventKind::Navigation)
    }

    /// Pointer-only kinds that say nothing about whether the page responded
    pub fn is_pointer_only(self) -> bool {
        matches!(
            self,
            EventKind::HoverStart | EventKind::HoverEnd | EventKind::TouchMove | EventKind::Activity
        )
    }

    pub fn is_touch(self) -> bool {
        matches!(
            self,
            EventKind::Touch | EventKind::TouchMove | EventKind::Swipe | EventKind::Pinch
        )
    }

    /// Kinds that represent a deliberate user interaction
    pub fn is_interaction(self) -> bool {
        matches!(
            self,
            EventKind::Click
                | EventKind::DoubleClick
                | EventKind::RightClick
                | EventKind::Scroll
                | EventKind::Input
                | EventKind::Submit
                | EventKind::HoverStart
                | EventKind::Touch
                | EventKind::Swipe
                | EventKind::Pinch
                | EventKind::VideoPlay
                | EventKind::VideoPause
                | EventKind::Select
                | EventKind::Copy
                | EventKind::Paste
        )
    }
}

/// Page visibility state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Hidden,
    Visible,
}

/// Viewport dimensions in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn is_portrait(&self) -> bool {
        self.height > self.width
    }
}

impl fmt::Display for Viewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Category-specific scalar carried by a normalized event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventValue {
    None,
    /// Scroll position in pixels and, when known, depth as a page percentage
    Scroll {
        position: f64,
        depth_pct: Option<u32>,
    },
    /// Character count of an input value (the text itself is never kept)
    Length { chars: usize },
    Text { text: String },
    Visibility { state: Visibility },
    Viewport { viewport: Viewport },
}

/// Canonical form of one raw event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedEvent {
    /// Milliseconds since the earliest event of the session
    pub timestamp: u64,
    pub kind: EventKind,
    pub target_label: String,
    pub value: EventValue,
}

impl NormalizedEvent {
    pub fn new(timestamp: u64, kind: EventKind, target_label: impl Into<String>) -> Self {
        Self {
            timestamp,
            kind,
            target_label: target_label.into(),
            value: EventValue::None,
        }
    }

    pub fn with_value(mut self, value: EventValue) -> Self {
        self.value = value;
        self
    }
}

/// Session-level facts extracted while normalizing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub page_url: Option<String>,
    pub page_title: Option<String>,
    pub viewport: Option<Viewport>,
    /// Wall-clock start, when the recording used absolute epoch timestamps
    pub started_at: Option<DateTime<Utc>>,
    /// Well-formed raw events, including those without semantic meaning
    pub event_count: usize,
    /// Span from the earliest to the latest event (milliseconds)
    pub duration_ms: u64,
}

/// Output of the normalizer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedSession {
    pub events: Vec<NormalizedEvent>,
    pub metadata: SessionMetadata,
}

/// Flag attached to a log line when a pattern rule fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogFlag {
    #[serde(rename = "[RAGE CLICK]")]
    RageClick,
    #[serde(rename = "[NO RESPONSE]")]
    NoResponse,
    #[serde(rename = "[HESITATION]")]
    Hesitation,
    #[serde(rename = "[SCROLL REVERSAL]")]
    ScrollReversal,
    #[serde(rename = "[RAPID SCROLL]")]
    RapidScroll,
    #[serde(rename = "[CLEARED]")]
    Cleared,
    #[serde(rename = "[TAB SWITCH]")]
    TabSwitch,
    #[serde(rename = "[CONSOLE ERROR]")]
    ConsoleError,
    #[serde(rename = "[NETWORK ERROR]")]
    NetworkError,
}

impl LogFlag {
    pub fn as_str(self) -> &'static str {
        match self {
            LogFlag::RageClick => "[RAGE CLICK]",
            LogFlag::NoResponse => "[NO RESPONSE]",
            LogFlag::Hesitation => "[HESITATION]",
            LogFlag::ScrollReversal => "[SCROLL REVERSAL]",
            LogFlag::RapidScroll => "[RAPID SCROLL]",
            LogFlag::Cleared => "[CLEARED]",
            LogFlag::TabSwitch => "[TAB SWITCH]",
            LogFlag::ConsoleError => "[CONSOLE ERROR]",
            LogFlag::NetworkError => "[NETWORK ERROR]",
        }
    }
}

impl fmt::Display for LogFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of the semantic log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// Session-relative time rendered as `[MM:SS]`
    pub timestamp: String,
    /// Session-relative time in milliseconds
    pub offset_ms: u64,
    pub action: String,
    pub details: String,
    #[serde(default)]
    pub flags: Vec<LogFlag>,
}

impl LogEntry {
    pub fn has_flag(&self, flag: LogFlag) -> bool {
        self.flags.contains(&flag)
    }
}

/// Click counters
///
/// `rage_clicks` and `dead_clicks` are each bounded by `total_clicks`, but a
/// click can be both, so their sum may exceed it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickMetrics {
    pub total_clicks: u32,
    pub rage_clicks: u32,
    pub dead_clicks: u32,
    pub double_clicks: u32,
    pub right_clicks: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputMetrics {
    /// Typing streaks, one per contiguous run of input on a field
    pub total_inputs: u32,
    pub form_submissions: u32,
    pub abandoned_inputs: u32,
    pub cleared_inputs: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollMetrics {
    pub total_scrolls: u32,
    /// Deepest point reached, as a percentage of the page
    pub scroll_depth_max: u32,
    pub scroll_reversals: u32,
    pub rapid_scrolls: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttentionMetrics {
    pub total_hovers: u32,
    pub hesitations: u32,
    /// Dwell time accumulated by hesitations (milliseconds)
    pub hover_time: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TouchMetrics {
    /// Taps plus touch-move gestures
    pub touch_events: u32,
    pub swipes: u32,
    pub pinch_zooms: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaMetrics {
    pub video_plays: u32,
    pub video_pauses: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionMetrics {
    pub text_selections: u32,
    pub copy_events: u32,
    pub paste_events: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorMetrics {
    pub console_errors: u32,
    pub network_errors: u32,
}

/// Time budget and page-level activity; durations in milliseconds
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementMetrics {
    pub session_duration: u64,
    pub active_time: u64,
    pub idle_time: u64,
    pub idle_periods: u32,
    pub tab_switches: u32,
    pub navigations: u32,
    pub conversions: u32,
    pub time_to_first_interaction: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewportMetrics {
    pub resizes: u32,
    pub orientation_changes: u32,
}

/// Aggregate behavioral metrics, grouped by category
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub clicks: ClickMetrics,
    pub inputs: InputMetrics,
    pub scrolling: ScrollMetrics,
    pub attention: AttentionMetrics,
    pub touch: TouchMetrics,
    pub media: MediaMetrics,
    pub selection: SelectionMetrics,
    pub errors: ErrorMetrics,
    pub engagement: EngagementMetrics,
    pub viewport: ViewportMetrics,
}

/// Session-level boolean labels derived from the summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehavioralSignals {
    pub is_exploring: bool,
    pub is_frustrated: bool,
    pub is_engaged: bool,
    pub is_confused: bool,
    pub is_mobile: bool,
    pub completed_goal: bool,
}

/// Result of analyzing one recorded session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemanticSession {
    pub page_url: Option<String>,
    pub page_title: Option<String>,
    /// Milliseconds from the first to the last event
    pub total_duration: u64,
    pub event_count: usize,
    pub viewport_size: Option<Viewport>,
    pub started_at: Option<DateTime<Utc>>,
    pub logs: Vec<LogEntry>,
    pub summary: SessionSummary,
    pub behavioral_signals: BehavioralSignals,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind_serialization() {
        assert_eq!(serde_json::to_string(&EventKind::DoubleClick).unwrap(), "\"dblclick\"");
        assert_eq!(serde_json::to_string(&EventKind::HoverStart).unwrap(), "\"hover-start\"");

        let parsed: EventKind = serde_json::from_str("\"visibility-change\"").unwrap();
        assert_eq!(parsed, EventKind::VisibilityChange);
    }

    #[test]
    fn test_log_flag_serializes_as_bracketed_label() {
        let json = serde_json::to_string(&vec![LogFlag::RageClick, LogFlag::NoResponse]).unwrap();
        assert_eq!(json, r#"["[RAGE CLICK]","[NO RESPONSE]"]"#);
        assert_eq!(LogFlag::ConsoleError.to_string(), "[CONSOLE ERROR]");
    }

    #[test]
    fn test_summary_uses_camel_case() {
        let value = serde_json::to_value(SessionSummary::default()).unwrap();
        assert_eq!(value["clicks"]["rageClicks"], 0);
        assert_eq!(value["scrolling"]["scrollDepthMax"], 0);
        assert!(value["engagement"]["timeToFirstInteraction"].is_null());
    }

    #[test]
    fn test_kind_groups() {
        assert!(EventKind::RightClick.is_click());
        assert!(!EventKind::Input.is_click());
        assert!(EventKind::Mutation.is_page_response());
        assert!(EventKind::Pinch.is_touch());
        assert!(EventKind::TouchMove.is_touch());
        assert!(EventKind::TouchMove.is_pointer_only());
        assert!(!EventKind::Activity.is_interaction());
    }

    #[test]
    fn test_viewport_orientation() {
        let phone = Viewport { width: 390, height: 844 };
        assert!(phone.is_portrait());
        assert_eq!(phone.to_string(), "390x844");
    }
}
