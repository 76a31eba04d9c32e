//! Session-recording raw event schema
//!
//! Recorders emit one JSON object per captured interaction:
//! `{"type": <category>, "timestamp": <ms>, "data": {...}}`. Only `type` and
//! `timestamp` are structural; `data` is kept as an open JSON value because
//! its shape depends on the category and recorders add fields freely.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier for the accepted input format
pub const SCHEMA_VERSION: &str = "session.raw_event.v1";

/// Top-level event category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    DomContentLoaded,
    Load,
    FullSnapshot,
    IncrementalSnapshot,
    Meta,
    Custom,
    Plugin,
}

impl EventType {
    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            0 => Some(EventType::DomContentLoaded),
            1 => Some(EventType::Load),
            2 => Some(EventType::FullSnapshot),
            3 => Some(EventType::IncrementalSnapshot),
            4 => Some(EventType::Meta),
            5 => Some(EventType::Custom),
            6 => Some(EventType::Plugin),
            _ => None,
        }
    }

    pub fn code(self) -> u64 {
        match self {
            EventType::DomContentLoaded => 0,
            EventType::Load => 1,
            EventType::FullSnapshot => 2,
            EventType::IncrementalSnapshot => 3,
            EventType::Meta => 4,
            EventType::Custom => 5,
            EventType::Plugin => 6,
        }
    }
}

/// Source of an incremental snapshot (`data.source`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncrementalSource {
    Mutation,
    MouseMove,
    MouseInteraction,
    Scroll,
    ViewportResize,
    Input,
    TouchMove,
    MediaInteraction,
    StyleSheetRule,
    CanvasMutation,
    Font,
    Log,
    Drag,
    StyleDeclaration,
    Selection,
}

impl IncrementalSource {
    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            0 => Some(IncrementalSource::Mutation),
            1 => Some(IncrementalSource::MouseMove),
            2 => Some(IncrementalSource::MouseInteraction),
            3 => Some(IncrementalSource::Scroll),
            4 => Some(IncrementalSource::ViewportResize),
            5 => Some(IncrementalSource::Input),
            6 => Some(IncrementalSource::TouchMove),
            7 => Some(IncrementalSource::MediaInteraction),
            8 => Some(IncrementalSource::StyleSheetRule),
            9 => Some(IncrementalSource::CanvasMutation),
            10 => Some(IncrementalSource::Font),
            11 => Some(IncrementalSource::Log),
            12 => Some(IncrementalSource::Drag),
            13 => Some(IncrementalSource::StyleDeclaration),
            14 => Some(IncrementalSource::Selection),
            _ => None,
        }
    }

    pub fn code(self) -> u64 {
        match self {
            IncrementalSource::Mutation => 0,
            IncrementalSource::MouseMove => 1,
            IncrementalSource::MouseInteraction => 2,
            IncrementalSource::Scroll => 3,
            IncrementalSource::ViewportResize => 4,
            IncrementalSource::Input => 5,
            IncrementalSource::TouchMove => 6,
            IncrementalSource::MediaInteraction => 7,
            IncrementalSource::StyleSheetRule => 8,
            IncrementalSource::CanvasMutation => 9,
            IncrementalSource::Font => 10,
            IncrementalSource::Log => 11,
            IncrementalSource::Drag => 12,
            IncrementalSource::StyleDeclaration => 13,
            IncrementalSource::Selection => 14,
        }
    }
}

/// Mouse interaction subtype (`data.type` on mouse-interaction events)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseInteraction {
    MouseUp,
    MouseDown,
    Click,
    ContextMenu,
    DblClick,
    Focus,
    Blur,
    TouchStart,
    TouchMoveDeparted,
    TouchEnd,
    TouchCancel,
}

impl MouseInteraction {
    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            0 => Some(MouseInteraction::MouseUp),
            1 => Some(MouseInteraction::MouseDown),
            2 => Some(MouseInteraction::Click),
            3 => Some(MouseInteraction::ContextMenu),
            4 => Some(MouseInteraction::DblClick),
            5 => Some(MouseInteraction::Focus),
            6 => Some(MouseInteraction::Blur),
            7 => Some(MouseInteraction::TouchStart),
            8 => Some(MouseInteraction::TouchMoveDeparted),
            9 => Some(MouseInteraction::TouchEnd),
            10 => Some(MouseInteraction::TouchCancel),
            _ => None,
        }
    }
}

/// Media interaction subtype
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaInteraction {
    Play,
    Pause,
    Seeked,
    VolumeChange,
    RateChange,
}

impl MediaInteraction {
    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            0 => Some(MediaInteraction::Play),
            1 => Some(MediaInteraction::Pause),
            2 => Some(MediaInteraction::Seeked),
            3 => Some(MediaInteraction::VolumeChange),
            4 => Some(MediaInteraction::RateChange),
            _ => None,
        }
    }
}

/// One captured interaction record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    /// Category code (see [`EventType`])
    #[serde(rename = "type")]
    pub event_type: u64,
    /// Milliseconds, either absolute epoch time or relative to recording start
    pub timestamp: f64,
    /// Category-specific payload
    #[serde(default)]
    pub data: Value,
}

impl RawEvent {
    /// Create an event of a known category
    pub fn new(event_type: EventType, timestamp: f64, data: Value) -> Self {
        RawEvent {
            event_type: event_type.code(),
            timestamp,
            data,
        }
    }

    /// Create an incremental-snapshot event; `source` is merged into `data`
    pub fn incremental(timestamp: f64, source: IncrementalSource, mut data: Value) -> Self {
        if let Value::Object(map) = &mut data {
            map.insert("source".to_string(), Value::from(source.code()));
        } else {
            data = serde_json::json!({ "source": source.code() });
        }
        RawEvent::new(EventType::IncrementalSnapshot, timestamp, data)
    }

    /// Create a custom event carrying a tag and payload
    pub fn custom(timestamp: f64, tag: &str, payload: Value) -> Self {
        RawEvent::new(
            EventType::Custom,
            timestamp,
            serde_json::json!({ "tag": tag, "payload": payload }),
        )
    }

    /// Category, if the code is one the analyzer understands
    pub fn kind(&self) -> Option<EventType> {
        EventType::from_code(self.event_type)
    }

    /// Incremental source, when this is an incremental snapshot
    pub fn source(&self) -> Option<IncrementalSource> {
        if self.kind() != Some(EventType::IncrementalSnapshot) {
            return None;
        }
        self.data
            .get("source")
            .and_then(Value::as_u64)
            .and_then(IncrementalSource::from_code)
    }

    /// Whether the timestamp can be placed on the session timeline
    pub fn has_valid_timestamp(&self) -> bool {
        self.timestamp.is_finite() && self.timestamp >= 0.0
    }

    /// Validate the event against the accepted schema
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.has_valid_timestamp() {
            return Err(ValidationError::InvalidTimestamp(self.timestamp));
        }

        match self.kind() {
            None => Err(ValidationError::UnknownEventType(self.event_type)),
            Some(EventType::IncrementalSnapshot) => {
                match self.data.get("source").and_then(Value::as_u64) {
                    None => Err(ValidationError::MissingSource),
                    Some(code) if IncrementalSource::from_code(code).is_none() => {
                        Err(ValidationError::UnknownSource(code))
                    }
                    Some(_) => Ok(()),
                }
            }
            Some(EventType::Custom) => {
                if self.data.get("tag").and_then(Value::as_str).is_some() {
                    Ok(())
                } else {
                    Err(ValidationError::MissingTag)
                }
            }
            Some(_) => Ok(()),
        }
    }
}

/// Validation errors for raw events
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(f64),

    #[error("Unknown event type: {0}")]
    UnknownEventType(u64),

    #[error("Incremental snapshot without a source")]
    MissingSource,

    #[error("Unknown incremental source: {0}")]
    UnknownSource(u64),

    #[error("Custom event without a tag")]
    MissingTag,
}
