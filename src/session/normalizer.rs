//! Event normalization
//!
//! Turns raw recorder events into time-ordered [`NormalizedEvent`]s with
//! session-relative timestamps and resolved target labels, and extracts the
//! session metadata (URL, title, viewport, start time) along the way.

use crate::config::AnalyzerConfig;
use crate::schema::{EventType, IncrementalSource, MediaInteraction, MouseInteraction, RawEvent};
use crate::session::labels::{collapse_whitespace, truncate_label, NodeRegistry};
use crate::session::types::{
    EventKind, EventValue, NormalizedEvent, NormalizedSession, SessionMetadata, Viewport,
    Visibility, PAGE_TARGET,
};
use chrono::{TimeZone, Utc};
use serde_json::Value;
use tracing::debug;

/// Timestamps at or above this are treated as absolute epoch milliseconds (2000-01-01)
const EPOCH_FLOOR_MS: f64 = 946_684_800_000.0;

/// Maximum characters kept from an error message
const ERROR_MESSAGE_MAX_CHARS: usize = 120;

/// Normalizer for recorded session events
pub struct EventNormalizer;

impl EventNormalizer {
    /// Normalize a batch of raw events
    ///
    /// Events without a usable timestamp are dropped; the rest are stably
    /// sorted so events sharing a timestamp keep their input order.
    pub fn normalize(events: &[RawEvent], config: &AnalyzerConfig) -> NormalizedSession {
        let mut ordered: Vec<&RawEvent> =
            events.iter().filter(|e| e.has_valid_timestamp()).collect();
        if ordered.len() < events.len() {
            debug!(
                dropped = events.len() - ordered.len(),
                "dropping events without a valid timestamp"
            );
        }
        ordered.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));

        let (Some(first), Some(last)) = (ordered.first(), ordered.last()) else {
            return NormalizedSession::default();
        };
        let base = first.timestamp;

        let mut state = NormalizerState {
            config,
            registry: NodeRegistry::new(),
            metadata: SessionMetadata {
                event_count: ordered.len(),
                duration_ms: offset_ms(last.timestamp, base),
                started_at: start_time(base),
                ..Default::default()
            },
            current_url: None,
        };

        let mut normalized = Vec::with_capacity(ordered.len());
        for raw in ordered {
            let timestamp = offset_ms(raw.timestamp, base);
            if let Some(event) = state.normalize_event(raw, timestamp) {
                normalized.push(event);
            }
        }

        if state.metadata.page_title.is_none() {
            state.metadata.page_title = state.registry.page_title().map(str::to_string);
        }

        NormalizedSession {
            events: normalized,
            metadata: state.metadata,
        }
    }
}

/// Milliseconds from `base`, rounded to the nearest millisecond
fn offset_ms(timestamp: f64, base: f64) -> u64 {
    (timestamp - base).max(0.0).round() as u64
}

fn start_time(base: f64) -> Option<chrono::DateTime<Utc>> {
    if base < EPOCH_FLOOR_MS {
        return None;
    }
    Utc.timestamp_millis_opt(base.round() as i64).single()
}

struct NormalizerState<'a> {
    config: &'a AnalyzerConfig,
    registry: NodeRegistry,
    metadata: SessionMetadata,
    current_url: Option<String>,
}

impl NormalizerState<'_> {
    fn normalize_event(&mut self, raw: &RawEvent, timestamp: u64) -> Option<NormalizedEvent> {
        let Some(kind) = raw.kind() else {
            debug!(event_type = raw.event_type, "skipping unknown event type");
            return None;
        };

        match kind {
            EventType::DomContentLoaded | EventType::Load => {
                Some(NormalizedEvent::new(timestamp, EventKind::Activity, PAGE_TARGET))
            }
            EventType::FullSnapshot => {
                self.registry.load_snapshot(&raw.data);
                None
            }
            EventType::Meta => self.meta(&raw.data, timestamp),
            EventType::IncrementalSnapshot => self.incremental(raw, timestamp),
            EventType::Custom => self.custom(&raw.data, timestamp),
            EventType::Plugin => self.plugin(&raw.data, timestamp),
        }
    }

    fn label(&self, data: &Value) -> String {
        self.registry.resolve(data, self.config.label_max_chars)
    }

    fn meta(&mut self, data: &Value, timestamp: u64) -> Option<NormalizedEvent> {
        if let Some(viewport) = viewport_of(data) {
            self.metadata.viewport = Some(viewport);
        }

        let href = data.get("href").and_then(Value::as_str)?;
        self.visit(href, timestamp)
    }

    /// Record a page view; a URL different from the current one is a navigation
    fn visit(&mut self, href: &str, timestamp: u64) -> Option<NormalizedEvent> {
        if self.metadata.page_url.is_none() {
            self.metadata.page_url = Some(href.to_string());
        }
        match self.current_url.replace(href.to_string()) {
            Some(previous) if previous != href => Some(
                NormalizedEvent::new(timestamp, EventKind::Navigation, PAGE_TARGET)
                    .with_value(text(href)),
            ),
            _ => None,
        }
    }

    fn incremental(&mut self, raw: &RawEvent, timestamp: u64) -> Option<NormalizedEvent> {
        let data = &raw.data;
        let Some(source) = raw.source() else {
            debug!(source = ?data.get("source"), "skipping incremental event with unknown source");
            return None;
        };

        match source {
            IncrementalSource::Mutation => {
                self.registry.apply_mutation(data);
                let changed = ["adds", "removes", "texts", "attributes"].iter().any(|key| {
                    data.get(*key)
                        .and_then(Value::as_array)
                        .is_some_and(|items| !items.is_empty())
                });
                changed.then(|| NormalizedEvent::new(timestamp, EventKind::Mutation, PAGE_TARGET))
            }
            IncrementalSource::MouseMove => {
                Some(NormalizedEvent::new(timestamp, EventKind::Activity, PAGE_TARGET))
            }
            IncrementalSource::TouchMove => {
                Some(NormalizedEvent::new(timestamp, EventKind::TouchMove, PAGE_TARGET))
            }
            IncrementalSource::MouseInteraction => {
                let kind = match data
                    .get("type")
                    .and_then(Value::as_u64)
                    .and_then(MouseInteraction::from_code)?
                {
                    MouseInteraction::Click => EventKind::Click,
                    MouseInteraction::ContextMenu => EventKind::RightClick,
                    MouseInteraction::DblClick => EventKind::DoubleClick,
                    MouseInteraction::TouchStart => EventKind::Touch,
                    _ => return None,
                };
                Some(NormalizedEvent::new(timestamp, kind, self.label(data)))
            }
            IncrementalSource::Scroll => Some(
                NormalizedEvent::new(timestamp, EventKind::Scroll, self.label(data))
                    .with_value(self.scroll_value(data)),
            ),
            IncrementalSource::ViewportResize => {
                let viewport = viewport_of(data)?;
                Some(self.resize(viewport, timestamp))
            }
            IncrementalSource::Input => {
                let Some(value) = data.get("text").and_then(Value::as_str) else {
                    debug!("skipping input event without text");
                    return None;
                };
                Some(
                    NormalizedEvent::new(timestamp, EventKind::Input, self.label(data))
                        .with_value(EventValue::Length {
                            chars: value.chars().count(),
                        }),
                )
            }
            IncrementalSource::MediaInteraction => {
                let kind = match data
                    .get("type")
                    .and_then(Value::as_u64)
                    .and_then(MediaInteraction::from_code)?
                {
                    MediaInteraction::Play => EventKind::VideoPlay,
                    MediaInteraction::Pause => EventKind::VideoPause,
                    _ => return None,
                };
                Some(NormalizedEvent::new(timestamp, kind, self.label(data)))
            }
            IncrementalSource::Log => {
                let level = data.get("level").and_then(Value::as_str)?;
                if !matches!(level, "error" | "assert") {
                    return None;
                }
                Some(
                    NormalizedEvent::new(timestamp, EventKind::ConsoleError, PAGE_TARGET)
                        .with_value(error_text(&console_message(data))),
                )
            }
            IncrementalSource::Selection => {
                let first = data
                    .get("ranges")
                    .and_then(Value::as_array)
                    .and_then(|ranges| ranges.first())?;
                let label = first
                    .get("start")
                    .and_then(Value::as_u64)
                    .and_then(|id| self.registry.label_for_node(id, self.config.label_max_chars))
                    .unwrap_or_else(|| self.label(data));
                Some(NormalizedEvent::new(timestamp, EventKind::Select, label))
            }
            _ => None,
        }
    }

    /// Scroll position plus depth, when the page height is known
    fn scroll_value(&self, data: &Value) -> EventValue {
        let position = data
            .get("y")
            .or_else(|| data.get("position"))
            .and_then(Value::as_f64)
            .unwrap_or(0.0);

        let depth_pct = match data.get("depth").and_then(Value::as_f64) {
            Some(depth) => Some(depth),
            None => {
                let height = data.get("scrollHeight").and_then(Value::as_f64);
                let viewport = self.metadata.viewport.map(|v| v.height as f64);
                match (height, viewport) {
                    (Some(height), Some(viewport)) if height > 0.0 => {
                        Some((position + viewport) / height * 100.0)
                    }
                    _ => None,
                }
            }
        };

        EventValue::Scroll {
            position,
            depth_pct: depth_pct
                .filter(|d| d.is_finite())
                .map(|d| d.clamp(0.0, 100.0).round() as u32),
        }
    }

    /// Viewport change; a flip between portrait and landscape is an orientation change
    fn resize(&mut self, viewport: Viewport, timestamp: u64) -> NormalizedEvent {
        let previous = self.metadata.viewport.replace(viewport);
        let kind = match previous {
            Some(prev) if prev.is_portrait() != viewport.is_portrait() => {
                EventKind::OrientationChange
            }
            _ => EventKind::Resize,
        };
        NormalizedEvent::new(timestamp, kind, PAGE_TARGET)
            .with_value(EventValue::Viewport { viewport })
    }

    fn custom(&mut self, data: &Value, timestamp: u64) -> Option<NormalizedEvent> {
        let Some(tag) = data.get("tag").and_then(Value::as_str) else {
            debug!("skipping custom event without a tag");
            return None;
        };
        let tag = tag.trim().to_lowercase().replace(['-', ' '], "_");
        let payload = data.get("payload").unwrap_or(&Value::Null);

        // Element events name their target in the payload or on the event itself
        let target = || {
            if payload.get("target").is_some() || payload.get("id").is_some() {
                self.label(payload)
            } else {
                self.label(data)
            }
        };

        let event = match tag.as_str() {
            "click" => NormalizedEvent::new(timestamp, EventKind::Click, target()),
            "dblclick" | "double_click" => {
                NormalizedEvent::new(timestamp, EventKind::DoubleClick, target())
            }
            "rightclick" | "right_click" | "contextmenu" | "context_menu" => {
                NormalizedEvent::new(timestamp, EventKind::RightClick, target())
            }
            "hover_start" | "hover" | "mouseenter" | "mouseover" => {
                NormalizedEvent::new(timestamp, EventKind::HoverStart, target())
            }
            "hover_end" | "mouseleave" | "mouseout" => {
                NormalizedEvent::new(timestamp, EventKind::HoverEnd, target())
            }
            "submit" | "form_submit" => NormalizedEvent::new(timestamp, EventKind::Submit, target()),
            "input" => {
                let chars = payload
                    .get("length")
                    .and_then(Value::as_u64)
                    .map(|n| n as usize)
                    .or_else(|| {
                        payload
                            .get("value")
                            .and_then(Value::as_str)
                            .map(|v| v.chars().count())
                    })?;
                NormalizedEvent::new(timestamp, EventKind::Input, target())
                    .with_value(EventValue::Length { chars })
            }
            "scroll" => NormalizedEvent::new(timestamp, EventKind::Scroll, target())
                .with_value(self.scroll_value(payload)),
            "touch" | "tap" => NormalizedEvent::new(timestamp, EventKind::Touch, target()),
            "swipe" => {
                let direction = payload.get("direction").and_then(Value::as_str);
                let event = NormalizedEvent::new(timestamp, EventKind::Swipe, target());
                match direction {
                    Some(direction) => event.with_value(text(direction)),
                    None => event,
                }
            }
            "pinch" | "pinch_zoom" | "zoom" => {
                NormalizedEvent::new(timestamp, EventKind::Pinch, target())
            }
            "video_play" | "play" => NormalizedEvent::new(timestamp, EventKind::VideoPlay, target()),
            "video_pause" | "pause" => {
                NormalizedEvent::new(timestamp, EventKind::VideoPause, target())
            }
            "select" | "selection" | "text_select" => {
                NormalizedEvent::new(timestamp, EventKind::Select, target())
            }
            "copy" => NormalizedEvent::new(timestamp, EventKind::Copy, target()),
            "paste" => NormalizedEvent::new(timestamp, EventKind::Paste, target()),
            "console_error" | "error" => {
                let message = payload
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| console_message(payload));
                NormalizedEvent::new(timestamp, EventKind::ConsoleError, PAGE_TARGET)
                    .with_value(error_text(&message))
            }
            "network_error" | "request_failed" => {
                NormalizedEvent::new(timestamp, EventKind::NetworkError, PAGE_TARGET)
                    .with_value(error_text(&describe_request(payload)))
            }
            "visibility_change" | "visibilitychange" => {
                let hidden = match payload.get("state").and_then(Value::as_str) {
                    Some(state) => state == "hidden",
                    None => payload.get("hidden").and_then(Value::as_bool)?,
                };
                let state = if hidden {
                    Visibility::Hidden
                } else {
                    Visibility::Visible
                };
                NormalizedEvent::new(timestamp, EventKind::VisibilityChange, PAGE_TARGET)
                    .with_value(EventValue::Visibility { state })
            }
            "orientation_change" | "orientationchange" => {
                let event = NormalizedEvent::new(timestamp, EventKind::OrientationChange, PAGE_TARGET);
                match viewport_of(payload) {
                    Some(viewport) => {
                        self.metadata.viewport = Some(viewport);
                        event.with_value(EventValue::Viewport { viewport })
                    }
                    None => event,
                }
            }
            "resize" => {
                let viewport = viewport_of(payload)?;
                self.resize(viewport, timestamp)
            }
            "conversion" | "goal" | "purchase" | "signup" => {
                let name = payload
                    .get("name")
                    .or_else(|| payload.get("goal"))
                    .and_then(Value::as_str)
                    .unwrap_or(tag.as_str());
                NormalizedEvent::new(timestamp, EventKind::Conversion, PAGE_TARGET)
                    .with_value(text(name))
            }
            "mutation" | "dom_change" => {
                NormalizedEvent::new(timestamp, EventKind::Mutation, PAGE_TARGET)
            }
            "navigation" | "page_view" | "pageview" => {
                let href = payload
                    .get("url")
                    .or_else(|| payload.get("href"))
                    .and_then(Value::as_str)?;
                if tag == "navigation" && self.current_url.is_some() {
                    self.current_url = Some(href.to_string());
                    NormalizedEvent::new(timestamp, EventKind::Navigation, PAGE_TARGET)
                        .with_value(text(href))
                } else {
                    return self.visit(href, timestamp);
                }
            }
            other => {
                debug!(tag = other, "skipping unrecognized custom event");
                return None;
            }
        };
        Some(event)
    }

    fn plugin(&self, data: &Value, timestamp: u64) -> Option<NormalizedEvent> {
        let plugin = data.get("plugin").and_then(Value::as_str)?;
        let payload = data.get("payload").unwrap_or(&Value::Null);

        if plugin.contains("console") {
            let level = payload.get("level").and_then(Value::as_str)?;
            if !matches!(level, "error" | "assert") {
                return None;
            }
            return Some(
                NormalizedEvent::new(timestamp, EventKind::ConsoleError, PAGE_TARGET)
                    .with_value(error_text(&console_message(payload))),
            );
        }

        if plugin.contains("network") {
            let failed: Vec<&Value> = match payload.get("requests").and_then(Value::as_array) {
                Some(requests) => requests.iter().filter(|r| request_failed(r)).collect(),
                None if request_failed(payload) => vec![payload],
                None => Vec::new(),
            };
            let first = failed.first()?;
            let mut message = describe_request(first);
            if failed.len() > 1 {
                message.push_str(&format!(" (+{} more)", failed.len() - 1));
            }
            return Some(
                NormalizedEvent::new(timestamp, EventKind::NetworkError, PAGE_TARGET)
                    .with_value(error_text(&message)),
            );
        }

        debug!(plugin, "skipping unrecognized plugin event");
        None
    }
}

fn text(s: &str) -> EventValue {
    EventValue::Text {
        text: collapse_whitespace(s),
    }
}

fn error_text(message: &str) -> EventValue {
    EventValue::Text {
        text: truncate_label(&collapse_whitespace(message), ERROR_MESSAGE_MAX_CHARS),
    }
}

fn viewport_of(data: &Value) -> Option<Viewport> {
    let width = data.get("width").and_then(Value::as_u64)?;
    let height = data.get("height").and_then(Value::as_u64)?;
    Some(Viewport {
        width: u32::try_from(width).ok()?,
        height: u32::try_from(height).ok()?,
    })
}

/// Join a console payload (`payload: [..]`) into one message
fn console_message(data: &Value) -> String {
    match data.get("payload") {
        Some(Value::Array(parts)) => parts
            .iter()
            .map(|part| match part {
                // Recorders stringify arguments, often with surrounding quotes
                Value::String(s) => s.trim_matches('"').to_string(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(" "),
        Some(Value::String(s)) => s.clone(),
        _ => "console error".to_string(),
    }
}

fn request_failed(request: &Value) -> bool {
    if request.get("error").is_some_and(|e| !e.is_null()) {
        return true;
    }
    match request.get("status").and_then(Value::as_u64) {
        Some(status) => status == 0 || status >= 400,
        None => request.get("failed").and_then(Value::as_bool).unwrap_or(false),
    }
}

/// `METHOD url status` for a failed request
fn describe_request(request: &Value) -> String {
    let method = request
        .get("method")
        .and_then(Value::as_str)
        .unwrap_or("GET")
        .to_uppercase();
    let url = request
        .get("url")
        .or_else(|| request.get("name"))
        .and_then(Value::as_str)
        .unwrap_or("request");
    match request.get("status").and_then(Value::as_u64) {
        Some(status) if status > 0 => format!("{} {} {}", method, url, status),
        _ => format!("{} {} failed", method, url),
    }
}
