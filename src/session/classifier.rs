//! Stateful interaction classifier
//!
//! A single forward pass over normalized events. The [`Classifier`] owns all
//! scratch state (click windows, the open hover, scroll direction, typing
//! streaks) and is driven with `Iterator::fold`:
//!
//! ```ignore
//! let output = events
//!     .iter()
//!     .fold(Classifier::new(&config), |mut c, e| {
//!         c.observe(e);
//!         c
//!     })
//!     .finish(duration_ms);
//! ```
//!
//! Every window is bounded by a time threshold from [`AnalyzerConfig`], so
//! memory stays proportional to the busiest second of the session.

use crate::config::{AnalyzerConfig, DeadClickRule};
use crate::session::renderer::format_timestamp;
use crate::session::types::{
    EventKind, EventValue, LogEntry, LogFlag, NormalizedEvent, SessionSummary, Visibility,
    PAGE_TARGET, UNKNOWN_TARGET,
};
use std::collections::{BTreeSet, HashMap, VecDeque};
use tracing::trace;

/// Touch movement after this long without touch starts a new gesture
const TOUCH_GESTURE_GAP_MS: u64 = 500;

/// Logs and counters produced by one pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassifierOutput {
    pub logs: Vec<LogEntry>,
    pub summary: SessionSummary,
}

/// A click still waiting for evidence that the page reacted
#[derive(Debug, Clone)]
struct PendingClick {
    timestamp: u64,
    label: String,
    log_index: usize,
}

#[derive(Debug, Clone)]
struct HoverState {
    label: String,
    start: u64,
    clicked: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScrollDirection {
    Up,
    Down,
}

impl ScrollDirection {
    fn as_str(self) -> &'static str {
        match self {
            ScrollDirection::Up => "up",
            ScrollDirection::Down => "down",
        }
    }
}

#[derive(Debug, Default)]
struct ScrollTracker {
    last_position: Option<f64>,
    /// Committed direction; only changes after travelling the reversal delta
    direction: Option<ScrollDirection>,
    /// Furthest point reached in the committed direction
    extreme: f64,
    burst_direction: Option<ScrollDirection>,
    burst: VecDeque<u64>,
    last_milestone: u32,
}

impl ScrollTracker {
    /// Update the committed direction; returns true when it flipped
    fn track_direction(&mut self, position: f64, delta: f64) -> bool {
        match self.direction {
            None => {
                if position - self.extreme >= delta {
                    self.direction = Some(ScrollDirection::Down);
                    self.extreme = position;
                } else if self.extreme - position >= delta {
                    self.direction = Some(ScrollDirection::Up);
                    self.extreme = position;
                }
                false
            }
            Some(ScrollDirection::Down) => {
                if position > self.extreme {
                    self.extreme = position;
                    false
                } else if self.extreme - position >= delta {
                    self.direction = Some(ScrollDirection::Up);
                    self.extreme = position;
                    true
                } else {
                    false
                }
            }
            Some(ScrollDirection::Up) => {
                if position < self.extreme {
                    self.extreme = position;
                    false
                } else if position - self.extreme >= delta {
                    self.direction = Some(ScrollDirection::Down);
                    self.extreme = position;
                    true
                } else {
                    false
                }
            }
        }
    }
}

/// Typing streak whose log line is still open for in-place updates
#[derive(Debug, Clone)]
struct InputStreak {
    label: String,
    log_index: usize,
}

/// Accumulator for one classification pass
pub struct Classifier<'a> {
    config: &'a AnalyzerConfig,
    logs: Vec<LogEntry>,
    summary: SessionSummary,
    last_activity: Option<u64>,
    last_touch: Option<u64>,
    click_window: VecDeque<(u64, String)>,
    pending_clicks: VecDeque<PendingClick>,
    hover: Option<HoverState>,
    /// One tracker per scroll container; positions are only comparable within one
    scrolls: HashMap<String, ScrollTracker>,
    input: Option<InputStreak>,
    field_lengths: HashMap<String, usize>,
    dirty_fields: BTreeSet<String>,
}

impl<'a> Classifier<'a> {
    pub fn new(config: &'a AnalyzerConfig) -> Self {
        Self {
            config,
            logs: Vec::new(),
            summary: SessionSummary::default(),
            last_activity: None,
            last_touch: None,
            click_window: VecDeque::new(),
            pending_clicks: VecDeque::new(),
            hover: None,
            scrolls: HashMap::new(),
            input: None,
            field_lengths: HashMap::new(),
            dirty_fields: BTreeSet::new(),
        }
    }

    /// Feed the next event; events must arrive in timestamp order
    pub fn observe(&mut self, event: &NormalizedEvent) {
        self.track_idle(event);
        self.settle_pending_clicks(event);

        if event.kind.is_interaction() && self.summary.engagement.time_to_first_interaction.is_none()
        {
            self.summary.engagement.time_to_first_interaction = Some(event.timestamp);
        }

        let label = event.target_label.as_str();
        match event.kind {
            EventKind::Click => self.click(event),
            EventKind::DoubleClick => {
                self.summary.clicks.double_clicks += 1;
                self.touch_hover(label, event.timestamp);
                self.push_log(event.timestamp, "dblclick", format!("Double-clicked {}", label), Vec::new());
            }
            EventKind::RightClick => {
                self.summary.clicks.right_clicks += 1;
                self.touch_hover(label, event.timestamp);
                self.push_log(event.timestamp, "rightclick", format!("Right-clicked {}", label), Vec::new());
            }
            EventKind::HoverStart => self.hover_start(event),
            EventKind::HoverEnd => {
                let matches = self
                    .hover
                    .as_ref()
                    .is_some_and(|h| h.label == label || label == UNKNOWN_TARGET);
                if matches {
                    self.close_hover(event.timestamp);
                }
            }
            EventKind::Scroll => self.scroll(event),
            EventKind::Input => self.input(event),
            EventKind::Submit => {
                self.summary.inputs.form_submissions += 1;
                self.dirty_fields.clear();
                self.input = None;
                self.push_log(event.timestamp, "submit", format!("Submitted {}", label), Vec::new());
            }
            EventKind::Touch => {
                self.summary.touch.touch_events += 1;
                self.last_touch = Some(event.timestamp);
                self.push_log(event.timestamp, "touch", format!("Tapped {}", label), Vec::new());
            }
            EventKind::Swipe => {
                self.summary.touch.swipes += 1;
                let details = match value_text(&event.value) {
                    Some(direction) => format!("Swiped {} on {}", direction, label),
                    None => format!("Swiped on {}", label),
                };
                self.push_log(event.timestamp, "swipe", details, Vec::new());
            }
            EventKind::Pinch => {
                self.summary.touch.pinch_zooms += 1;
                self.push_log(event.timestamp, "pinch", format!("Pinch-zoomed {}", label), Vec::new());
            }
            EventKind::VideoPlay => {
                self.summary.media.video_plays += 1;
                self.push_log(event.timestamp, "video-play", format!("Played {}", label), Vec::new());
            }
            EventKind::VideoPause => {
                self.summary.media.video_pauses += 1;
                self.push_log(event.timestamp, "video-pause", format!("Paused {}", label), Vec::new());
            }
            EventKind::Select => {
                self.summary.selection.text_selections += 1;
                self.push_log(event.timestamp, "select", format!("Selected text in {}", label), Vec::new());
            }
            EventKind::Copy => {
                self.summary.selection.copy_events += 1;
                self.push_log(event.timestamp, "copy", format!("Copied text from {}", label), Vec::new());
            }
            EventKind::Paste => {
                self.summary.selection.paste_events += 1;
                self.push_log(event.timestamp, "paste", format!("Pasted into {}", label), Vec::new());
            }
            EventKind::ConsoleError => {
                self.summary.errors.console_errors += 1;
                let message = value_text(&event.value).unwrap_or("console error");
                self.push_log(
                    event.timestamp,
                    "console-error",
                    message.to_string(),
                    vec![LogFlag::ConsoleError],
                );
            }
            EventKind::NetworkError => {
                self.summary.errors.network_errors += 1;
                let message = value_text(&event.value).unwrap_or("request failed");
                self.push_log(
                    event.timestamp,
                    "network-error",
                    message.to_string(),
                    vec![LogFlag::NetworkError],
                );
            }
            EventKind::Resize => {
                self.summary.viewport.resizes += 1;
                let details = match &event.value {
                    EventValue::Viewport { viewport } => format!("Resized viewport to {}", viewport),
                    _ => "Resized viewport".to_string(),
                };
                self.push_log(event.timestamp, "resize", details, Vec::new());
            }
            EventKind::OrientationChange => {
                self.summary.viewport.orientation_changes += 1;
                let details = match &event.value {
                    EventValue::Viewport { viewport } => format!(
                        "Rotated to {} ({})",
                        if viewport.is_portrait() { "portrait" } else { "landscape" },
                        viewport
                    ),
                    _ => "Rotated device".to_string(),
                };
                self.push_log(event.timestamp, "orientation-change", details, Vec::new());
            }
            EventKind::VisibilityChange => match event.value {
                EventValue::Visibility {
                    state: Visibility::Hidden,
                } => {
                    self.summary.engagement.tab_switches += 1;
                    self.push_log(
                        event.timestamp,
                        "tab-switch",
                        "Left the page for another tab".to_string(),
                        vec![LogFlag::TabSwitch],
                    );
                }
                _ => {
                    self.push_log(
                        event.timestamp,
                        "tab-return",
                        "Returned to the page".to_string(),
                        Vec::new(),
                    );
                }
            },
            EventKind::Navigation => {
                self.summary.engagement.navigations += 1;
                self.abandon_dirty_fields();
                if self.hover.is_some() {
                    self.close_hover(event.timestamp);
                }
                self.scrolls.clear();
                let details = match value_text(&event.value) {
                    Some(url) => format!("Navigated to {}", url),
                    None => "Navigated to another page".to_string(),
                };
                self.push_log(event.timestamp, "navigate", details, Vec::new());
            }
            EventKind::Conversion => {
                self.summary.engagement.conversions += 1;
                let details = match value_text(&event.value) {
                    Some(goal) => format!("Completed goal \"{}\"", goal),
                    None => "Completed goal".to_string(),
                };
                self.push_log(event.timestamp, "conversion", details, Vec::new());
            }
            EventKind::TouchMove => {
                let new_gesture = self
                    .last_touch
                    .map_or(true, |last| event.timestamp.saturating_sub(last) > TOUCH_GESTURE_GAP_MS);
                if new_gesture {
                    self.summary.touch.touch_events += 1;
                }
                self.last_touch = Some(event.timestamp);
            }
            EventKind::Mutation | EventKind::Activity => {}
        }
    }

    /// Close every open window at the end of the stream
    pub fn finish(mut self, end_ts: u64) -> ClassifierOutput {
        while let Some(click) = self.pending_clicks.pop_front() {
            self.mark_dead(click);
        }
        if self.hover.is_some() {
            self.close_hover(end_ts);
        }
        self.abandon_dirty_fields();

        ClassifierOutput {
            logs: self.logs,
            summary: self.summary,
        }
    }

    fn push_log(&mut self, offset_ms: u64, action: &str, details: String, flags: Vec<LogFlag>) -> usize {
        self.logs.push(LogEntry {
            timestamp: format_timestamp(offset_ms),
            offset_ms,
            action: action.to_string(),
            details,
            flags,
        });
        self.logs.len() - 1
    }

    fn flag(&mut self, log_index: usize, flag: LogFlag) {
        if let Some(entry) = self.logs.get_mut(log_index) {
            if !entry.flags.contains(&flag) {
                entry.flags.push(flag);
            }
        }
    }

    fn track_idle(&mut self, event: &NormalizedEvent) {
        // DOM changes happen without the user; they never end an idle stretch
        if event.kind == EventKind::Mutation {
            return;
        }
        if let Some(last) = self.last_activity {
            let gap = event.timestamp.saturating_sub(last);
            if gap >= self.config.idle_gap_ms {
                self.summary.engagement.idle_time += gap;
                self.summary.engagement.idle_periods += 1;
                trace!(at = event.timestamp, gap, "idle period");
            }
        }
        self.last_activity = Some(event.timestamp);
    }

    /// Decide every pending click that this event times out or answers
    fn settle_pending_clicks(&mut self, event: &NormalizedEvent) {
        if self.pending_clicks.is_empty() {
            return;
        }
        let timeout = self.config.dead_click_timeout_ms;
        let pending = std::mem::take(&mut self.pending_clicks);
        for click in pending {
            if event.timestamp > click.timestamp.saturating_add(timeout) {
                self.mark_dead(click);
            } else if !self.answers(&click, event) {
                self.pending_clicks.push_back(click);
            }
        }
    }

    fn answers(&self, click: &PendingClick, event: &NormalizedEvent) -> bool {
        if event.kind.is_page_response() {
            return true;
        }
        if event.kind.is_click() || event.kind.is_pointer_only() {
            return false;
        }
        match self.config.dead_click_rule {
            DeadClickRule::SameTarget => event.target_label == click.label,
            DeadClickRule::AnyEvent => true,
        }
    }

    fn mark_dead(&mut self, click: PendingClick) {
        self.summary.clicks.dead_clicks += 1;
        self.flag(click.log_index, LogFlag::NoResponse);
        trace!(at = click.timestamp, label = %click.label, "dead click");
    }

    fn click(&mut self, event: &NormalizedEvent) {
        let ts = event.timestamp;
        let label = event.target_label.clone();

        self.touch_hover(&label, ts);
        self.summary.clicks.total_clicks += 1;
        let log_index = self.push_log(ts, "click", format!("Clicked {}", label), Vec::new());

        let window = self.config.rage_click_window_ms;
        while self
            .click_window
            .front()
            .is_some_and(|(t, _)| ts.saturating_sub(*t) > window)
        {
            self.click_window.pop_front();
        }
        self.click_window.push_back((ts, label.clone()));

        let same_target = self.click_window.iter().filter(|(_, l)| *l == label).count();
        if same_target >= self.config.rage_click_min_clicks {
            self.summary.clicks.rage_clicks += 1;
            self.flag(log_index, LogFlag::RageClick);
            self.click_window.retain(|(_, l)| *l != label);
            trace!(at = ts, label = %label, clicks = same_target, "rage click");
        }

        self.pending_clicks.push_back(PendingClick {
            timestamp: ts,
            label,
            log_index,
        });
    }

    /// A click on the hovered element marks it clicked; elsewhere ends the hover
    fn touch_hover(&mut self, label: &str, ts: u64) {
        let same = match &mut self.hover {
            Some(hover) if hover.label == label => {
                hover.clicked = true;
                true
            }
            Some(_) => false,
            None => return,
        };
        if !same {
            self.close_hover(ts);
        }
    }

    fn hover_start(&mut self, event: &NormalizedEvent) {
        self.summary.attention.total_hovers += 1;
        if let Some(hover) = &self.hover {
            if hover.label == event.target_label {
                return;
            }
            self.close_hover(event.timestamp);
        }
        self.hover = Some(HoverState {
            label: event.target_label.clone(),
            start: event.timestamp,
            clicked: false,
        });
    }

    fn close_hover(&mut self, ts: u64) {
        let Some(hover) = self.hover.take() else {
            return;
        };
        let dwell = ts.saturating_sub(hover.start);
        if hover.clicked || dwell <= self.config.hesitation_min_dwell_ms {
            return;
        }

        self.summary.attention.hesitations += 1;
        self.summary.attention.hover_time += dwell;
        trace!(at = ts, label = %hover.label, dwell, "hesitation");
        self.push_log(
            ts,
            "hesitation",
            format!(
                "Hovered over {} for {:.1}s without clicking",
                hover.label,
                dwell as f64 / 1000.0
            ),
            vec![LogFlag::Hesitation],
        );
    }

    fn scroll(&mut self, event: &NormalizedEvent) {
        let EventValue::Scroll {
            position,
            depth_pct,
        } = event.value
        else {
            return;
        };
        let ts = event.timestamp;
        let config = self.config;
        self.summary.scrolling.total_scrolls += 1;

        let label = event.target_label.as_str();
        let on_page = label == PAGE_TARGET || label == UNKNOWN_TARGET;
        let key = if on_page { PAGE_TARGET } else { label };
        let tracker = self.scrolls.entry(key.to_string()).or_default();

        let mut flags = Vec::new();
        let first = tracker.last_position.is_none();
        let step = tracker.last_position.and_then(|last| {
            if position > last {
                Some(ScrollDirection::Down)
            } else if position < last {
                Some(ScrollDirection::Up)
            } else {
                None
            }
        });

        if first {
            tracker.extreme = position;
        } else if tracker.track_direction(position, config.scroll_reversal_min_delta_px) {
            self.summary.scrolling.scroll_reversals += 1;
            flags.push(LogFlag::ScrollReversal);
            trace!(at = ts, container = key, position, "scroll reversal");
        }
        tracker.last_position = Some(position);

        if let Some(step) = step {
            if tracker.burst_direction != Some(step) {
                tracker.burst.clear();
                tracker.burst_direction = Some(step);
            }
            let window = config.rapid_scroll_window_ms;
            while tracker
                .burst
                .front()
                .is_some_and(|t| ts.saturating_sub(*t) > window)
            {
                tracker.burst.pop_front();
            }
            tracker.burst.push_back(ts);
            if tracker.burst.len() >= config.rapid_scroll_min_events.max(2) {
                self.summary.scrolling.rapid_scrolls += 1;
                flags.push(LogFlag::RapidScroll);
                tracker.burst.clear();
                trace!(at = ts, container = key, "rapid scroll");
            }
        }

        // Depth describes the document, not inner containers
        let mut milestone = false;
        if let (true, Some(depth)) = (on_page, depth_pct) {
            let scrolling = &mut self.summary.scrolling;
            scrolling.scroll_depth_max = scrolling.scroll_depth_max.max(depth);
            let step_pct = config.scroll_depth_milestone_pct.max(1);
            let reached = depth / step_pct * step_pct;
            if reached > tracker.last_milestone {
                tracker.last_milestone = reached;
                milestone = true;
            }
        }
        let direction = step.or(tracker.direction);

        if !(first || milestone || !flags.is_empty()) {
            return;
        }

        let mut details = match direction {
            Some(direction) => format!("Scrolled {}", direction.as_str()),
            None => "Scrolled".to_string(),
        };
        match depth_pct {
            Some(depth) if on_page => details.push_str(&format!(" to {}% depth", depth)),
            _ => details.push_str(&format!(" to {}px", position.round() as i64)),
        }
        if !on_page {
            details.push_str(&format!(" in {}", label));
        }
        self.push_log(ts, "scroll", details, flags);
    }

    fn input(&mut self, event: &NormalizedEvent) {
        let EventValue::Length { chars } = event.value else {
            return;
        };
        let ts = event.timestamp;
        let label = event.target_label.clone();
        let previous = self.field_lengths.insert(label.clone(), chars).unwrap_or(0);

        if chars == 0 {
            self.dirty_fields.remove(&label);
            if previous > 0 {
                self.summary.inputs.cleared_inputs += 1;
                self.input = None;
                self.push_log(ts, "input", format!("Cleared {}", label), vec![LogFlag::Cleared]);
            }
            return;
        }
        self.dirty_fields.insert(label.clone());

        let details = format!(
            "Typed {} character{} into {}",
            chars,
            if chars == 1 { "" } else { "s" },
            label
        );

        let open = self.logs.len().checked_sub(1);
        if let Some(streak) = &self.input {
            if streak.label == label && Some(streak.log_index) == open {
                let index = streak.log_index;
                if let Some(entry) = self.logs.get_mut(index) {
                    entry.details = details;
                }
                return;
            }
        }

        self.summary.inputs.total_inputs += 1;
        let log_index = self.push_log(ts, "input", details, Vec::new());
        self.input = Some(InputStreak { label, log_index });
    }

    fn abandon_dirty_fields(&mut self) {
        if !self.dirty_fields.is_empty() {
            trace!(fields = self.dirty_fields.len(), "abandoned inputs");
        }
        self.summary.inputs.abandoned_inputs += self.dirty_fields.len() as u32;
        self.dirty_fields.clear();
        self.field_lengths.clear();
        self.input = None;
    }
}

fn value_text(value: &EventValue) -> Option<&str> {
    match value {
        EventValue::Text { text } if !text.is_empty() => Some(text.as_str()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::types::Viewport;
    use pretty_assertions::assert_eq;

    fn run(events: &[NormalizedEvent]) -> ClassifierOutput {
        run_with(events, &AnalyzerConfig::default())
    }

    fn run_with(events: &[NormalizedEvent], config: &AnalyzerConfig) -> ClassifierOutput {
        let end = events.last().map(|e| e.timestamp).unwrap_or(0);
        events
            .iter()
            .fold(Classifier::new(config), |mut c, e| {
                c.observe(e);
                c
            })
            .finish(end)
    }

    fn ev(ts: u64, kind: EventKind, label: &str) -> NormalizedEvent {
        NormalizedEvent::new(ts, kind, label)
    }

    fn scroll(ts: u64, position: f64) -> NormalizedEvent {
        ev(ts, EventKind::Scroll, PAGE_TARGET).with_value(EventValue::Scroll {
            position,
            depth_pct: None,
        })
    }

    fn typed(ts: u64, label: &str, chars: usize) -> NormalizedEvent {
        ev(ts, EventKind::Input, label).with_value(EventValue::Length { chars })
    }

    #[test]
    fn test_rage_click_counted_once_per_streak() {
        let out = run(&[
            ev(0, EventKind::Click, "Submit button"),
            ev(400, EventKind::Click, "Submit button"),
            ev(800, EventKind::Click, "Submit button"),
        ]);

        assert_eq!(out.summary.clicks.total_clicks, 3);
        assert_eq!(out.summary.clicks.rage_clicks, 1);
        let raged: Vec<_> = out.logs.iter().filter(|l| l.has_flag(LogFlag::RageClick)).collect();
        assert_eq!(raged.len(), 1);
        assert_eq!(raged[0].timestamp, "[00:00]");
        assert_eq!(raged[0].offset_ms, 800);
    }

    #[test]
    fn test_unanswered_rage_streak_is_also_dead() {
        let out = run(&[
            ev(0, EventKind::Click, "Submit button"),
            ev(400, EventKind::Click, "Submit button"),
            ev(800, EventKind::Click, "Submit button"),
        ]);

        let clicks = &out.summary.clicks;
        assert_eq!(clicks.total_clicks, 3);
        assert_eq!(clicks.rage_clicks, 1);
        assert_eq!(clicks.dead_clicks, 3);
        assert!(clicks.rage_clicks <= clicks.total_clicks);
        assert!(clicks.dead_clicks <= clicks.total_clicks);
        assert_eq!(
            out.logs[2].flags,
            vec![LogFlag::RageClick, LogFlag::NoResponse]
        );
    }

    #[test]
    fn test_slow_clicks_are_not_rage() {
        let out = run(&[
            ev(0, EventKind::Click, "Next"),
            ev(600, EventKind::Click, "Next"),
            ev(1_200, EventKind::Click, "Next"),
        ]);
        assert_eq!(out.summary.clicks.rage_clicks, 0);
    }

    #[test]
    fn test_rage_requires_same_target() {
        let out = run(&[
            ev(0, EventKind::Click, "A"),
            ev(100, EventKind::Click, "B"),
            ev(200, EventKind::Click, "A"),
        ]);
        assert_eq!(out.summary.clicks.rage_clicks, 0);
        assert_eq!(out.summary.clicks.total_clicks, 3);
    }

    #[test]
    fn test_dead_click_without_response() {
        let out = run(&[ev(0, EventKind::Click, "Menu icon")]);
        assert_eq!(out.summary.clicks.dead_clicks, 1);
        assert_eq!(out.logs.len(), 1);
        assert_eq!(out.logs[0].flags, vec![LogFlag::NoResponse]);
    }

    #[test]
    fn test_dead_click_timed_out_by_later_event() {
        let out = run(&[
            ev(0, EventKind::Click, "Menu icon"),
            ev(800, EventKind::Mutation, PAGE_TARGET),
        ]);
        assert_eq!(out.summary.clicks.dead_clicks, 1);
    }

    #[test]
    fn test_click_answered_by_mutation() {
        let out = run(&[
            ev(0, EventKind::Click, "Menu icon"),
            ev(120, EventKind::Mutation, PAGE_TARGET),
        ]);
        assert_eq!(out.summary.clicks.dead_clicks, 0);
        assert!(out.logs[0].flags.is_empty());
    }

    #[test]
    fn test_dead_click_rule_scope() {
        let events = [
            ev(0, EventKind::Click, "Menu icon"),
            typed(200, "Search", 3),
        ];

        let same_target = run(&events);
        assert_eq!(same_target.summary.clicks.dead_clicks, 1);

        let config = AnalyzerConfig {
            dead_click_rule: DeadClickRule::AnyEvent,
            ..Default::default()
        };
        let any_event = run_with(&events, &config);
        assert_eq!(any_event.summary.clicks.dead_clicks, 0);
    }

    #[test]
    fn test_pointer_movement_does_not_answer_click() {
        let config = AnalyzerConfig {
            dead_click_rule: DeadClickRule::AnyEvent,
            ..Default::default()
        };
        let out = run_with(
            &[
                ev(0, EventKind::Click, "Menu icon"),
                ev(100, EventKind::Activity, PAGE_TARGET),
            ],
            &config,
        );
        assert_eq!(out.summary.clicks.dead_clicks, 1);
    }

    #[test]
    fn test_hesitation() {
        let out = run(&[
            ev(1_000, EventKind::HoverStart, "Tooltip trigger"),
            ev(3_000, EventKind::HoverEnd, "Tooltip trigger"),
        ]);

        assert_eq!(out.summary.attention.total_hovers, 1);
        assert_eq!(out.summary.attention.hesitations, 1);
        assert_eq!(out.summary.attention.hover_time, 2_000);
        assert_eq!(out.logs.len(), 1);
        assert_eq!(out.logs[0].action, "hesitation");
        assert_eq!(
            out.logs[0].details,
            "Hovered over Tooltip trigger for 2.0s without clicking"
        );
        assert_eq!(out.logs[0].flags, vec![LogFlag::Hesitation]);
    }

    #[test]
    fn test_hover_followed_by_click_is_not_hesitation() {
        let out = run(&[
            ev(0, EventKind::HoverStart, "Pricing"),
            ev(2_500, EventKind::Click, "Pricing"),
            ev(2_600, EventKind::Mutation, PAGE_TARGET),
            ev(3_000, EventKind::HoverEnd, "Pricing"),
        ]);
        assert_eq!(out.summary.attention.hesitations, 0);
        assert_eq!(out.summary.attention.hover_time, 0);
    }

    #[test]
    fn test_click_elsewhere_closes_hover() {
        let out = run(&[
            ev(0, EventKind::HoverStart, "Plan A"),
            ev(2_000, EventKind::Click, "Plan B"),
            ev(2_100, EventKind::Mutation, PAGE_TARGET),
        ]);
        assert_eq!(out.summary.attention.hesitations, 1);
        let actions: Vec<_> = out.logs.iter().map(|l| l.action.as_str()).collect();
        assert_eq!(actions, vec!["hesitation", "click"]);
    }

    #[test]
    fn test_short_hover_ignored() {
        let out = run(&[
            ev(0, EventKind::HoverStart, "Logo"),
            ev(1_500, EventKind::HoverEnd, "Logo"),
        ]);
        assert_eq!(out.summary.attention.hesitations, 0);
        assert!(out.logs.is_empty());
    }

    #[test]
    fn test_scroll_reversal_needs_minimum_travel() {
        let out = run(&[
            scroll(0, 0.0),
            scroll(100, 500.0),
            scroll(200, 450.0),
            scroll(300, 300.0),
            scroll(400, 900.0),
        ]);

        assert_eq!(out.summary.scrolling.total_scrolls, 5);
        assert_eq!(out.summary.scrolling.scroll_reversals, 2);
        let flagged = out
            .logs
            .iter()
            .filter(|l| l.has_flag(LogFlag::ScrollReversal))
            .count();
        assert_eq!(flagged, 2);
    }

    #[test]
    fn test_rapid_scroll() {
        let events: Vec<_> = (0..6).map(|i| scroll(i * 150, i as f64 * 400.0)).collect();
        let out = run(&events);
        assert_eq!(out.summary.scrolling.rapid_scrolls, 1);
        assert_eq!(out.summary.scrolling.scroll_reversals, 0);
    }

    #[test]
    fn test_scroll_depth_milestones() {
        let depth = |ts: u64, pct: u32| {
            ev(ts, EventKind::Scroll, PAGE_TARGET).with_value(EventValue::Scroll {
                position: pct as f64 * 10.0,
                depth_pct: Some(pct),
            })
        };
        let out = run(&[
            depth(0, 10),
            depth(2_000, 20),
            depth(4_000, 30),
            depth(6_000, 35),
            depth(8_000, 80),
        ]);

        assert_eq!(out.summary.scrolling.scroll_depth_max, 80);
        let details: Vec<_> = out.logs.iter().map(|l| l.details.as_str()).collect();
        assert_eq!(
            details,
            vec![
                "Scrolled to 10% depth",
                "Scrolled down to 30% depth",
                "Scrolled down to 80% depth"
            ]
        );
    }

    #[test]
    fn test_scroll_containers_tracked_separately() {
        let list = |ts: u64, position: f64| {
            ev(ts, EventKind::Scroll, "Results list").with_value(EventValue::Scroll {
                position,
                depth_pct: None,
            })
        };
        let out = run(&[
            scroll(0, 0.0),
            scroll(2_000, 1_000.0),
            list(4_000, 50.0),
            scroll(6_000, 1_100.0),
        ]);

        assert_eq!(out.summary.scrolling.total_scrolls, 4);
        assert_eq!(out.summary.scrolling.scroll_reversals, 0);
        let lines: Vec<_> = out.logs.iter().map(|l| l.render()).collect();
        assert_eq!(
            lines,
            vec![
                "[00:00] scroll: Scrolled to 0px",
                "[00:04] scroll: Scrolled to 50px in Results list",
            ]
        );
    }

    #[test]
    fn test_reversal_inside_container() {
        let list = |ts: u64, position: f64, depth_pct: Option<u32>| {
            ev(ts, EventKind::Scroll, "Results list").with_value(EventValue::Scroll {
                position,
                depth_pct,
            })
        };
        let out = run(&[
            scroll(0, 400.0),
            list(2_000, 0.0, None),
            list(4_000, 600.0, Some(90)),
            list(6_000, 100.0, None),
        ]);

        assert_eq!(out.summary.scrolling.scroll_reversals, 1);
        // Only document depth counts toward the session maximum
        assert_eq!(out.summary.scrolling.scroll_depth_max, 0);
        let last = out.logs.last().unwrap();
        assert_eq!(last.details, "Scrolled up to 100px in Results list");
        assert_eq!(last.flags, vec![LogFlag::ScrollReversal]);
    }

    #[test]
    fn test_degenerate_scroll_thresholds_do_not_panic() {
        let config = AnalyzerConfig {
            scroll_depth_milestone_pct: 0,
            rapid_scroll_min_events: 0,
            ..AnalyzerConfig::default()
        };
        let depth = |ts: u64, pct: u32| {
            ev(ts, EventKind::Scroll, PAGE_TARGET).with_value(EventValue::Scroll {
                position: pct as f64 * 10.0,
                depth_pct: Some(pct),
            })
        };
        let out = run_with(&[depth(0, 10), depth(2_000, 40)], &config);

        assert_eq!(out.summary.scrolling.scroll_depth_max, 40);
        assert_eq!(out.summary.scrolling.rapid_scrolls, 0);
    }

    #[test]
    fn test_touch_moves_count_once_per_gesture() {
        let out = run(&[
            ev(0, EventKind::Touch, "Menu icon"),
            ev(50, EventKind::TouchMove, PAGE_TARGET),
            ev(100, EventKind::TouchMove, PAGE_TARGET),
            ev(3_000, EventKind::TouchMove, PAGE_TARGET),
            ev(3_050, EventKind::TouchMove, PAGE_TARGET),
        ]);

        // The tap plus one later drag
        assert_eq!(out.summary.touch.touch_events, 2);
        let actions: Vec<_> = out.logs.iter().map(|l| l.action.as_str()).collect();
        assert_eq!(actions, vec!["touch"]);
    }

    #[test]
    fn test_input_streak_coalesces() {
        let out = run(&[
            typed(0, "Email field", 1),
            typed(150, "Email field", 2),
            typed(300, "Email field", 3),
        ]);
        assert_eq!(out.summary.inputs.total_inputs, 1);
        assert_eq!(out.logs.len(), 1);
        assert_eq!(out.logs[0].details, "Typed 3 characters into Email field");
        assert_eq!(out.logs[0].offset_ms, 0);
        // Still dirty at the end of the stream
        assert_eq!(out.summary.inputs.abandoned_inputs, 1);
    }

    #[test]
    fn test_input_cleared_and_submitted() {
        let out = run(&[
            typed(0, "Coupon", 4),
            typed(500, "Coupon", 0),
            typed(1_000, "Email field", 5),
            ev(1_500, EventKind::Click, "Pay"),
            typed(1_600, "Email field", 6),
            ev(2_000, EventKind::Submit, "Checkout form"),
        ]);

        assert_eq!(out.summary.inputs.cleared_inputs, 1);
        assert_eq!(out.summary.inputs.total_inputs, 3);
        assert_eq!(out.summary.inputs.form_submissions, 1);
        assert_eq!(out.summary.inputs.abandoned_inputs, 0);
        assert!(out.logs[1].has_flag(LogFlag::Cleared));
    }

    #[test]
    fn test_navigation_abandons_dirty_fields() {
        let out = run(&[
            typed(0, "Name", 3),
            typed(100, "Company", 5),
            ev(1_000, EventKind::Navigation, PAGE_TARGET).with_value(EventValue::Text {
                text: "https://acme.test/blog".to_string(),
            }),
        ]);
        assert_eq!(out.summary.inputs.abandoned_inputs, 2);
        assert_eq!(out.summary.engagement.navigations, 1);
        assert_eq!(out.logs[2].details, "Navigated to https://acme.test/blog");
    }

    #[test]
    fn test_idle_periods() {
        let out = run(&[
            ev(0, EventKind::Activity, PAGE_TARGET),
            ev(6_000, EventKind::Mutation, PAGE_TARGET),
            ev(7_000, EventKind::Activity, PAGE_TARGET),
            ev(8_000, EventKind::Activity, PAGE_TARGET),
            ev(20_000, EventKind::Activity, PAGE_TARGET),
        ]);
        assert_eq!(out.summary.engagement.idle_periods, 2);
        assert_eq!(out.summary.engagement.idle_time, 19_000);
        assert!(out.logs.is_empty());
    }

    #[test]
    fn test_tab_switch() {
        let out = run(&[
            ev(0, EventKind::VisibilityChange, PAGE_TARGET).with_value(EventValue::Visibility {
                state: Visibility::Hidden,
            }),
            ev(9_000, EventKind::VisibilityChange, PAGE_TARGET).with_value(EventValue::Visibility {
                state: Visibility::Visible,
            }),
        ]);
        assert_eq!(out.summary.engagement.tab_switches, 1);
        assert_eq!(out.logs[0].flags, vec![LogFlag::TabSwitch]);
        assert_eq!(out.logs[1].action, "tab-return");
    }

    #[test]
    fn test_direct_counters() {
        let out = run(&[
            ev(0, EventKind::Touch, "Menu"),
            ev(100, EventKind::Swipe, "Carousel").with_value(EventValue::Text {
                text: "left".to_string(),
            }),
            ev(200, EventKind::Pinch, PAGE_TARGET),
            ev(300, EventKind::VideoPlay, "video \"Demo\""),
            ev(400, EventKind::Copy, "Coupon code"),
            ev(500, EventKind::ConsoleError, PAGE_TARGET).with_value(EventValue::Text {
                text: "TypeError".to_string(),
            }),
            ev(600, EventKind::Resize, PAGE_TARGET).with_value(EventValue::Viewport {
                viewport: Viewport {
                    width: 800,
                    height: 600,
                },
            }),
            ev(700, EventKind::Conversion, PAGE_TARGET),
        ]);

        assert_eq!(out.summary.touch.touch_events, 1);
        assert_eq!(out.summary.touch.swipes, 1);
        assert_eq!(out.summary.touch.pinch_zooms, 1);
        assert_eq!(out.summary.media.video_plays, 1);
        assert_eq!(out.summary.selection.copy_events, 1);
        assert_eq!(out.summary.errors.console_errors, 1);
        assert_eq!(out.summary.viewport.resizes, 1);
        assert_eq!(out.summary.engagement.conversions, 1);
        assert_eq!(out.summary.engagement.time_to_first_interaction, Some(0));
        assert_eq!(out.logs[1].details, "Swiped left on Carousel");
        assert_eq!(out.logs[5].flags, vec![LogFlag::ConsoleError]);
        assert_eq!(out.logs[6].details, "Resized viewport to 800x600");
    }

    #[test]
    fn test_logs_are_ordered() {
        let out = run(&[
            ev(0, EventKind::HoverStart, "Help"),
            ev(100, EventKind::Click, "Buy"),
            ev(150, EventKind::Click, "Buy"),
            ev(200, EventKind::HoverStart, "FAQ"),
            ev(4_000, EventKind::Click, "Buy"),
            typed(5_000, "Email", 2),
        ]);
        assert!(out.logs.windows(2).all(|w| w[0].offset_ms <= w[1].offset_ms));
        assert!(out.summary.clicks.dead_clicks <= out.summary.clicks.total_clicks);
    }
}
