//! Analyzer thresholds
//!
//! Every heuristic the classifier and the signal rules apply lives here as a
//! named constant, and [`AnalyzerConfig`] carries them into a run. The config
//! deserializes from JSON with every field optional, so a thresholds file only
//! needs to name the values it overrides.

use crate::error::AnalyzeError;
use serde::{Deserialize, Serialize};

/// Trailing window for rage-click detection (milliseconds)
pub const RAGE_CLICK_WINDOW_MS: u64 = 1_000;

/// Same-target clicks inside the window that make a rage click
pub const RAGE_CLICK_MIN_CLICKS: usize = 3;

/// Time a click may wait for a page response before it is dead (milliseconds)
pub const DEAD_CLICK_TIMEOUT_MS: u64 = 500;

/// Hover dwell that counts as hesitation when no click follows (milliseconds)
pub const HESITATION_MIN_DWELL_MS: u64 = 1_500;

/// Gap between consecutive events that counts as idle time (milliseconds)
pub const IDLE_GAP_MS: u64 = 5_000;

/// Travel against the current scroll direction needed to register a reversal (pixels)
pub const SCROLL_REVERSAL_MIN_DELTA_PX: f64 = 100.0;

/// Trailing window for rapid-scroll bursts (milliseconds)
pub const RAPID_SCROLL_WINDOW_MS: u64 = 1_000;

/// Same-direction scroll events inside the window that make a rapid scroll
pub const RAPID_SCROLL_MIN_EVENTS: usize = 5;

/// Scroll depth lines are logged each time a new multiple of this is reached (percent)
pub const SCROLL_DEPTH_MILESTONE_PCT: u32 = 25;

/// Maximum characters of element text kept in a target label
pub const LABEL_MAX_CHARS: usize = 40;

/// Rapid scrolls at or above this mark the session as frustrated
pub const FRUSTRATION_MIN_RAPID_SCROLLS: u32 = 3;

/// Scrolls per click at or above this mark the session as exploring
pub const EXPLORATION_SCROLL_CLICK_RATIO: f64 = 3.0;

/// Hesitations at or above this (together with reversals) mark confusion
pub const CONFUSION_MIN_HESITATIONS: u32 = 2;

/// Scroll reversals at or above this (together with hesitations) mark confusion
pub const CONFUSION_MIN_REVERSALS: u32 = 2;

/// Clicks plus inputs required before a session can count as engaged
pub const ENGAGEMENT_MIN_INTERACTIONS: u32 = 3;

/// Clicks plus inputs per minute required for engagement
pub const ENGAGEMENT_MIN_PER_MINUTE: f64 = 2.0;

/// What counts as a page response when deciding whether a click was dead
///
/// Mutation and navigation markers answer a click under either rule. The rule
/// only decides which *other* events may answer it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadClickRule {
    /// Only a non-click event on the clicked element answers the click
    #[default]
    SameTarget,
    /// Any non-click event anywhere in the session answers the click
    AnyEvent,
}

/// Thresholds for the session-level behavioral signals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalThresholds {
    pub frustration_min_rapid_scrolls: u32,
    pub exploration_scroll_click_ratio: f64,
    pub confusion_min_hesitations: u32,
    pub confusion_min_reversals: u32,
    pub engagement_min_interactions: u32,
    pub engagement_min_per_minute: f64,
}

impl Default for SignalThresholds {
    fn default() -> Self {
        Self {
            frustration_min_rapid_scrolls: FRUSTRATION_MIN_RAPID_SCROLLS,
            exploration_scroll_click_ratio: EXPLORATION_SCROLL_CLICK_RATIO,
            confusion_min_hesitations: CONFUSION_MIN_HESITATIONS,
            confusion_min_reversals: CONFUSION_MIN_REVERSALS,
            engagement_min_interactions: ENGAGEMENT_MIN_INTERACTIONS,
            engagement_min_per_minute: ENGAGEMENT_MIN_PER_MINUTE,
        }
    }
}

/// Full analyzer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub rage_click_window_ms: u64,
    pub rage_click_min_clicks: usize,
    pub dead_click_timeout_ms: u64,
    pub dead_click_rule: DeadClickRule,
    pub hesitation_min_dwell_ms: u64,
    pub idle_gap_ms: u64,
    pub scroll_reversal_min_delta_px: f64,
    pub rapid_scroll_window_ms: u64,
    pub rapid_scroll_min_events: usize,
    pub scroll_depth_milestone_pct: u32,
    pub label_max_chars: usize,
    pub signals: SignalThresholds,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            rage_click_window_ms: RAGE_CLICK_WINDOW_MS,
            rage_click_min_clicks: RAGE_CLICK_MIN_CLICKS,
            dead_click_timeout_ms: DEAD_CLICK_TIMEOUT_MS,
            dead_click_rule: DeadClickRule::default(),
            hesitation_min_dwell_ms: HESITATION_MIN_DWELL_MS,
            idle_gap_ms: IDLE_GAP_MS,
            scroll_reversal_min_delta_px: SCROLL_REVERSAL_MIN_DELTA_PX,
            rapid_scroll_window_ms: RAPID_SCROLL_WINDOW_MS,
            rapid_scroll_min_events: RAPID_SCROLL_MIN_EVENTS,
            scroll_depth_milestone_pct: SCROLL_DEPTH_MILESTONE_PCT,
            label_max_chars: LABEL_MAX_CHARS,
            signals: SignalThresholds::default(),
        }
    }
}

impl AnalyzerConfig {
    /// Load a config from JSON; omitted fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self, AnalyzeError> {
        let config: AnalyzerConfig = serde_json::from_str(json)
            .map_err(|e| AnalyzeError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the config to pretty JSON
    pub fn to_json(&self) -> Result<String, AnalyzeError> {
        serde_json::to_string_pretty(self).map_err(|e| AnalyzeError::EncodingError(e.to_string()))
    }

    /// Reject thresholds that would make a rule meaningless
    pub fn validate(&self) -> Result<(), AnalyzeError> {
        if self.rage_click_min_clicks < 2 {
            return Err(AnalyzeError::ConfigError(
                "rage_click_min_clicks must be at least 2".to_string(),
            ));
        }
        if self.rapid_scroll_min_events < 2 {
            return Err(AnalyzeError::ConfigError(
                "rapid_scroll_min_events must be at least 2".to_string(),
            ));
        }
        if self.scroll_depth_milestone_pct == 0 || self.scroll_depth_milestone_pct > 100 {
            return Err(AnalyzeError::ConfigError(
                "scroll_depth_milestone_pct must be between 1 and 100".to_string(),
            ));
        }
        if !self.scroll_reversal_min_delta_px.is_finite() || self.scroll_reversal_min_delta_px < 0.0
        {
            return Err(AnalyzeError::ConfigError(
                "scroll_reversal_min_delta_px must be a non-negative number".to_string(),
            ));
        }
        if self.label_max_chars == 0 {
            return Err(AnalyzeError::ConfigError(
                "label_max_chars must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
