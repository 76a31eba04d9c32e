//! Summary finalization and behavioral signal rules
//!
//! Signals are pure functions of the summary: the same counters always
//! produce the same booleans, whatever the event stream looked like.

use crate::config::SignalThresholds;
use crate::session::types::{BehavioralSignals, SessionSummary};

/// Milliseconds per minute, for interaction density
const MS_PER_MINUTE: f64 = 60_000.0;

/// Aggregator for classifier counters
pub struct SessionAggregator;

impl SessionAggregator {
    /// Fill in the duration bookkeeping the classifier cannot know
    pub fn finalize(mut summary: SessionSummary, duration_ms: u64) -> SessionSummary {
        let engagement = &mut summary.engagement;
        engagement.session_duration = duration_ms;
        engagement.idle_time = engagement.idle_time.min(duration_ms);
        engagement.active_time = duration_ms.saturating_sub(engagement.idle_time);
        summary
    }

    /// Derive the six session-level signals
    pub fn derive_signals(
        summary: &SessionSummary,
        thresholds: &SignalThresholds,
    ) -> BehavioralSignals {
        let completed_goal = completed_goal(summary);
        let is_frustrated = is_frustrated(summary, thresholds);

        BehavioralSignals {
            is_exploring: is_exploring(summary, thresholds) && !completed_goal,
            is_frustrated,
            is_engaged: is_engaged(summary, thresholds) && !is_frustrated,
            is_confused: is_confused(summary, thresholds),
            is_mobile: is_mobile(summary),
            completed_goal,
        }
    }
}

fn is_frustrated(summary: &SessionSummary, thresholds: &SignalThresholds) -> bool {
    summary.clicks.rage_clicks > 0
        || summary.clicks.dead_clicks > 0
        || summary.scrolling.rapid_scrolls >= thresholds.frustration_min_rapid_scrolls
}

/// Lots of scrolling relative to clicking
fn is_exploring(summary: &SessionSummary, thresholds: &SignalThresholds) -> bool {
    let clicks = summary.clicks.total_clicks.max(1) as f64;
    let scrolls = summary.scrolling.total_scrolls as f64;
    scrolls >= thresholds.exploration_scroll_click_ratio * clicks
}

fn is_confused(summary: &SessionSummary, thresholds: &SignalThresholds) -> bool {
    summary.attention.hesitations >= thresholds.confusion_min_hesitations
        && summary.scrolling.scroll_reversals >= thresholds.confusion_min_reversals
}

/// Enough clicks and inputs, dense enough over the session
fn is_engaged(summary: &SessionSummary, thresholds: &SignalThresholds) -> bool {
    let interactions = summary.clicks.total_clicks + summary.inputs.total_inputs;
    if interactions < thresholds.engagement_min_interactions {
        return false;
    }

    let duration_min = summary.engagement.session_duration as f64 / MS_PER_MINUTE;
    let per_minute = if duration_min > 0.0 {
        interactions as f64 / duration_min
    } else {
        0.0
    };
    per_minute >= thresholds.engagement_min_per_minute
}

fn is_mobile(summary: &SessionSummary) -> bool {
    summary.touch.touch_events + summary.touch.swipes + summary.touch.pinch_zooms > 0
}

fn completed_goal(summary: &SessionSummary) -> bool {
    summary.inputs.form_submissions > 0 || summary.engagement.conversions > 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn signals(summary: &SessionSummary) -> BehavioralSignals {
        SessionAggregator::derive_signals(summary, &SignalThresholds::default())
    }

    #[test]
    fn test_empty_summary_has_no_signals() {
        assert_eq!(signals(&SessionSummary::default()), BehavioralSignals::default());
    }

    #[test]
    fn test_finalize_durations() {
        let mut summary = SessionSummary::default();
        summary.engagement.idle_time = 12_000;
        let summary = SessionAggregator::finalize(summary, 60_000);
        assert_eq!(summary.engagement.session_duration, 60_000);
        assert_eq!(summary.engagement.active_time, 48_000);

        let mut summary = SessionSummary::default();
        summary.engagement.idle_time = 9_000;
        let summary = SessionAggregator::finalize(summary, 5_000);
        assert_eq!(summary.engagement.active_time, 0);
        assert_eq!(summary.engagement.idle_time, 5_000);
    }

    #[test]
    fn test_frustration() {
        let mut summary = SessionSummary::default();
        summary.clicks.total_clicks = 1;
        summary.clicks.dead_clicks = 1;
        assert!(signals(&summary).is_frustrated);

        let mut summary = SessionSummary::default();
        summary.scrolling.rapid_scrolls = 2;
        assert!(!signals(&summary).is_frustrated);
        summary.scrolling.rapid_scrolls = 3;
        assert!(signals(&summary).is_frustrated);
    }

    #[test]
    fn test_exploration_suppressed_by_goal() {
        let mut summary = SessionSummary::default();
        summary.scrolling.total_scrolls = 6;
        summary.clicks.total_clicks = 2;
        assert!(signals(&summary).is_exploring);

        summary.inputs.form_submissions = 1;
        let result = signals(&summary);
        assert!(!result.is_exploring);
        assert!(result.completed_goal);
    }

    #[test]
    fn test_confusion_needs_both() {
        let mut summary = SessionSummary::default();
        summary.attention.hesitations = 2;
        assert!(!signals(&summary).is_confused);
        summary.scrolling.scroll_reversals = 2;
        assert!(signals(&summary).is_confused);
    }

    #[test]
    fn test_engagement_density_and_frustration() {
        let mut summary = SessionSummary::default();
        summary.clicks.total_clicks = 3;
        summary.inputs.total_inputs = 1;
        summary.engagement.session_duration = 60_000;
        assert!(signals(&summary).is_engaged);

        summary.engagement.session_duration = 180_000;
        assert!(!signals(&summary).is_engaged);

        summary.engagement.session_duration = 60_000;
        summary.clicks.rage_clicks = 1;
        assert!(!signals(&summary).is_engaged);
    }

    #[test]
    fn test_mobile_and_goal() {
        let mut summary = SessionSummary::default();
        summary.touch.swipes = 1;
        assert!(signals(&summary).is_mobile);

        let mut summary = SessionSummary::default();
        summary.engagement.conversions = 1;
        assert!(signals(&summary).completed_goal);
    }
}
