//! Log rendering
//!
//! Formats log entries as `[MM:SS] action: details [FLAG] ...` lines and
//! assembles the plain-text transcript and the structured context block a
//! downstream model is prompted with.

use crate::session::types::{LogEntry, SemanticSession};
use std::fmt::{self, Write};

/// Render a session-relative offset as `[MM:SS]`
///
/// Minutes are zero-padded to two digits and keep growing past 99.
pub fn format_timestamp(offset_ms: u64) -> String {
    let total_secs = offset_ms / 1000;
    format!("[{:02}:{:02}]", total_secs / 60, total_secs % 60)
}

/// Render milliseconds as a short human duration (`45s`, `3m 05s`)
pub fn format_duration(ms: u64) -> String {
    let total_secs = ms / 1000;
    if total_secs < 60 {
        format!("{}s", total_secs)
    } else {
        format!("{}m {:02}s", total_secs / 60, total_secs % 60)
    }
}

impl LogEntry {
    /// Render the entry as one transcript line
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.timestamp, self.action, self.details)?;
        for flag in &self.flags {
            write!(f, " {}", flag)?;
        }
        Ok(())
    }
}

/// All log lines, newline-separated
pub fn render_transcript(session: &SemanticSession) -> String {
    session
        .logs
        .iter()
        .map(LogEntry::render)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Structured text block: overview, signals, metrics, transcript
pub fn render_context(session: &SemanticSession) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail
    let _ = write_context(&mut out, session);
    out
}

fn write_context(out: &mut String, session: &SemanticSession) -> fmt::Result {
    let summary = &session.summary;

    writeln!(out, "## Session overview")?;
    writeln!(
        out,
        "Page: {}",
        session.page_url.as_deref().unwrap_or("unknown")
    )?;
    if let Some(title) = &session.page_title {
        writeln!(out, "Title: {}", title)?;
    }
    writeln!(out, "Duration: {}", format_duration(session.total_duration))?;
    writeln!(out, "Events: {}", session.event_count)?;
    if let Some(viewport) = &session.viewport_size {
        writeln!(out, "Viewport: {}", viewport)?;
    }
    if let Some(started_at) = &session.started_at {
        writeln!(out, "Started: {}", started_at.to_rfc3339())?;
    }

    let signals = &session.behavioral_signals;
    let labelled = [
        (signals.is_frustrated, "frustrated"),
        (signals.is_confused, "confused"),
        (signals.is_exploring, "exploring"),
        (signals.is_engaged, "engaged"),
        (signals.is_mobile, "mobile"),
        (signals.completed_goal, "completed goal"),
    ];
    let active: Vec<&str> = labelled
        .iter()
        .filter(|(on, _)| *on)
        .map(|(_, name)| *name)
        .collect();

    writeln!(out)?;
    writeln!(out, "## Behavioral signals")?;
    if active.is_empty() {
        writeln!(out, "none")?;
    } else {
        writeln!(out, "{}", active.join(", "))?;
    }

    writeln!(out)?;
    writeln!(out, "## Metrics")?;
    let c = &summary.clicks;
    writeln!(
        out,
        "Clicks: {} total, {} rage, {} dead, {} double, {} right",
        c.total_clicks, c.rage_clicks, c.dead_clicks, c.double_clicks, c.right_clicks
    )?;
    let i = &summary.inputs;
    writeln!(
        out,
        "Inputs: {} fields typed, {} submissions, {} abandoned, {} cleared",
        i.total_inputs, i.form_submissions, i.abandoned_inputs, i.cleared_inputs
    )?;
    let s = &summary.scrolling;
    writeln!(
        out,
        "Scrolling: {} scrolls, max depth {}%, {} reversals, {} rapid",
        s.total_scrolls, s.scroll_depth_max, s.scroll_reversals, s.rapid_scrolls
    )?;
    let a = &summary.attention;
    writeln!(
        out,
        "Attention: {} hovers, {} hesitations ({} hesitating)",
        a.total_hovers,
        a.hesitations,
        format_duration(a.hover_time)
    )?;
    let t = &summary.touch;
    if t.touch_events + t.swipes + t.pinch_zooms > 0 {
        writeln!(
            out,
            "Touch: {} taps, {} swipes, {} pinch zooms",
            t.touch_events, t.swipes, t.pinch_zooms
        )?;
    }
    let m = &summary.media;
    if m.video_plays + m.video_pauses > 0 {
        writeln!(out, "Media: {} plays, {} pauses", m.video_plays, m.video_pauses)?;
    }
    let sel = &summary.selection;
    if sel.text_selections + sel.copy_events + sel.paste_events > 0 {
        writeln!(
            out,
            "Selection: {} selections, {} copies, {} pastes",
            sel.text_selections, sel.copy_events, sel.paste_events
        )?;
    }
    let e = &summary.errors;
    writeln!(
        out,
        "Errors: {} console, {} network",
        e.console_errors, e.network_errors
    )?;
    let eng = &summary.engagement;
    writeln!(
        out,
        "Engagement: {} active, {} idle over {} periods, {} tab switches, {} navigations, {} conversions",
        format_duration(eng.active_time),
        format_duration(eng.idle_time),
        eng.idle_periods,
        eng.tab_switches,
        eng.navigations,
        eng.conversions
    )?;
    if let Some(first) = eng.time_to_first_interaction {
        writeln!(out, "First interaction after {}", format_duration(first))?;
    }
    let v = &summary.viewport;
    if v.resizes + v.orientation_changes > 0 {
        writeln!(
            out,
            "Viewport: {} resizes, {} orientation changes",
            v.resizes, v.orientation_changes
        )?;
    }

    writeln!(out)?;
    writeln!(out, "## Transcript")?;
    if session.logs.is_empty() {
        writeln!(out, "(no interactions)")?;
    } else {
        for entry in &session.logs {
            writeln!(out, "{}", entry)?;
        }
    }
    Ok(())
}
