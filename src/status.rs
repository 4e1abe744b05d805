//! Session status classification from captured pane content
//!
//! Each tool owns an ordered marker table searched top-to-bottom over the
//! most recent pane lines; the first matching row wins. The ordering is a
//! deliberate tie-break: a tool can show an approval prompt below a stale
//! error banner, and the row order decides which one we report.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::tool::Tool;

/// Live state of a session, recomputed on every poll and never persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Tool is actively generating or executing
    Running,
    /// Tool is blocked on a confirmation or approval
    Waiting,
    /// Tool is alive and at rest
    Idle,
    /// Underlying process is gone
    Stopped,
    /// Tool printed a terminal error banner
    Error,
}

impl SessionStatus {
    /// Single-glyph icon for list output
    pub fn icon(&self) -> &'static str {
        match self {
            SessionStatus::Running => "●",
            SessionStatus::Waiting => "◐",
            SessionStatus::Idle => "○",
            SessionStatus::Stopped => "◻",
            SessionStatus::Error => "✗",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Running => "running",
            SessionStatus::Waiting => "waiting",
            SessionStatus::Idle => "idle",
            SessionStatus::Stopped => "stopped",
            SessionStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One row of a tool's classification table
struct Marker {
    pattern: &'static str,
    status: SessionStatus,
}

const fn marker(pattern: &'static str, status: SessionStatus) -> Marker {
    Marker { pattern, status }
}

// Approval prompts come before generation markers: while a permission dialog
// is up, claude still renders its interrupt footer.
const CLAUDE_MARKERS: &[Marker] = &[
    marker("Do you want", SessionStatus::Waiting),
    marker("Would you like", SessionStatus::Waiting),
    marker("esc to interrupt", SessionStatus::Running),
    marker("API Error", SessionStatus::Error),
    marker("│ >", SessionStatus::Idle),
];

const OPENCODE_MARKERS: &[Marker] = &[
    marker("Accept this change", SessionStatus::Waiting),
    marker("[y/n]", SessionStatus::Waiting),
    marker("Working", SessionStatus::Running),
    marker("Error:", SessionStatus::Error),
];

const GEMINI_MARKERS: &[Marker] = &[
    marker("Apply this change?", SessionStatus::Waiting),
    marker("Waiting for confirmation", SessionStatus::Waiting),
    marker("esc to cancel", SessionStatus::Running),
    marker("Error:", SessionStatus::Error),
];

const CODEX_MARKERS: &[Marker] = &[
    marker("Allow command?", SessionStatus::Waiting),
    marker("[y/N]", SessionStatus::Waiting),
    marker("Esc to interrupt", SessionStatus::Running),
    marker("ERROR", SessionStatus::Error),
];

fn markers_for(tool: Tool) -> &'static [Marker] {
    match tool {
        Tool::Claude => CLAUDE_MARKERS,
        Tool::Opencode => OPENCODE_MARKERS,
        Tool::Gemini => GEMINI_MARKERS,
        Tool::Codex => CODEX_MARKERS,
        Tool::Custom | Tool::Shell => &[],
    }
}

/// How many trailing pane lines are considered "recent"
const RECENT_LINES: usize = 25;

fn prompt_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^(\$|%|❯|>)\s*$").unwrap())
}

/// Classify a session's live state.
///
/// A dead process is `Stopped` no matter what the pane still shows. For
/// custom tools no markers are defined, so liveness is all we can report.
pub fn classify(tool: Tool, pane: &str, alive: bool) -> SessionStatus {
    if !alive {
        return SessionStatus::Stopped;
    }

    if tool == Tool::Custom {
        return SessionStatus::Running;
    }

    let recent = recent_window(pane);

    for m in markers_for(tool) {
        if recent.contains(m.pattern) {
            return m.status;
        }
    }

    if prompt_regex().is_match(&recent) {
        return SessionStatus::Idle;
    }

    match tool {
        // No prompt visible means a foreground command is occupying the shell
        Tool::Shell => SessionStatus::Running,
        // Agent drawing its own UI with no recognized marker: at rest
        _ => SessionStatus::Idle,
    }
}

/// Keep only the last RECENT_LINES lines so stale scrollback can't
/// outvote the current screen
fn recent_window(pane: &str) -> String {
    let lines: Vec<&str> = pane.lines().collect();
    let start = lines.len().saturating_sub(RECENT_LINES);
    lines[start..].join("\n")
}
