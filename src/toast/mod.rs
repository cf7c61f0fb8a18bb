use std::time::{Duration, Instant};

use colored::{ColoredString, Colorize};
use serde::Serialize;

use crate::annotation::escape_html;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Warning,
    Error,
}

impl Severity {
    pub fn accent(self) -> &'static str {
        match self {
            Self::Success => "linear-gradient(135deg, #10b981, #059669)",
            Self::Warning => "linear-gradient(135deg, #f59e0b, #d97706)",
            Self::Error => "linear-gradient(135deg, #ef4444, #dc2626)",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Self::Success => "check-circle",
            Self::Warning => "exclamation-circle",
            Self::Error => "times-circle",
        }
    }

    pub fn tag(self) -> ColoredString {
        match self {
            Self::Success => "OK".bold().green(),
            Self::Warning => "WRN".bold().yellow(),
            Self::Error => "ERR".bold().red(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastPhase {
    Visible,
    Leaving,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Toast {
    pub id: u64,
    pub message: String,
    pub severity: Severity,
    pub phase: ToastPhase,
    pub shown_at: Instant,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ToastTiming {
    pub visible: Duration,
    pub exit: Duration,
}

pub const MIN_VISIBLE: Duration = Duration::from_secs(2);
pub const MAX_VISIBLE: Duration = Duration::from_secs(4);

impl Default for ToastTiming {
    fn default() -> Self {
        Self {
            visible: MAX_VISIBLE,
            exit: Duration::from_millis(300),
        }
    }
}

impl ToastTiming {
    pub fn new(visible: Duration, exit: Duration) -> Self {
        Self {
            visible: visible.clamp(MIN_VISIBLE, MAX_VISIBLE),
            exit,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ToastChange {
    Shown { id: u64, replaced: Option<u64> },
    Leaving { id: u64 },
    Removed { id: u64 },
}

/// Holds the single on-screen toast. Showing a new toast evicts the old one
/// immediately instead of queueing.
#[derive(Clone, Debug, Default)]
pub struct ToastSlot {
    current: Option<Toast>,
    next_id: u64,
    timing: ToastTiming,
}

impl ToastSlot {
    pub fn new(timing: ToastTiming) -> Self {
        Self {
            current: None,
            next_id: 0,
            timing,
        }
    }

    pub fn current(&self) -> Option<&Toast> {
        self.current.as_ref()
    }

    pub fn timing(&self) -> ToastTiming {
        self.timing
    }

    pub fn show(&mut self, message: impl Into<String>, severity: Severity, now: Instant) -> ToastChange {
        let replaced = self.current.take().map(|t| t.id);
        self.next_id += 1;
        let id = self.next_id;
        self.current = Some(Toast {
            id,
            message: message.into(),
            severity,
            phase: ToastPhase::Visible,
            shown_at: now,
        });
        ToastChange::Shown { id, replaced }
    }

    /// Advances the visible -> leaving -> removed lifecycle.
    pub fn tick(&mut self, now: Instant) -> Option<ToastChange> {
        let toast = self.current.as_mut()?;
        let age = now.saturating_duration_since(toast.shown_at);
        match toast.phase {
            ToastPhase::Visible if age >= self.timing.visible + self.timing.exit => {
                let id = toast.id;
                self.current = None;
                Some(ToastChange::Removed { id })
            }
            ToastPhase::Visible if age >= self.timing.visible => {
                toast.phase = ToastPhase::Leaving;
                Some(ToastChange::Leaving { id: toast.id })
            }
            ToastPhase::Leaving if age >= self.timing.visible + self.timing.exit => {
                let id = toast.id;
                self.current = None;
                Some(ToastChange::Removed { id })
            }
            _ => None,
        }
    }
}

pub fn render_markup(toast: &Toast) -> String {
    let animation = match toast.phase {
        ToastPhase::Visible => "slideIn",
        ToastPhase::Leaving => "slideOut",
    };
    format!(
        r#"<div class="toast-notification" data-severity="{severity}" style="background: {accent}; animation: {animation} 0.3s ease;"><i class="fas fa-{icon}"></i><span>{message}</span></div>"#,
        severity = match toast.severity {
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
        },
        accent = toast.severity.accent(),
        icon = toast.severity.icon(),
        message = escape_html(&toast.message),
    )
}
