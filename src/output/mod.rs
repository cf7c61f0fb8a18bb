use colored::Colorize;
use serde::Serialize;

use crate::annotation::{Annotation, Field};
use crate::audio::{Icon, PlayerChange};
use crate::toast::{Toast, ToastChange};
use crate::view::{DashboardView, IgnoreReason, RecordView, ViewChange};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "text" | "txt" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

pub fn infer_format_from_path(path: &str) -> Option<OutputFormat> {
    let lower = path.trim().to_lowercase();
    if lower.ends_with(".json") {
        return Some(OutputFormat::Json);
    }
    if lower.ends_with(".txt") {
        return Some(OutputFormat::Text);
    }
    None
}

#[derive(Clone, Debug, Serialize)]
pub struct OutputRecord {
    pub id: String,
    pub status: String,
    pub status_class: String,
    pub hash: Option<String>,
    pub audio_url: Option<String>,
    pub annotation: Annotation,
}

impl From<&RecordView> for OutputRecord {
    fn from(view: &RecordView) -> Self {
        Self {
            id: view.record.id.clone(),
            status: view.badge.text.clone(),
            status_class: view.badge.class.to_string(),
            hash: view.record.hash.clone(),
            audio_url: view.record.audio_url.clone(),
            annotation: view.annotation.clone(),
        }
    }
}

pub fn build_records(view: &DashboardView) -> Vec<OutputRecord> {
    view.visible().map(OutputRecord::from).collect()
}

fn push_field(out: &mut String, field: &Field) {
    match field {
        Field::Labeled { label, value } => {
            out.push_str(&format!("    {:<14} {}\n", format!("{label}:"), value));
        }
        Field::Note { text } => {
            out.push_str(&format!("    {text}\n"));
        }
    }
}

pub fn render_text(records: &[OutputRecord]) -> Vec<u8> {
    let mut out = String::new();
    for r in records {
        out.push_str(&format!("{} [{}]", r.id, r.status));
        if let Some(hash) = r.hash.as_deref() {
            out.push_str(&format!(" hash={hash}"));
        }
        if let Some(url) = r.audio_url.as_deref() {
            out.push_str(&format!(" audio={url}"));
        }
        out.push('\n');
        for field in r.annotation.fields() {
            push_field(&mut out, &field);
        }
    }
    out.into_bytes()
}

pub fn render_json(records: &[OutputRecord]) -> Vec<u8> {
    serde_json::to_vec_pretty(records).unwrap_or_else(|_| b"[]\n".to_vec())
}

pub fn render(records: &[OutputRecord], format: OutputFormat) -> Vec<u8> {
    match format {
        OutputFormat::Text => render_text(records),
        OutputFormat::Json => render_json(records),
    }
}

pub fn format_toast(toast: &Toast) -> String {
    format!(
        "{}{}{} {}",
        "[".bold().white(),
        toast.severity.tag(),
        "]".bold().white(),
        toast.message.bold().white()
    )
}

pub fn format_alert(message: &str) -> String {
    format!(
        "{}{}{} {}",
        "[".bold().white(),
        "ALERT".bold().red(),
        "]".bold().white(),
        message.bold().red()
    )
}

fn icon_text(icon: Icon) -> &'static str {
    match icon {
        Icon::Play => "▶",
        Icon::Pause => "⏸",
    }
}

/// One console line per change worth telling the operator about.
pub fn describe_change(change: &ViewChange, view: &DashboardView) -> Option<String> {
    match change {
        ViewChange::Shown { .. } | ViewChange::Hidden { .. } => None,
        ViewChange::FilterActivated { filter } => Some(format!(
            ":: filter {} ({} visible)",
            filter.to_string().cyan(),
            view.visible().count()
        )),
        ViewChange::SelectorChanged { id, status } => Some(format!(":: {id} selected {status}")),
        ViewChange::SelectorHighlight { .. } => None,
        ViewChange::BadgeUpdated { id, text, .. } => {
            Some(format!(":: {id} status {}", text.green()))
        }
        ViewChange::SaveControl { id, label } | ViewChange::CopyControl { id, label } => {
            Some(format!(":: {id} {}", label.dimmed()))
        }
        ViewChange::Player(player) => match player {
            PlayerChange::Started { id } => Some(format!(
                ":: {id} {} playing",
                icon_text(Icon::Pause)
            )),
            PlayerChange::Paused { id } => Some(format!(
                ":: {id} {} paused",
                icon_text(Icon::Play)
            )),
            PlayerChange::Seeked { id, position } => {
                Some(format!(":: {id} seek {position:.1}s"))
            }
            PlayerChange::Finished { id } => Some(format!(":: {id} playback finished")),
            PlayerChange::IconReset { .. } | PlayerChange::Progress { .. } => None,
        },
        ViewChange::Toast(ToastChange::Shown { .. }) => view.toast().map(format_toast),
        ViewChange::Toast(_) => None,
        ViewChange::Alert { message } => Some(format_alert(message)),
        ViewChange::AlertDismissed => None,
        ViewChange::Ignored { id, reason } => Some(format!(
            ":: {id} {}",
            match reason {
                IgnoreReason::UnknownRecord => "no such record",
                IgnoreReason::NoPlayer => "has no audio player",
                IgnoreReason::SaveInFlight => "is already saving",
                IgnoreReason::StaleResponse => "ignored a stale response",
            }
            .yellow()
        )),
    }
}
