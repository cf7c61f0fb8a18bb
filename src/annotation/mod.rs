//! Formatting of the multi-line AI annotation attached to each grievance.
//!
//! The annotation pipeline emits `Label: value` lines. Text that carries no
//! `Transcription:` or `Category:` marker is treated as a free-form note.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum AnnotationLabel {
    Transcription,
    Category,
    Summary,
    Sentiment,
    Priority,
}

impl AnnotationLabel {
    pub const ALL: [AnnotationLabel; 5] = [
        AnnotationLabel::Transcription,
        AnnotationLabel::Category,
        AnnotationLabel::Summary,
        AnnotationLabel::Sentiment,
        AnnotationLabel::Priority,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Transcription => "Transcription",
            Self::Category => "Category",
            Self::Summary => "Summary",
            Self::Sentiment => "Sentiment",
            Self::Priority => "Priority",
        }
    }

    fn prefix(self) -> &'static str {
        match self {
            Self::Transcription => "Transcription:",
            Self::Category => "Category:",
            Self::Summary => "Summary:",
            Self::Sentiment => "Sentiment:",
            Self::Priority => "Priority:",
        }
    }
}

impl fmt::Display for AnnotationLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Field {
    Labeled {
        label: AnnotationLabel,
        value: String,
    },
    /// A non-empty line without a recognized label.
    Note { text: String },
}

impl Field {
    pub fn label(&self) -> Option<AnnotationLabel> {
        match self {
            Field::Labeled { label, .. } => Some(*label),
            Field::Note { .. } => None,
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Field::Labeled { value, .. } => value,
            Field::Note { text } => text,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "form", content = "body", rename_all = "snake_case")]
pub enum Annotation {
    Structured(Vec<Field>),
    Plain(String),
}

impl Annotation {
    /// Fields in display order; the plain form is a single unlabeled field.
    pub fn fields(&self) -> Vec<Field> {
        match self {
            Annotation::Structured(fields) => fields.clone(),
            Annotation::Plain(text) => vec![Field::Note { text: text.clone() }],
        }
    }

    pub fn get(&self, label: AnnotationLabel) -> Option<&str> {
        match self {
            Annotation::Structured(fields) => fields.iter().find_map(|f| match f {
                Field::Labeled { label: l, value } if *l == label => Some(value.as_str()),
                _ => None,
            }),
            Annotation::Plain(_) => None,
        }
    }
}

fn category_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"\[(.*?)\]").ok())
        .as_ref()
}

fn category_value(value: &str) -> String {
    category_pattern()
        .and_then(|re| re.captures(value))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| value.to_string())
}

fn parse_line(line: &str) -> Field {
    for label in AnnotationLabel::ALL {
        if let Some(rest) = line.strip_prefix(label.prefix()) {
            let value = rest.trim();
            let value = match label {
                AnnotationLabel::Category => category_value(value),
                _ => value.to_string(),
            };
            return Field::Labeled { label, value };
        }
    }
    Field::Note {
        text: line.to_string(),
    }
}

pub fn parse(text: &str) -> Annotation {
    let text = text.trim();
    let structured = text.contains(AnnotationLabel::Transcription.prefix())
        || text.contains(AnnotationLabel::Category.prefix());
    if !structured {
        return Annotation::Plain(text.to_string());
    }
    let fields = text
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(parse_line)
        .collect();
    Annotation::Structured(fields)
}

pub fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn render_field(field: &Field, out: &mut String) {
    match field {
        Field::Labeled {
            label: AnnotationLabel::Category,
            value,
        } => out.push_str(&format!(
            r#"<div class="ai-field"><span class="ai-label">Category:</span><span class="ai-category">{}</span></div>"#,
            escape_html(value)
        )),
        Field::Labeled { label, value } => out.push_str(&format!(
            r#"<div class="ai-field"><span class="ai-label">{}</span><span class="ai-value">{}</span></div>"#,
            label.prefix(),
            escape_html(value)
        )),
        Field::Note { text } => out.push_str(&format!(
            r#"<div class="ai-field"><span class="ai-value">{}</span></div>"#,
            escape_html(text)
        )),
    }
}

pub fn render_markup(annotation: &Annotation) -> String {
    match annotation {
        Annotation::Structured(fields) => {
            let mut out = String::new();
            for field in fields {
                render_field(field, &mut out);
            }
            out
        }
        Annotation::Plain(text) => format!(r#"<div class="ai-value">{}</div>"#, escape_html(text)),
    }
}
