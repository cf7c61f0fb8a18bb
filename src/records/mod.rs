use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum GrievanceStatus {
    Pending,
    InProgress,
    Resolved,
    Rejected,
}

impl GrievanceStatus {
    pub const ALL: [GrievanceStatus; 4] = [
        GrievanceStatus::Pending,
        GrievanceStatus::InProgress,
        GrievanceStatus::Resolved,
        GrievanceStatus::Rejected,
    ];

    /// Text shown on the status badge and sent as `new_status`.
    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::InProgress => "In Progress",
            Self::Resolved => "Resolved",
            Self::Rejected => "Rejected",
        }
    }

    pub fn css_class(self) -> &'static str {
        match self {
            Self::Pending => "status-pending",
            Self::InProgress => "status-in-progress",
            Self::Resolved => "status-resolved",
            Self::Rejected => "status-rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let key: String = value
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .flat_map(char::to_lowercase)
            .collect();
        match key.as_str() {
            "pending" => Some(Self::Pending),
            "inprogress" => Some(Self::InProgress),
            "resolved" => Some(Self::Resolved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

impl fmt::Display for GrievanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for GrievanceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| {
            format!("unknown status '{s}', expected one of: pending, in progress, resolved, rejected")
        })
    }
}

impl TryFrom<String> for GrievanceStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<GrievanceStatus> for String {
    fn from(value: GrievanceStatus) -> Self {
        value.label().to_string()
    }
}

/// One grievance as exposed by the dashboard markup (`data-id`, `data-status`,
/// `data-content`, `data-hash`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(deserialize_with = "id_from_scalar")]
    pub id: String,
    pub status: GrievanceStatus,
    #[serde(default, alias = "annotation", alias = "ai_report")]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(default, alias = "url", skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_duration: Option<f64>,
}

impl Record {
    pub fn new(id: impl Into<String>, status: GrievanceStatus, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status,
            content: content.into(),
            hash: None,
            audio_url: None,
            audio_duration: None,
        }
    }

    pub fn has_audio(&self) -> bool {
        self.audio_url.as_deref().is_some_and(|u| !u.trim().is_empty())
    }
}

struct IdVisitor;

impl<'de> Visitor<'de> for IdVisitor {
    type Value = String;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a record id (string or integer)")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<String, E> {
        Ok(value.to_string())
    }

    fn visit_string<E: de::Error>(self, value: String) -> Result<String, E> {
        Ok(value)
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<String, E> {
        Ok(value.to_string())
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<String, E> {
        Ok(value.to_string())
    }
}

/// Ids are numeric in the dashboard backend; unquoted YAML keeps them as
/// integers.
fn id_from_scalar<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(IdVisitor)
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct RecordId(String);

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        id_from_scalar(deserializer).map(RecordId)
    }
}

// Entry of the backend's id-keyed grievance store.
#[derive(Debug, Deserialize)]
struct KeyedRecord {
    status: GrievanceStatus,
    #[serde(default, alias = "annotation", alias = "ai_report")]
    content: String,
    #[serde(default)]
    hash: Option<String>,
    #[serde(default, alias = "audio_url")]
    url: Option<String>,
    #[serde(default)]
    audio_duration: Option<f64>,
}

#[derive(Debug)]
enum RecordsFile {
    List(Vec<Record>),
    Keyed(BTreeMap<RecordId, KeyedRecord>),
}

impl RecordsFile {
    fn from_yaml(contents: &str) -> Result<Self, String> {
        let value: serde_yaml::Value = serde_yaml::from_str(contents).map_err(|e| e.to_string())?;
        let file = if value.is_sequence() {
            serde_yaml::from_value(value).map(RecordsFile::List)
        } else {
            serde_yaml::from_value(value).map(RecordsFile::Keyed)
        };
        file.map_err(|e| e.to_string())
    }

    fn from_json(contents: &str) -> Result<Self, String> {
        let value: serde_json::Value = serde_json::from_str(contents).map_err(|e| e.to_string())?;
        let file = if value.is_array() {
            serde_json::from_value(value).map(RecordsFile::List)
        } else {
            serde_json::from_value(value).map(RecordsFile::Keyed)
        };
        file.map_err(|e| e.to_string())
    }
}

impl RecordsFile {
    fn into_records(self) -> Vec<Record> {
        match self {
            RecordsFile::List(records) => records,
            RecordsFile::Keyed(map) => map
                .into_iter()
                .map(|(RecordId(id), r)| Record {
                    id,
                    status: r.status,
                    content: r.content,
                    hash: r.hash,
                    audio_url: r.url,
                    audio_duration: r.audio_duration,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Error)]
pub enum RecordsError {
    #[error("failed to read records file: {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse records file: {path}: {message}")]
    Parse { path: String, message: String },

    #[error("record with empty id")]
    EmptyId,

    #[error("duplicate record id: {id}")]
    DuplicateId { id: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SnapshotFormat {
    Json,
    Yaml,
}

fn infer_snapshot_format(path: &str) -> SnapshotFormat {
    let lower = path.trim().to_lowercase();
    if lower.ends_with(".yml") || lower.ends_with(".yaml") {
        SnapshotFormat::Yaml
    } else {
        SnapshotFormat::Json
    }
}

pub fn parse_records(contents: &str, yaml: bool, path: &str) -> Result<Vec<Record>, RecordsError> {
    let parsed = if yaml {
        RecordsFile::from_yaml(contents)
    } else {
        RecordsFile::from_json(contents)
    };
    let records = parsed
        .map_err(|message| RecordsError::Parse {
            path: path.to_string(),
            message,
        })?
        .into_records();
    validate_records(&records)?;
    Ok(records)
}

pub fn validate_records(records: &[Record]) -> Result<(), RecordsError> {
    let mut seen: HashSet<&str> = HashSet::new();
    for record in records {
        let id = record.id.trim();
        if id.is_empty() {
            return Err(RecordsError::EmptyId);
        }
        if !seen.insert(id) {
            return Err(RecordsError::DuplicateId { id: id.to_string() });
        }
    }
    Ok(())
}

pub async fn load_records(path: &Path) -> Result<Vec<Record>, RecordsError> {
    let display = path.display().to_string();
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| RecordsError::Read {
            path: display.clone(),
            source,
        })?;
    let yaml = infer_snapshot_format(&display) == SnapshotFormat::Yaml;
    parse_records(&contents, yaml, &display)
}
