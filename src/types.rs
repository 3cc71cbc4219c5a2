//! Core data types for the practicum service layer
//!
//! Records arrive from the document store as loosely typed JSON fields. Each
//! type here declares the shape it expects and the named default rules it
//! applies when a field is absent, so no read path relies on ad hoc
//! truthiness checks.

use crate::timestamp;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Raw field map of a stored record
pub type Fields = serde_json::Map<String, Value>;

/// Permanent demo/test student that reconciliation and deletion never remove
pub const SENTINEL_STUDENT_ID: &str = "999999";

/// Practice goal applied when a student has no (valid) `goalHours`
pub const DEFAULT_GOAL_HOURS: f64 = 15.0;

/// Display name used when a student record has no name
pub const UNKNOWN_STUDENT_NAME: &str = "Neznámý";

/// School name used when a student's school reference does not resolve
pub const UNKNOWN_SCHOOL_NAME: &str = "Neznámá škola";

/// Minimum number of characters in a log entry's activity description
pub const MIN_ACTIVITY_CHARS: usize = 5;

/// Inclusive bounds for the hours of a single log entry
pub const MIN_LOG_HOURS: f64 = 0.5;
pub const MAX_LOG_HOURS: f64 = 12.0;

/// Read a text field; blank strings count as absent, numbers are stringified
pub(crate) fn text_field(fields: &Fields, key: &str) -> Option<String> {
    match fields.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Read a numeric field; numeric strings are accepted
pub(crate) fn number_field(fields: &Fields, key: &str) -> Option<f64> {
    let number = match fields.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

fn time_field(fields: &Fields, key: &str) -> Option<DateTime<Utc>> {
    fields.get(key).and_then(timestamp::from_value)
}

fn without_keys(fields: &Fields, keys: &[&str]) -> Fields {
    fields
        .iter()
        .filter(|(k, _)| !keys.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// A student enrolled in field practice
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    /// Externally assigned identity (institutional number)
    pub id: String,

    pub name: Option<String>,

    /// Reference to a [`School`]; `None` when unassigned
    pub school_id: Option<String>,

    pub goal_hours: Option<f64>,

    /// Localised practice-week label written by the import
    pub week: Option<String>,

    /// Any other stored fields, preserved for the dashboard's self view
    #[serde(flatten)]
    pub extra: Fields,
}

impl Student {
    const KNOWN_FIELDS: [&'static str; 5] = ["id", "name", "schoolId", "goalHours", "week"];

    /// Decode a stored student record
    pub fn from_fields(id: impl Into<String>, fields: &Fields) -> Self {
        Self {
            id: id.into(),
            name: text_field(fields, "name"),
            school_id: text_field(fields, "schoolId").map(|s| s.trim().to_string()),
            goal_hours: number_field(fields, "goalHours"),
            week: text_field(fields, "week"),
            extra: without_keys(fields, &Self::KNOWN_FIELDS),
        }
    }

    /// Name, or [`UNKNOWN_STUDENT_NAME`] when absent
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(UNKNOWN_STUDENT_NAME)
    }

    /// Goal hours, or [`DEFAULT_GOAL_HOURS`] when absent or not positive
    pub fn goal(&self) -> f64 {
        self.goal_hours
            .filter(|h| *h > 0.0)
            .unwrap_or(DEFAULT_GOAL_HOURS)
    }

    /// School reference when one is actually assigned
    pub fn assigned_school(&self) -> Option<&str> {
        self.school_id.as_deref().filter(|s| !s.is_empty())
    }

    pub fn is_sentinel(&self) -> bool {
        self.id == SENTINEL_STUDENT_ID
    }
}

/// A practice school
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct School {
    pub id: String,
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Fields,
}

impl School {
    pub fn from_fields(id: impl Into<String>, fields: &Fields) -> Self {
        Self {
            id: id.into(),
            name: text_field(fields, "name"),
            extra: without_keys(fields, &["id", "name"]),
        }
    }
}

/// How a caller may express the date of a practice activity
#[derive(Debug, Clone, PartialEq)]
pub enum DateInput {
    At(DateTime<Utc>),
    Day(NaiveDate),
    Text(String),
}

impl DateInput {
    /// Coerce to a timestamp; `None` when the text is not a readable date
    pub fn resolve(&self) -> Option<DateTime<Utc>> {
        match self {
            DateInput::At(at) => Some(*at),
            DateInput::Day(day) => day
                .and_hms_opt(0, 0, 0)
                .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc)),
            DateInput::Text(text) => timestamp::parse_text(text),
        }
    }
}

impl From<DateTime<Utc>> for DateInput {
    fn from(at: DateTime<Utc>) -> Self {
        DateInput::At(at)
    }
}

impl From<NaiveDate> for DateInput {
    fn from(day: NaiveDate) -> Self {
        DateInput::Day(day)
    }
}

impl From<&str> for DateInput {
    fn from(text: &str) -> Self {
        DateInput::Text(text.to_string())
    }
}

impl From<String> for DateInput {
    fn from(text: String) -> Self {
        DateInput::Text(text)
    }
}

/// A practice activity as submitted, before validation
#[derive(Debug, Clone, PartialEq)]
pub struct NewLogEntry {
    pub date: DateInput,
    pub activity: String,
    pub hours: f64,
}

impl NewLogEntry {
    pub fn new(date: impl Into<DateInput>, activity: impl Into<String>, hours: f64) -> Self {
        Self {
            date: date.into(),
            activity: activity.into(),
            hours,
        }
    }
}

/// One persisted entry of a student's practice ledger
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeLogEntry {
    pub id: String,
    /// `None` when the stored date could not be read
    pub date: Option<DateTime<Utc>>,
    pub activity: String,
    /// Non-numeric or missing stored values decode as 0
    pub hours: f64,
    pub created_at: Option<DateTime<Utc>>,
}

impl PracticeLogEntry {
    pub fn from_fields(id: impl Into<String>, fields: &Fields) -> Self {
        Self {
            id: id.into(),
            date: time_field(fields, "date"),
            activity: text_field(fields, "activity").unwrap_or_default(),
            hours: number_field(fields, "hours").unwrap_or(0.0),
            created_at: time_field(fields, "createdAt"),
        }
    }
}

/// A structured microteaching evaluation; the payload is opaque
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MicroteachingEvaluation {
    pub id: String,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub payload: Fields,
}

impl MicroteachingEvaluation {
    pub fn from_fields(id: impl Into<String>, fields: &Fields) -> Self {
        Self {
            id: id.into(),
            created_at: time_field(fields, "createdAt"),
            payload: without_keys(fields, &["id", "createdAt"]),
        }
    }
}

/// One policy document of the assistant's grounding corpus
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeDocument {
    pub id: String,
    pub filename: String,
    pub content: String,
    pub uploaded_at: Option<DateTime<Utc>>,
}

impl KnowledgeDocument {
    pub fn new(id: impl Into<String>, filename: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            filename: filename.into(),
            content: content.into(),
            uploaded_at: None,
        }
    }

    /// Decode one element of the stored `documents` sequence
    pub fn from_value(value: &Value) -> Option<Self> {
        let fields = value.as_object()?;
        Some(Self {
            id: text_field(fields, "id").unwrap_or_default(),
            filename: text_field(fields, "filename").unwrap_or_default(),
            content: match fields.get("content") {
                Some(Value::String(s)) => s.clone(),
                _ => String::new(),
            },
            uploaded_at: time_field(fields, "uploadedAt"),
        })
    }

    /// Encode in the stored shape
    pub fn to_value(&self) -> Value {
        let mut fields = Fields::new();
        fields.insert("id".into(), Value::String(self.id.clone()));
        fields.insert("filename".into(), Value::String(self.filename.clone()));
        fields.insert("content".into(), Value::String(self.content.clone()));
        if let Some(at) = self.uploaded_at {
            fields.insert("uploadedAt".into(), timestamp::to_value(at));
        }
        Value::Object(fields)
    }
}

/// Provenance of the latest roster import (singleton)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportHistory {
    pub file_name: String,
    pub import_timestamp: Option<DateTime<Utc>>,
}

impl ImportHistory {
    pub fn from_fields(fields: &Fields) -> Self {
        Self {
            file_name: text_field(fields, "fileName").unwrap_or_default(),
            import_timestamp: time_field(fields, "importTimestamp"),
        }
    }
}

/// A question/answer pair shown on the student dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqItem {
    pub q: String,
    pub a: String,
}

impl FaqItem {
    pub fn from_value(value: &Value) -> Option<Self> {
        let fields = value.as_object()?;
        Some(Self {
            q: text_field(fields, "q").unwrap_or_default(),
            a: text_field(fields, "a").unwrap_or_default(),
        })
    }
}

/// Derived practice status; always recomputed, never stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompletionStatus {
    /// Goal met
    #[serde(rename = "Splněno")]
    Completed,

    /// Goal not yet met
    #[serde(rename = "Probíhá")]
    InProgress,
}

impl CompletionStatus {
    pub fn for_hours(total_hours: f64, goal_hours: f64) -> Self {
        if total_hours >= goal_hours {
            CompletionStatus::Completed
        } else {
            CompletionStatus::InProgress
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CompletionStatus::Completed => "Splněno",
            CompletionStatus::InProgress => "Probíhá",
        }
    }
}

impl std::fmt::Display for CompletionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-student row of the administrative roster view
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentStats {
    pub id: String,
    pub name: String,
    pub school_id: String,
    pub school_name: String,
    pub total_hours: f64,
    pub goal_hours: f64,
    pub status: CompletionStatus,
}

/// Everything one student's dashboard shows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub user: Student,
    pub school: Option<School>,
    pub team: Vec<Student>,
    pub faq: Vec<FaqItem>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_student_defaults() {
        let student = Student::from_fields("42", &fields(json!({ "name": "", "schoolId": "" })));

        assert_eq!(student.display_name(), UNKNOWN_STUDENT_NAME);
        assert_eq!(student.goal(), DEFAULT_GOAL_HOURS);
        assert_eq!(student.assigned_school(), None);
    }

    #[test]
    fn test_student_keeps_extra_fields() {
        let student = Student::from_fields(
            "999999",
            &fields(json!({
                "name": "Aneta",
                "schoolId": 17,
                "goalHours": 9,
                "week": "2. týden",
                "email": "aneta@example.cz"
            })),
        );

        assert!(student.is_sentinel());
        assert_eq!(student.assigned_school(), Some("17"));
        assert_eq!(student.goal(), 9.0);
        assert_eq!(student.extra.get("email"), Some(&json!("aneta@example.cz")));
        assert!(!student.extra.contains_key("name"));
    }

    #[test]
    fn test_non_positive_goal_uses_default() {
        let student = Student::from_fields("1", &fields(json!({ "goalHours": 0 })));
        assert_eq!(student.goal(), DEFAULT_GOAL_HOURS);
    }

    #[test]
    fn test_log_entry_coerces_hours() {
        let entry = PracticeLogEntry::from_fields("a", &fields(json!({ "hours": "2.5" })));
        assert_eq!(entry.hours, 2.5);

        let entry = PracticeLogEntry::from_fields("b", &fields(json!({ "hours": "lots" })));
        assert_eq!(entry.hours, 0.0);
        assert_eq!(entry.date, None);
    }

    #[test]
    fn test_status_serializes_localised() {
        assert_eq!(
            serde_json::to_value(CompletionStatus::Completed).unwrap(),
            json!("Splněno")
        );
        assert_eq!(CompletionStatus::for_hours(12.0, 15.0), CompletionStatus::InProgress);
        assert_eq!(CompletionStatus::for_hours(15.0, 15.0), CompletionStatus::Completed);
    }

    #[test]
    fn test_date_input_resolution() {
        assert!(DateInput::from("2026-02-30").resolve().is_none());
        assert!(DateInput::from("2026-02-28").resolve().is_some());
        let day = NaiveDate::from_ymd_opt(2026, 2, 28).unwrap();
        assert_eq!(
            DateInput::from(day).resolve(),
            DateInput::from("2026-02-28").resolve()
        );
    }
}
