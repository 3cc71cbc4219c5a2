//! Practice ledger
//!
//! Append-only log of a student's practice activities and hours, plus the
//! parallel log of microteaching evaluations. Totals are derived on every
//! call and never persisted.

use crate::error::{PracticumError, Result};
use crate::storage::{paths, DocumentStore};
use crate::timestamp;
use crate::types::{
    Fields, MicroteachingEvaluation, NewLogEntry, PracticeLogEntry, MAX_LOG_HOURS,
    MIN_ACTIVITY_CHARS, MIN_LOG_HOURS,
};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, info};

/// Sum of every entry's hours; non-finite values count as 0
pub fn total_hours(entries: &[PracticeLogEntry]) -> f64 {
    entries
        .iter()
        .map(|e| if e.hours.is_finite() { e.hours } else { 0.0 })
        .sum()
}

/// Most recent first; undated records sort last
fn newest_first(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Check a submitted entry before anything is written
pub fn validate_entry(entry: &NewLogEntry) -> Result<DateTime<Utc>> {
    if entry.activity.chars().count() < MIN_ACTIVITY_CHARS {
        return Err(PracticumError::Validation(format!(
            "Activity must be at least {} characters long.",
            MIN_ACTIVITY_CHARS
        )));
    }
    if !(MIN_LOG_HOURS..=MAX_LOG_HOURS).contains(&entry.hours) {
        return Err(PracticumError::Validation(format!(
            "Hours must be between {} and {}.",
            MIN_LOG_HOURS, MAX_LOG_HOURS
        )));
    }
    entry.date.resolve().ok_or_else(|| {
        PracticumError::Validation(format!("Unreadable date: {:?}", entry.date))
    })
}

/// Practice ledger service
pub struct PracticeLedger {
    store: Arc<dyn DocumentStore>,
}

impl PracticeLedger {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Validate and append a log entry, returning its new id
    pub async fn add_log_entry(&self, student_id: &str, entry: NewLogEntry) -> Result<String> {
        let student_id = paths::normalize_id("student id", student_id)?;
        let date = validate_entry(&entry)?;

        let mut fields = Fields::new();
        fields.insert("date".into(), timestamp::to_value(date));
        fields.insert("activity".into(), Value::String(entry.activity));
        fields.insert("hours".into(), Value::from(entry.hours));
        fields.insert("createdAt".into(), timestamp::to_value(Utc::now()));

        let id = self
            .store
            .add(&paths::student_logs(&student_id), fields)
            .await?;
        info!("Added {}h log entry {} for student {}", entry.hours, id, student_id);
        Ok(id)
    }

    /// Log entries ordered by date, most recent first
    pub async fn list_log_entries(&self, student_id: &str) -> Result<Vec<PracticeLogEntry>> {
        let student_id = paths::normalize_id("student id", student_id)?;
        let mut entries: Vec<PracticeLogEntry> = self
            .store
            .list(&paths::student_logs(&student_id))
            .await?
            .iter()
            .map(|doc| PracticeLogEntry::from_fields(doc.id.clone(), &doc.fields))
            .collect();

        entries.sort_by(|a, b| newest_first(a.date, b.date));
        debug!("Loaded {} log entries for student {}", entries.len(), student_id);
        Ok(entries)
    }

    /// Total logged hours for one student
    pub async fn student_total_hours(&self, student_id: &str) -> Result<f64> {
        Ok(total_hours(&self.list_log_entries(student_id).await?))
    }

    /// Append a microteaching evaluation; the payload is stored as given
    pub async fn add_evaluation(&self, student_id: &str, payload: Fields) -> Result<String> {
        let student_id = paths::normalize_id("student id", student_id)?;

        let mut fields = payload;
        fields.insert("createdAt".into(), timestamp::to_value(Utc::now()));

        let id = self
            .store
            .add(&paths::student_microteachings(&student_id), fields)
            .await?;
        info!("Added microteaching evaluation {} for student {}", id, student_id);
        Ok(id)
    }

    /// Evaluations ordered by creation time, most recent first
    pub async fn list_evaluations(&self, student_id: &str) -> Result<Vec<MicroteachingEvaluation>> {
        let student_id = paths::normalize_id("student id", student_id)?;
        let mut evaluations: Vec<MicroteachingEvaluation> = self
            .store
            .list(&paths::student_microteachings(&student_id))
            .await?
            .iter()
            .map(|doc| MicroteachingEvaluation::from_fields(doc.id.clone(), &doc.fields))
            .collect();

        evaluations.sort_by(|a, b| newest_first(a.created_at, b.created_at));
        Ok(evaluations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::InMemoryStore;
    use crate::storage::DocRef;
    use chrono::{NaiveDate, TimeZone};
    use serde_json::json;

    fn ledger() -> (Arc<InMemoryStore>, PracticeLedger) {
        let store = Arc::new(InMemoryStore::new());
        (store.clone(), PracticeLedger::new(store))
    }

    #[tokio::test]
    async fn test_hours_bounds() {
        let (store, ledger) = ledger();

        for hours in [0.49, 12.01, f64::NAN] {
            let result = ledger
                .add_log_entry("42", NewLogEntry::new("2026-03-02", "Náslech v hodině", hours))
                .await;
            assert!(matches!(result, Err(PracticumError::Validation(_))), "{}", hours);
        }
        assert_eq!(store.write_count(), 0);

        for hours in [0.5, 12.0] {
            ledger
                .add_log_entry("42", NewLogEntry::new("2026-03-02", "Náslech v hodině", hours))
                .await
                .unwrap();
        }
        assert_eq!(store.write_count(), 2);
    }

    #[tokio::test]
    async fn test_activity_length() {
        let (_, ledger) = ledger();

        let short = ledger
            .add_log_entry("42", NewLogEntry::new("2026-03-02", "abcd", 2.0))
            .await;
        assert!(matches!(short, Err(PracticumError::Validation(_))));

        ledger
            .add_log_entry("42", NewLogEntry::new("2026-03-02", "abcde", 2.0))
            .await
            .unwrap();
        // Counted in characters, not bytes
        ledger
            .add_log_entry("42", NewLogEntry::new("2026-03-02", "účast", 2.0))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_missing_student_id() {
        let (_, ledger) = ledger();
        let result = ledger
            .add_log_entry("  ", NewLogEntry::new("2026-03-02", "Výstup v hodině", 2.0))
            .await;
        assert!(matches!(result, Err(PracticumError::MissingIdentifier(_))));

        let result = ledger.list_log_entries("").await;
        assert!(matches!(result, Err(PracticumError::MissingIdentifier(_))));
    }

    #[tokio::test]
    async fn test_unreadable_date_rejected() {
        let (_, ledger) = ledger();
        let result = ledger
            .add_log_entry("42", NewLogEntry::new("příští týden", "Výstup v hodině", 2.0))
            .await;
        assert!(matches!(result, Err(PracticumError::Validation(_))));
    }

    #[tokio::test]
    async fn test_list_orders_newest_first_across_shapes() {
        let (store, ledger) = ledger();
        let day = NaiveDate::from_ymd_opt(2026, 3, 3).unwrap();
        ledger
            .add_log_entry("42", NewLogEntry::new(day, "Výstup v hodině", 2.0))
            .await
            .unwrap();

        // Records written by other tools carry other temporal shapes
        let logs = paths::student_logs("42");
        store
            .set(
                &DocRef::new(logs.clone(), "legacy-text"),
                json!({ "date": "2026-03-05", "activity": "Náslech", "hours": 1 })
                    .as_object()
                    .cloned()
                    .unwrap(),
            )
            .await
            .unwrap();
        store
            .set(
                &DocRef::new(logs, "undated"),
                json!({ "activity": "Porada", "hours": "1.5" })
                    .as_object()
                    .cloned()
                    .unwrap(),
            )
            .await
            .unwrap();

        let entries = ledger.list_log_entries("42").await.unwrap();
        let ids: Vec<_> = entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids[0], "legacy-text");
        assert_eq!(ids[2], "undated");
        assert_eq!(
            entries[1].date,
            Some(Utc.with_ymd_and_hms(2026, 3, 3, 0, 0, 0).unwrap())
        );
        assert_eq!(total_hours(&entries), 4.5);
    }

    #[tokio::test]
    async fn test_scenario_goal_crossing() {
        let (_, ledger) = ledger();
        for hours in [3.0, 5.0, 4.0] {
            ledger
                .add_log_entry("42", NewLogEntry::new("2026-03-02", "Výstup v hodině", hours))
                .await
                .unwrap();
        }
        assert_eq!(ledger.student_total_hours("42").await.unwrap(), 12.0);

        ledger
            .add_log_entry("42", NewLogEntry::new("2026-03-09", "Výstup v hodině", 3.5))
            .await
            .unwrap();
        assert_eq!(ledger.student_total_hours("42").await.unwrap(), 15.5);
    }

    #[tokio::test]
    async fn test_evaluations_newest_first() {
        let (_, ledger) = ledger();
        let first = ledger
            .add_evaluation("42", json!({ "topic": "Úvod" }).as_object().cloned().unwrap())
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = ledger
            .add_evaluation(
                "42",
                json!({ "topic": "Opakování", "createdAt": "ignored" })
                    .as_object()
                    .cloned()
                    .unwrap(),
            )
            .await
            .unwrap();

        let evaluations = ledger.list_evaluations("42").await.unwrap();
        assert_eq!(evaluations.len(), 2);
        assert_eq!(evaluations[0].id, second);
        assert_eq!(evaluations[1].id, first);
        assert!(evaluations[0].created_at.is_some());
        assert_eq!(evaluations[0].payload.get("topic"), Some(&json!("Opakování")));
    }

    #[test]
    fn test_total_hours_of_nothing() {
        assert_eq!(total_hours(&[]), 0.0);
    }
}
