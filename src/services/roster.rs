//! Roster aggregation and reconciliation engine
//!
//! Joins students, schools and each student's ledger into per-student
//! statistics, reconciles the stored roster against an authoritative id
//! list, and keeps the import provenance record.
//!
//! The two fan-outs here have different failure policies. Per-student log
//! reads feed a display, so one failure degrades that student to 0 hours
//! and the rest of the roster still renders. Reconciliation deletes are
//! writes, so any failure fails the call rather than under-reporting.

use crate::error::{PracticumError, Result};
use crate::services::ledger::{total_hours, PracticeLedger};
use crate::storage::{paths, DocumentStore};
use crate::timestamp;
use crate::types::{
    CompletionStatus, Fields, ImportHistory, Student, StudentStats, SENTINEL_STUDENT_ID,
    UNKNOWN_SCHOOL_NAME,
};
use chrono::Utc;
use futures::future::join_all;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// School id to school name
pub type SchoolNames = BTreeMap<String, String>;

/// The externally supplied set of student ids that should remain stored
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuthoritativeIds(Vec<String>);

impl AuthoritativeIds {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(ids.into_iter().map(|s| s.as_ref().trim().to_string()).collect())
    }

    /// Parse a loosely typed upload: an array of strings or integers
    pub fn from_value(value: &Value) -> Result<Self> {
        let items = value.as_array().ok_or_else(|| {
            PracticumError::Validation("Authoritative ids must be an array".to_string())
        })?;

        let ids = items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.trim().to_string()),
                Value::Number(n) if n.is_i64() || n.is_u64() => Ok(n.to_string()),
                other => Err(PracticumError::Validation(format!(
                    "Authoritative id must be a string or integer, got {}",
                    other
                ))),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self(ids))
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

/// Roster aggregation and reconciliation service
pub struct RosterEngine {
    store: Arc<dyn DocumentStore>,
    ledger: Arc<PracticeLedger>,
}

impl RosterEngine {
    pub fn new(store: Arc<dyn DocumentStore>, ledger: Arc<PracticeLedger>) -> Self {
        Self { store, ledger }
    }

    /// Every school's name by id; read failures propagate
    pub async fn list_schools(&self) -> Result<SchoolNames> {
        let schools = self.store.list(paths::SCHOOLS).await?;
        Ok(schools
            .into_iter()
            .filter_map(|doc| match doc.fields.get("name") {
                Some(Value::String(name)) => Some((doc.id, name.clone())),
                _ => None,
            })
            .collect())
    }

    async fn list_students(&self) -> Result<Vec<Student>> {
        let students = self.store.list(paths::STUDENTS).await?;
        Ok(students
            .iter()
            .map(|doc| Student::from_fields(doc.id.clone(), &doc.fields))
            .collect())
    }

    /// Per-student statistics for the whole roster
    pub async fn aggregate_students(&self) -> Result<Vec<StudentStats>> {
        let (students, schools) = tokio::try_join!(self.list_students(), self.list_schools())?;
        debug!("Aggregating {} students across {} schools", students.len(), schools.len());

        let rows = join_all(students.iter().map(|student| self.student_stats(student, &schools))).await;

        info!("Aggregated statistics for {} students", rows.len());
        Ok(rows)
    }

    async fn student_stats(&self, student: &Student, schools: &SchoolNames) -> StudentStats {
        let total = match self.ledger.list_log_entries(&student.id).await {
            Ok(entries) => total_hours(&entries),
            Err(e) => {
                warn!("Failed to fetch logs for student {}: {}", student.id, e);
                0.0
            }
        };
        let goal = student.goal();
        let school_id = student.assigned_school().unwrap_or_default().to_string();
        let school_name = schools
            .get(&school_id)
            .cloned()
            .unwrap_or_else(|| UNKNOWN_SCHOOL_NAME.to_string());

        StudentStats {
            id: student.id.clone(),
            name: student.display_name().to_string(),
            school_id,
            school_name,
            total_hours: total,
            goal_hours: goal,
            status: CompletionStatus::for_hours(total, goal),
        }
    }

    /// Delete every stored student absent from `authoritative`
    ///
    /// The sentinel student is never removed. Returns `"<name> (<id>)"` for
    /// each deleted student. Not transactional: if a delete fails the call
    /// fails, the other deletes still complete, and re-running with the same
    /// ids finishes the job.
    pub async fn reconcile_roster(&self, authoritative: &AuthoritativeIds) -> Result<Vec<String>> {
        let keep: HashSet<&str> = authoritative.as_slice().iter().map(String::as_str).collect();

        let stale: Vec<Student> = self
            .list_students()
            .await?
            .into_iter()
            .filter(|s| !s.is_sentinel() && !keep.contains(s.id.as_str()))
            .collect();

        if stale.is_empty() {
            debug!("Roster already matches the authoritative list");
            return Ok(Vec::new());
        }

        let results = join_all(stale.iter().map(|student| async move {
            self.store.delete(&paths::student(&student.id)).await?;
            Ok::<_, PracticumError>(format!("{} ({})", student.display_name(), student.id))
        }))
        .await;

        let mut deleted = Vec::with_capacity(results.len());
        let mut failures = Vec::new();
        for result in results {
            match result {
                Ok(label) => deleted.push(label),
                Err(e) => failures.push(e.to_string()),
            }
        }

        if !failures.is_empty() {
            warn!(
                "Reconciliation removed {} students before failing on {}",
                deleted.len(),
                failures.len()
            );
            return Err(PracticumError::StoreWrite(format!(
                "{} of {} deletions failed: {}",
                failures.len(),
                stale.len(),
                failures.join("; ")
            )));
        }

        info!("Reconciliation removed {} students", deleted.len());
        Ok(deleted)
    }

    /// Merge fields into an existing student record
    pub async fn update_student(&self, id: &str, partial: Fields) -> Result<()> {
        let id = paths::normalize_id("student id", id)?;
        if let Some(goal) = partial.get("goalHours") {
            let positive = goal.as_f64().map(|g| g.is_finite() && g > 0.0).unwrap_or(false);
            if !positive {
                return Err(PracticumError::Validation(format!(
                    "goalHours must be a positive number, got {}",
                    goal
                )));
            }
        }

        self.store.update(&paths::student(&id), partial).await?;
        info!("Updated student {}", id);
        Ok(())
    }

    /// Delete one student record; the sentinel is refused
    pub async fn delete_student(&self, id: &str) -> Result<()> {
        let id = paths::normalize_id("student id", id)?;
        if id == SENTINEL_STUDENT_ID {
            return Err(PracticumError::ProtectedRecord(format!(
                "student {} cannot be deleted",
                id
            )));
        }

        self.store.delete(&paths::student(&id)).await?;
        info!("Deleted student {}", id);
        Ok(())
    }

    /// Record the latest import, replacing whatever was there
    pub async fn save_import_history(&self, file_name: &str) -> Result<()> {
        let mut fields = Fields::new();
        fields.insert("fileName".into(), Value::String(file_name.to_string()));
        fields.insert("importTimestamp".into(), timestamp::to_value(Utc::now()));

        self.store.merge(&paths::import_history(), fields).await?;
        info!("Recorded import of {}", file_name);
        Ok(())
    }

    pub async fn get_import_history(&self) -> Result<Option<ImportHistory>> {
        let record = self.store.get(&paths::import_history()).await?;
        Ok(record.as_ref().map(ImportHistory::from_fields))
    }
}
