//! Dashboard composer
//!
//! Assembles one student's view: the student, their school, the peers
//! placed at the same school, and the FAQ. FAQ loading is isolated so the
//! practice data still renders when discussion content cannot be read.

use crate::error::{PracticumError, Result};
use crate::storage::{paths, DocumentStore};
use crate::types::{Dashboard, FaqItem, Fields, School, Student};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Where the FAQ may come from, in lookup order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaqSource {
    /// `content/faq` singleton with an `items` sequence
    ContentRecord,
    /// Plain `faq` collection, consulted only when the singleton is absent
    FaqCollection,
}

impl FaqSource {
    pub const CHAIN: [FaqSource; 2] = [FaqSource::ContentRecord, FaqSource::FaqCollection];
}

fn decode_items(record: &Fields) -> Vec<FaqItem> {
    record
        .get("items")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(FaqItem::from_value).collect())
        .unwrap_or_default()
}

/// Dashboard composition service
pub struct DashboardComposer {
    store: Arc<dyn DocumentStore>,
}

impl DashboardComposer {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Look up a student by (trimmed) id; `None` when blank or no such record
    pub async fn find_student(&self, student_id: &str) -> Result<Option<Student>> {
        if student_id.trim().is_empty() {
            return Ok(None);
        }
        let id = paths::normalize_id("student id", student_id)?;
        let record = self.store.get(&paths::student(&id)).await?;
        Ok(record.map(|fields| Student::from_fields(id, &fields)))
    }

    /// Everything the student's dashboard shows
    pub async fn compose_dashboard(&self, student_id: &str) -> Result<Dashboard> {
        let id = paths::normalize_id("student id", student_id)?;
        let user = self
            .find_student(&id)
            .await?
            .ok_or_else(|| PracticumError::NotFound(format!("student {}", id)))?;

        let (school, team) = match user.assigned_school() {
            Some(school_id) => tokio::try_join!(self.school(school_id), self.team(&user, school_id))?,
            None => (None, Vec::new()),
        };

        let faq = match self.load_faq().await {
            Ok(faq) => faq,
            Err(e) => {
                warn!("Failed to load FAQ: {}", e);
                Vec::new()
            }
        };

        debug!(
            "Dashboard for {}: school={}, team={}, faq={}",
            user.id,
            school.is_some(),
            team.len(),
            faq.len()
        );
        Ok(Dashboard {
            user,
            school,
            team,
            faq,
        })
    }

    async fn school(&self, school_id: &str) -> Result<Option<School>> {
        let record = self.store.get(&paths::school(school_id)).await?;
        Ok(record.map(|fields| School::from_fields(school_id, &fields)))
    }

    async fn team(&self, user: &Student, school_id: &str) -> Result<Vec<Student>> {
        let peers = self
            .store
            .query_eq(paths::STUDENTS, "schoolId", school_id)
            .await?;
        Ok(peers
            .iter()
            .filter(|doc| doc.id != user.id)
            .map(|doc| Student::from_fields(doc.id.clone(), &doc.fields))
            .collect())
    }

    /// Resolve the FAQ through [`FaqSource::CHAIN`]
    pub async fn load_faq(&self) -> Result<Vec<FaqItem>> {
        for source in FaqSource::CHAIN {
            if let Some(items) = self.faq_from(source).await? {
                debug!("FAQ resolved from {:?}", source);
                return Ok(items);
            }
        }
        Ok(Vec::new())
    }

    /// Items from one source; `None` means "not present, try the next"
    async fn faq_from(&self, source: FaqSource) -> Result<Option<Vec<FaqItem>>> {
        match source {
            FaqSource::ContentRecord => {
                let record = self.store.get(&paths::faq_content()).await?;
                Ok(record.as_ref().map(decode_items))
            }
            FaqSource::FaqCollection => {
                let docs = self.store.list(paths::FAQ).await?;
                Ok(Some(
                    docs.into_iter()
                        .filter_map(|doc| FaqItem::from_value(&Value::Object(doc.fields)))
                        .collect(),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::InMemoryStore;
    use crate::storage::DocRef;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    async fn store_with_students() -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        for (id, data) in [
            ("1", json!({ "name": "Jana", "schoolId": "s1", "week": "1. týden" })),
            ("2", json!({ "name": "Petr", "schoolId": "s1" })),
            ("3", json!({ "name": "Eva", "schoolId": "s2" })),
            ("4", json!({ "name": "Bez školy", "schoolId": "" })),
            ("5", json!({ "name": "Ztracená škola", "schoolId": "s404" })),
        ] {
            store.set(&paths::student(id), fields(data)).await.unwrap();
        }
        store
            .set(&paths::school("s1"), fields(json!({ "name": "SOŠ Benešov" })))
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_compose_full_dashboard() {
        let store = store_with_students().await;
        store
            .set(
                &paths::faq_content(),
                fields(json!({ "items": [{ "q": "Kdy?", "a": "Teď." }] })),
            )
            .await
            .unwrap();
        let composer = DashboardComposer::new(store);

        let dashboard = composer.compose_dashboard(" 1 ").await.unwrap();
        assert_eq!(dashboard.user.id, "1");
        assert_eq!(dashboard.user.week.as_deref(), Some("1. týden"));
        assert_eq!(dashboard.school.unwrap().name.as_deref(), Some("SOŠ Benešov"));
        let team: Vec<_> = dashboard.team.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(team, vec!["2"]);
        assert_eq!(dashboard.faq, vec![FaqItem { q: "Kdy?".into(), a: "Teď.".into() }]);
    }

    #[tokio::test]
    async fn test_unresolved_school() {
        let composer = DashboardComposer::new(store_with_students().await);

        let dashboard = composer.compose_dashboard("5").await.unwrap();
        assert!(dashboard.school.is_none());
        assert!(dashboard.team.is_empty());

        let dashboard = composer.compose_dashboard("4").await.unwrap();
        assert!(dashboard.school.is_none());
        assert!(dashboard.team.is_empty());
    }

    #[tokio::test]
    async fn test_missing_student() {
        let composer = DashboardComposer::new(store_with_students().await);
        let result = composer.compose_dashboard("404").await;
        assert!(matches!(result, Err(PracticumError::NotFound(_))));
        assert_eq!(composer.find_student("404").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_faq_fallback_collection() {
        let store = store_with_students().await;
        store
            .set(&DocRef::new(paths::FAQ, "a"), fields(json!({ "q": "Kolik hodin?", "a": "15." })))
            .await
            .unwrap();
        let composer = DashboardComposer::new(store.clone());

        let faq = composer.load_faq().await.unwrap();
        assert_eq!(faq.len(), 1);
        assert_eq!(faq[0].q, "Kolik hodin?");

        // An existing singleton wins even with no items
        store.set(&paths::faq_content(), Fields::new()).await.unwrap();
        assert!(composer.load_faq().await.unwrap().is_empty());
    }
}
