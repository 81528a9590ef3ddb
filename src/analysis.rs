// src/analysis.rs
//! Orchestration of the submit flow: extract, analyze, persist.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::api_client::ApiClient;
use crate::auth::AuthContext;
use crate::dashboard::{self, DashboardSummary};
use crate::error::AnalysisError;
use crate::store::AnalysisStore;
use crate::types::analysis::{AnalysisData, AnalysisRecord, AnalysisSource};

pub struct AnalysisService {
    api: ApiClient,
    store: AnalysisStore,
    auth: Arc<dyn AuthContext>,
}

impl AnalysisService {
    pub fn new(api: ApiClient, store: AnalysisStore, auth: Arc<dyn AuthContext>) -> Self {
        Self { api, store, auth }
    }

    /// Run one extract+analyze round trip over the given resume bytes
    /// and persist the outcome under the signed-in user.
    ///
    /// Persistence is best-effort relative to the returned analysis:
    /// without a signed-in user the save is silently skipped, and a
    /// failed write does not fail the submission. Exactly one remote
    /// round-trip pair per call; no retry; resubmitting the same bytes
    /// creates a new, distinct record.
    pub async fn submit_for_analysis(
        &self,
        bytes: Vec<u8>,
        source: AnalysisSource,
    ) -> Result<AnalysisRecord, AnalysisError> {
        let ocr = match source {
            AnalysisSource::Image => self.api.extract_image(bytes).await?,
            AnalysisSource::Pdf => self.api.extract_pdf(bytes).await?,
        };

        let analysis = self.api.analyze(&ocr.extracted_text, None).await?;

        let record = AnalysisRecord::new(source, ocr.extracted_text, analysis);
        self.persist_record(&record).await;

        Ok(record)
    }

    /// Write the record under the current user's namespace, if any.
    /// Returns whether a write happened.
    async fn persist_record(&self, record: &AnalysisRecord) -> bool {
        let Some(user) = self.auth.current_user() else {
            // Analyze-without-saving degraded mode: no user, no write.
            debug!("No signed-in user; analysis not saved to history");
            return false;
        };

        match self
            .store
            .save_analysis(&user.uid, &record.analysis_id, &record.to_document())
            .await
        {
            Ok(()) => {
                info!("Saved analysis {} for {}", record.analysis_id, user.uid);
                true
            }
            Err(e) => {
                // The analysis itself already succeeded; history is
                // best-effort.
                warn!("Failed to save analysis {}: {}", record.analysis_id, e);
                false
            }
        }
    }

    /// Read back one stored analysis for the signed-in user.
    pub async fn get_analysis_by_id(
        &self,
        analysis_id: &str,
    ) -> Result<AnalysisRecord, AnalysisError> {
        let user = self
            .auth
            .current_user()
            .ok_or(AnalysisError::Unauthenticated)?;

        let doc = self.store.get_analysis_by_id(&user.uid, analysis_id).await?;
        AnalysisRecord::from_document(&doc).map_err(|e| {
            warn!("Stored analysis {} failed to decode: {}", analysis_id, e);
            AnalysisError::MalformedResponse
        })
    }

    /// Load every stored analysis for the signed-in user and fold them
    /// into dashboard state. Records that fail to decode are dropped
    /// from the aggregate rather than failing the batch.
    pub async fn load_dashboard(&self) -> Result<DashboardSummary, AnalysisError> {
        let user = self
            .auth
            .current_user()
            .ok_or(AnalysisError::Unauthenticated)?;

        let docs = self.store.get_analyses(&user.uid).await?;
        Ok(dashboard::aggregate(&decode_batch(&docs)))
    }
}

fn decode_batch(docs: &[serde_json::Value]) -> Vec<AnalysisData> {
    let mut dropped = 0usize;
    let records: Vec<AnalysisData> = docs
        .iter()
        .filter_map(|doc| match AnalysisData::from_document(doc) {
            Ok(data) => Some(data),
            Err(e) => {
                dropped += 1;
                debug!("Dropping undecodable stored analysis: {}", e);
                None
            }
        })
        .collect();

    if dropped > 0 {
        warn!("Dropped {} undecodable analyses from dashboard", dropped);
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthUser;
    use crate::types::analysis::Suggestion;
    use crate::types::response::AnalysisResponse;
    use serde_json::json;

    struct FixedAuth(Option<AuthUser>);

    impl AuthContext for FixedAuth {
        fn current_user(&self) -> Option<AuthUser> {
            self.0.clone()
        }
    }

    fn user() -> AuthUser {
        AuthUser {
            uid: "uid-1".to_string(),
            email: "user@example.com".to_string(),
        }
    }

    async fn service(auth: FixedAuth) -> (AnalysisService, AnalysisStore) {
        let store = AnalysisStore::open_in_memory().await.unwrap();
        let api = ApiClient::new("http://127.0.0.1:9".to_string(), 5).unwrap();
        (
            AnalysisService::new(api, store.clone(), Arc::new(auth)),
            store,
        )
    }

    fn record() -> AnalysisRecord {
        AnalysisRecord::new(
            AnalysisSource::Pdf,
            "resume text".to_string(),
            AnalysisResponse {
                score: 90,
                summary: "Strong".to_string(),
                suggestions: vec![Suggestion {
                    category: "Skills".to_string(),
                    issue: "Missing keywords".to_string(),
                    recommendation: "Mirror the posting".to_string(),
                }],
            },
        )
    }

    #[tokio::test]
    async fn persist_is_skipped_without_a_user() {
        let (svc, store) = service(FixedAuth(None)).await;
        let saved = svc.persist_record(&record()).await;
        assert!(!saved);
        assert!(store.get_analyses("uid-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn persist_writes_under_the_signed_in_user() {
        let (svc, store) = service(FixedAuth(Some(user()))).await;
        let rec = record();
        assert!(svc.persist_record(&rec).await);

        let docs = store.get_analyses("uid-1").await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(
            AnalysisRecord::from_document(&docs[0]).unwrap(),
            rec
        );
    }

    #[tokio::test]
    async fn persist_failure_does_not_propagate() {
        let (svc, _store) = service(FixedAuth(Some(user()))).await;
        let rec = record();
        assert!(svc.persist_record(&rec).await);
        // Same id again: the write is rejected, the call still returns.
        assert!(!svc.persist_record(&rec).await);
    }

    #[tokio::test]
    async fn reads_require_a_signed_in_user() {
        let (svc, _store) = service(FixedAuth(None)).await;
        assert_eq!(
            svc.get_analysis_by_id("123").await.unwrap_err(),
            AnalysisError::Unauthenticated
        );
        assert_eq!(
            svc.load_dashboard().await.unwrap_err(),
            AnalysisError::Unauthenticated
        );
    }

    #[tokio::test]
    async fn get_analysis_by_id_decodes_the_stored_document() {
        let (svc, store) = service(FixedAuth(Some(user()))).await;
        let rec = record();
        store
            .save_analysis("uid-1", &rec.analysis_id, &rec.to_document())
            .await
            .unwrap();

        let fetched = svc.get_analysis_by_id(&rec.analysis_id).await.unwrap();
        assert_eq!(fetched, rec);

        assert_eq!(
            svc.get_analysis_by_id("missing").await.unwrap_err(),
            AnalysisError::NotFound
        );
    }

    #[tokio::test]
    async fn dashboard_drops_undecodable_records_without_failing() {
        let (svc, store) = service(FixedAuth(Some(user()))).await;
        store
            .save_analysis(
                "uid-1",
                "100",
                &json!({"analysisId": "100", "score": 80, "createdAt": 100_i64, "suggestionCount": 2}),
            )
            .await
            .unwrap();
        store
            .save_analysis("uid-1", "200", &json!({"garbage": true}))
            .await
            .unwrap();
        store
            .save_analysis(
                "uid-1",
                "300",
                &json!({"analysisId": "300", "score": 60, "createdAt": 300_i64}),
            )
            .await
            .unwrap();

        let summary = svc.load_dashboard().await.unwrap();
        assert_eq!(summary.total_edits, 2);
        assert_eq!(summary.total_corrections, 2);
        assert_eq!(summary.ai_checker_percent, 70);
        assert_eq!(summary.history[0].version_label, "Resume_Version_2");
    }
}
