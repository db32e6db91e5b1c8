//! Ingestion service - validates submissions, enriches them and persists the
//! result.
//!
//! External analysis failures never reach the caller: the heuristic analyzer
//! takes over and the record is stored with `nlp_processed = false`.

use crate::analysis::{heuristic, Analyzer};
use crate::error::{AnalyzerError, Error, Result};
use crate::store::RecordStore;
use crate::types::{Difficulty, ExperienceRecord, Submission, Verdict};
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

pub const REQUIRED_FIELDS_MESSAGE: &str = "Company and role are required fields";

/// Drives a submission from request body to stored record
pub struct IngestionService {
    store: Arc<RecordStore>,
    analyzer: Arc<dyn Analyzer>,
}

impl IngestionService {
    pub fn new(store: Arc<RecordStore>, analyzer: Arc<dyn Analyzer>) -> Self {
        Self { store, analyzer }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Validate, enrich and append one submission
    pub async fn submit(&self, body: Value) -> Result<ExperienceRecord> {
        let submission = stamp(validate(parse_submission(body)?)?);
        let id = submission.id.clone().unwrap_or_default();

        // Cheap early check so a clashing id does not cost an analyzer run
        if self.store.find_by_id(&id).await?.is_some() {
            return Err(Error::DuplicateId(id));
        }

        info!(
            experience_id = %id,
            company = %submission.company,
            role = %submission.role,
            has_experience = submission.experience.is_some(),
            "Processing experience submission"
        );

        let record = self.enrich(submission).await;
        let nlp_processed = record.nlp_processed;
        self.store.append(record.clone()).await?;

        info!(experience_id = %id, nlp_processed, "Experience saved");
        Ok(record)
    }

    /// Enrich without persisting, falling back to the heuristic analyzer
    pub async fn enrich(&self, submission: Submission) -> ExperienceRecord {
        match self.analyzer.analyze(&submission).await {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "NLP processing failed, using heuristic fallback");
                heuristic::fallback_record(submission, &e.to_string())
            }
        }
    }

    /// Run the analyzer alone on a fixed synthetic submission
    pub async fn probe(&self) -> std::result::Result<ExperienceRecord, AnalyzerError> {
        self.analyzer.analyze(&synthetic_submission()).await
    }
}

/// Interpret a request body as a submission
pub fn parse_submission(body: Value) -> Result<Submission> {
    if !body.is_object() {
        return Err(Error::Validation(
            "Submission must be a JSON object".to_string(),
        ));
    }
    serde_json::from_value(body)
        .map_err(|e| Error::Validation(format!("Invalid submission: {}", e)))
}

/// Require non-blank company and role
pub fn validate(submission: Submission) -> Result<Submission> {
    if submission.company.trim().is_empty() || submission.role.trim().is_empty() {
        return Err(Error::Validation(REQUIRED_FIELDS_MESSAGE.to_string()));
    }
    Ok(submission)
}

/// Assign the submission timestamp and, if the client sent none, an id
pub fn stamp(mut submission: Submission) -> Submission {
    submission.submitted_at = Some(Utc::now());
    if submission.id.is_none() {
        submission.id = Some(new_experience_id());
    }
    submission
}

/// `exp_<millis>_<random>`; the random part keeps same-millisecond ids apart
pub fn new_experience_id() -> String {
    format!(
        "exp_{}_{}",
        Utc::now().timestamp_millis(),
        &uuid::Uuid::new_v4().simple().to_string()[..8]
    )
}

/// Submission used by the analyzer self-test
pub fn synthetic_submission() -> Submission {
    let mut submission = Submission::new("Test Company", "Test Role").with_experience(
        "This is a test experience for NLP processing. What is your experience with Python? \
         How do you handle difficult situations?",
    );
    submission.id = Some(format!("test_{}", Utc::now().timestamp_millis()));
    submission.verdict = Some(Verdict::Selected);
    submission.difficulty = Some(Difficulty::Medium);
    submission
}
