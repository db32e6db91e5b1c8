//! Record Store - append-only experience log backed by one JSON file
//!
//! The file holds a pretty-printed JSON array of [`ExperienceRecord`]s and is
//! created as `[]` on first use. Every append rewrites the whole file through a
//! sibling temp file and a rename, under an async mutex that is the single
//! writer for this process. Reads take no lock: they only ever see a complete
//! file.

use crate::error::{Error, Result};
use crate::types::ExperienceRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Minimum trimmed length of a search term
pub const MIN_SEARCH_LEN: usize = 2;

/// Persistent experience store
pub struct RecordStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

/// Optional predicates for [`RecordStore::filter`]
///
/// A predicate that is absent, blank or `"all"` matches everything.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordFilter {
    pub company: Option<String>,
    pub role: Option<String>,
    pub difficulty: Option<String>,
    pub sentiment: Option<String>,
}

impl RecordFilter {
    pub fn matches(&self, record: &ExperienceRecord) -> bool {
        if let Some(company) = active(&self.company) {
            if record.company.is_empty() || !record.company.to_lowercase().contains(&company) {
                return false;
            }
        }
        if let Some(role) = active(&self.role) {
            if record.role.is_empty() || !record.role.to_lowercase().contains(&role) {
                return false;
            }
        }
        if let Some(difficulty) = active(&self.difficulty) {
            match &record.difficulty {
                Some(d) if d.as_str().to_lowercase() == difficulty => {}
                _ => return false,
            }
        }
        if let Some(sentiment) = active(&self.sentiment) {
            if record.feedback_sentiment.map(|s| s.as_str()) != Some(sentiment.as_str()) {
                return false;
            }
        }
        true
    }
}

/// Lower-cased predicate value, or None when it should not filter
fn active(value: &Option<String>) -> Option<String> {
    let value = value.as_deref()?.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("all") {
        None
    } else {
        Some(value.to_lowercase())
    }
}

/// Aggregate view over the whole store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub total: usize,
    pub nlp_processed: usize,
    pub companies: Vec<String>,
    pub roles: Vec<String>,
    pub difficulties: Vec<String>,
    pub sentiments: Vec<String>,
    pub verdicts: Vec<String>,
    pub sentiment_distribution: BTreeMap<String, usize>,
    pub verdict_distribution: BTreeMap<String, usize>,
    pub difficulty_distribution: BTreeMap<String, usize>,
}

impl Statistics {
    pub fn from_records(records: &[ExperienceRecord]) -> Self {
        let mut stats = Statistics {
            total: records.len(),
            ..Default::default()
        };

        for record in records {
            if record.nlp_processed {
                stats.nlp_processed += 1;
            }

            push_distinct(&mut stats.companies, &record.company);
            push_distinct(&mut stats.roles, &record.role);
            if let Some(sentiment) = record.feedback_sentiment {
                push_distinct(&mut stats.sentiments, sentiment.as_str());
            }

            let difficulty = record.difficulty.as_ref().map(|d| d.as_str());
            let verdict = record.verdict.as_ref().map(|v| v.as_str());
            push_distinct(&mut stats.difficulties, difficulty.unwrap_or_default());
            push_distinct(&mut stats.verdicts, verdict.unwrap_or_default());

            *stats
                .sentiment_distribution
                .entry(record.feedback_sentiment.unwrap_or_default().to_string())
                .or_default() += 1;
            *stats
                .verdict_distribution
                .entry(verdict.unwrap_or("Unknown").to_string())
                .or_default() += 1;
            *stats
                .difficulty_distribution
                .entry(difficulty.unwrap_or("Unknown").to_string())
                .or_default() += 1;
        }

        stats
    }
}

fn push_distinct(values: &mut Vec<String>, value: &str) {
    if !value.is_empty() && !values.iter().any(|v| v == value) {
        values.push(value.to_string());
    }
}

/// Processing-path counts reported by the health endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCounts {
    pub total_experiences: usize,
    pub nlp_processed: usize,
    pub fallback_processed: usize,
}

impl HealthCounts {
    pub fn from_records(records: &[ExperienceRecord]) -> Self {
        let nlp_processed = records.iter().filter(|r| r.nlp_processed).count();
        Self {
            total_experiences: records.len(),
            nlp_processed,
            fallback_processed: records.len() - nlp_processed,
        }
    }
}

/// Outcome of a bulk import
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: Vec<String>,
}

impl RecordStore {
    /// Create a store over the given file. Nothing is touched until first use.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Get the backing file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All records in insertion order, initializing the file if needed
    pub async fn load(&self) -> Result<Vec<ExperienceRecord>> {
        if let Some(records) = self.read_records().await? {
            return Ok(records);
        }

        let _guard = self.write_lock.lock().await;
        // Another task may have initialized or appended while we waited
        if let Some(records) = self.read_records().await? {
            return Ok(records);
        }
        self.write_records(&[]).await?;
        info!(path = %self.path.display(), "Initialized empty experience store");
        Ok(Vec::new())
    }

    /// Append one record, rewriting the file
    pub async fn append(&self, record: ExperienceRecord) -> Result<()> {
        ensure_storable(&record)?;

        let _guard = self.write_lock.lock().await;
        let mut records = self.read_records().await?.unwrap_or_default();
        if records.iter().any(|r| r.id == record.id) {
            return Err(Error::DuplicateId(record.id));
        }

        let id = record.id.clone();
        records.push(record);
        self.write_records(&records).await?;
        debug!(experience_id = %id, total = records.len(), "Appended experience");
        Ok(())
    }

    /// Append many records in a single rewrite, skipping ones that would
    /// break the store invariants.
    pub async fn import(&self, incoming: Vec<ExperienceRecord>) -> Result<ImportReport> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.read_records().await?.unwrap_or_default();
        let mut report = ImportReport::default();

        for record in incoming {
            let duplicate = records.iter().any(|r| r.id == record.id);
            if duplicate || ensure_storable(&record).is_err() {
                report.skipped.push(record.id);
                continue;
            }
            records.push(record);
            report.imported += 1;
        }

        if report.imported > 0 {
            self.write_records(&records).await?;
        }
        info!(
            imported = report.imported,
            skipped = report.skipped.len(),
            "Imported experiences"
        );
        Ok(report)
    }

    /// Get a specific record by ID
    pub async fn find_by_id(&self, id: &str) -> Result<Option<ExperienceRecord>> {
        let records = self.load().await?;
        Ok(records.into_iter().find(|r| r.id == id))
    }

    pub async fn filter(&self, filter: &RecordFilter) -> Result<Vec<ExperienceRecord>> {
        let records = self.load().await?;
        let filtered: Vec<_> = records.into_iter().filter(|r| filter.matches(r)).collect();
        debug!(?filter, matched = filtered.len(), "Filtered experiences");
        Ok(filtered)
    }

    /// Case-insensitive free-text search
    pub async fn search(&self, term: &str) -> Result<Vec<ExperienceRecord>> {
        let term = term.trim();
        if term.chars().count() < MIN_SEARCH_LEN {
            return Err(Error::InvalidQuery(format!(
                "Search query must be at least {} characters",
                MIN_SEARCH_LEN
            )));
        }

        let needle = term.to_lowercase();
        let records = self.load().await?;
        Ok(records
            .into_iter()
            .filter(|r| searchable_text(r).contains(&needle))
            .collect())
    }

    pub async fn stats(&self) -> Result<Statistics> {
        let records = self.load().await?;
        Ok(Statistics::from_records(&records))
    }

    pub async fn health(&self) -> Result<HealthCounts> {
        let records = self.load().await?;
        Ok(HealthCounts::from_records(&records))
    }

    // --- File I/O ---

    /// Parsed file contents, or None if the file does not exist yet
    async fn read_records(&self) -> Result<Option<Vec<ExperienceRecord>>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::StorageUnavailable(format!(
                    "failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        serde_json::from_str(&raw).map(Some).map_err(|e| {
            Error::StorageUnavailable(format!("failed to parse {}: {}", self.path.display(), e))
        })
    }

    async fn write_records(&self, records: &[ExperienceRecord]) -> Result<()> {
        let storage_err = |action: &str, e: &dyn std::fmt::Display| {
            Error::StorageUnavailable(format!(
                "failed to {} {}: {}",
                action,
                self.path.display(),
                e
            ))
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| storage_err("create directory for", &e))?;
        }

        let json = serde_json::to_string_pretty(records).map_err(|e| storage_err("serialize", &e))?;
        let tmp = self.temp_path();
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| storage_err("write", &e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| storage_err("replace", &e))?;
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "experiences.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

fn ensure_storable(record: &ExperienceRecord) -> Result<()> {
    if record.id.trim().is_empty() {
        return Err(Error::Validation("Experience id is required".to_string()));
    }
    if record.company.trim().is_empty() || record.role.trim().is_empty() {
        return Err(Error::Validation(
            "Company and role are required fields".to_string(),
        ));
    }
    Ok(())
}

/// Lower-cased haystack used by [`RecordStore::search`]
fn searchable_text(record: &ExperienceRecord) -> String {
    let mut parts: Vec<&str> = vec![
        record.company.as_str(),
        record.role.as_str(),
        record.narrative().unwrap_or_default(),
        record.verdict.as_ref().map(|v| v.as_str()).unwrap_or_default(),
        record.difficulty.as_ref().map(|d| d.as_str()).unwrap_or_default(),
    ];
    parts.extend(record.highlights.iter().map(String::as_str));
    parts.extend(record.raw_questions.iter().map(String::as_str));
    parts.extend(record.extracted_insights.technologies.iter().map(String::as_str));
    parts.join(" ").to_lowercase()
}
