//! Experience analysis
//!
//! Two producers of [`ExperienceRecord`]s:
//! - [`external::ExternalAnalyzer`] runs the NLP process and may fail
//! - [`heuristic`] never fails and backs the external one up

pub mod external;
pub mod heuristic;

use crate::error::AnalyzerError;
use crate::types::{ExperienceRecord, Submission};

pub use external::{Artifacts, ExternalAnalyzer, Stage};
pub use heuristic::fallback_record;

/// Something that can turn a validated submission into an enriched record
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, submission: &Submission) -> Result<ExperienceRecord, AnalyzerError>;
}
