//! Interview Insights - Interview Experience Ingestion Library
//!
//! Turns free-text interview write-ups into structured records:
//! - Append-only JSON record store with filter, search and statistics
//! - External NLP analyzer run as a subprocess, one run per submission
//! - Keyword heuristic fallback whenever the analyzer fails
//! - HTTP API for submitting and browsing experiences
//!
//! # Example
//!
//! ```ignore
//! use interview_insights::{ExternalAnalyzer, IngestionService, RecordStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = Arc::new(RecordStore::new("data/processed_experiences.json"));
//!     let analyzer = Arc::new(
//!         ExternalAnalyzer::new("python3", "data/artifacts")
//!             .with_script("scripts/process_experience_nlp.py"),
//!     );
//!     let service = IngestionService::new(store, analyzer);
//!     let record = service
//!         .submit(serde_json::json!({"company": "Acme", "role": "Engineer"}))
//!         .await?;
//!     println!("{} nlp_processed={}", record.id, record.nlp_processed);
//!     Ok(())
//! }
//! ```

// Core modules
pub mod types;
pub mod error;
pub mod config;
pub mod store;
pub mod analysis;
pub mod pipeline;

// Surfaces
pub mod server;
pub mod cli;

// Re-export commonly used types for convenience
pub use types::{
    Difficulty,
    ExperienceRecord,
    SentimentLabel,
    Submission,
    Verdict,
};

pub use error::{AnalyzerError, Error, Result};

pub use config::Config;

pub use store::{RecordFilter, RecordStore, Statistics};

pub use analysis::{Analyzer, ExternalAnalyzer};

pub use pipeline::IngestionService;

pub use server::{
    ServerState,
    router,
    start as start_server,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get the library info
pub fn info() -> String {
    format!("{} v{} - Interview Experience Ingestion Library", NAME, VERSION)
}
