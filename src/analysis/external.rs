//! Enrichment orchestrator for the external NLP analyzer
//!
//! One submission maps to one run of the analyzer process:
//! - the submission is written as a one-element JSON array to a transient
//!   input artifact
//! - the process is spawned with the input and output artifact paths
//! - its exit is awaited for at most the configured timeout
//! - the first record of the output artifact becomes the enriched record
//!
//! Both artifacts are removed whatever the outcome. The process is never
//! retried; any failure is reported as an [`AnalyzerError`] for the caller to
//! fall back on.

use crate::analysis::Analyzer;
use crate::config::{AnalyzerConfig, Config};
use crate::error::AnalyzerError;
use crate::types::{ExperienceRecord, Submission};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Progress of a single enrichment run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    TempArtifactsWritten,
    ExternalProcessRunning,
    Succeeded,
    FailedRecoverable,
    Finalized,
}

/// Input/output file pair for one run
#[derive(Debug, Clone)]
pub struct Artifacts {
    pub input: PathBuf,
    pub output: PathBuf,
}

impl Artifacts {
    /// Allocate artifact paths keyed by time plus a random suffix, so two
    /// submissions in the same millisecond still get distinct files.
    pub fn allocate(dir: &Path) -> Self {
        let key = format!(
            "{}_{}",
            Utc::now().timestamp_millis(),
            &uuid::Uuid::new_v4().simple().to_string()[..8]
        );
        Self {
            input: dir.join(format!("temp_experience_{}.json", key)),
            output: dir.join(format!("temp_processed_{}.json", key)),
        }
    }

    /// Best-effort removal; failures are logged and swallowed
    pub async fn cleanup(&self) {
        for path in [&self.input, &self.output] {
            match tokio::fs::remove_file(path).await {
                Ok(()) => debug!(path = %path.display(), "Removed artifact"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => debug!(path = %path.display(), error = %e, "Failed to remove artifact"),
            }
        }
    }
}

/// Runs the external analyzer as a subprocess
#[derive(Debug, Clone)]
pub struct ExternalAnalyzer {
    enabled: bool,
    program: PathBuf,
    args: Vec<String>,
    script: Option<PathBuf>,
    artifact_dir: PathBuf,
    timeout: Duration,
}

impl ExternalAnalyzer {
    /// Create an analyzer that runs `program <input> <output>`
    pub fn new(program: impl Into<PathBuf>, artifact_dir: impl Into<PathBuf>) -> Self {
        Self {
            enabled: true,
            program: program.into(),
            args: Vec::new(),
            script: None,
            artifact_dir: artifact_dir.into(),
            timeout: Duration::from_secs(crate::config::DEFAULT_ANALYZER_TIMEOUT_SECS),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let AnalyzerConfig {
            enabled,
            program,
            args,
            script,
            timeout_secs,
        } = config.analyzer.clone();

        Self {
            enabled,
            program,
            args,
            script: script.filter(|s| !s.as_os_str().is_empty()),
            artifact_dir: config.storage.artifact_dir.clone(),
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// Script passed to the program ahead of the artifact paths
    pub fn with_script(mut self, script: impl Into<PathBuf>) -> Self {
        self.script = Some(script.into());
        self
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn artifact_dir(&self) -> &Path {
        &self.artifact_dir
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run the analyzer once for a submission
    pub async fn process(
        &self,
        submission: &Submission,
    ) -> Result<ExperienceRecord, AnalyzerError> {
        if !self.enabled {
            return Err(AnalyzerError::Disabled);
        }

        let started = Instant::now();
        let artifacts = Artifacts::allocate(&self.artifact_dir);
        trace_stage(Stage::Init, &artifacts);

        let result = self.run(submission, &artifacts).await;
        match &result {
            Ok(_) => trace_stage(Stage::Succeeded, &artifacts),
            Err(e) => {
                trace_stage(Stage::FailedRecoverable, &artifacts);
                warn!(error = %e, "External analyzer failed");
            }
        }

        artifacts.cleanup().await;
        trace_stage(Stage::Finalized, &artifacts);

        if result.is_ok() {
            info!(
                duration_ms = started.elapsed().as_millis() as u64,
                "NLP processing completed"
            );
        }
        result
    }

    async fn run(
        &self,
        submission: &Submission,
        artifacts: &Artifacts,
    ) -> Result<ExperienceRecord, AnalyzerError> {
        if let Some(script) = &self.script {
            if !tokio::fs::try_exists(script).await.unwrap_or(false) {
                return Err(AnalyzerError::ScriptMissing(script.clone()));
            }
        }

        tokio::fs::create_dir_all(&self.artifact_dir).await?;
        let payload =
            serde_json::to_vec_pretty(&[submission]).map_err(AnalyzerError::Encode)?;
        tokio::fs::write(&artifacts.input, payload).await?;
        trace_stage(Stage::TempArtifactsWritten, artifacts);

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(script) = &self.script {
            cmd.arg(script);
        }
        cmd.arg(&artifacts.input)
            .arg(&artifacts.output)
            .env("PYTHONUNBUFFERED", "1")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(AnalyzerError::SpawnFailed)?;
        trace_stage(Stage::ExternalProcessRunning, artifacts);

        // Dropping the wait future on timeout drops the child, which kills it
        let output = match timeout(self.timeout, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => return Err(AnalyzerError::Timeout(self.timeout)),
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        debug!(
            exit_code = ?output.status.code(),
            stdout = %stdout.trim(),
            stderr = %stderr.trim(),
            "Analyzer process exited"
        );

        if !output.status.success() {
            return Err(AnalyzerError::NonZeroExit {
                code: output.status.code(),
                stderr: stderr.trim().to_string(),
            });
        }

        let raw = match tokio::fs::read(&artifacts.output).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AnalyzerError::OutputMissing)
            }
            Err(e) => return Err(e.into()),
        };

        let records: Vec<ExperienceRecord> =
            serde_json::from_slice(&raw).map_err(AnalyzerError::OutputMalformed)?;
        let record = records.into_iter().next().ok_or(AnalyzerError::EmptyResult)?;

        Ok(complete_from_submission(record, submission))
    }
}

#[async_trait::async_trait]
impl Analyzer for ExternalAnalyzer {
    async fn analyze(&self, submission: &Submission) -> Result<ExperienceRecord, AnalyzerError> {
        self.process(submission).await
    }
}

/// Mark an analyzer record as enriched and fill in what the analyzer does not
/// echo back.
fn complete_from_submission(
    mut record: ExperienceRecord,
    submission: &Submission,
) -> ExperienceRecord {
    record.nlp_processed = true;
    record.nlp_error = None;

    if let Some(id) = &submission.id {
        if record.id.is_empty() {
            record.id = id.clone();
        }
    }
    if record.company.trim().is_empty() {
        record.company = submission.company.clone();
    }
    if record.role.trim().is_empty() {
        record.role = submission.role.clone();
    }
    if record.submitted_at.is_none() {
        record.submitted_at = submission.submitted_at;
    }
    if record.experience.is_none() && record.original_experience.is_none() {
        record.experience = submission.experience.clone();
    }
    if record.verdict.is_none() {
        record.verdict = submission.verdict.clone();
    }
    if record.difficulty.is_none() {
        record.difficulty = submission.difficulty.clone();
    }
    record
}

fn trace_stage(stage: Stage, artifacts: &Artifacts) {
    debug!(?stage, input = %artifacts.input.display(), "Enrichment stage");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_artifact_paths_are_unique() {
        let dir = Path::new("/tmp/artifacts");
        let a = Artifacts::allocate(dir);
        let b = Artifacts::allocate(dir);

        assert_ne!(a.input, b.input);
        assert_ne!(a.output, b.output);
        let name = a.input.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("temp_experience_"));
        assert!(a
            .output
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("temp_processed_"));
    }

    #[tokio::test]
    async fn test_disabled_analyzer_fails_fast() {
        let dir = TempDir::new().unwrap();
        let analyzer = ExternalAnalyzer::new("python3", dir.path()).disabled();

        let err = analyzer
            .process(&Submission::new("Acme", "Engineer"))
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyzerError::Disabled));
    }

    #[tokio::test]
    async fn test_missing_script() {
        let dir = TempDir::new().unwrap();
        let analyzer = ExternalAnalyzer::new("python3", dir.path().join("artifacts"))
            .with_script(dir.path().join("nope.py"));

        let err = analyzer
            .process(&Submission::new("Acme", "Engineer"))
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyzerError::ScriptMissing(_)));
    }

    #[tokio::test]
    async fn test_default_config_reports_missing_script() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.storage.artifact_dir = dir.path().join("artifacts");
        config.analyzer.script = Some(dir.path().join(crate::config::DEFAULT_ANALYZER_SCRIPT));

        let err = ExternalAnalyzer::from_config(&config)
            .process(&Submission::new("Acme", "Engineer"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AnalyzerError::ScriptMissing(ref p) if p.ends_with("process_experience_nlp.py")
        ));
        assert!(err.to_string().starts_with("NLP script not found at"));
    }

    #[test]
    fn test_empty_script_runs_program_directly() {
        let mut config = Config::default();
        config.analyzer.script = Some(PathBuf::new());

        assert!(ExternalAnalyzer::from_config(&config).script.is_none());
        assert!(ExternalAnalyzer::from_config(&Config::default()).script.is_some());
    }

    #[tokio::test]
    async fn test_missing_program() {
        let dir = TempDir::new().unwrap();
        let artifacts = dir.path().join("artifacts");
        let analyzer = ExternalAnalyzer::new("definitely-not-an-analyzer-12345", &artifacts);

        let err = analyzer
            .process(&Submission::new("Acme", "Engineer"))
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyzerError::SpawnFailed(_)));
        assert_eq!(std::fs::read_dir(&artifacts).unwrap().count(), 0);
    }

    #[test]
    fn test_complete_from_submission_fills_gaps() {
        let mut submission = Submission::new("Acme", "Engineer").with_experience("Fine.");
        submission.id = Some("exp_7".to_string());
        submission.submitted_at = Some(Utc::now());

        let mut analyzed = ExperienceRecord::from_submission(Submission::new("", "Engineer"));
        analyzed.original_experience = Some("Fine.".to_string());

        let record = complete_from_submission(analyzed, &submission);
        assert!(record.nlp_processed);
        assert_eq!(record.id, "exp_7");
        assert_eq!(record.company, "Acme");
        assert_eq!(record.submitted_at, submission.submitted_at);
        assert_eq!(record.experience, None);
    }
}
