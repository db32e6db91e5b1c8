//! Shared types used across modules
//!
//! The canonical experience record schema. Both the external analyzer and the
//! heuristic fallback produce values of [`ExperienceRecord`], and the store
//! persists nothing else.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Provenance tag for records created through the submission endpoint
pub const USER_SUBMISSION_SOURCE: &str = "User Submission";

/// Coarse sentiment of an interview narrative
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    #[default]
    Neutral,
    Negative,
}

impl SentimentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Neutral => "neutral",
            SentimentLabel::Negative => "negative",
        }
    }
}

impl std::fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Interview outcome reported by the submitter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Verdict {
    Selected,
    Rejected,
    Shortlisted,
    Pending,
    Withdrawn,
    /// Free-form outcome kept verbatim
    Other(String),
}

impl Verdict {
    pub fn as_str(&self) -> &str {
        match self {
            Verdict::Selected => "Selected",
            Verdict::Rejected => "Rejected",
            Verdict::Shortlisted => "Shortlisted",
            Verdict::Pending => "Pending",
            Verdict::Withdrawn => "Withdrawn",
            Verdict::Other(raw) => raw,
        }
    }
}

impl From<String> for Verdict {
    fn from(raw: String) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "selected" => Verdict::Selected,
            "rejected" => Verdict::Rejected,
            "shortlisted" => Verdict::Shortlisted,
            "pending" => Verdict::Pending,
            "withdrawn" => Verdict::Withdrawn,
            _ => Verdict::Other(raw),
        }
    }
}

impl From<Verdict> for String {
    fn from(verdict: Verdict) -> Self {
        verdict.as_str().to_string()
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Perceived interview difficulty
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    VeryHard,
    /// Free-form difficulty kept verbatim
    Other(String),
}

impl Difficulty {
    pub fn as_str(&self) -> &str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
            Difficulty::VeryHard => "Very Hard",
            Difficulty::Other(raw) => raw,
        }
    }
}

impl From<String> for Difficulty {
    fn from(raw: String) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "easy" => Difficulty::Easy,
            "medium" => Difficulty::Medium,
            "hard" => Difficulty::Hard,
            "very hard" | "very_hard" | "veryhard" => Difficulty::VeryHard,
            _ => Difficulty::Other(raw),
        }
    }
}

impl From<Difficulty> for String {
    fn from(difficulty: Difficulty) -> Self {
        difficulty.as_str().to_string()
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// VADER polarity scores as emitted by the external analyzer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaderScores {
    #[serde(default)]
    pub compound: f64,
    #[serde(default)]
    pub pos: f64,
    #[serde(default = "default_neutral_share")]
    pub neu: f64,
    #[serde(default)]
    pub neg: f64,
}

fn default_neutral_share() -> f64 {
    1.0
}

impl Default for VaderScores {
    fn default() -> Self {
        Self {
            compound: 0.0,
            pos: 0.0,
            neu: default_neutral_share(),
            neg: 0.0,
        }
    }
}

/// Keyword hit counts per sentiment bucket
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordScores {
    #[serde(default)]
    pub positive: u32,
    #[serde(default)]
    pub negative: u32,
    #[serde(default)]
    pub neutral: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentAnalysis {
    #[serde(default)]
    pub sentiment: SentimentLabel,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub vader_scores: VaderScores,
    #[serde(default)]
    pub keyword_scores: KeywordScores,
}

impl Default for SentimentAnalysis {
    fn default() -> Self {
        Self {
            sentiment: SentimentLabel::Neutral,
            confidence: 0.5,
            vader_scores: VaderScores::default(),
            keyword_scores: KeywordScores::default(),
        }
    }
}

/// Extracted questions bucketed by interview category
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorizedQuestions {
    #[serde(default)]
    pub technical: Vec<String>,
    #[serde(default)]
    pub behavioral: Vec<String>,
    #[serde(default)]
    pub system_design: Vec<String>,
    #[serde(default)]
    pub coding: Vec<String>,
    #[serde(default)]
    pub other: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedInsights {
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(default)]
    pub companies_mentioned: Vec<String>,
    #[serde(default)]
    pub difficulty_indicators: Vec<String>,
    #[serde(default)]
    pub preparation_tips: Vec<String>,
    #[serde(default)]
    pub red_flags: Vec<String>,
    #[serde(default)]
    pub positive_aspects: Vec<String>,
}

/// One interview round detected in the narrative
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewRound {
    #[serde(rename = "type", default)]
    pub round_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub questions: Vec<String>,
}

/// A raw submission as posted by the UI
///
/// Only the fields the pipeline reads are typed; everything else the form
/// sends (name, tags, salary, structured rounds, ...) rides along in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub company: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub verdict: Option<Verdict>,
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Submission {
    pub fn new(company: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            company: company.into(),
            role: role.into(),
            ..Default::default()
        }
    }

    pub fn with_experience(mut self, experience: impl Into<String>) -> Self {
        self.experience = Some(experience.into());
        self
    }
}

/// One persisted, enriched interview experience
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperienceRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub company: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience: Option<String>,
    /// Narrative as echoed back by the external analyzer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_experience: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub verdict: Option<Verdict>,
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub nlp_processed: bool,
    /// Why the external analyzer was bypassed, for fallback records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nlp_error: Option<String>,
    #[serde(default)]
    pub sentiment_analysis: SentimentAnalysis,
    #[serde(default)]
    pub categorized_questions: CategorizedQuestions,
    #[serde(default)]
    pub extracted_insights: ExtractedInsights,
    #[serde(default)]
    pub interview_rounds: Vec<InterviewRound>,
    #[serde(default)]
    pub highlights: Vec<String>,
    /// Absent on legacy records; such records match no sentiment filter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback_sentiment: Option<SentimentLabel>,
    #[serde(default)]
    pub raw_questions: Vec<String>,
    #[serde(default)]
    pub roundwise_questions: BTreeMap<String, Vec<String>>,
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_source() -> String {
    USER_SUBMISSION_SOURCE.to_string()
}

impl ExperienceRecord {
    /// Start a record from a submission with every analyzer field at its
    /// empty default.
    pub fn from_submission(submission: Submission) -> Self {
        Self {
            id: submission.id.unwrap_or_default(),
            company: submission.company,
            role: submission.role,
            experience: submission.experience,
            original_experience: None,
            verdict: submission.verdict,
            difficulty: submission.difficulty,
            submitted_at: submission.submitted_at,
            nlp_processed: false,
            nlp_error: None,
            sentiment_analysis: SentimentAnalysis::default(),
            categorized_questions: CategorizedQuestions::default(),
            extracted_insights: ExtractedInsights::default(),
            interview_rounds: Vec::new(),
            highlights: Vec::new(),
            feedback_sentiment: None,
            raw_questions: Vec::new(),
            roundwise_questions: BTreeMap::new(),
            source: default_source(),
            extra: submission.extra,
        }
    }

    /// The raw narrative, whichever producer stored it
    pub fn narrative(&self) -> Option<&str> {
        self.experience
            .as_deref()
            .or(self.original_experience.as_deref())
    }
}

/// Treat `null`, missing and blank strings as absent.
fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: From<String>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.trim().is_empty()).map(T::from))
}

fn null_as_default<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
