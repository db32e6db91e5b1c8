//! Heuristic analyzer - keyword sentiment and punctuation-based question
//! extraction used when the external analyzer is unavailable.
//!
//! Everything here is pure and deterministic. Confidence is always 0.5.

use crate::types::{
    ExperienceRecord, KeywordScores, SentimentAnalysis, SentimentLabel, Submission, VaderScores,
};
use regex::Regex;
use std::sync::LazyLock;

pub const POSITIVE_WORDS: &[&str] = &[
    "good",
    "great",
    "excellent",
    "positive",
    "selected",
    "successful",
    "smooth",
];

pub const NEGATIVE_WORDS: &[&str] = &[
    "bad",
    "terrible",
    "negative",
    "rejected",
    "failed",
    "difficult",
    "stressful",
];

pub const FALLBACK_CONFIDENCE: f64 = 0.5;

pub const FALLBACK_HIGHLIGHTS: [&str; 2] = [
    "Experience submitted successfully",
    "NLP processing unavailable",
];

/// Round label used for `roundwise_questions` in fallback records
pub const GENERAL_ROUND: &str = "General Questions";

/// A sentence holding a question mark, up to the next terminator
static QUESTION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^.!?]*\?[^.!?]*").unwrap());

/// Count how many words of each set appear in the text.
///
/// Each set word counts at most once, matched as a case-insensitive substring.
pub fn score_keywords(text: &str) -> KeywordScores {
    let lower = text.to_lowercase();
    let hits = |words: &[&str]| words.iter().filter(|w| lower.contains(*w)).count() as u32;

    KeywordScores {
        positive: hits(POSITIVE_WORDS),
        negative: hits(NEGATIVE_WORDS),
        neutral: 0,
    }
}

pub fn classify(scores: &KeywordScores) -> SentimentLabel {
    use std::cmp::Ordering;

    match scores.positive.cmp(&scores.negative) {
        Ordering::Greater => SentimentLabel::Positive,
        Ordering::Less => SentimentLabel::Negative,
        Ordering::Equal => SentimentLabel::Neutral,
    }
}

pub fn analyze_sentiment(text: &str) -> SentimentAnalysis {
    let keyword_scores = score_keywords(text);
    SentimentAnalysis {
        sentiment: classify(&keyword_scores),
        confidence: FALLBACK_CONFIDENCE,
        vader_scores: VaderScores::default(),
        keyword_scores,
    }
}

/// Every maximal sentence run containing a `?`, trimmed, in order of
/// appearance. Text after the `?` up to the next terminator is kept.
pub fn extract_questions(text: &str) -> Vec<String> {
    QUESTION_PATTERN
        .find_iter(text)
        .map(|m| m.as_str().trim())
        .filter(|q| !q.trim_matches(|c: char| c == '?' || c.is_whitespace()).is_empty())
        .map(str::to_string)
        .collect()
}

/// Build a complete record for a submission the external analyzer could not
/// process. `reason` ends up in `nlp_error` and the highlights.
pub fn fallback_record(submission: Submission, reason: &str) -> ExperienceRecord {
    let text = submission.experience.clone().unwrap_or_default();
    let sentiment_analysis = analyze_sentiment(&text);
    let questions = extract_questions(&text);

    let mut record = ExperienceRecord::from_submission(submission);
    record.nlp_processed = false;
    record.nlp_error = Some(reason.to_string());
    record.feedback_sentiment = Some(sentiment_analysis.sentiment);
    record.sentiment_analysis = sentiment_analysis;
    record.categorized_questions.other = questions.clone();
    record.highlights = FALLBACK_HIGHLIGHTS.iter().map(|h| h.to_string()).collect();
    record.highlights.push(format!("Fallback reason: {}", reason));
    record
        .roundwise_questions
        .insert(GENERAL_ROUND.to_string(), questions.clone());
    record.raw_questions = questions;
    record
}
