//! Classification result types
//!
//! Every classification carries a tag saying whether it came from parsed
//! model output or from the deterministic keyword fallback. The shapes are
//! identical either way so downstream consumers need not care, but call
//! sites that do care (logging, tests, the ad hoc analyze endpoints) can
//! tell them apart.

use serde::{Deserialize, Serialize};

use super::response::{Sentiment, TopicScore};

/// A classification result, tagged by how it was produced
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome<T> {
    /// Parsed from well-formed model output
    Structured(T),
    /// Produced by the keyword fallback after the model reply could not be
    /// used
    Fallback(T),
}

impl<T> ParseOutcome<T> {
    pub fn is_fallback(&self) -> bool {
        matches!(self, ParseOutcome::Fallback(_))
    }

    pub fn value(&self) -> &T {
        match self {
            ParseOutcome::Structured(v) | ParseOutcome::Fallback(v) => v,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            ParseOutcome::Structured(v) | ParseOutcome::Fallback(v) => v,
        }
    }

    /// Re-tag a derived value with this outcome's provenance
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ParseOutcome<U> {
        match self {
            ParseOutcome::Structured(v) => ParseOutcome::Structured(f(v)),
            ParseOutcome::Fallback(v) => ParseOutcome::Fallback(f(v)),
        }
    }
}

/// Sentiment classification for a single comment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentResult {
    pub sentiment: Sentiment,
    /// Clamped to [0,1]
    pub confidence: f64,
    /// Short model-provided (or fallback-generated) rationale
    pub explanation: String,
}

impl SentimentResult {
    /// Default used for empty comments and unexpected classifier failures
    pub fn empty() -> Self {
        Self {
            sentiment: Sentiment::Neutral,
            confidence: 0.0,
            explanation: "empty".to_string(),
        }
    }
}

/// Combined sentiment + topics result for one comment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedComment {
    pub sentiment: Sentiment,
    pub sentiment_confidence: f64,
    pub topics: Vec<TopicScore>,
    /// True when either half came from the keyword fallback
    pub fallback: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_outcome_accessors() {
        let structured = ParseOutcome::Structured(3);
        assert!(!structured.is_fallback());
        assert_eq!(*structured.value(), 3);
        assert_eq!(structured.into_inner(), 3);

        let fallback = ParseOutcome::Fallback("x");
        assert!(fallback.is_fallback());

        let mapped = ParseOutcome::Fallback(2).map(|n| n * 10);
        assert!(mapped.is_fallback());
        assert_eq!(mapped.into_inner(), 20);
    }

    #[test]
    fn test_empty_sentiment_default() {
        let result = SentimentResult::empty();
        assert_eq!(result.sentiment, Sentiment::Neutral);
        assert_eq!(result.confidence, 0.0);
    }
}
