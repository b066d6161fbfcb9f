//! Survey response domain types
//!
//! A response is one customer submission: a 0-10 rating, an optional
//! free-text comment, a language code and timestamps. Enrichment attaches a
//! sentiment label, a confidence and a topic list after the fact.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// NPS segment, always derived from the rating and never stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseGroup {
    /// Rating 9-10
    Promoter,
    /// Rating 7-8
    Passive,
    /// Rating 0-6
    Detractor,
}

impl ResponseGroup {
    pub fn from_rating(rating: i64) -> Self {
        if rating >= 9 {
            ResponseGroup::Promoter
        } else if rating >= 7 {
            ResponseGroup::Passive
        } else {
            ResponseGroup::Detractor
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseGroup::Promoter => "Promoter",
            ResponseGroup::Passive => "Passive",
            ResponseGroup::Detractor => "Detractor",
        }
    }
}

impl std::fmt::Display for ResponseGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sentiment label attached to a comment
///
/// `NotAnalyzed` (stored as `N/A`) is the state of a row before any
/// enrichment pass has touched it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
    #[serde(rename = "N/A")]
    NotAnalyzed,
}

impl Sentiment {
    /// Database/wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
            Sentiment::NotAnalyzed => "N/A",
        }
    }

    /// Parse a stored label; anything unrecognized maps to `NotAnalyzed`
    pub fn from_db(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "positive" => Sentiment::Positive,
            "neutral" => Sentiment::Neutral,
            "negative" => Sentiment::Negative,
            _ => Sentiment::NotAnalyzed,
        }
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One topic label with the classifier's confidence for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicScore {
    pub topic: String,
    pub confidence: f64,
}

/// A stored survey response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyResponse {
    /// Unique identifier, assigned at insert
    pub id: Uuid,

    /// NPS rating, 0-10
    pub rating: i64,

    /// Free-text comment; empty string when the customer left none
    pub comment: String,

    /// Language code as submitted (lowercased); prompts fall back to `en`
    /// for codes without a dedicated prompt set
    pub language: String,

    /// Derived NPS segment; recomputed from `rating` on every load
    pub response_group: ResponseGroup,

    /// Sentiment label; `N/A` until an enrichment pass writes a result
    pub sentiment: Sentiment,

    /// Confidence in [0,1]; 0.0 before classification
    pub sentiment_confidence: f64,

    /// Topic labels from the last enrichment pass; empty until then
    pub topics: Vec<TopicScore>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SurveyResponse {
    /// A row is pending enrichment when it has a comment worth classifying
    /// and no real sentiment yet. Neutral with zero confidence counts as
    /// "no real sentiment": that is the pre-classification default, and the
    /// empty-comment short-circuit never reaches this check.
    pub fn needs_enrichment(&self) -> bool {
        if self.comment.trim().is_empty() {
            return false;
        }
        match self.sentiment {
            Sentiment::NotAnalyzed => true,
            Sentiment::Neutral => self.sentiment_confidence <= 0.0,
            _ => false,
        }
    }
}

/// Payload for creating a response, before persistence
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewResponse {
    pub rating: i64,

    #[serde(default)]
    pub comment: Option<String>,

    #[serde(default)]
    pub language: Option<String>,

    /// Submission time; defaults to now when absent (bulk imports carry
    /// historical dates)
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl NewResponse {
    pub fn validate(&self) -> Result<(), String> {
        if !(0..=10).contains(&self.rating) {
            return Err(format!("rating must be 0-10, got {}", self.rating));
        }
        Ok(())
    }

    /// Normalized comment text (missing comment becomes empty string)
    pub fn comment_text(&self) -> String {
        self.comment.clone().unwrap_or_default()
    }

    /// Normalized language code; empty or absent defaults to `en`
    pub fn language_code(&self) -> String {
        match &self.language {
            Some(code) if !code.trim().is_empty() => code.trim().to_lowercase(),
            _ => "en".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_group_covers_all_ratings() {
        for rating in 0..=10 {
            let group = ResponseGroup::from_rating(rating);
            match rating {
                9 | 10 => assert_eq!(group, ResponseGroup::Promoter),
                7 | 8 => assert_eq!(group, ResponseGroup::Passive),
                _ => assert_eq!(group, ResponseGroup::Detractor),
            }
        }
    }

    #[test]
    fn test_sentiment_db_roundtrip() {
        for s in [
            Sentiment::Positive,
            Sentiment::Neutral,
            Sentiment::Negative,
            Sentiment::NotAnalyzed,
        ] {
            assert_eq!(Sentiment::from_db(s.as_str()), s);
        }
        assert_eq!(Sentiment::from_db("POSITIVE"), Sentiment::Positive);
        assert_eq!(Sentiment::from_db("garbage"), Sentiment::NotAnalyzed);
        assert_eq!(Sentiment::from_db(""), Sentiment::NotAnalyzed);
    }

    #[test]
    fn test_needs_enrichment_sentinel() {
        let mut row = SurveyResponse {
            id: Uuid::new_v4(),
            rating: 3,
            comment: "The app keeps crashing".to_string(),
            language: "en".to_string(),
            response_group: ResponseGroup::from_rating(3),
            sentiment: Sentiment::NotAnalyzed,
            sentiment_confidence: 0.0,
            topics: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(row.needs_enrichment());

        // Neutral with zero confidence is still the sentinel
        row.sentiment = Sentiment::Neutral;
        assert!(row.needs_enrichment());

        // A real classification result clears the pending state
        row.sentiment_confidence = 0.2;
        assert!(!row.needs_enrichment());

        row.sentiment = Sentiment::Negative;
        row.sentiment_confidence = 0.8;
        assert!(!row.needs_enrichment());

        // Rows without a comment are never pending
        row.sentiment = Sentiment::NotAnalyzed;
        row.sentiment_confidence = 0.0;
        row.comment = "   ".to_string();
        assert!(!row.needs_enrichment());
    }

    #[test]
    fn test_new_response_validation_and_defaults() {
        let ok = NewResponse {
            rating: 10,
            comment: None,
            language: Some("  DE ".to_string()),
            created_at: None,
        };
        assert!(ok.validate().is_ok());
        assert_eq!(ok.comment_text(), "");
        assert_eq!(ok.language_code(), "de");

        let bad = NewResponse {
            rating: 11,
            comment: None,
            language: None,
            created_at: None,
        };
        assert!(bad.validate().is_err());
        assert_eq!(bad.language_code(), "en");
    }

    #[test]
    fn test_survey_response_serializes_camel_case() {
        let row = SurveyResponse {
            id: Uuid::new_v4(),
            rating: 9,
            comment: String::new(),
            language: "en".to_string(),
            response_group: ResponseGroup::from_rating(9),
            sentiment: Sentiment::NotAnalyzed,
            sentiment_confidence: 0.0,
            topics: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["responseGroup"], "Promoter");
        assert_eq!(json["sentiment"], "N/A");
        assert!(json["sentimentConfidence"].is_number());
        assert!(json["createdAt"].is_string());
    }
}
