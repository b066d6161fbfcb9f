//! Comment classification
//!
//! Turns raw model replies into typed sentiment/topic results. The model's
//! output is untrusted: it may wrap the requested JSON in prose, truncate
//! it, or return none at all. Parsing therefore locates brace-balanced
//! spans instead of feeding the whole reply to serde, and every failure
//! path degrades into a deterministic keyword heuristic over the same
//! label vocabulary. Callers always get a structurally valid result.

use serde_json::Value;

use crate::models::{ClassifiedComment, ParseOutcome, Sentiment, SentimentResult, TopicScore};
use crate::services::lexicon;
use crate::services::ollama::OllamaClient;

/// Reply length bounds per call type
const SENTIMENT_NUM_PREDICT: u32 = 200;
const TOPICS_NUM_PREDICT: u32 = 300;

/// Confidence assumed when a well-formed reply omits the confidence field
const DEFAULT_MODEL_CONFIDENCE: f64 = 0.8;

/// Keyword-fallback confidence bounds; kept below model-derived values so
/// the degradation stays visible in the stored confidence
const MAX_FALLBACK_SENTIMENT_CONFIDENCE: f64 = 0.6;
const MAX_FALLBACK_TOPIC_CONFIDENCE: f64 = 0.8;
const MAX_FALLBACK_TOPICS: usize = 3;

/// Confidence for a no-hit neutral fallback; nonzero so the row no longer
/// counts as awaiting enrichment
const NO_MATCH_CONFIDENCE: f64 = 0.2;

/// Sentiment and topic classification over an inference endpoint
#[derive(Debug, Clone)]
pub struct CommentClassifier {
    client: OllamaClient,
}

impl CommentClassifier {
    pub fn new(client: OllamaClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &OllamaClient {
        &self.client
    }

    /// Classify the sentiment of one comment
    ///
    /// Empty comments short-circuit without a model call. Transport and
    /// parse failures degrade to the keyword heuristic; this never fails.
    pub async fn classify_sentiment(
        &self,
        comment: &str,
        language: &str,
    ) -> ParseOutcome<SentimentResult> {
        if comment.trim().is_empty() {
            return ParseOutcome::Structured(SentimentResult::empty());
        }

        let prompt = sentiment_prompt(comment, language);
        match self.client.generate(&prompt, SENTIMENT_NUM_PREDICT).await {
            Ok(reply) => match parse_sentiment_reply(&reply) {
                Some(result) => ParseOutcome::Structured(result),
                None => {
                    tracing::warn!(
                        reply_len = reply.len(),
                        "Unparseable sentiment reply, using keyword fallback"
                    );
                    ParseOutcome::Fallback(fallback_sentiment(comment, language))
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "Sentiment call failed, using keyword fallback");
                ParseOutcome::Fallback(fallback_sentiment(comment, language))
            }
        }
    }

    /// Extract topics for one comment from the closed vocabulary
    ///
    /// Same degradation contract as `classify_sentiment`.
    pub async fn extract_topics(
        &self,
        comment: &str,
        language: &str,
    ) -> ParseOutcome<Vec<TopicScore>> {
        if comment.trim().is_empty() {
            return ParseOutcome::Structured(Vec::new());
        }

        let prompt = topics_prompt(comment, language);
        match self.client.generate(&prompt, TOPICS_NUM_PREDICT).await {
            Ok(reply) => match parse_topics_reply(&reply) {
                Some(topics) => ParseOutcome::Structured(topics),
                None => {
                    tracing::warn!(
                        reply_len = reply.len(),
                        "Unparseable topics reply, using keyword fallback"
                    );
                    ParseOutcome::Fallback(fallback_topics(comment))
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "Topics call failed, using keyword fallback");
                ParseOutcome::Fallback(fallback_topics(comment))
            }
        }
    }

    /// Full classification: sentiment and topics, the two calls running
    /// concurrently
    pub async fn classify_comment(&self, comment: &str, language: &str) -> ClassifiedComment {
        let (sentiment_outcome, topics_outcome) = tokio::join!(
            self.classify_sentiment(comment, language),
            self.extract_topics(comment, language)
        );

        let fallback = sentiment_outcome.is_fallback() || topics_outcome.is_fallback();
        let sentiment_result = sentiment_outcome.into_inner();

        ClassifiedComment {
            sentiment: sentiment_result.sentiment,
            sentiment_confidence: sentiment_result.confidence,
            topics: topics_outcome.into_inner(),
            fallback,
        }
    }
}

fn language_name(language: &str) -> &'static str {
    match lexicon::normalize_language(language) {
        "de" => "German",
        "fr" => "French",
        "it" => "Italian",
        _ => "English",
    }
}

fn sentiment_prompt(comment: &str, language: &str) -> String {
    let examples = lexicon::sentiment_examples(language);
    format!(
        "You are analyzing customer feedback for a mobile banking app.\n\n\
         Classify the sentiment of the customer comment below. The comment is written in {}.\n\n\
         Examples:\n\
         - \"{}\" -> positive\n\
         - \"{}\" -> negative\n\
         - \"{}\" -> neutral\n\n\
         Comment:\n\"\"\"\n{}\n\"\"\"\n\n\
         Reply with ONLY a JSON object, no other text:\n\
         {{\"sentiment\": \"positive\" or \"neutral\" or \"negative\", \"confidence\": <number between 0 and 1>, \"explanation\": \"<one short sentence>\"}}",
        language_name(language),
        examples.positive,
        examples.negative,
        examples.neutral,
        comment
    )
}

fn topics_prompt(comment: &str, language: &str) -> String {
    let mut topic_list = String::new();
    for topic in lexicon::TOPICS {
        topic_list.push_str("- ");
        topic_list.push_str(topic.name);
        topic_list.push('\n');
    }

    format!(
        "You are analyzing customer feedback for a mobile banking app.\n\n\
         Identify which of the following topics the comment below touches. \
         Use ONLY topic names from this list:\n{}\n\
         The comment is written in {}.\n\n\
         Comment:\n\"\"\"\n{}\n\"\"\"\n\n\
         Reply with ONLY a JSON object, no other text:\n\
         {{\"topics\": [{{\"topic\": \"<name from the list>\", \"confidence\": <number between 0 and 1>}}]}}\n\
         Reply with {{\"topics\": []}} if no topic from the list applies.",
        topic_list,
        language_name(language),
        comment
    )
}

/// Clamp into [0,1]; non-finite input becomes 0
fn clamp_confidence(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Byte span (inclusive end) of the first brace-balanced JSON object,
/// honouring string literals and escapes
fn find_json_object_span(text: &str) -> Option<(usize, usize)> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in text.as_bytes().iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some((start, i));
                }
            }
            _ => {}
        }
    }
    None
}

/// First top-level JSON object in the text; the model may surround it with
/// prose
fn extract_first_json_object(text: &str) -> Option<&str> {
    find_json_object_span(text).map(|(start, end)| &text[start..=end])
}

/// The bracket-balanced array following a `"topics"` key, for replies whose
/// enclosing object is malformed
fn extract_topics_array(text: &str) -> Option<&str> {
    let key_end = text.find("\"topics\"")? + "\"topics\"".len();
    let after = &text[key_end..];
    let bracket_rel = after.find('[')?;
    if !after[..bracket_rel].chars().all(|c| c.is_whitespace() || c == ':') {
        return None;
    }

    let start = key_end + bracket_rel;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in text.as_bytes().iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Complete `{...}` items scraped out of a truncated reply
fn salvage_topic_items(text: &str) -> Vec<Value> {
    let mut items = Vec::new();
    let mut offset = 0;

    while offset < text.len() {
        let Some((start, end)) = find_json_object_span(&text[offset..]) else {
            break;
        };
        if let Ok(value) = serde_json::from_str(&text[offset + start..=offset + end]) {
            items.push(value);
        }
        offset += end + 1;
    }
    items
}

fn parse_sentiment_reply(reply: &str) -> Option<SentimentResult> {
    let json = extract_first_json_object(reply)?;
    let value: Value = serde_json::from_str(json).ok()?;

    let sentiment = match value.get("sentiment")?.as_str()?.trim().to_lowercase().as_str() {
        "positive" => Sentiment::Positive,
        "neutral" => Sentiment::Neutral,
        "negative" => Sentiment::Negative,
        _ => return None,
    };

    let confidence = value
        .get("confidence")
        .and_then(|c| c.as_f64())
        .map(clamp_confidence)
        .unwrap_or(DEFAULT_MODEL_CONFIDENCE);

    let explanation = value
        .get("explanation")
        .and_then(|e| e.as_str())
        .unwrap_or("")
        .to_string();

    Some(SentimentResult {
        sentiment,
        confidence,
        explanation,
    })
}

fn parse_topics_reply(reply: &str) -> Option<Vec<TopicScore>> {
    // Well-formed case: an object with a topics array
    if let Some(json) = extract_first_json_object(reply) {
        if let Ok(value) = serde_json::from_str::<Value>(json) {
            if let Some(items) = value.get("topics").and_then(|t| t.as_array()) {
                return Some(canonicalize_topics(items));
            }
        }
    }

    // The model answered with a bare array
    let trimmed = reply.trim();
    if trimmed.starts_with('[') {
        if let Ok(Value::Array(items)) = serde_json::from_str(trimmed) {
            return Some(canonicalize_topics(&items));
        }
    }

    // Enclosing object malformed: take just the array after the key
    if let Some(array_text) = extract_topics_array(reply) {
        if let Ok(Value::Array(items)) = serde_json::from_str(array_text) {
            return Some(canonicalize_topics(&items));
        }
    }

    // Truncated mid-array: keep whatever complete items made it out
    if let Some(key_pos) = reply.find("\"topics\"") {
        let items = salvage_topic_items(&reply[key_pos..]);
        if !items.is_empty() {
            return Some(canonicalize_topics(&items));
        }
    }

    None
}

/// Map reply items onto the closed vocabulary: case-insensitive name match
/// ("and" accepted for "&"), unknown labels dropped, duplicates keep the
/// first occurrence
fn canonicalize_topics(items: &[Value]) -> Vec<TopicScore> {
    let mut result: Vec<TopicScore> = Vec::new();

    for item in items {
        let (raw_name, confidence) = match item {
            Value::String(name) => (name.clone(), DEFAULT_MODEL_CONFIDENCE),
            Value::Object(_) => {
                let name = item
                    .get("topic")
                    .and_then(|n| n.as_str())
                    .or_else(|| item.get("name").and_then(|n| n.as_str()));
                match name {
                    Some(n) => (
                        n.to_string(),
                        item.get("confidence")
                            .and_then(|c| c.as_f64())
                            .unwrap_or(DEFAULT_MODEL_CONFIDENCE),
                    ),
                    None => continue,
                }
            }
            _ => continue,
        };

        let Some(canonical) = canonical_topic(&raw_name) else {
            continue;
        };
        if result.iter().any(|t| t.topic == canonical) {
            continue;
        }
        result.push(TopicScore {
            topic: canonical.to_string(),
            confidence: clamp_confidence(confidence),
        });
    }

    result
}

fn canonical_topic(name: &str) -> Option<&'static str> {
    let normalized = name.trim().to_lowercase().replace(" and ", " & ");
    lexicon::TOPICS
        .iter()
        .find(|t| t.name.to_lowercase() == normalized)
        .map(|t| t.name)
}

/// Deterministic sentiment from polarity keyword counts
fn fallback_sentiment(comment: &str, language: &str) -> SentimentResult {
    let text = comment.to_lowercase();
    let polarity = lexicon::polarity_keywords(language);

    let positive_hits = polarity.positive.iter().filter(|k| text.contains(**k)).count();
    let negative_hits = polarity.negative.iter().filter(|k| text.contains(**k)).count();

    let (sentiment, confidence) = if positive_hits > negative_hits {
        (
            Sentiment::Positive,
            keyword_margin_confidence(positive_hits - negative_hits),
        )
    } else if negative_hits > positive_hits {
        (
            Sentiment::Negative,
            keyword_margin_confidence(negative_hits - positive_hits),
        )
    } else {
        (Sentiment::Neutral, NO_MATCH_CONFIDENCE)
    };

    SentimentResult {
        sentiment,
        confidence,
        explanation: format!(
            "keyword heuristic ({} positive, {} negative)",
            positive_hits, negative_hits
        ),
    }
}

fn keyword_margin_confidence(margin: usize) -> f64 {
    (0.3 + 0.1 * margin as f64).min(MAX_FALLBACK_SENTIMENT_CONFIDENCE)
}

/// Deterministic topics from vocabulary keyword counts: strongest matches
/// first, at most three, name order breaking ties
fn fallback_topics(comment: &str) -> Vec<TopicScore> {
    let text = comment.to_lowercase();

    let mut matched: Vec<(usize, &'static str)> = lexicon::TOPICS
        .iter()
        .filter_map(|topic| {
            let hits = topic.keywords.iter().filter(|k| text.contains(**k)).count();
            (hits > 0).then_some((hits, topic.name))
        })
        .collect();

    matched.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));

    matched
        .into_iter()
        .take(MAX_FALLBACK_TOPICS)
        .map(|(hits, name)| TopicScore {
            topic: name.to_string(),
            confidence: (0.3 + 0.15 * hits as f64).min(MAX_FALLBACK_TOPIC_CONFIDENCE),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_object_from_prose() {
        let reply = r#"Sure! Here is the analysis: {"sentiment": "negative", "confidence": 0.9} Hope that helps."#;
        assert_eq!(
            extract_first_json_object(reply),
            Some(r#"{"sentiment": "negative", "confidence": 0.9}"#)
        );
    }

    #[test]
    fn test_extract_json_object_nested_and_strings() {
        let reply = r#"{"a": {"b": "} tricky {"}, "c": 1}"#;
        let extracted = extract_first_json_object(reply).unwrap();
        let value: Value = serde_json::from_str(extracted).unwrap();
        assert_eq!(value["c"], 1);

        // Escaped quote inside a string must not end the string
        let reply = r#"{"a": "quote \" and brace }", "b": 2}"#;
        let value: Value = serde_json::from_str(extract_first_json_object(reply).unwrap()).unwrap();
        assert_eq!(value["b"], 2);
    }

    #[test]
    fn test_extract_json_object_absent_or_unbalanced() {
        assert_eq!(extract_first_json_object("no json here"), None);
        assert_eq!(extract_first_json_object(r#"{"open": true"#), None);
    }

    #[test]
    fn test_parse_sentiment_valid_reply() {
        let reply = r#"{"sentiment": "Negative", "confidence": 0.92, "explanation": "complains about crashes"}"#;
        let result = parse_sentiment_reply(reply).unwrap();
        assert_eq!(result.sentiment, Sentiment::Negative);
        assert!((result.confidence - 0.92).abs() < 1e-9);
        assert_eq!(result.explanation, "complains about crashes");
    }

    #[test]
    fn test_parse_sentiment_clamps_and_defaults_confidence() {
        let high = parse_sentiment_reply(r#"{"sentiment": "positive", "confidence": 3.5}"#).unwrap();
        assert_eq!(high.confidence, 1.0);

        let negative = parse_sentiment_reply(r#"{"sentiment": "positive", "confidence": -1}"#).unwrap();
        assert_eq!(negative.confidence, 0.0);

        let missing = parse_sentiment_reply(r#"{"sentiment": "neutral"}"#).unwrap();
        assert_eq!(missing.confidence, DEFAULT_MODEL_CONFIDENCE);
    }

    #[test]
    fn test_parse_sentiment_rejects_unknown_label() {
        assert!(parse_sentiment_reply(r#"{"sentiment": "angry"}"#).is_none());
        assert!(parse_sentiment_reply(r#"{"mood": "negative"}"#).is_none());
        assert!(parse_sentiment_reply("The sentiment is negative.").is_none());
    }

    #[test]
    fn test_parse_topics_well_formed() {
        let reply = r#"{"topics": [{"topic": "Fees & Pricing", "confidence": 0.9}, {"topic": "App Performance", "confidence": 0.4}]}"#;
        let topics = parse_topics_reply(reply).unwrap();
        assert_eq!(topics.len(), 2);
        assert_eq!(topics[0].topic, "Fees & Pricing");
        assert!((topics[1].confidence - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_parse_topics_canonicalizes_names() {
        let reply = r#"{"topics": [{"topic": "fees and pricing", "confidence": 0.7}, {"topic": "Made Up Topic", "confidence": 0.9}, {"topic": "FEES & PRICING", "confidence": 0.2}]}"#;
        let topics = parse_topics_reply(reply).unwrap();
        // Unknown label dropped, duplicate keeps the first occurrence
        assert_eq!(topics.len(), 1);
        assert_eq!(topics[0].topic, "Fees & Pricing");
        assert!((topics[0].confidence - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_parse_topics_accepts_string_items_and_bare_array() {
        let topics = parse_topics_reply(r#"{"topics": ["Security", "Notifications"]}"#).unwrap();
        assert_eq!(topics.len(), 2);
        assert_eq!(topics[0].confidence, DEFAULT_MODEL_CONFIDENCE);

        let bare = parse_topics_reply(r#"[{"topic": "Security", "confidence": 0.5}]"#).unwrap();
        assert_eq!(bare.len(), 1);
        assert_eq!(bare[0].topic, "Security");
    }

    #[test]
    fn test_parse_topics_salvages_truncated_reply() {
        // num_predict cut the reply mid-array; the complete first item is kept
        let reply = r#"{"topics": [{"topic": "Customer Support", "confidence": 0.8}, {"topic": "App Perf"#;
        let topics = parse_topics_reply(reply).unwrap();
        assert_eq!(topics.len(), 1);
        assert_eq!(topics[0].topic, "Customer Support");
    }

    #[test]
    fn test_parse_topics_no_structure_is_none() {
        assert!(parse_topics_reply("I could not find any topics").is_none());
    }

    #[test]
    fn test_fallback_sentiment_is_deterministic() {
        let first = fallback_sentiment("App crashes constantly, terrible support", "en");
        let second = fallback_sentiment("App crashes constantly, terrible support", "en");
        assert_eq!(first, second);
        assert_eq!(first.sentiment, Sentiment::Negative);
        assert!(first.confidence <= MAX_FALLBACK_SENTIMENT_CONFIDENCE);
        assert!(first.confidence > 0.0);
    }

    #[test]
    fn test_fallback_sentiment_per_language() {
        let de = fallback_sentiment("Die App ist super und sehr einfach", "de");
        assert_eq!(de.sentiment, Sentiment::Positive);

        let fr = fallback_sentiment("L'application plante, c'est nul", "fr");
        assert_eq!(fr.sentiment, Sentiment::Negative);

        let it = fallback_sentiment("Ottima app, molto utile", "it");
        assert_eq!(it.sentiment, Sentiment::Positive);
    }

    #[test]
    fn test_fallback_sentiment_no_hits_is_low_confidence_neutral() {
        let result = fallback_sentiment("xyzzy qwerty", "en");
        assert_eq!(result.sentiment, Sentiment::Neutral);
        assert_eq!(result.confidence, NO_MATCH_CONFIDENCE);
    }

    #[test]
    fn test_fallback_topics_matches_vocabulary() {
        let topics = fallback_topics("App crashes constantly, terrible support");
        let names: Vec<&str> = topics.iter().map(|t| t.topic.as_str()).collect();
        assert!(names.contains(&"App Performance"));
        assert!(names.contains(&"Customer Support"));
        for topic in &topics {
            assert!(topic.confidence <= MAX_FALLBACK_TOPIC_CONFIDENCE);
        }
    }

    #[test]
    fn test_fallback_topics_caps_at_three() {
        let comment = "The fees are expensive, the app is slow, support is bad, \
                       login fails and notifications never arrive";
        let topics = fallback_topics(comment);
        assert!(topics.len() <= MAX_FALLBACK_TOPICS);
        assert!(!topics.is_empty());
    }

    #[test]
    fn test_fallback_topics_empty_when_nothing_matches() {
        assert!(fallback_topics("xyzzy qwerty").is_empty());
    }

    #[test]
    fn test_prompts_embed_comment_and_vocabulary() {
        let prompt = sentiment_prompt("Die Gebühren sind zu hoch", "de");
        assert!(prompt.contains("Die Gebühren sind zu hoch"));
        assert!(prompt.contains("German"));
        assert!(prompt.contains("JSON"));
        // Per-language example phrases are embedded
        assert!(prompt.contains("Tolle App"));

        let prompt = topics_prompt("Fees too high", "en");
        for topic in lexicon::TOPICS {
            assert!(prompt.contains(topic.name), "missing topic {}", topic.name);
        }
        assert!(prompt.contains("Fees too high"));
    }
}
