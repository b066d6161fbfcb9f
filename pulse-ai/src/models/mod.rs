//! Data models for pulse-ai (survey analytics + enrichment service)

pub mod classification;
pub mod progress;
pub mod response;

pub use classification::{ClassifiedComment, ParseOutcome, SentimentResult};
pub use progress::{ProgressSnapshot, RunSummary};
pub use response::{NewResponse, ResponseGroup, Sentiment, SurveyResponse, TopicScore};
