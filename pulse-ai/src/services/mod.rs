//! Service modules for the enrichment pipeline

pub mod classifier;
pub mod enrichment;
pub mod lexicon;
pub mod ollama;
pub mod progress;

pub use classifier::CommentClassifier;
pub use enrichment::EnrichmentOrchestrator;
pub use ollama::{ClassifierError, OllamaClient};
pub use progress::ProgressTracker;
