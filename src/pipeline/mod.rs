//! Training and inference pipeline around the classifier.

mod analyzer;
mod artifact;
mod dataset;
mod report;
mod trainer;

pub use analyzer::{Analysis, ModelInfo, SentimentAnalyzer};
pub use artifact::ModelArtifact;
pub use dataset::{stratified_split, Dataset, Split};
pub use report::{EvaluationMetrics, TrainingMetrics};
pub use trainer::{initialize, load_or_train, ModelTrainer};
