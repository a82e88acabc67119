use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

use super::artifact::ModelArtifact;
use crate::classifier::SvmClassifier;
use crate::error::Error;
use crate::models::Sentiment;
use crate::nlp::{TextNormalizer, TfidfVectorizer};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Analysis {
    pub sentiment: Sentiment,
    pub confidence: f64,
    pub probabilities: BTreeMap<Sentiment, f64>,
    pub original_text: String,
    pub processed_text: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ModelInfo {
    pub is_trained: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classes: Option<Vec<Sentiment>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n_features: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kernel: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

/// Normalizer, vectorizer and classifier applied as one unit.
#[derive(Debug, Clone)]
pub struct SentimentAnalyzer {
    normalizer: TextNormalizer,
    vectorizer: TfidfVectorizer,
    classifier: SvmClassifier,
    is_trained: bool,
}

impl SentimentAnalyzer {
    pub fn new(max_features: usize) -> Self {
        Self {
            normalizer: TextNormalizer::new(),
            vectorizer: TfidfVectorizer::new(max_features),
            classifier: SvmClassifier::default(),
            is_trained: false,
        }
    }

    pub fn is_trained(&self) -> bool {
        self.is_trained
    }

    pub fn normalizer(&self) -> &TextNormalizer {
        &self.normalizer
    }

    pub fn vectorizer(&self) -> &TfidfVectorizer {
        &self.vectorizer
    }

    pub fn classifier(&self) -> &SvmClassifier {
        &self.classifier
    }

    /// Replaces the fitted components and marks the analyzer trained.
    pub(crate) fn install(&mut self, vectorizer: TfidfVectorizer, classifier: SvmClassifier) {
        self.vectorizer = vectorizer;
        self.classifier = classifier;
        self.is_trained = true;
    }

    pub fn analyze(&self, text: &str) -> Result<Analysis, Error> {
        if !self.is_trained {
            return Err(Error::NotTrained);
        }

        let processed_text = self.normalizer.normalize(text);
        let features = self.vectorizer.transform(&processed_text);
        let prediction = self.classifier.predict(&features)?;

        tracing::debug!(
            sentiment = %prediction.label,
            confidence = prediction.confidence,
            "Analysis completed"
        );

        Ok(Analysis {
            sentiment: prediction.label,
            confidence: prediction.confidence,
            probabilities: prediction.probabilities,
            original_text: text.to_string(),
            processed_text,
        })
    }

    /// One result per input, in input order.
    pub fn analyze_batch<S: AsRef<str>>(&self, texts: &[S]) -> Vec<Result<Analysis, Error>> {
        texts.iter().map(|t| self.analyze(t.as_ref())).collect()
    }

    pub fn info(&self) -> ModelInfo {
        if !self.is_trained {
            return ModelInfo {
                is_trained: false,
                classes: None,
                n_features: None,
                kernel: None,
                message: Some("The model has not been trained yet"),
            };
        }

        ModelInfo {
            is_trained: true,
            classes: Some(self.classifier.classes().to_vec()),
            n_features: Some(self.vectorizer.max_features()),
            kernel: Some("linear"),
            message: None,
        }
    }

    pub fn to_artifact(&self) -> ModelArtifact {
        ModelArtifact {
            vectorizer: self.vectorizer.clone(),
            classifier: self.classifier.clone(),
            is_trained: self.is_trained,
        }
    }

    pub fn from_artifact(artifact: ModelArtifact) -> Self {
        let is_trained = artifact.is_trained && artifact.classifier.is_fitted();
        Self {
            normalizer: TextNormalizer::new(),
            vectorizer: artifact.vectorizer,
            classifier: artifact.classifier,
            is_trained,
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), Error> {
        self.to_artifact().save(path)
    }

    pub fn load(path: &Path) -> Result<Self, Error> {
        ModelArtifact::load(path).map(Self::from_artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untrained_analyzer() {
        let analyzer = SentimentAnalyzer::new(100);
        assert!(matches!(analyzer.analyze("great"), Err(Error::NotTrained)));

        let info = analyzer.info();
        assert!(!info.is_trained);
        assert!(info.message.is_some());
        assert!(info.classes.is_none());
    }

    #[test]
    fn test_untrained_info_serializes_without_model_fields() {
        let json = serde_json::to_value(SentimentAnalyzer::new(10).info()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "is_trained": false,
                "message": "The model has not been trained yet"
            })
        );
    }

    #[test]
    fn test_batch_of_untrained_analyzer_keeps_length() {
        let analyzer = SentimentAnalyzer::new(100);
        let results = analyzer.analyze_batch(&["a", "b", "c"]);
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.is_err()));
    }
}
