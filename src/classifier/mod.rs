//! One-vs-rest linear SVM with Platt-calibrated class probabilities.

pub mod metrics;
mod platt;
mod svm;

pub use metrics::{ClassMetrics, ClassificationReport, ConfusionMatrix};
pub use platt::PlattScaling;
pub use svm::{LinearSvm, SvmParams};

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::Error;
use crate::models::Sentiment;
use crate::nlp::SparseVector;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BinaryModel {
    svm: LinearSvm,
    calibration: PlattScaling,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label: Sentiment,
    /// Probability of `label`.
    pub confidence: f64,
    pub probabilities: BTreeMap<Sentiment, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SvmClassifier {
    params: SvmParams,
    seed: u64,
    classes: Vec<Sentiment>,
    models: Vec<BinaryModel>,
    n_features: usize,
}

impl SvmClassifier {
    pub fn new(params: SvmParams, seed: u64) -> Self {
        Self {
            params,
            seed,
            classes: Vec::new(),
            models: Vec::new(),
            n_features: 0,
        }
    }

    pub fn is_fitted(&self) -> bool {
        !self.models.is_empty()
    }

    /// Sorted class labels seen during training.
    pub fn classes(&self) -> &[Sentiment] {
        &self.classes
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    #[tracing::instrument(skip_all, fields(samples = samples.len(), n_features = n_features))]
    pub fn fit(
        &mut self,
        samples: &[SparseVector],
        labels: &[Sentiment],
        n_features: usize,
    ) -> Result<(), Error> {
        if samples.len() != labels.len() {
            return Err(Error::Training(format!(
                "{} samples but {} labels",
                samples.len(),
                labels.len()
            )));
        }

        let mut classes = labels.to_vec();
        classes.sort();
        classes.dedup();
        if classes.len() < 2 {
            return Err(Error::Training(
                "at least two distinct labels are required".into(),
            ));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut models = Vec::with_capacity(classes.len());
        for &class in &classes {
            let targets: Vec<bool> = labels.iter().map(|&l| l == class).collect();
            let svm = LinearSvm::fit(samples, &targets, n_features, &self.params, &mut rng);
            let decisions: Vec<f64> = samples.iter().map(|x| svm.decision_function(x)).collect();
            let calibration = PlattScaling::fit(&decisions, &targets);
            models.push(BinaryModel { svm, calibration });
        }

        tracing::debug!(classes = ?classes, "fitted one-vs-rest models");
        self.classes = classes;
        self.models = models;
        self.n_features = n_features;
        Ok(())
    }

    /// Class probabilities summing to 1, keyed by label.
    pub fn predict_proba(&self, x: &SparseVector) -> Result<BTreeMap<Sentiment, f64>, Error> {
        if !self.is_fitted() {
            return Err(Error::NotTrained);
        }

        let raw: Vec<f64> = self
            .models
            .iter()
            .map(|m| m.calibration.probability(m.svm.decision_function(x)))
            .collect();
        let total: f64 = raw.iter().sum();
        let uniform = 1.0 / self.classes.len() as f64;

        Ok(self
            .classes
            .iter()
            .zip(raw)
            .map(|(&class, p)| {
                let p = if total > 0.0 { p / total } else { uniform };
                (class, p)
            })
            .collect())
    }

    pub fn predict(&self, x: &SparseVector) -> Result<Prediction, Error> {
        let probabilities = self.predict_proba(x)?;

        // Ties resolve to the first class in sorted order.
        let (label, confidence) = probabilities.iter().fold(
            (self.classes[0], f64::NEG_INFINITY),
            |best, (&class, &p)| if p > best.1 { (class, p) } else { best },
        );

        Ok(Prediction {
            label,
            confidence,
            probabilities,
        })
    }

    pub fn predict_batch(&self, rows: &[SparseVector]) -> Result<Vec<Sentiment>, Error> {
        rows.iter().map(|x| self.predict(x).map(|p| p.label)).collect()
    }
}

impl Default for SvmClassifier {
    fn default() -> Self {
        Self::new(SvmParams::default(), 42)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Sentiment::*;

    fn onehot(idx: usize, width: usize) -> SparseVector {
        let mut pairs = vec![(idx, 0.9)];
        pairs.push(((idx + 1) % width, 0.1));
        SparseVector::from_pairs(pairs)
    }

    fn toy_data() -> (Vec<SparseVector>, Vec<Sentiment>) {
        let mut samples = Vec::new();
        let mut labels = Vec::new();
        for _ in 0..5 {
            samples.push(onehot(0, 3));
            labels.push(Negative);
            samples.push(onehot(1, 3));
            labels.push(Neutral);
            samples.push(onehot(2, 3));
            labels.push(Positive);
        }
        (samples, labels)
    }

    #[test]
    fn test_unfitted_classifier_reports_not_trained() {
        let clf = SvmClassifier::default();
        assert!(matches!(clf.predict(&onehot(0, 3)), Err(Error::NotTrained)));
    }

    #[test]
    fn test_single_label_is_rejected() {
        let mut clf = SvmClassifier::default();
        let result = clf.fit(&[onehot(0, 3), onehot(1, 3)], &[Positive, Positive], 3);
        assert!(matches!(result, Err(Error::Training(_))));
    }

    #[test]
    fn test_fit_and_predict_three_classes() {
        let (samples, labels) = toy_data();
        let mut clf = SvmClassifier::default();
        clf.fit(&samples, &labels, 3).unwrap();

        assert_eq!(clf.classes(), &[Negative, Neutral, Positive]);
        for (x, &label) in samples.iter().zip(&labels) {
            let prediction = clf.predict(x).unwrap();
            assert_eq!(prediction.label, label);

            let sum: f64 = prediction.probabilities.values().sum();
            assert!((sum - 1.0).abs() < 1e-9);
            assert!((0.0..=1.0).contains(&prediction.confidence));
            assert_eq!(prediction.confidence, prediction.probabilities[&label]);
        }
    }

    #[test]
    fn test_zero_vector_still_yields_distribution() {
        let (samples, labels) = toy_data();
        let mut clf = SvmClassifier::default();
        clf.fit(&samples, &labels, 3).unwrap();

        let prediction = clf.predict(&SparseVector::default()).unwrap();
        let sum: f64 = prediction.probabilities.values().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }
}
