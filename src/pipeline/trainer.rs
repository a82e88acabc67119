use crate::classifier::metrics::{accuracy, classification_report, confusion_matrix};
use crate::classifier::{SvmClassifier, SvmParams};
use crate::config::{DatasetConfig, ModelConfig};
use crate::error::Error;
use crate::models::Sentiment;
use crate::nlp::{SparseVector, TfidfVectorizer};

use super::analyzer::SentimentAnalyzer;
use super::dataset::{stratified_split, Dataset};
use super::report::{EvaluationMetrics, TrainingMetrics};

/// Fits the analyzer it owns and persists the result.
pub struct ModelTrainer {
    analyzer: SentimentAnalyzer,
    config: ModelConfig,
}

impl ModelTrainer {
    pub fn new(config: ModelConfig) -> Self {
        Self {
            analyzer: SentimentAnalyzer::new(config.max_features),
            config,
        }
    }

    pub fn analyzer(&self) -> &SentimentAnalyzer {
        &self.analyzer
    }

    pub fn into_analyzer(self) -> SentimentAnalyzer {
        self.analyzer
    }

    /// Normalizes and vectorizes the whole dataset, fits the classifier on a
    /// stratified training split and scores both splits.
    #[tracing::instrument(skip_all, fields(examples = dataset.len()))]
    pub fn train(&mut self, dataset: &Dataset) -> Result<TrainingMetrics, Error> {
        if dataset.is_empty() {
            return Err(Error::Training("dataset is empty".into()));
        }
        tracing::info!(distribution = ?dataset.class_distribution(), "Starting training");

        let processed = self.analyzer.normalizer().normalize_batch(dataset.texts());
        let mut vectorizer = TfidfVectorizer::new(self.config.max_features);
        let features = vectorizer.fit_transform(&processed)?;

        let split = stratified_split(dataset.labels(), self.config.test_size, self.config.random_state)?;
        let select = |indices: &[usize]| -> (Vec<SparseVector>, Vec<Sentiment>) {
            indices
                .iter()
                .map(|&i| (features[i].clone(), dataset.labels()[i]))
                .unzip()
        };
        let (x_train, y_train) = select(&split.train);
        let (x_test, y_test) = select(&split.test);
        tracing::info!(
            train = x_train.len(),
            test = x_test.len(),
            vocabulary = vectorizer.vocabulary_size(),
            "Fitting linear SVM"
        );

        let mut classifier = SvmClassifier::new(SvmParams::default(), self.config.random_state);
        classifier.fit(&x_train, &y_train, vectorizer.vocabulary_size())?;

        let train_pred = classifier.predict_batch(&x_train)?;
        let test_pred = classifier.predict_batch(&x_test)?;
        let classes = classifier.classes().to_vec();

        let metrics = TrainingMetrics {
            train_accuracy: accuracy(&y_train, &train_pred),
            test_accuracy: accuracy(&y_test, &test_pred),
            train_samples: x_train.len(),
            test_samples: x_test.len(),
            classification_report: classification_report(&y_test, &test_pred),
            confusion_matrix: confusion_matrix(&y_test, &test_pred, &classes),
            classes,
        };

        self.analyzer.install(vectorizer, classifier);
        tracing::info!(
            train_accuracy = metrics.train_accuracy,
            test_accuracy = metrics.test_accuracy,
            "Model trained"
        );
        Ok(metrics)
    }

    pub fn save(&self) -> Result<(), Error> {
        self.analyzer.save(&self.config.model_path)
    }

    /// Scores the current model against caller-supplied labels.
    pub fn evaluate_predictions<S: AsRef<str>>(
        &self,
        texts: &[S],
        labels: &[Sentiment],
    ) -> Result<EvaluationMetrics, Error> {
        if texts.len() != labels.len() {
            return Err(Error::Validation(format!(
                "{} texts but {} labels",
                texts.len(),
                labels.len()
            )));
        }

        let predicted = self
            .analyzer
            .analyze_batch(texts)
            .into_iter()
            .map(|r| r.map(|a| a.sentiment))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(EvaluationMetrics {
            accuracy: accuracy(labels, &predicted),
            classification_report: classification_report(labels, &predicted),
        })
    }
}

/// Loads the persisted model, or trains and saves a fresh one when the
/// artifact is missing, corrupt or untrained.
pub fn load_or_train(model: &ModelConfig, dataset: &DatasetConfig) -> Result<SentimentAnalyzer, Error> {
    match SentimentAnalyzer::load(&model.model_path) {
        Ok(analyzer) if analyzer.is_trained() => return Ok(analyzer),
        Ok(_) => tracing::warn!("Stored model is not trained"),
        Err(Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(path = %model.model_path.display(), "No trained model found")
        }
        Err(e) => tracing::error!("Error loading model: {e}"),
    }

    tracing::info!("Training a new model...");
    let mut trainer = ModelTrainer::new(model.clone());
    let dataset = Dataset::load(dataset)?;
    trainer.train(&dataset)?;
    trainer.save()?;
    Ok(trainer.into_analyzer())
}

/// [`load_or_train`] on the blocking pool, for use from async startup code.
pub async fn initialize(model: ModelConfig, dataset: DatasetConfig) -> Result<SentimentAnalyzer, Error> {
    tokio::task::spawn_blocking(move || load_or_train(&model, &dataset))
        .await
        .map_err(|e| Error::Training(format!("training task failed: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(dir: &std::path::Path) -> ModelConfig {
        ModelConfig {
            model_path: dir.join("model.bin"),
            ..ModelConfig::default()
        }
    }

    #[test]
    fn test_train_on_sample_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let mut trainer = ModelTrainer::new(config(dir.path()));

        let metrics = trainer.train(&Dataset::sample()).unwrap();

        assert!(trainer.analyzer().is_trained());
        assert_eq!(metrics.train_samples, 23);
        assert_eq!(metrics.test_samples, 7);
        assert_eq!(metrics.classes, Sentiment::ALL.to_vec());
        assert!((0.0..=1.0).contains(&metrics.test_accuracy));
        assert!((0.0..=1.0).contains(&metrics.train_accuracy));
        assert_eq!(metrics.confusion_matrix.matrix.len(), 3);

        let analysis = trainer.analyzer().analyze("I love this, amazing!").unwrap();
        let sum: f64 = analysis.probabilities.values().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert!((0.0..=1.0).contains(&analysis.confidence));
    }

    #[test]
    fn test_single_class_dataset_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut trainer = ModelTrainer::new(config(dir.path()));
        let dataset = Dataset::new(
            vec!["great product".into(), "lovely service".into(), "superb value".into()],
            vec![Sentiment::Positive; 3],
        )
        .unwrap();

        assert!(matches!(trainer.train(&dataset), Err(Error::Training(_))));
        assert!(!trainer.analyzer().is_trained());
    }

    #[test]
    fn test_evaluate_predictions() {
        let dir = tempfile::tempdir().unwrap();
        let mut trainer = ModelTrainer::new(config(dir.path()));
        trainer.train(&Dataset::sample()).unwrap();

        let metrics = trainer
            .evaluate_predictions(
                &["Amazing experience, love it so much", "Poor service, very disappointed overall"],
                &[Sentiment::Positive, Sentiment::Negative],
            )
            .unwrap();
        assert!((0.0..=1.0).contains(&metrics.accuracy));
        assert!(trainer.evaluate_predictions(&["one"], &[]).is_err());
    }

    #[test]
    fn test_load_or_train_persists_then_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let model = config(dir.path());
        let dataset = DatasetConfig {
            path: dir.path().join("missing.csv"),
            ..DatasetConfig::default()
        };

        let trained = load_or_train(&model, &dataset).unwrap();
        assert!(model.model_path.exists());

        let reloaded = load_or_train(&model, &dataset).unwrap();
        let text = "Terrible quality, very disappointed";
        let (a, b) = (trained.analyze(text).unwrap(), reloaded.analyze(text).unwrap());
        assert_eq!(a.sentiment, b.sentiment);
        assert!((a.confidence - b.confidence).abs() < 1e-9);
        assert_eq!(
            trained.vectorizer().vocabulary(),
            reloaded.vectorizer().vocabulary()
        );
    }

    #[test]
    fn test_corrupt_artifact_triggers_retraining() {
        let dir = tempfile::tempdir().unwrap();
        let model = config(dir.path());
        std::fs::write(&model.model_path, "garbage").unwrap();

        let dataset = DatasetConfig {
            path: dir.path().join("missing.csv"),
            ..DatasetConfig::default()
        };
        let analyzer = load_or_train(&model, &dataset).unwrap();
        assert!(analyzer.is_trained());
    }
}
