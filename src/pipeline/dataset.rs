use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::BTreeMap;
use std::path::Path;

use crate::config::DatasetConfig;
use crate::error::Error;
use crate::models::Sentiment;

/// Column layout of the headerless Twitter sentiment export:
/// `id, entity, sentiment, text`.
const HEADERLESS_SENTIMENT_COLUMN: usize = 2;
const HEADERLESS_TEXT_COLUMN: usize = 3;

const SAMPLE: [(&str, Sentiment); 30] = [
    ("I love this product, it is amazing and fantastic!", Sentiment::Positive),
    ("This is the worst experience ever, terrible service", Sentiment::Negative),
    ("Great quality, highly recommend to everyone", Sentiment::Positive),
    ("Terrible quality, very disappointed with purchase", Sentiment::Negative),
    ("Not bad, could be better but acceptable", Sentiment::Neutral),
    ("Absolutely fantastic, best purchase I ever made", Sentiment::Positive),
    ("Horrible experience, waste of money and time", Sentiment::Negative),
    ("Pretty good overall, satisfied with the result", Sentiment::Positive),
    ("Awful customer service, never buying again", Sentiment::Negative),
    ("Excellent work, very happy with everything", Sentiment::Positive),
    ("Disgusting product, never again will I buy", Sentiment::Negative),
    ("Perfect exactly what I needed, amazing", Sentiment::Positive),
    ("Bad quality, not worth the money at all", Sentiment::Negative),
    ("Amazing experience, love it so much", Sentiment::Positive),
    ("Poor service, very disappointed overall", Sentiment::Negative),
    ("Outstanding quality, exceeded all expectations", Sentiment::Positive),
    ("Mediocre product, nothing special really", Sentiment::Neutral),
    ("Brilliant service, highly satisfied customer", Sentiment::Positive),
    ("Unacceptable quality, very poor experience", Sentiment::Negative),
    ("Good value for money, would recommend", Sentiment::Positive),
    ("The worst thing I have ever bought", Sentiment::Negative),
    ("Incredible quality, absolutely love it", Sentiment::Positive),
    ("Disappointing experience, not happy at all", Sentiment::Negative),
    ("Superb product, works perfectly fine", Sentiment::Positive),
    ("Useless product, complete waste of time", Sentiment::Negative),
    ("Decent quality, meets my basic needs", Sentiment::Neutral),
    ("Fantastic service, very professional team", Sentiment::Positive),
    ("Horrible quality, broke after one use", Sentiment::Negative),
    ("Satisfactory product, does the job well", Sentiment::Neutral),
    ("Terrible experience from start to finish", Sentiment::Negative),
];

/// Labeled texts used for training and evaluation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    texts: Vec<String>,
    labels: Vec<Sentiment>,
}

impl Dataset {
    pub fn new(texts: Vec<String>, labels: Vec<Sentiment>) -> Result<Self, Error> {
        if texts.len() != labels.len() {
            return Err(Error::Training(format!(
                "{} texts but {} labels",
                texts.len(),
                labels.len()
            )));
        }
        Ok(Self { texts, labels })
    }

    /// Built-in 30-example dataset used when no CSV is available.
    pub fn sample() -> Self {
        let (texts, labels) = SAMPLE
            .iter()
            .map(|&(text, label)| (text.to_string(), label))
            .unzip();
        Self { texts, labels }
    }

    /// Loads the configured CSV, or the built-in sample when the file does
    /// not exist.
    #[tracing::instrument(skip_all, fields(path = %config.path.display()))]
    pub fn load(config: &DatasetConfig) -> Result<Self, Error> {
        if !config.path.exists() {
            tracing::warn!("Dataset not found, using the built-in sample dataset");
            return Ok(Self::sample());
        }
        let dataset = Self::from_csv(&config.path, config)?;
        tracing::info!(examples = dataset.len(), "Dataset loaded");
        Ok(dataset)
    }

    /// Reads either a CSV whose header names the configured text and
    /// sentiment columns, or a headerless `id, entity, sentiment, text` file.
    /// Rows with empty text or a label outside the known set are skipped.
    pub fn from_csv(path: &Path, config: &DatasetConfig) -> Result<Self, Error> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)?;
        let mut records = reader.records();

        let Some(first) = records.next().transpose()? else {
            return Err(Error::Training(format!("{} is empty", path.display())));
        };

        let find = |name: &str| {
            first
                .iter()
                .position(|field| field.trim().eq_ignore_ascii_case(name))
        };
        let (text_idx, label_idx, first_is_data) =
            match (find(&config.text_column), find(&config.sentiment_column)) {
                (Some(text), Some(label)) => (text, label, false),
                _ => (HEADERLESS_TEXT_COLUMN, HEADERLESS_SENTIMENT_COLUMN, true),
            };

        let mut dataset = Dataset::default();
        let mut skipped = 0usize;
        let mut push = |record: &csv::StringRecord| {
            let text = record.get(text_idx).map(str::trim).unwrap_or_default();
            let label = record.get(label_idx).and_then(|l| l.parse::<Sentiment>().ok());
            match label {
                Some(label) if !text.is_empty() => {
                    dataset.texts.push(text.to_string());
                    dataset.labels.push(label);
                }
                _ => skipped += 1,
            }
        };

        if first_is_data {
            push(&first);
        }
        for record in records {
            push(&record?);
        }

        if skipped > 0 {
            tracing::info!(skipped, "Skipped rows without text or with an unknown label");
        }
        Ok(dataset)
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    pub fn texts(&self) -> &[String] {
        &self.texts
    }

    pub fn labels(&self) -> &[Sentiment] {
        &self.labels
    }

    pub fn class_distribution(&self) -> BTreeMap<Sentiment, usize> {
        let mut counts = BTreeMap::new();
        for &label in &self.labels {
            *counts.entry(label).or_insert(0) += 1;
        }
        counts
    }
}

/// Row indices of a train/test partition.
#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Splits indices per class so both sides keep the class proportions.
///
/// Each class with at least two members sends `round(n * test_size)` of
/// them, clamped to `1..=n-1`, to the test side; singleton classes stay in
/// training. Deterministic for a given seed.
pub fn stratified_split(labels: &[Sentiment], test_size: f64, seed: u64) -> Result<Split, Error> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(Error::Training(format!(
            "test size must be between 0 and 1, got {test_size}"
        )));
    }

    let mut by_class: BTreeMap<Sentiment, Vec<usize>> = BTreeMap::new();
    for (idx, &label) in labels.iter().enumerate() {
        by_class.entry(label).or_default().push(idx);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut test = Vec::new();
    for indices in by_class.values_mut() {
        indices.shuffle(&mut rng);
        let n = indices.len();
        let n_test = if n < 2 {
            0
        } else {
            ((n as f64 * test_size).round() as usize).clamp(1, n - 1)
        };
        test.extend_from_slice(&indices[..n_test]);
        train.extend_from_slice(&indices[n_test..]);
    }

    train.sort_unstable();
    test.sort_unstable();
    Ok(Split { train, test })
}
