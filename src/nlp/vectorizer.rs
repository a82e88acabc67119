use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::error::Error;

/// Sparse row of a document-term matrix: `(column, value)` pairs in
/// ascending column order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVector(Vec<(usize, f64)>);

impl SparseVector {
    pub fn from_pairs(mut pairs: Vec<(usize, f64)>) -> Self {
        pairs.sort_by_key(|&(idx, _)| idx);
        Self(pairs)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(usize, f64)> {
        self.0.iter()
    }

    pub fn nnz(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn dot(&self, dense: &[f64]) -> f64 {
        self.0
            .iter()
            .map(|&(idx, value)| dense.get(idx).copied().unwrap_or_default() * value)
            .sum()
    }

    pub fn squared_norm(&self) -> f64 {
        self.0.iter().map(|&(_, v)| v * v).sum()
    }

    /// `dense += scale * self`
    pub fn add_to(&self, dense: &mut [f64], scale: f64) {
        for &(idx, value) in &self.0 {
            if let Some(slot) = dense.get_mut(idx) {
                *slot += scale * value;
            }
        }
    }

    pub fn to_dense(&self, width: usize) -> Vec<f64> {
        let mut dense = vec![0.0; width];
        self.add_to(&mut dense, 1.0);
        dense
    }
}

/// TF-IDF vectorizer over whitespace-separated, already normalized text.
///
/// Keeps the `max_features` most frequent terms of the fitted corpus, uses
/// smoothed IDF `ln((1 + n) / (1 + df)) + 1`, and L2-normalizes every row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    max_features: usize,
    vocabulary: BTreeMap<String, usize>,
    idf: Vec<f64>,
}

impl TfidfVectorizer {
    pub fn new(max_features: usize) -> Self {
        Self {
            max_features,
            vocabulary: BTreeMap::new(),
            idf: Vec::new(),
        }
    }

    pub fn max_features(&self) -> usize {
        self.max_features
    }

    pub fn vocabulary(&self) -> &BTreeMap<String, usize> {
        &self.vocabulary
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn idf_values(&self) -> &[f64] {
        &self.idf
    }

    pub fn is_fitted(&self) -> bool {
        !self.vocabulary.is_empty()
    }

    pub fn fit<S: AsRef<str>>(&mut self, documents: &[S]) -> Result<(), Error> {
        let mut term_counts: HashMap<&str, usize> = HashMap::new();
        let mut doc_freq: HashMap<&str, usize> = HashMap::new();

        for doc in documents {
            let mut seen = HashSet::new();
            for term in doc.as_ref().split_whitespace() {
                *term_counts.entry(term).or_insert(0) += 1;
                if seen.insert(term) {
                    *doc_freq.entry(term).or_insert(0) += 1;
                }
            }
        }

        if term_counts.is_empty() {
            return Err(Error::Training(
                "empty vocabulary; documents contain only stop words".into(),
            ));
        }

        // Most frequent first, alphabetical among equals.
        let mut ranked: Vec<(&str, usize)> = term_counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.truncate(self.max_features);

        let mut kept: Vec<&str> = ranked.into_iter().map(|(term, _)| term).collect();
        kept.sort_unstable();

        let n_docs = documents.len() as f64;
        self.vocabulary = kept
            .iter()
            .enumerate()
            .map(|(idx, term)| (term.to_string(), idx))
            .collect();
        self.idf = kept
            .iter()
            .map(|term| {
                let df = doc_freq.get(term).copied().unwrap_or_default() as f64;
                ((1.0 + n_docs) / (1.0 + df)).ln() + 1.0
            })
            .collect();

        Ok(())
    }

    /// Terms outside the fitted vocabulary are ignored.
    pub fn transform(&self, document: &str) -> SparseVector {
        let mut counts: HashMap<usize, f64> = HashMap::new();
        for term in document.split_whitespace() {
            if let Some(&idx) = self.vocabulary.get(term) {
                *counts.entry(idx).or_insert(0.0) += 1.0;
            }
        }

        let weighted: Vec<(usize, f64)> = counts
            .into_iter()
            .map(|(idx, tf)| (idx, tf * self.idf[idx]))
            .collect();

        let norm = weighted.iter().map(|&(_, v)| v * v).sum::<f64>().sqrt();
        if norm == 0.0 {
            return SparseVector::default();
        }

        SparseVector::from_pairs(weighted.into_iter().map(|(i, v)| (i, v / norm)).collect())
    }

    pub fn transform_batch<S: AsRef<str>>(&self, documents: &[S]) -> Vec<SparseVector> {
        documents.iter().map(|d| self.transform(d.as_ref())).collect()
    }

    pub fn fit_transform<S: AsRef<str>>(&mut self, documents: &[S]) -> Result<Vec<SparseVector>, Error> {
        self.fit(documents)?;
        Ok(self.transform_batch(documents))
    }
}
