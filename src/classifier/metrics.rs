use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::Sentiment;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Default)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ClassificationReport {
    pub classes: BTreeMap<Sentiment, ClassMetrics>,
    pub accuracy: f64,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
}

/// Rows are actual classes, columns predicted ones, both in `labels` order.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ConfusionMatrix {
    pub labels: Vec<Sentiment>,
    pub matrix: Vec<Vec<usize>>,
}

pub fn accuracy(actual: &[Sentiment], predicted: &[Sentiment]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    let correct = actual
        .iter()
        .zip(predicted)
        .filter(|(a, p)| a == p)
        .count();
    correct as f64 / actual.len() as f64
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

pub fn confusion_matrix(
    actual: &[Sentiment],
    predicted: &[Sentiment],
    labels: &[Sentiment],
) -> ConfusionMatrix {
    let mut matrix = vec![vec![0; labels.len()]; labels.len()];
    for (a, p) in actual.iter().zip(predicted) {
        let row = labels.iter().position(|l| l == a);
        let col = labels.iter().position(|l| l == p);
        if let (Some(row), Some(col)) = (row, col) {
            matrix[row][col] += 1;
        }
    }
    ConfusionMatrix {
        labels: labels.to_vec(),
        matrix,
    }
}

/// Per-class precision, recall and F1 over the union of actual and
/// predicted labels. Undefined ratios count as 0.
pub fn classification_report(actual: &[Sentiment], predicted: &[Sentiment]) -> ClassificationReport {
    let mut labels: Vec<Sentiment> = actual.iter().chain(predicted).copied().collect();
    labels.sort();
    labels.dedup();

    let mut classes = BTreeMap::new();
    for &label in &labels {
        let tp = actual
            .iter()
            .zip(predicted)
            .filter(|&(&a, &p)| a == label && p == label)
            .count();
        let predicted_count = predicted.iter().filter(|&&p| p == label).count();
        let support = actual.iter().filter(|&&a| a == label).count();

        let precision = ratio(tp, predicted_count);
        let recall = ratio(tp, support);
        let f1_score = if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        };

        classes.insert(
            label,
            ClassMetrics {
                precision,
                recall,
                f1_score,
                support,
            },
        );
    }

    let total_support: usize = classes.values().map(|m| m.support).sum();
    let n = classes.len().max(1) as f64;
    let macro_avg = ClassMetrics {
        precision: classes.values().map(|m| m.precision).sum::<f64>() / n,
        recall: classes.values().map(|m| m.recall).sum::<f64>() / n,
        f1_score: classes.values().map(|m| m.f1_score).sum::<f64>() / n,
        support: total_support,
    };

    let weighted = |f: fn(&ClassMetrics) -> f64| -> f64 {
        if total_support == 0 {
            return 0.0;
        }
        classes
            .values()
            .map(|m| f(m) * m.support as f64)
            .sum::<f64>()
            / total_support as f64
    };
    let weighted_avg = ClassMetrics {
        precision: weighted(|m| m.precision),
        recall: weighted(|m| m.recall),
        f1_score: weighted(|m| m.f1_score),
        support: total_support,
    };

    ClassificationReport {
        accuracy: accuracy(actual, predicted),
        classes,
        macro_avg,
        weighted_avg,
    }
}
