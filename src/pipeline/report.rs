use serde::Serialize;
use std::fmt;

use crate::classifier::{ClassificationReport, ConfusionMatrix};
use crate::models::Sentiment;

const RULE_WIDTH: usize = 70;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TrainingMetrics {
    pub train_accuracy: f64,
    pub test_accuracy: f64,
    pub train_samples: usize,
    pub test_samples: usize,
    pub classes: Vec<Sentiment>,
    /// Scored on the held-out split.
    pub classification_report: ClassificationReport,
    pub confusion_matrix: ConfusionMatrix,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EvaluationMetrics {
    pub accuracy: f64,
    pub classification_report: ClassificationReport,
}

fn pct(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

impl fmt::Display for TrainingMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let heavy = "=".repeat(RULE_WIDTH);
        let light = "-".repeat(RULE_WIDTH);

        writeln!(f, "{heavy}")?;
        writeln!(f, "{:^width$}", "TRAINING RESULTS", width = RULE_WIDTH)?;
        writeln!(f, "{heavy}")?;

        writeln!(f, "\nACCURACY:")?;
        writeln!(f, "   Training:  {}", pct(self.train_accuracy))?;
        writeln!(f, "   Testing:   {}", pct(self.test_accuracy))?;

        let classes: Vec<&str> = self.classes.iter().map(Sentiment::as_str).collect();
        writeln!(f, "\nDATASET:")?;
        writeln!(f, "   Training samples: {}", self.train_samples)?;
        writeln!(f, "   Testing samples:  {}", self.test_samples)?;
        writeln!(f, "   Classes: {}", classes.join(", "))?;

        writeln!(f, "\nCLASSIFICATION REPORT:")?;
        writeln!(f, "{light}")?;
        writeln!(
            f,
            "{:<15} {:<12} {:<12} {:<12} {:<10}",
            "Class", "Precision", "Recall", "F1-Score", "Support"
        )?;
        writeln!(f, "{light}")?;
        for class in &self.classes {
            if let Some(m) = self.classification_report.classes.get(class) {
                writeln!(
                    f,
                    "{:<15} {:<12} {:<12} {:<12} {:<10}",
                    class.as_str(),
                    pct(m.precision),
                    pct(m.recall),
                    pct(m.f1_score),
                    m.support
                )?;
            }
        }

        writeln!(f, "\nCONFUSION MATRIX:")?;
        writeln!(f, "{light}")?;
        write!(f, "{:<15}", "Actual \\ Pred")?;
        for label in &self.confusion_matrix.labels {
            write!(f, "{:<12}", label.as_str())?;
        }
        writeln!(f)?;
        writeln!(f, "{light}")?;
        for (label, row) in self.confusion_matrix.labels.iter().zip(&self.confusion_matrix.matrix) {
            write!(f, "{:<15}", label.as_str())?;
            for count in row {
                write!(f, "{:<12}", count)?;
            }
            writeln!(f)?;
        }

        writeln!(f, "{heavy}")
    }
}
