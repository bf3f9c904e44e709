//! Held-out evaluation metrics for binary classifiers.

use std::fmt;

use serde::Serialize;

use crate::training::domain::ModelKind;

/// 2×2 counts with the negative class first.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct ConfusionMatrix {
    pub tn: usize,
    pub fp: usize,
    pub fn_: usize,
    pub tp: usize,
}

impl ConfusionMatrix {
    pub fn total(&self) -> usize {
        self.tn + self.fp + self.fn_ + self.tp
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Per-class metrics (index 0 and 1), accuracy and averages.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
pub struct ClassificationReport {
    pub classes: [ClassMetrics; 2],
    pub accuracy: f64,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
}

/// Evaluation summary of one candidate model.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EvalSuite {
    pub model: ModelKind,
    pub report: ClassificationReport,
    pub confusion: ConfusionMatrix,
    /// `None` when the held-out labels contain a single class.
    pub roc_auc: Option<f64>,
}

impl fmt::Display for EvalSuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = &self.report;
        writeln!(f, "Model: {}", self.model.as_str())?;
        writeln!(f, "Classification Report:")?;
        writeln!(
            f,
            "{:>14} {:>10} {:>10} {:>10} {:>10}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        for (label, m) in r.classes.iter().enumerate() {
            writeln!(
                f,
                "{:>14} {:>10.2} {:>10.2} {:>10.2} {:>10}",
                label, m.precision, m.recall, m.f1, m.support
            )?;
        }
        let total = r.macro_avg.support;
        writeln!(f, "{:>14} {:>10} {:>10} {:>10.2} {:>10}", "accuracy", "", "", r.accuracy, total)?;
        for (name, m) in [("macro avg", &r.macro_avg), ("weighted avg", &r.weighted_avg)] {
            writeln!(
                f,
                "{:>14} {:>10.2} {:>10.2} {:>10.2} {:>10}",
                name, m.precision, m.recall, m.f1, m.support
            )?;
        }
        let c = &self.confusion;
        writeln!(f, "Confusion Matrix:")?;
        writeln!(f, "[[{} {}]", c.tn, c.fp)?;
        writeln!(f, " [{} {}]]", c.fn_, c.tp)?;
        match self.roc_auc {
            Some(auc) => write!(f, "ROC-AUC Score: {auc:.4}"),
            None => write!(f, "ROC-AUC Score: undefined (single class)"),
        }
    }
}
