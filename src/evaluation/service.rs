//! Metric computation for held-out evaluation.

use crate::common::error::{RiskError, RiskResult};
use crate::training::domain::{Classifier, FittedModel};

use super::domain::{ClassMetrics, ClassificationReport, ConfusionMatrix, EvalSuite};

/// Probabilities above this are predicted as the positive class.
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Score `model` on a held-out split and compute every metric.
pub fn evaluate(model: &FittedModel, x: &[Vec<f64>], y: &[u8]) -> RiskResult<EvalSuite> {
    if x.len() != y.len() || x.is_empty() {
        return Err(RiskError::Training {
            details: format!("evaluation needs matching rows and labels, got {} and {}", x.len(), y.len()),
        });
    }
    let scores = x
        .iter()
        .map(|row| model.predict_proba(row))
        .collect::<RiskResult<Vec<f64>>>()?;
    let predictions: Vec<u8> = scores
        .iter()
        .map(|&p| u8::from(p > DECISION_THRESHOLD))
        .collect();

    let confusion = confusion_matrix(y, &predictions);
    Ok(EvalSuite {
        model: model.kind(),
        report: classification_report(&confusion),
        confusion,
        roc_auc: roc_auc(y, &scores),
    })
}

pub fn confusion_matrix(labels: &[u8], predictions: &[u8]) -> ConfusionMatrix {
    let mut m = ConfusionMatrix::default();
    for (&truth, &pred) in labels.iter().zip(predictions) {
        match (truth, pred) {
            (0, 0) => m.tn += 1,
            (0, _) => m.fp += 1,
            (_, 0) => m.fn_ += 1,
            _ => m.tp += 1,
        }
    }
    m
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

fn class_metrics(true_pos: usize, false_pos: usize, false_neg: usize) -> ClassMetrics {
    let precision = ratio(true_pos, true_pos + false_pos);
    let recall = ratio(true_pos, true_pos + false_neg);
    let f1 = if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    };
    ClassMetrics {
        precision,
        recall,
        f1,
        support: true_pos + false_neg,
    }
}

pub fn classification_report(m: &ConfusionMatrix) -> ClassificationReport {
    let negative = class_metrics(m.tn, m.fn_, m.fp);
    let positive = class_metrics(m.tp, m.fp, m.fn_);
    let total = m.total();

    let macro_avg = ClassMetrics {
        precision: (negative.precision + positive.precision) / 2.0,
        recall: (negative.recall + positive.recall) / 2.0,
        f1: (negative.f1 + positive.f1) / 2.0,
        support: total,
    };
    let weight = |a: f64, b: f64| {
        if total == 0 {
            0.0
        } else {
            (a * negative.support as f64 + b * positive.support as f64) / total as f64
        }
    };
    let weighted_avg = ClassMetrics {
        precision: weight(negative.precision, positive.precision),
        recall: weight(negative.recall, positive.recall),
        f1: weight(negative.f1, positive.f1),
        support: total,
    };

    ClassificationReport {
        classes: [negative, positive],
        accuracy: ratio(m.tn + m.tp, total),
        macro_avg,
        weighted_avg,
    }
}

/// Area under the ROC curve via the Mann–Whitney rank statistic. Tied
/// scores share their average rank.
pub fn roc_auc(labels: &[u8], scores: &[f64]) -> Option<f64> {
    let n_pos = labels.iter().filter(|&&l| l == 1).count();
    let n_neg = labels.len() - n_pos;
    if n_pos == 0 || n_neg == 0 || labels.len() != scores.len() {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut ranks = vec![0.0; scores.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        // 1-based ranks start+1..=end share their mean.
        let avg = (start + 1 + end) as f64 / 2.0;
        for &i in &order[start..end] {
            ranks[i] = avg;
        }
        start = end;
    }

    let pos_rank_sum: f64 = labels
        .iter()
        .zip(&ranks)
        .filter(|(&l, _)| l == 1)
        .map(|(_, &r)| r)
        .sum();
    let u = pos_rank_sum - (n_pos * (n_pos + 1)) as f64 / 2.0;
    Some(u / (n_pos * n_neg) as f64)
}
