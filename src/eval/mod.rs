//! Binary classification evaluation
//!
//! Threshold-free metrics for probability scores: ROC-AUC (rank statistic
//! with tie handling) and average precision, plus ROC / precision-recall
//! curve points and a small SVG renderer for the curve artifacts logged
//! with each training run.

mod plot;

pub use plot::curve_svg;

use serde::{Deserialize, Serialize};

/// Errors from metric computation
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error("Length mismatch: {labels} labels for {scores} scores")]
    LengthMismatch { labels: usize, scores: usize },

    #[error("Cannot evaluate an empty prediction set")]
    Empty,

    #[error("Evaluation requires both classes in the label set")]
    SingleClass,
}

/// Result alias for evaluation operations
pub type Result<T> = std::result::Result<T, EvalError>;

/// Held-out metrics for one training run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BinaryMetrics {
    pub roc_auc: f64,
    pub pr_auc: f64,
}

/// Compute ROC-AUC and average precision for one score set
pub fn compute_metrics(y_true: &[u8], y_score: &[f64]) -> Result<BinaryMetrics> {
    Ok(BinaryMetrics {
        roc_auc: roc_auc(y_true, y_score)?,
        pr_auc: average_precision(y_true, y_score)?,
    })
}

fn check(y_true: &[u8], y_score: &[f64]) -> Result<(usize, usize)> {
    if y_true.len() != y_score.len() {
        return Err(EvalError::LengthMismatch {
            labels: y_true.len(),
            scores: y_score.len(),
        });
    }
    if y_true.is_empty() {
        return Err(EvalError::Empty);
    }
    let positives = y_true.iter().filter(|&&y| y == 1).count();
    let negatives = y_true.len() - positives;
    if positives == 0 || negatives == 0 {
        return Err(EvalError::SingleClass);
    }
    Ok((positives, negatives))
}

/// ROC-AUC via the Mann-Whitney rank statistic; tied scores receive their
/// average rank.
pub fn roc_auc(y_true: &[u8], y_score: &[f64]) -> Result<f64> {
    let (positives, negatives) = check(y_true, y_score)?;

    let mut order: Vec<usize> = (0..y_score.len()).collect();
    order.sort_by(|&a, &b| {
        y_score[a]
            .partial_cmp(&y_score[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut positive_rank_sum = 0.0;
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && y_score[order[j + 1]] == y_score[order[i]] {
            j += 1;
        }
        // ranks are 1-based; ties share the average rank of their block
        let avg_rank = (i + j + 2) as f64 / 2.0;
        for &idx in &order[i..=j] {
            if y_true[idx] == 1 {
                positive_rank_sum += avg_rank;
            }
        }
        i = j + 1;
    }

    let n_pos = positives as f64;
    let n_neg = negatives as f64;
    Ok((positive_rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg))
}

/// Average precision: the step-wise integral of the precision-recall curve
pub fn average_precision(y_true: &[u8], y_score: &[f64]) -> Result<f64> {
    let (positives, _) = check(y_true, y_score)?;

    let order = descending_order(y_score);
    let mut tp = 0usize;
    let mut fp = 0usize;
    let mut prev_recall = 0.0;
    let mut ap = 0.0;

    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && y_score[order[j + 1]] == y_score[order[i]] {
            j += 1;
        }
        for &idx in &order[i..=j] {
            if y_true[idx] == 1 {
                tp += 1;
            } else {
                fp += 1;
            }
        }
        let precision = tp as f64 / (tp + fp) as f64;
        let recall = tp as f64 / positives as f64;
        ap += (recall - prev_recall) * precision;
        prev_recall = recall;
        i = j + 1;
    }

    Ok(ap)
}

/// ROC curve points as `(fpr, tpr)`, from `(0,0)` to `(1,1)`
pub fn roc_curve(y_true: &[u8], y_score: &[f64]) -> Result<Vec<(f64, f64)>> {
    let (positives, negatives) = check(y_true, y_score)?;

    let order = descending_order(y_score);
    let mut points = vec![(0.0, 0.0)];
    let mut tp = 0usize;
    let mut fp = 0usize;

    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && y_score[order[j + 1]] == y_score[order[i]] {
            j += 1;
        }
        for &idx in &order[i..=j] {
            if y_true[idx] == 1 {
                tp += 1;
            } else {
                fp += 1;
            }
        }
        points.push((fp as f64 / negatives as f64, tp as f64 / positives as f64));
        i = j + 1;
    }

    Ok(points)
}

/// Precision-recall curve points as `(recall, precision)`, starting at
/// `(0, 1)`
pub fn pr_curve(y_true: &[u8], y_score: &[f64]) -> Result<Vec<(f64, f64)>> {
    let (positives, _) = check(y_true, y_score)?;

    let order = descending_order(y_score);
    let mut points = vec![(0.0, 1.0)];
    let mut tp = 0usize;
    let mut fp = 0usize;

    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && y_score[order[j + 1]] == y_score[order[i]] {
            j += 1;
        }
        for &idx in &order[i..=j] {
            if y_true[idx] == 1 {
                tp += 1;
            } else {
                fp += 1;
            }
        }
        points.push((
            tp as f64 / positives as f64,
            tp as f64 / (tp + fp) as f64,
        ));
        i = j + 1;
    }

    Ok(points)
}

fn descending_order(scores: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    order
}
