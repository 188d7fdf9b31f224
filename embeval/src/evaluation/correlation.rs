//! Correlation between predicted and gold-standard scores
//!
//! Provides:
//! - Pearson correlation
//! - Spearman rank correlation (ties get their average rank)
//! - Harmonic mean of the two

use crate::error::EvalError;

/// Pearson correlation coefficient
///
/// Fails when the inputs differ in length, hold fewer than two values, or
/// either side has zero variance.
pub fn pearson(x: &[f64], y: &[f64]) -> Result<f64, EvalError> {
    if x.len() != y.len() {
        return Err(EvalError::DegenerateCorrelation(format!(
            "length mismatch ({} vs {})",
            x.len(),
            y.len()
        )));
    }
    if x.len() < 2 {
        return Err(EvalError::NoData(format!(
            "correlation needs at least 2 pairs, got {}",
            x.len()
        )));
    }

    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;

    for (xi, yi) in x.iter().zip(y.iter()) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return Err(EvalError::DegenerateCorrelation(
            "an input is constant".to_string(),
        ));
    }

    let r = cov / (var_x.sqrt() * var_y.sqrt());
    if !r.is_finite() {
        return Err(EvalError::DegenerateCorrelation(format!("non-finite value {}", r)));
    }
    Ok(r.clamp(-1.0, 1.0))
}

/// Spearman rank correlation: Pearson over average ranks
pub fn spearman(x: &[f64], y: &[f64]) -> Result<f64, EvalError> {
    pearson(&average_ranks(x), &average_ranks(y))
}

/// `2ps / (p + s)`, undefined unless both correlations are positive
pub fn harmonic_mean(pearson: f64, spearman: f64) -> Result<f64, EvalError> {
    if !(pearson > 0.0 && spearman > 0.0) {
        return Err(EvalError::DegenerateCorrelation(format!(
            "harmonic mean undefined for pearson {:.6} and spearman {:.6}, both must be positive",
            pearson, spearman
        )));
    }
    Ok(2.0 * pearson * spearman / (pearson + spearman))
}

/// 1-based ranks, tied values share the mean of their positions
pub fn average_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // positions start..end are tied; 1-based average of them
        let rank = (start + end + 1) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = rank;
        }
        start = end;
    }
    ranks
}
