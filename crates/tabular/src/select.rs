use crate::stats::{pearson, round_to};
use crate::{Frame, Result, TabularError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureScore {
    pub column: String,
    pub correlation: f64,
}

/// Numeric columns ranked by absolute Pearson correlation with `target`.
/// Constant columns have no correlation and are left out.
pub fn rank_features(frame: &Frame, target: &str, top_k: Option<usize>) -> Result<Vec<FeatureScore>> {
    if !frame.is_numeric(target) {
        frame.column_index(target)?;
        return Err(TabularError::NotNumeric(target.to_string()));
    }
    let y = frame.numeric(target)?;
    let mut scores: Vec<FeatureScore> = frame
        .numeric_columns()
        .into_iter()
        .filter(|c| c != target)
        .filter_map(|c| {
            let x = frame.numeric(&c).ok()?;
            let r = pearson(&x, &y)?;
            Some(FeatureScore {
                column: c,
                correlation: round_to(r, 4),
            })
        })
        .collect();
    scores.sort_by(|a, b| {
        b.correlation
            .abs()
            .total_cmp(&a.correlation.abs())
            .then_with(|| a.column.cmp(&b.column))
    });
    if let Some(k) = top_k {
        scores.truncate(k);
    }
    Ok(scores)
}

/// Check a predictor/target choice against the frame it will be split from.
pub fn validate_selection(frame: &Frame, x: &[String], y: &str) -> Result<()> {
    if x.is_empty() {
        return Err(TabularError::invalid("X", "select at least one predictor column"));
    }
    if y.trim().is_empty() {
        return Err(TabularError::invalid("y", "a target column is required"));
    }
    if x.iter().any(|c| c == y) {
        return Err(TabularError::invalid(
            "X",
            format!("target '{y}' cannot also be a predictor"),
        ));
    }
    for c in x.iter().map(String::as_str).chain(std::iter::once(y)) {
        frame.column_index(c)?;
    }
    Ok(())
}
