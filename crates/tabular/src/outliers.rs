use crate::frame::format_number;
use crate::stats::{mean, quantile, std_dev, Describe};
use crate::{Frame, Result, TabularError};
use serde::{Deserialize, Serialize};

fn default_lower() -> f64 {
    5.0
}

fn default_upper() -> f64 {
    95.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum OutlierMethod {
    /// Drop rows outside `[q1 - 1.5 iqr, q3 + 1.5 iqr]`.
    Iqr,
    /// Drop rows with `|z| > 3`.
    Zscore,
    /// Clamp to the given percentiles.
    Capping {
        #[serde(default = "default_lower")]
        lower: f64,
        #[serde(default = "default_upper")]
        upper: f64,
    },
}

impl OutlierMethod {
    pub fn name(&self) -> &'static str {
        match self {
            OutlierMethod::Iqr => "iqr",
            OutlierMethod::Zscore => "zscore",
            OutlierMethod::Capping { .. } => "capping",
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let OutlierMethod::Capping { lower, upper } = self {
            check_percentile("lower", *lower)?;
            check_percentile("upper", *upper)?;
            if lower >= upper {
                return Err(TabularError::invalid(
                    "lower",
                    format!("lower percentile {lower} must be below upper percentile {upper}"),
                ));
            }
        }
        Ok(())
    }
}

pub fn check_percentile(field: &str, p: f64) -> Result<()> {
    if !p.is_finite() || !(0.0..=100.0).contains(&p) {
        return Err(TabularError::invalid(
            field,
            format!("percentile {p} is outside 0-100"),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlierReport {
    pub column: String,
    pub method: String,
    pub before: Describe,
    pub after: Describe,
    pub rows_removed: usize,
    pub cells_capped: usize,
}

/// Apply `method` to `column`. Rows with a missing value in the column are
/// never treated as outliers.
pub fn handle_outliers(frame: &mut Frame, column: &str, method: &OutlierMethod) -> Result<OutlierReport> {
    method.validate()?;
    let idx = frame.column_index(column)?;
    if !frame.is_numeric(column) {
        return Err(TabularError::NotNumeric(column.to_string()));
    }
    let values = frame.numeric(column)?;
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    let before = Describe::of(&present);
    let mut rows_removed = 0;
    let mut cells_capped = 0;

    match method {
        OutlierMethod::Iqr | OutlierMethod::Zscore => {
            let (lo, hi) = match method {
                OutlierMethod::Iqr => {
                    let q1 = quantile(&present, 0.25).unwrap_or(0.0);
                    let q3 = quantile(&present, 0.75).unwrap_or(0.0);
                    let iqr = q3 - q1;
                    (q1 - 1.5 * iqr, q3 + 1.5 * iqr)
                }
                _ => match (mean(&present), std_dev(&present)) {
                    (Some(m), Some(s)) if s > 0.0 => (m - 3.0 * s, m + 3.0 * s),
                    _ => (f64::NEG_INFINITY, f64::INFINITY),
                },
            };
            let keep: Vec<bool> = values
                .iter()
                .map(|v| v.map_or(true, |v| v >= lo && v <= hi))
                .collect();
            rows_removed = keep.iter().filter(|k| !**k).count();
            frame.retain_rows(&keep);
        }
        OutlierMethod::Capping { lower, upper } => {
            let lo = quantile(&present, lower / 100.0).unwrap_or(f64::NEG_INFINITY);
            let hi = quantile(&present, upper / 100.0).unwrap_or(f64::INFINITY);
            for (row, v) in values.iter().enumerate() {
                let Some(v) = *v else { continue };
                let capped = v.clamp(lo, hi);
                if capped != v {
                    frame.set_cell(row, idx, format_number(capped));
                    cells_capped += 1;
                }
            }
        }
    }

    let after = Describe::of_present(&frame.numeric(column)?);
    Ok(OutlierReport {
        column: column.to_string(),
        method: method.name().to_string(),
        before,
        after,
        rows_removed,
        cells_capped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> Frame {
        let mut text = String::from("v\n");
        for i in 1..=10 {
            text.push_str(&format!("{i}\n"));
        }
        text.push_str("1000\n");
        Frame::parse_csv(&text).unwrap()
    }

    #[test]
    fn test_iqr_drops_extreme_row() {
        let mut f = frame();
        let report = handle_outliers(&mut f, "v", &OutlierMethod::Iqr).unwrap();
        assert_eq!(report.rows_removed, 1);
        assert_eq!(f.n_rows(), 10);
        assert_eq!(report.after.max, Some(10.0));
    }

    #[test]
    fn test_capping_keeps_rows() {
        let mut f = frame();
        let method = OutlierMethod::Capping { lower: 5.0, upper: 95.0 };
        let report = handle_outliers(&mut f, "v", &method).unwrap();
        assert_eq!(f.n_rows(), 11);
        assert_eq!(report.rows_removed, 0);
        assert!(report.cells_capped >= 2);
        assert!(report.after.max.unwrap() < 1000.0);
    }

    #[test]
    fn test_capping_bounds_validated() {
        let mut f = frame();
        for (lower, upper) in [(-1.0, 95.0), (5.0, 101.0), (60.0, 40.0), (50.0, 50.0)] {
            let err = handle_outliers(&mut f, "v", &OutlierMethod::Capping { lower, upper }).unwrap_err();
            assert!(matches!(err, TabularError::InvalidParameter { .. }));
        }
    }

    #[test]
    fn test_method_from_json() {
        let m: OutlierMethod = serde_json::from_str(r#"{"method":"capping"}"#).unwrap();
        assert_eq!(m, OutlierMethod::Capping { lower: 5.0, upper: 95.0 });
    }
}
