use crate::outliers::check_percentile;
use crate::stats::{quantile, Describe};
use crate::{Frame, Result, TabularError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Numeric,
    Categorical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub dtype: ColumnType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overview {
    pub rows: usize,
    pub columns: usize,
    pub column_types: Vec<ColumnInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSummary {
    pub column: String,
    #[serde(flatten)]
    pub stats: Describe,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingCount {
    pub column: String,
    pub missing: usize,
    pub percent: f64,
}

/// Everything the exploration page shows, cached per dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdaSummary {
    pub overview: Overview,
    pub describe: Vec<ColumnSummary>,
    pub missing: Vec<MissingCount>,
}

pub fn overview(frame: &Frame) -> Overview {
    Overview {
        rows: frame.n_rows(),
        columns: frame.n_cols(),
        column_types: frame
            .columns()
            .iter()
            .map(|c| ColumnInfo {
                name: c.clone(),
                dtype: if frame.is_numeric(c) {
                    ColumnType::Numeric
                } else {
                    ColumnType::Categorical
                },
            })
            .collect(),
    }
}

pub fn describe(frame: &Frame) -> Vec<ColumnSummary> {
    frame
        .numeric_columns()
        .into_iter()
        .filter_map(|c| {
            let values = frame.numeric(&c).ok()?;
            Some(ColumnSummary {
                stats: Describe::of_present(&values),
                column: c,
            })
        })
        .collect()
}

pub fn missing_report(frame: &Frame) -> Vec<MissingCount> {
    let n = frame.n_rows().max(1) as f64;
    frame
        .columns()
        .iter()
        .map(|c| {
            let missing = frame.missing_count(c).unwrap_or(0);
            MissingCount {
                column: c.clone(),
                missing,
                percent: crate::stats::round_to(missing as f64 * 100.0 / n, 2),
            }
        })
        .collect()
}

pub fn summarize(frame: &Frame) -> EdaSummary {
    EdaSummary {
        overview: overview(frame),
        describe: describe(frame),
        missing: missing_report(frame),
    }
}

/// Keep rows whose `target` lies between its `lower` and `upper`
/// percentiles, inclusive. Inverted bounds are rejected; equal bounds keep
/// only rows at that exact quantile.
pub fn filter_by_target(frame: &Frame, target: &str, lower: f64, upper: f64) -> Result<Frame> {
    check_percentile("lower", lower)?;
    check_percentile("upper", upper)?;
    if lower > upper {
        return Err(TabularError::invalid(
            "lower",
            format!("lower percentile {lower} is above upper percentile {upper}"),
        ));
    }
    if !frame.is_numeric(target) {
        frame.column_index(target)?;
        return Err(TabularError::NotNumeric(target.to_string()));
    }
    let values = frame.numeric(target)?;
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    let lo = quantile(&present, lower / 100.0).unwrap_or(f64::NEG_INFINITY);
    let hi = quantile(&present, upper / 100.0).unwrap_or(f64::INFINITY);
    let keep: Vec<usize> = values
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_some_and(|v| v >= lo && v <= hi))
        .map(|(i, _)| i)
        .collect();
    Ok(frame.take_rows(&keep))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> Frame {
        let mut text = String::from("x,y,label\n");
        for i in 0..20 {
            text.push_str(&format!("{i},{},{}\n", i * 3, if i % 2 == 0 { "a" } else { "b" }));
        }
        Frame::parse_csv(&text).unwrap()
    }

    #[test]
    fn test_full_percentile_range_keeps_everything() {
        let f = frame();
        assert_eq!(filter_by_target(&f, "y", 0.0, 100.0).unwrap().n_rows(), 20);
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let f = frame();
        let err = filter_by_target(&f, "y", 60.0, 40.0).unwrap_err();
        assert!(matches!(err, TabularError::InvalidParameter { .. }));
        assert!(filter_by_target(&f, "y", -5.0, 40.0).is_err());
        assert!(filter_by_target(&f, "y", 5.0, 140.0).is_err());
    }

    #[test]
    fn test_filter_middle_band() {
        let f = frame();
        let out = filter_by_target(&f, "y", 25.0, 75.0).unwrap();
        assert!(out.n_rows() < 20 && out.n_rows() > 0);
    }

    #[test]
    fn test_summary_types_and_missing() {
        let f = frame();
        let s = summarize(&f);
        assert_eq!(s.overview.rows, 20);
        assert_eq!(s.overview.column_types[2].dtype, ColumnType::Categorical);
        assert_eq!(s.describe.len(), 2);
        assert!(s.missing.iter().all(|m| m.missing == 0));
    }
}
