use crate::frame::{format_number, is_missing, parse_number};
use crate::stats::{mean, median, mode};
use crate::{Frame, Result, TabularError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum MissingStrategy {
    Drop,
    Mean,
    Median,
    Mode,
    Custom { value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    Label,
    Onehot,
    Frequency,
}

/// Treat missing cells of `column`. Returns a human-readable summary.
pub fn fill_missing(frame: &mut Frame, column: &str, strategy: &MissingStrategy) -> Result<String> {
    let idx = frame.column_index(column)?;
    let missing: Vec<bool> = frame.rows().iter().map(|r| is_missing(&r[idx])).collect();
    let n_missing = missing.iter().filter(|m| **m).count();

    let fill = match strategy {
        MissingStrategy::Drop => {
            let keep: Vec<bool> = missing.iter().map(|m| !m).collect();
            frame.retain_rows(&keep);
            return Ok(format!("Dropped {n_missing} rows where '{column}' is missing."));
        }
        MissingStrategy::Mean | MissingStrategy::Median => {
            let present = present_numbers(frame, column)?;
            let value = match strategy {
                MissingStrategy::Mean => mean(&present),
                _ => median(&present),
            }
            .ok_or_else(|| TabularError::NotNumeric(column.to_string()))?;
            format_number(value)
        }
        MissingStrategy::Mode => {
            let col = frame.column(column)?;
            mode(col.into_iter().filter(|c| !is_missing(c)))
                .ok_or_else(|| TabularError::invalid("strategy", "column has no values to take a mode of"))?
        }
        MissingStrategy::Custom { value } => {
            if value.trim().is_empty() {
                return Err(TabularError::invalid("custom_value", "a custom fill value is required"));
            }
            value.trim().to_string()
        }
    };

    for (row, m) in missing.iter().enumerate() {
        if *m {
            frame.set_cell(row, idx, fill.clone());
        }
    }
    let label = match strategy {
        MissingStrategy::Mean => "mean",
        MissingStrategy::Median => "median",
        MissingStrategy::Mode => "mode",
        _ => "custom value",
    };
    Ok(format!("Filled {n_missing} missing '{column}' cells with {label}: {fill}"))
}

/// Encode a categorical column in place (label, frequency) or expand it
/// into indicator columns (onehot).
pub fn encode(frame: &mut Frame, column: &str, encoding: Encoding) -> Result<String> {
    let values: Vec<String> = frame.column(column)?.into_iter().map(str::to_string).collect();
    let categories = sorted_categories(&values);

    match encoding {
        Encoding::Label => {
            let codes: HashMap<&str, usize> = categories
                .iter()
                .enumerate()
                .map(|(i, c)| (c.as_str(), i))
                .collect();
            let encoded = values
                .iter()
                .map(|v| match codes.get(v.as_str()) {
                    Some(code) => code.to_string(),
                    None => "-1".to_string(),
                })
                .collect();
            frame.put_column(column, encoded)?;
            Ok(format!(
                "Applied label encoding to '{column}' ({} categories).",
                categories.len()
            ))
        }
        Encoding::Onehot => {
            frame.drop_column(column)?;
            for cat in &categories {
                let name = format!("{column}_{cat}");
                let indicator = values
                    .iter()
                    .map(|v| if v == cat { "1" } else { "0" }.to_string())
                    .collect();
                frame.put_column(&name, indicator)?;
            }
            Ok(format!(
                "Applied one-hot encoding to '{column}' ({} indicator columns).",
                categories.len()
            ))
        }
        Encoding::Frequency => {
            let mut counts: HashMap<&str, usize> = HashMap::new();
            for v in values.iter().filter(|v| !is_missing(v)) {
                *counts.entry(v.as_str()).or_default() += 1;
            }
            let encoded = values
                .iter()
                .map(|v| counts.get(v.as_str()).map(|c| c.to_string()).unwrap_or_default())
                .collect();
            frame.put_column(column, encoded)?;
            Ok(format!("Applied frequency encoding to '{column}'."))
        }
    }
}

/// Distinct present values, numerically ordered when they all parse.
fn sorted_categories(values: &[String]) -> Vec<String> {
    let distinct: BTreeSet<&str> = values
        .iter()
        .map(String::as_str)
        .filter(|v| !is_missing(v))
        .collect();
    let mut cats: Vec<String> = distinct.into_iter().map(str::to_string).collect();
    if cats.iter().all(|c| parse_number(c).is_some()) {
        cats.sort_by(|a, b| {
            let (x, y) = (parse_number(a).unwrap_or(0.0), parse_number(b).unwrap_or(0.0));
            x.total_cmp(&y)
        });
    }
    cats
}

fn present_numbers(frame: &Frame, column: &str) -> Result<Vec<f64>> {
    if !frame.is_numeric(column) {
        return Err(TabularError::NotNumeric(column.to_string()));
    }
    Ok(frame.numeric(column)?.into_iter().flatten().collect())
}

/// Columns with at least one missing cell.
pub fn missing_columns(frame: &Frame) -> Vec<String> {
    frame
        .columns()
        .iter()
        .filter(|c| frame.missing_count(c).unwrap_or(0) > 0)
        .cloned()
        .collect()
}

/// Columns that are not numeric, the candidates for encoding.
pub fn categorical_columns(frame: &Frame) -> Vec<String> {
    frame
        .columns()
        .iter()
        .filter(|c| !frame.is_numeric(c))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> Frame {
        Frame::parse_csv("x,city\n1,Oslo\n,Rome\n3,Oslo\n4,\n").unwrap()
    }

    #[test]
    fn test_mean_fill_touches_only_missing_cells() {
        let mut f = frame();
        fill_missing(&mut f, "x", &MissingStrategy::Mean).unwrap();
        let col: Vec<&str> = f.column("x").unwrap();
        assert_eq!(col, vec!["1", "2.6666666666666665", "3", "4"]);
    }

    #[test]
    fn test_drop_and_mode() {
        let mut f = frame();
        fill_missing(&mut f, "x", &MissingStrategy::Drop).unwrap();
        assert_eq!(f.n_rows(), 3);

        let mut f = frame();
        fill_missing(&mut f, "city", &MissingStrategy::Mode).unwrap();
        assert_eq!(f.column("city").unwrap()[3], "Oslo");
    }

    #[test]
    fn test_mean_on_text_column_fails() {
        let mut f = frame();
        let err = fill_missing(&mut f, "city", &MissingStrategy::Mean).unwrap_err();
        assert!(matches!(err, TabularError::NotNumeric(_)));
        let err = fill_missing(&mut f, "nope", &MissingStrategy::Mean).unwrap_err();
        assert!(matches!(err, TabularError::ColumnNotFound(_)));
    }

    #[test]
    fn test_encodings() {
        let mut f = frame();
        encode(&mut f, "city", Encoding::Label).unwrap();
        assert_eq!(f.column("city").unwrap(), vec!["0", "1", "0", "-1"]);

        let mut f = frame();
        encode(&mut f, "city", Encoding::Onehot).unwrap();
        assert_eq!(f.columns(), &["x", "city_Oslo", "city_Rome"]);
        assert_eq!(f.column("city_Rome").unwrap(), vec!["0", "1", "0", "0"]);

        let mut f = frame();
        encode(&mut f, "city", Encoding::Frequency).unwrap();
        assert_eq!(f.column("city").unwrap(), vec!["2", "1", "2", ""]);
    }
}
