//! In-memory table read and written through the `csv` crate.
//!
//! Cells are kept as the text they were read as. Transforms only rewrite
//! the cells they change, so writing a frame back out reproduces every
//! untouched byte.

use crate::{Result, TabularError};
use std::collections::HashSet;
use std::path::Path;

/// Text that counts as a missing value.
const MISSING_MARKERS: [&str; 8] = ["", "na", "n/a", "nan", "null", "none", "<na>", "#n/a"];

pub fn is_missing(cell: &str) -> bool {
    let t = cell.trim();
    MISSING_MARKERS.iter().any(|m| t.eq_ignore_ascii_case(m))
}

pub fn parse_number(cell: &str) -> Option<f64> {
    if is_missing(cell) {
        return None;
    }
    cell.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Shortest text that parses back to `v`; non-finite values are written
/// as missing.
pub fn format_number(v: f64) -> String {
    if !v.is_finite() {
        return String::new();
    }
    if v == v.trunc() && v.abs() < 1e15 {
        format!("{:.1}", v)
    } else {
        format!("{}", v)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Frame {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Frame {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        let mut seen = HashSet::new();
        for c in &columns {
            if !seen.insert(c.as_str()) {
                return Err(TabularError::DuplicateColumn(c.clone()));
            }
        }
        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(TabularError::Ragged {
                    line: i + 2,
                    expected: columns.len(),
                    found: row.len(),
                });
            }
        }
        Ok(Self { columns, rows })
    }

    /// Build a numeric frame from column-major data.
    pub fn from_numeric(columns: Vec<String>, data: &[Vec<f64>]) -> Result<Self> {
        let n = data.first().map(|c| c.len()).unwrap_or(0);
        if data.len() != columns.len() || data.iter().any(|c| c.len() != n) {
            return Err(TabularError::invalid("columns", "column lengths differ"));
        }
        let rows = (0..n)
            .map(|r| data.iter().map(|c| format_number(c[r])).collect())
            .collect();
        Self::new(columns, rows)
    }

    pub fn read_csv(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse_csv(&text)
    }

    /// Parse CSV text. Blank lines are skipped and a leading byte-order
    /// mark is ignored; every other record must match the header width.
    pub fn parse_csv(text: &str) -> Result<Self> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(text.as_bytes());
        let columns: Vec<String> = reader
            .headers()?
            .iter()
            .map(|c| c.trim().to_string())
            .collect();
        if columns.iter().all(|c| c.is_empty()) {
            return Err(TabularError::Empty);
        }
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            if record.len() != columns.len() {
                let line = record
                    .position()
                    .map(|p| p.line() as usize)
                    .unwrap_or(rows.len() + 2);
                return Err(TabularError::Ragged {
                    line,
                    expected: columns.len(),
                    found: record.len(),
                });
            }
            rows.push(record.iter().map(str::to_string).collect());
        }
        Self::new(columns, rows)
    }

    /// Quotes only the fields that need it, so cells read from a plain
    /// file are written back unchanged.
    pub fn to_csv(&self) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| TabularError::Io(e.into_error()))?;
        String::from_utf8(bytes).map_err(|e| TabularError::invalid("csv", e.to_string()))
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| TabularError::ColumnNotFound(name.to_string()))
    }

    pub fn column(&self, name: &str) -> Result<Vec<&str>> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(|r| r[idx].as_str()).collect())
    }

    /// Parsed values; `None` for missing or non-numeric cells.
    pub fn numeric(&self, name: &str) -> Result<Vec<Option<f64>>> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(|r| parse_number(&r[idx])).collect())
    }

    /// Every present cell parses as a number, and at least one is present.
    pub fn is_numeric(&self, name: &str) -> bool {
        let Ok(idx) = self.column_index(name) else {
            return false;
        };
        let mut any = false;
        for row in &self.rows {
            let cell = &row[idx];
            if is_missing(cell) {
                continue;
            }
            if parse_number(cell).is_none() {
                return false;
            }
            any = true;
        }
        any
    }

    pub fn numeric_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| self.is_numeric(c))
            .cloned()
            .collect()
    }

    pub fn missing_count(&self, name: &str) -> Result<usize> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().filter(|r| is_missing(&r[idx])).count())
    }

    /// Column-major numeric data; fails on the first column with a missing
    /// or non-numeric cell.
    pub fn numeric_matrix(&self, names: &[String]) -> Result<Vec<Vec<f64>>> {
        names
            .iter()
            .map(|name| {
                self.numeric(name)?
                    .into_iter()
                    .collect::<Option<Vec<f64>>>()
                    .ok_or_else(|| TabularError::NotNumeric(name.clone()))
            })
            .collect()
    }

    pub fn set_cell(&mut self, row: usize, col: usize, value: String) {
        if let Some(cell) = self.rows.get_mut(row).and_then(|r| r.get_mut(col)) {
            *cell = value;
        }
    }

    /// Replace a column's cells, or append the column when it is new.
    pub fn put_column(&mut self, name: &str, values: Vec<String>) -> Result<()> {
        if values.len() != self.rows.len() {
            return Err(TabularError::invalid(
                name,
                format!("expected {} values, got {}", self.rows.len(), values.len()),
            ));
        }
        match self.columns.iter().position(|c| c == name) {
            Some(idx) => {
                for (row, v) in self.rows.iter_mut().zip(values) {
                    row[idx] = v;
                }
            }
            None => {
                self.columns.push(name.to_string());
                for (row, v) in self.rows.iter_mut().zip(values) {
                    row.push(v);
                }
            }
        }
        Ok(())
    }

    pub fn drop_column(&mut self, name: &str) -> Result<()> {
        let idx = self.column_index(name)?;
        self.columns.remove(idx);
        for row in &mut self.rows {
            row.remove(idx);
        }
        Ok(())
    }

    pub fn retain_rows(&mut self, keep: &[bool]) {
        let mut i = 0;
        self.rows.retain(|_| {
            let k = keep.get(i).copied().unwrap_or(true);
            i += 1;
            k
        });
    }

    pub fn select(&self, names: &[String]) -> Result<Frame> {
        let idx: Vec<usize> = names
            .iter()
            .map(|n| self.column_index(n))
            .collect::<Result<_>>()?;
        let rows = self
            .rows
            .iter()
            .map(|r| idx.iter().map(|&i| r[i].clone()).collect())
            .collect();
        Frame::new(names.to_vec(), rows)
    }

    pub fn take_rows(&self, indices: &[usize]) -> Frame {
        Frame {
            columns: self.columns.clone(),
            rows: indices
                .iter()
                .filter_map(|&i| self.rows.get(i).cloned())
                .collect(),
        }
    }

    pub fn head(&self, n: usize) -> Frame {
        Frame {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quoted_fields() {
        let f = Frame::parse_csv("name,note\n\"Smith, J\",\"said \"\"hi\"\"\"\nLee,\n").unwrap();
        assert_eq!(f.n_rows(), 2);
        assert_eq!(f.rows()[0], vec!["Smith, J", "said \"hi\""]);
        assert_eq!(f.rows()[1], vec!["Lee", ""]);
    }

    #[test]
    fn test_write_reproduces_untouched_text() {
        let text = "x,y\n1,2.50\n,3\n\"a,b\",4\n";
        let f = Frame::parse_csv(text).unwrap();
        assert_eq!(f.to_csv().unwrap(), text);
    }

    #[test]
    fn test_single_column_missing_cell_survives_round_trip() {
        let f = Frame::from_numeric(vec!["x".into()], &[vec![1.0, f64::NAN, 3.0]]).unwrap();
        let text = f.to_csv().unwrap();
        let again = Frame::parse_csv(&text).unwrap();
        assert_eq!(again.n_rows(), 3);
        assert_eq!(again.missing_count("x").unwrap(), 1);
    }

    #[test]
    fn test_crlf_and_missing_trailing_newline() {
        let f = Frame::parse_csv("x,y\r\n1,2\r\n3,4").unwrap();
        assert_eq!(f.n_rows(), 2);
        assert_eq!(f.rows()[1], vec!["3", "4"]);
    }

    #[test]
    fn test_ragged_row_rejected() {
        let err = Frame::parse_csv("x,y\n1,2\n3\n").unwrap_err();
        assert!(matches!(err, TabularError::Ragged { line: 3, expected: 2, found: 1 }));
    }

    #[test]
    fn test_empty_input_rejected() {
        assert!(matches!(Frame::parse_csv(""), Err(TabularError::Empty)));
    }

    #[test]
    fn test_numeric_detection() {
        let f = Frame::parse_csv("x,c\n1,a\nNaN,b\n2.5,\n").unwrap();
        assert!(f.is_numeric("x"));
        assert!(!f.is_numeric("c"));
        assert_eq!(f.numeric("x").unwrap(), vec![Some(1.0), None, Some(2.5)]);
        assert_eq!(f.missing_count("x").unwrap(), 1);
        assert!(matches!(f.numeric_matrix(&["x".into()]), Err(TabularError::NotNumeric(_))));
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(2.0), "2.0");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(f64::NAN), "");
    }
}
