use thiserror::Error;

#[derive(Debug, Error)]
pub enum TabularError {
    #[error("empty CSV: no header row")]
    Empty,

    #[error("line {line}: expected {expected} fields, found {found}")]
    Ragged {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("duplicate column name: {0}")]
    DuplicateColumn(String),

    #[error("column not found: {0}")]
    ColumnNotFound(String),

    #[error("column '{0}' has missing or non-numeric values")]
    NotNumeric(String),

    #[error("invalid {field}: {reason}")]
    InvalidParameter { field: String, reason: String },

    #[error("need at least {needed} rows, found {found}")]
    InsufficientRows { needed: usize, found: usize },

    #[error("model fit failed: {0}")]
    Fit(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TabularError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        TabularError::InvalidParameter {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TabularError>;
