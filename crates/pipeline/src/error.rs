use crate::Stage;
use artifacts::ArtifactError;
use serde::Serialize;
use tabular::TabularError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no active dataset selected; upload or choose a dataset first")]
    NoActiveDataset,

    #[error("missing {artifact}; run the {stage} step first")]
    MissingPrerequisite { stage: Stage, artifact: String },

    #[error("invalid {field}: {reason}")]
    InvalidParameter { field: String, reason: String },

    #[error("column not found: {0}")]
    ColumnNotFound(String),

    #[error("dataset limit of {limit} reached; delete a dataset before uploading another")]
    DatasetLimitExceeded { limit: usize },

    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("unknown dataset: {0}")]
    UnknownDataset(String),

    #[error("unknown model: {0}")]
    UnknownModel(String),

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl PipelineError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        PipelineError::InvalidParameter {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn missing(stage: Stage, artifact: impl Into<String>) -> Self {
        PipelineError::MissingPrerequisite {
            stage,
            artifact: artifact.into(),
        }
    }

    /// Domain-predictable failures a user can fix. Storage and codec
    /// failures are not.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            PipelineError::Storage(_) | PipelineError::Serialization(_)
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::NoActiveDataset => "no_active_dataset",
            PipelineError::MissingPrerequisite { .. } => "missing_prerequisite",
            PipelineError::InvalidParameter { .. } => "invalid_parameter",
            PipelineError::ColumnNotFound(_) => "column_not_found",
            PipelineError::DatasetLimitExceeded { .. } => "dataset_limit_exceeded",
            PipelineError::UnsupportedFormat(_) => "unsupported_format",
            PipelineError::UnknownDataset(_) => "unknown_dataset",
            PipelineError::UnknownModel(_) => "unknown_model",
            PipelineError::Storage(_) => "storage",
            PipelineError::Serialization(_) => "serialization",
        }
    }
}

impl From<ArtifactError> for PipelineError {
    fn from(e: ArtifactError) -> Self {
        match e {
            ArtifactError::NoActiveDataset => PipelineError::NoActiveDataset,
            ArtifactError::InvalidName(name) => {
                PipelineError::invalid("dataset", format!("'{name}' is not a valid dataset name"))
            }
            ArtifactError::Io(e) => PipelineError::Storage(e),
            ArtifactError::Ser(e) => PipelineError::Serialization(e.to_string()),
        }
    }
}

impl From<TabularError> for PipelineError {
    fn from(e: TabularError) -> Self {
        match e {
            TabularError::ColumnNotFound(c) => PipelineError::ColumnNotFound(c),
            TabularError::InvalidParameter { field, reason } => {
                PipelineError::InvalidParameter { field, reason }
            }
            TabularError::NotNumeric(c) => {
                PipelineError::invalid(c, "column has missing or non-numeric values")
            }
            TabularError::InsufficientRows { .. } => PipelineError::invalid("rows", e.to_string()),
            TabularError::Fit(reason) => PipelineError::invalid("model", reason),
            TabularError::Io(e) => PipelineError::Storage(e),
            TabularError::Empty
            | TabularError::Ragged { .. }
            | TabularError::Csv(_)
            | TabularError::DuplicateColumn(_) => PipelineError::invalid("file", e.to_string()),
        }
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(e: serde_json::Error) -> Self {
        PipelineError::Serialization(e.to_string())
    }
}

impl From<bincode::Error> for PipelineError {
    fn from(e: bincode::Error) -> Self {
        PipelineError::Serialization(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// One-line description of a successful stage result.
pub trait Summary {
    fn summary(&self) -> String;
}

/// The `(success, message)` shape stages report to callers.
#[derive(Debug, Serialize)]
pub struct StageOutcome<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Summary> StageOutcome<T> {
    /// Recoverable errors become a failed outcome; the rest propagate.
    pub fn capture(result: Result<T>) -> Result<Self> {
        match result {
            Ok(data) => Ok(Self {
                success: true,
                message: data.summary(),
                kind: None,
                data: Some(data),
            }),
            Err(e) if e.is_recoverable() => Ok(Self {
                success: false,
                message: e.to_string(),
                kind: Some(e.kind()),
                data: None,
            }),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Done;
    impl Summary for Done {
        fn summary(&self) -> String {
            "done".into()
        }
    }

    #[test]
    fn test_capture_keeps_domain_errors_inline() {
        let ok = StageOutcome::capture(Ok(Done)).unwrap();
        assert!(ok.success);
        assert_eq!(ok.message, "done");

        let failed = StageOutcome::<Done>::capture(Err(PipelineError::missing(Stage::Split, "X_train split")))
            .unwrap();
        assert!(!failed.success);
        assert_eq!(failed.kind, Some("missing_prerequisite"));
        assert!(failed.message.contains("split"));

        let storage = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "locked");
        assert!(StageOutcome::<Done>::capture(Err(storage.into())).is_err());
    }

    #[test]
    fn test_tabular_errors_map_to_taxonomy() {
        let e: PipelineError = TabularError::ColumnNotFound("x".into()).into();
        assert!(matches!(e, PipelineError::ColumnNotFound(_)));
        let e: PipelineError = TabularError::InsufficientRows { needed: 10, found: 9 }.into();
        assert!(matches!(e, PipelineError::InvalidParameter { .. }));
        assert!(e.to_string().contains("10"));
    }
}
