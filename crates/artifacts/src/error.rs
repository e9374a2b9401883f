use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("no active dataset selected")]
    NoActiveDataset,

    #[error("invalid artifact name: {0}")]
    InvalidName(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Ser(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ArtifactError>;
