use std::path::PathBuf;

use thiserror::Error;

use crate::types::Dimensions;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Model serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image decoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Corpus unavailable at {path}: {source}")]
    CorpusUnavailable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Insufficient training data: {0}")]
    InsufficientData(String),

    #[error("No trained model is available")]
    ModelNotTrained,

    #[error("Evaluation set is empty")]
    EmptyEvaluationSet,

    #[error("Image is {actual}, expected {expected}")]
    DimensionMismatch {
        expected: Dimensions,
        actual: Dimensions,
    },

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Invalid model: {0}")]
    InvalidModel(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Face detector error: {0}")]
    Detector(String),
}

pub type Result<T> = std::result::Result<T, Error>;
