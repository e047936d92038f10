//! Custom error types for stylizer.

use std::path::PathBuf;
use thiserror::Error;

/// The inference stage an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Style-predictor graph (style image to bottleneck).
    Predictor,
    /// Style-transformer graph (content plus bottleneck to output).
    Transformer,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Predictor => write!(f, "style predictor"),
            Self::Transformer => write!(f, "style transformer"),
        }
    }
}

/// Main error type for the stylizer library.
#[derive(Error, Debug)]
pub enum Error {
    /// Source bytes could not be decoded as an image.
    #[error("failed to decode image: {source}")]
    Decode {
        #[source]
        source: image::ImageError,
    },

    /// A remote image could not be retrieved.
    #[error("failed to fetch image from {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Failed to download a model artifact.
    #[error("failed to download model {name}: {source}")]
    ModelFetch {
        name: String,
        #[source]
        source: reqwest::Error,
    },

    /// Model artifact fetched but unusable.
    #[error("failed to load ONNX model {name}: {source}")]
    ModelLoad {
        name: String,
        #[source]
        source: ort::Error,
    },

    /// Tensor shape incompatible with the loaded graphs. Indicates a
    /// model/version mismatch, not a transient condition.
    #[error("tensor shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    /// Failure while executing an inference stage.
    #[error("{stage} inference failed: {source}")]
    Inference {
        stage: Stage,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Failed to encode the rendered surface.
    #[error("failed to encode image as {format}: {source}")]
    Encode {
        format: &'static str,
        #[source]
        source: image::ImageError,
    },

    /// Failed to create cache directory.
    #[error("failed to create cache directory {path}: {source}")]
    CacheDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid parameter value.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wrap a stage execution failure.
    pub fn inference<E>(stage: Stage, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Inference {
            stage,
            source: Box::new(source),
        }
    }
}

/// Result type alias for stylizer operations.
pub type Result<T> = std::result::Result<T, Error>;
