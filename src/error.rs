use std::path::PathBuf;

/// Ellipse fitting failed for one contour. Recoverable: the contour is skipped.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ShapeFitError {
    #[error("need at least {required} points to fit an ellipse, got {points}")]
    TooFewPoints { points: usize, required: usize },
    #[error("contour points have no spread along one axis")]
    Degenerate,
    #[error("fitted conic is not an ellipse")]
    NotAnEllipse,
}

/// Configuration could not be loaded or holds values the pipeline cannot run with.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Event delivery failed. Logged by the runner, never fatal.
#[derive(thiserror::Error, Debug)]
pub enum SinkError {
    #[error("sink i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("sink rejected event: {0}")]
    Rejected(String),
}

/// The frame stream could not be opened. This is the only fatal error class.
#[derive(thiserror::Error, Debug)]
pub enum FrameSourceError {
    #[error("frame directory not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("no color frames found in {}", .0.display())]
    Empty(PathBuf),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
