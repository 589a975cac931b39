//! Error taxonomy for the detection engine.
//!
//! Propagation policy:
//! - `Render` is recoverable: a failed check, never fatal to the scheduler.
//! - `FeatureExtraction` is reserved for catastrophic parse failures; normal
//!   malformed markup degrades to zero counts instead.
//! - `Storage` is fatal only for the single operation in progress.
//! - `BaselineMissing` can only occur before the first successful baseline
//!   capture; callers attempt lazy creation first.

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug)]
pub enum EngineError {
    /// Navigation, timeout or network error reaching a site.
    Render(String),
    /// Catastrophic failure extracting features from a page.
    FeatureExtraction(String),
    /// Persistence layer unavailable or rejected the operation.
    Storage(String),
    /// No baseline exists and none could be created yet.
    BaselineMissing,
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::Render(reason) => write!(f, "Render failure: {}", reason),
            EngineError::FeatureExtraction(msg) => write!(f, "Feature extraction failure: {}", msg),
            EngineError::Storage(msg) => write!(f, "Storage failure: {}", msg),
            EngineError::BaselineMissing => write!(f, "No baseline available"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Storage(err.to_string())
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::Storage(err.to_string())
    }
}
