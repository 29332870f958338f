use std::fmt;

/// The result type used across the trainer.
pub type Result<T> = std::result::Result<T, TrainerError>;

/// All errors that can occur while loading data, training or exporting.
#[derive(Debug)]
pub enum TrainerError {
    /// An underlying I/O error.
    Io(std::io::Error),
    /// A malformed CSV row or file.
    Csv(csv::Error),
    /// A malformed JSON config file.
    Json(serde_json::Error),
    /// A label that is not one of the known classes.
    UnknownLabel(String),
    /// The dataset contains no rows.
    EmptyDataset,
    /// A config value that cannot be trained with — caught before training.
    InvalidConfig(&'static str),
    /// A shape invariant was violated (e.g. mismatched buffer lengths).
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    /// An exported model file that cannot be parsed back.
    BadModelFile(&'static str),
}

impl fmt::Display for TrainerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io error: {e}"),
            Self::Csv(e) => write!(f, "csv error: {e}"),
            Self::Json(e) => write!(f, "config error: {e}"),
            Self::UnknownLabel(label) => write!(f, "unknown label: {label:?}"),
            Self::EmptyDataset => write!(f, "the dataset contains no rows"),
            Self::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            Self::SizeMismatch {
                what,
                got,
                expected,
            } => {
                write!(f, "size mismatch for {what}: got {got}, expected {expected}")
            }
            Self::BadModelFile(msg) => write!(f, "bad model file: {msg}"),
        }
    }
}

impl std::error::Error for TrainerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Csv(e) => Some(e),
            Self::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TrainerError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<csv::Error> for TrainerError {
    fn from(e: csv::Error) -> Self {
        Self::Csv(e)
    }
}

impl From<serde_json::Error> for TrainerError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}
