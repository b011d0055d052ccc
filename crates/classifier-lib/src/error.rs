//! Error taxonomy for the classifier core, registry and stream operators

use thiserror::Error;

/// Result alias used throughout the library
pub type Result<T> = std::result::Result<T, ClassifierError>;

/// Broad category of a [`ClassifierError`]
///
/// Callers decide per category whether to halt a query, drop an event or
/// treat the failure as a bug.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Query setup is wrong; fatal to that query's initialization
    Configuration,
    /// Feature vector length disagrees with the model's feature count
    DimensionMismatch,
    /// Non-finite or otherwise unusable input values
    InvalidInput,
    /// Label lookup hit an index outside the label set
    UnknownClassIndex,
    /// Internal failure such as a poisoned lock
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::DimensionMismatch => "dimension_mismatch",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::UnknownClassIndex => "unknown_class_index",
            ErrorKind::Internal => "internal",
        }
    }
}

/// Errors raised by the classifier core and its adapters
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(
        "model [{name}] needs to be initialized prior to prediction; \
         run an update on it first"
    )]
    ModelNotInitialized { name: String },

    #[error("dimension mismatch: model expects {expected} features, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unknown class index {index} (model knows {classes} classes)")]
    UnknownClassIndex { index: usize, classes: usize },

    #[error("lock poisoned: {0}")]
    Poisoned(String),
}

impl ClassifierError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClassifierError::Configuration(_) | ClassifierError::ModelNotInitialized { .. } => {
                ErrorKind::Configuration
            }
            ClassifierError::DimensionMismatch { .. } => ErrorKind::DimensionMismatch,
            ClassifierError::InvalidInput(_) => ErrorKind::InvalidInput,
            ClassifierError::UnknownClassIndex { .. } => ErrorKind::UnknownClassIndex,
            ClassifierError::Poisoned(_) => ErrorKind::Internal,
        }
    }

    /// Shorthand for building a configuration error from anything displayable
    pub fn config(message: impl Into<String>) -> Self {
        ClassifierError::Configuration(message.into())
    }

    pub fn is_configuration(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }
}

impl<T> From<std::sync::PoisonError<T>> for ClassifierError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        ClassifierError::Poisoned(e.to_string())
    }
}
