use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    InvalidInput,
    WordExists,
    WordNotFound,
    MeaningExists,
    MeaningNotFound,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::InvalidInput =>
                write!(f, "invalid word or meaning"),
            StoreError::WordExists =>
                write!(f, "word already exists"),
            StoreError::WordNotFound =>
                write!(f, "word not found"),
            StoreError::MeaningExists =>
                write!(f, "meaning already exists"),
            StoreError::MeaningNotFound =>
                write!(f, "meaning not found"),
        }
    }
}

impl std::error::Error for StoreError {}
