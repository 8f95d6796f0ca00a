use std::fmt::{self, Display};

/// Errors produced by model constructors and validation routines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// A selection referenced a color or feature the product does not offer.
    UnknownOption { kind: &'static str, value: String },
    InvalidPosition(i32),
}

impl Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::UnknownOption { kind, value } => {
                write!(f, "unknown {kind}: {value}")
            }
            ModelError::InvalidPosition(position) => {
                write!(f, "invalid position {position}; positions start at 1")
            }
        }
    }
}

impl std::error::Error for ModelError {}

pub type Result<T> = std::result::Result<T, ModelError>;
