use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::FormField;

/// Page-level failure categories. `Validation` never reaches the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Validation,
    Timeout,
    Network,
    Server,
    Unknown,
}

impl ErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::Validation => "VALIDATION_ERROR",
            ErrorKind::Timeout => "TIMEOUT_ERROR",
            ErrorKind::Network => "NETWORK_ERROR",
            ErrorKind::Server => "SERVER_ERROR",
            ErrorKind::Unknown => "UNKNOWN_ERROR",
        }
    }

    /// Unrecognized codes collapse to `Unknown`.
    pub fn from_code(code: &str) -> Self {
        match code {
            "VALIDATION_ERROR" => ErrorKind::Validation,
            "TIMEOUT_ERROR" => ErrorKind::Timeout,
            "NETWORK_ERROR" => ErrorKind::Network,
            "SERVER_ERROR" => ErrorKind::Server,
            _ => ErrorKind::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    Required,
    TooLong { limit: usize },
    InvalidCharacters,
    ConsentRequired,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: FormField,
    pub violation: Violation,
    pub message: String,
}

impl FieldError {
    pub fn new(field: FormField, violation: Violation, message: impl Into<String>) -> Self {
        Self {
            field,
            violation,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
#[error("form has {} invalid field(s)", .errors.len())]
pub struct ValidationFailure {
    pub errors: Vec<FieldError>,
}

impl ValidationFailure {
    pub fn check(errors: Vec<FieldError>) -> Result<(), Self> {
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Self { errors })
        }
    }
}
