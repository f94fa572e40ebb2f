//! Uniform response envelopes shared by every endpoint.

use serde::{Deserialize, Serialize};

use crate::HuginnError;

/// Success wrapper: `{"data": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Failure wrapper: `{"error": {"message": ..., "code": ...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    pub code: String,
}

impl ErrorEnvelope {
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: ErrorBody {
                message: message.into(),
                code: code.into(),
            },
        }
    }
}

impl From<&HuginnError> for ErrorEnvelope {
    fn from(err: &HuginnError) -> Self {
        Self::new(err.to_string(), err.code())
    }
}

/// Confirmation payload for administrative actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Confirmation {
    pub message: String,
}
