use thiserror::Error;

use crate::inference::InferenceError;

#[derive(Error, Debug)]
pub enum InspectionError {
    #[error("Session not found: {0}")]
    SessionNotFound(String),
    #[error("Image could not be decoded: {0}")]
    DecodeFailure(String),
    #[error("Inference unavailable: {0}")]
    InferenceUnavailable(#[from] InferenceError),
}

impl InspectionError {
    pub fn not_found(session_id: impl ToString) -> Self {
        InspectionError::SessionNotFound(session_id.to_string())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, InspectionError::SessionNotFound(_))
    }
}

pub type Result<T, E = InspectionError> = std::result::Result<T, E>;
