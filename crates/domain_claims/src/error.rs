//! Claims domain errors

use thiserror::Error;

use core_kernel::{ClaimId, PortError};

/// Errors that can occur in the claims domain
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClaimError {
    #[error("Invalid status transition from {from} to {to}")]
    InvalidStatusTransition { from: String, to: String },

    #[error("Unknown claim status: {0}")]
    UnknownStatus(String),

    #[error("Claim {0} has been deleted")]
    ClaimDeleted(ClaimId),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<ClaimError> for PortError {
    fn from(err: ClaimError) -> Self {
        match err {
            ClaimError::ClaimDeleted(id) => PortError::not_found("Claim", id),
            ClaimError::InvalidStatusTransition { .. } | ClaimError::UnknownStatus(_) => {
                PortError::malformed_field(err.to_string(), "status")
            }
            ClaimError::InvalidAmount(_) => PortError::malformed_field(err.to_string(), "amount"),
            ClaimError::Validation(message) => PortError::malformed(message),
        }
    }
}
