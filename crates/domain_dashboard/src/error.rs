//! Dashboard errors

use thiserror::Error;

use core_kernel::{PortError, TemporalError};

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error(transparent)]
    Port(#[from] PortError),

    /// A metric window could not be derived from the request
    #[error("Invalid window: {0}")]
    Temporal(#[from] TemporalError),
}
