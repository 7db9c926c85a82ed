//! Ports and Adapters Infrastructure
//!
//! The dashboard never talks to the backend directly. Each domain declares a
//! port trait that extends the marker traits here, and adapters (PostgreSQL,
//! in-memory) implement it.
//!
//! ```text
//!   DashboardService ──▶ ClaimsQueryPort ◀── PgClaimsAdapter
//!                                        ◀── InMemoryClaimsStore
//! ```
//!
//! All adapters report failures through [`PortError`], whose variants follow
//! the backend's error taxonomy. The retry policy and the HTTP layer both
//! classify errors through it, so adapters never decide retry behaviour.

use std::fmt;
use thiserror::Error;
use serde::{Deserialize, Serialize};

/// Broad class of a port failure, used for retry and presentation decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    PermissionDenied,
    Conflict,
    MalformedInput,
    Transient,
    Internal,
}

/// Error type for port operations
#[derive(Debug, Error)]
pub enum PortError {
    /// The requested entity was not found
    #[error("Not found: {entity_type} with id {id}")]
    NotFound {
        entity_type: String,
        id: String,
    },

    /// The session is not allowed to perform the operation
    #[error("Permission denied: {message}")]
    PermissionDenied {
        message: String,
    },

    /// A uniqueness constraint rejected the write
    #[error("Already exists: {message}")]
    UniqueConflict {
        message: String,
    },

    /// A referenced row does not exist or is still referenced
    #[error("Reference conflict: {message}")]
    ForeignKeyConflict {
        message: String,
    },

    /// The request could not be interpreted by the backend
    #[error("Malformed input: {message}")]
    MalformedInput {
        message: String,
        field: Option<String>,
    },

    /// Connection to the backend failed
    #[error("Connection error: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The operation timed out
    #[error("Timeout after {duration_ms}ms: {operation}")]
    Timeout {
        operation: String,
        duration_ms: u64,
    },

    /// The backend is temporarily unavailable
    #[error("Service unavailable: {service}")]
    ServiceUnavailable {
        service: String,
    },

    /// An internal error occurred
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl PortError {
    pub fn not_found(entity_type: impl Into<String>, id: impl fmt::Display) -> Self {
        PortError::NotFound {
            entity_type: entity_type.into(),
            id: id.to_string(),
        }
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        PortError::PermissionDenied {
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        PortError::MalformedInput {
            message: message.into(),
            field: None,
        }
    }

    /// Creates a MalformedInput error pointing at a specific field
    pub fn malformed_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        PortError::MalformedInput {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        PortError::Connection {
            message: message.into(),
            source: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        PortError::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Classifies the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            PortError::NotFound { .. } => ErrorKind::NotFound,
            PortError::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            PortError::UniqueConflict { .. } | PortError::ForeignKeyConflict { .. } => {
                ErrorKind::Conflict
            }
            PortError::MalformedInput { .. } => ErrorKind::MalformedInput,
            PortError::Connection { .. }
            | PortError::Timeout { .. }
            | PortError::ServiceUnavailable { .. } => ErrorKind::Transient,
            PortError::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Returns true if this error indicates a transient failure that may succeed on retry
    ///
    /// Permission failures are never transient.
    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub fn is_permission_denied(&self) -> bool {
        self.kind() == ErrorKind::PermissionDenied
    }
}

/// Marker trait for all domain ports
///
/// Ports are shared across spawned metric tasks, so they must be
/// thread-safe and `'static`.
pub trait DomainPort: Send + Sync + 'static {}

/// Health status for an adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterHealth {
    Healthy,
    Degraded,
    Unhealthy,
    Unknown,
}

/// Health check result for an adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub adapter_id: String,
    pub status: AdapterHealth,
    /// Latency of the health check in milliseconds
    pub latency_ms: u64,
    pub message: Option<String>,
    pub checked_at: chrono::DateTime<chrono::Utc>,
}

/// Trait for adapters that support health checks
#[async_trait::async_trait]
pub trait HealthCheckable: Send + Sync {
    async fn health_check(&self) -> HealthCheckResult;
}
