//! Infrastructure Database Layer
//!
//! PostgreSQL persistence for warranty claims, cost lines, credit notes
//! and suppliers using SQLx.
//!
//! Soft-deleted rows (`deleted_at IS NOT NULL`) are excluded by every
//! claim and line query. SQLSTATE codes are classified in [`error`] so the
//! layers above only see `PortError`.
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, PgClaimsAdapter};
//!
//! let pool = create_pool(DatabaseConfig::new(url)).await?;
//! run_migrations(&pool).await?;
//! let adapter = PgClaimsAdapter::new(pool);
//! ```

pub mod pool;
pub mod error;
pub mod repositories;
pub mod adapters;

pub use pool::{create_pool, create_pool_from_url, run_migrations, DatabaseConfig, DatabasePool, MIGRATOR};
pub use error::DatabaseError;
pub use repositories::ClaimsRepository;
pub use adapters::PgClaimsAdapter;
