//! Port adapters
//!
//! Connects the claims ports to the PostgreSQL repository layer.
//!
//! ```rust,ignore
//! use infra_db::adapters::PgClaimsAdapter;
//! use domain_claims::ClaimsQueryPort;
//!
//! let adapter = PgClaimsAdapter::new(pool);
//! let claims = adapter.fetch_claims(&filter.created_query()).await?;
//! ```

pub mod claims;

pub use claims::PgClaimsAdapter;
