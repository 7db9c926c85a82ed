//! Suppliers referenced by claims

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::SupplierId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplier {
    pub id: SupplierId,
    pub name: String,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Supplier {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: SupplierId::new_v7(),
            name: name.into(),
            deleted_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}
