use serde::{Deserialize, Serialize};

use stockhouse_core::{UserId, Warehouse};

use crate::Role;

/// The authenticated user a request acts as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    pub username: String,
    pub role: Role,
    /// Assigned warehouse; always set for storekeepers.
    pub warehouse: Option<Warehouse>,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Admins and storekeepers assigned to the hub.
    pub fn is_privileged(&self) -> bool {
        self.is_admin() || self.warehouse.is_some_and(|w| w.is_hub())
    }

    pub fn is_assigned_to(&self, warehouse: Warehouse) -> bool {
        self.warehouse == Some(warehouse)
    }
}
