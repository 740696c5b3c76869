use core::str::FromStr;
use serde::{Deserialize, Serialize};

/// Account role.
///
/// Admins act on every warehouse; storekeepers are bound to their assigned
/// warehouse (hub storekeepers additionally run transfers).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Storekeeper,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Storekeeper => "storekeeper",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "storekeeper" => Ok(Role::Storekeeper),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}
