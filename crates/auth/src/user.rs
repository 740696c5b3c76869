//! User directory entries.
//!
//! Credentials live with the external login provider; an account here only
//! carries what authorization needs.

use serde::{Deserialize, Serialize};

use stockhouse_core::{DomainError, DomainResult, UserId, Warehouse};

use crate::{Actor, Role};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    id: UserId,
    username: String,
    role: Role,
    warehouse: Option<Warehouse>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub role: Role,
    pub warehouse: Option<Warehouse>,
}

pub type UserUpdate = NewUser;

impl UserAccount {
    /// Storekeepers must be assigned a warehouse; admins never carry one.
    pub fn create(id: UserId, input: NewUser) -> DomainResult<Self> {
        let (username, warehouse) = validate(input.username, input.role, input.warehouse)?;
        Ok(Self {
            id,
            username,
            role: input.role,
            warehouse,
        })
    }

    pub fn restore(id: UserId, username: String, role: Role, warehouse: Option<Warehouse>) -> Self {
        Self {
            id,
            username,
            role,
            warehouse,
        }
    }

    pub fn update(&mut self, input: UserUpdate) -> DomainResult<()> {
        let (username, warehouse) = validate(input.username, input.role, input.warehouse)?;
        self.username = username;
        self.role = input.role;
        self.warehouse = warehouse;
        Ok(())
    }

    pub fn id(&self) -> UserId {
        self.id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn warehouse(&self) -> Option<Warehouse> {
        self.warehouse
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn actor(&self) -> Actor {
        Actor {
            user_id: self.id,
            username: self.username.clone(),
            role: self.role,
            warehouse: self.warehouse,
        }
    }
}

fn validate(
    username: String,
    role: Role,
    warehouse: Option<Warehouse>,
) -> DomainResult<(String, Option<Warehouse>)> {
    let username = username.trim();
    if username.is_empty() {
        return Err(DomainError::validation("username cannot be empty"));
    }
    if username.chars().any(char::is_whitespace) {
        return Err(DomainError::validation("username cannot contain whitespace"));
    }
    let warehouse = match role {
        Role::Admin => None,
        Role::Storekeeper => Some(warehouse.ok_or_else(|| {
            DomainError::validation("storekeeper must be assigned a warehouse")
        })?),
    };
    Ok((username.to_string(), warehouse))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storekeeper_requires_warehouse() {
        let err = UserAccount::create(
            UserId::new(),
            NewUser {
                username: "jana".to_string(),
                role: Role::Storekeeper,
                warehouse: None,
            },
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn admin_drops_warehouse_and_username_is_trimmed() {
        let u = UserAccount::create(
            UserId::new(),
            NewUser {
                username: " boss ".to_string(),
                role: Role::Admin,
                warehouse: Some(Warehouse::Brno),
            },
        )
        .unwrap();
        assert_eq!(u.username(), "boss");
        assert_eq!(u.warehouse(), None);
        assert!(u.actor().is_admin());
    }

    #[test]
    fn update_switches_role() {
        let mut u = UserAccount::create(
            UserId::new(),
            NewUser {
                username: "petr".to_string(),
                role: Role::Admin,
                warehouse: None,
            },
        )
        .unwrap();
        u.update(NewUser {
            username: "petr".to_string(),
            role: Role::Storekeeper,
            warehouse: Some(Warehouse::Ostrava),
        })
        .unwrap();
        assert_eq!(u.role(), Role::Storekeeper);
        assert_eq!(u.warehouse(), Some(Warehouse::Ostrava));

        assert!(u
            .update(NewUser {
                username: "pe tr".to_string(),
                role: Role::Admin,
                warehouse: None,
            })
            .is_err());
    }
}
