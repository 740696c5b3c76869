use thiserror::Error;

use stockhouse_core::Warehouse;

use crate::Actor;

/// Something an actor asks to do, with the warehouse it touches.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Action<'a> {
    /// Receive, issue or annotate stock in a warehouse.
    OperateWarehouse(Warehouse),
    ManageCatalog,
    ManageUsers,
    CreateTransfer,
    /// View, export or list a transfer headed to `target`.
    ViewTransfer { target: Warehouse },
    ConfirmTransfer { target: Warehouse },
    /// Export the inventory sheet of a warehouse.
    ExportInventory(Warehouse),
    /// Run an inventory count in a warehouse.
    CountInventory(Warehouse),
    /// Record a sales or overtime tally for `for_user` in the current or an
    /// earlier month.
    RecordStaffTally { for_user: &'a str, current_month: bool },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: {0}")]
    Forbidden(String),
}

fn forbid(msg: impl Into<String>) -> Result<(), AuthzError> {
    Err(AuthzError::Forbidden(msg.into()))
}

/// The one place role and warehouse rules are decided.
///
/// - No IO
/// - No panics
pub fn authorize(actor: &Actor, action: Action<'_>) -> Result<(), AuthzError> {
    if actor.is_admin() {
        return Ok(());
    }

    match action {
        Action::OperateWarehouse(w) | Action::CountInventory(w) => {
            if actor.is_assigned_to(w) {
                Ok(())
            } else {
                forbid(format!("not assigned to warehouse {w}"))
            }
        }
        Action::ManageCatalog => forbid("catalog management requires admin"),
        Action::ManageUsers => forbid("user management requires admin"),
        Action::CreateTransfer => {
            if actor.is_privileged() {
                Ok(())
            } else {
                forbid(format!("only admin or {} staff create transfers", Warehouse::HUB))
            }
        }
        Action::ViewTransfer { target } | Action::ConfirmTransfer { target } => {
            if actor.is_privileged() || actor.is_assigned_to(target) {
                Ok(())
            } else {
                forbid(format!("transfer is headed to {target}"))
            }
        }
        Action::ExportInventory(w) => {
            if actor.is_privileged() || actor.is_assigned_to(w) {
                Ok(())
            } else {
                forbid(format!("not assigned to warehouse {w}"))
            }
        }
        Action::RecordStaffTally {
            for_user,
            current_month,
        } => {
            if for_user != actor.username {
                forbid("only admin records tallies for other users")
            } else if !current_month {
                forbid("only admin records tallies for other months")
            } else {
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;
    use stockhouse_core::UserId;

    fn storekeeper(w: Warehouse) -> Actor {
        Actor {
            user_id: UserId::new(),
            username: format!("keeper-{w}"),
            role: Role::Storekeeper,
            warehouse: Some(w),
        }
    }

    fn admin() -> Actor {
        Actor {
            user_id: UserId::new(),
            username: "admin".to_string(),
            role: Role::Admin,
            warehouse: None,
        }
    }

    #[test]
    fn admin_is_allowed_everything() {
        let a = admin();
        for action in [
            Action::ManageCatalog,
            Action::ManageUsers,
            Action::CreateTransfer,
            Action::OperateWarehouse(Warehouse::Ostrava),
            Action::ConfirmTransfer { target: Warehouse::Brno },
            Action::RecordStaffTally { for_user: "jana", current_month: false },
        ] {
            assert!(authorize(&a, action).is_ok(), "{action:?}");
        }
    }

    #[test]
    fn storekeeper_operates_only_own_warehouse() {
        let s = storekeeper(Warehouse::Brno);
        assert!(authorize(&s, Action::OperateWarehouse(Warehouse::Brno)).is_ok());
        assert!(authorize(&s, Action::OperateWarehouse(Warehouse::Prague)).is_err());
        assert!(authorize(&s, Action::CountInventory(Warehouse::Prague)).is_err());
        assert!(authorize(&s, Action::ManageCatalog).is_err());
        assert!(authorize(&s, Action::ManageUsers).is_err());
    }

    #[test]
    fn hub_staff_run_transfers_but_not_other_warehouses() {
        let hub = storekeeper(Warehouse::Pardubice);
        assert!(authorize(&hub, Action::CreateTransfer).is_ok());
        assert!(authorize(&hub, Action::ConfirmTransfer { target: Warehouse::Ostrava }).is_ok());
        assert!(authorize(&hub, Action::ExportInventory(Warehouse::Prague)).is_ok());
        assert!(authorize(&hub, Action::OperateWarehouse(Warehouse::Prague)).is_err());
    }

    #[test]
    fn target_storekeeper_confirms_only_incoming() {
        let brno = storekeeper(Warehouse::Brno);
        assert!(authorize(&brno, Action::CreateTransfer).is_err());
        assert!(authorize(&brno, Action::ConfirmTransfer { target: Warehouse::Brno }).is_ok());
        assert!(authorize(&brno, Action::ConfirmTransfer { target: Warehouse::Prague }).is_err());
        assert!(authorize(&brno, Action::ViewTransfer { target: Warehouse::Prague }).is_err());
    }

    #[test]
    fn storekeeper_records_own_tally_for_current_month_only() {
        let s = storekeeper(Warehouse::Brno);
        let me = s.username.clone();
        assert!(authorize(&s, Action::RecordStaffTally { for_user: &me, current_month: true }).is_ok());
        assert!(authorize(&s, Action::RecordStaffTally { for_user: &me, current_month: false }).is_err());
        assert!(authorize(&s, Action::RecordStaffTally { for_user: "other", current_month: true }).is_err());
    }
}
