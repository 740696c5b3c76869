use tracing::{info, warn};

use stockhouse_auth::{Action, Actor, NewUser, UserAccount, UserUpdate, authorize};
use stockhouse_core::{DomainError, UserId};

use super::{LedgerResult, LedgerService};

impl LedgerService {
    pub async fn users(&self, actor: &Actor) -> LedgerResult<Vec<UserAccount>> {
        authorize(actor, Action::ManageUsers)?;
        let mut tx = self.begin().await?;
        Ok(tx.users().await?)
    }

    pub async fn create_user(&self, actor: &Actor, input: NewUser) -> LedgerResult<UserAccount> {
        authorize(actor, Action::ManageUsers)?;
        let user = UserAccount::create(UserId::new(), input)?;

        let mut tx = self.begin().await?;
        tx.save_user(&user).await?;
        tx.commit().await?;

        info!(user_id = %user.id(), username = user.username(), role = user.role().as_str(), "user created");
        Ok(user)
    }

    pub async fn update_user(
        &self,
        actor: &Actor,
        id: UserId,
        input: UserUpdate,
    ) -> LedgerResult<UserAccount> {
        authorize(actor, Action::ManageUsers)?;

        let mut tx = self.begin().await?;
        let mut user = tx
            .user(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("user {id}")))?;
        user.update(input)?;
        tx.save_user(&user).await?;
        tx.commit().await?;

        info!(user_id = %id, "user updated");
        Ok(user)
    }

    pub async fn delete_user(&self, actor: &Actor, id: UserId) -> LedgerResult<()> {
        authorize(actor, Action::ManageUsers)?;
        if id == actor.user_id {
            warn!(user_id = %id, "user tried to delete own account");
            return Err(DomainError::conflict("cannot delete your own account").into());
        }

        let mut tx = self.begin().await?;
        if tx.user(id).await?.is_none() {
            return Err(DomainError::not_found(format!("user {id}")).into());
        }
        tx.delete_user(id).await?;
        tx.commit().await?;

        info!(user_id = %id, "user deleted");
        Ok(())
    }
}
