use tracing::info;

use stockhouse_auth::{Action, Actor, authorize};
use stockhouse_core::{ProductId, Warehouse};
use stockhouse_inventory::{Transfer, TransferDraft};

use super::{LedgerResult, LedgerService, TransferLine, require_product};

impl LedgerService {
    fn load_basket(&self, actor: &Actor) -> TransferDraft {
        self.baskets
            .get(actor.user_id)
            .unwrap_or_else(|| TransferDraft::new(Warehouse::HUB, Warehouse::Prague))
    }

    /// The actor's transfer basket, without products deleted since they were added.
    pub async fn basket(&self, actor: &Actor) -> LedgerResult<TransferDraft> {
        authorize(actor, Action::CreateTransfer)?;
        let mut draft = self.load_basket(actor);
        if draft.is_empty() {
            return Ok(draft);
        }

        let mut tx = self.begin().await?;
        let mut known = Vec::new();
        for line in draft.lines() {
            if tx.product(line.product_id).await?.is_some() {
                known.push(line.product_id);
            }
        }
        drop(tx);

        draft.retain_products(|id| known.contains(&id));
        self.baskets.upsert(actor.user_id, draft.clone());
        Ok(draft)
    }

    pub async fn set_basket_route(
        &self,
        actor: &Actor,
        source: Warehouse,
        target: Warehouse,
    ) -> LedgerResult<TransferDraft> {
        authorize(actor, Action::CreateTransfer)?;
        let mut draft = self.load_basket(actor);
        draft.set_route(source, target);
        self.baskets.upsert(actor.user_id, draft.clone());
        Ok(draft)
    }

    /// Add a product with every size of its category at 0.
    pub async fn add_to_basket(
        &self,
        actor: &Actor,
        product_id: ProductId,
    ) -> LedgerResult<TransferDraft> {
        authorize(actor, Action::CreateTransfer)?;
        let product = {
            let mut tx = self.begin().await?;
            require_product(tx.as_mut(), product_id).await?
        };
        let mut draft = self.load_basket(actor);
        draft.add_product(&product);
        self.baskets.upsert(actor.user_id, draft.clone());
        Ok(draft)
    }

    /// Set per-size quantities for a basket product. All or nothing.
    pub async fn set_basket_quantities(
        &self,
        actor: &Actor,
        product_id: ProductId,
        quantities: &[(i64, i64)],
    ) -> LedgerResult<TransferDraft> {
        authorize(actor, Action::CreateTransfer)?;
        let product = {
            let mut tx = self.begin().await?;
            require_product(tx.as_mut(), product_id).await?
        };
        let mut draft = self.load_basket(actor);
        for &(raw_size, quantity) in quantities {
            let size = product.validate_size(raw_size)?;
            draft.set_quantity(product_id, size, quantity)?;
        }
        self.baskets.upsert(actor.user_id, draft.clone());
        Ok(draft)
    }

    pub async fn remove_from_basket(
        &self,
        actor: &Actor,
        product_id: ProductId,
    ) -> LedgerResult<TransferDraft> {
        authorize(actor, Action::CreateTransfer)?;
        let mut draft = self.load_basket(actor);
        draft.remove_product(product_id);
        self.baskets.upsert(actor.user_id, draft.clone());
        Ok(draft)
    }

    /// Create a transfer from the basket; the basket is cleared only on success.
    pub async fn submit_basket(&self, actor: &Actor) -> LedgerResult<Transfer> {
        authorize(actor, Action::CreateTransfer)?;
        let draft = self.load_basket(actor);
        let lines = draft
            .items()
            .into_iter()
            .map(|item| TransferLine {
                product_id: item.product_id,
                size: i64::from(item.size.value()),
                quantity: item.quantity,
            })
            .collect();

        let transfer = self
            .create_transfer(actor, draft.source(), draft.target(), lines)
            .await?;
        self.baskets.remove(actor.user_id);
        info!(user = %actor.username, transfer_id = %transfer.transfer_id(), "basket submitted");
        Ok(transfer)
    }

    pub async fn discard_basket(&self, actor: &Actor) -> LedgerResult<()> {
        authorize(actor, Action::CreateTransfer)?;
        self.baskets.remove(actor.user_id);
        Ok(())
    }
}
