use tracing::{info, warn};

use stockhouse_auth::{Action, Actor, authorize};
use stockhouse_catalog::{NewProduct, Product, ProductFilter, ProductUpdate};
use stockhouse_core::{DomainError, ProductId};
use stockhouse_inventory::{StockFilter, TransferFilter, TransferStatus};

use super::{LedgerResult, LedgerService, require_product};

impl LedgerService {
    pub async fn product(&self, id: ProductId) -> LedgerResult<Product> {
        let mut tx = self.begin().await?;
        require_product(tx.as_mut(), id).await
    }

    pub async fn products(&self, filter: &ProductFilter) -> LedgerResult<Vec<Product>> {
        let mut tx = self.begin().await?;
        Ok(tx.products(filter).await?)
    }

    pub async fn create_product(&self, actor: &Actor, input: NewProduct) -> LedgerResult<Product> {
        authorize(actor, Action::ManageCatalog)?;
        let product = Product::create(ProductId::new(), input)?;

        let mut tx = self.begin().await?;
        tx.save_product(&product).await?;
        tx.commit().await?;

        info!(product_id = %product.id(), name = product.name(), category = %product.category(), "product created");
        Ok(product)
    }

    pub async fn update_product(
        &self,
        actor: &Actor,
        id: ProductId,
        input: ProductUpdate,
    ) -> LedgerResult<Product> {
        authorize(actor, Action::ManageCatalog)?;

        let mut tx = self.begin().await?;
        let mut product = require_product(tx.as_mut(), id).await?;
        product.update(input)?;
        tx.save_product(&product).await?;
        tx.commit().await?;

        info!(product_id = %id, "product updated");
        Ok(product)
    }

    /// Remove a product and its (all-zero) stock entries.
    ///
    /// Refused while any warehouse holds a unit or a pending transfer carries it.
    pub async fn delete_product(&self, actor: &Actor, id: ProductId) -> LedgerResult<()> {
        authorize(actor, Action::ManageCatalog)?;

        let mut tx = self.begin().await?;
        require_product(tx.as_mut(), id).await?;

        let held: i64 = tx
            .stock_entries(&StockFilter {
                warehouse: None,
                product_id: Some(id),
            })
            .await?
            .iter()
            .map(|e| e.quantity())
            .sum();
        if held > 0 {
            warn!(product_id = %id, held, "product delete refused: stock on hand");
            return Err(DomainError::conflict(format!("product {id} still has {held} units in stock")).into());
        }

        let pending = tx
            .transfers(&TransferFilter {
                status: Some(TransferStatus::InTransit),
                ..TransferFilter::default()
            })
            .await?;
        if pending
            .iter()
            .any(|t| t.items().iter().any(|i| i.product_id == id))
        {
            warn!(product_id = %id, "product delete refused: in transit");
            return Err(DomainError::conflict(format!("product {id} is part of a pending transfer")).into());
        }

        tx.delete_product(id).await?;
        tx.commit().await?;

        info!(product_id = %id, "product deleted");
        Ok(())
    }
}
