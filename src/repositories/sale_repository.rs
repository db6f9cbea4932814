//! Persistence for Sales and their CartItems.
//!
//! Both unique keys (`id_sale_provider`, `secure_id`) are enforced by the
//! schema; the any-id lookup is a single OR query across them. Creation
//! and the lifecycle mutations run inside one transaction so a crash can
//! never be observed as a half-updated Sale.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, TransactionTrait,
};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::entities::cart_item::{
    ActiveModel as CartItemActiveModel, Column as CartItemColumn, Entity as CartItem,
    Model as CartItemModel,
};
use crate::entities::sale::{
    ActiveModel as SaleActiveModel, Column as SaleColumn, Entity as Sale, Model as SaleModel,
};
use crate::errors::ServiceError;
use crate::repositories::{BaseRepository, Repository};

#[derive(Debug)]
pub struct SaleRepository {
    base: BaseRepository,
}

impl SaleRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    pub async fn find_by_provider_id(
        &self,
        id_sale_provider: &str,
    ) -> Result<Option<SaleModel>, ServiceError> {
        Sale::find()
            .filter(SaleColumn::IdSaleProvider.eq(id_sale_provider))
            .one(self.base.get_db())
            .await
            .map_err(ServiceError::from)
    }

    pub async fn find_by_secure_id(
        &self,
        secure_id: &str,
    ) -> Result<Option<SaleModel>, ServiceError> {
        Sale::find()
            .filter(SaleColumn::SecureId.eq(secure_id))
            .one(self.base.get_db())
            .await
            .map_err(ServiceError::from)
    }

    /// Looks a Sale up by either unique key. The two columns are
    /// disjoint-unique, so the first match is deterministic.
    pub async fn find_by_any_id(&self, id: &str) -> Result<Option<SaleModel>, ServiceError> {
        Sale::find()
            .filter(
                Condition::any()
                    .add(SaleColumn::IdSaleProvider.eq(id))
                    .add(SaleColumn::SecureId.eq(id)),
            )
            .one(self.base.get_db())
            .await
            .map_err(ServiceError::from)
    }

    /// Items for a Sale in insertion order; the lifecycle operations rely
    /// on this order when selecting which items to cancel.
    pub async fn items_for(&self, sale_id: Uuid) -> Result<Vec<CartItemModel>, ServiceError> {
        CartItem::find()
            .filter(CartItemColumn::SaleId.eq(sale_id))
            .order_by_asc(CartItemColumn::CreatedAt)
            .order_by_asc(CartItemColumn::Id)
            .all(self.base.get_db())
            .await
            .map_err(ServiceError::from)
    }

    /// Inserts a Sale and all its CartItems atomically.
    #[instrument(skip(self, sale, items))]
    pub async fn create_with_items(
        &self,
        sale: SaleActiveModel,
        items: Vec<CartItemActiveModel>,
    ) -> Result<(SaleModel, Vec<CartItemModel>), ServiceError> {
        let txn = self.base.get_db().begin().await?;

        let sale_model = sale.insert(&txn).await?;

        let mut item_models = Vec::with_capacity(items.len());
        for item in items {
            item_models.push(item.insert(&txn).await?);
        }

        txn.commit().await?;
        Ok((sale_model, item_models))
    }

    /// Updates a Sale alone, outside of any item mutation.
    pub async fn update(&self, sale: SaleActiveModel) -> Result<SaleModel, ServiceError> {
        sale.update(self.base.get_db())
            .await
            .map_err(ServiceError::from)
    }

    /// Applies item mutations and the parent Sale update in a single
    /// transaction. Used by the pax-reduction and cancellation flows.
    #[instrument(skip(self, sale, item_mutations))]
    pub async fn transactional_update(
        &self,
        sale: SaleActiveModel,
        item_mutations: Vec<CartItemActiveModel>,
    ) -> Result<SaleModel, ServiceError> {
        let txn = self.base.get_db().begin().await?;

        for item in item_mutations {
            item.update(&txn).await?;
        }

        let sale_model = sale.update(&txn).await?;

        txn.commit().await?;
        Ok(sale_model)
    }
}

impl Repository for SaleRepository {
    fn get_db(&self) -> &DatabaseConnection {
        self.base.get_db()
    }
}
