//! Cart lines for registered users. The order assembler clears these rows
//! inside the checkout transaction.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter, Set,
};
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::entities::{cart_item, product_variant};
use crate::errors::ServiceError;

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct AddCartItemRequest {
    pub variant_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i32,
}

#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
}

impl CartService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Adds a line, merging quantities when the variant is already carted.
    #[instrument(skip(self, req), fields(user_id = %user_id, variant_id = %req.variant_id))]
    pub async fn add_item(
        &self,
        user_id: Uuid,
        req: AddCartItemRequest,
    ) -> Result<cart_item::Model, ServiceError> {
        req.validate()?;

        let variant = product_variant::Entity::find_by_id(req.variant_id)
            .one(&*self.db)
            .await?
            .filter(|v| v.is_active)
            .ok_or_else(|| ServiceError::NotFound("Varian produk tidak ditemukan".to_string()))?;

        let existing = cart_item::Entity::find()
            .filter(cart_item::Column::UserId.eq(user_id))
            .filter(cart_item::Column::VariantId.eq(variant.id))
            .one(&*self.db)
            .await?;

        let model = match existing {
            Some(line) => {
                let quantity = line.quantity + req.quantity;
                let mut active: cart_item::ActiveModel = line.into();
                active.quantity = Set(quantity);
                active.updated_at = Set(Some(Utc::now()));
                active.update(&*self.db).await?
            }
            None => {
                cart_item::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    user_id: Set(user_id),
                    variant_id: Set(variant.id),
                    quantity: Set(req.quantity),
                    created_at: Set(Utc::now()),
                    updated_at: Set(None),
                }
                .insert(&*self.db)
                .await?
            }
        };
        Ok(model)
    }

    pub async fn list_items(&self, user_id: Uuid) -> Result<Vec<cart_item::Model>, ServiceError> {
        Ok(cart_item::Entity::find()
            .filter(cart_item::Column::UserId.eq(user_id))
            .all(&*self.db)
            .await?)
    }

    /// Removes one line; scoped to the owner so users cannot touch foreign carts.
    #[instrument(skip(self))]
    pub async fn remove_item(&self, user_id: Uuid, item_id: Uuid) -> Result<(), ServiceError> {
        let line = cart_item::Entity::find_by_id(item_id)
            .filter(cart_item::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Item keranjang tidak ditemukan".to_string()))?;
        line.delete(&*self.db).await?;
        Ok(())
    }
}
