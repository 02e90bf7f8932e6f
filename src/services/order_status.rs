//! Admin-driven order status transitions with compensating side effects.
//!
//! The machine enforces exactly two rules: a cancelled order accepts no
//! further transition, and a dispatched order (shipped onward) cannot be
//! cancelled. Everything else is left to the admin workflow. Cancellation
//! restores stock and releases coupon usage in the same transaction as the
//! status change.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::entities::{inventory_movement, order, order_item, order_status_history, product_variant, user};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::discounts;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Processing,
    Packed,
    Shipped,
    InTransit,
    OutForDelivery,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Indonesian title shown to customers in tracking history.
    pub fn localized_title(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Menunggu Konfirmasi",
            OrderStatus::Confirmed => "Dikonfirmasi",
            OrderStatus::Processing => "Sedang Diproses",
            OrderStatus::Packed => "Sedang Dikemas",
            OrderStatus::Shipped => "Dikirim",
            OrderStatus::InTransit => "Dalam Perjalanan",
            OrderStatus::OutForDelivery => "Sedang Diantar",
            OrderStatus::Delivered => "Diterima",
            OrderStatus::Cancelled => "Dibatalkan",
        }
    }

    /// Physically dispatched or already in the customer's hands.
    pub fn is_dispatched(&self) -> bool {
        matches!(
            self,
            OrderStatus::Shipped
                | OrderStatus::InTransit
                | OrderStatus::OutForDelivery
                | OrderStatus::Delivered
        )
    }
}

/// Validates a transition without mutating anything.
pub fn can_transition(current: OrderStatus, next: OrderStatus) -> Result<(), ServiceError> {
    if current == OrderStatus::Cancelled {
        return Err(ServiceError::InvalidStatusTransition(
            "Pesanan yang sudah dibatalkan tidak dapat diubah".to_string(),
        ));
    }
    if next == OrderStatus::Cancelled && current.is_dispatched() {
        return Err(ServiceError::InvalidStatusTransition(
            "Pesanan yang sudah dikirim tidak dapat dibatalkan".to_string(),
        ));
    }
    Ok(())
}

fn parse_status(raw: &str) -> Result<OrderStatus, ServiceError> {
    raw.parse::<OrderStatus>().map_err(|_| {
        ServiceError::InternalError(format!("Status pesanan tidak dikenal: {}", raw))
    })
}

#[derive(Clone)]
pub struct OrderStatusService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl OrderStatusService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self, notes), fields(order_id = %order_id, status = %next))]
    pub async fn set_status(
        &self,
        order_id: Uuid,
        next: OrderStatus,
        notes: Option<String>,
        actor: Option<String>,
    ) -> Result<order::Model, ServiceError> {
        let existing = order::Entity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Pesanan tidak ditemukan".to_string()))?;
        can_transition(parse_status(&existing.status)?, next)?;

        let txn = self.db.begin().await?;
        let updated = apply_transition(&txn, existing, next, notes, actor, None).await?;
        txn.commit().await?;

        info!(order_number = %updated.order_number, "Order status updated");
        self.publish(&updated, next).await;
        Ok(updated)
    }

    /// Stores the courier tracking number and moves the order to `shipped`
    /// in one transaction.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn attach_tracking(
        &self,
        order_id: Uuid,
        tracking_number: String,
        actor: Option<String>,
    ) -> Result<order::Model, ServiceError> {
        if tracking_number.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Nomor resi wajib diisi".to_string(),
            ));
        }
        let existing = order::Entity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Pesanan tidak ditemukan".to_string()))?;
        can_transition(parse_status(&existing.status)?, OrderStatus::Shipped)?;

        let notes = Some(format!("Nomor resi: {}", tracking_number.trim()));
        let txn = self.db.begin().await?;
        let updated = apply_transition(
            &txn,
            existing,
            OrderStatus::Shipped,
            notes,
            actor,
            Some(tracking_number.trim().to_string()),
        )
        .await?;
        txn.commit().await?;

        self.publish(&updated, OrderStatus::Shipped).await;
        Ok(updated)
    }

    async fn publish(&self, updated: &order::Model, next: OrderStatus) {
        let email = match (&updated.guest_email, updated.user_id) {
            (Some(email), _) => Some(email.clone()),
            (None, Some(user_id)) => user::Entity::find_by_id(user_id)
                .one(&*self.db)
                .await
                .ok()
                .flatten()
                .map(|u| u.email),
            (None, None) => None,
        };
        let event = if next == OrderStatus::Cancelled {
            Event::OrderCancelled {
                order_id: updated.id,
                order_number: updated.order_number.clone(),
                email,
            }
        } else {
            Event::OrderStatusChanged {
                order_id: updated.id,
                order_number: updated.order_number.clone(),
                email,
                status: next.to_string(),
                title: next.localized_title().to_string(),
            }
        };
        self.event_sender.send(event).await;
    }
}

/// Applies a validated transition inside the caller's transaction: status
/// update, timestamp stamps, history row, and cancellation compensation.
async fn apply_transition(
    txn: &DatabaseTransaction,
    existing: order::Model,
    next: OrderStatus,
    notes: Option<String>,
    actor: Option<String>,
    tracking_number: Option<String>,
) -> Result<order::Model, ServiceError> {
    let now = Utc::now();

    let mut active: order::ActiveModel = existing.clone().into();
    active.status = Set(next.to_string());
    active.updated_at = Set(Some(now));
    if let Some(number) = tracking_number {
        active.courier_tracking_number = Set(Some(number));
    }
    if next == OrderStatus::Shipped && existing.shipped_at.is_none() {
        active.shipped_at = Set(Some(now));
    }
    if next == OrderStatus::Delivered && existing.delivered_at.is_none() {
        active.delivered_at = Set(Some(now));
    }
    let updated = active.update(txn).await?;

    order_status_history::ActiveModel {
        id: Set(Uuid::new_v4()),
        order_id: Set(existing.id),
        status: Set(next.to_string()),
        title: Set(next.localized_title().to_string()),
        notes: Set(notes),
        actor: Set(actor),
        created_at: Set(now),
    }
    .insert(txn)
    .await?;

    if next == OrderStatus::Cancelled {
        compensate_cancellation(txn, &existing).await?;
    }

    Ok(updated)
}

/// Restores stock for every line and releases the coupon redemption.
async fn compensate_cancellation(
    txn: &DatabaseTransaction,
    cancelled: &order::Model,
) -> Result<(), ServiceError> {
    let items = order_item::Entity::find()
        .filter(order_item::Column::OrderId.eq(cancelled.id))
        .all(txn)
        .await?;

    for item in items {
        let variant = product_variant::Entity::find_by_id(item.variant_id)
            .one(txn)
            .await?
            .ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "Varian {} untuk pesanan {} tidak ditemukan",
                    item.variant_id, cancelled.order_number
                ))
            })?;

        let restored = variant.stock_quantity + item.quantity;
        let mut active: product_variant::ActiveModel = variant.into();
        active.stock_quantity = Set(restored);
        active.updated_at = Set(Some(Utc::now()));
        active.update(txn).await?;

        inventory_movement::ActiveModel {
            id: Set(Uuid::new_v4()),
            variant_id: Set(item.variant_id),
            movement_type: Set("in".to_string()),
            quantity: Set(item.quantity),
            reference: Set(Some(cancelled.order_number.clone())),
            note: Set(Some("order-cancelled".to_string())),
            created_at: Set(Utc::now()),
        }
        .insert(txn)
        .await?;
    }

    discounts::release_usage(txn, cancelled).await?;
    Ok(())
}
