//! Stock opname: point-in-time physical inventory counts per warehouse.
//!
//! A draft snapshots system quantities for every active variant in the
//! warehouse. Counted quantities are entered while the header stays draft;
//! completion overwrites variant stock with the counted values and leaves a
//! signed movement trail. Completed and cancelled are both terminal.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::Rng;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::entities::{inventory_movement, product_variant, stock_opname, stock_opname_detail};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

pub const STATUS_DRAFT: &str = "draft";
pub const STATUS_COMPLETED: &str = "completed";
pub const STATUS_CANCELLED: &str = "cancelled";

#[derive(Clone, Debug, Deserialize)]
pub struct CreateOpnameRequest {
    pub warehouse_id: Uuid,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct UpdateOpnameDetailRequest {
    pub physical_qty: i32,
    pub note: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct OpnameDetailView {
    pub opname: stock_opname::Model,
    pub details: Vec<stock_opname_detail::Model>,
}

/// Returned by completion.
#[derive(Clone, Debug, Serialize)]
pub struct OpnameSummary {
    pub adjusted_count: usize,
    pub total_absolute_difference: i64,
}

fn generate_opname_number(now: DateTime<Utc>) -> String {
    format!(
        "SO-{}-{:04}",
        now.format("%Y%m%d"),
        rand::thread_rng().gen_range(0..10_000)
    )
}

#[derive(Clone)]
pub struct StockOpnameService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl StockOpnameService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Opens a draft and snapshots the warehouse's active variants.
    #[instrument(skip(self, req), fields(warehouse_id = %req.warehouse_id))]
    pub async fn create(&self, req: CreateOpnameRequest) -> Result<OpnameDetailView, ServiceError> {
        let now = Utc::now();
        let variants = product_variant::Entity::find()
            .filter(product_variant::Column::WarehouseId.eq(req.warehouse_id))
            .filter(product_variant::Column::IsActive.eq(true))
            .all(&*self.db)
            .await?;
        if variants.is_empty() {
            return Err(ServiceError::NotFound(
                "Tidak ada varian aktif di gudang ini".to_string(),
            ));
        }

        let txn = self.db.begin().await?;

        let header = stock_opname::ActiveModel {
            id: Set(Uuid::new_v4()),
            opname_number: Set(generate_opname_number(now)),
            warehouse_id: Set(req.warehouse_id),
            opname_date: Set(now),
            status: Set(STATUS_DRAFT.to_string()),
            notes: Set(req.notes),
            created_at: Set(now),
            completed_at: Set(None),
        }
        .insert(&txn)
        .await?;

        let mut details = Vec::with_capacity(variants.len());
        for variant in variants {
            let detail = stock_opname_detail::ActiveModel {
                id: Set(Uuid::new_v4()),
                opname_id: Set(header.id),
                variant_id: Set(variant.id),
                system_qty: Set(variant.stock_quantity),
                physical_qty: Set(0),
                note: Set(None),
            }
            .insert(&txn)
            .await?;
            details.push(detail);
        }

        txn.commit().await?;
        info!(opname_id = %header.id, opname_number = %header.opname_number, "Stock opname draft created");
        Ok(OpnameDetailView {
            opname: header,
            details,
        })
    }

    pub async fn list(&self) -> Result<Vec<stock_opname::Model>, ServiceError> {
        Ok(stock_opname::Entity::find()
            .order_by_desc(stock_opname::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    pub async fn get(&self, opname_id: Uuid) -> Result<OpnameDetailView, ServiceError> {
        let header = self.find_header(opname_id).await?;
        let details = stock_opname_detail::Entity::find()
            .filter(stock_opname_detail::Column::OpnameId.eq(opname_id))
            .all(&*self.db)
            .await?;
        Ok(OpnameDetailView {
            opname: header,
            details,
        })
    }

    /// Counted quantities may only change while the header is a draft.
    #[instrument(skip(self, req), fields(opname_id = %opname_id, detail_id = %detail_id))]
    pub async fn update_detail(
        &self,
        opname_id: Uuid,
        detail_id: Uuid,
        req: UpdateOpnameDetailRequest,
    ) -> Result<stock_opname_detail::Model, ServiceError> {
        if req.physical_qty < 0 {
            return Err(ServiceError::ValidationError(
                "Jumlah fisik tidak boleh negatif".to_string(),
            ));
        }
        let header = self.find_header(opname_id).await?;
        self.ensure_draft(&header)?;

        let detail = stock_opname_detail::Entity::find_by_id(detail_id)
            .filter(stock_opname_detail::Column::OpnameId.eq(opname_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound("Rincian stock opname tidak ditemukan".to_string())
            })?;

        let mut active: stock_opname_detail::ActiveModel = detail.into();
        active.physical_qty = Set(req.physical_qty);
        active.note = Set(req.note);
        Ok(active.update(&*self.db).await?)
    }

    /// Applies every nonzero difference as the new authoritative stock,
    /// all-or-nothing.
    #[instrument(skip(self), fields(opname_id = %opname_id))]
    pub async fn complete(&self, opname_id: Uuid) -> Result<OpnameSummary, ServiceError> {
        let header = self.find_header(opname_id).await?;
        self.ensure_draft(&header)?;

        let details = stock_opname_detail::Entity::find()
            .filter(stock_opname_detail::Column::OpnameId.eq(opname_id))
            .all(&*self.db)
            .await?;

        let now = Utc::now();
        let txn = self.db.begin().await?;

        let mut adjusted_count = 0usize;
        let mut total_absolute_difference = 0i64;
        for detail in &details {
            let difference = detail.physical_qty - detail.system_qty;
            if difference == 0 {
                continue;
            }

            let variant = product_variant::Entity::find_by_id(detail.variant_id)
                .one(&txn)
                .await?
                .ok_or_else(|| {
                    ServiceError::InternalError(format!(
                        "Varian {} pada opname {} tidak ditemukan",
                        detail.variant_id, header.opname_number
                    ))
                })?;

            let mut active: product_variant::ActiveModel = variant.into();
            active.stock_quantity = Set(detail.physical_qty);
            active.updated_at = Set(Some(now));
            active.update(&txn).await?;

            inventory_movement::ActiveModel {
                id: Set(Uuid::new_v4()),
                variant_id: Set(detail.variant_id),
                movement_type: Set(if difference > 0 { "in" } else { "out" }.to_string()),
                quantity: Set(difference.abs()),
                reference: Set(Some(header.opname_number.clone())),
                note: Set(Some("opname adjustment".to_string())),
                created_at: Set(now),
            }
            .insert(&txn)
            .await?;

            adjusted_count += 1;
            total_absolute_difference += difference.abs() as i64;
        }

        let mut active: stock_opname::ActiveModel = header.clone().into();
        active.status = Set(STATUS_COMPLETED.to_string());
        active.completed_at = Set(Some(now));
        active.update(&txn).await?;

        txn.commit().await?;

        info!(
            opname_number = %header.opname_number,
            adjusted_count, total_absolute_difference, "Stock opname completed"
        );
        self.event_sender
            .send(Event::StockOpnameCompleted {
                opname_id: header.id,
                opname_number: header.opname_number,
                adjusted_count,
            })
            .await;

        Ok(OpnameSummary {
            adjusted_count,
            total_absolute_difference,
        })
    }

    /// Discards a draft without touching stock.
    #[instrument(skip(self), fields(opname_id = %opname_id))]
    pub async fn cancel(&self, opname_id: Uuid) -> Result<stock_opname::Model, ServiceError> {
        let header = self.find_header(opname_id).await?;
        self.ensure_draft(&header)?;

        let mut active: stock_opname::ActiveModel = header.into();
        active.status = Set(STATUS_CANCELLED.to_string());
        Ok(active.update(&*self.db).await?)
    }

    async fn find_header(&self, opname_id: Uuid) -> Result<stock_opname::Model, ServiceError> {
        stock_opname::Entity::find_by_id(opname_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Stock opname tidak ditemukan".to_string()))
    }

    fn ensure_draft(&self, header: &stock_opname::Model) -> Result<(), ServiceError> {
        if header.status != STATUS_DRAFT {
            return Err(ServiceError::InvalidOperation(format!(
                "Stock opname {} sudah berstatus {}",
                header.opname_number, header.status
            )));
        }
        Ok(())
    }
}
