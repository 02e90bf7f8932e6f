//! Order assembly: the checkout transaction.
//!
//! Every monetary component is recomputed server-side; client-supplied
//! totals, discounts and shipping numbers are never trusted. All writes for
//! one checkout happen in a single transaction, and the confirmation event
//! is published only after commit.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::{Rng, RngCore};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DatabaseTransaction,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::entities::{
    cart_item, guest_order_detail, inventory_movement, order, order_item,
    order_shipping_address, order_status_history, product, product_variant, shipping_cost, user,
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::discounts::{self, CustomerIdentity, ResolvedDiscount};
use crate::services::order_status::OrderStatus;
use crate::services::pricing;

#[derive(Clone, Debug, Deserialize)]
pub struct OrderLineRequest {
    pub product_variant_id: Uuid,
    pub quantity: i32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ShippingAddressRequest {
    #[serde(default)]
    pub recipient_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub province: String,
    pub postal_code: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub items: Vec<OrderLineRequest>,
    pub shipping_address: Option<ShippingAddressRequest>,
    pub coupon_code: Option<String>,
    pub shipping_cost_id: Option<Uuid>,
    pub payment_method: Option<String>,
    pub guest_email: Option<String>,
    pub notes: Option<String>,
}

/// Checkout response. The tracking token is the only credential a guest
/// holds for this order.
#[derive(Clone, Debug, Serialize)]
pub struct CreatedOrder {
    pub order_id: Uuid,
    pub order_number: String,
    pub tracking_token: String,
    pub tracking_url: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct OrderDetail {
    pub order: order::Model,
    pub items: Vec<order_item::Model>,
    pub shipping_address: Option<order_shipping_address::Model>,
    pub history: Vec<order_status_history::Model>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct OrderListFilter {
    pub status: Option<OrderStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Clone, Debug, Serialize)]
pub struct OrderPage {
    pub orders: Vec<order::Model>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

struct PricedLine {
    variant: product_variant::Model,
    product_name: String,
    quantity: i32,
    unit_price: i64,
}

fn generate_order_number(now: DateTime<Utc>) -> String {
    format!(
        "ORD-{}-{:04}",
        now.format("%Y%m%d"),
        rand::thread_rng().gen_range(0..10_000)
    )
}

/// 256 bits from the OS generator, hex-encoded to 64 characters.
fn generate_tracking_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
    config: AppConfig,
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender, config: AppConfig) -> Self {
        Self {
            db,
            event_sender,
            config,
        }
    }

    #[instrument(skip(self, request), fields(user_id = ?user_id, lines = request.items.len()))]
    pub async fn create_order(
        &self,
        request: CreateOrderRequest,
        user_id: Option<Uuid>,
    ) -> Result<CreatedOrder, ServiceError> {
        if request.items.is_empty() {
            return Err(ServiceError::ValidationError("Keranjang kosong".to_string()));
        }
        if request.items.iter().any(|line| line.quantity <= 0) {
            return Err(ServiceError::ValidationError(
                "Jumlah barang harus lebih dari 0".to_string(),
            ));
        }
        let shipping = request.shipping_address.as_ref().ok_or_else(|| {
            ServiceError::ValidationError("Alamat pengiriman wajib diisi".to_string())
        })?;

        let (identity, member_pct, notify_email) = match user_id {
            Some(uid) => {
                let account = user::Entity::find_by_id(uid)
                    .one(&*self.db)
                    .await?
                    .filter(|u| u.is_active)
                    .ok_or_else(|| {
                        ServiceError::NotFound("Akun pengguna tidak ditemukan".to_string())
                    })?;
                (
                    CustomerIdentity::User(uid),
                    account.member_discount_pct,
                    Some(account.email),
                )
            }
            None => {
                let email = request
                    .guest_email
                    .as_deref()
                    .map(str::trim)
                    .filter(|e| !e.is_empty())
                    .ok_or_else(|| {
                        ServiceError::ValidationError(
                            "Identitas pemesan tidak ditemukan: login atau sertakan guest_email"
                                .to_string(),
                        )
                    })?
                    .to_string();
                validate_guest_contact(shipping)?;
                (CustomerIdentity::Guest(email.clone()), None, Some(email))
            }
        };

        let now = Utc::now();
        let txn = self.db.begin().await?;

        let mut lines: Vec<PricedLine> = Vec::with_capacity(request.items.len());
        let mut subtotal: i64 = 0;
        for line in &request.items {
            let (variant, parent) = product_variant::Entity::find_by_id(line.product_variant_id)
                .find_also_related(product::Entity)
                .one(&txn)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound("Varian produk tidak ditemukan".to_string())
                })?;
            let parent = parent
                .filter(|p| p.is_active && variant.is_active)
                .ok_or_else(|| {
                    ServiceError::NotFound("Varian produk tidak ditemukan atau tidak aktif".to_string())
                })?;

            if line.quantity > variant.stock_quantity {
                return Err(ServiceError::InsufficientStock(format!(
                    "Stok {} tidak mencukupi: diminta {}, tersisa {}",
                    variant.sku, line.quantity, variant.stock_quantity
                )));
            }

            let unit_price = pricing::unit_price(
                parent.base_price,
                variant.additional_price,
                parent.discount_pct,
                parent.discount_starts_at,
                parent.discount_ends_at,
                now,
            );
            subtotal += unit_price * line.quantity as i64;
            lines.push(PricedLine {
                variant,
                product_name: parent.name,
                quantity: line.quantity,
                unit_price,
            });
        }

        let member_discount = match member_pct {
            Some(pct) if pct > rust_decimal::Decimal::ZERO => {
                pricing::percentage_of(subtotal, pct)
            }
            _ => 0,
        };

        let resolved: Option<ResolvedDiscount> = match request
            .coupon_code
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
        {
            Some(code) => {
                discounts::resolve_for_checkout(&txn, code, subtotal, &identity, now).await?
            }
            None => None,
        };
        let applied = resolved.as_ref().filter(|r| r.amount > 0);
        let discount_amount = applied.map(|r| r.amount).unwrap_or(0);

        let shipping_amount = match request.shipping_cost_id {
            Some(id) => {
                shipping_cost::Entity::find_by_id(id)
                    .filter(shipping_cost::Column::IsActive.eq(true))
                    .one(&txn)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound("Tarif pengiriman tidak ditemukan".to_string())
                    })?
                    .cost
            }
            None => self.config.default_shipping_cost,
        };

        let tax = pricing::tax_amount(subtotal - member_discount - discount_amount);
        let total = subtotal - member_discount - discount_amount + shipping_amount + tax;

        let order_id = Uuid::new_v4();
        let order_number = generate_order_number(now);
        let tracking_token = generate_tracking_token();

        order::ActiveModel {
            id: Set(order_id),
            order_number: Set(order_number.clone()),
            tracking_token: Set(tracking_token.clone()),
            user_id: Set(identity.user_id()),
            guest_email: Set(identity.guest_email().map(|e| e.to_string())),
            status: Set(OrderStatus::Pending.to_string()),
            payment_status: Set("unpaid".to_string()),
            payment_method: Set(request.payment_method.clone()),
            coupon_code: Set(applied.map(|r| r.code.clone())),
            subtotal: Set(subtotal),
            member_discount: Set(member_discount),
            discount_amount: Set(discount_amount),
            shipping_cost: Set(shipping_amount),
            tax: Set(tax),
            total: Set(total),
            notes: Set(request.notes.clone()),
            courier_tracking_number: Set(None),
            created_at: Set(now),
            shipped_at: Set(None),
            delivered_at: Set(None),
            updated_at: Set(None),
        }
        .insert(&txn)
        .await?;

        for line in &lines {
            order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                variant_id: Set(line.variant.id),
                product_name: Set(line.product_name.clone()),
                sku: Set(line.variant.sku.clone()),
                size: Set(line.variant.size.clone()),
                quantity: Set(line.quantity),
                unit_price: Set(line.unit_price),
                unit_cost: Set(line.variant.cost_price),
                subtotal: Set(line.unit_price * line.quantity as i64),
            }
            .insert(&txn)
            .await?;

            decrement_stock(&txn, &line.variant, line.quantity, &order_number).await?;
        }

        order_shipping_address::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            recipient_name: Set(shipping.recipient_name.clone()),
            phone: Set(shipping.phone.clone()),
            address: Set(shipping.address.clone()),
            city: Set(shipping.city.clone()),
            province: Set(shipping.province.clone()),
            postal_code: Set(shipping.postal_code.clone()),
        }
        .insert(&txn)
        .await?;

        if let Some(email) = identity.guest_email() {
            guest_order_detail::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                email: Set(email.to_string()),
                recipient_name: Set(shipping.recipient_name.clone()),
                phone: Set(shipping.phone.clone()),
                address: Set(shipping.address.clone()),
                city: Set(shipping.city.clone()),
                province: Set(shipping.province.clone()),
                postal_code: Set(shipping.postal_code.clone()),
            }
            .insert(&txn)
            .await?;
        }

        order_status_history::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            status: Set(OrderStatus::Pending.to_string()),
            title: Set(OrderStatus::Pending.localized_title().to_string()),
            notes: Set(None),
            actor: Set(None),
            created_at: Set(now),
        }
        .insert(&txn)
        .await?;

        if let Some(uid) = identity.user_id() {
            cart_item::Entity::delete_many()
                .filter(cart_item::Column::UserId.eq(uid))
                .exec(&txn)
                .await?;
        }

        if let Some(r) = applied {
            discounts::record_usage(&txn, r, order_id, &identity).await?;
        }

        txn.commit().await?;

        let tracking_url = format!("{}/track/{}", self.config.public_base_url, tracking_token);
        info!(order_id = %order_id, order_number = %order_number, total, "Order created");
        self.event_sender
            .send(Event::OrderCreated {
                order_id,
                order_number: order_number.clone(),
                email: notify_email,
                tracking_url: tracking_url.clone(),
            })
            .await;

        Ok(CreatedOrder {
            order_id,
            order_number,
            tracking_token,
            tracking_url,
        })
    }

    pub async fn get_order(&self, order_id: Uuid) -> Result<OrderDetail, ServiceError> {
        let header = order::Entity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Pesanan tidak ditemukan".to_string()))?;
        self.load_detail(header).await
    }

    /// Public lookup by opaque tracking token.
    pub async fn track_by_token(&self, token: &str) -> Result<OrderDetail, ServiceError> {
        let header = order::Entity::find()
            .filter(order::Column::TrackingToken.eq(token))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Pesanan tidak ditemukan".to_string()))?;
        self.load_detail(header).await
    }

    async fn load_detail(&self, header: order::Model) -> Result<OrderDetail, ServiceError> {
        let items = order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(header.id))
            .all(&*self.db)
            .await?;
        let shipping_address = order_shipping_address::Entity::find()
            .filter(order_shipping_address::Column::OrderId.eq(header.id))
            .one(&*self.db)
            .await?;
        let history = order_status_history::Entity::find()
            .filter(order_status_history::Column::OrderId.eq(header.id))
            .order_by_asc(order_status_history::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        Ok(OrderDetail {
            order: header,
            items,
            shipping_address,
            history,
        })
    }

    /// Admin listing with structured filters. Unmatched filters return an
    /// empty page, not an error.
    pub async fn list_orders(&self, filter: OrderListFilter) -> Result<OrderPage, ServiceError> {
        let mut condition = Condition::all();
        if let Some(status) = filter.status {
            condition = condition.add(order::Column::Status.eq(status.to_string()));
        }
        if let Some(from) = filter.from {
            condition = condition.add(order::Column::CreatedAt.gte(from));
        }
        if let Some(to) = filter.to {
            condition = condition.add(order::Column::CreatedAt.lte(to));
        }

        let page = filter.page.unwrap_or(1).max(1);
        let per_page = filter.per_page.unwrap_or(20).clamp(1, 100);

        let paginator = order::Entity::find()
            .filter(condition)
            .order_by_desc(order::Column::CreatedAt)
            .paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page - 1).await?;

        Ok(OrderPage {
            orders,
            total,
            page,
            per_page,
        })
    }
}

fn validate_guest_contact(shipping: &ShippingAddressRequest) -> Result<(), ServiceError> {
    let required = [
        ("nama penerima", &shipping.recipient_name),
        ("telepon", &shipping.phone),
        ("alamat", &shipping.address),
        ("kota", &shipping.city),
        ("provinsi", &shipping.province),
    ];
    for (label, value) in required {
        if value.trim().is_empty() {
            return Err(ServiceError::ValidationError(format!(
                "Data pesanan tamu tidak lengkap: {} wajib diisi",
                label
            )));
        }
    }
    Ok(())
}

/// As-built decrement: the quantity check happened when the variant was
/// loaded in this transaction, the update itself is unconditional.
async fn decrement_stock(
    txn: &DatabaseTransaction,
    variant: &product_variant::Model,
    quantity: i32,
    order_number: &str,
) -> Result<(), ServiceError> {
    let mut active: product_variant::ActiveModel = variant.clone().into();
    active.stock_quantity = Set(variant.stock_quantity - quantity);
    active.updated_at = Set(Some(Utc::now()));
    active.update(txn).await?;

    inventory_movement::ActiveModel {
        id: Set(Uuid::new_v4()),
        variant_id: Set(variant.id),
        movement_type: Set("out".to_string()),
        quantity: Set(quantity),
        reference: Set(Some(order_number.to_string())),
        note: Set(None),
        created_at: Set(Utc::now()),
    }
    .insert(txn)
    .await?;
    Ok(())
}
