use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Full contact payload for guest checkouts. Written alongside the shipping
/// address so guest orders remain traceable without a user row.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "guest_order_details")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub order_id: Uuid,
    pub email: String,
    pub recipient_name: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub province: String,
    #[sea_orm(nullable)]
    pub postal_code: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::Id"
    )]
    Order,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
