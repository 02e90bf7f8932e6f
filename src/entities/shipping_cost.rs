use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Authoritative shipping rate table. Checkout always reads the cost from
/// here (or the configured default); client-submitted amounts are ignored.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "shipping_costs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub courier: String,
    pub service: String,
    pub destination: String,
    pub cost: i64,
    #[sea_orm(nullable)]
    pub etd: Option<String>,
    pub is_active: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
