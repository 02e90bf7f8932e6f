use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Per-variant count line: system quantity snapshotted at creation vs the
/// physically counted quantity entered while the opname is a draft.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_opname_details")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub opname_id: Uuid,
    pub variant_id: Uuid,
    pub system_qty: i32,
    pub physical_qty: i32,
    #[sea_orm(nullable)]
    pub note: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::stock_opname::Entity",
        from = "Column::OpnameId",
        to = "super::stock_opname::Column::Id"
    )]
    Opname,
    #[sea_orm(
        belongs_to = "super::product_variant::Entity",
        from = "Column::VariantId",
        to = "super::product_variant::Column::Id"
    )]
    Variant,
}

impl Related<super::stock_opname::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Opname.def()
    }
}

impl Related<super::product_variant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Variant.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
