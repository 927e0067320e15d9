//! `SeaORM` Entity for fixed_assets table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "fixed_assets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub asset_number: String,
    pub name: String,
    pub purchase_date: Date,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub purchase_cost: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub salvage_value: Decimal,
    pub useful_life_months: i32,
    pub depreciation_method: String,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub accumulated_depreciation: Decimal,
    pub last_depreciation_date: Option<Date>,
    pub status: String,
    pub version: i64,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::depreciation_entries::Entity")]
    DepreciationEntries,
}

impl Related<super::depreciation_entries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DepreciationEntries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
