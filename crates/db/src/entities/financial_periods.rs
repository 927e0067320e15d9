//! `SeaORM` Entity for financial_periods table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "financial_periods")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub tenant_id: Uuid,
    #[sea_orm(primary_key, auto_increment = false)]
    pub period_year: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub period_month: i32,
    pub is_locked: bool,
    pub locked_at: Option<DateTimeWithTimeZone>,
    pub locked_by: Option<Uuid>,
    pub version: i64,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::period_lock_events::Entity")]
    PeriodLockEvents,
}

impl Related<super::period_lock_events::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PeriodLockEvents.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
