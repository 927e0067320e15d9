//! `SeaORM` Entity for period_lock_events table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "period_lock_events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub period_year: i32,
    pub period_month: i32,
    pub from_state: String,
    pub to_state: String,
    pub actor: Uuid,
    pub occurred_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::financial_periods::Entity",
        from = "(Column::TenantId, Column::PeriodYear, Column::PeriodMonth)",
        to = "(super::financial_periods::Column::TenantId, super::financial_periods::Column::PeriodYear, super::financial_periods::Column::PeriodMonth)"
    )]
    FinancialPeriods,
}

impl Related<super::financial_periods::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FinancialPeriods.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
