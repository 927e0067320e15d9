//! Fixed asset repository.

use async_trait::async_trait;
use fixedledger_core::depreciation::{AssetStatus, FixedAsset};
use fixedledger_core::store::{AssetStore, StoreError};
use fixedledger_shared::types::{AssetId, TenantId};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};

use crate::entities::fixed_assets;
use crate::mapping::{asset_from_model, asset_to_active_model, store_error};

/// Fixed asset repository backed by PostgreSQL.
#[derive(Debug, Clone)]
pub struct AssetRepository {
    db: DatabaseConnection,
}

impl AssetRepository {
    /// Creates a new asset repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AssetStore for AssetRepository {
    async fn load(&self, asset_id: AssetId) -> Result<Option<FixedAsset>, StoreError> {
        fixed_assets::Entity::find_by_id(asset_id.into_inner())
            .one(&self.db)
            .await
            .map_err(store_error)?
            .map(asset_from_model)
            .transpose()
    }

    async fn create(&self, asset: FixedAsset) -> Result<FixedAsset, StoreError> {
        let model = asset_to_active_model(&asset)?;
        fixed_assets::Entity::insert(model)
            .exec_without_returning(&self.db)
            .await
            .map_err(store_error)?;
        Ok(asset)
    }

    async fn list_active(&self, tenant_id: TenantId) -> Result<Vec<FixedAsset>, StoreError> {
        fixed_assets::Entity::find()
            .filter(fixed_assets::Column::TenantId.eq(tenant_id.into_inner()))
            .filter(fixed_assets::Column::Status.eq(AssetStatus::Active.as_str()))
            .order_by_asc(fixed_assets::Column::AssetNumber)
            .all(&self.db)
            .await
            .map_err(store_error)?
            .into_iter()
            .map(asset_from_model)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use rust_decimal_macros::dec;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use uuid::Uuid;

    fn model(tenant_id: Uuid, number: &str) -> fixed_assets::Model {
        let now = Utc::now().into();
        fixed_assets::Model {
            id: Uuid::now_v7(),
            tenant_id,
            asset_number: number.to_string(),
            name: "Compressor".to_string(),
            purchase_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            purchase_cost: dec!(12000),
            salvage_value: dec!(0),
            useful_life_months: 12,
            depreciation_method: "STRAIGHT_LINE".to_string(),
            accumulated_depreciation: dec!(3000),
            last_depreciation_date: NaiveDate::from_ymd_opt(2024, 4, 1),
            status: "ACTIVE".to_string(),
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_load_maps_model() {
        let stored = model(Uuid::now_v7(), "FA-1");
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![stored.clone()]])
            .into_connection();
        let repo = AssetRepository::new(db);

        let asset = repo
            .load(AssetId::from_uuid(stored.id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(asset.asset_number, "FA-1");
        assert_eq!(asset.accumulated_depreciation, dec!(3000));
        assert_eq!(asset.last_depreciation_date, NaiveDate::from_ymd_opt(2024, 4, 1));
    }

    #[tokio::test]
    async fn test_load_missing_is_none() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<fixed_assets::Model>::new()])
            .into_connection();
        let repo = AssetRepository::new(db);

        assert!(repo.load(AssetId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_active_maps_all_rows() {
        let tenant = Uuid::now_v7();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![model(tenant, "FA-1"), model(tenant, "FA-2")]])
            .into_connection();
        let repo = AssetRepository::new(db);

        let assets = repo.list_active(TenantId::from_uuid(tenant)).await.unwrap();
        let numbers: Vec<_> = assets.iter().map(|a| a.asset_number.as_str()).collect();
        assert_eq!(numbers, vec!["FA-1", "FA-2"]);
    }
}
