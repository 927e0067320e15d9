//! Fixed asset depreciation schema.
//!
//! Creates fixed assets, financial periods with their lock audit log, the
//! journal, depreciation entries, and the triggers that guard posting.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ASSETS
        // ============================================================
        db.execute_unprepared(FIXED_ASSETS_SQL).await?;

        // ============================================================
        // PART 2: FINANCIAL PERIODS
        // ============================================================
        db.execute_unprepared(FINANCIAL_PERIODS_SQL).await?;
        db.execute_unprepared(PERIOD_LOCK_EVENTS_SQL).await?;

        // ============================================================
        // PART 3: LEDGER & POSTINGS
        // ============================================================
        db.execute_unprepared(JOURNAL_ENTRIES_SQL).await?;
        db.execute_unprepared(DEPRECIATION_ENTRIES_SQL).await?;

        // ============================================================
        // PART 4: TRIGGERS & FUNCTIONS
        // ============================================================
        db.execute_unprepared(TRIGGERS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const FIXED_ASSETS_SQL: &str = r"
CREATE TABLE fixed_assets (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL,
    asset_number VARCHAR(50) NOT NULL,
    name VARCHAR(255) NOT NULL,
    purchase_date DATE NOT NULL,
    purchase_cost NUMERIC(19, 4) NOT NULL,
    salvage_value NUMERIC(19, 4) NOT NULL DEFAULT 0,
    useful_life_months INTEGER NOT NULL,
    depreciation_method VARCHAR(32) NOT NULL,
    accumulated_depreciation NUMERIC(19, 4) NOT NULL DEFAULT 0,
    last_depreciation_date DATE,
    status VARCHAR(32) NOT NULL DEFAULT 'ACTIVE',
    version BIGINT NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT uq_fixed_assets_number UNIQUE (tenant_id, asset_number),
    CONSTRAINT chk_fixed_assets_cost CHECK (purchase_cost >= 0),
    CONSTRAINT chk_fixed_assets_salvage CHECK (salvage_value >= 0 AND salvage_value <= purchase_cost),
    CONSTRAINT chk_fixed_assets_life CHECK (useful_life_months BETWEEN 1 AND 1200),
    CONSTRAINT chk_fixed_assets_accumulated CHECK (
        accumulated_depreciation >= 0
        AND accumulated_depreciation <= purchase_cost - salvage_value
    ),
    CONSTRAINT chk_fixed_assets_method CHECK (depreciation_method IN (
        'STRAIGHT_LINE', 'DECLINING_BALANCE', 'DOUBLE_DECLINING', 'SUM_OF_YEARS_DIGITS'
    )),
    CONSTRAINT chk_fixed_assets_status CHECK (status IN (
        'ACTIVE', 'FULLY_DEPRECIATED', 'DISPOSED'
    ))
);

CREATE INDEX idx_fixed_assets_tenant_status ON fixed_assets(tenant_id, status, asset_number);
";

const FINANCIAL_PERIODS_SQL: &str = r"
CREATE TABLE financial_periods (
    tenant_id UUID NOT NULL,
    period_year INTEGER NOT NULL,
    period_month INTEGER NOT NULL,
    is_locked BOOLEAN NOT NULL DEFAULT false,
    locked_at TIMESTAMPTZ,
    locked_by UUID,
    version BIGINT NOT NULL DEFAULT 0,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    PRIMARY KEY (tenant_id, period_year, period_month),
    CONSTRAINT chk_financial_periods_month CHECK (period_month BETWEEN 1 AND 12)
);
";

const PERIOD_LOCK_EVENTS_SQL: &str = r"
CREATE TABLE period_lock_events (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL,
    period_year INTEGER NOT NULL,
    period_month INTEGER NOT NULL,
    from_state VARCHAR(16) NOT NULL,
    to_state VARCHAR(16) NOT NULL,
    actor UUID NOT NULL,
    occurred_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    FOREIGN KEY (tenant_id, period_year, period_month)
        REFERENCES financial_periods(tenant_id, period_year, period_month)
);

CREATE INDEX idx_period_lock_events_period
    ON period_lock_events(tenant_id, period_year, period_month, occurred_at);
";

const JOURNAL_ENTRIES_SQL: &str = r"
CREATE TABLE journal_entries (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL,
    entry_date DATE NOT NULL,
    amount NUMERIC(19, 4) NOT NULL,
    memo TEXT NOT NULL,
    source_type VARCHAR(32) NOT NULL,
    source_id UUID NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT chk_journal_entries_amount CHECK (amount > 0),
    CONSTRAINT uq_journal_entries_source UNIQUE (source_type, source_id)
);

CREATE INDEX idx_journal_entries_tenant_date ON journal_entries(tenant_id, entry_date);
";

// The journal FK is deferred: the entry row is written before the journal
// row inside the same transaction.
const DEPRECIATION_ENTRIES_SQL: &str = r"
CREATE TABLE depreciation_entries (
    id UUID PRIMARY KEY,
    asset_id UUID NOT NULL REFERENCES fixed_assets(id),
    tenant_id UUID NOT NULL,
    period_year INTEGER NOT NULL,
    period_month INTEGER NOT NULL,
    amount NUMERIC(19, 4) NOT NULL,
    journal_entry_id UUID NOT NULL
        REFERENCES journal_entries(id) DEFERRABLE INITIALLY DEFERRED,
    posted_by UUID NOT NULL,
    posted_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT uq_depreciation_entries_period UNIQUE (asset_id, period_year, period_month),
    CONSTRAINT chk_depreciation_entries_amount CHECK (amount > 0),
    CONSTRAINT chk_depreciation_entries_month CHECK (period_month BETWEEN 1 AND 12)
);
";

const TRIGGERS_SQL: &str = r"
-- ============================================================
-- FUNCTION: reject_locked_period_posting
-- Rejects entries attributed to a locked month, whatever path
-- wrote them. The share lock makes a concurrent lock wait for
-- this transaction to finish.
-- ============================================================
CREATE OR REPLACE FUNCTION reject_locked_period_posting()
RETURNS TRIGGER AS $$
DECLARE
    period_locked BOOLEAN;
BEGIN
    SELECT fp.is_locked INTO period_locked
    FROM financial_periods fp
    WHERE fp.tenant_id = NEW.tenant_id
      AND fp.period_year = NEW.period_year
      AND fp.period_month = NEW.period_month
    FOR SHARE;

    IF period_locked THEN
        RAISE EXCEPTION 'FINANCIAL_PERIOD_LOCKED: %-%', NEW.period_year, NEW.period_month;
    END IF;

    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_reject_locked_period_posting
BEFORE INSERT ON depreciation_entries
FOR EACH ROW
EXECUTE FUNCTION reject_locked_period_posting();

-- ============================================================
-- FUNCTION: prevent_depreciation_entry_modification
-- Entries are immutable once written.
-- ============================================================
CREATE OR REPLACE FUNCTION prevent_depreciation_entry_modification()
RETURNS TRIGGER AS $$
BEGIN
    RAISE EXCEPTION 'Depreciation entries cannot be modified or deleted';
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_prevent_depreciation_entry_modification
BEFORE UPDATE OR DELETE ON depreciation_entries
FOR EACH ROW
EXECUTE FUNCTION prevent_depreciation_entry_modification();
";

const DROP_ALL_SQL: &str = r"
-- ============================================================
-- DROP ALL: Rollback migration
-- Order matters due to foreign key constraints
-- ============================================================

-- Drop triggers
DROP TRIGGER IF EXISTS trg_prevent_depreciation_entry_modification ON depreciation_entries;
DROP TRIGGER IF EXISTS trg_reject_locked_period_posting ON depreciation_entries;

-- Drop functions
DROP FUNCTION IF EXISTS prevent_depreciation_entry_modification();
DROP FUNCTION IF EXISTS reject_locked_period_posting();

-- Drop tables (reverse order of creation)
DROP TABLE IF EXISTS depreciation_entries CASCADE;
DROP TABLE IF EXISTS journal_entries CASCADE;
DROP TABLE IF EXISTS period_lock_events CASCADE;
DROP TABLE IF EXISTS financial_periods CASCADE;
DROP TABLE IF EXISTS fixed_assets CASCADE;
";
