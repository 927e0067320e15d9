//! Financial period types.

use chrono::{DateTime, Utc};
use fixedledger_shared::types::{TenantId, UserId, YearMonth};
use serde::{Deserialize, Serialize};

/// Lock state of a financial period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PeriodLockState {
    /// Postings are accepted.
    Unlocked,
    /// No depreciation may be posted into the period.
    Locked,
}

impl PeriodLockState {
    /// Returns the state matching a stored `is_locked` flag.
    #[must_use]
    pub const fn from_locked(is_locked: bool) -> Self {
        if is_locked { Self::Locked } else { Self::Unlocked }
    }

    /// Returns true for `Locked`.
    #[must_use]
    pub const fn is_locked(self) -> bool {
        matches!(self, Self::Locked)
    }

    /// Returns the stored string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unlocked => "UNLOCKED",
            Self::Locked => "LOCKED",
        }
    }
}

impl std::fmt::Display for PeriodLockState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PeriodLockState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "UNLOCKED" => Ok(Self::Unlocked),
            "LOCKED" => Ok(Self::Locked),
            other => Err(format!("unknown period lock state: {other}")),
        }
    }
}

/// A tenant's financial period (one calendar month).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialPeriod {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// The calendar month.
    pub period: YearMonth,
    /// Current lock state.
    pub state: PeriodLockState,
    /// When the period was last locked.
    pub locked_at: Option<DateTime<Utc>>,
    /// Who last locked the period.
    pub locked_by: Option<UserId>,
    /// Bumped on every transition.
    pub version: i64,
}

impl FinancialPeriod {
    /// A period no one has referenced yet: unlocked, version 0.
    #[must_use]
    pub const fn unreferenced(tenant_id: TenantId, period: YearMonth) -> Self {
        Self {
            tenant_id,
            period,
            state: PeriodLockState::Unlocked,
            locked_at: None,
            locked_by: None,
            version: 0,
        }
    }

    /// Returns true if the period is locked.
    #[must_use]
    pub const fn is_locked(&self) -> bool {
        self.state.is_locked()
    }
}

/// Audit record of a lock state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodTransition {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// The calendar month.
    pub period: YearMonth,
    /// State before the change.
    pub from_state: PeriodLockState,
    /// State after the change.
    pub to_state: PeriodLockState,
    /// Who requested the change.
    pub actor: UserId,
    /// When the change committed.
    pub occurred_at: DateTime<Utc>,
}

/// A period's current state together with its audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodStatus {
    /// Current state.
    pub period: FinancialPeriod,
    /// Transitions, oldest first.
    pub history: Vec<PeriodTransition>,
}
