use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AccountId, Cents, TaskId};

pub type TransactionId = Uuid;

/// An immutable monetary event against a task. Positive amounts are
/// collections (cash received from the customer), negative amounts are
/// remittances (cash handed up to the manager). Zero is never valid.
/// Transactions are append-only; corrections are out of scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub collector: AccountId,
    pub task: TaskId,
    pub amount_cents: Cents,
    /// Operation clock: when this event happened, also the anchor the
    /// freeze window was evaluated against at commit time.
    pub timestamp: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// A collection event. `amount_cents` is the cash taken from the customer.
    pub fn collection(
        collector: AccountId,
        task: TaskId,
        amount_cents: Cents,
        timestamp: DateTime<Utc>,
    ) -> Self {
        assert!(amount_cents > 0, "Collection amount must be positive");
        Self::record(collector, task, amount_cents, timestamp)
    }

    /// A remittance event. `amount_cents` is the cash handed to the manager,
    /// stored negated so the collector's rolling sum decreases.
    pub fn remittance(
        collector: AccountId,
        task: TaskId,
        amount_cents: Cents,
        timestamp: DateTime<Utc>,
    ) -> Self {
        assert!(amount_cents > 0, "Remittance amount must be positive");
        Self::record(collector, task, -amount_cents, timestamp)
    }

    fn record(
        collector: AccountId,
        task: TaskId,
        amount_cents: Cents,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            collector,
            task,
            amount_cents,
            timestamp,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_collection(&self) -> bool {
        self.amount_cents > 0
    }

    pub fn is_remittance(&self) -> bool {
        self.amount_cents < 0
    }
}
