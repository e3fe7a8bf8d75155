use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AccountId, Cents, CustomerId};

pub type TaskId = Uuid;

/// A collection assignment: a manager sends a collector to settle a
/// customer's bill. Tasks are full-settlement-only; `is_collected` flips to
/// true exactly once, when a collection transaction clears the whole amount,
/// and is never reverted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub manager: AccountId,
    pub collector: AccountId,
    pub customer: CustomerId,
    pub amount_due_cents: Cents,
    /// When the customer's bill falls due; drives next-task ordering.
    pub amount_due_at: DateTime<Utc>,
    pub is_collected: bool,
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn new(
        manager: AccountId,
        collector: AccountId,
        customer: CustomerId,
        amount_due_cents: Cents,
        amount_due_at: DateTime<Utc>,
    ) -> Self {
        assert!(amount_due_cents > 0, "Task amount due must be positive");
        Self {
            id: Uuid::new_v4(),
            manager,
            collector,
            customer,
            amount_due_cents,
            amount_due_at,
            is_collected: false,
            created_at: Utc::now(),
        }
    }
}
