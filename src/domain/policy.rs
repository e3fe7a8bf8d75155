use chrono::{DateTime, Duration, Utc};

use super::{Cents, Task, Transaction};

/// Thresholds governing automatic account freezing. Both values come from
/// external configuration and are injected into the ledger service.
#[derive(Debug, Clone, Copy)]
pub struct FreezePolicy {
    /// Length of the trailing window, in days.
    pub threshold_days: i64,
    /// Net unremitted cash a collector may hold within the window.
    pub usd_threshold_cents: Cents,
}

impl FreezePolicy {
    pub fn new(threshold_days: i64, usd_threshold_cents: Cents) -> Self {
        Self {
            threshold_days,
            usd_threshold_cents,
        }
    }

    /// Start of the trailing window anchored at `now`.
    pub fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::days(self.threshold_days)
    }

    /// Freeze iff the windowed sum strictly exceeds the threshold. Equal to
    /// the threshold is still allowed.
    pub fn should_freeze(&self, windowed_sum: Cents) -> bool {
        windowed_sum > self.usd_threshold_cents
    }
}

/// Unpaid balance of a task: zero once collected, otherwise the amount due
/// minus every transaction recorded against the task. Tolerates an empty
/// transaction list.
pub fn remaining_amount(task: &Task, transactions: &[Transaction]) -> Cents {
    if task.is_collected {
        return 0;
    }
    let recorded: Cents = transactions
        .iter()
        .filter(|t| t.task == task.id)
        .map(|t| t.amount_cents)
        .sum();
    task.amount_due_cents - recorded
}
