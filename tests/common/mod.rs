// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use exactio::application::LedgerService;
use exactio::domain::{Account, Cents, Customer, FreezePolicy, Task};
use tempfile::TempDir;

/// Helper to create a test service with a temporary database and the given
/// freeze policy
pub async fn test_service(policy: FreezePolicy) -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = LedgerService::init(db_path.to_str().unwrap(), policy).await?;
    Ok((service, temp_dir))
}

/// A policy generous enough that no test transaction trips it
pub fn lenient_policy() -> FreezePolicy {
    FreezePolicy::new(2, 100_000_000)
}

/// Helper for backdated timestamps
pub fn days_ago(days: i64) -> DateTime<Utc> {
    Utc::now() - Duration::days(days)
}

/// Test fixture: one manager, one collector reporting to them, one customer
pub struct Fixture {
    pub manager: Account,
    pub collector: Account,
    pub customer: Customer,
}

impl Fixture {
    pub async fn provision(service: &LedgerService) -> Result<Fixture> {
        let manager = service.create_manager("testmanager".into()).await?;
        let collector = service
            .create_collector("testcollector".into(), manager.id)
            .await?;
        let customer = service
            .create_customer("testcustomer".into(), None, None, None)
            .await?;
        Ok(Fixture {
            manager,
            collector,
            customer,
        })
    }

    /// Assign a task due now to the fixture collector
    pub async fn task(&self, service: &LedgerService, amount_due_cents: Cents) -> Result<Task> {
        self.task_due(service, amount_due_cents, Utc::now()).await
    }

    /// Assign a task with an explicit due date to the fixture collector
    pub async fn task_due(
        &self,
        service: &LedgerService,
        amount_due_cents: Cents,
        amount_due_at: DateTime<Utc>,
    ) -> Result<Task> {
        let task = service
            .create_task(
                self.manager.id,
                self.collector.id,
                self.customer.id,
                amount_due_cents,
                amount_due_at,
            )
            .await?;
        Ok(task)
    }
}
