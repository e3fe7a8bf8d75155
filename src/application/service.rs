use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::domain::{
    remaining_amount, Account, AccountId, Cents, Customer, CustomerId, FreezePolicy, Task, TaskId,
    Transaction,
};
use crate::storage::Repository;

use super::AppError;

/// Ledger and freeze-policy engine. This is the primary interface for any
/// client (CLI, API, ...): it validates collection and remittance requests
/// against account and task state, persists transactions, and keeps task
/// completion and account freeze flags in step with the transaction history.
pub struct LedgerService {
    repo: Repository,
    policy: FreezePolicy,
}

/// Result of a successful collection or remittance.
pub struct LedgerResult {
    pub transaction: Transaction,
    /// Freeze state of the collector right before this commit, so clients
    /// can report a transition rather than a standing state.
    pub collector_was_frozen: bool,
    /// Freeze state of the collector right after this commit.
    pub collector_frozen: bool,
}

/// Freeze status as reported to a collector.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct AccountStatus {
    pub is_frozen: bool,
}

/// Read-model view of a task for list and next-task endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct TaskSummary {
    pub id: TaskId,
    pub collector: AccountId,
    pub customer: CustomerId,
    pub amount_due_cents: Cents,
    pub remaining_cents: Cents,
    pub amount_due_at: DateTime<Utc>,
    pub is_collected: bool,
}

impl LedgerService {
    /// Create a new ledger service with the given repository and policy.
    pub fn new(repo: Repository, policy: FreezePolicy) -> Self {
        Self { repo, policy }
    }

    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str, policy: FreezePolicy) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::new(repo, policy))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str, policy: FreezePolicy) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo, policy))
    }

    // ========================
    // Ledger operations
    // ========================

    /// Record cash collected from a customer against a task. The task must
    /// be settled in full: the submitted amount has to match the remaining
    /// balance exactly. On success the task is marked collected and the
    /// collector's freeze status is re-evaluated, all in one atomic commit.
    pub async fn record_collection(
        &self,
        collector_id: AccountId,
        task_id: TaskId,
        amount_cents: Cents,
        timestamp: DateTime<Utc>,
    ) -> Result<LedgerResult, AppError> {
        let (task, collector) = self.ledger_context(collector_id, task_id).await?;

        if collector.is_frozen {
            debug!(collector = %collector.username, "collection rejected: account frozen");
            return Err(AppError::AccountFrozen(collector.username));
        }
        if amount_cents <= 0 {
            return Err(AppError::InvalidAmount(amount_cents));
        }

        let transactions = self.repo.list_transactions_for_task(task.id).await?;
        let remaining = remaining_amount(&task, &transactions);
        if remaining == 0 {
            return Err(AppError::AlreadyCollected(task.id.to_string()));
        }
        if amount_cents < remaining {
            return Err(AppError::AmountTooLow {
                submitted: amount_cents,
                remaining,
            });
        }
        if amount_cents > remaining {
            return Err(AppError::AmountTooHigh {
                submitted: amount_cents,
                remaining,
            });
        }

        let transaction = Transaction::collection(collector.id, task.id, amount_cents, timestamp);
        let frozen = self
            .repo
            .commit_collection(&transaction, &self.policy)
            .await?
            // Lost the race: another request settled the task first
            .ok_or_else(|| AppError::AlreadyCollected(task.id.to_string()))?;

        info!(
            collector = %collector.username,
            task = %task.id,
            amount_cents,
            frozen,
            "collection recorded"
        );

        Ok(LedgerResult {
            transaction,
            collector_was_frozen: collector.is_frozen,
            collector_frozen: frozen,
        })
    }

    /// Record cash handed up from a collector to their manager, tied to the
    /// task it was collected under. The amount is stored negated. Remittance
    /// is permitted while frozen (it is the unfreeze path), does not require
    /// a settled balance, and never touches `is_collected`.
    pub async fn record_remittance(
        &self,
        collector_id: AccountId,
        task_id: TaskId,
        amount_cents: Cents,
        timestamp: DateTime<Utc>,
    ) -> Result<LedgerResult, AppError> {
        let (task, collector) = self.ledger_context(collector_id, task_id).await?;

        if amount_cents <= 0 {
            return Err(AppError::InvalidAmount(amount_cents));
        }

        let transaction = Transaction::remittance(collector.id, task.id, amount_cents, timestamp);
        let frozen = self
            .repo
            .commit_remittance(&transaction, &self.policy)
            .await?;

        info!(
            collector = %collector.username,
            task = %task.id,
            amount_cents,
            frozen,
            "remittance recorded"
        );

        Ok(LedgerResult {
            transaction,
            collector_was_frozen: collector.is_frozen,
            collector_frozen: frozen,
        })
    }

    /// Shared preconditions of both ledger operations: the task must exist,
    /// the requester must not be a manager account, and the task must belong
    /// to the requesting collector. The manager check runs before the
    /// ownership check so a manager is always told off for the role, not for
    /// the task.
    async fn ledger_context(
        &self,
        collector_id: AccountId,
        task_id: TaskId,
    ) -> Result<(Task, Account), AppError> {
        let task = self
            .repo
            .get_task(task_id)
            .await?
            .ok_or_else(|| AppError::TaskNotFound(task_id.to_string()))?;

        let collector = self
            .repo
            .get_account(collector_id)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(collector_id.to_string()))?;

        if collector.is_manager {
            return Err(AppError::ManagerCannotCollect);
        }
        if task.collector != collector.id {
            return Err(AppError::TaskNotFound(task_id.to_string()));
        }

        Ok((task, collector))
    }

    /// Recompute an account's freeze flag from its trailing transaction
    /// window. Runs inside every ledger commit; exposed standalone so the
    /// flag can also be refreshed without writing (e.g. after the window
    /// has rolled past old transactions). Idempotent.
    pub async fn reevaluate_freeze(
        &self,
        account_id: AccountId,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let account = self
            .repo
            .get_account(account_id)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(account_id.to_string()))?;

        let windowed_sum = self
            .repo
            .sum_for_collector_since(account_id, self.policy.window_start(now))
            .await?;
        let frozen = self.policy.should_freeze(windowed_sum);
        self.repo.set_frozen(account_id, frozen).await?;

        if frozen != account.is_frozen {
            info!(account = %account.username, frozen, "freeze status changed");
        }

        Ok(frozen)
    }

    // ========================
    // Read operations
    // ========================

    /// Unpaid balance of a task: zero once collected.
    pub async fn remaining_amount(&self, task_id: TaskId) -> Result<Cents, AppError> {
        let task = self
            .repo
            .get_task(task_id)
            .await?
            .ok_or_else(|| AppError::TaskNotFound(task_id.to_string()))?;
        let transactions = self.repo.list_transactions_for_task(task.id).await?;
        Ok(remaining_amount(&task, &transactions))
    }

    /// Freeze status of an account.
    pub async fn account_status(&self, account_id: AccountId) -> Result<AccountStatus, AppError> {
        let account = self
            .repo
            .get_account(account_id)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(account_id.to_string()))?;
        Ok(AccountStatus {
            is_frozen: account.is_frozen,
        })
    }

    /// Tasks the collector has already settled.
    pub async fn list_collected_tasks(
        &self,
        collector_id: AccountId,
    ) -> Result<Vec<TaskSummary>, AppError> {
        let tasks = self.repo.list_collected_tasks(collector_id).await?;
        let mut summaries = Vec::with_capacity(tasks.len());
        for task in tasks {
            summaries.push(self.summarize(task).await?);
        }
        Ok(summaries)
    }

    /// The collector's next assignment: the uncollected task with the
    /// earliest due date, or None when everything is settled.
    pub async fn next_pending_task(
        &self,
        collector_id: AccountId,
    ) -> Result<Option<TaskSummary>, AppError> {
        match self.repo.next_pending_task(collector_id).await? {
            Some(task) => Ok(Some(self.summarize(task).await?)),
            None => Ok(None),
        }
    }

    async fn summarize(&self, task: Task) -> Result<TaskSummary, AppError> {
        let remaining = if task.is_collected {
            0
        } else {
            let transactions = self.repo.list_transactions_for_task(task.id).await?;
            remaining_amount(&task, &transactions)
        };
        Ok(TaskSummary {
            id: task.id,
            collector: task.collector,
            customer: task.customer,
            amount_due_cents: task.amount_due_cents,
            remaining_cents: remaining,
            amount_due_at: task.amount_due_at,
            is_collected: task.is_collected,
        })
    }

    // ========================
    // Provisioning operations
    // ========================

    /// Create a top-level manager account.
    pub async fn create_manager(&self, username: String) -> Result<Account, AppError> {
        if self.repo.get_account_by_username(&username).await?.is_some() {
            return Err(AppError::AccountAlreadyExists(username));
        }
        let account = Account::manager(username);
        self.repo.save_account(&account).await?;
        Ok(account)
    }

    /// Create a collector account reporting to an existing manager. The
    /// manager hierarchy is validated here, at write time: the referenced
    /// account must be a manager, and managers themselves are never managed.
    pub async fn create_collector(
        &self,
        username: String,
        manager_id: AccountId,
    ) -> Result<Account, AppError> {
        if self.repo.get_account_by_username(&username).await?.is_some() {
            return Err(AppError::AccountAlreadyExists(username));
        }
        let manager = self
            .repo
            .get_account(manager_id)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(manager_id.to_string()))?;
        if !manager.is_manager || manager.manager.is_some() {
            return Err(AppError::NotAManager(manager.username));
        }
        let account = Account::collector(username, manager.id);
        self.repo.save_account(&account).await?;
        Ok(account)
    }

    /// Register a new customer.
    pub async fn create_customer(
        &self,
        name: String,
        address: Option<String>,
        phone: Option<String>,
        email: Option<String>,
    ) -> Result<Customer, AppError> {
        let mut customer = Customer::new(name);
        if let Some(address) = address {
            customer = customer.with_address(address);
        }
        if let Some(phone) = phone {
            customer = customer.with_phone(phone);
        }
        if let Some(email) = email {
            customer = customer.with_email(email);
        }
        self.repo.save_customer(&customer).await?;
        Ok(customer)
    }

    /// A manager assigns a collection task to one of their collectors.
    pub async fn create_task(
        &self,
        manager_id: AccountId,
        collector_id: AccountId,
        customer_id: CustomerId,
        amount_due_cents: Cents,
        amount_due_at: DateTime<Utc>,
    ) -> Result<Task, AppError> {
        if amount_due_cents <= 0 {
            return Err(AppError::InvalidAmount(amount_due_cents));
        }
        let manager = self
            .repo
            .get_account(manager_id)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(manager_id.to_string()))?;
        if !manager.is_manager {
            return Err(AppError::NotAManager(manager.username));
        }
        let collector = self
            .repo
            .get_account(collector_id)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(collector_id.to_string()))?;
        if !collector.can_collect() {
            return Err(AppError::CollectorIsManager(collector.username));
        }
        if self.repo.get_customer(customer_id).await?.is_none() {
            return Err(AppError::CustomerNotFound(customer_id.to_string()));
        }

        let task = Task::new(
            manager.id,
            collector.id,
            customer_id,
            amount_due_cents,
            amount_due_at,
        );
        self.repo.save_task(&task).await?;
        Ok(task)
    }

    // ========================
    // Lookups for the outer surface
    // ========================

    /// Get an account by username.
    pub async fn get_account(&self, username: &str) -> Result<Account, AppError> {
        self.repo
            .get_account_by_username(username)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(username.to_string()))
    }

    /// List all accounts.
    pub async fn list_accounts(&self) -> Result<Vec<Account>, AppError> {
        Ok(self.repo.list_accounts().await?)
    }

    /// Get a customer by name.
    pub async fn get_customer(&self, name: &str) -> Result<Customer, AppError> {
        self.repo
            .get_customer_by_name(name)
            .await?
            .ok_or_else(|| AppError::CustomerNotFound(name.to_string()))
    }

    /// List all customers.
    pub async fn list_customers(&self) -> Result<Vec<Customer>, AppError> {
        Ok(self.repo.list_customers().await?)
    }
}
