use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::{
    Account, AccountId, Cents, Customer, CustomerId, FreezePolicy, Task, TaskId, Transaction,
};

use super::MIGRATION_001_INITIAL;

/// Repository for persisting and querying accounts, customers, tasks and
/// transactions. Ledger writes commit the transaction row, the task flag and
/// the account freeze flag as a single SQLite transaction.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given path.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    // ========================
    // Account operations
    // ========================

    /// Save a new account to the database.
    pub async fn save_account(&self, account: &Account) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO accounts (id, username, is_manager, manager_id, is_frozen, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(account.id.to_string())
        .bind(&account.username)
        .bind(account.is_manager)
        .bind(account.manager.map(|id| id.to_string()))
        .bind(account.is_frozen)
        .bind(account.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save account")?;
        Ok(())
    }

    /// Get an account by ID.
    pub async fn get_account(&self, id: AccountId) -> Result<Option<Account>> {
        let row = sqlx::query(
            r#"
            SELECT id, username, is_manager, manager_id, is_frozen, created_at
            FROM accounts
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch account")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_account(&row)?)),
            None => Ok(None),
        }
    }

    /// Get an account by username.
    pub async fn get_account_by_username(&self, username: &str) -> Result<Option<Account>> {
        let row = sqlx::query(
            r#"
            SELECT id, username, is_manager, manager_id, is_frozen, created_at
            FROM accounts
            WHERE username = ?
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch account by username")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_account(&row)?)),
            None => Ok(None),
        }
    }

    /// List all accounts, managers first.
    pub async fn list_accounts(&self) -> Result<Vec<Account>> {
        let rows = sqlx::query(
            r#"
            SELECT id, username, is_manager, manager_id, is_frozen, created_at
            FROM accounts
            ORDER BY is_manager DESC, username
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list accounts")?;

        rows.iter().map(Self::row_to_account).collect()
    }

    /// Overwrite an account's freeze flag.
    pub async fn set_frozen(&self, id: AccountId, frozen: bool) -> Result<()> {
        sqlx::query("UPDATE accounts SET is_frozen = ? WHERE id = ?")
            .bind(frozen)
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to update freeze flag")?;
        Ok(())
    }

    fn row_to_account(row: &sqlx::sqlite::SqliteRow) -> Result<Account> {
        let id_str: String = row.get("id");
        let manager_str: Option<String> = row.get("manager_id");
        let created_at_str: String = row.get("created_at");

        Ok(Account {
            id: Uuid::parse_str(&id_str).context("Invalid account ID")?,
            username: row.get("username"),
            is_manager: row.get::<i32, _>("is_manager") != 0,
            manager: manager_str
                .map(|s| Uuid::parse_str(&s))
                .transpose()
                .context("Invalid manager ID")?,
            is_frozen: row.get::<i32, _>("is_frozen") != 0,
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .context("Invalid created_at timestamp")?
                .with_timezone(&Utc),
        })
    }

    // ========================
    // Customer operations
    // ========================

    /// Save a new customer to the database.
    pub async fn save_customer(&self, customer: &Customer) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO customers (id, name, address, phone, email, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(customer.id.to_string())
        .bind(&customer.name)
        .bind(&customer.address)
        .bind(&customer.phone)
        .bind(&customer.email)
        .bind(customer.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save customer")?;
        Ok(())
    }

    /// Get a customer by ID.
    pub async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, address, phone, email, created_at
            FROM customers
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch customer")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_customer(&row)?)),
            None => Ok(None),
        }
    }

    /// Get a customer by name.
    pub async fn get_customer_by_name(&self, name: &str) -> Result<Option<Customer>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, address, phone, email, created_at
            FROM customers
            WHERE name = ?
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch customer by name")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_customer(&row)?)),
            None => Ok(None),
        }
    }

    /// List all customers.
    pub async fn list_customers(&self) -> Result<Vec<Customer>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, address, phone, email, created_at
            FROM customers
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list customers")?;

        rows.iter().map(Self::row_to_customer).collect()
    }

    fn row_to_customer(row: &sqlx::sqlite::SqliteRow) -> Result<Customer> {
        let id_str: String = row.get("id");
        let created_at_str: String = row.get("created_at");

        Ok(Customer {
            id: Uuid::parse_str(&id_str).context("Invalid customer ID")?,
            name: row.get("name"),
            address: row.get("address"),
            phone: row.get("phone"),
            email: row.get("email"),
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .context("Invalid created_at timestamp")?
                .with_timezone(&Utc),
        })
    }

    // ========================
    // Task operations
    // ========================

    /// Save a new task to the database.
    pub async fn save_task(&self, task: &Task) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO tasks (id, manager_id, collector_id, customer_id, amount_due_cents, amount_due_at, is_collected, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(task.id.to_string())
        .bind(task.manager.to_string())
        .bind(task.collector.to_string())
        .bind(task.customer.to_string())
        .bind(task.amount_due_cents)
        .bind(task.amount_due_at.to_rfc3339())
        .bind(task.is_collected)
        .bind(task.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save task")?;
        Ok(())
    }

    /// Get a task by ID.
    pub async fn get_task(&self, id: TaskId) -> Result<Option<Task>> {
        let row = sqlx::query(
            r#"
            SELECT id, manager_id, collector_id, customer_id, amount_due_cents, amount_due_at, is_collected, created_at
            FROM tasks
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch task")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_task(&row)?)),
            None => Ok(None),
        }
    }

    /// List a collector's settled tasks.
    pub async fn list_collected_tasks(&self, collector_id: AccountId) -> Result<Vec<Task>> {
        let rows = sqlx::query(
            r#"
            SELECT id, manager_id, collector_id, customer_id, amount_due_cents, amount_due_at, is_collected, created_at
            FROM tasks
            WHERE collector_id = ? AND is_collected = 1
            ORDER BY amount_due_at
            "#,
        )
        .bind(collector_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list collected tasks")?;

        rows.iter().map(Self::row_to_task).collect()
    }

    /// The collector's uncollected task with the earliest due date.
    pub async fn next_pending_task(&self, collector_id: AccountId) -> Result<Option<Task>> {
        let row = sqlx::query(
            r#"
            SELECT id, manager_id, collector_id, customer_id, amount_due_cents, amount_due_at, is_collected, created_at
            FROM tasks
            WHERE collector_id = ? AND is_collected = 0
            ORDER BY amount_due_at
            LIMIT 1
            "#,
        )
        .bind(collector_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch next pending task")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_task(&row)?)),
            None => Ok(None),
        }
    }

    fn row_to_task(row: &sqlx::sqlite::SqliteRow) -> Result<Task> {
        let id_str: String = row.get("id");
        let manager_str: String = row.get("manager_id");
        let collector_str: String = row.get("collector_id");
        let customer_str: String = row.get("customer_id");
        let amount_due_at_str: String = row.get("amount_due_at");
        let created_at_str: String = row.get("created_at");

        Ok(Task {
            id: Uuid::parse_str(&id_str).context("Invalid task ID")?,
            manager: Uuid::parse_str(&manager_str).context("Invalid manager ID")?,
            collector: Uuid::parse_str(&collector_str).context("Invalid collector ID")?,
            customer: Uuid::parse_str(&customer_str).context("Invalid customer ID")?,
            amount_due_cents: row.get("amount_due_cents"),
            amount_due_at: DateTime::parse_from_rfc3339(&amount_due_at_str)
                .context("Invalid amount_due_at timestamp")?
                .with_timezone(&Utc),
            is_collected: row.get::<i32, _>("is_collected") != 0,
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .context("Invalid created_at timestamp")?
                .with_timezone(&Utc),
        })
    }

    // ========================
    // Transaction operations
    // ========================

    /// List all transactions recorded against a task, oldest first.
    pub async fn list_transactions_for_task(&self, task_id: TaskId) -> Result<Vec<Transaction>> {
        let rows = sqlx::query(
            r#"
            SELECT id, collector_id, task_id, amount_cents, timestamp, created_at, updated_at
            FROM transactions
            WHERE task_id = ?
            ORDER BY created_at
            "#,
        )
        .bind(task_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list transactions for task")?;

        rows.iter().map(Self::row_to_transaction).collect()
    }

    /// Net transaction sum for a collector since the given instant, using
    /// SQL aggregation. Used by the standalone freeze re-evaluation.
    pub async fn sum_for_collector_since(
        &self,
        collector_id: AccountId,
        since: DateTime<Utc>,
    ) -> Result<Cents> {
        let row = sqlx::query(
            r#"
            SELECT COALESCE(SUM(amount_cents), 0) as total
            FROM transactions
            WHERE collector_id = ? AND timestamp >= ?
            "#,
        )
        .bind(collector_id.to_string())
        .bind(since.to_rfc3339())
        .fetch_one(&self.pool)
        .await
        .context("Failed to sum collector transactions")?;

        Ok(row.get("total"))
    }

    /// Commit a collection: flip the task's collected flag, insert the
    /// transaction and re-evaluate the collector's freeze flag, all in one
    /// database transaction. Returns None when the task was already
    /// collected (another writer got there first); nothing is persisted in
    /// that case. Otherwise returns the collector's new freeze state.
    pub async fn commit_collection(
        &self,
        transaction: &Transaction,
        policy: &FreezePolicy,
    ) -> Result<Option<bool>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin collection commit")?;

        let updated = sqlx::query("UPDATE tasks SET is_collected = 1 WHERE id = ? AND is_collected = 0")
            .bind(transaction.task.to_string())
            .execute(&mut *tx)
            .await
            .context("Failed to mark task collected")?;

        if updated.rows_affected() == 0 {
            tx.rollback()
                .await
                .context("Failed to roll back collection commit")?;
            return Ok(None);
        }

        Self::insert_transaction(&mut tx, transaction).await?;
        let frozen = Self::apply_freeze(&mut tx, transaction, policy).await?;

        tx.commit().await.context("Failed to commit collection")?;
        Ok(Some(frozen))
    }

    /// Commit a remittance: insert the transaction and re-evaluate the
    /// collector's freeze flag in one database transaction. Returns the
    /// collector's new freeze state.
    pub async fn commit_remittance(
        &self,
        transaction: &Transaction,
        policy: &FreezePolicy,
    ) -> Result<bool> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin remittance commit")?;

        Self::insert_transaction(&mut tx, transaction).await?;
        let frozen = Self::apply_freeze(&mut tx, transaction, policy).await?;

        tx.commit().await.context("Failed to commit remittance")?;
        Ok(frozen)
    }

    async fn insert_transaction(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        transaction: &Transaction,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO transactions (id, collector_id, task_id, amount_cents, timestamp, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(transaction.id.to_string())
        .bind(transaction.collector.to_string())
        .bind(transaction.task.to_string())
        .bind(transaction.amount_cents)
        .bind(transaction.timestamp.to_rfc3339())
        .bind(transaction.created_at.to_rfc3339())
        .bind(transaction.updated_at.to_rfc3339())
        .execute(&mut **tx)
        .await
        .context("Failed to insert transaction")?;
        Ok(())
    }

    /// Recompute the collector's freeze flag from the trailing window,
    /// anchored at the transaction being committed.
    async fn apply_freeze(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        transaction: &Transaction,
        policy: &FreezePolicy,
    ) -> Result<bool> {
        let window_start = policy.window_start(transaction.timestamp);

        let row = sqlx::query(
            r#"
            SELECT COALESCE(SUM(amount_cents), 0) as total
            FROM transactions
            WHERE collector_id = ? AND timestamp >= ?
            "#,
        )
        .bind(transaction.collector.to_string())
        .bind(window_start.to_rfc3339())
        .fetch_one(&mut **tx)
        .await
        .context("Failed to sum freeze window")?;

        let windowed_sum: Cents = row.get("total");
        let frozen = policy.should_freeze(windowed_sum);

        sqlx::query("UPDATE accounts SET is_frozen = ? WHERE id = ?")
            .bind(frozen)
            .bind(transaction.collector.to_string())
            .execute(&mut **tx)
            .await
            .context("Failed to update freeze flag")?;

        Ok(frozen)
    }

    fn row_to_transaction(row: &sqlx::sqlite::SqliteRow) -> Result<Transaction> {
        let id_str: String = row.get("id");
        let collector_str: String = row.get("collector_id");
        let task_str: String = row.get("task_id");
        let timestamp_str: String = row.get("timestamp");
        let created_at_str: String = row.get("created_at");
        let updated_at_str: String = row.get("updated_at");

        Ok(Transaction {
            id: Uuid::parse_str(&id_str).context("Invalid transaction ID")?,
            collector: Uuid::parse_str(&collector_str).context("Invalid collector ID")?,
            task: Uuid::parse_str(&task_str).context("Invalid task ID")?,
            amount_cents: row.get("amount_cents"),
            timestamp: DateTime::parse_from_rfc3339(&timestamp_str)
                .context("Invalid timestamp")?
                .with_timezone(&Utc),
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .context("Invalid created_at")?
                .with_timezone(&Utc),
            updated_at: DateTime::parse_from_rfc3339(&updated_at_str)
                .context("Invalid updated_at")?
                .with_timezone(&Utc),
        })
    }
}
