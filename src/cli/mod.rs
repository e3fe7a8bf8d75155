use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::application::LedgerService;
use crate::domain::{format_cents, parse_cents, FreezePolicy};

/// Exactio - Cash Collection Ledger
#[derive(Parser)]
#[command(name = "exactio")]
#[command(about = "A cash-collection ledger with a rolling freeze policy")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, default_value = "exactio.db")]
    pub database: String,

    /// Freeze window length in days
    #[arg(long, global = true, default_value = "2")]
    pub threshold_days: i64,

    /// Unremitted-cash threshold in USD (e.g. "5000.00")
    #[arg(long, global = true, default_value = "5000.00")]
    pub usd_threshold: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Account management commands
    #[command(subcommand)]
    Account(AccountCommands),

    /// Customer management commands
    #[command(subcommand)]
    Customer(CustomerCommands),

    /// Task management commands
    #[command(subcommand)]
    Task(TaskCommands),

    /// Record cash collected from a customer against a task
    Collect {
        /// Task ID
        task_id: String,

        /// Amount collected (must settle the task in full, e.g. "20000.00")
        amount: String,

        /// Collector username
        #[arg(long)]
        collector: String,

        /// Date of the collection (YYYY-MM-DD, defaults to now)
        #[arg(long)]
        date: Option<String>,
    },

    /// Record cash remitted from a collector to their manager
    Remit {
        /// Task ID the cash was collected under
        task_id: String,

        /// Amount remitted (e.g. "20000.00")
        amount: String,

        /// Collector username
        #[arg(long)]
        collector: String,

        /// Date of the remittance (YYYY-MM-DD, defaults to now)
        #[arg(long)]
        date: Option<String>,
    },

    /// Show an account's freeze status
    Status {
        /// Account username
        username: String,

        /// Re-evaluate the freeze window before reporting
        #[arg(long)]
        refresh: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Create a manager account
    Manager {
        /// Username (must be unique)
        username: String,
    },

    /// Create a collector account reporting to a manager
    Collector {
        /// Username (must be unique)
        username: String,

        /// Manager username
        #[arg(long)]
        manager: String,
    },

    /// List all accounts
    List,
}

#[derive(Subcommand)]
pub enum CustomerCommands {
    /// Register a new customer
    Add {
        /// Customer name
        name: String,

        /// Street address
        #[arg(long)]
        address: Option<String>,

        /// Phone number
        #[arg(long)]
        phone: Option<String>,

        /// Email address
        #[arg(long)]
        email: Option<String>,
    },

    /// List all customers
    List,
}

#[derive(Subcommand)]
pub enum TaskCommands {
    /// Assign a collection task to a collector
    Add {
        /// Amount due (e.g. "20000.00")
        amount: String,

        /// Manager username (task creator)
        #[arg(long)]
        manager: String,

        /// Collector username
        #[arg(long)]
        collector: String,

        /// Customer name
        #[arg(long)]
        customer: String,

        /// Due date (YYYY-MM-DD, defaults to now)
        #[arg(long)]
        due: Option<String>,
    },

    /// Show the collector's next pending task
    Next {
        /// Collector username
        collector: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the collector's settled tasks
    Collected {
        /// Collector username
        collector: String,
    },

    /// Show the remaining balance of a task
    Remaining {
        /// Task ID
        task_id: String,
    },
}

impl Cli {
    fn policy(&self) -> Result<FreezePolicy> {
        let usd_threshold_cents = parse_cents(&self.usd_threshold)
            .context("Invalid --usd-threshold format. Use '5000.00' or '5000'")?;
        Ok(FreezePolicy::new(self.threshold_days, usd_threshold_cents))
    }

    async fn connect(&self) -> Result<LedgerService> {
        Ok(LedgerService::connect(&self.database, self.policy()?).await?)
    }

    pub async fn run(self) -> Result<()> {
        match &self.command {
            Commands::Init => {
                LedgerService::init(&self.database, self.policy()?).await?;
                println!("Database initialized: {}", self.database);
            }

            Commands::Account(account_cmd) => {
                let service = self.connect().await?;
                run_account_command(&service, account_cmd).await?;
            }

            Commands::Customer(customer_cmd) => {
                let service = self.connect().await?;
                run_customer_command(&service, customer_cmd).await?;
            }

            Commands::Task(task_cmd) => {
                let service = self.connect().await?;
                run_task_command(&service, task_cmd).await?;
            }

            Commands::Collect {
                task_id,
                amount,
                collector,
                date,
            } => {
                let service = self.connect().await?;
                let task_id = parse_task_id(task_id)?;
                let amount_cents =
                    parse_cents(amount).context("Invalid amount format. Use '50.00' or '50'")?;
                let timestamp = parse_timestamp(date.as_deref())?;
                let account = service.get_account(collector).await?;

                let result = service
                    .record_collection(account.id, task_id, amount_cents, timestamp)
                    .await?;

                println!(
                    "Collected {} against task {} (transaction {})",
                    format_cents(result.transaction.amount_cents),
                    task_id,
                    result.transaction.id
                );
                if result.collector_frozen {
                    println!("Account {} is now frozen", collector);
                }
            }

            Commands::Remit {
                task_id,
                amount,
                collector,
                date,
            } => {
                let service = self.connect().await?;
                let task_id = parse_task_id(task_id)?;
                let amount_cents =
                    parse_cents(amount).context("Invalid amount format. Use '50.00' or '50'")?;
                let timestamp = parse_timestamp(date.as_deref())?;
                let account = service.get_account(collector).await?;

                let result = service
                    .record_remittance(account.id, task_id, amount_cents, timestamp)
                    .await?;

                println!(
                    "Remitted {} for task {} (transaction {})",
                    format_cents(-result.transaction.amount_cents),
                    task_id,
                    result.transaction.id
                );
                if result.collector_was_frozen && !result.collector_frozen {
                    println!("Account {} is unfrozen", collector);
                }
            }

            Commands::Status {
                username,
                refresh,
                json,
            } => {
                let service = self.connect().await?;
                let account = service.get_account(username).await?;
                if *refresh {
                    service.reevaluate_freeze(account.id, Utc::now()).await?;
                }
                let status = service.account_status(account.id).await?;

                if *json {
                    println!("{}", serde_json::to_string_pretty(&status)?);
                } else {
                    println!(
                        "{}: {}",
                        username,
                        if status.is_frozen { "FROZEN" } else { "active" }
                    );
                }
            }
        }

        Ok(())
    }
}

async fn run_account_command(service: &LedgerService, cmd: &AccountCommands) -> Result<()> {
    match cmd {
        AccountCommands::Manager { username } => {
            let account = service.create_manager(username.clone()).await?;
            println!("Created manager: {} ({})", account.username, account.id);
        }

        AccountCommands::Collector { username, manager } => {
            let manager_account = service.get_account(manager).await?;
            let account = service
                .create_collector(username.clone(), manager_account.id)
                .await?;
            println!(
                "Created collector: {} ({}), reporting to {}",
                account.username, account.id, manager
            );
        }

        AccountCommands::List => {
            let accounts = service.list_accounts().await?;
            if accounts.is_empty() {
                println!("No accounts found.");
            } else {
                println!("{:<20} {:<10} {:<8}", "USERNAME", "ROLE", "STATUS");
                println!("{}", "-".repeat(40));
                for account in accounts {
                    println!(
                        "{:<20} {:<10} {:<8}",
                        account.username,
                        if account.is_manager { "manager" } else { "collector" },
                        if account.is_frozen { "FROZEN" } else { "active" }
                    );
                }
            }
        }
    }
    Ok(())
}

async fn run_customer_command(service: &LedgerService, cmd: &CustomerCommands) -> Result<()> {
    match cmd {
        CustomerCommands::Add {
            name,
            address,
            phone,
            email,
        } => {
            let customer = service
                .create_customer(
                    name.clone(),
                    address.clone(),
                    phone.clone(),
                    email.clone(),
                )
                .await?;
            println!("Created customer: {} ({})", customer.name, customer.id);
        }

        CustomerCommands::List => {
            let customers = service.list_customers().await?;
            if customers.is_empty() {
                println!("No customers found.");
            } else {
                println!("{:<24} {:<16} {:<24}", "NAME", "PHONE", "EMAIL");
                println!("{}", "-".repeat(64));
                for customer in customers {
                    println!(
                        "{:<24} {:<16} {:<24}",
                        customer.name,
                        customer.phone.as_deref().unwrap_or("-"),
                        customer.email.as_deref().unwrap_or("-")
                    );
                }
            }
        }
    }
    Ok(())
}

async fn run_task_command(service: &LedgerService, cmd: &TaskCommands) -> Result<()> {
    match cmd {
        TaskCommands::Add {
            amount,
            manager,
            collector,
            customer,
            due,
        } => {
            let amount_due_cents =
                parse_cents(amount).context("Invalid amount format. Use '50.00' or '50'")?;
            let amount_due_at = parse_timestamp(due.as_deref())?;
            let manager_account = service.get_account(manager).await?;
            let collector_account = service.get_account(collector).await?;
            let customer_record = service.get_customer(customer).await?;

            let task = service
                .create_task(
                    manager_account.id,
                    collector_account.id,
                    customer_record.id,
                    amount_due_cents,
                    amount_due_at,
                )
                .await?;

            println!(
                "Created task {} for {}: {} due {}",
                task.id,
                collector,
                format_cents(task.amount_due_cents),
                task.amount_due_at.format("%Y-%m-%d")
            );
        }

        TaskCommands::Next { collector, json } => {
            let account = service.get_account(collector).await?;
            match service.next_pending_task(account.id).await? {
                Some(summary) if *json => {
                    println!("{}", serde_json::to_string_pretty(&summary)?);
                }
                Some(summary) => {
                    println!("Next task: {}", summary.id);
                    println!("  Remaining: {}", format_cents(summary.remaining_cents));
                    println!("  Due:       {}", summary.amount_due_at.format("%Y-%m-%d"));
                }
                None => println!("No pending tasks for {}.", collector),
            }
        }

        TaskCommands::Collected { collector } => {
            let account = service.get_account(collector).await?;
            let summaries = service.list_collected_tasks(account.id).await?;
            if summaries.is_empty() {
                println!("No collected tasks for {}.", collector);
            } else {
                println!("{:<38} {:<12} {:<12}", "TASK", "AMOUNT", "DUE");
                println!("{}", "-".repeat(62));
                for summary in summaries {
                    println!(
                        "{:<38} {:<12} {:<12}",
                        summary.id,
                        format_cents(summary.amount_due_cents),
                        summary.amount_due_at.format("%Y-%m-%d")
                    );
                }
            }
        }

        TaskCommands::Remaining { task_id } => {
            let task_id = parse_task_id(task_id)?;
            let remaining = service.remaining_amount(task_id).await?;
            println!("Remaining: {}", format_cents(remaining));
        }
    }
    Ok(())
}

fn parse_task_id(id: &str) -> Result<Uuid> {
    Uuid::parse_str(id).context("Invalid task ID format (expected UUID)")
}

fn parse_timestamp(date: Option<&str>) -> Result<DateTime<Utc>> {
    match date {
        Some(date_str) => {
            let parsed = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
                .with_context(|| format!("Invalid date format '{}'. Use YYYY-MM-DD", date_str))?;
            Ok(parsed
                .and_hms_opt(0, 0, 0)
                .context("Invalid time of day")?
                .and_utc())
        }
        None => Ok(Utc::now()),
    }
}
