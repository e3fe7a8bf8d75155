use thiserror::Error;

use crate::domain::Cents;

/// Typed failures surfaced to callers. Every validation failure aborts the
/// operation before any write; the outer surface maps these to messages or
/// status codes.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    #[error("Account already exists: {0}")]
    AccountAlreadyExists(String),

    #[error("Account is not a manager: {0}")]
    NotAManager(String),

    #[error("Task collector cannot be a manager account: {0}")]
    CollectorIsManager(String),

    #[error("A manager cannot collect or remit money")]
    ManagerCannotCollect,

    #[error("Account is frozen: {0}")]
    AccountFrozen(String),

    #[error("Amount must be strictly positive, got {0}")]
    InvalidAmount(Cents),

    #[error("Task is already collected: {0}")]
    AlreadyCollected(String),

    #[error("Amount is less than the remaining balance: submitted {submitted}, remaining {remaining}")]
    AmountTooLow { submitted: Cents, remaining: Cents },

    #[error("Amount is more than the remaining balance: submitted {submitted}, remaining {remaining}")]
    AmountTooHigh { submitted: Cents, remaining: Cents },

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}
