use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type AccountId = Uuid;

/// A manager or a field collector. Managers assign tasks and receive
/// remittances; collectors gather cash from customers. The freeze flag is
/// owned by the ledger service and recomputed on every transaction write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub username: String,
    pub is_manager: bool,
    /// The collector's manager. Always None for manager accounts.
    pub manager: Option<AccountId>,
    pub is_frozen: bool,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Create a top-level manager account. Managers are never managed.
    pub fn manager(username: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            is_manager: true,
            manager: None,
            is_frozen: false,
            created_at: Utc::now(),
        }
    }

    /// Create a collector account reporting to the given manager.
    pub fn collector(username: impl Into<String>, manager: AccountId) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            is_manager: false,
            manager: Some(manager),
            is_frozen: false,
            created_at: Utc::now(),
        }
    }

    /// Only non-manager accounts may move cash.
    pub fn can_collect(&self) -> bool {
        !self.is_manager
    }
}
