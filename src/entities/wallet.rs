use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

pub const TABLE_NAME: &str = "wallet";
pub const POSTING_TABLE_NAME: &str = "wallet_posting";

pub const THROW_WALLET_NOT_FOUND: &str = "Wallet not found";
pub const THROW_BALANCE_TOO_LOW: &str = "Not enough balance";
pub const THROW_DUPLICATE_REFERENCE: &str = "Duplicate posting reference";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub user_id: String,
    pub balance: i64,
    pub posting_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r_created: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r_updated: Option<DateTime<Utc>>,
}

/// Posting tags on the wallet side of the ledger.
///
/// `StartTaskPayment` here is the customer's debit when a task is funded; the
/// matching escrow inflow uses `EscrowPostingType::StartTaskPayment`.
#[derive(Display, Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WalletPostingType {
    TopUp,
    StartTaskPayment,
    Income,
    Refund,
}

impl WalletPostingType {
    pub fn is_credit(&self) -> bool {
        match self {
            WalletPostingType::TopUp | WalletPostingType::Income | WalletPostingType::Refund => {
                true
            }
            WalletPostingType::StartTaskPayment => false,
        }
    }

    /// Signed effect of a posting of `amount` on the balance.
    pub fn signed(&self, amount: i64) -> i64 {
        if self.is_credit() {
            amount
        } else {
            -amount
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletPosting {
    pub seq: u64,
    pub amount: i64,
    pub r#type: WalletPostingType,
    pub task_id: Option<String>,
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WalletHistory {
    pub history: Vec<WalletPosting>,
    pub count: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingTotal {
    pub r#type: WalletPostingType,
    pub total: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WalletSummary {
    pub user_id: String,
    pub balance: i64,
    pub totals: Vec<PostingTotal>,
}

/// Input for one wallet-side step of a transfer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WalletPostingInput {
    pub user_id: String,
    pub amount: i64,
    pub r#type: WalletPostingType,
    pub task_id: Option<String>,
    pub reference: Option<String>,
    /// Fail the whole group if a posting of the same type already carries `reference`.
    pub unique_reference: bool,
}

impl WalletPostingInput {
    pub fn new(user_id: &str, amount: i64, r#type: WalletPostingType) -> Self {
        Self {
            user_id: user_id.to_string(),
            amount,
            r#type,
            task_id: None,
            reference: None,
            unique_reference: false,
        }
    }

    pub fn for_task(mut self, task_id: &str) -> Self {
        self.task_id = Some(task_id.to_string());
        self
    }

    pub fn with_unique_reference(mut self, reference: &str) -> Self {
        self.reference = Some(reference.to_string());
        self.unique_reference = true;
        self
    }
}
