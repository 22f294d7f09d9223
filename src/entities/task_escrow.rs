use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

pub const TABLE_NAME: &str = "task_escrow";
pub const POSTING_TABLE_NAME: &str = "escrow_posting";

pub const THROW_ESCROW_NOT_FOUND: &str = "Task escrow not found";
pub const THROW_ESCROW_TOO_LOW: &str = "Not enough money in escrow";
pub const THROW_ESCROW_EXISTS: &str = "Task escrow already funded";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskEscrow {
    pub task_id: String,
    pub amount: i64,
    pub posting_count: u64,
    #[serde(default)]
    pub history: Vec<EscrowPosting>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r_created: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r_updated: Option<DateTime<Utc>>,
}

impl TaskEscrow {
    /// Inflows minus outflows over the recorded history.
    pub fn history_total(&self) -> i64 {
        self.history
            .iter()
            .map(|p| p.r#type.signed(p.amount))
            .sum()
    }
}

#[derive(Display, Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EscrowPostingType {
    StartTaskPayment,
    WorkerPayment,
    SubmittedWorkerCompensation,
    NotSubmittedWorkerCompensation,
    CustomerRefund,
}

impl EscrowPostingType {
    pub fn is_inflow(&self) -> bool {
        matches!(self, EscrowPostingType::StartTaskPayment)
    }

    pub fn signed(&self, amount: i64) -> i64 {
        if self.is_inflow() {
            amount
        } else {
            -amount
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowPosting {
    pub seq: u64,
    pub amount: i64,
    pub r#type: EscrowPostingType,
    pub user_id: Option<String>,
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for one escrow-side step of a transfer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EscrowPostingInput {
    pub task_id: String,
    pub amount: i64,
    pub r#type: EscrowPostingType,
    /// Payer for inflows, payee for outflows.
    pub user_id: Option<String>,
    pub reference: Option<String>,
}

impl EscrowPostingInput {
    pub fn new(task_id: &str, amount: i64, r#type: EscrowPostingType, user_id: &str) -> Self {
        Self {
            task_id: task_id.to_string(),
            amount,
            r#type,
            user_id: Some(user_id.to_string()),
            reference: None,
        }
    }
}
