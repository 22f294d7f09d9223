//! Runs a group of ledger postings as one all-or-nothing transaction.
//!
//! Every step is appended to a single `BEGIN .. COMMIT` query. Balance checks
//! happen inside that query, so a group either commits completely or leaves
//! no trace. Conflicting concurrent commits are replayed with a short jittered
//! backoff.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::database::client::Db;
use crate::database::surrdb_utils::{is_retryable_message, parse_thrown_step};
use crate::entities::task_escrow::{
    EscrowPostingInput, THROW_ESCROW_EXISTS, THROW_ESCROW_NOT_FOUND, THROW_ESCROW_TOO_LOW,
};
use crate::entities::wallet::{
    WalletPostingInput, THROW_BALANCE_TOO_LOW, THROW_DUPLICATE_REFERENCE, THROW_WALLET_NOT_FOUND,
};
use crate::interfaces::repositories::task_escrow_ifce::TaskEscrowRepositoryInterface;
use crate::interfaces::repositories::wallet_ifce::WalletRepositoryInterface;
use crate::middleware::error::{AppError, AppResult, FundsAccount};

const THROWN_MARKERS: [&str; 6] = [
    THROW_WALLET_NOT_FOUND,
    THROW_BALANCE_TOO_LOW,
    THROW_DUPLICATE_REFERENCE,
    THROW_ESCROW_NOT_FOUND,
    THROW_ESCROW_TOO_LOW,
    THROW_ESCROW_EXISTS,
];

const BACKOFF_MIN_MS: u64 = 5;
const BACKOFF_MAX_MS: u64 = 25;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LedgerStep {
    DebitWallet(WalletPostingInput),
    CreditWallet(WalletPostingInput),
    DebitEscrow(EscrowPostingInput),
    CreditEscrow(EscrowPostingInput),
}

impl LedgerStep {
    /// User id for wallet steps, task id for escrow steps.
    pub fn owner_id(&self) -> &str {
        match self {
            LedgerStep::DebitWallet(input) | LedgerStep::CreditWallet(input) => &input.user_id,
            LedgerStep::DebitEscrow(input) | LedgerStep::CreditEscrow(input) => &input.task_id,
        }
    }

    pub fn amount(&self) -> i64 {
        match self {
            LedgerStep::DebitWallet(input) | LedgerStep::CreditWallet(input) => input.amount,
            LedgerStep::DebitEscrow(input) | LedgerStep::CreditEscrow(input) => input.amount,
        }
    }

    /// Signed effect on the total amount of money held by the ledger's accounts.
    fn net(&self) -> i64 {
        match self {
            LedgerStep::CreditWallet(_) | LedgerStep::CreditEscrow(_) => self.amount(),
            LedgerStep::DebitWallet(_) | LedgerStep::DebitEscrow(_) => -self.amount(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct TransferReceipt {
    pub transfer_id: Uuid,
    pub steps: usize,
    pub attempts: u32,
    /// Money that entered (positive) or left the ledger with this group.
    pub net: i64,
}

/// Checks a group before anything touches the database.
pub fn validate_steps(steps: &[LedgerStep]) -> AppResult<()> {
    if steps.is_empty() {
        return Err(AppError::validation("transfer has no steps"));
    }
    for (i, step) in steps.iter().enumerate() {
        if step.amount() <= 0 {
            return Err(AppError::validation(format!(
                "step {i}: amount must be positive"
            )));
        }
        if step.owner_id().trim().is_empty() {
            return Err(AppError::validation(format!("step {i}: account id is required")));
        }
        if let LedgerStep::CreditWallet(input) = step {
            if input.unique_reference && input.reference.is_none() {
                return Err(AppError::validation(format!(
                    "step {i}: unique posting needs a reference"
                )));
            }
        }
    }
    Ok(())
}

#[derive(Debug)]
pub struct TransferExecutor<W, E> {
    client: Arc<Db>,
    wallets: Arc<W>,
    escrows: Arc<E>,
    max_attempts: u32,
}

impl<W, E> Clone for TransferExecutor<W, E> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            wallets: self.wallets.clone(),
            escrows: self.escrows.clone(),
            max_attempts: self.max_attempts,
        }
    }
}

impl<W, E> TransferExecutor<W, E>
where
    W: WalletRepositoryInterface + Send + Sync + 'static,
    E: TaskEscrowRepositoryInterface + Send + Sync + 'static,
{
    pub fn new(client: Arc<Db>, wallets: Arc<W>, escrows: Arc<E>, max_attempts: u32) -> Self {
        Self {
            client,
            wallets,
            escrows,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Applies every step or none of them.
    ///
    /// The group runs on its own task, so a caller that goes away mid-flight
    /// cannot leave it half applied.
    pub async fn run_transfer(&self, steps: Vec<LedgerStep>) -> AppResult<TransferReceipt> {
        validate_steps(&steps)?;
        let group = TransferGroup {
            transfer_id: Uuid::new_v4(),
            executor: self.clone(),
            steps,
        };
        tokio::spawn(group.execute())
            .await
            .map_err(|err| AppError::TransferAborted {
                source: err.to_string(),
            })?
    }
}

enum GroupFailure {
    /// A step refused the posting. Replaying would fail the same way.
    Rejected(AppError),
    Conflict(String),
    Infrastructure(String),
}

struct TransferGroup<W, E> {
    transfer_id: Uuid,
    executor: TransferExecutor<W, E>,
    steps: Vec<LedgerStep>,
}

impl<W, E> TransferGroup<W, E>
where
    W: WalletRepositoryInterface + Send + Sync + 'static,
    E: TaskEscrowRepositoryInterface + Send + Sync + 'static,
{
    async fn execute(self) -> AppResult<TransferReceipt> {
        let max_attempts = self.executor.max_attempts;
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.attempt().await {
                Ok(()) => {
                    let receipt = TransferReceipt {
                        transfer_id: self.transfer_id,
                        steps: self.steps.len(),
                        attempts: attempt,
                        net: self.steps.iter().map(LedgerStep::net).sum(),
                    };
                    info!(
                        transfer_id = %self.transfer_id,
                        steps = receipt.steps,
                        attempts = attempt,
                        "transfer committed"
                    );
                    return Ok(receipt);
                }
                Err(GroupFailure::Rejected(err)) => {
                    info!(transfer_id = %self.transfer_id, error = %err, "transfer rejected");
                    return Err(err);
                }
                Err(GroupFailure::Conflict(reason)) if attempt < max_attempts => {
                    warn!(
                        transfer_id = %self.transfer_id,
                        attempt,
                        reason = %reason,
                        "transfer conflicted, retrying"
                    );
                    tokio::time::sleep(backoff(attempt)).await;
                }
                Err(GroupFailure::Conflict(reason)) | Err(GroupFailure::Infrastructure(reason)) => {
                    error!(
                        transfer_id = %self.transfer_id,
                        attempts = attempt,
                        reason = %reason,
                        "transfer aborted"
                    );
                    return Err(AppError::TransferAborted { source: reason });
                }
            }
        }
    }

    async fn attempt(&self) -> Result<(), GroupFailure> {
        let executor = &self.executor;
        let mut query = executor.client.query("BEGIN TRANSACTION;");
        for (i, step) in self.steps.iter().enumerate() {
            query = match step {
                LedgerStep::DebitWallet(input) => {
                    executor.wallets.build_debit_query(query, i, input)
                }
                LedgerStep::CreditWallet(input) => {
                    executor.wallets.build_credit_query(query, i, input)
                }
                LedgerStep::DebitEscrow(input) => {
                    executor.escrows.build_debit_query(query, i, input)
                }
                LedgerStep::CreditEscrow(input) => {
                    executor.escrows.build_credit_query(query, i, input)
                }
            };
        }
        query = query.query("COMMIT TRANSACTION;");

        let mut response = query
            .await
            .map_err(|err| self.classify(vec![err.to_string()]))?;
        let errors = response.take_errors();
        if errors.is_empty() {
            return Ok(());
        }
        let mut messages = errors.into_iter().collect::<Vec<_>>();
        messages.sort_by_key(|(index, _)| *index);
        Err(self.classify(messages.into_iter().map(|(_, e)| e.to_string()).collect()))
    }

    fn classify(&self, messages: Vec<String>) -> GroupFailure {
        let thrown = messages
            .iter()
            .find_map(|msg| parse_thrown_step(msg, &THROWN_MARKERS));
        if let Some((marker, step)) = thrown {
            if let Some(step) = self.steps.get(step) {
                return GroupFailure::Rejected(rejection(marker, step));
            }
        }
        if messages.iter().any(|msg| is_retryable_message(msg)) {
            return GroupFailure::Conflict(messages.join("; "));
        }
        GroupFailure::Infrastructure(messages.join("; "))
    }
}

fn rejection(marker: &str, step: &LedgerStep) -> AppError {
    let owner_id = step.owner_id().to_string();
    match marker {
        THROW_WALLET_NOT_FOUND => AppError::WalletNotFound { user_id: owner_id },
        THROW_BALANCE_TOO_LOW => AppError::InsufficientFunds {
            account: FundsAccount::Wallet,
            owner_id,
        },
        THROW_DUPLICATE_REFERENCE => {
            let reference = match step {
                LedgerStep::CreditWallet(input) => input.reference.clone().unwrap_or_default(),
                _ => String::new(),
            };
            AppError::DuplicateReference {
                user_id: owner_id,
                reference,
            }
        }
        THROW_ESCROW_NOT_FOUND => AppError::EscrowNotFound { task_id: owner_id },
        THROW_ESCROW_TOO_LOW => AppError::InsufficientFunds {
            account: FundsAccount::Escrow,
            owner_id,
        },
        _ => AppError::EscrowAlreadyFunded { task_id: owner_id },
    }
}

fn backoff(attempt: u32) -> Duration {
    let jitter = rand::thread_rng().gen_range(BACKOFF_MIN_MS..=BACKOFF_MAX_MS);
    Duration::from_millis(jitter * attempt as u64)
}
