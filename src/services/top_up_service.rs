use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use crate::entities::wallet::{Wallet, WalletPostingInput, WalletPostingType};
use crate::interfaces::repositories::task_escrow_ifce::TaskEscrowRepositoryInterface;
use crate::interfaces::repositories::wallet_ifce::WalletRepositoryInterface;
use crate::middleware::error::{AppError, AppResult};
use crate::services::transfer_executor::{LedgerStep, TransferExecutor};

/// A completed payment from the provider, in minor units.
#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct TopUpInput {
    #[validate(length(min = 1, message = "user id is required"))]
    pub user_id: String,
    #[validate(range(min = 1, message = "amount must be positive"))]
    pub amount: i64,
    #[validate(length(min = 1, message = "provider session id is required"))]
    pub provider_session_id: String,
}

#[derive(Debug)]
pub struct TopUpService<W, E> {
    wallets: Arc<W>,
    executor: TransferExecutor<W, E>,
}

impl<W, E> TopUpService<W, E>
where
    W: WalletRepositoryInterface + Send + Sync + 'static,
    E: TaskEscrowRepositoryInterface + Send + Sync + 'static,
{
    pub fn new(wallets: Arc<W>, executor: TransferExecutor<W, E>) -> Self {
        Self { wallets, executor }
    }

    /// Credits the wallet once per provider session; replays return the wallet unchanged.
    pub async fn record_top_up(&self, input: TopUpInput) -> AppResult<Wallet> {
        input.validate()?;

        let replayed = self
            .wallets
            .find_by_reference(
                &input.user_id,
                WalletPostingType::TopUp,
                &input.provider_session_id,
            )
            .await?
            .is_some();

        if replayed {
            info!(
                user_id = %input.user_id,
                session_id = %input.provider_session_id,
                "top-up already applied"
            );
        } else {
            let credit = WalletPostingInput::new(
                &input.user_id,
                input.amount,
                WalletPostingType::TopUp,
            )
            .with_unique_reference(&input.provider_session_id);

            match self
                .executor
                .run_transfer(vec![LedgerStep::CreditWallet(credit)])
                .await
            {
                Ok(receipt) => info!(
                    transfer_id = %receipt.transfer_id,
                    user_id = %input.user_id,
                    amount = input.amount,
                    "wallet topped up"
                ),
                // a concurrent replay committed first
                Err(AppError::DuplicateReference { .. }) => info!(
                    user_id = %input.user_id,
                    session_id = %input.provider_session_id,
                    "top-up already applied"
                ),
                Err(err) => return Err(err),
            }
        }

        self.wallets
            .get_wallet(&input.user_id)
            .await?
            .ok_or_else(|| AppError::WalletNotFound {
                user_id: input.user_id.clone(),
            })
    }
}
