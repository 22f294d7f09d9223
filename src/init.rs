use crate::config::AppConfig;
use crate::database::client::Database;
use crate::database::repositories::task_escrow_repo::TaskEscrowRepository;
use crate::database::repositories::wallet_repo::WalletRepository;
use crate::entities::task::TaskFunding;
use crate::entities::task_escrow::TaskEscrow;
use crate::entities::wallet::{Wallet, WalletHistory, WalletSummary};
use crate::middleware::error::AppResult;
use crate::services::escrow_service::EscrowService;
use crate::services::top_up_service::{TopUpInput, TopUpService};
use crate::services::transfer_executor::TransferExecutor;
use crate::services::wallet_service::WalletService;

pub type LedgerExecutor = TransferExecutor<WalletRepository, TaskEscrowRepository>;

/// Ledger services wired over one database. Controllers hold this and call
/// the operations below.
#[derive(Debug)]
pub struct LedgerState {
    pub db: Database,
    pub executor: LedgerExecutor,
    pub escrow_service: EscrowService<WalletRepository, TaskEscrowRepository>,
    pub wallet_service: WalletService<WalletRepository>,
    pub top_up_service: TopUpService<WalletRepository, TaskEscrowRepository>,
}

pub fn create_ledger_state(db: Database, config: &AppConfig) -> LedgerState {
    let executor = TransferExecutor::new(
        db.client.clone(),
        db.wallets.clone(),
        db.task_escrows.clone(),
        config.transfer_max_attempts,
    );
    LedgerState {
        escrow_service: EscrowService::new(db.task_escrows.clone(), executor.clone()),
        wallet_service: WalletService::new(db.wallets.clone(), config.history_max_page_size),
        top_up_service: TopUpService::new(db.wallets.clone(), executor.clone()),
        executor,
        db,
    }
}

impl LedgerState {
    pub async fn start_task_transfer(&self, task: &TaskFunding) -> AppResult<TaskEscrow> {
        self.escrow_service.start_task_transfer(task).await
    }

    pub async fn dismiss_in_progress_task_transfer(
        &self,
        task: &TaskFunding,
    ) -> AppResult<TaskEscrow> {
        self.escrow_service
            .dismiss_in_progress_task_transfer(task)
            .await
    }

    pub async fn accept_task_payment(
        &self,
        task_id: &str,
        worker_id: &str,
        wage: i64,
    ) -> AppResult<TaskEscrow> {
        self.escrow_service
            .accept_task_payment(task_id, worker_id, wage)
            .await
    }

    pub async fn close_task_transfer(
        &self,
        task_id: &str,
        customer_id: &str,
    ) -> AppResult<TaskEscrow> {
        self.escrow_service
            .close_task_transfer(task_id, customer_id)
            .await
    }

    pub async fn get_task_escrow(&self, task_id: &str) -> AppResult<TaskEscrow> {
        self.escrow_service.get_escrow(task_id).await
    }

    pub async fn top_up_wallet(
        &self,
        user_id: &str,
        amount: i64,
        provider_session_id: &str,
    ) -> AppResult<Wallet> {
        self.top_up_service
            .record_top_up(TopUpInput {
                user_id: user_id.to_string(),
                amount,
                provider_session_id: provider_session_id.to_string(),
            })
            .await
    }

    pub async fn get_wallet_balance(&self, user_id: &str) -> AppResult<i64> {
        self.wallet_service.get_balance(user_id).await
    }

    pub async fn get_wallet_history(
        &self,
        user_id: &str,
        page: u64,
        limit: u64,
    ) -> AppResult<WalletHistory> {
        self.wallet_service.get_history(user_id, page, limit).await
    }

    pub async fn get_wallet_summary(&self, user_id: &str) -> AppResult<WalletSummary> {
        self.wallet_service.get_summary(user_id).await
    }

    pub async fn provision_wallets(&self, user_ids: &[String]) -> AppResult<u64> {
        self.wallet_service.provision_wallets(user_ids).await
    }
}

