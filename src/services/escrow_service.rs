use std::sync::Arc;

use tracing::{error, info};
use validator::Validate;

use crate::entities::task::{TaskFunding, WorkerStatus};
use crate::entities::task_escrow::{EscrowPostingInput, EscrowPostingType, TaskEscrow};
use crate::entities::wallet::{WalletPostingInput, WalletPostingType};
use crate::interfaces::repositories::task_escrow_ifce::TaskEscrowRepositoryInterface;
use crate::interfaces::repositories::wallet_ifce::WalletRepositoryInterface;
use crate::middleware::error::{AppError, AppResult, FundsAccount};
use crate::services::transfer_executor::{LedgerStep, TransferExecutor};
use crate::utils::money;

/// What one hired worker receives when the task is dismissed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerCompensation {
    pub worker_id: String,
    pub amount: i64,
    pub r#type: EscrowPostingType,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DismissalPlan {
    pub workers: Vec<WorkerCompensation>,
    pub customer_refund: i64,
}

impl DismissalPlan {
    fn into_steps(self, task: &TaskFunding) -> Vec<LedgerStep> {
        let mut steps = Vec::new();
        if self.customer_refund > 0 {
            steps.extend(payout_steps(
                &task.task_id,
                &task.customer_id,
                self.customer_refund,
                EscrowPostingType::CustomerRefund,
                WalletPostingType::Refund,
            ));
        }
        for worker in self.workers.into_iter().filter(|w| w.amount > 0) {
            steps.extend(payout_steps(
                &task.task_id,
                &worker.worker_id,
                worker.amount,
                worker.r#type,
                WalletPostingType::Income,
            ));
        }
        steps
    }
}

/// Compensation owed to a worker dismissed in `status`, and the escrow tag it is paid under.
pub fn worker_compensation(
    status: WorkerStatus,
    wage: i64,
) -> AppResult<Option<(i64, EscrowPostingType)>> {
    if status.has_submitted() {
        return Ok(Some((wage, EscrowPostingType::SubmittedWorkerCompensation)));
    }
    if status == WorkerStatus::InProgress {
        let (numerator, denominator) = money::IN_PROGRESS_SHARE;
        let amount = money::mul_ratio_round_half_up(wage, numerator, denominator)
            .ok_or_else(|| AppError::validation("wage is out of range"))?;
        return Ok(Some((amount, EscrowPostingType::NotSubmittedWorkerCompensation)));
    }
    Ok(None)
}

/// Splits `escrow_amount` between hired workers and the customer.
pub fn plan_dismissal(task: &TaskFunding, escrow_amount: i64) -> AppResult<DismissalPlan> {
    let mut workers = Vec::new();
    let mut obligations: i64 = 0;
    for worker in &task.workers {
        if let Some((amount, r#type)) = worker_compensation(worker.status, task.wage)? {
            obligations = obligations
                .checked_add(amount)
                .ok_or_else(|| AppError::validation("compensations overflow"))?;
            workers.push(WorkerCompensation {
                worker_id: worker.worker_id.clone(),
                amount,
                r#type,
            });
        }
    }

    let customer_refund = escrow_amount - obligations;
    if customer_refund < 0 {
        return Err(AppError::NotEnoughMoneyInEscrow {
            task_id: task.task_id.clone(),
            required: obligations,
            available: escrow_amount,
        });
    }
    Ok(DismissalPlan {
        workers,
        customer_refund,
    })
}

fn payout_steps(
    task_id: &str,
    user_id: &str,
    amount: i64,
    escrow_type: EscrowPostingType,
    wallet_type: WalletPostingType,
) -> [LedgerStep; 2] {
    [
        LedgerStep::DebitEscrow(EscrowPostingInput::new(task_id, amount, escrow_type, user_id)),
        LedgerStep::CreditWallet(
            WalletPostingInput::new(user_id, amount, wallet_type).for_task(task_id),
        ),
    ]
}

/// Moves task money between customer wallets, task escrows and worker wallets.
#[derive(Debug)]
pub struct EscrowService<W, E> {
    escrows: Arc<E>,
    executor: TransferExecutor<W, E>,
}

impl<W, E> EscrowService<W, E>
where
    W: WalletRepositoryInterface + Send + Sync + 'static,
    E: TaskEscrowRepositoryInterface + Send + Sync + 'static,
{
    pub fn new(escrows: Arc<E>, executor: TransferExecutor<W, E>) -> Self {
        Self { escrows, executor }
    }

    /// Funds the task escrow from the customer wallet with `wage` per accepted applicant.
    pub async fn start_task_transfer(&self, task: &TaskFunding) -> AppResult<TaskEscrow> {
        task.validate()?;
        let accepted = task.accepted_applicants();
        if accepted == 0 {
            return Err(AppError::validation("task has no accepted applicants"));
        }
        let amount = i64::try_from(accepted)
            .ok()
            .and_then(|count| task.wage.checked_mul(count))
            .ok_or_else(|| AppError::validation("task amount is out of range"))?;

        let receipt = self
            .executor
            .run_transfer(vec![
                LedgerStep::DebitWallet(
                    WalletPostingInput::new(
                        &task.customer_id,
                        amount,
                        WalletPostingType::StartTaskPayment,
                    )
                    .for_task(&task.task_id),
                ),
                LedgerStep::CreditEscrow(EscrowPostingInput::new(
                    &task.task_id,
                    amount,
                    EscrowPostingType::StartTaskPayment,
                    &task.customer_id,
                )),
            ])
            .await?;
        info!(
            transfer_id = %receipt.transfer_id,
            task_id = %task.task_id,
            customer_id = %task.customer_id,
            amount,
            "task escrow funded"
        );
        self.get_escrow(&task.task_id).await
    }

    /// Pays out dismissal compensations and refunds the rest to the customer.
    pub async fn dismiss_in_progress_task_transfer(
        &self,
        task: &TaskFunding,
    ) -> AppResult<TaskEscrow> {
        task.validate()?;
        let escrow = self.funded_escrow(&task.task_id).await?;
        let plan = plan_dismissal(task, escrow.amount)?;
        let steps = plan.into_steps(task);

        if !steps.is_empty() {
            let receipt = self.executor.run_transfer(steps).await?;
            info!(
                transfer_id = %receipt.transfer_id,
                task_id = %task.task_id,
                postings = receipt.steps,
                "dismissed task disbursed"
            );
        }
        self.ensure_disbursed(&task.task_id).await
    }

    /// Pays one worker's full wage out of the task escrow.
    pub async fn accept_task_payment(
        &self,
        task_id: &str,
        worker_id: &str,
        wage: i64,
    ) -> AppResult<TaskEscrow> {
        if worker_id.trim().is_empty() {
            return Err(AppError::validation("worker id is required"));
        }
        if wage <= 0 {
            return Err(AppError::validation("wage must be positive"));
        }
        let escrow = self.funded_escrow(task_id).await?;
        if wage > escrow.amount {
            return Err(AppError::InsufficientFunds {
                account: FundsAccount::Escrow,
                owner_id: task_id.to_string(),
            });
        }

        let receipt = self
            .executor
            .run_transfer(
                payout_steps(
                    task_id,
                    worker_id,
                    wage,
                    EscrowPostingType::WorkerPayment,
                    WalletPostingType::Income,
                )
                .to_vec(),
            )
            .await?;
        info!(
            transfer_id = %receipt.transfer_id,
            task_id,
            worker_id,
            wage,
            "worker paid from escrow"
        );
        self.get_escrow(task_id).await
    }

    /// Returns whatever the escrow still holds to the customer and closes it.
    pub async fn close_task_transfer(
        &self,
        task_id: &str,
        customer_id: &str,
    ) -> AppResult<TaskEscrow> {
        if customer_id.trim().is_empty() {
            return Err(AppError::validation("customer id is required"));
        }
        let escrow = self.funded_escrow(task_id).await?;
        let receipt = self
            .executor
            .run_transfer(
                payout_steps(
                    task_id,
                    customer_id,
                    escrow.amount,
                    EscrowPostingType::CustomerRefund,
                    WalletPostingType::Refund,
                )
                .to_vec(),
            )
            .await?;
        info!(
            transfer_id = %receipt.transfer_id,
            task_id,
            customer_id,
            refund = escrow.amount,
            "task escrow closed"
        );
        self.ensure_disbursed(task_id).await
    }

    pub async fn get_escrow(&self, task_id: &str) -> AppResult<TaskEscrow> {
        self.escrows
            .get_escrow(task_id)
            .await?
            .ok_or_else(|| AppError::EscrowNotFound {
                task_id: task_id.to_string(),
            })
    }

    /// Escrow that still holds money; zeroed escrows are treated as gone.
    async fn funded_escrow(&self, task_id: &str) -> AppResult<TaskEscrow> {
        if task_id.trim().is_empty() {
            return Err(AppError::validation("task id is required"));
        }
        let escrow = self.get_escrow(task_id).await?;
        if escrow.amount == 0 {
            return Err(AppError::EscrowNotFound {
                task_id: task_id.to_string(),
            });
        }
        Ok(escrow)
    }

    async fn ensure_disbursed(&self, task_id: &str) -> AppResult<TaskEscrow> {
        let escrow = self.get_escrow(task_id).await?;
        // at two decimals only an exact zero is below the dust threshold
        if money::is_dust(escrow.amount) {
            return Ok(escrow);
        }
        let msg = format!(
            "escrow of task {task_id} holds {} after full disbursement",
            money::format_minor(escrow.amount)
        );
        error!(task_id, remaining = escrow.amount, "{msg}");
        sentry::capture_message(&msg, sentry::Level::Fatal);
        Err(AppError::NotCorrectAmountTransfer {
            task_id: task_id.to_string(),
            remaining: escrow.amount,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::client::Db;
    use crate::entities::task::{ApplicantStatus, HiredWorker, TaskApplicant};
    use crate::entities::wallet::{Wallet, WalletPosting};
    use async_trait::async_trait;
    use surrealdb::engine::any;
    use surrealdb::method::Query;

    struct NoWallets;

    #[async_trait]
    impl WalletRepositoryInterface for NoWallets {
        async fn get_wallet(&self, _user_id: &str) -> Result<Option<Wallet>, surrealdb::Error> {
            Ok(None)
        }

        async fn get_history(
            &self,
            _user_id: &str,
            _start: u64,
            _limit: u64,
        ) -> Result<Vec<WalletPosting>, surrealdb::Error> {
            Ok(vec![])
        }

        async fn get_postings(&self, _user_id: &str) -> Result<Vec<WalletPosting>, surrealdb::Error> {
            Ok(vec![])
        }

        async fn find_by_reference(
            &self,
            _user_id: &str,
            _type: WalletPostingType,
            _reference: &str,
        ) -> Result<Option<WalletPosting>, surrealdb::Error> {
            Ok(None)
        }

        async fn create_if_missing(&self, _user_id: &str) -> Result<bool, surrealdb::Error> {
            Ok(false)
        }

        fn build_debit_query<'b>(
            &self,
            query: Query<'b, any::Any>,
            _step: usize,
            _input: &WalletPostingInput,
        ) -> Query<'b, any::Any> {
            query
        }

        fn build_credit_query<'b>(
            &self,
            query: Query<'b, any::Any>,
            _step: usize,
            _input: &WalletPostingInput,
        ) -> Query<'b, any::Any> {
            query
        }
    }

    /// Escrow store that always reports the same remaining amount.
    struct LeftoverEscrow(i64);

    #[async_trait]
    impl TaskEscrowRepositoryInterface for LeftoverEscrow {
        async fn get_escrow(&self, task_id: &str) -> Result<Option<TaskEscrow>, surrealdb::Error> {
            Ok(Some(TaskEscrow {
                task_id: task_id.to_string(),
                amount: self.0,
                posting_count: 3,
                history: vec![],
                r_created: None,
                r_updated: None,
            }))
        }

        fn build_debit_query<'b>(
            &self,
            query: Query<'b, any::Any>,
            _step: usize,
            _input: &EscrowPostingInput,
        ) -> Query<'b, any::Any> {
            query
        }

        fn build_credit_query<'b>(
            &self,
            query: Query<'b, any::Any>,
            _step: usize,
            _input: &EscrowPostingInput,
        ) -> Query<'b, any::Any> {
            query
        }
    }

    fn service_with_leftover(remaining: i64) -> EscrowService<NoWallets, LeftoverEscrow> {
        let escrows = Arc::new(LeftoverEscrow(remaining));
        let executor = TransferExecutor::new(
            Arc::new(Db::init()),
            Arc::new(NoWallets),
            escrows.clone(),
            1,
        );
        EscrowService::new(escrows, executor)
    }

    #[tokio::test]
    async fn leftover_after_disbursement_raises_integrity_error() {
        let service = service_with_leftover(7);
        assert_eq!(
            service.ensure_disbursed("task-1").await.unwrap_err(),
            AppError::NotCorrectAmountTransfer {
                task_id: "task-1".to_string(),
                remaining: 7,
            }
        );
    }

    #[tokio::test]
    async fn emptied_escrow_passes_disbursement_check() {
        let service = service_with_leftover(0);
        let escrow = service.ensure_disbursed("task-1").await.unwrap();
        assert_eq!(escrow.amount, 0);
    }

    fn task(wage: i64, workers: &[(&str, WorkerStatus)]) -> TaskFunding {
        TaskFunding {
            task_id: "task-1".to_string(),
            customer_id: "customer".to_string(),
            wage,
            applicants: workers
                .iter()
                .map(|(id, _)| TaskApplicant {
                    user_id: id.to_string(),
                    status: ApplicantStatus::Accepted,
                })
                .collect(),
            workers: workers
                .iter()
                .map(|(id, status)| HiredWorker {
                    worker_id: id.to_string(),
                    status: *status,
                })
                .collect(),
        }
    }

    #[test]
    fn dismissal_splits_escrow_by_worker_status() {
        let task = task(
            100,
            &[("w1", WorkerStatus::Submitted), ("w2", WorkerStatus::InProgress)],
        );
        let plan = plan_dismissal(&task, 200).unwrap();
        assert_eq!(plan.customer_refund, 70);
        assert_eq!(
            plan.workers,
            vec![
                WorkerCompensation {
                    worker_id: "w1".to_string(),
                    amount: 100,
                    r#type: EscrowPostingType::SubmittedWorkerCompensation,
                },
                WorkerCompensation {
                    worker_id: "w2".to_string(),
                    amount: 30,
                    r#type: EscrowPostingType::NotSubmittedWorkerCompensation,
                },
            ]
        );
        assert_eq!(plan.into_steps(&task).len(), 6);
    }

    #[test]
    fn finished_or_dismissed_workers_get_nothing() {
        let task = task(
            100,
            &[("w1", WorkerStatus::Completed), ("w2", WorkerStatus::Dismissed)],
        );
        let plan = plan_dismissal(&task, 200).unwrap();
        assert!(plan.workers.is_empty());
        assert_eq!(plan.customer_refund, 200);

        let steps = plan.into_steps(&task);
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].owner_id(), "task-1");
        assert_eq!(steps[1].owner_id(), "customer");
    }

    #[test]
    fn revising_and_resubmitted_count_as_submitted() {
        for status in [WorkerStatus::Revising, WorkerStatus::Resubmitted] {
            assert_eq!(
                worker_compensation(status, 250).unwrap(),
                Some((250, EscrowPostingType::SubmittedWorkerCompensation))
            );
        }
    }

    #[test]
    fn in_progress_share_is_rounded_half_up() {
        assert_eq!(
            worker_compensation(WorkerStatus::InProgress, 5).unwrap(),
            Some((2, EscrowPostingType::NotSubmittedWorkerCompensation))
        );
    }

    #[test]
    fn zero_compensation_produces_no_postings() {
        // 30% of one minor unit rounds to zero
        let task = task(1, &[("w1", WorkerStatus::InProgress)]);
        let plan = plan_dismissal(&task, 1).unwrap();
        assert_eq!(plan.customer_refund, 1);
        let steps = plan.into_steps(&task);
        assert_eq!(steps.len(), 2);
        assert!(steps.iter().all(|s| s.owner_id() != "w1"));
    }

    #[test]
    fn obligations_above_escrow_are_rejected() {
        let task = task(
            100,
            &[("w1", WorkerStatus::Submitted), ("w2", WorkerStatus::Submitted)],
        );
        assert_eq!(
            plan_dismissal(&task, 150),
            Err(AppError::NotEnoughMoneyInEscrow {
                task_id: "task-1".to_string(),
                required: 200,
                available: 150,
            })
        );
    }
}
