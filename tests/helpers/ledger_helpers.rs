use escrow_ledger::entities::task::{
    ApplicantStatus, HiredWorker, TaskApplicant, TaskFunding, WorkerStatus,
};
use escrow_ledger::init::LedgerState;
use fake::Fake;
use uuid::Uuid;

#[allow(dead_code)]
pub fn fake_user_id() -> String {
    format!("user_{}", Uuid::new_v4().simple())
}

#[allow(dead_code)]
pub fn fake_task_id() -> String {
    format!("task_{}", Uuid::new_v4().simple())
}

#[allow(dead_code)]
pub fn fake_amount() -> i64 {
    (100..50_000).fake::<i64>()
}

/// Task whose hired workers are also its accepted applicants, plus one
/// rejected applicant that must not be funded.
#[allow(dead_code)]
pub fn task_funding(customer_id: &str, wage: i64, workers: &[(&str, WorkerStatus)]) -> TaskFunding {
    let mut applicants: Vec<TaskApplicant> = workers
        .iter()
        .map(|(id, _)| TaskApplicant {
            user_id: id.to_string(),
            status: ApplicantStatus::Accepted,
        })
        .collect();
    applicants.push(TaskApplicant {
        user_id: fake_user_id(),
        status: ApplicantStatus::Rejected,
    });

    TaskFunding {
        task_id: fake_task_id(),
        customer_id: customer_id.to_string(),
        wage,
        applicants,
        workers: workers
            .iter()
            .map(|(id, status)| HiredWorker {
                worker_id: id.to_string(),
                status: *status,
            })
            .collect(),
    }
}

/// Customer topped up with exactly `amount`.
#[allow(dead_code)]
pub async fn funded_customer(state: &LedgerState, amount: i64) -> String {
    let customer_id = fake_user_id();
    state
        .top_up_wallet(&customer_id, amount, &format!("cs_{}", Uuid::new_v4().simple()))
        .await
        .expect("customer topped up");
    customer_id
}

/// Sum of every wallet balance and every escrow amount.
#[allow(dead_code)]
pub async fn ledger_total(state: &LedgerState) -> i64 {
    let mut res = state
        .db
        .client
        .query("RETURN math::sum((SELECT VALUE balance FROM wallet)) + math::sum((SELECT VALUE amount FROM task_escrow));")
        .await
        .expect("totals query");
    res.take::<Option<i64>>(0)
        .expect("total is a number")
        .unwrap_or(0)
}

#[allow(dead_code)]
pub async fn negative_balances(state: &LedgerState) -> usize {
    let mut res = state
        .db
        .client
        .query("RETURN array::len((SELECT VALUE id FROM wallet WHERE balance < 0)) + array::len((SELECT VALUE id FROM task_escrow WHERE amount < 0));")
        .await
        .expect("negative balance query");
    res.take::<Option<usize>>(0)
        .expect("count is a number")
        .unwrap_or(0)
}
