mod helpers;

use escrow_ledger::entities::task::WorkerStatus;
use escrow_ledger::entities::wallet::{PostingTotal, WalletPostingType};
use escrow_ledger::interfaces::repositories::wallet_ifce::WalletRepositoryInterface;
use escrow_ledger::middleware::error::AppError;
use helpers::{create_test_ledger, fake_amount, fake_user_id, task_funding};

#[tokio::test]
async fn missing_wallet_reads_as_empty() {
    let state = create_test_ledger().await;
    let user_id = fake_user_id();

    assert_eq!(state.get_wallet_balance(&user_id).await.unwrap(), 0);
    let history = state.get_wallet_history(&user_id, 1, 20).await.unwrap();
    assert_eq!(history.count, 0);
    assert!(history.history.is_empty());
}

#[tokio::test]
async fn top_up_creates_wallet_and_records_reference() {
    let state = create_test_ledger().await;
    let user_id = fake_user_id();
    let amount = fake_amount();

    let wallet = state
        .top_up_wallet(&user_id, amount, "cs_test_first")
        .await
        .unwrap();

    assert_eq!(wallet.user_id, user_id);
    assert_eq!(wallet.balance, amount);
    assert_eq!(wallet.posting_count, 1);
    let history = state.get_wallet_history(&user_id, 1, 20).await.unwrap();
    assert_eq!(history.history[0].r#type, WalletPostingType::TopUp);
    assert_eq!(history.history[0].reference.as_deref(), Some("cs_test_first"));
    assert_eq!(history.history[0].seq, 1);
}

#[tokio::test]
async fn replayed_top_up_credits_once() {
    let state = create_test_ledger().await;
    let user_id = fake_user_id();

    let first = state.top_up_wallet(&user_id, 500, "cs_replay").await.unwrap();
    let second = state.top_up_wallet(&user_id, 500, "cs_replay").await.unwrap();

    assert_eq!(first.balance, 500);
    assert_eq!(second.balance, 500);
    assert_eq!(second.posting_count, 1);

    let third = state.top_up_wallet(&user_id, 500, "cs_other").await.unwrap();
    assert_eq!(third.balance, 1_000);
}

#[tokio::test]
async fn invalid_top_up_is_rejected() {
    let state = create_test_ledger().await;
    let user_id = fake_user_id();

    for (amount, session) in [(0, "cs_zero"), (-5, "cs_negative"), (10, "")] {
        let err = state
            .top_up_wallet(&user_id, amount, session)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }), "{err:?}");
    }
    assert_eq!(state.get_wallet_balance(&user_id).await.unwrap(), 0);
}

#[tokio::test]
async fn history_is_paged_newest_first() {
    let state = create_test_ledger().await;
    let user_id = fake_user_id();
    for i in 1..=5 {
        state
            .top_up_wallet(&user_id, i * 10, &format!("cs_page_{i}"))
            .await
            .unwrap();
    }

    let first = state.get_wallet_history(&user_id, 1, 2).await.unwrap();
    assert_eq!(first.count, 5);
    assert_eq!(
        first.history.iter().map(|p| p.amount).collect::<Vec<_>>(),
        vec![50, 40]
    );

    let last = state.get_wallet_history(&user_id, 3, 2).await.unwrap();
    assert_eq!(
        last.history.iter().map(|p| p.seq).collect::<Vec<_>>(),
        vec![1]
    );

    let beyond = state.get_wallet_history(&user_id, 4, 2).await.unwrap();
    assert!(beyond.history.is_empty());
    assert_eq!(beyond.count, 5);
}

#[tokio::test]
async fn history_page_bounds_are_validated() {
    let state = create_test_ledger().await;
    let user_id = fake_user_id();

    for (page, size) in [(0, 10), (1, 0), (1, 101)] {
        assert!(matches!(
            state.get_wallet_history(&user_id, page, size).await,
            Err(AppError::Validation { .. })
        ));
    }
}

#[tokio::test]
async fn summary_totals_postings_by_type() {
    let state = create_test_ledger().await;
    let customer = fake_user_id();
    state.top_up_wallet(&customer, 300, "cs_sum_1").await.unwrap();
    state.top_up_wallet(&customer, 200, "cs_sum_2").await.unwrap();
    let task = task_funding(
        &customer,
        120,
        &[(fake_user_id().as_str(), WorkerStatus::Dismissed)],
    );
    state.start_task_transfer(&task).await.unwrap();
    state
        .close_task_transfer(&task.task_id, &customer)
        .await
        .unwrap();

    let summary = state.get_wallet_summary(&customer).await.unwrap();

    assert_eq!(summary.balance, 500);
    assert_eq!(
        summary.totals,
        vec![
            PostingTotal {
                r#type: WalletPostingType::Refund,
                total: 120
            },
            PostingTotal {
                r#type: WalletPostingType::StartTaskPayment,
                total: 120
            },
            PostingTotal {
                r#type: WalletPostingType::TopUp,
                total: 500
            },
        ]
    );
    let signed: i64 = summary
        .totals
        .iter()
        .map(|t| t.r#type.signed(t.total))
        .sum();
    assert_eq!(signed, summary.balance);
}

#[tokio::test]
async fn provisioning_creates_missing_wallets_only() {
    let state = create_test_ledger().await;
    let existing = fake_user_id();
    state.top_up_wallet(&existing, 75, "cs_existing").await.unwrap();
    let fresh = fake_user_id();

    let created = state
        .provision_wallets(&[existing.clone(), fresh.clone()])
        .await
        .unwrap();

    assert_eq!(created, 1);
    assert_eq!(state.get_wallet_balance(&existing).await.unwrap(), 75);
    let wallet = state.db.wallets.get_wallet(&fresh).await.unwrap();
    assert_eq!(wallet.map(|w| (w.balance, w.posting_count)), Some((0, 0)));

    let again = state.provision_wallets(&[fresh]).await.unwrap();
    assert_eq!(again, 0);
}
