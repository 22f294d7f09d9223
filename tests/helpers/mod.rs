pub mod ledger_helpers;

#[allow(unused_imports)]
pub use ledger_helpers::*;

use escrow_ledger::config::AppConfig;
use escrow_ledger::database::client::{Database, DbConfig};
use escrow_ledger::init::{create_ledger_state, LedgerState};

async fn init_test_db(config: &AppConfig) -> Database {
    let db = Database::connect(DbConfig {
        url: "mem://",
        database: &config.db_database,
        namespace: &config.db_namespace,
        username: None,
        password: None,
    })
    .await
    .expect("in-memory db connects");
    db.run_migrations().await.expect("migrations run");
    db
}

#[allow(dead_code)]
pub async fn create_test_ledger() -> LedgerState {
    create_test_ledger_with(AppConfig::default()).await
}

#[allow(dead_code)]
pub async fn create_test_ledger_with(config: AppConfig) -> LedgerState {
    let db = init_test_db(&config).await;
    create_ledger_state(db, &config)
}
