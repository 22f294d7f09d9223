//! Ledger maintenance entry point: connects, applies the schema and
//! provisions wallets for the user ids passed on the command line.

use escrow_ledger::config::AppConfig;
use escrow_ledger::database::client::{Database, DbConfig};
use escrow_ledger::init::create_ledger_state;
use escrow_ledger::middleware::error::AppResult;
use escrow_ledger::utils::money::format_minor;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> AppResult<()> {
    let config = AppConfig::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let _sentry = config.sentry_project_link.as_ref().map(|dsn| {
        sentry::init((
            dsn.as_str(),
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    let db = Database::connect(DbConfig {
        url: &config.db_url,
        database: &config.db_database,
        namespace: &config.db_namespace,
        username: config.db_username.as_deref(),
        password: config.db_password.as_deref(),
    })
    .await?;
    db.run_migrations().await?;

    let state = create_ledger_state(db, &config);

    let user_ids: Vec<String> = std::env::args().skip(1).collect();
    if user_ids.is_empty() {
        info!("no user ids given, nothing to provision");
        return Ok(());
    }

    state.provision_wallets(&user_ids).await?;
    for user_id in &user_ids {
        let balance = state.get_wallet_balance(user_id).await?;
        info!(user_id = %user_id, balance = %format_minor(balance), "wallet ready");
    }
    Ok(())
}
