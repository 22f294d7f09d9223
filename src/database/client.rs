use std::sync::Arc;

use surrealdb::engine::any::{connect, Any};
use surrealdb::opt::auth::Root;
use surrealdb::Surreal;
use tracing::info;

use crate::database::repositories::task_escrow_repo::TaskEscrowRepository;
use crate::database::repositories::wallet_repo::WalletRepository;
use crate::middleware::error::AppResult;

pub type Db = Surreal<Any>;

#[derive(Debug)]
pub struct DbConfig<'a> {
    pub url: &'a str,
    pub database: &'a str,
    pub namespace: &'a str,
    pub username: Option<&'a str>,
    pub password: Option<&'a str>,
}

#[derive(Debug)]
pub struct Database {
    pub client: Arc<Db>,
    pub wallets: Arc<WalletRepository>,
    pub task_escrows: Arc<TaskEscrowRepository>,
}

impl Database {
    pub async fn connect(config: DbConfig<'_>) -> AppResult<Self> {
        info!(url = config.url, namespace = config.namespace, "->> connecting DB");
        let conn = connect(config.url).await?;

        if let (Some(username), Some(password)) = (config.username, config.password) {
            conn.signin(Root { username, password }).await?;
        }

        conn.use_ns(config.namespace)
            .use_db(config.database)
            .await?;

        let version = conn.version().await?;
        info!("->> connected DB version: {version}");

        let client = Arc::new(conn);
        Ok(Self {
            wallets: Arc::new(WalletRepository::new(client.clone())),
            task_escrows: Arc::new(TaskEscrowRepository::new(client.clone())),
            client,
        })
    }

    pub async fn run_migrations(&self) -> AppResult<()> {
        self.wallets.mutate_db().await?;
        self.task_escrows.mutate_db().await?;
        info!("->> ledger schema ready");
        Ok(())
    }
}
