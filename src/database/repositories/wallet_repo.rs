use std::sync::Arc;

use async_trait::async_trait;
use surrealdb::engine::any;
use surrealdb::method::Query;

use crate::database::client::Db;
use crate::database::surrdb_utils::thrown_marker;
use crate::entities::wallet::{
    Wallet, WalletPosting, WalletPostingInput, WalletPostingType, POSTING_TABLE_NAME, TABLE_NAME,
    THROW_BALANCE_TOO_LOW, THROW_DUPLICATE_REFERENCE, THROW_WALLET_NOT_FOUND,
};
use crate::interfaces::repositories::wallet_ifce::WalletRepositoryInterface;
use crate::middleware::error::AppError;

const WALLET_FIELDS: &str = "user_id, balance, postings AS posting_count, r_created, r_updated";
const POSTING_FIELDS: &str = "seq, amount, type, task_id, reference, created_at";

#[derive(Debug)]
pub struct WalletRepository {
    client: Arc<Db>,
}

impl WalletRepository {
    pub fn new(client: Arc<Db>) -> Self {
        Self { client }
    }

    pub(in crate::database) async fn mutate_db(&self) -> Result<(), AppError> {
        let types = [
            WalletPostingType::TopUp,
            WalletPostingType::StartTaskPayment,
            WalletPostingType::Income,
            WalletPostingType::Refund,
        ]
        .iter()
        .map(|t| format!("'{t}'"))
        .collect::<Vec<_>>()
        .join("|");

        let sql = format!("
    DEFINE TABLE IF NOT EXISTS {TABLE_NAME} SCHEMAFULL;
    DEFINE FIELD IF NOT EXISTS user_id ON TABLE {TABLE_NAME} TYPE string ASSERT string::len($value) > 0;
    DEFINE INDEX IF NOT EXISTS user_id_idx ON TABLE {TABLE_NAME} COLUMNS user_id UNIQUE;
    DEFINE FIELD IF NOT EXISTS balance ON TABLE {TABLE_NAME} TYPE int DEFAULT 0 ASSERT $value >= 0;
    DEFINE FIELD IF NOT EXISTS postings ON TABLE {TABLE_NAME} TYPE int DEFAULT 0;
    DEFINE FIELD IF NOT EXISTS r_created ON TABLE {TABLE_NAME} TYPE datetime DEFAULT time::now() VALUE $before OR time::now();
    DEFINE FIELD IF NOT EXISTS r_updated ON TABLE {TABLE_NAME} TYPE datetime DEFAULT time::now() VALUE time::now();

    DEFINE TABLE IF NOT EXISTS {POSTING_TABLE_NAME} SCHEMAFULL;
    DEFINE FIELD IF NOT EXISTS wallet ON TABLE {POSTING_TABLE_NAME} TYPE record<{TABLE_NAME}>;
    DEFINE FIELD IF NOT EXISTS seq ON TABLE {POSTING_TABLE_NAME} TYPE int;
    DEFINE FIELD IF NOT EXISTS amount ON TABLE {POSTING_TABLE_NAME} TYPE int ASSERT $value > 0;
    DEFINE FIELD IF NOT EXISTS type ON TABLE {POSTING_TABLE_NAME} TYPE {types};
    DEFINE FIELD IF NOT EXISTS task_id ON TABLE {POSTING_TABLE_NAME} TYPE option<string>;
    DEFINE FIELD IF NOT EXISTS reference ON TABLE {POSTING_TABLE_NAME} TYPE option<string>;
    DEFINE FIELD IF NOT EXISTS created_at ON TABLE {POSTING_TABLE_NAME} TYPE datetime DEFAULT time::now() VALUE $before OR time::now();
    DEFINE INDEX IF NOT EXISTS wallet_seq_idx ON TABLE {POSTING_TABLE_NAME} COLUMNS wallet, seq UNIQUE;
    DEFINE INDEX IF NOT EXISTS wallet_reference_idx ON TABLE {POSTING_TABLE_NAME} COLUMNS wallet, type, reference;
    ");
        let mutation = self.client.query(sql).await?;
        mutation.check()?;
        Ok(())
    }

    fn bind_step<'b>(
        query: Query<'b, any::Any>,
        step: usize,
        input: &WalletPostingInput,
    ) -> Query<'b, any::Any> {
        query
            .bind((format!("w_user_{step}"), input.user_id.clone()))
            .bind((format!("w_amount_{step}"), input.amount))
            .bind((format!("w_type_{step}"), input.r#type))
            .bind((format!("w_task_{step}"), input.task_id.clone()))
            .bind((format!("w_ref_{step}"), input.reference.clone()))
    }

    fn posting_sql(step: usize) -> String {
        format!(
            "UPDATE $w_id_{step} SET balance += $w_delta_{step}, postings += 1;
            CREATE {POSTING_TABLE_NAME} SET
                wallet=$w_id_{step},
                seq=$w_{step}.postings + 1,
                amount=$w_amount_{step},
                type=$w_type_{step},
                task_id=$w_task_{step},
                reference=$w_ref_{step};"
        )
    }
}

#[async_trait]
impl WalletRepositoryInterface for WalletRepository {
    async fn get_wallet(&self, user_id: &str) -> Result<Option<Wallet>, surrealdb::Error> {
        let mut res = self
            .client
            .query(format!(
                "SELECT {WALLET_FIELDS} FROM type::thing($tb, $user_id);"
            ))
            .bind(("tb", TABLE_NAME))
            .bind(("user_id", user_id.to_string()))
            .await?;
        res.take::<Option<Wallet>>(0)
    }

    async fn get_history(
        &self,
        user_id: &str,
        start: u64,
        limit: u64,
    ) -> Result<Vec<WalletPosting>, surrealdb::Error> {
        let mut res = self
            .client
            .query(format!(
                "SELECT {POSTING_FIELDS} FROM {POSTING_TABLE_NAME}
                WHERE wallet=type::thing($tb, $user_id)
                ORDER BY seq DESC LIMIT $limit START $start;"
            ))
            .bind(("tb", TABLE_NAME))
            .bind(("user_id", user_id.to_string()))
            .bind(("limit", limit as i64))
            .bind(("start", start as i64))
            .await?;
        res.take::<Vec<WalletPosting>>(0)
    }

    async fn get_postings(&self, user_id: &str) -> Result<Vec<WalletPosting>, surrealdb::Error> {
        let mut res = self
            .client
            .query(format!(
                "SELECT {POSTING_FIELDS} FROM {POSTING_TABLE_NAME}
                WHERE wallet=type::thing($tb, $user_id) ORDER BY seq ASC;"
            ))
            .bind(("tb", TABLE_NAME))
            .bind(("user_id", user_id.to_string()))
            .await?;
        res.take::<Vec<WalletPosting>>(0)
    }

    async fn find_by_reference(
        &self,
        user_id: &str,
        r#type: WalletPostingType,
        reference: &str,
    ) -> Result<Option<WalletPosting>, surrealdb::Error> {
        let mut res = self
            .client
            .query(format!(
                "SELECT {POSTING_FIELDS} FROM {POSTING_TABLE_NAME}
                WHERE wallet=type::thing($tb, $user_id) AND type=$type AND reference=$reference
                LIMIT 1;"
            ))
            .bind(("tb", TABLE_NAME))
            .bind(("user_id", user_id.to_string()))
            .bind(("type", r#type))
            .bind(("reference", reference.to_string()))
            .await?;
        res.take::<Option<WalletPosting>>(0)
    }

    async fn create_if_missing(&self, user_id: &str) -> Result<bool, surrealdb::Error> {
        if self.get_wallet(user_id).await?.is_some() {
            return Ok(false);
        }
        let res = self
            .client
            .query(
                "LET $id = type::thing($tb, $user_id);
                CREATE $id SET user_id=$user_id, balance=0, postings=0;",
            )
            .bind(("tb", TABLE_NAME))
            .bind(("user_id", user_id.to_string()))
            .await?;
        match res.check() {
            Ok(_) => Ok(true),
            // created concurrently by a credit or another provisioning run
            Err(err)
                if err.to_string().contains("already exists")
                    || err.to_string().contains("already contains") =>
            {
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    fn build_debit_query<'b>(
        &self,
        query: Query<'b, any::Any>,
        step: usize,
        input: &WalletPostingInput,
    ) -> Query<'b, any::Any> {
        let not_found = thrown_marker(THROW_WALLET_NOT_FOUND, step);
        let too_low = thrown_marker(THROW_BALANCE_TOO_LOW, step);
        let posting = Self::posting_sql(step);
        let sql = format!(
            "LET $w_id_{step} = type::thing('{TABLE_NAME}', $w_user_{step});
            LET $w_{step} = (SELECT * FROM $w_id_{step})[0];
            IF $w_{step} == NONE {{ THROW '{not_found}'; }};
            IF $w_{step}.balance < $w_amount_{step} {{ THROW '{too_low}'; }};
            LET $w_delta_{step} = 0 - $w_amount_{step};
            {posting}"
        );
        Self::bind_step(query.query(sql), step, input)
    }

    fn build_credit_query<'b>(
        &self,
        query: Query<'b, any::Any>,
        step: usize,
        input: &WalletPostingInput,
    ) -> Query<'b, any::Any> {
        let duplicate_check = if input.unique_reference {
            let duplicate = thrown_marker(THROW_DUPLICATE_REFERENCE, step);
            format!(
                "LET $w_dup_{step} = (SELECT VALUE id FROM {POSTING_TABLE_NAME}
                    WHERE wallet=$w_id_{step} AND type=$w_type_{step} AND reference=$w_ref_{step});
                IF array::len($w_dup_{step}) > 0 {{ THROW '{duplicate}'; }};"
            )
        } else {
            String::new()
        };
        let posting = Self::posting_sql(step);
        let sql = format!(
            "LET $w_id_{step} = type::thing('{TABLE_NAME}', $w_user_{step});
            {duplicate_check}
            IF (SELECT VALUE id FROM $w_id_{step})[0] == NONE {{
                CREATE $w_id_{step} SET user_id=$w_user_{step}, balance=0, postings=0;
            }};
            LET $w_{step} = (SELECT * FROM $w_id_{step})[0];
            LET $w_delta_{step} = $w_amount_{step};
            {posting}"
        );
        Self::bind_step(query.query(sql), step, input)
    }
}
