use std::sync::Arc;

use async_trait::async_trait;
use surrealdb::engine::any;
use surrealdb::method::Query;

use crate::database::client::Db;
use crate::database::surrdb_utils::thrown_marker;
use crate::entities::task_escrow::{
    EscrowPosting, EscrowPostingInput, EscrowPostingType, TaskEscrow, POSTING_TABLE_NAME,
    TABLE_NAME, THROW_ESCROW_EXISTS, THROW_ESCROW_NOT_FOUND, THROW_ESCROW_TOO_LOW,
};
use crate::interfaces::repositories::task_escrow_ifce::TaskEscrowRepositoryInterface;
use crate::middleware::error::AppError;

#[derive(Debug)]
pub struct TaskEscrowRepository {
    client: Arc<Db>,
}

impl TaskEscrowRepository {
    pub fn new(client: Arc<Db>) -> Self {
        Self { client }
    }

    pub(in crate::database) async fn mutate_db(&self) -> Result<(), AppError> {
        let types = [
            EscrowPostingType::StartTaskPayment,
            EscrowPostingType::WorkerPayment,
            EscrowPostingType::SubmittedWorkerCompensation,
            EscrowPostingType::NotSubmittedWorkerCompensation,
            EscrowPostingType::CustomerRefund,
        ]
        .iter()
        .map(|t| format!("'{t}'"))
        .collect::<Vec<_>>()
        .join("|");

        let sql = format!("
    DEFINE TABLE IF NOT EXISTS {TABLE_NAME} SCHEMAFULL;
    DEFINE FIELD IF NOT EXISTS task_id ON TABLE {TABLE_NAME} TYPE string ASSERT string::len($value) > 0;
    DEFINE INDEX IF NOT EXISTS task_id_idx ON TABLE {TABLE_NAME} COLUMNS task_id UNIQUE;
    DEFINE FIELD IF NOT EXISTS amount ON TABLE {TABLE_NAME} TYPE int DEFAULT 0 ASSERT $value >= 0;
    DEFINE FIELD IF NOT EXISTS postings ON TABLE {TABLE_NAME} TYPE int DEFAULT 0;
    DEFINE FIELD IF NOT EXISTS r_created ON TABLE {TABLE_NAME} TYPE datetime DEFAULT time::now() VALUE $before OR time::now();
    DEFINE FIELD IF NOT EXISTS r_updated ON TABLE {TABLE_NAME} TYPE datetime DEFAULT time::now() VALUE time::now();

    DEFINE TABLE IF NOT EXISTS {POSTING_TABLE_NAME} SCHEMAFULL;
    DEFINE FIELD IF NOT EXISTS escrow ON TABLE {POSTING_TABLE_NAME} TYPE record<{TABLE_NAME}>;
    DEFINE FIELD IF NOT EXISTS seq ON TABLE {POSTING_TABLE_NAME} TYPE int;
    DEFINE FIELD IF NOT EXISTS amount ON TABLE {POSTING_TABLE_NAME} TYPE int ASSERT $value > 0;
    DEFINE FIELD IF NOT EXISTS type ON TABLE {POSTING_TABLE_NAME} TYPE {types};
    DEFINE FIELD IF NOT EXISTS user_id ON TABLE {POSTING_TABLE_NAME} TYPE option<string>;
    DEFINE FIELD IF NOT EXISTS reference ON TABLE {POSTING_TABLE_NAME} TYPE option<string>;
    DEFINE FIELD IF NOT EXISTS created_at ON TABLE {POSTING_TABLE_NAME} TYPE datetime DEFAULT time::now() VALUE $before OR time::now();
    DEFINE INDEX IF NOT EXISTS escrow_seq_idx ON TABLE {POSTING_TABLE_NAME} COLUMNS escrow, seq UNIQUE;
    ");
        let mutation = self.client.query(sql).await?;
        mutation.check()?;
        Ok(())
    }

    fn bind_step<'b>(
        query: Query<'b, any::Any>,
        step: usize,
        input: &EscrowPostingInput,
    ) -> Query<'b, any::Any> {
        query
            .bind((format!("e_task_{step}"), input.task_id.clone()))
            .bind((format!("e_amount_{step}"), input.amount))
            .bind((format!("e_type_{step}"), input.r#type))
            .bind((format!("e_user_{step}"), input.user_id.clone()))
            .bind((format!("e_ref_{step}"), input.reference.clone()))
    }

    fn posting_sql(step: usize) -> String {
        format!(
            "UPDATE $e_id_{step} SET amount += $e_delta_{step}, postings += 1;
            CREATE {POSTING_TABLE_NAME} SET
                escrow=$e_id_{step},
                seq=$e_{step}.postings + 1,
                amount=$e_amount_{step},
                type=$e_type_{step},
                user_id=$e_user_{step},
                reference=$e_ref_{step};"
        )
    }
}

#[async_trait]
impl TaskEscrowRepositoryInterface for TaskEscrowRepository {
    async fn get_escrow(&self, task_id: &str) -> Result<Option<TaskEscrow>, surrealdb::Error> {
        let mut res = self
            .client
            .query(
                "SELECT task_id, amount, postings AS posting_count, r_created, r_updated
                FROM type::thing($tb, $task_id);",
            )
            .query(format!(
                "SELECT seq, amount, type, user_id, reference, created_at FROM {POSTING_TABLE_NAME}
                WHERE escrow=type::thing($tb, $task_id) ORDER BY seq ASC;"
            ))
            .bind(("tb", TABLE_NAME))
            .bind(("task_id", task_id.to_string()))
            .await?;
        let escrow = res.take::<Option<TaskEscrow>>(0)?;
        let history = res.take::<Vec<EscrowPosting>>(1)?;
        Ok(escrow.map(|escrow| TaskEscrow { history, ..escrow }))
    }

    fn build_debit_query<'b>(
        &self,
        query: Query<'b, any::Any>,
        step: usize,
        input: &EscrowPostingInput,
    ) -> Query<'b, any::Any> {
        let not_found = thrown_marker(THROW_ESCROW_NOT_FOUND, step);
        let too_low = thrown_marker(THROW_ESCROW_TOO_LOW, step);
        let posting = Self::posting_sql(step);
        let sql = format!(
            "LET $e_id_{step} = type::thing('{TABLE_NAME}', $e_task_{step});
            LET $e_{step} = (SELECT * FROM $e_id_{step})[0];
            IF $e_{step} == NONE OR $e_{step}.amount == 0 {{ THROW '{not_found}'; }};
            IF $e_{step}.amount < $e_amount_{step} {{ THROW '{too_low}'; }};
            LET $e_delta_{step} = 0 - $e_amount_{step};
            {posting}"
        );
        Self::bind_step(query.query(sql), step, input)
    }

    fn build_credit_query<'b>(
        &self,
        query: Query<'b, any::Any>,
        step: usize,
        input: &EscrowPostingInput,
    ) -> Query<'b, any::Any> {
        let exists = thrown_marker(THROW_ESCROW_EXISTS, step);
        let posting = Self::posting_sql(step);
        let sql = format!(
            "LET $e_id_{step} = type::thing('{TABLE_NAME}', $e_task_{step});
            IF (SELECT VALUE id FROM $e_id_{step})[0] != NONE {{ THROW '{exists}'; }};
            CREATE $e_id_{step} SET task_id=$e_task_{step}, amount=0, postings=0;
            LET $e_{step} = (SELECT * FROM $e_id_{step})[0];
            LET $e_delta_{step} = $e_amount_{step};
            {posting}"
        );
        Self::bind_step(query.query(sql), step, input)
    }
}
