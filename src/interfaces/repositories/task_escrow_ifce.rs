use async_trait::async_trait;
use surrealdb::engine::any;
use surrealdb::method::Query;

use crate::entities::task_escrow::{EscrowPostingInput, TaskEscrow};

#[async_trait]
pub trait TaskEscrowRepositoryInterface {
    /// Escrow with its full posting history, oldest first.
    async fn get_escrow(&self, task_id: &str) -> Result<Option<TaskEscrow>, surrealdb::Error>;

    fn build_debit_query<'b>(
        &self,
        query: Query<'b, any::Any>,
        step: usize,
        input: &EscrowPostingInput,
    ) -> Query<'b, any::Any>;

    /// Opens the escrow of the task with its first inflow. Throws if the task
    /// already has one.
    fn build_credit_query<'b>(
        &self,
        query: Query<'b, any::Any>,
        step: usize,
        input: &EscrowPostingInput,
    ) -> Query<'b, any::Any>;
}
