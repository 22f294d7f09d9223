use async_trait::async_trait;
use surrealdb::engine::any;
use surrealdb::method::Query;

use crate::entities::wallet::{Wallet, WalletPosting, WalletPostingInput, WalletPostingType};

#[async_trait]
pub trait WalletRepositoryInterface {
    async fn get_wallet(&self, user_id: &str) -> Result<Option<Wallet>, surrealdb::Error>;

    /// Newest postings first.
    async fn get_history(
        &self,
        user_id: &str,
        start: u64,
        limit: u64,
    ) -> Result<Vec<WalletPosting>, surrealdb::Error>;

    async fn get_postings(&self, user_id: &str) -> Result<Vec<WalletPosting>, surrealdb::Error>;

    async fn find_by_reference(
        &self,
        user_id: &str,
        r#type: WalletPostingType,
        reference: &str,
    ) -> Result<Option<WalletPosting>, surrealdb::Error>;

    /// Creates an empty wallet when none exists. Returns true if it was created.
    async fn create_if_missing(&self, user_id: &str) -> Result<bool, surrealdb::Error>;

    fn build_debit_query<'b>(
        &self,
        query: Query<'b, any::Any>,
        step: usize,
        input: &WalletPostingInput,
    ) -> Query<'b, any::Any>;

    fn build_credit_query<'b>(
        &self,
        query: Query<'b, any::Any>,
        step: usize,
        input: &WalletPostingInput,
    ) -> Query<'b, any::Any>;
}
