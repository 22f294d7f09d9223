use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::info;

use crate::entities::wallet::{PostingTotal, WalletHistory, WalletSummary};
use crate::interfaces::repositories::wallet_ifce::WalletRepositoryInterface;
use crate::middleware::error::{AppError, AppResult};

/// Read side of the wallet ledger. Reads may trail an in-flight transfer.
#[derive(Debug)]
pub struct WalletService<W> {
    wallets: Arc<W>,
    max_page_size: u64,
}

impl<W> WalletService<W>
where
    W: WalletRepositoryInterface + Send + Sync,
{
    pub fn new(wallets: Arc<W>, max_page_size: u64) -> Self {
        Self {
            wallets,
            max_page_size,
        }
    }

    pub async fn get_balance(&self, user_id: &str) -> AppResult<i64> {
        check_user_id(user_id)?;
        let wallet = self.wallets.get_wallet(user_id).await?;
        Ok(wallet.map_or(0, |w| w.balance))
    }

    /// Page `page` (1-based) of the wallet history, newest first.
    pub async fn get_history(
        &self,
        user_id: &str,
        page: u64,
        page_size: u64,
    ) -> AppResult<WalletHistory> {
        check_user_id(user_id)?;
        if page == 0 {
            return Err(AppError::validation("page starts at 1"));
        }
        if page_size == 0 || page_size > self.max_page_size {
            return Err(AppError::validation(format!(
                "page size must be between 1 and {}",
                self.max_page_size
            )));
        }

        let Some(wallet) = self.wallets.get_wallet(user_id).await? else {
            return Ok(WalletHistory {
                history: vec![],
                count: 0,
            });
        };
        let start = (page - 1).saturating_mul(page_size);
        let history = if start >= wallet.posting_count {
            vec![]
        } else {
            self.wallets.get_history(user_id, start, page_size).await?
        };
        Ok(WalletHistory {
            history,
            count: wallet.posting_count,
        })
    }

    /// Balance plus the total booked per posting type.
    pub async fn get_summary(&self, user_id: &str) -> AppResult<WalletSummary> {
        check_user_id(user_id)?;
        let balance = self.get_balance(user_id).await?;
        let mut totals: BTreeMap<String, PostingTotal> = BTreeMap::new();
        for posting in self.wallets.get_postings(user_id).await? {
            totals
                .entry(posting.r#type.to_string())
                .or_insert(PostingTotal {
                    r#type: posting.r#type,
                    total: 0,
                })
                .total += posting.amount;
        }
        Ok(WalletSummary {
            user_id: user_id.to_string(),
            balance,
            totals: totals.into_values().collect(),
        })
    }

    /// Makes sure every user has a wallet. Returns how many were created.
    pub async fn provision_wallets(&self, user_ids: &[String]) -> AppResult<u64> {
        let mut created = 0;
        for user_id in user_ids {
            check_user_id(user_id)?;
            if self.wallets.create_if_missing(user_id).await? {
                created += 1;
            }
        }
        info!(requested = user_ids.len(), created, "wallets provisioned");
        Ok(created)
    }
}

fn check_user_id(user_id: &str) -> AppResult<()> {
    if user_id.trim().is_empty() {
        return Err(AppError::validation("user id is required"));
    }
    Ok(())
}
