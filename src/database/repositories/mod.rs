pub mod task_escrow_repo;
pub mod wallet_repo;
