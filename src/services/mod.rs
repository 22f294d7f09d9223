pub mod escrow_service;
pub mod top_up_service;
pub mod transfer_executor;
pub mod wallet_service;
