pub mod task_escrow_ifce;
pub mod wallet_ifce;
