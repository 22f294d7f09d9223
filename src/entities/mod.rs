pub mod task;
pub mod task_escrow;
pub mod wallet;
