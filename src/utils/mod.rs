pub mod money;
pub mod stripe_top_up;
