pub mod database;
pub mod metrics;
pub mod payouts;
pub mod transfer;

pub use database::Database;
pub use metrics::{get_metrics, init_metrics};
pub use payouts::PayoutService;
pub use transfer::TransferClient;
