pub mod onsen_logs;
pub mod pool;

#[cfg(test)]
pub mod memory;

pub use onsen_logs::{OnsenLogRepository, PgOnsenLogRepository};
pub use pool::create_pool;
