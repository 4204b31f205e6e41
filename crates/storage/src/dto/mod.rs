pub mod common;
pub mod rates_history;
