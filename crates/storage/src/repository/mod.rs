pub mod rate_plan;
pub mod rates_history;

pub use rate_plan::RatePlanRepository;
pub use rates_history::RatesHistoryRepository;
