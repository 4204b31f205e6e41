pub mod rate_offer;
pub mod rate_plan;
pub mod rates_history;
pub mod tariff_codes;

pub use rate_offer::RateOffer;
pub use rate_plan::RatePlan;
pub use rates_history::{AUDIT_RESTORE, AUDIT_SNAPSHOT, NewHistoryRecord, RatesHistoryRecord};
pub use tariff_codes::TariffCodes;
