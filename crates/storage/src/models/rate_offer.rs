use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Tariff figures attached to a rate plan. All money fields are nullable
/// and read as 0 when absent.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct RateOffer {
    pub uid: Uuid,
    pub rate_plan_uid: Uuid,
    pub offer_name: Option<String>,
    pub anytime: Option<Decimal>,
    pub peak: Option<Decimal>,
    pub off_peak: Option<Decimal>,
    pub shoulder: Option<Decimal>,
    pub supply_charge: Option<Decimal>,
    pub cl1_supply: Option<Decimal>,
    pub cl1_usage: Option<Decimal>,
    pub cl2_supply: Option<Decimal>,
    pub cl2_usage: Option<Decimal>,
    pub demand: Option<Decimal>,
    pub demand_op: Option<Decimal>,
    pub demand_p: Option<Decimal>,
    pub demand_s: Option<Decimal>,
    pub fit: Option<Decimal>,
    pub vpp_orcharge: Option<Decimal>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}
