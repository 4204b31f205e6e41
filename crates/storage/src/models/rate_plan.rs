use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// A row of the live rates table.
///
/// `codes` holds the canonical comma-joined form produced by
/// [`crate::models::TariffCodes`]; raw representations never reach the
/// database. `vpp`, `discount_applies` and `is_deleted` are 0/1 smallints.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct RatePlan {
    pub uid: Uuid,
    pub codes: String,
    pub plan_id: Option<String>,
    pub dnsp: i32,
    pub state: String,
    pub tariff: Option<String>,
    pub plan_type: String,
    pub vpp: i16,
    pub discount_applies: i16,
    pub discount_percentage: Option<Decimal>,
    pub is_deleted: i16,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}
