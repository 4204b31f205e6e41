use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Audit tag written by snapshot capture.
pub const AUDIT_SNAPSHOT: &str = "SNAPSHOT";
/// Audit tag written by the restore engine.
pub const AUDIT_RESTORE: &str = "RESTORE";

/// One entry of the append-only rates ledger.
///
/// `new_record` is the JSON array of rate plan trees captured at snapshot
/// time and is immutable once written; `old_record` is the matching subset
/// of the previously active entry, precomputed so diff display never walks
/// the whole ledger. At most one row system-wide has `active_version = 1`,
/// backed by a partial unique index.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct RatesHistoryRecord {
    pub uid: Uuid,
    pub version: i64,
    /// Null for whole-table snapshots, set for single-plan snapshots.
    pub rate_plan_uid: Option<Uuid>,
    pub audit_action: String,
    pub active_version: i16,
    #[schema(value_type = Object)]
    pub new_record: Value,
    #[schema(value_type = Object)]
    pub old_record: Option<Value>,
    pub created_by: Option<String>,
    pub created_by_name: Option<String>,
    pub created_at: NaiveDateTime,
}

/// Insert payload for a new ledger entry. `active_version` always starts
/// at 0; activation is a separate step.
#[derive(Debug, Clone)]
pub struct NewHistoryRecord {
    pub rate_plan_uid: Option<Uuid>,
    pub audit_action: String,
    pub new_record: Value,
    pub old_record: Option<Value>,
    pub created_by: Option<String>,
    pub created_by_name: Option<String>,
}
