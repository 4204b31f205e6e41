use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::diff::{ChangeSet, ChangedPlan};
use crate::dto::common::{PaginationParams, default_limit, default_page};
use crate::models::{AUDIT_RESTORE, AUDIT_SNAPSHOT, RatesHistoryRecord};

/// Request payload for capturing a snapshot of the live rates table.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateSnapshotRequest {
    /// Omit to capture every live plan; set to scope the capture to one plan.
    pub rate_plan_uid: Option<Uuid>,

    #[serde(default = "default_audit_action")]
    #[validate(custom(function = "validate_audit_action"))]
    pub audit_action: String,

    #[validate(length(min = 1, max = 255, message = "created_by is required"))]
    pub created_by: String,

    #[validate(length(max = 255))]
    pub created_by_name: Option<String>,
}

fn default_audit_action() -> String {
    AUDIT_SNAPSHOT.to_string()
}

fn validate_audit_action(action: &str) -> Result<(), validator::ValidationError> {
    if action == AUDIT_SNAPSHOT || action == AUDIT_RESTORE {
        Ok(())
    } else {
        Err(validator::ValidationError::new("invalid_audit_action"))
    }
}

/// Optional author attribution for a restore.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct RestoreRequest {
    #[validate(length(min = 1, max = 255))]
    pub created_by: Option<String>,

    #[validate(length(max = 255))]
    pub created_by_name: Option<String>,
}

/// Ledger listing filters.
#[derive(Debug, Deserialize, IntoParams)]
pub struct HistoryListParams {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
    pub rate_plan_uid: Option<Uuid>,
    pub audit_action: Option<String>,
}

impl HistoryListParams {
    pub fn pagination(&self) -> PaginationParams {
        PaginationParams {
            page: self.page,
            limit: self.limit,
        }
    }
}

/// Ledger entry without its JSON payloads, as returned by the mutating
/// operations and the paginated listing.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HistoryRecordResponse {
    pub uid: Uuid,
    pub version: i64,
    pub rate_plan_uid: Option<Uuid>,
    pub audit_action: String,
    pub active_version: i16,
    pub created_by: Option<String>,
    pub created_by_name: Option<String>,
    pub created_at: NaiveDateTime,
}

impl From<RatesHistoryRecord> for HistoryRecordResponse {
    fn from(record: RatesHistoryRecord) -> Self {
        Self {
            uid: record.uid,
            version: record.version,
            rate_plan_uid: record.rate_plan_uid,
            audit_action: record.audit_action,
            active_version: record.active_version,
            created_by: record.created_by,
            created_by_name: record.created_by_name,
            created_at: record.created_at,
        }
    }
}

/// Single ledger entry with its captured payloads for before/after display.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HistoryDetailResponse {
    pub uid: Uuid,
    #[schema(value_type = Object)]
    pub new_record: Value,
    #[schema(value_type = Object)]
    pub old_record: Option<Value>,
}

impl From<RatesHistoryRecord> for HistoryDetailResponse {
    fn from(record: RatesHistoryRecord) -> Self {
        Self {
            uid: record.uid,
            new_record: record.new_record,
            old_record: record.old_record,
        }
    }
}

/// One changed plan with its full before/after trees.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChangedRatePlanResponse {
    pub uid: String,
    #[schema(value_type = Object)]
    pub old_record: Value,
    #[schema(value_type = Object)]
    pub new_record: Value,
}

impl From<ChangedPlan> for ChangedRatePlanResponse {
    fn from(change: ChangedPlan) -> Self {
        Self {
            uid: change.uid,
            old_record: change.old_record,
            new_record: change.new_record,
        }
    }
}

/// Aggregate change report for the live table.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChangesResponse {
    pub has_changes: bool,
    pub changed_rate_plan_uids: Vec<String>,
    pub changes: Vec<ChangedRatePlanResponse>,
}

impl From<ChangeSet> for ChangesResponse {
    fn from(set: ChangeSet) -> Self {
        Self {
            has_changes: set.has_changes,
            changed_rate_plan_uids: set.changed_uids,
            changes: set
                .changes
                .into_iter()
                .map(ChangedRatePlanResponse::from)
                .collect(),
        }
    }
}

/// Result envelope for restore.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RestoreResponse {
    pub success: bool,
    /// Plans written back from the snapshot.
    pub restored: u64,
    /// Plans skipped because they no longer exist and the configured
    /// restore policy does not recreate them.
    pub skipped: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_audit_action_is_snapshot() {
        let req: CreateSnapshotRequest =
            serde_json::from_str(r#"{"created_by": "u-1"}"#).unwrap();
        assert_eq!(req.audit_action, AUDIT_SNAPSHOT);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_unknown_audit_action_rejected() {
        let req: CreateSnapshotRequest =
            serde_json::from_str(r#"{"created_by": "u-1", "audit_action": "DELETE"}"#).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_empty_author_rejected() {
        let req: CreateSnapshotRequest =
            serde_json::from_str(r#"{"created_by": ""}"#).unwrap();
        assert!(req.validate().is_err());
    }
}
