//! Versioning engine for the live rates table: snapshot capture, the
//! active-version pointer, change detection and atomic restore.

use std::str::FromStr;

use sqlx::PgPool;
use uuid::Uuid;

use crate::diff::{self, ChangeSet};
use crate::dto::rates_history::{
    CreateSnapshotRequest, HistoryListParams, RestoreRequest, RestoreResponse,
};
use crate::error::{Result, StorageError};
use crate::models::{AUDIT_RESTORE, NewHistoryRecord, RatesHistoryRecord};
use crate::repository::{RatePlanRepository, RatesHistoryRepository};
use crate::snapshot::{self, PlanSnapshot};

/// What restore does with plans that were hard-deleted after the snapshot
/// was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RestorePolicy {
    /// Recreate the row from the captured tree.
    #[default]
    Recreate,
    /// Leave it deleted and skip that part of the snapshot.
    Skip,
}

impl FromStr for RestorePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "recreate" => Ok(Self::Recreate),
            "skip" => Ok(Self::Skip),
            other => Err(format!("unknown restore policy '{other}'")),
        }
    }
}

/// Capture the live table (or one plan) into a new ledger entry.
///
/// The entry is persisted with `active_version = 0`; capturing never
/// implicitly activates. `old_record` is precomputed from the currently
/// active entry so later diff display does not walk the ledger.
pub async fn create_snapshot(
    pool: &PgPool,
    req: &CreateSnapshotRequest,
) -> Result<RatesHistoryRecord> {
    let plan_repo = RatePlanRepository::new(pool);

    let live = match req.rate_plan_uid {
        None => plan_repo.list_live_with_offers().await?,
        Some(uid) => {
            let plan = plan_repo.find_live_with_offers(uid).await.map_err(|e| match e {
                StorageError::NotFound => {
                    StorageError::Validation(format!("unknown rate plan {uid}"))
                }
                other => other,
            })?;
            vec![plan]
        }
    };

    let tree = snapshot::capture_tree(&live);
    let new_record = serde_json::to_value(&tree)
        .map_err(|e| StorageError::MalformedSnapshot(e.to_string()))?;

    let history_repo = RatesHistoryRepository::new(pool);
    let old_record = history_repo
        .find_active()
        .await?
        .map(|active| snapshot::subset_for_scope(&active.new_record, req.rate_plan_uid));

    let record = history_repo
        .insert(&NewHistoryRecord {
            rate_plan_uid: req.rate_plan_uid,
            audit_action: req.audit_action.clone(),
            new_record,
            old_record,
            created_by: Some(req.created_by.clone()),
            created_by_name: req.created_by_name.clone(),
        })
        .await?;

    tracing::info!(
        uid = %record.uid,
        version = record.version,
        action = %record.audit_action,
        plans = tree.len(),
        "captured rates snapshot"
    );

    Ok(record)
}

/// Move the active-version pointer to the given ledger entry.
///
/// Only ledger metadata changes; the live table is untouched. The set of
/// "changed" plans can shift immediately, since change detection compares
/// against whichever entry is active.
pub async fn set_active_version(pool: &PgPool, uid: Uuid) -> Result<RatesHistoryRecord> {
    let record = RatesHistoryRepository::new(pool).set_active(uid).await?;

    tracing::info!(uid = %record.uid, version = record.version, "activated rates version");

    Ok(record)
}

/// Compare the live table against the active snapshot.
///
/// Read-only and deterministic: same live rows and same active entry give
/// the same report. With no active entry everything counts as unsaved.
pub async fn compute_changes(pool: &PgPool) -> Result<ChangeSet> {
    let live = RatePlanRepository::new(pool).list_live_with_offers().await?;
    let live_snaps: Vec<PlanSnapshot> = live
        .iter()
        .map(|(plan, offers)| PlanSnapshot::from_live(plan, offers))
        .collect();

    let active = RatesHistoryRepository::new(pool).find_active().await?;

    Ok(diff::compute_change_set(
        &live_snaps,
        active.as_ref().map(|record| &record.new_record),
    ))
}

/// Overwrite the live table with a ledger entry's captured trees, append a
/// RESTORE entry, and mark the restored entry active — all in one
/// transaction, so a failed rewrite never leaves a half-restored table or
/// a stale active pointer.
pub async fn restore_snapshot(
    pool: &PgPool,
    uid: Uuid,
    policy: RestorePolicy,
    req: &RestoreRequest,
) -> Result<RestoreResponse> {
    let history_repo = RatesHistoryRepository::new(pool);
    let target = history_repo.find_by_uid(uid).await?;
    let plans = snapshot::parse_tree(&target.new_record)?;

    let mut tx = pool.begin().await?;

    let mut restored = 0u64;
    let mut skipped = 0u64;
    for plan in &plans {
        let written = RatePlanRepository::restore_plan(
            &mut tx,
            plan,
            policy == RestorePolicy::Recreate,
        )
        .await?;
        if written {
            restored += 1;
        } else {
            skipped += 1;
        }
    }

    let prior_active = RatesHistoryRepository::find_active_on(&mut tx).await?;
    let old_record = prior_active
        .map(|active| snapshot::subset_for_scope(&active.new_record, target.rate_plan_uid));

    RatesHistoryRepository::insert_on(
        &mut tx,
        &NewHistoryRecord {
            rate_plan_uid: target.rate_plan_uid,
            audit_action: AUDIT_RESTORE.to_string(),
            new_record: target.new_record.clone(),
            old_record,
            created_by: req.created_by.clone(),
            created_by_name: req.created_by_name.clone(),
        },
    )
    .await?;

    // Activation is the last step; it cannot land without the rewrite.
    RatesHistoryRepository::set_active_on(&mut tx, target.uid).await?;

    tx.commit().await?;

    tracing::info!(
        uid = %target.uid,
        version = target.version,
        restored,
        skipped,
        "restored rates snapshot"
    );

    Ok(RestoreResponse {
        success: true,
        restored,
        skipped,
    })
}

/// Paginated ledger listing with optional plan and action filters.
pub async fn list_history(
    pool: &PgPool,
    params: &HistoryListParams,
) -> Result<(Vec<RatesHistoryRecord>, i64)> {
    params
        .pagination()
        .validate()
        .map_err(StorageError::Validation)?;

    RatesHistoryRepository::new(pool)
        .list(
            params.rate_plan_uid,
            params.audit_action.as_deref(),
            i64::from(params.limit),
            params.pagination().offset(),
        )
        .await
}

/// One ledger entry with its captured payloads.
pub async fn get_history_record(pool: &PgPool, uid: Uuid) -> Result<RatesHistoryRecord> {
    RatesHistoryRepository::new(pool).find_by_uid(uid).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restore_policy_from_str() {
        assert_eq!("recreate".parse::<RestorePolicy>(), Ok(RestorePolicy::Recreate));
        assert_eq!("SKIP".parse::<RestorePolicy>(), Ok(RestorePolicy::Skip));
        assert!("drop".parse::<RestorePolicy>().is_err());
    }

    #[test]
    fn test_restore_policy_default_recreates() {
        assert_eq!(RestorePolicy::default(), RestorePolicy::Recreate);
    }
}
