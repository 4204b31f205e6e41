use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::error::{Result, StorageError};
use crate::models::{NewHistoryRecord, RatesHistoryRecord};

const HISTORY_COLUMNS: &str = "uid, version, rate_plan_uid, audit_action, active_version, \
     new_record, old_record, created_by, created_by_name, created_at";

/// Repository for the append-only rates ledger.
pub struct RatesHistoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> RatesHistoryRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_uid(&self, uid: Uuid) -> Result<RatesHistoryRecord> {
        let record = sqlx::query_as::<_, RatesHistoryRecord>(&format!(
            "SELECT {HISTORY_COLUMNS} FROM rates_history WHERE uid = $1"
        ))
        .bind(uid)
        .fetch_optional(self.pool)
        .await?
        .ok_or(StorageError::NotFound)?;

        Ok(record)
    }

    /// The entry change detection compares against, if any.
    pub async fn find_active(&self) -> Result<Option<RatesHistoryRecord>> {
        let record = sqlx::query_as::<_, RatesHistoryRecord>(&format!(
            "SELECT {HISTORY_COLUMNS} FROM rates_history WHERE active_version = 1"
        ))
        .fetch_optional(self.pool)
        .await?;

        Ok(record)
    }

    /// Append a ledger entry. The version label is assigned inside the
    /// insert itself, so two concurrent captures cannot take the same one
    /// (the unique index on `version` rejects the loser, surfaced as a
    /// conflict).
    pub async fn insert(&self, new: &NewHistoryRecord) -> Result<RatesHistoryRecord> {
        let mut conn = self.pool.acquire().await?;
        Self::insert_on(&mut conn, new).await
    }

    /// Same as [`Self::insert`] but on an existing connection, used by the
    /// restore transaction.
    pub async fn insert_on(
        conn: &mut PgConnection,
        new: &NewHistoryRecord,
    ) -> Result<RatesHistoryRecord> {
        let record = sqlx::query_as::<_, RatesHistoryRecord>(&format!(
            "INSERT INTO rates_history (uid, version, rate_plan_uid, audit_action, \
                 active_version, new_record, old_record, created_by, created_by_name) \
             SELECT $1, COALESCE(MAX(version), 0) + 1, $2, $3, 0, $4, $5, $6, $7 \
             FROM rates_history \
             RETURNING {HISTORY_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(new.rate_plan_uid)
        .bind(&new.audit_action)
        .bind(&new.new_record)
        .bind(&new.old_record)
        .bind(&new.created_by)
        .bind(&new.created_by_name)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| {
            let err = StorageError::from(e);
            if err.is_unique_violation() {
                StorageError::Conflict("Concurrent snapshot capture".to_string())
            } else {
                err
            }
        })?;

        Ok(record)
    }

    /// Paginated ledger listing, newest version first.
    pub async fn list(
        &self,
        rate_plan_uid: Option<Uuid>,
        audit_action: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<RatesHistoryRecord>, i64)> {
        let mut count_query: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM rates_history WHERE 1 = 1");
        push_filters(&mut count_query, rate_plan_uid, audit_action);
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(self.pool)
            .await?;

        let mut query: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {HISTORY_COLUMNS} FROM rates_history WHERE 1 = 1"
        ));
        push_filters(&mut query, rate_plan_uid, audit_action);
        query.push(" ORDER BY version DESC LIMIT ");
        query.push_bind(limit);
        query.push(" OFFSET ");
        query.push_bind(offset);

        let records = query
            .build_query_as::<RatesHistoryRecord>()
            .fetch_all(self.pool)
            .await?;

        Ok((records, total))
    }

    /// Atomically move the active flag to the given entry.
    ///
    /// Clear-then-set in one transaction keeps the at-most-one-active
    /// invariant; racing callers serialize on the row locks and the last
    /// committer wins.
    pub async fn set_active(&self, uid: Uuid) -> Result<RatesHistoryRecord> {
        let mut tx = self.pool.begin().await?;
        let record = Self::set_active_on(&mut tx, uid).await?;
        tx.commit().await?;
        Ok(record)
    }

    /// Same as [`Self::set_active`] but inside the caller's transaction,
    /// used as the final step of restore.
    pub async fn set_active_on(conn: &mut PgConnection, uid: Uuid) -> Result<RatesHistoryRecord> {
        sqlx::query("UPDATE rates_history SET active_version = 0 WHERE active_version = 1")
            .execute(&mut *conn)
            .await?;

        let record = sqlx::query_as::<_, RatesHistoryRecord>(&format!(
            "UPDATE rates_history SET active_version = 1 WHERE uid = $1 \
             RETURNING {HISTORY_COLUMNS}"
        ))
        .bind(uid)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(StorageError::NotFound)?;

        Ok(record)
    }

    /// Active entry lookup on an existing connection (restore uses this to
    /// precompute the new ledger entry's `old_record` inside its own
    /// transaction).
    pub async fn find_active_on(conn: &mut PgConnection) -> Result<Option<RatesHistoryRecord>> {
        let record = sqlx::query_as::<_, RatesHistoryRecord>(&format!(
            "SELECT {HISTORY_COLUMNS} FROM rates_history WHERE active_version = 1"
        ))
        .fetch_optional(&mut *conn)
        .await?;

        Ok(record)
    }
}

fn push_filters(
    query: &mut QueryBuilder<'_, Postgres>,
    rate_plan_uid: Option<Uuid>,
    audit_action: Option<&str>,
) {
    if let Some(uid) = rate_plan_uid {
        query.push(" AND rate_plan_uid = ");
        query.push_bind(uid);
    }
    if let Some(action) = audit_action {
        query.push(" AND audit_action = ");
        query.push_bind(action.to_string());
    }
}
