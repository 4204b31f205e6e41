use std::collections::HashMap;

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{Result, StorageError};
use crate::models::{RateOffer, RatePlan};
use crate::snapshot::PlanSnapshot;

const PLAN_COLUMNS: &str = "uid, codes, plan_id, dnsp, state, tariff, plan_type, vpp, \
     discount_applies, discount_percentage, is_deleted, created_at, updated_at";

const OFFER_COLUMNS: &str = "uid, rate_plan_uid, offer_name, anytime, peak, off_peak, shoulder, \
     supply_charge, cl1_supply, cl1_usage, cl2_supply, cl2_usage, demand, demand_op, demand_p, \
     demand_s, fit, vpp_orcharge, created_at, updated_at";

/// Repository for the live rates table (rate plans and their offers).
pub struct RatePlanRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> RatePlanRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All live (not soft-deleted) plans with their offers, ordered by uid
    /// so downstream diffs are deterministic.
    pub async fn list_live_with_offers(&self) -> Result<Vec<(RatePlan, Vec<RateOffer>)>> {
        let plans = sqlx::query_as::<_, RatePlan>(&format!(
            "SELECT {PLAN_COLUMNS} FROM rate_plans WHERE is_deleted = 0 ORDER BY uid"
        ))
        .fetch_all(self.pool)
        .await?;

        let offers = sqlx::query_as::<_, RateOffer>(&format!(
            "SELECT {OFFER_COLUMNS} FROM rate_offers ORDER BY rate_plan_uid, created_at, uid"
        ))
        .fetch_all(self.pool)
        .await?;

        let mut by_plan: HashMap<Uuid, Vec<RateOffer>> = HashMap::new();
        for offer in offers {
            by_plan.entry(offer.rate_plan_uid).or_default().push(offer);
        }

        Ok(plans
            .into_iter()
            .map(|plan| {
                let offers = by_plan.remove(&plan.uid).unwrap_or_default();
                (plan, offers)
            })
            .collect())
    }

    /// One live plan with its offers.
    pub async fn find_live_with_offers(&self, uid: Uuid) -> Result<(RatePlan, Vec<RateOffer>)> {
        let plan = sqlx::query_as::<_, RatePlan>(&format!(
            "SELECT {PLAN_COLUMNS} FROM rate_plans WHERE uid = $1 AND is_deleted = 0"
        ))
        .bind(uid)
        .fetch_optional(self.pool)
        .await?
        .ok_or(StorageError::NotFound)?;

        let offers = sqlx::query_as::<_, RateOffer>(&format!(
            "SELECT {OFFER_COLUMNS} FROM rate_offers WHERE rate_plan_uid = $1 \
             ORDER BY created_at, uid"
        ))
        .bind(uid)
        .fetch_all(self.pool)
        .await?;

        Ok((plan, offers))
    }

    /// Write one captured plan tree back into the live table.
    ///
    /// Runs inside the caller's restore transaction. Returns false when the
    /// plan no longer exists and `recreate_missing` is off; the plan is
    /// skipped in that case. Only the first captured offer is written back,
    /// matching what change detection compares.
    pub async fn restore_plan(
        conn: &mut PgConnection,
        snap: &PlanSnapshot,
        recreate_missing: bool,
    ) -> Result<bool> {
        if !recreate_missing {
            let exists = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM rate_plans WHERE uid = $1",
            )
            .bind(snap.uid)
            .fetch_one(&mut *conn)
            .await?;

            if exists == 0 {
                return Ok(false);
            }
        }

        sqlx::query(
            "INSERT INTO rate_plans (uid, codes, plan_id, dnsp, state, tariff, plan_type, \
                 vpp, discount_applies, discount_percentage, is_deleted) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             ON CONFLICT (uid) DO UPDATE SET \
                 codes = EXCLUDED.codes, \
                 plan_id = EXCLUDED.plan_id, \
                 dnsp = EXCLUDED.dnsp, \
                 state = EXCLUDED.state, \
                 tariff = EXCLUDED.tariff, \
                 plan_type = EXCLUDED.plan_type, \
                 vpp = EXCLUDED.vpp, \
                 discount_applies = EXCLUDED.discount_applies, \
                 discount_percentage = EXCLUDED.discount_percentage, \
                 is_deleted = EXCLUDED.is_deleted, \
                 updated_at = NOW()",
        )
        .bind(snap.uid)
        .bind(snap.codes.as_joined())
        .bind(&snap.plan_id)
        .bind(snap.dnsp)
        .bind(&snap.state)
        .bind(&snap.tariff)
        .bind(&snap.plan_type)
        .bind(snap.vpp)
        .bind(snap.discount_applies)
        .bind(snap.discount_percentage)
        .bind(snap.is_deleted)
        .execute(&mut *conn)
        .await?;

        if let Some(offer) = snap.offers.first() {
            sqlx::query(
                "INSERT INTO rate_offers (uid, rate_plan_uid, offer_name, anytime, peak, \
                     off_peak, shoulder, supply_charge, cl1_supply, cl1_usage, cl2_supply, \
                     cl2_usage, demand, demand_op, demand_p, demand_s, fit, vpp_orcharge) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, \
                     $16, $17, $18) \
                 ON CONFLICT (uid) DO UPDATE SET \
                     rate_plan_uid = EXCLUDED.rate_plan_uid, \
                     offer_name = EXCLUDED.offer_name, \
                     anytime = EXCLUDED.anytime, \
                     peak = EXCLUDED.peak, \
                     off_peak = EXCLUDED.off_peak, \
                     shoulder = EXCLUDED.shoulder, \
                     supply_charge = EXCLUDED.supply_charge, \
                     cl1_supply = EXCLUDED.cl1_supply, \
                     cl1_usage = EXCLUDED.cl1_usage, \
                     cl2_supply = EXCLUDED.cl2_supply, \
                     cl2_usage = EXCLUDED.cl2_usage, \
                     demand = EXCLUDED.demand, \
                     demand_op = EXCLUDED.demand_op, \
                     demand_p = EXCLUDED.demand_p, \
                     demand_s = EXCLUDED.demand_s, \
                     fit = EXCLUDED.fit, \
                     vpp_orcharge = EXCLUDED.vpp_orcharge, \
                     updated_at = NOW()",
            )
            .bind(offer.uid)
            .bind(snap.uid)
            .bind(&offer.offer_name)
            .bind(offer.anytime)
            .bind(offer.peak)
            .bind(offer.off_peak)
            .bind(offer.shoulder)
            .bind(offer.supply_charge)
            .bind(offer.cl1_supply)
            .bind(offer.cl1_usage)
            .bind(offer.cl2_supply)
            .bind(offer.cl2_usage)
            .bind(offer.demand)
            .bind(offer.demand_op)
            .bind(offer.demand_p)
            .bind(offer.demand_s)
            .bind(offer.fit)
            .bind(offer.vpp_orcharge)
            .execute(&mut *conn)
            .await?;
        }

        Ok(true)
    }
}
