//! Point-in-time capture of the live rates table.
//!
//! Ledger payloads are JSON arrays of camelCase rate plan trees so that
//! consumers can `JSON.parse` them without a schema registry. The structs
//! here define that shape and convert between it and the live row types.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{Result, StorageError};
use crate::models::{RateOffer, RatePlan, TariffCodes};

/// One rate plan tree as persisted inside a ledger entry's `newRecord`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSnapshot {
    pub uid: Uuid,
    pub codes: TariffCodes,
    pub plan_id: Option<String>,
    pub dnsp: i32,
    pub state: String,
    pub tariff: Option<String>,
    #[serde(rename = "type")]
    pub plan_type: String,
    pub vpp: i16,
    pub discount_applies: i16,
    pub discount_percentage: Option<Decimal>,
    pub is_deleted: i16,
    #[serde(default)]
    pub offers: Vec<OfferSnapshot>,
}

/// Captured tariff figures of one rate offer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferSnapshot {
    pub uid: Uuid,
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
}

impl PlanSnapshot {
    pub fn from_live(plan: &RatePlan, offers: &[RateOffer]) -> Self {
        Self {
            uid: plan.uid,
            codes: TariffCodes::parse(&plan.codes),
            plan_id: plan.plan_id.clone(),
            dnsp: plan.dnsp,
            state: plan.state.clone(),
            tariff: plan.tariff.clone(),
            plan_type: plan.plan_type.clone(),
            vpp: plan.vpp,
            discount_applies: plan.discount_applies,
            discount_percentage: plan.discount_percentage,
            is_deleted: plan.is_deleted,
            offers: offers.iter().map(OfferSnapshot::from_live).collect(),
        }
    }
}

impl OfferSnapshot {
    pub fn from_live(offer: &RateOffer) -> Self {
        Self {
            uid: offer.uid,
            offer_name: offer.offer_name.clone(),
            anytime: offer.anytime,
            peak: offer.peak,
            off_peak: offer.off_peak,
            shoulder: offer.shoulder,
            supply_charge: offer.supply_charge,
            cl1_supply: offer.cl1_supply,
            cl1_usage: offer.cl1_usage,
            cl2_supply: offer.cl2_supply,
            cl2_usage: offer.cl2_usage,
            demand: offer.demand,
            demand_op: offer.demand_op,
            demand_p: offer.demand_p,
            demand_s: offer.demand_s,
            fit: offer.fit,
            vpp_orcharge: offer.vpp_orcharge,
        }
    }
}

/// Serialize a set of live plans into the ledger payload shape.
pub fn capture_tree(plans: &[(RatePlan, Vec<RateOffer>)]) -> Vec<PlanSnapshot> {
    plans
        .iter()
        .map(|(plan, offers)| PlanSnapshot::from_live(plan, offers))
        .collect()
}

/// Extract from a ledger payload the subset matching a snapshot scope.
/// `None` means the whole payload.
pub fn subset_for_scope(payload: &Value, scope: Option<Uuid>) -> Value {
    let Some(uid) = scope else {
        return payload.clone();
    };

    let wanted = uid.to_string();
    match payload.as_array() {
        Some(items) => Value::Array(
            items
                .iter()
                .filter(|item| item.get("uid").and_then(Value::as_str) == Some(wanted.as_str()))
                .cloned()
                .collect(),
        ),
        None => Value::Array(Vec::new()),
    }
}

/// Index a ledger payload by plan uid for diffing.
///
/// Fails on payloads that are not an array of objects with a `uid`; callers
/// treat such snapshots as diff-incomparable rather than fatal.
pub fn index_by_uid(payload: &Value) -> Result<HashMap<String, &Value>> {
    let items = payload
        .as_array()
        .ok_or_else(|| StorageError::MalformedSnapshot("payload is not an array".to_string()))?;

    let mut indexed = HashMap::with_capacity(items.len());
    for item in items {
        let uid = item
            .get("uid")
            .and_then(Value::as_str)
            .ok_or_else(|| StorageError::MalformedSnapshot("record without uid".to_string()))?;
        indexed.insert(uid.to_string(), item);
    }
    Ok(indexed)
}

/// Parse a ledger payload back into typed plan trees for restore.
pub fn parse_tree(payload: &Value) -> Result<Vec<PlanSnapshot>> {
    serde_json::from_value(payload.clone())
        .map_err(|e| StorageError::MalformedSnapshot(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn plan_value(uid: &str) -> Value {
        json!({
            "uid": uid,
            "codes": ["6900"],
            "planId": "P-1",
            "dnsp": 3,
            "state": "NSW",
            "tariff": "TOU",
            "type": "Residential",
            "vpp": 0,
            "discountApplies": 0,
            "discountPercentage": null,
            "isDeleted": 0,
            "offers": []
        })
    }

    #[test]
    fn test_subset_for_scope_whole_payload() {
        let payload = json!([plan_value("11111111-1111-1111-1111-111111111111")]);
        assert_eq!(subset_for_scope(&payload, None), payload);
    }

    #[test]
    fn test_subset_for_scope_single_plan() {
        let keep = Uuid::parse_str("11111111-1111-1111-1111-111111111111").unwrap();
        let payload = json!([
            plan_value("11111111-1111-1111-1111-111111111111"),
            plan_value("22222222-2222-2222-2222-222222222222"),
        ]);

        let subset = subset_for_scope(&payload, Some(keep));
        let items = subset.as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["uid"], keep.to_string());
    }

    #[test]
    fn test_index_by_uid_rejects_non_array() {
        assert!(index_by_uid(&json!("not an array")).is_err());
        assert!(index_by_uid(&json!([{"noUid": 1}])).is_err());
    }

    #[test]
    fn test_parse_tree_round_trip() {
        let payload = json!([plan_value("11111111-1111-1111-1111-111111111111")]);
        let plans = parse_tree(&payload).unwrap();
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].state, "NSW");
        assert_eq!(plans[0].codes.as_joined(), "6900");
    }

    #[test]
    fn test_parse_tree_tolerates_string_codes() {
        let mut value = plan_value("11111111-1111-1111-1111-111111111111");
        value["codes"] = json!("6970, 6900");
        let plans = parse_tree(&json!([value])).unwrap();
        assert_eq!(plans[0].codes.as_joined(), "6900,6970");
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let plans = parse_tree(&json!([plan_value("11111111-1111-1111-1111-111111111111")]))
            .unwrap();
        let round = serde_json::to_value(&plans[0]).unwrap();
        assert!(round.get("planId").is_some());
        assert!(round.get("discountApplies").is_some());
        assert!(round.get("type").is_some());
        assert!(round.get("plan_id").is_none());
    }
}
