//! Field-level change detection between the live rates table and the
//! currently active ledger snapshot.
//!
//! Historic snapshots drift in representation (numbers stored as strings,
//! 0/1 flags stored as booleans, codes in three different shapes), so every
//! comparison goes through an explicit loose-equality function instead of
//! raw JSON equality.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::Value;

use crate::models::TariffCodes;
use crate::snapshot::{self, PlanSnapshot};

/// Plan-level fields compared against the active snapshot.
pub const PLAN_FIELDS: &[&str] = &[
    "state",
    "dnsp",
    "type",
    "tariff",
    "planId",
    "discountApplies",
    "discountPercentage",
    "vpp",
];

/// Tariff fields compared on the first offer of each plan.
pub const OFFER_FIELDS: &[&str] = &[
    "anytime",
    "peak",
    "shoulder",
    "offPeak",
    "supplyCharge",
    "cl1Supply",
    "cl1Usage",
    "cl2Supply",
    "cl2Usage",
    "demand",
    "demandOp",
    "demandP",
    "demandS",
    "fit",
    "vppOrcharge",
];

/// A plan whose live state differs from the active snapshot. Carries the
/// entire old and new trees so consumers can render a full before/after.
#[derive(Debug, Clone)]
pub struct ChangedPlan {
    pub uid: String,
    pub old_record: Value,
    pub new_record: Value,
}

#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    pub has_changes: bool,
    pub changed_uids: Vec<String>,
    pub changes: Vec<ChangedPlan>,
}

/// Compare the live plans against the active snapshot payload.
///
/// With no baseline (`None`, or a payload [`snapshot::index_by_uid`] cannot
/// read) everything is unsaved by definition: `has_changes` is true and
/// every live plan is reported as changed. Output order follows the input
/// order of `live`, so callers get a deterministic result.
pub fn compute_change_set(live: &[PlanSnapshot], active_payload: Option<&Value>) -> ChangeSet {
    let indexed = match active_payload {
        Some(payload) => match snapshot::index_by_uid(payload) {
            Ok(map) => Some(map),
            Err(err) => {
                tracing::warn!(error = %err, "active snapshot is not diff-comparable");
                None
            }
        },
        None => None,
    };

    let mut set = ChangeSet {
        // Nothing to compare against means the whole table is unsaved,
        // even when it is empty.
        has_changes: indexed.is_none(),
        ..ChangeSet::default()
    };

    for plan in live {
        let new_record = serde_json::to_value(plan).unwrap_or(Value::Null);
        let old_record = indexed
            .as_ref()
            .and_then(|map| map.get(plan.uid.to_string().as_str()).copied());

        let changed = match old_record {
            Some(old) => plan_differs(old, &new_record),
            None => true,
        };

        if changed {
            set.changed_uids.push(plan.uid.to_string());
            set.changes.push(ChangedPlan {
                uid: plan.uid.to_string(),
                old_record: old_record.cloned().unwrap_or(Value::Null),
                new_record,
            });
        }
    }

    set.has_changes = set.has_changes || !set.changed_uids.is_empty();
    set
}

fn plan_differs(old: &Value, new: &Value) -> bool {
    for field in PLAN_FIELDS {
        if !loose_eq(old.get(field), new.get(field)) {
            return true;
        }
    }

    if !codes_eq(old.get("codes"), new.get("codes")) {
        return true;
    }

    let old_offer = first_offer(old);
    let new_offer = first_offer(new);
    for field in OFFER_FIELDS {
        let old_value = old_offer.and_then(|offer| offer.get(field));
        let new_value = new_offer.and_then(|offer| offer.get(field));
        if !tariff_eq(old_value, new_value) {
            return true;
        }
    }

    false
}

fn first_offer(record: &Value) -> Option<&Value> {
    record.get("offers").and_then(Value::as_array).and_then(|offers| offers.first())
}

/// Loose equality for plan-level fields: numbers compare as decimals after
/// parsing, booleans as canonical 0/1, everything else as strings.
pub fn loose_eq(old: Option<&Value>, new: Option<&Value>) -> bool {
    let old = old.unwrap_or(&Value::Null);
    let new = new.unwrap_or(&Value::Null);

    match (as_decimal(old), as_decimal(new)) {
        (Some(a), Some(b)) => return a == b,
        (None, None) => {}
        // One side numeric, the other not; only equal when both are null-ish.
        _ => return old.is_null() && new.is_null(),
    }

    match (old, new) {
        (Value::Null, Value::Null) => true,
        (Value::String(a), Value::String(b)) => a == b,
        _ => old == new,
    }
}

/// Equality for offer tariff fields, where null and absent read as 0.
pub fn tariff_eq(old: Option<&Value>, new: Option<&Value>) -> bool {
    let old = old.and_then(|v| as_decimal(v)).unwrap_or(Decimal::ZERO);
    let new = new.and_then(|v| as_decimal(v)).unwrap_or(Decimal::ZERO);
    old == new
}

/// Codes compare after canonicalization, never as raw representations.
pub fn codes_eq(old: Option<&Value>, new: Option<&Value>) -> bool {
    let old = old.map(TariffCodes::from_value).unwrap_or_else(|| TariffCodes::parse(""));
    let new = new.map(TariffCodes::from_value).unwrap_or_else(|| TariffCodes::parse(""));
    old == new
}

fn as_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        Value::Bool(b) => Some(if *b { Decimal::ONE } else { Decimal::ZERO }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::parse_tree;
    use serde_json::json;

    const P1: &str = "11111111-1111-1111-1111-111111111111";
    const P2: &str = "22222222-2222-2222-2222-222222222222";

    fn plan_json(uid: &str, peak: f64) -> Value {
        json!({
            "uid": uid,
            "codes": ["6900", "6970"],
            "planId": "EA010",
            "dnsp": 3,
            "state": "NSW",
            "tariff": "TOU",
            "type": "Residential",
            "vpp": 0,
            "discountApplies": 1,
            "discountPercentage": "2.5",
            "isDeleted": 0,
            "offers": [{
                "uid": "33333333-3333-3333-3333-333333333333",
                "offerName": "Base offer",
                "anytime": null,
                "peak": peak,
                "offPeak": 0.12,
                "shoulder": 0.18,
                "supplyCharge": 0.95,
                "cl1Supply": null,
                "cl1Usage": null,
                "cl2Supply": null,
                "cl2Usage": null,
                "demand": null,
                "demandOp": null,
                "demandP": null,
                "demandS": null,
                "fit": 0.05,
                "vppOrcharge": null
            }]
        })
    }

    fn live_plans(value: Value) -> Vec<PlanSnapshot> {
        parse_tree(&value).unwrap()
    }

    #[test]
    fn test_loose_eq_coerces_numbers() {
        assert!(loose_eq(Some(&json!("1")), Some(&json!(1))));
        assert!(loose_eq(Some(&json!("0.30")), Some(&json!(0.3))));
        assert!(loose_eq(Some(&json!(true)), Some(&json!(1))));
        assert!(loose_eq(Some(&json!(false)), Some(&json!("0"))));
        assert!(!loose_eq(Some(&json!("1")), Some(&json!(2))));
    }

    #[test]
    fn test_loose_eq_null_and_absent() {
        assert!(loose_eq(None, Some(&Value::Null)));
        assert!(loose_eq(None, None));
        assert!(!loose_eq(Some(&json!("NSW")), None));
        assert!(!loose_eq(Some(&json!("")), Some(&Value::Null)));
    }

    #[test]
    fn test_tariff_eq_defaults_to_zero() {
        assert!(tariff_eq(None, Some(&json!(0))));
        assert!(tariff_eq(Some(&Value::Null), Some(&json!("0.0"))));
        assert!(!tariff_eq(None, Some(&json!(0.1))));
    }

    #[test]
    fn test_codes_eq_across_representations() {
        assert!(codes_eq(
            Some(&json!(["6970", "6900"])),
            Some(&json!("6900, 6970"))
        ));
        assert!(!codes_eq(Some(&json!(["6900"])), Some(&json!("6900,6970"))));
    }

    #[test]
    fn test_no_changes_against_identical_snapshot() {
        let payload = json!([plan_json(P1, 0.25), plan_json(P2, 0.30)]);
        let live = live_plans(payload.clone());

        let set = compute_change_set(&live, Some(&payload));
        assert!(!set.has_changes);
        assert!(set.changed_uids.is_empty());
        assert!(set.changes.is_empty());
    }

    #[test]
    fn test_single_field_edit_flags_only_that_plan() {
        let captured = json!([plan_json(P1, 0.25), plan_json(P2, 0.30)]);
        let live = live_plans(json!([plan_json(P1, 0.30), plan_json(P2, 0.30)]));

        let set = compute_change_set(&live, Some(&captured));
        assert!(set.has_changes);
        assert_eq!(set.changed_uids, vec![P1.to_string()]);
        assert_eq!(set.changes.len(), 1);

        // Full before/after trees, not just the changed field.
        let old_peak = &set.changes[0].old_record["offers"][0]["peak"];
        assert!(tariff_eq(Some(old_peak), Some(&json!(0.25))));
        let new_peak = &set.changes[0].new_record["offers"][0]["peak"];
        assert!(tariff_eq(Some(new_peak), Some(&json!(0.30))));
    }

    #[test]
    fn test_plan_level_edit_detected() {
        let captured = json!([plan_json(P1, 0.25)]);
        let mut edited = plan_json(P1, 0.25);
        edited["state"] = json!("VIC");
        let live = live_plans(json!([edited]));

        let set = compute_change_set(&live, Some(&captured));
        assert_eq!(set.changed_uids, vec![P1.to_string()]);
    }

    #[test]
    fn test_representation_drift_is_not_a_change() {
        // Same data, different shapes: string numbers, boolean flags,
        // comma-joined codes.
        let mut drifted = plan_json(P1, 0.25);
        drifted["codes"] = json!("6970,6900");
        drifted["vpp"] = json!(false);
        drifted["discountApplies"] = json!(true);
        drifted["dnsp"] = json!("3");
        drifted["discountPercentage"] = json!(2.5);
        drifted["offers"][0]["peak"] = json!("0.25");

        let live = live_plans(json!([plan_json(P1, 0.25)]));
        let set = compute_change_set(&live, Some(&json!([drifted])));
        assert!(!set.has_changes);
    }

    #[test]
    fn test_plan_missing_from_snapshot_is_changed() {
        let captured = json!([plan_json(P1, 0.25)]);
        let live = live_plans(json!([plan_json(P1, 0.25), plan_json(P2, 0.30)]));

        let set = compute_change_set(&live, Some(&captured));
        assert_eq!(set.changed_uids, vec![P2.to_string()]);
        assert!(set.changes[0].old_record.is_null());
    }

    #[test]
    fn test_no_active_snapshot_marks_everything_unsaved() {
        let live = live_plans(json!([plan_json(P1, 0.25)]));
        let set = compute_change_set(&live, None);
        assert!(set.has_changes);
        assert_eq!(set.changed_uids, vec![P1.to_string()]);

        // Unsaved by definition even with an empty table.
        let empty = compute_change_set(&[], None);
        assert!(empty.has_changes);
        assert!(empty.changed_uids.is_empty());
    }

    #[test]
    fn test_malformed_snapshot_treated_as_no_baseline() {
        let live = live_plans(json!([plan_json(P1, 0.25)]));
        let set = compute_change_set(&live, Some(&json!("not a payload")));
        assert!(set.has_changes);
        assert_eq!(set.changed_uids, vec![P1.to_string()]);
    }

    #[test]
    fn test_missing_offer_compares_as_zeroes() {
        let mut captured = plan_json(P1, 0.0);
        captured["offers"] = json!([]);
        let mut live_value = plan_json(P1, 0.0);
        live_value["offers"][0] = json!({
            "uid": "33333333-3333-3333-3333-333333333333",
            "offerName": "Base offer"
        });
        // Every tariff field absent on both sides reads as 0.
        live_value["offers"][0]["offPeak"] = json!(0);
        let live = live_plans(json!([live_value]));

        let set = compute_change_set(&live, Some(&json!([captured])));
        assert!(!set.has_changes);
    }
}
