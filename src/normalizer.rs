//! Ingress validation for partial metric updates
//!
//! Invalid fields are rejected one by one. Whatever is left of the update
//! still applies, so a single bad value never drops a whole tick.

use serde_json::{Map, Value};
use tracing::{trace, warn};

use crate::{MetricUpdate, ValidatorHealth};

/// A single ingress field that was dropped during normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRejection {
    pub field: String,
    pub reason: String,
}

impl FieldRejection {
    fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Outcome of normalizing one update
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Normalized {
    /// The accepted subset of the update
    pub update: MetricUpdate,

    /// Fields that were dropped, in the order they were inspected
    pub rejected: Vec<FieldRejection>,
}

impl Normalized {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Range-check a typed update.
pub fn normalize(update: MetricUpdate) -> Normalized {
    let mut rejected = vec![];

    let MetricUpdate {
        throughput,
        finality_ms,
        uptime,
        block_height,
        peers,
        mempool,
        network_latency_ms,
        validators,
    } = update;

    let update = MetricUpdate {
        throughput: non_negative("throughput", throughput, &mut rejected),
        finality_ms: non_negative("finality_ms", finality_ms, &mut rejected),
        uptime: percentage("uptime", uptime, &mut rejected),
        block_height,
        peers,
        mempool,
        network_latency_ms: non_negative("network_latency_ms", network_latency_ms, &mut rejected),
        validators: validators.map(|list| validator_list(list, &mut rejected)),
    };

    for rejection in &rejected {
        warn!("rejected field {}: {}", rejection.field, rejection.reason);
    }

    Normalized { update, rejected }
}

/// Type-check and range-check a loosely typed JSON update.
///
/// Both the transport's camelCase keys (`tps`, `blockHeight`, ...) and the
/// snake_case field names are accepted. `null` counts as absent.
pub fn from_json(value: &Value) -> Normalized {
    let Some(object) = value.as_object() else {
        let rejected = vec![FieldRejection::new("update", "expected a JSON object")];
        warn!("rejected metrics update: not a JSON object");
        return Normalized {
            update: MetricUpdate::default(),
            rejected,
        };
    };

    let mut rejected = vec![];

    let typed = MetricUpdate {
        throughput: float_field(object, &["tps", "throughput"], &mut rejected),
        finality_ms: float_field(object, &["finality", "finality_ms"], &mut rejected),
        uptime: float_field(object, &["uptime"], &mut rejected),
        block_height: integer_field(object, &["blockHeight", "block_height"], &mut rejected),
        peers: integer_field(object, &["peers"], &mut rejected).and_then(|peers| {
            u32::try_from(peers)
                .inspect_err(|_| rejected.push(FieldRejection::new("peers", "out of range")))
                .ok()
        }),
        mempool: integer_field(object, &["mempool"], &mut rejected),
        network_latency_ms: float_field(object, &["latency", "network_latency_ms"], &mut rejected),
        validators: validators_field(object, &mut rejected),
    };

    trace!("decoded update from JSON: {typed:?}");

    let mut normalized = normalize(typed);
    rejected.append(&mut normalized.rejected);
    normalized.rejected = rejected;
    normalized
}

fn lookup<'a>(object: &'a Map<String, Value>, keys: &[&'static str]) -> Option<(&'static str, &'a Value)> {
    keys.iter().find_map(|key| {
        object
            .get(*key)
            .filter(|value| !value.is_null())
            .map(|value| (*key, value))
    })
}

fn float_field(
    object: &Map<String, Value>,
    keys: &[&'static str],
    rejected: &mut Vec<FieldRejection>,
) -> Option<f64> {
    let (key, value) = lookup(object, keys)?;
    match value.as_f64() {
        Some(number) => Some(number),
        None => {
            rejected.push(FieldRejection::new(key, "expected a number"));
            None
        }
    }
}

fn integer_field(
    object: &Map<String, Value>,
    keys: &[&'static str],
    rejected: &mut Vec<FieldRejection>,
) -> Option<u64> {
    let (key, value) = lookup(object, keys)?;
    match value.as_u64() {
        Some(number) => Some(number),
        None => {
            rejected.push(FieldRejection::new(key, "expected a non-negative integer"));
            None
        }
    }
}

fn validators_field(
    object: &Map<String, Value>,
    rejected: &mut Vec<FieldRejection>,
) -> Option<Vec<ValidatorHealth>> {
    let (key, value) = lookup(object, &["validators"])?;
    let Some(entries) = value.as_array() else {
        rejected.push(FieldRejection::new(key, "expected an array"));
        return None;
    };

    let mut validators = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let name = entry.get("name").and_then(Value::as_str);
        let health = entry.get("health").and_then(Value::as_f64);
        match (name, health) {
            (Some(name), Some(health)) => validators.push(ValidatorHealth::new(name, health)),
            _ => rejected.push(FieldRejection::new(
                format!("validators[{index}]"),
                "expected {name: string, health: number}",
            )),
        }
    }

    Some(validators)
}

fn non_negative(
    field: &'static str,
    value: Option<f64>,
    rejected: &mut Vec<FieldRejection>,
) -> Option<f64> {
    let value = value?;
    if !value.is_finite() {
        rejected.push(FieldRejection::new(field, format!("{value} is not finite")));
        return None;
    }
    if value < 0.0 {
        rejected.push(FieldRejection::new(field, format!("{value} is negative")));
        return None;
    }
    Some(value)
}

fn percentage(
    field: &'static str,
    value: Option<f64>,
    rejected: &mut Vec<FieldRejection>,
) -> Option<f64> {
    let value = non_negative(field, value, rejected)?;
    if value > 100.0 {
        rejected.push(FieldRejection::new(field, format!("{value} exceeds 100%")));
        return None;
    }
    Some(value)
}

fn validator_list(
    validators: Vec<ValidatorHealth>,
    rejected: &mut Vec<FieldRejection>,
) -> Vec<ValidatorHealth> {
    validators
        .into_iter()
        .enumerate()
        .filter_map(|(index, validator)| {
            let field = format!("validators[{index}]");
            if validator.name.trim().is_empty() {
                rejected.push(FieldRejection::new(field, "validator name is empty"));
                return None;
            }
            if !validator.health.is_finite() || !(0.0..=100.0).contains(&validator.health) {
                rejected.push(FieldRejection::new(
                    field,
                    format!("health {} outside 0-100", validator.health),
                ));
                return None;
            }
            Some(validator)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_valid_update_passes_unchanged() {
        let update = MetricUpdate {
            throughput: Some(512.0),
            uptime: Some(99.95),
            validators: Some(vec![ValidatorHealth::new("alpha", 97.0)]),
            ..Default::default()
        };

        let normalized = normalize(update.clone());
        assert!(normalized.is_clean());
        assert_eq!(normalized.update, update);
    }

    #[test]
    fn test_invalid_field_rejected_others_kept() {
        let update = MetricUpdate {
            throughput: Some(f64::NAN),
            finality_ms: Some(420.0),
            uptime: Some(101.0),
            peers: Some(12),
            ..Default::default()
        };

        let normalized = normalize(update);
        assert_eq!(normalized.update.throughput, None);
        assert_eq!(normalized.update.uptime, None);
        assert_eq!(normalized.update.finality_ms, Some(420.0));
        assert_eq!(normalized.update.peers, Some(12));

        let fields: Vec<_> = normalized.rejected.iter().map(|r| r.field.as_str()).collect();
        assert_eq!(fields, vec!["throughput", "uptime"]);
    }

    #[test]
    fn test_bad_validator_entries_dropped_individually() {
        let update = MetricUpdate {
            validators: Some(vec![
                ValidatorHealth::new("alpha", 95.0),
                ValidatorHealth::new("beta", 140.0),
                ValidatorHealth::new("", 80.0),
            ]),
            ..Default::default()
        };

        let normalized = normalize(update);
        assert_eq!(
            normalized.update.validators,
            Some(vec![ValidatorHealth::new("alpha", 95.0)])
        );
        assert_eq!(normalized.rejected.len(), 2);
    }

    #[test]
    fn test_json_camel_case_keys() {
        let value = json!({
            "tps": 650.5,
            "finality": 300,
            "uptime": 99.9,
            "blockHeight": 1200,
            "peers": 42,
            "mempool": 1500,
            "latency": 35.2,
            "validators": [{ "name": "alpha", "health": 99.0 }]
        });

        let normalized = from_json(&value);
        assert!(normalized.is_clean(), "{:?}", normalized.rejected);
        assert_eq!(normalized.update.throughput, Some(650.5));
        assert_eq!(normalized.update.finality_ms, Some(300.0));
        assert_eq!(normalized.update.block_height, Some(1200));
        assert_eq!(normalized.update.peers, Some(42));
        assert_eq!(normalized.update.network_latency_ms, Some(35.2));
        assert_eq!(normalized.update.validators.unwrap().len(), 1);
    }

    #[test]
    fn test_json_wrong_types_rejected_per_field() {
        let value = json!({
            "tps": "fast",
            "uptime": 99.5,
            "blockHeight": -4,
            "mempool": null,
            "validators": "none"
        });

        let normalized = from_json(&value);
        assert_eq!(normalized.update.uptime, Some(99.5));
        assert_eq!(normalized.update.throughput, None);
        assert_eq!(normalized.update.block_height, None);
        assert_eq!(normalized.update.mempool, None);
        assert_eq!(normalized.update.validators, None);

        let fields: Vec<_> = normalized.rejected.iter().map(|r| r.field.as_str()).collect();
        assert_eq!(fields, vec!["tps", "blockHeight", "validators"]);
    }

    #[test]
    fn test_json_null_alias_falls_through() {
        let value = json!({
            "tps": null,
            "throughput": 500.0,
            "blockHeight": null,
            "block_height": 77
        });

        let normalized = from_json(&value);
        assert!(normalized.is_clean(), "{:?}", normalized.rejected);
        assert_eq!(normalized.update.throughput, Some(500.0));
        assert_eq!(normalized.update.block_height, Some(77));
    }

    #[test]
    fn test_json_non_object_rejected() {
        let normalized = from_json(&json!([1, 2, 3]));
        assert!(normalized.update.is_empty());
        assert_eq!(normalized.rejected[0].field, "update");
    }

    #[test]
    fn test_json_range_errors_reported_after_type_errors() {
        let value = json!({ "peers": "many", "uptime": 150.0 });
        let normalized = from_json(&value);

        let fields: Vec<_> = normalized.rejected.iter().map(|r| r.field.as_str()).collect();
        assert_eq!(fields, vec!["peers", "uptime"]);
    }
}
