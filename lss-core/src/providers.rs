//! C2 — read-only query surface over the store, keyed by analysis
//! dimension. Free functions over a borrowed `InMemoryStore`, mirroring
//! the teacher's preference for plain functions over borrowed state.

use crate::error::LssError;
use crate::store::InMemoryStore;
use chrono::{DateTime, Utc};
use lss_schemas::measurement::Measurement;
use lss_schemas::parameter::ParameterDef;
use std::collections::HashMap;

/// Default bound applied when a caller does not specify `limit` (§4.1:
/// "defaulted to 50-200").
pub const DEFAULT_LIMIT: usize = 100;

/// One (node_code, param_code) group's measurements plus the spec that
/// governs them.
#[derive(Debug, Clone)]
pub struct ParamGroup {
    pub node_code: String,
    pub param_code: String,
    pub param: Option<ParameterDef>,
    pub measurements: Vec<Measurement>,
}

/// A provider-returned bundle of measurements plus their parameter
/// definitions for a given dimension key (§GLOSSARY).
#[derive(Debug, Clone, Default)]
pub struct DataContext {
    pub groups: HashMap<(String, String), ParamGroup>,
}

impl DataContext {
    fn push(&mut self, store: &InMemoryStore, measurement: Measurement) {
        let key = (measurement.node_code.clone(), measurement.param_code.clone());
        let entry = self.groups.entry(key.clone()).or_insert_with(|| ParamGroup {
            node_code: key.0.clone(),
            param_code: key.1.clone(),
            param: store.get_parameter(&key.0, &key.1),
            measurements: Vec::new(),
        });
        entry.measurements.push(measurement);
    }

    pub fn is_empty(&self) -> bool {
        self.groups.values().all(|g| g.measurements.is_empty())
    }

    pub fn groups(&self) -> impl Iterator<Item = &ParamGroup> {
        self.groups.values()
    }
}

fn validate_interval(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Result<(), LssError> {
    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            return Err(LssError::BadRequest(format!(
                "interval start {start} is after end {end}"
            )));
        }
    }
    Ok(())
}

fn in_interval(ts: DateTime<Utc>, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> bool {
    start.map_or(true, |s| ts >= s) && end.map_or(true, |e| ts <= e)
}

fn build_context(
    store: &InMemoryStore,
    measurements: Vec<Measurement>,
) -> DataContext {
    let mut ctx = DataContext::default();
    for m in measurements {
        ctx.push(store, m);
    }
    ctx
}

/// `by_person(operator_id, [start,end])` — measurements where an
/// operator-attributed source recorded them (§4.1). Unknown operator id
/// yields an empty context, not an error.
pub fn by_person(
    store: &InMemoryStore,
    operator_id: &str,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    limit: usize,
) -> Result<DataContext, LssError> {
    validate_interval(start, end)?;
    let operator_id = operator_id.to_string();
    let matches = store.measurements_where(
        |m| m.recorded_by.as_deref() == Some(operator_id.as_str()) && in_interval(m.timestamp, start, end),
        limit,
    );
    Ok(build_context(store, matches))
}

/// `by_batch(batch_id)` — all measurements within one batch.
pub fn by_batch(store: &InMemoryStore, batch_id: &str, limit: usize) -> Result<DataContext, LssError> {
    let batch_id = batch_id.to_string();
    let matches = store.measurements_where(|m| m.batch_id == batch_id, limit);
    Ok(build_context(store, matches))
}

/// `by_process(node_code, [optional param_code])` — all measurements at
/// that node, parameter-scoped if `param_code` given.
pub fn by_process(
    store: &InMemoryStore,
    node_code: &str,
    param_code: Option<&str>,
    limit: usize,
) -> Result<DataContext, LssError> {
    let node_code = node_code.to_string();
    let param_code = param_code.map(|p| p.to_string());
    let matches = store.measurements_where(
        |m| m.node_code == node_code && param_code.as_deref().map_or(true, |p| m.param_code == p),
        limit,
    );
    Ok(build_context(store, matches))
}

/// `by_workshop(block_code)` — union of measurements for all descendant
/// Units.
pub fn by_workshop(store: &InMemoryStore, block_code: &str, limit: usize) -> Result<DataContext, LssError> {
    let units: std::collections::HashSet<String> =
        store.unit_descendants_of(block_code).into_iter().map(|n| n.code).collect();
    let matches = store.measurements_where(|m| units.contains(&m.node_code), limit);
    Ok(build_context(store, matches))
}

/// `by_time([start,end])` — all measurements in the interval.
pub fn by_time(
    store: &InMemoryStore,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    limit: usize,
) -> Result<DataContext, LssError> {
    validate_interval(start, end)?;
    let matches = store.measurements_where(|m| in_interval(m.timestamp, start, end), limit);
    Ok(build_context(store, matches))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lss_schemas::measurement::MeasurementSource;
    use lss_schemas::node::{Node, NodeType};
    use lss_schemas::parameter::{ParameterDataType, ParameterRole};

    fn store_with_measurements() -> InMemoryStore {
        let store = InMemoryStore::new();
        store.insert_node(Node { code: "E04".into(), name: "醇提罐".into(), node_type: NodeType::Unit, parent_code: Some("BLOCK_E".into()) });
        store.insert_node(Node { code: "BLOCK_E".into(), name: "Extraction".into(), node_type: NodeType::Block, parent_code: None });
        store
            .insert_parameter(ParameterDef {
                node_code: "E04".into(),
                code: "temp".into(),
                name: "Temperature".into(),
                unit: "C".into(),
                role: ParameterRole::Output,
                usl: Some(90.0),
                lsl: Some(80.0),
                target: Some(85.0),
                data_type: ParameterDataType::Scalar,
            })
            .unwrap();
        for (i, v) in [85.0, 85.5, 86.0].into_iter().enumerate() {
            store
                .record_measurement(Measurement {
                    batch_id: "BATCH_001".into(),
                    node_code: "E04".into(),
                    param_code: "temp".into(),
                    value: v,
                    timestamp: Utc::now() + chrono::Duration::seconds(i as i64),
                    source: MeasurementSource::Sensor,
                    recorded_by: if i == 0 { Some("op1".into()) } else { None },
                })
                .unwrap();
        }
        store
    }

    #[test]
    fn by_batch_returns_all_points_for_batch() {
        let store = store_with_measurements();
        let ctx = by_batch(&store, "BATCH_001", DEFAULT_LIMIT).unwrap();
        assert!(!ctx.is_empty());
        let group = ctx.groups.get(&("E04".to_string(), "temp".to_string())).unwrap();
        assert_eq!(group.measurements.len(), 3);
        assert!(group.param.is_some());
    }

    #[test]
    fn by_person_filters_to_recorded_by() {
        let store = store_with_measurements();
        let ctx = by_person(&store, "op1", None, None, DEFAULT_LIMIT).unwrap();
        let group = ctx.groups.get(&("E04".to_string(), "temp".to_string())).unwrap();
        assert_eq!(group.measurements.len(), 1);
    }

    #[test]
    fn by_workshop_finds_descendant_unit_measurements() {
        let store = store_with_measurements();
        let ctx = by_workshop(&store, "BLOCK_E", DEFAULT_LIMIT).unwrap();
        assert!(!ctx.is_empty());
    }

    #[test]
    fn unknown_batch_is_empty_not_error() {
        let store = store_with_measurements();
        let ctx = by_batch(&store, "NOPE", DEFAULT_LIMIT).unwrap();
        assert!(ctx.is_empty());
    }

    #[test]
    fn malformed_interval_is_bad_request() {
        let store = store_with_measurements();
        let start = Utc::now();
        let end = start - chrono::Duration::seconds(10);
        let err = by_time(&store, Some(start), Some(end), DEFAULT_LIMIT);
        assert!(err.is_err());
    }
}
