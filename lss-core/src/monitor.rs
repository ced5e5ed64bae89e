//! C10 — Monitoring Views: current-state queries aggregating the latest
//! measurement + Cpk per node.

use crate::providers::{self, DEFAULT_LIMIT};
use crate::store::InMemoryStore;
use crate::tools::spc;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NodeStatus {
    Normal,
    Warning,
    Error,
}

fn status_from_cpk(cpk: Option<f64>) -> NodeStatus {
    match cpk {
        Some(c) if c >= 1.33 => NodeStatus::Normal,
        Some(c) if c >= 1.0 => NodeStatus::Warning,
        _ => NodeStatus::Error,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ParamSeries {
    pub param_code: String,
    pub values: Vec<f64>,
    pub timestamps: Vec<DateTime<Utc>>,
    pub rolling_cpk: Option<f64>,
    pub latest_value: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeMonitor {
    pub node_code: String,
    pub series: Vec<ParamSeries>,
}

/// `node_monitor(node_code)` — last-N measurements per parameter,
/// chart-ready, plus rolling Cpk on the returned window.
pub fn node_monitor(store: &InMemoryStore, node_code: &str) -> Result<NodeMonitor, crate::error::LssError> {
    let ctx = providers::by_process(store, node_code, None, DEFAULT_LIMIT)?;
    let mut series: Vec<ParamSeries> = ctx
        .groups()
        .map(|group| {
            let values: Vec<f64> = group.measurements.iter().map(|m| m.value).collect();
            let timestamps: Vec<DateTime<Utc>> = group.measurements.iter().map(|m| m.timestamp).collect();
            let (usl, lsl, target) = group
                .param
                .as_ref()
                .map(|p| (p.usl, p.lsl, p.target))
                .unwrap_or((None, None, None));
            let rolling_cpk = spc::compute(&values, usl, lsl, target).ok().and_then(|o| o.cpk);
            ParamSeries {
                param_code: group.param_code.clone(),
                latest_value: values.last().copied(),
                values,
                timestamps,
                rolling_cpk,
            }
        })
        .collect();
    series.sort_by(|a, b| a.param_code.cmp(&b.param_code));
    Ok(NodeMonitor { node_code: node_code.to_string(), series })
}

#[derive(Debug, Clone, Serialize)]
pub struct LatestStatusEntry {
    pub node_code: String,
    pub latest_timestamp: Option<DateTime<Utc>>,
    pub status: NodeStatus,
}

/// `latest_status()` — for every Unit node, the last-window Cpk-derived
/// `NodeStatus` used for map-colouring.
pub fn latest_status(store: &InMemoryStore) -> Vec<LatestStatusEntry> {
    let mut entries: Vec<LatestStatusEntry> = store
        .all_unit_nodes()
        .into_iter()
        .map(|node| {
            let monitor = node_monitor(store, &node.code).unwrap_or(NodeMonitor { node_code: node.code.clone(), series: vec![] });
            let latest_timestamp = monitor.series.iter().filter_map(|s| s.timestamps.last().copied()).max();
            let worst_cpk = monitor
                .series
                .iter()
                .filter_map(|s| s.rolling_cpk)
                .fold(None, |acc: Option<f64>, c| Some(acc.map_or(c, |a| a.min(c))));
            LatestStatusEntry { node_code: node.code, latest_timestamp, status: status_from_cpk(worst_cpk) }
        })
        .collect();
    entries.sort_by(|a, b| a.node_code.cmp(&b.node_code));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use lss_schemas::measurement::{Measurement, MeasurementSource};
    use lss_schemas::node::{Node, NodeType};
    use lss_schemas::parameter::{ParameterDataType, ParameterDef, ParameterRole};

    fn store_with_node() -> InMemoryStore {
        let store = InMemoryStore::new();
        store.insert_node(Node { code: "E04".into(), name: "醇提罐".into(), node_type: NodeType::Unit, parent_code: None });
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
        for (i, v) in [85.0, 85.2, 84.9, 85.1].into_iter().enumerate() {
            store
                .record_measurement(Measurement {
                    batch_id: "B1".into(),
                    node_code: "E04".into(),
                    param_code: "temp".into(),
                    value: v,
                    timestamp: Utc::now() + chrono::Duration::seconds(i as i64),
                    source: MeasurementSource::Sensor,
                    recorded_by: None,
                })
                .unwrap();
        }
        store
    }

    #[test]
    fn node_monitor_reports_latest_value_and_cpk() {
        let store = store_with_node();
        let monitor = node_monitor(&store, "E04").unwrap();
        assert_eq!(monitor.series.len(), 1);
        assert_eq!(monitor.series[0].latest_value, Some(85.1));
        assert!(monitor.series[0].rolling_cpk.is_some());
    }

    #[test]
    fn latest_status_derives_normal_for_healthy_node() {
        let store = store_with_node();
        let statuses = latest_status(&store);
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].status, NodeStatus::Normal);
    }
}
