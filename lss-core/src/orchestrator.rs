//! C6 — Orchestrator: per-dimension entry points producing an
//! `AnalysisReport`.

use crate::decision::DecisionEngine;
use crate::error::LssError;
use crate::providers::{self, DataContext, DEFAULT_LIMIT};
use crate::store::InMemoryStore;
use crate::workflow::{self, Issue, Severity};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub dimension: String,
    pub key: String,
    pub status: Severity,
    pub critical_issues: Vec<Issue>,
    pub warnings: Vec<Issue>,
    pub insights: Vec<String>,
    pub metadata: HashMap<String, String>,
    pub quick_actions: Vec<String>,
}

fn quick_actions_for(critical_issues: &[Issue], engine: &dyn DecisionEngine, store: &InMemoryStore) -> Vec<String> {
    let mut actions = Vec::new();
    for issue in critical_issues {
        if let Some(action) = engine.generate_actions(issue, store).into_iter().next() {
            actions.push(action.code);
        }
    }
    actions
}

fn finish(
    dimension: &str,
    key: &str,
    context: &DataContext,
    engine: Option<&dyn DecisionEngine>,
    store: &InMemoryStore,
) -> AnalysisReport {
    let outcome = workflow::run(context);
    let quick_actions = match engine {
        Some(engine) => quick_actions_for(&outcome.critical_issues, engine, store),
        None => Vec::new(),
    };
    AnalysisReport {
        dimension: dimension.to_string(),
        key: key.to_string(),
        status: outcome.status,
        critical_issues: outcome.critical_issues,
        warnings: outcome.warnings,
        insights: outcome.insights,
        metadata: HashMap::new(),
        quick_actions,
    }
}

pub fn analyze_by_batch(
    store: &InMemoryStore,
    batch_id: &str,
    engine: Option<&dyn DecisionEngine>,
) -> Result<AnalysisReport, LssError> {
    let ctx = providers::by_batch(store, batch_id, DEFAULT_LIMIT)?;
    Ok(finish("batch", batch_id, &ctx, engine, store))
}

pub fn analyze_by_process(
    store: &InMemoryStore,
    node_code: &str,
    param_code: Option<&str>,
    engine: Option<&dyn DecisionEngine>,
) -> Result<AnalysisReport, LssError> {
    let ctx = providers::by_process(store, node_code, param_code, DEFAULT_LIMIT)?;
    Ok(finish("process", node_code, &ctx, engine, store))
}

pub fn analyze_by_workshop(
    store: &InMemoryStore,
    block_code: &str,
    engine: Option<&dyn DecisionEngine>,
) -> Result<AnalysisReport, LssError> {
    let ctx = providers::by_workshop(store, block_code, DEFAULT_LIMIT)?;
    Ok(finish("workshop", block_code, &ctx, engine, store))
}

pub fn analyze_by_person(
    store: &InMemoryStore,
    operator_id: &str,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    engine: Option<&dyn DecisionEngine>,
) -> Result<AnalysisReport, LssError> {
    let ctx = providers::by_person(store, operator_id, start, end, DEFAULT_LIMIT)?;
    Ok(finish("person", operator_id, &ctx, engine, store))
}

pub fn analyze_by_time(
    store: &InMemoryStore,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    engine: Option<&dyn DecisionEngine>,
) -> Result<AnalysisReport, LssError> {
    let ctx = providers::by_time(store, start, end, DEFAULT_LIMIT)?;
    let key = format!("{:?}..{:?}", start, end);
    Ok(finish("time", &key, &ctx, engine, store))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lss_schemas::measurement::{Measurement, MeasurementSource};
    use lss_schemas::node::{Node, NodeType};
    use lss_schemas::parameter::{ParameterDataType, ParameterDef, ParameterRole};

    fn seeded_store() -> InMemoryStore {
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
        for (i, v) in [85.0, 85.5, 86.0, 84.8, 85.2, 85.6, 85.1, 85.4, 85.3, 85.7].into_iter().enumerate() {
            store
                .record_measurement(Measurement {
                    batch_id: "BATCH_001".into(),
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
    fn analyze_by_batch_reports_normal_status() {
        let store = seeded_store();
        let report = analyze_by_batch(&store, "BATCH_001", None).unwrap();
        assert_eq!(report.status, Severity::Normal);
        assert_eq!(report.dimension, "batch");
    }

    #[test]
    fn rerunning_orchestrator_is_deterministic() {
        let store = seeded_store();
        let first = analyze_by_batch(&store, "BATCH_001", None).unwrap();
        let second = analyze_by_batch(&store, "BATCH_001", None).unwrap();
        assert_eq!(first.status, second.status);
        assert_eq!(first.critical_issues.len(), second.critical_issues.len());
    }

    #[test]
    fn unknown_batch_is_empty_normal_report() {
        let store = seeded_store();
        let report = analyze_by_batch(&store, "NOPE", None).unwrap();
        assert_eq!(report.status, Severity::Normal);
        assert!(report.critical_issues.is_empty());
    }
}
