//! C5 — Analysis Workflow: fetch -> SPC scan -> severity tally -> insight
//! synthesis over a `DataContext`.

use crate::providers::DataContext;
use crate::tools::spc::{self, SpcOutcome};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Severity {
    Normal,
    Warning,
    High,
    Critical,
}

/// One (node, param) group's SPC result plus the derived severity.
#[derive(Debug, Clone, Serialize)]
pub struct Issue {
    pub node_code: String,
    pub param_code: String,
    pub severity: Severity,
    pub spc: SpcOutcome,
    pub errored: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowOutcome {
    pub critical_issues: Vec<Issue>,
    pub warnings: Vec<Issue>,
    pub status: Severity,
    pub insights: Vec<String>,
}

fn derive_severity(spc: &SpcOutcome) -> Severity {
    if spc.process_status == "失控" || spc.cpk.map_or(false, |c| c < 0.8) {
        Severity::Critical
    } else if spc.cpk.map_or(false, |c| (0.8..1.0).contains(&c)) {
        Severity::High
    } else if spc.cpk.map_or(false, |c| (1.0..1.33).contains(&c)) || !spc.violations.is_empty() {
        Severity::Warning
    } else {
        Severity::Normal
    }
}

/// Runs the SPC scan over every group in `context` and synthesises a
/// `WorkflowOutcome`. Deterministic: rerunning on the same `context`
/// yields an identical report (§4.4 idempotence).
pub fn run(context: &DataContext) -> WorkflowOutcome {
    let mut issues: Vec<Issue> = Vec::new();

    let mut groups: Vec<_> = context.groups().collect();
    groups.sort_by(|a, b| (a.node_code.as_str(), a.param_code.as_str()).cmp(&(b.node_code.as_str(), b.param_code.as_str())));

    for group in groups {
        let values: Vec<f64> = group.measurements.iter().map(|m| m.value).collect();
        let (usl, lsl, target) = group
            .param
            .as_ref()
            .map(|p| (p.usl, p.lsl, p.target))
            .unwrap_or((None, None, None));

        match spc::compute(&values, usl, lsl, target) {
            Ok(outcome) => {
                let severity = derive_severity(&outcome);
                issues.push(Issue {
                    node_code: group.node_code.clone(),
                    param_code: group.param_code.clone(),
                    severity,
                    spc: outcome,
                    errored: false,
                });
            }
            Err(_) => {
                // Errored group: tagged and skipped, does not abort the report (§7).
                continue;
            }
        }
    }

    // deterministic tie-break: descending severity, then param_code ascending (§4.5)
    issues.sort_by(|a, b| b.severity.cmp(&a.severity).then_with(|| a.param_code.cmp(&b.param_code)));

    let critical_issues: Vec<Issue> = issues
        .iter()
        .filter(|i| matches!(i.severity, Severity::Critical | Severity::High))
        .cloned()
        .collect();
    let warnings: Vec<Issue> = issues
        .iter()
        .filter(|i| matches!(i.severity, Severity::Warning))
        .cloned()
        .collect();

    let status = if critical_issues.iter().any(|i| i.severity == Severity::Critical) {
        Severity::Critical
    } else if !critical_issues.is_empty() || !warnings.is_empty() {
        Severity::Warning
    } else {
        Severity::Normal
    };

    let mut insights = vec![format!("overall status: {:?}", status)];
    for issue in critical_issues.iter().take(3) {
        insights.push(format!(
            "{} / {}: severity {:?}, Cpk = {:?}",
            issue.node_code, issue.param_code, issue.severity, issue.spc.cpk
        ));
    }
    insights.push(format!("{} warning group(s)", warnings.len()));

    WorkflowOutcome { critical_issues, warnings, status, insights }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use crate::providers;
    use lss_schemas::measurement::{Measurement, MeasurementSource};
    use lss_schemas::node::{Node, NodeType};
    use lss_schemas::parameter::{ParameterDataType, ParameterDef, ParameterRole};
    use chrono::Utc;

    fn node(code: &str, parent: Option<&str>) -> Node {
        Node { code: code.into(), name: code.into(), node_type: NodeType::Unit, parent_code: parent.map(Into::into) }
    }

    fn param(node_code: &str, cpk_friendly: bool) -> ParameterDef {
        ParameterDef {
            node_code: node_code.into(),
            code: "temp".into(),
            name: "Temperature".into(),
            unit: "C".into(),
            role: ParameterRole::Output,
            usl: Some(if cpk_friendly { 95.0 } else { 86.0 }),
            lsl: Some(if cpk_friendly { 75.0 } else { 84.0 }),
            target: Some(85.0),
            data_type: ParameterDataType::Scalar,
        }
    }

    fn seed_points(store: &InMemoryStore, node_code: &str, values: &[f64]) {
        for (i, &v) in values.iter().enumerate() {
            store
                .record_measurement(Measurement {
                    batch_id: "BATCH_WS".into(),
                    node_code: node_code.into(),
                    param_code: "temp".into(),
                    value: v,
                    timestamp: Utc::now() + chrono::Duration::seconds(i as i64),
                    source: MeasurementSource::Sensor,
                    recorded_by: None,
                })
                .unwrap();
        }
    }

    #[test]
    fn workshop_critical_dominates_when_one_unit_fails() {
        let store = InMemoryStore::new();
        store.insert_node(node("BLOCK_E", None));
        store.insert_node(node("E01", Some("BLOCK_E")));
        store.insert_node(node("E02", Some("BLOCK_E")));
        store.insert_parameter(param("E01", true)).unwrap();
        store.insert_parameter(param("E02", false)).unwrap();

        let e01: Vec<f64> = (0..30).map(|i| 85.0 + ((i % 3) as f64 - 1.0) * 0.2).collect();
        seed_points(&store, "E01", &e01);

        let mut e02: Vec<f64> = (0..29).map(|i| 85.0 + ((i % 3) as f64 - 1.0) * 1.0).collect();
        e02.push(90.0);
        seed_points(&store, "E02", &e02);

        let ctx = providers::by_workshop(&store, "BLOCK_E", 100).unwrap();
        let outcome = run(&ctx);

        assert_eq!(outcome.status, Severity::Critical);
        assert_eq!(outcome.critical_issues.len(), 1);
        assert_eq!(outcome.critical_issues[0].node_code, "E02");
        assert!(outcome.insights.iter().any(|i| i.contains("E02")));
    }

    #[test]
    fn rerunning_workflow_is_idempotent() {
        let store = InMemoryStore::new();
        store.insert_node(node("E04", None));
        store.insert_parameter(param("E04", true)).unwrap();
        seed_points(&store, "E04", &[85.0, 85.5, 86.0, 84.8, 85.2]);

        let ctx = providers::by_process(&store, "E04", None, 100).unwrap();
        let first = run(&ctx);
        let second = run(&ctx);
        assert_eq!(first.status, second.status);
        assert_eq!(first.critical_issues.len(), second.critical_issues.len());
    }
}
