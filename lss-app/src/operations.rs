//! The §6.1 operation surface as plain functions — a future transport
//! crate has a 1:1 mapping to call into; the HTTP layer itself is
//! external.

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use lss_core::decision::{ActionTable, RuleBasedDecisionEngine};
use lss_core::instructions::{self, DimensionIssues};
use lss_core::monitor::{self, LatestStatusEntry, NodeMonitor};
use lss_core::orchestrator::{self, AnalysisReport};
use lss_core::store::InMemoryStore;
use lss_core::tools::{Registry, ToolConfig, ToolInput, ToolResult};
use lss_schemas::action::ActionRole;
use lss_schemas::edge::Edge;
use lss_schemas::instruction::{Instruction, InstructionStatus};
use lss_schemas::node::Node;
use lss_schemas::risk::{Risk, RiskEdge};

/// `GET /api/graph/structure` — every node (Unit, Block and Resource)
/// plus every edge, as loaded at bootstrap.
pub fn graph_structure(store: &InMemoryStore) -> (Vec<Node>, Vec<Edge>) {
    (store.all_nodes(), store.all_edges())
}

/// `GET /api/graph/nodes/{code}/risks` — risks matched to node by code
/// prefix (§6.1, §9: precedence between this and `ActionDef.node_code`
/// is an implementer choice, resolved in DESIGN.md).
pub fn node_risks(store: &InMemoryStore, node_code: &str) -> Vec<Risk> {
    store.risks_for_node_prefix(node_code)
}

/// `GET /api/graph/risks/tree` — the full fault tree: every risk plus
/// every causal risk edge.
pub fn risk_tree(store: &InMemoryStore) -> (Vec<Risk>, Vec<RiskEdge>) {
    (store.all_risks(), store.all_risk_edges())
}

/// One endpoint per dimension (§6.1 "Analysis").
pub fn analyze(store: &InMemoryStore, dimension: &str, key: &str) -> Result<AnalysisReport> {
    let engine = RuleBasedDecisionEngine::new(ActionTable::new());
    let report = match dimension {
        "batch" => orchestrator::analyze_by_batch(store, key, Some(&engine))?,
        "process" => orchestrator::analyze_by_process(store, key, None, Some(&engine))?,
        "workshop" => orchestrator::analyze_by_workshop(store, key, Some(&engine))?,
        "person" => orchestrator::analyze_by_person(store, key, None, None, Some(&engine))?,
        "time" => orchestrator::analyze_by_time(store, None, None, Some(&engine))?,
        other => anyhow::bail!("unknown analysis dimension '{other}'"),
    };
    Ok(report)
}

/// `GET /api/instructions?role=&status=`.
pub fn list_instructions(
    store: &InMemoryStore,
    role: ActionRole,
    target_date: Option<NaiveDate>,
    statuses: Option<&[InstructionStatus]>,
) -> Vec<Instruction> {
    instructions::get_instructions_by_role(store, role, target_date, statuses)
}

/// `POST /api/instructions/{id}/read`.
pub fn mark_instruction_read(store: &InMemoryStore, id: &str) -> Result<Instruction> {
    Ok(instructions::mark_read(store, id, Utc::now())?)
}

/// `POST /api/instructions/{id}/done`.
pub fn mark_instruction_done(store: &InMemoryStore, id: &str, feedback: Option<String>) -> Result<Instruction> {
    Ok(instructions::mark_done(store, id, feedback, Utc::now())?)
}

/// Drives the instruction engine for a target date over a fixed set of
/// dimension reports, the app-layer equivalent of whatever external
/// scheduler invokes `generate_daily_orders` once a day.
pub fn generate_daily_orders(
    store: &InMemoryStore,
    target_date: NaiveDate,
    dimension_keys: &[(&str, &str)],
) -> Result<usize> {
    let engine = RuleBasedDecisionEngine::new(ActionTable::new());
    let mut dimensions = Vec::new();
    for (dimension, key) in dimension_keys {
        let report = analyze(store, dimension, key)?;
        dimensions.push(DimensionIssues {
            batch_id: if *dimension == "batch" { Some((*key).to_string()) } else { None },
            report: lss_core::workflow::WorkflowOutcome {
                critical_issues: report.critical_issues,
                warnings: report.warnings,
                status: report.status,
                insights: report.insights,
            },
        });
    }
    let by_role = instructions::generate_daily_orders(store, &engine, None, target_date, &dimensions, Utc::now())?;
    Ok(by_role.values().map(|v| v.len()).sum())
}

/// `GET /api/monitor/node/{code}`.
pub fn monitor_node(store: &InMemoryStore, node_code: &str) -> Result<NodeMonitor> {
    Ok(monitor::node_monitor(store, node_code)?)
}

/// `GET /api/monitor/latest`.
pub fn monitor_latest(store: &InMemoryStore) -> Vec<LatestStatusEntry> {
    monitor::latest_status(store)
}

/// `POST /api/lss/tools/{tool_key}/run` and the per-tool
/// `POST /api/lss/{spc|pareto|histogram|boxplot}/analyze` aliases (§6.1):
/// the one call path into the Tool Framework (C3) registry. Validation
/// failures come back as a `success=false` envelope, per §7, rather than
/// an `Err`.
pub fn run_tool(tool_key: &str, data: ToolInput, config: ToolConfig) -> Result<ToolResult> {
    let registry = Registry::with_default_tools();
    let tool = registry.get(tool_key)?;
    let validation = tool.validate(&data, &config);
    if !validation.ok {
        return Ok(ToolResult::failure(validation.errors));
    }
    Ok(tool.run(&data, &config))
}
