//! C8 — Instruction Engine: renders action templates into per-role
//! instructions and persists them with a forward-only lifecycle.

use crate::audit::InstructionAuditLog;
use crate::decision::DecisionEngine;
use crate::error::LssError;
use crate::store::{InMemoryStore, InsertOutcome};
use crate::workflow::{Issue, WorkflowOutcome};
use chrono::{DateTime, NaiveDate, Utc};
use lss_schemas::action::ActionDef;
use lss_schemas::instruction::{Evidence, Instruction, InstructionStatus, InstructionType};
use std::collections::HashMap;

/// One dimension report to fold into a daily-orders run: the `Issue`s it
/// found plus the key identifying where they apply.
pub struct DimensionIssues {
    pub batch_id: Option<String>,
    pub report: WorkflowOutcome,
}

fn value_bag(issue: &Issue, node_name: &str, batch_id: Option<&str>) -> HashMap<String, String> {
    let mut bag = HashMap::new();
    bag.insert("node_name".to_string(), node_name.to_string());
    bag.insert("node_code".to_string(), issue.node_code.clone());
    bag.insert("param_code".to_string(), issue.param_code.clone());
    bag.insert("current_value".to_string(), format!("{:.2}", issue.spc.mean));
    if let Some(target) = issue.spc.target {
        bag.insert("target_value".to_string(), format!("{target:.2}"));
    }
    if let Some(cpk) = issue.spc.cpk {
        bag.insert("cpk".to_string(), format!("{cpk:.2}"));
    }
    if let Some(batch_id) = batch_id {
        bag.insert("batch_id".to_string(), batch_id.to_string());
    }
    bag
}

/// Substitutes every `{placeholder}` present in `bag` into `template`.
/// Unresolvable placeholders are left untouched rather than panicking
/// (callers only ever promise the subset named in §4.7's value bag).
fn render_template(template: &str, bag: &HashMap<String, String>) -> String {
    let mut rendered = template.to_string();
    for (key, value) in bag {
        rendered = rendered.replace(&format!("{{{key}}}"), value);
    }
    rendered
}

fn evidence_from(issue: &Issue, batch_id: Option<&str>) -> Evidence {
    let mut evidence = Evidence::new();
    evidence.insert("current_value".to_string(), serde_json::json!(issue.spc.mean));
    if let Some(cpk) = issue.spc.cpk {
        evidence.insert("cpk".to_string(), serde_json::json!(cpk));
    }
    evidence.insert("violation_count".to_string(), serde_json::json!(issue.spc.violations.len()));
    if let Some(batch_id) = batch_id {
        evidence.insert("batch_id".to_string(), serde_json::json!(batch_id));
    }
    evidence
}

/// `generate_daily_orders(target_date, dimensions[]) -> map<role, Instruction[]>`.
pub fn generate_daily_orders(
    store: &InMemoryStore,
    engine: &dyn DecisionEngine,
    audit_log: Option<&mut InstructionAuditLog>,
    target_date: NaiveDate,
    dimensions: &[DimensionIssues],
    now: DateTime<Utc>,
) -> Result<HashMap<lss_schemas::action::ActionRole, Vec<Instruction>>, LssError> {
    let mut by_role: HashMap<lss_schemas::action::ActionRole, Vec<Instruction>> = HashMap::new();
    let mut audit_log = audit_log;

    for dimension in dimensions {
        let all_issues = dimension.report.critical_issues.iter().chain(dimension.report.warnings.iter());
        for issue in all_issues {
            let actions: Vec<ActionDef> = engine.generate_actions(issue, store);
            let Some(action) = actions.into_iter().next() else { continue };

            let node_name = store.get_node(&issue.node_code).map(|n| n.name).unwrap_or_else(|| issue.node_code.clone());
            let bag = value_bag(issue, &node_name, dimension.batch_id.as_deref());
            let content = render_template(&action.instruction_template, &bag);

            let instruction = Instruction {
                id: String::new(),
                target_date,
                role: action.target_role,
                batch_id: dimension.batch_id.clone(),
                node_code: Some(issue.node_code.clone()),
                action_code: action.code.clone(),
                content,
                status: InstructionStatus::Pending,
                priority: action.priority,
                evidence: evidence_from(issue, dimension.batch_id.as_deref()),
                feedback: None,
                instruction_type: InstructionType::Tactical,
                created_at: now,
                read_at: None,
                done_at: None,
            };

            if let InsertOutcome::Inserted(id) = store.insert_instruction_if_new(instruction) {
                let inserted = store.get_instruction(&id).expect("just inserted");
                if let Some(log) = audit_log.as_deref_mut() {
                    let _ = log.log_instruction(&inserted);
                }
                by_role.entry(action.target_role).or_default().push(inserted);
            }
        }
    }

    Ok(by_role)
}

pub fn get_instructions_by_role(
    store: &InMemoryStore,
    role: lss_schemas::action::ActionRole,
    target_date: Option<NaiveDate>,
    statuses: Option<&[InstructionStatus]>,
) -> Vec<Instruction> {
    store.instructions_by_role(role, target_date, statuses)
}

pub fn mark_read(store: &InMemoryStore, id: &str, now: DateTime<Utc>) -> Result<Instruction, LssError> {
    store.transition_instruction(id, InstructionStatus::Read, None, now)
}

pub fn mark_done(
    store: &InMemoryStore,
    id: &str,
    feedback: Option<String>,
    now: DateTime<Utc>,
) -> Result<Instruction, LssError> {
    store.transition_instruction(id, InstructionStatus::Done, feedback, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::{ActionTable, RuleBasedDecisionEngine};
    use crate::workflow::Severity;
    use lss_schemas::action::{ActionRole, Priority};
    use lss_schemas::node::{Node, NodeType};

    fn sample_issue() -> Issue {
        let spc = crate::tools::spc::compute(&[85.5, 86.0], None, None, Some(85.0)).unwrap();
        Issue { node_code: "E04".into(), param_code: "temp".into(), severity: Severity::Critical, spc, errored: false }
    }

    fn store_with_action_and_node() -> InMemoryStore {
        let store = InMemoryStore::new();
        store.insert_node(Node { code: "E04".into(), name: "醇提罐".into(), node_type: NodeType::Unit, parent_code: None });
        store.insert_action(ActionDef {
            code: "ACT_TEMP_HIGH".into(),
            name: "Adjust temperature".into(),
            risk_code: Some("R_E04_TEMP_HIGH".into()),
            target_role: ActionRole::Operator,
            instruction_template: "Investigate temperature on {node_name}, currently {current_value} vs target {target_value} (Cpk {cpk})".into(),
            priority: Priority::High,
            category: None,
        });
        store
    }

    #[test]
    fn generation_renders_template_and_dedups() {
        let store = store_with_action_and_node();
        let engine = RuleBasedDecisionEngine::new(ActionTable::new());
        let target_date = NaiveDate::from_ymd_opt(2025, 1, 8).unwrap();

        let mut issue = sample_issue();
        issue.spc.mean = 85.5;

        let dims = vec![DimensionIssues {
            batch_id: Some("BATCH_001".to_string()),
            report: WorkflowOutcome {
                critical_issues: vec![issue],
                warnings: vec![],
                status: Severity::Critical,
                insights: vec![],
            },
        }];

        let now = Utc::now();
        let result = generate_daily_orders(&store, &engine, None, target_date, &dims, now).unwrap();
        let operator_instructions = result.get(&ActionRole::Operator).unwrap();
        assert_eq!(operator_instructions.len(), 1);
        assert_eq!(operator_instructions[0].status, InstructionStatus::Pending);
        assert!(!operator_instructions[0].content.contains('{'));

        // re-running must not create a new instruction
        let second = generate_daily_orders(&store, &engine, None, target_date, &dims, now).unwrap();
        assert!(second.get(&ActionRole::Operator).map_or(true, |v| v.is_empty()));
    }

    #[test]
    fn lifecycle_transitions_forward_only() {
        let store = store_with_action_and_node();
        let engine = RuleBasedDecisionEngine::new(ActionTable::new());
        let target_date = NaiveDate::from_ymd_opt(2025, 1, 8).unwrap();
        let dims = vec![DimensionIssues {
            batch_id: Some("BATCH_001".to_string()),
            report: WorkflowOutcome {
                critical_issues: vec![sample_issue()],
                warnings: vec![],
                status: Severity::Critical,
                insights: vec![],
            },
        }];
        let now = Utc::now();
        let result = generate_daily_orders(&store, &engine, None, target_date, &dims, now).unwrap();
        let id = result.get(&ActionRole::Operator).unwrap()[0].id.clone();

        mark_read(&store, &id, now).unwrap();
        mark_done(&store, &id, Some("valve adjusted".to_string()), now).unwrap();
        assert!(mark_read(&store, &id, now).is_err());
    }
}
