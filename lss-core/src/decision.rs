//! C7 — Decision Engine: maps report issues to candidate actions.

use crate::store::InMemoryStore;
use crate::workflow::Issue;
use lss_schemas::action::ActionDef;
use std::collections::HashMap;

/// An explicit `(node_code, param_code, severity)` -> `action_code`
/// override, consulted before the keyword heuristic (§4.6 rule 1).
pub type ActionTable = HashMap<(String, String, String), String>;

/// `generate_actions(issue, context) -> ActionDef[]`. A pluggable
/// alternative (`LLMDecisionEngine`) would implement the same trait; the
/// interface must not leak rule-specific shapes (§9).
pub trait DecisionEngine {
    fn generate_actions(&self, issue: &Issue, store: &InMemoryStore) -> Vec<ActionDef>;
}

pub struct RuleBasedDecisionEngine {
    pub action_table: ActionTable,
}

impl RuleBasedDecisionEngine {
    pub fn new(action_table: ActionTable) -> Self {
        Self { action_table }
    }

    fn exact_match(&self, issue: &Issue, actions: &[ActionDef]) -> Option<ActionDef> {
        let key = (issue.node_code.clone(), issue.param_code.clone(), format!("{:?}", issue.severity).to_uppercase());
        if let Some(code) = self.action_table.get(&key) {
            return actions.iter().find(|a| &a.code == code).cloned();
        }
        actions
            .iter()
            .find(|a| a.instruction_template.contains(&issue.node_code))
            .cloned()
    }

    fn keyword_match<'a>(&self, issue: &Issue, actions: &'a [ActionDef]) -> Vec<&'a ActionDef> {
        let param_lower = issue.param_code.to_lowercase();
        actions
            .iter()
            .filter(|a| {
                let template_lower = a.instruction_template.to_lowercase();
                (template_lower.contains("temp") || a.instruction_template.contains('温'))
                    && (param_lower.contains("temp") || issue.param_code.contains('温'))
            })
            .collect()
    }
}

impl DecisionEngine for RuleBasedDecisionEngine {
    fn generate_actions(&self, issue: &Issue, store: &InMemoryStore) -> Vec<ActionDef> {
        let actions = store.all_actions();
        let severity_is_high = matches!(issue.severity, crate::workflow::Severity::Critical | crate::workflow::Severity::High);

        let mut candidates: Vec<ActionDef> = Vec::new();
        if let Some(exact) = self.exact_match(issue, &actions) {
            candidates.push(exact);
        }
        for keyword in self.keyword_match(issue, &actions) {
            if !candidates.iter().any(|c| c.code == keyword.code) {
                candidates.push(keyword.clone());
            }
        }

        // rule 3: priority >= HIGH actions require severity in {CRITICAL, HIGH}
        candidates.retain(|a| {
            !matches!(a.priority, lss_schemas::action::Priority::High | lss_schemas::action::Priority::Critical)
                || severity_is_high
        });

        // rule 4: tie-break by ActionDef.priority desc, then code asc
        candidates.sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.code.cmp(&b.code)));
        candidates
    }
}
