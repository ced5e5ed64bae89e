//! C1 — typed relational storage of nodes, parameters, risks, batches,
//! measurements, actions and instructions. An in-memory, lock-guarded
//! implementation; any equivalent schema composes the same operations
//! (§6.3).

use crate::error::LssError;
use chrono::{DateTime, NaiveDate, Utc};
use lss_schemas::{
    action::{ActionDef, ActionRole},
    batch::Batch,
    edge::Edge,
    instruction::{Instruction, InstructionStatus},
    measurement::Measurement,
    node::Node,
    parameter::ParameterDef,
    risk::{Risk, RiskEdge},
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

type ParamKey = (String, String);
type InstructionDedupKey = (NaiveDate, ActionRole, String, Option<String>, Option<String>);

#[derive(Default)]
struct StoreInner {
    nodes: HashMap<String, Node>,
    parameters: HashMap<ParamKey, ParameterDef>,
    edges: Vec<Edge>,
    risks: HashMap<String, Risk>,
    risk_edges: Vec<RiskEdge>,
    actions: HashMap<String, ActionDef>,
    batches: HashMap<String, Batch>,
    measurements: Vec<Measurement>,
    instructions: HashMap<String, Instruction>,
    instruction_dedup: HashSet<InstructionDedupKey>,
    next_instruction_seq: u64,
}

/// Whether a call to `insert_instruction_if_new` actually created a new
/// row, or found a duplicate and skipped (§4.7, §5: "the loser skips,
/// not fails").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(String),
    Skipped,
}

/// The shared, thread-safe handle every component reads and writes
/// through. Cloning is cheap (shared `Arc`); suspension only happens
/// around the lock acquisition, never across a pure computation (§5).
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<StoreInner>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // --- Nodes -----------------------------------------------------

    pub fn insert_node(&self, node: Node) {
        let mut inner = self.inner.write().expect("store lock poisoned");
        inner.nodes.insert(node.code.clone(), node);
    }

    pub fn get_node(&self, code: &str) -> Option<Node> {
        self.inner.read().expect("store lock poisoned").nodes.get(code).cloned()
    }

    /// All Unit nodes whose ancestor chain reaches `block_code` (inclusive
    /// of Units directly parented to it), used by `by_workshop` (§4.1)
    /// and `latest_status` (§4.9).
    pub fn unit_descendants_of(&self, block_code: &str) -> Vec<Node> {
        let inner = self.inner.read().expect("store lock poisoned");
        inner
            .nodes
            .values()
            .filter(|n| {
                n.node_type == lss_schemas::node::NodeType::Unit
                    && Self::ancestor_is(&inner, &n.parent_code, block_code)
            })
            .cloned()
            .collect()
    }

    fn ancestor_is(inner: &StoreInner, parent_code: &Option<String>, target: &str) -> bool {
        match parent_code {
            None => false,
            Some(code) if code == target => true,
            Some(code) => match inner.nodes.get(code) {
                Some(parent) => Self::ancestor_is(inner, &parent.parent_code, target),
                None => false,
            },
        }
    }

    pub fn all_unit_nodes(&self) -> Vec<Node> {
        self.inner
            .read()
            .expect("store lock poisoned")
            .nodes
            .values()
            .filter(|n| n.node_type == lss_schemas::node::NodeType::Unit)
            .cloned()
            .collect()
    }

    /// Every node regardless of type, for `/api/graph/structure` (§6.1).
    pub fn all_nodes(&self) -> Vec<Node> {
        self.inner.read().expect("store lock poisoned").nodes.values().cloned().collect()
    }

    // --- Parameters --------------------------------------------------

    pub fn insert_parameter(&self, param: ParameterDef) -> Result<(), LssError> {
        if !param.limits_are_consistent() {
            return Err(LssError::BadRequest(format!(
                "parameter '{}' on node '{}' has inconsistent limits",
                param.code, param.node_code
            )));
        }
        let mut inner = self.inner.write().expect("store lock poisoned");
        inner
            .parameters
            .insert((param.node_code.clone(), param.code.clone()), param);
        Ok(())
    }

    pub fn get_parameter(&self, node_code: &str, param_code: &str) -> Option<ParameterDef> {
        self.inner
            .read()
            .expect("store lock poisoned")
            .parameters
            .get(&(node_code.to_string(), param_code.to_string()))
            .cloned()
    }

    // --- Edges / Risks -------------------------------------------------

    pub fn insert_edge(&self, edge: Edge) -> Result<(), LssError> {
        let inner = self.inner.read().expect("store lock poisoned");
        if !inner.nodes.contains_key(&edge.source_code) || !inner.nodes.contains_key(&edge.target_code) {
            return Err(LssError::BadRequest(format!(
                "edge references unknown node(s): {} -> {}",
                edge.source_code, edge.target_code
            )));
        }
        drop(inner);
        self.inner.write().expect("store lock poisoned").edges.push(edge);
        Ok(())
    }

    /// Every edge, for `/api/graph/structure` (§6.1).
    pub fn all_edges(&self) -> Vec<Edge> {
        self.inner.read().expect("store lock poisoned").edges.clone()
    }

    pub fn insert_risk(&self, risk: Risk) {
        let mut inner = self.inner.write().expect("store lock poisoned");
        inner.risks.insert(risk.code.clone(), risk);
    }

    /// Every risk, for `/api/graph/risks/tree` (§6.1).
    pub fn all_risks(&self) -> Vec<Risk> {
        self.inner.read().expect("store lock poisoned").risks.values().cloned().collect()
    }

    pub fn insert_risk_edge(&self, edge: RiskEdge) -> Result<(), LssError> {
        let inner = self.inner.read().expect("store lock poisoned");
        if !inner.risks.contains_key(&edge.child_code) || !inner.risks.contains_key(&edge.parent_code) {
            return Err(LssError::BadRequest(format!(
                "risk edge references unknown risk(s): {} -> {}",
                edge.child_code, edge.parent_code
            )));
        }
        drop(inner);
        self.inner.write().expect("store lock poisoned").risk_edges.push(edge);
        Ok(())
    }

    /// Every risk edge, for `/api/graph/risks/tree` (§6.1).
    pub fn all_risk_edges(&self) -> Vec<RiskEdge> {
        self.inner.read().expect("store lock poisoned").risk_edges.clone()
    }

    pub fn risks_for_node_prefix(&self, node_code: &str) -> Vec<Risk> {
        // Code-prefix heuristic used by /api/graph/nodes/{code}/risks
        // (§6.1, §9 open question: precedence vs. explicit ActionDef
        // node_code left to implementer choice).
        let prefix = node_code.chars().next();
        let inner = self.inner.read().expect("store lock poisoned");
        inner
            .risks
            .values()
            .filter(|r| prefix.map_or(false, |p| r.code.starts_with(p)))
            .cloned()
            .collect()
    }

    // --- Actions -------------------------------------------------------

    pub fn insert_action(&self, action: ActionDef) {
        let mut inner = self.inner.write().expect("store lock poisoned");
        inner.actions.insert(action.code.clone(), action);
    }

    pub fn get_action(&self, code: &str) -> Option<ActionDef> {
        self.inner.read().expect("store lock poisoned").actions.get(code).cloned()
    }

    pub fn all_actions(&self) -> Vec<ActionDef> {
        self.inner.read().expect("store lock poisoned").actions.values().cloned().collect()
    }

    // --- Batches / Measurements -----------------------------------------

    pub fn get_batch(&self, id: &str) -> Option<Batch> {
        self.inner.read().expect("store lock poisoned").batches.get(id).cloned()
    }

    /// Appends a measurement, auto-creating its `Batch` if unseen (§9,
    /// "auto-create batch"). Validates node/parameter existence.
    pub fn record_measurement(&self, measurement: Measurement) -> Result<(), LssError> {
        let mut inner = self.inner.write().expect("store lock poisoned");

        if !inner.nodes.contains_key(&measurement.node_code) {
            return Err(LssError::UnknownEntity {
                kind: "node",
                code: measurement.node_code.clone(),
            });
        }
        let param_key = (measurement.node_code.clone(), measurement.param_code.clone());
        if !inner.parameters.contains_key(&param_key) {
            return Err(LssError::UnknownEntity {
                kind: "parameter",
                code: measurement.param_code.clone(),
            });
        }

        inner
            .batches
            .entry(measurement.batch_id.clone())
            .or_insert_with(|| Batch::auto_created(measurement.batch_id.clone(), measurement.timestamp));

        inner.measurements.push(measurement);
        Ok(())
    }

    /// Returns every measurement matching `predicate`, ordered ascending
    /// by timestamp, truncated to the most recent `limit` entries
    /// (§4.1: "most-recent first... order by timestamp ascending once
    /// fetched").
    pub fn measurements_where(
        &self,
        predicate: impl Fn(&Measurement) -> bool,
        limit: usize,
    ) -> Vec<Measurement> {
        let inner = self.inner.read().expect("store lock poisoned");
        let mut matches: Vec<Measurement> = inner.measurements.iter().filter(|m| predicate(m)).cloned().collect();
        matches.sort_by_key(|m| m.timestamp);
        if matches.len() > limit {
            let start = matches.len() - limit;
            matches = matches.split_off(start);
        }
        matches
    }

    // --- Instructions ----------------------------------------------------

    /// Inserts `instruction` unless its dedup key (§3, §4.7) is already
    /// present, in which case the call is a documented no-op (§5: "the
    /// loser skips, not fails"). The dedup check and the insert happen
    /// under one write-lock critical section, giving a consistent
    /// snapshot per call.
    pub fn insert_instruction_if_new(&self, mut instruction: Instruction) -> InsertOutcome {
        let mut inner = self.inner.write().expect("store lock poisoned");
        let key = instruction.dedup_key();
        if inner.instruction_dedup.contains(&key) {
            return InsertOutcome::Skipped;
        }
        inner.next_instruction_seq += 1;
        if instruction.id.is_empty() {
            instruction.id = format!("INS-{:08}", inner.next_instruction_seq);
        }
        let id = instruction.id.clone();
        inner.instruction_dedup.insert(key);
        inner.instructions.insert(id.clone(), instruction);
        InsertOutcome::Inserted(id)
    }

    pub fn get_instruction(&self, id: &str) -> Option<Instruction> {
        self.inner.read().expect("store lock poisoned").instructions.get(id).cloned()
    }

    /// Advances an instruction's status, enforcing the forward-only
    /// lifecycle (§3, §4.7). Serialised per-instruction by the same
    /// write lock used for the whole store (§5).
    pub fn transition_instruction(
        &self,
        id: &str,
        to: InstructionStatus,
        feedback: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Instruction, LssError> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        let instruction = inner
            .instructions
            .get_mut(id)
            .ok_or_else(|| LssError::UnknownEntity { kind: "instruction", code: id.to_string() })?;

        if !instruction.status.can_advance_to(to) {
            return Err(LssError::BadTransition {
                id: id.to_string(),
                from: instruction.status,
                to,
            });
        }

        instruction.status = to;
        match to {
            InstructionStatus::Read => instruction.read_at = Some(now),
            InstructionStatus::Done => {
                instruction.done_at = Some(now);
                instruction.feedback = feedback;
            }
            InstructionStatus::Pending => {}
        }
        Ok(instruction.clone())
    }

    pub fn instructions_by_role(
        &self,
        role: ActionRole,
        target_date: Option<NaiveDate>,
        statuses: Option<&[InstructionStatus]>,
    ) -> Vec<Instruction> {
        let inner = self.inner.read().expect("store lock poisoned");
        let mut out: Vec<Instruction> = inner
            .instructions
            .values()
            .filter(|i| i.role == role)
            .filter(|i| target_date.map_or(true, |d| i.target_date == d))
            .filter(|i| statuses.map_or(true, |set| set.contains(&i.status)))
            .cloned()
            .collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lss_schemas::measurement::MeasurementSource;
    use lss_schemas::node::NodeType;
    use lss_schemas::parameter::{ParameterDataType, ParameterRole};

    fn sample_store() -> InMemoryStore {
        let store = InMemoryStore::new();
        store.insert_node(Node {
            code: "E04".into(),
            name: "醇提罐".into(),
            node_type: NodeType::Unit,
            parent_code: Some("BLOCK_E".into()),
        });
        store.insert_node(Node {
            code: "BLOCK_E".into(),
            name: "Extraction Block".into(),
            node_type: NodeType::Block,
            parent_code: None,
        });
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
        store
    }

    #[test]
    fn auto_creates_batch_on_first_measurement() {
        let store = sample_store();
        assert!(store.get_batch("B1").is_none());
        store
            .record_measurement(Measurement {
                batch_id: "B1".into(),
                node_code: "E04".into(),
                param_code: "temp".into(),
                value: 85.0,
                timestamp: Utc::now(),
                source: MeasurementSource::Sensor,
                recorded_by: None,
            })
            .unwrap();
        let batch = store.get_batch("B1").unwrap();
        assert_eq!(batch.status, lss_schemas::batch::BatchStatus::Running);
    }

    #[test]
    fn measurement_rejects_unknown_node() {
        let store = sample_store();
        let err = store.record_measurement(Measurement {
            batch_id: "B1".into(),
            node_code: "NOPE".into(),
            param_code: "temp".into(),
            value: 1.0,
            timestamp: Utc::now(),
            source: MeasurementSource::Sensor,
            recorded_by: None,
        });
        assert!(err.is_err());
    }

    #[test]
    fn workshop_descendants_found_transitively() {
        let store = sample_store();
        let units = store.unit_descendants_of("BLOCK_E");
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].code, "E04");
    }

    #[test]
    fn all_nodes_includes_both_unit_and_block_types() {
        let store = sample_store();
        let nodes = store.all_nodes();
        assert_eq!(nodes.len(), 2);
        assert!(nodes.iter().any(|n| n.code == "E04"));
        assert!(nodes.iter().any(|n| n.code == "BLOCK_E"));
    }

    #[test]
    fn all_edges_and_risk_accessors_round_trip() {
        let store = sample_store();
        store
            .insert_edge(Edge { source_code: "E04".into(), target_code: "BLOCK_E".into(), name: None, loss_rate: None })
            .unwrap();
        assert_eq!(store.all_edges().len(), 1);

        store.insert_risk(Risk {
            code: "R_PARENT".into(),
            name: "Parent risk".into(),
            category: lss_schemas::risk::RiskCategory::Top,
            base_probability: None,
        });
        store.insert_risk(Risk {
            code: "R_CHILD".into(),
            name: "Child risk".into(),
            category: lss_schemas::risk::RiskCategory::Equipment,
            base_probability: Some(0.1),
        });
        assert_eq!(store.all_risks().len(), 2);

        store
            .insert_risk_edge(RiskEdge { child_code: "R_CHILD".into(), parent_code: "R_PARENT".into() })
            .unwrap();
        assert_eq!(store.all_risk_edges().len(), 1);
    }

    #[test]
    fn duplicate_instruction_insert_is_skipped() {
        let store = InMemoryStore::new();
        let date = chrono::NaiveDate::from_ymd_opt(2025, 1, 8).unwrap();
        let make = || Instruction {
            id: String::new(),
            target_date: date,
            role: ActionRole::Operator,
            batch_id: Some("BATCH_001".into()),
            node_code: Some("E04".into()),
            action_code: "ACT-1".into(),
            content: "content".into(),
            status: InstructionStatus::Pending,
            priority: lss_schemas::action::Priority::High,
            evidence: Default::default(),
            feedback: None,
            instruction_type: lss_schemas::instruction::InstructionType::Tactical,
            created_at: Utc::now(),
            read_at: None,
            done_at: None,
        };
        let first = store.insert_instruction_if_new(make());
        let second = store.insert_instruction_if_new(make());
        assert!(matches!(first, InsertOutcome::Inserted(_)));
        assert_eq!(second, InsertOutcome::Skipped);
    }

    #[test]
    fn instruction_lifecycle_rejects_skipped_transition() {
        let store = InMemoryStore::new();
        let date = chrono::NaiveDate::from_ymd_opt(2025, 1, 8).unwrap();
        let instruction = Instruction {
            id: String::new(),
            target_date: date,
            role: ActionRole::Operator,
            batch_id: None,
            node_code: None,
            action_code: "ACT-1".into(),
            content: "content".into(),
            status: InstructionStatus::Pending,
            priority: lss_schemas::action::Priority::High,
            evidence: Default::default(),
            feedback: None,
            instruction_type: lss_schemas::instruction::InstructionType::Tactical,
            created_at: Utc::now(),
            read_at: None,
            done_at: None,
        };
        let id = match store.insert_instruction_if_new(instruction) {
            InsertOutcome::Inserted(id) => id,
            InsertOutcome::Skipped => panic!("expected insert"),
        };
        let now = Utc::now();
        assert!(store.transition_instruction(&id, InstructionStatus::Done, None, now).is_err());
        store.transition_instruction(&id, InstructionStatus::Read, None, now).unwrap();
        store.transition_instruction(&id, InstructionStatus::Done, Some("ok".into()), now).unwrap();
        assert!(store.transition_instruction(&id, InstructionStatus::Read, None, now).is_err());
    }
}
