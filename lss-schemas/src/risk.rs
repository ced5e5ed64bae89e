use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskCategory {
    Top,
    Equipment,
    Material,
    Human,
    Environment,
    Method,
}

/// A fault-tree node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Risk {
    pub code: String,
    pub name: String,
    pub category: RiskCategory,
    pub base_probability: Option<f64>,
}

/// A directed causal edge between `Risk`s: `child_code` (cause) ->
/// `parent_code` (effect). Together, all `RiskEdge`s must form a DAG;
/// the importer (external) validates and rejects cycles, so the core may
/// assume acyclicity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskEdge {
    pub child_code: String,
    pub parent_code: String,
}
