use serde::{Deserialize, Serialize};

/// A directed flow between two `Node`s. Must reference existing nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source_code: String,
    pub target_code: String,
    pub name: Option<String>,
    pub loss_rate: Option<f64>,
}
