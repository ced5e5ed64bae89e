use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Block,
    Unit,
    Resource,
}

/// A unit in the process graph: a Block at the root, Units under a Block,
/// Resources attached to a Block. Codes are unique process-wide and the
/// parent links form a forest. Created at bootstrap; immutable thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub code: String,
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub parent_code: Option<String>,
}
