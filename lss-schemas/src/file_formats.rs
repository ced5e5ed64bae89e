use crate::{action::ActionDef, edge::Edge, node::Node, parameter::ParameterDef, risk::{Risk, RiskEdge}};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct NodeFile {
    pub schema_version: String,
    pub nodes: Vec<Node>,
}

#[derive(Debug, Deserialize)]
pub struct EdgeFile {
    pub schema_version: String,
    pub edges: Vec<Edge>,
}

#[derive(Debug, Deserialize)]
pub struct ParameterFile {
    pub schema_version: String,
    pub parameters: Vec<ParameterDef>,
}

#[derive(Debug, Deserialize)]
pub struct RiskFile {
    pub schema_version: String,
    pub risks: Vec<Risk>,
}

#[derive(Debug, Deserialize)]
pub struct RiskEdgeFile {
    pub schema_version: String,
    pub risk_edges: Vec<RiskEdge>,
}

#[derive(Debug, Deserialize)]
pub struct ActionFile {
    pub schema_version: String,
    pub actions: Vec<ActionDef>,
}
