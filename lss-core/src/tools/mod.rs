//! C3 — abstract tool contract, registry, and the uniform result
//! envelope every statistical tool (C4) returns.

pub mod boxplot;
pub mod histogram;
pub mod pareto;
pub mod spc;

use crate::error::LssError;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolCategory {
    Descriptive,
    Diagnostic,
    Predictive,
    Prescriptive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataShape {
    TimeSeries,
    CategoricalCounts,
    MultipleTimeSeries,
}

/// The tool-specific payload a caller hands to `validate`/`run`. Each
/// tool only reads the variant matching its `required_data_shape`;
/// mismatches are a validation error, not a panic.
#[derive(Debug, Clone)]
pub enum ToolInput {
    TimeSeries(Vec<f64>),
    CategoricalCounts(Vec<(String, u64)>),
    MultipleTimeSeries(Vec<(String, Vec<f64>)>),
}

/// Free-form tool configuration (usl/lsl/target/bins/threshold/...), the
/// way the teacher keeps `operating_parameters` as a loosely-typed JSON
/// map rather than one struct per consumer.
#[derive(Debug, Clone, Default)]
pub struct ToolConfig(pub HashMap<String, Value>);

impl ToolConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.0.get(key).and_then(Value::as_f64)
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.0.get(key).and_then(Value::as_u64)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidationOutcome {
    pub ok: bool,
    pub errors: Vec<String>,
}

impl ValidationOutcome {
    pub fn ok() -> Self {
        Self { ok: true, errors: Vec::new() }
    }

    pub fn fail(errors: Vec<String>) -> Self {
        Self { ok: false, errors }
    }
}

/// The uniform result envelope from §4.2.
#[derive(Debug, Clone, Serialize, Default)]
pub struct ToolResult {
    pub success: bool,
    pub result: Value,
    pub plot_data: Value,
    pub metrics: HashMap<String, f64>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub insights: Vec<String>,
}

impl ToolResult {
    pub fn failure(errors: Vec<String>) -> Self {
        Self { success: false, errors, ..Default::default() }
    }
}

pub trait Tool: Send + Sync {
    fn key(&self) -> &'static str;
    fn name(&self) -> &'static str;
    fn category(&self) -> ToolCategory;
    fn required_data_shape(&self) -> DataShape;
    fn validate(&self, data: &ToolInput, config: &ToolConfig) -> ValidationOutcome;
    fn run(&self, data: &ToolInput, config: &ToolConfig) -> ToolResult;
}

/// Keyed collection of tools, built once at startup and read thereafter
/// (§5: "the Tool Registry is read-only after initialisation, freely
/// shared"), the same shape the teacher uses for its `KnowledgeBase`.
#[derive(Default)]
pub struct Registry {
    tools: HashMap<&'static str, Box<dyn Tool>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_tools() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(spc::SpcTool));
        registry.register(Box::new(pareto::ParetoTool));
        registry.register(Box::new(histogram::HistogramTool));
        registry.register(Box::new(boxplot::BoxplotTool));
        registry
    }

    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.insert(tool.key(), tool);
    }

    pub fn get(&self, key: &str) -> Result<&dyn Tool, LssError> {
        self.tools
            .get(key)
            .map(|t| t.as_ref())
            .ok_or_else(|| LssError::UnknownTool(key.to_string()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.tools.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_looks_up_default_tools() {
        let registry = Registry::with_default_tools();
        assert!(registry.get("spc").is_ok());
        assert!(registry.get("pareto").is_ok());
        assert!(registry.get("histogram").is_ok());
        assert!(registry.get("boxplot").is_ok());
    }

    #[test]
    fn registry_unknown_key_fails() {
        let registry = Registry::with_default_tools();
        assert!(matches!(registry.get("nope"), Err(LssError::UnknownTool(_))));
    }
}
