use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MeasurementSource {
    History,
    Simulation,
    Sensor,
    Input,
}

/// A single data point. References an existing `Batch`, `Node` and
/// `ParameterDef`; time-ordered per `(batch_id, node_code, param_code)`.
///
/// `recorded_by` carries the operator attribution the `by_person`
/// dimension (§4.1) filters on; it is populated whenever a human
/// recorded the value (typically `source == Input`) and left `None`
/// otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub batch_id: String,
    pub node_code: String,
    pub param_code: String,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
    pub source: MeasurementSource,
    pub recorded_by: Option<String>,
}
