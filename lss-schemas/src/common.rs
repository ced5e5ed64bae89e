use serde::{Deserialize, Serialize};

/// A numeric value paired with its unit of measure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueWithUnit<T> {
    pub value: T,
    pub unit: String,
}
