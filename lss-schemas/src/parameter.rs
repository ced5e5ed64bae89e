use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterRole {
    Input,
    Control,
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterDataType {
    Scalar,
    Spectrum,
    Image,
    Grade,
}

/// A measurable attribute of a `Node`. `(node_code, code)` is unique.
///
/// Invariant: if both `lsl` and `usl` are present, `lsl < usl`; `target`,
/// if present, lies in `[lsl, usl]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDef {
    pub node_code: String,
    pub code: String,
    pub name: String,
    pub unit: String,
    pub role: ParameterRole,
    pub usl: Option<f64>,
    pub lsl: Option<f64>,
    pub target: Option<f64>,
    pub data_type: ParameterDataType,
}

impl ParameterDef {
    /// Validates the limit/target invariant stated in the data model.
    pub fn limits_are_consistent(&self) -> bool {
        if let (Some(lsl), Some(usl)) = (self.lsl, self.usl) {
            if !(lsl < usl) {
                return false;
            }
        }
        if let Some(target) = self.target {
            if let Some(lsl) = self.lsl {
                if target < lsl {
                    return false;
                }
            }
            if let Some(usl) = self.usl {
                if target > usl {
                    return false;
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_inverted_limits() {
        let p = ParameterDef {
            node_code: "E04".into(),
            code: "temp".into(),
            name: "Temperature".into(),
            unit: "C".into(),
            role: ParameterRole::Output,
            usl: Some(10.0),
            lsl: Some(20.0),
            target: None,
            data_type: ParameterDataType::Scalar,
        };
        assert!(!p.limits_are_consistent());
    }

    #[test]
    fn rejects_target_outside_limits() {
        let p = ParameterDef {
            node_code: "E04".into(),
            code: "temp".into(),
            name: "Temperature".into(),
            unit: "C".into(),
            role: ParameterRole::Output,
            usl: Some(90.0),
            lsl: Some(80.0),
            target: Some(95.0),
            data_type: ParameterDataType::Scalar,
        };
        assert!(!p.limits_are_consistent());
    }

    #[test]
    fn accepts_consistent_limits() {
        let p = ParameterDef {
            node_code: "E04".into(),
            code: "temp".into(),
            name: "Temperature".into(),
            unit: "C".into(),
            role: ParameterRole::Output,
            usl: Some(90.0),
            lsl: Some(80.0),
            target: Some(85.0),
            data_type: ParameterDataType::Scalar,
        };
        assert!(p.limits_are_consistent());
    }
}
