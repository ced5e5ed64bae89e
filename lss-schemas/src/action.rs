use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionRole {
    Operator,
    #[serde(rename = "qa")]
    QA,
    TeamLeader,
    Manager,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    // Ord is derived in declaration order; declare weakest-first so that
    // `CRITICAL > HIGH > MEDIUM > LOW` holds under the derived comparison.
    Low,
    Medium,
    High,
    Critical,
}

/// A remediation template. `code` is unique. `instruction_template` holds
/// `{placeholder}` fields substituted at render time (§4.7).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDef {
    pub code: String,
    pub name: String,
    pub risk_code: Option<String>,
    pub target_role: ActionRole,
    pub instruction_template: String,
    pub priority: Priority,
    pub category: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_ordering_matches_spec() {
        assert!(Priority::Critical > Priority::High);
        assert!(Priority::High > Priority::Medium);
        assert!(Priority::Medium > Priority::Low);
    }
}
