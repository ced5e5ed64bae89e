use crate::action::{ActionRole, Priority};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstructionStatus {
    Pending,
    Read,
    Done,
}

impl InstructionStatus {
    /// Whether `self -> next` is a legal forward transition (§3: "only
    /// forward"). `Pending -> Read -> Done`, nothing else.
    pub fn can_advance_to(self, next: InstructionStatus) -> bool {
        matches!(
            (self, next),
            (InstructionStatus::Pending, InstructionStatus::Read)
                | (InstructionStatus::Read, InstructionStatus::Done)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstructionType {
    Tactical,
    Strategic,
}

/// An unstructured, string-keyed bag of scalars driving an Instruction
/// (Cpk, current/target value, violation counts, ...). Readers must
/// tolerate unknown keys (§9, "Evidence bag").
pub type Evidence = HashMap<String, serde_json::Value>;

/// A materialised per-role directive with a `Pending -> Read -> Done`
/// lifecycle. Transitions only move forward; duplicates for the same
/// `(target_date, role, action_code, batch_id, node_code)` are coalesced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub id: String,
    pub target_date: NaiveDate,
    pub role: ActionRole,
    pub batch_id: Option<String>,
    pub node_code: Option<String>,
    /// The `ActionDef.code` this instruction was rendered from. Part of
    /// the dedup key together with `target_date`/`role`/`batch_id`/`node_code`.
    pub action_code: String,
    pub content: String,
    pub status: InstructionStatus,
    pub priority: Priority,
    pub evidence: Evidence,
    pub feedback: Option<String>,
    pub instruction_type: InstructionType,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
    pub done_at: Option<DateTime<Utc>>,
}

impl Instruction {
    /// The tuple identifying duplicate generations of the same directive
    /// (§3, §4.7, §5).
    pub fn dedup_key(&self) -> (NaiveDate, ActionRole, String, Option<String>, Option<String>) {
        (
            self.target_date,
            self.role,
            self.action_code.clone(),
            self.batch_id.clone(),
            self.node_code.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_only_moves_forward() {
        assert!(InstructionStatus::Pending.can_advance_to(InstructionStatus::Read));
        assert!(InstructionStatus::Read.can_advance_to(InstructionStatus::Done));
        assert!(!InstructionStatus::Pending.can_advance_to(InstructionStatus::Done));
        assert!(!InstructionStatus::Read.can_advance_to(InstructionStatus::Pending));
        assert!(!InstructionStatus::Done.can_advance_to(InstructionStatus::Read));
    }
}
