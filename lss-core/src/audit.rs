use csv::Writer;
use lss_schemas::instruction::Instruction;
use serde::Serialize;
use std::fs;
use std::io;

#[derive(Debug, Serialize)]
struct AuditEntry {
    created_at: String,
    instruction_id: String,
    target_date: String,
    role: String,
    action_code: String,
    batch_id: String,
    node_code: String,
    priority: String,
    evidence_json: String,
}

/// Persists a structured CSV trail of every `Instruction` generated by the
/// instruction engine, one row per instruction, for downstream traceability.
pub struct InstructionAuditLog {
    writer: Writer<fs::File>,
}

impl InstructionAuditLog {
    pub fn new(path: &str) -> Result<Self, io::Error> {
        let writer = Writer::from_path(path)?;
        Ok(Self { writer })
    }

    pub fn log_instruction(&mut self, instruction: &Instruction) -> Result<(), anyhow::Error> {
        let evidence_json = serde_json::to_string(&instruction.evidence)?;

        let entry = AuditEntry {
            created_at: instruction.created_at.to_rfc3339(),
            instruction_id: instruction.id.clone(),
            target_date: instruction.target_date.to_string(),
            role: format!("{:?}", instruction.role),
            action_code: instruction.action_code.clone(),
            batch_id: instruction.batch_id.clone().unwrap_or_default(),
            node_code: instruction.node_code.clone().unwrap_or_default(),
            priority: format!("{:?}", instruction.priority),
            evidence_json,
        };

        self.writer.serialize(entry)?;
        self.writer.flush()?;
        Ok(())
    }
}
