use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Running,
    Completed,
}

/// A production run. Created implicitly at first measurement
/// ("auto-create batch").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub id: String,
    pub product_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: BatchStatus,
}

impl Batch {
    /// The defaults used when a `Measurement` references a batch id that
    /// has not been created yet (see DESIGN.md, "auto-create batch").
    pub fn auto_created(id: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            product_name: String::new(),
            start_time: started_at,
            end_time: None,
            status: BatchStatus::Running,
        }
    }
}
