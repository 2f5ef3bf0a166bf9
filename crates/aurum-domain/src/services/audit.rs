use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub run_id: String,
    pub timestamp: i64,
    pub stage: String,
    pub symbol: Option<String>,
    pub action: String,
    pub error: Option<String>,
    pub details: serde_json::Value,
}
