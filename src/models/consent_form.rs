use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A signed attestation. Never updated after insert.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentForm {
    pub id: Uuid,
    pub client_id: Uuid,
    pub appointment_id: Option<Uuid>,
    pub printed_name: String,
    pub initialed_statements: Vec<String>,
    pub initials: String,
    pub signature: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentFormRequest {
    #[serde(default)]
    pub client_id: Option<Uuid>,
    #[serde(default)]
    pub appointment_id: Option<Uuid>,
    pub printed_name: String,
    #[serde(default)]
    pub initialed_statements: Vec<String>,
    pub initials: String,
    pub signature: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentFormStatement {
    pub id: i64,
    pub statement: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementInput {
    pub statement: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}
