use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: Uuid,
    pub preferred_name: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub skin_concerns: Option<Vec<String>>,
    pub dob: Option<NaiveDate>,
    pub gender: Option<String>,
}

/// Contact details supplied with a booking request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    pub preferred_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub skin_concerns: Option<Vec<String>>,
    #[serde(default)]
    pub dob: Option<NaiveDate>,
    #[serde(default)]
    pub gender: Option<String>,
}

impl ClientInfo {
    /// The dedup key: trimmed, lowercased, `None` when blank.
    pub fn normalized_email(&self) -> Option<String> {
        self.email
            .as_deref()
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
    }
}
