use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ClientInfo, PromotionRef};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub appointment_id: Uuid,
    pub scheduled_appointment: ScheduledAppointmentRequest,
    #[serde(default)]
    pub promotion: Option<PromotionRef>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledAppointmentRequest {
    pub service_name: String,
    pub client: ClientInfo,
    #[serde(default)]
    pub skin_concerns: String,
}

/// Result of a committed booking.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingConfirmation {
    pub appointment_id: Uuid,
    pub client_id: Uuid,
    #[serde(skip)]
    pub client_email: Option<String>,
}
