use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use super::{Client, Promotion, PromotionRef};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AppointmentStatus {
    Available,
    Booked,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Available => "available",
            AppointmentStatus::Booked => "booked",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "available" => Some(AppointmentStatus::Available),
            "booked" => Some(AppointmentStatus::Booked),
            _ => None,
        }
    }
}

/// A bookable slot. `scheduled_appointment` exists iff `status` is `Booked`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Uuid,
    pub date_time: NaiveDateTime,
    pub status: AppointmentStatus,
    pub promotion_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledAppointment {
    pub appointment_id: Uuid,
    pub service_name: String,
    pub skin_concerns: String,
    pub client: Client,
}

/// Admin projection: the slot joined with its booking and promotion.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentDetail {
    pub id: Uuid,
    pub date_time: NaiveDateTime,
    pub status: AppointmentStatus,
    pub scheduled_appointment: Option<ScheduledAppointment>,
    pub promotion: Option<Promotion>,
}

/// What anonymous callers see of a slot.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotView {
    pub id: Uuid,
    pub date_time: NaiveDateTime,
    pub status: AppointmentStatus,
}

impl From<Appointment> for SlotView {
    fn from(a: Appointment) -> Self {
        Self {
            id: a.id,
            date_time: a.date_time,
            status: a.status,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DayStatus {
    pub date_time: NaiveDateTime,
    pub has_available: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AppointmentDateTime {
    pub date: NaiveDate,
    pub time: NaiveDateTime,
}

/// One item of an admin slot batch.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSlot {
    #[serde(deserialize_with = "deserialize_date_time")]
    pub date_time: NaiveDateTime,
    #[serde(default)]
    pub promotion: Option<PromotionRef>,
}

const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Parses the timestamp shapes browsers send, truncated to whole seconds.
pub fn parse_date_time(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim().trim_end_matches('Z');
    DATE_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.with_nanosecond(0).unwrap_or(dt))
}

/// Accepts `YYYY-MM-DD` or any timestamp `parse_date_time` accepts.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .ok()
        .or_else(|| parse_date_time(s).map(|dt| dt.date()))
}

fn deserialize_date_time<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_date_time(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid dateTime: {raw}")))
}
