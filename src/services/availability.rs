use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use uuid::Uuid;

use crate::db::queries::{self, DetailFilter, PromotionFilter};
use crate::errors::{AppError, Result};
use crate::models::{
    Appointment, AppointmentDateTime, AppointmentDetail, AppointmentStatus, DayStatus, SlotView,
};

/// Non-promotional slots on `date`, earliest first.
pub fn slots_on(conn: &Connection, date: &NaiveDate) -> Result<Vec<SlotView>> {
    let appts = queries::list_appointments_on(conn, date, PromotionFilter::NonPromotional)?;
    Ok(appts.into_iter().map(SlotView::from).collect())
}

/// Slots of the named promotion on `date`, earliest first.
pub fn promotion_slots_on(conn: &Connection, date: &NaiveDate, promotion: &str) -> Result<Vec<SlotView>> {
    let appts = queries::list_appointments_on(conn, date, PromotionFilter::Named(promotion))?;
    Ok(appts.into_iter().map(SlotView::from).collect())
}

/// One entry per day from today onward that has any slot, promotional or not.
pub fn status_by_day(conn: &Connection, now: &NaiveDateTime) -> Result<Vec<DayStatus>> {
    let since = start_of_day(now);
    let appts = queries::list_appointments_since(conn, &since, PromotionFilter::Any)?;
    Ok(summarize_days(&appts))
}

pub fn promotion_status_by_day(
    conn: &Connection,
    now: &NaiveDateTime,
    promotion: &str,
) -> Result<Vec<DayStatus>> {
    let since = start_of_day(now);
    let appts = queries::list_appointments_since(conn, &since, PromotionFilter::Named(promotion))?;
    Ok(summarize_days(&appts))
}

/// Collapses slots (sorted by time) into one entry per date, keyed by the
/// first slot of that date.
fn summarize_days(appts: &[Appointment]) -> Vec<DayStatus> {
    let mut days: BTreeMap<NaiveDate, DayStatus> = BTreeMap::new();
    for appt in appts {
        let entry = days.entry(appt.date_time.date()).or_insert(DayStatus {
            date_time: appt.date_time,
            has_available: false,
        });
        if appt.status == AppointmentStatus::Available {
            entry.has_available = true;
        }
    }
    days.into_values().collect()
}

fn start_of_day(now: &NaiveDateTime) -> NaiveDateTime {
    now.date().and_hms_opt(0, 0, 0).unwrap_or(*now)
}

/// Anonymous lookup; exposes only when the slot is.
pub fn appointment_time(conn: &Connection, id: &Uuid) -> Result<AppointmentDateTime> {
    let appt = queries::get_appointment(conn, id)?
        .ok_or_else(|| AppError::NotFound(format!("appointment {id}")))?;
    Ok(AppointmentDateTime {
        date: appt.date_time.date(),
        time: appt.date_time,
    })
}

/// Flags of the admin listing.
#[derive(Debug, Clone, Default)]
pub struct AdminListQuery {
    pub booked: bool,
    pub include_archived: bool,
    pub date: Option<NaiveDate>,
    pub promotion: Option<String>,
}

/// Translates the admin flags into a store filter. Precedence, first match
/// wins:
///
/// | flags                 | result                         |
/// |-----------------------|--------------------------------|
/// | booked + archived     | every booked slot              |
/// | booked + date         | booked slots on that date      |
/// | booked                | booked slots from a day ago on |
/// | archived              | every slot                     |
/// | date                  | every slot on that date        |
/// | none                  | every slot from a day ago on   |
pub fn admin_filter(query: &AdminListQuery, now: &NaiveDateTime) -> DetailFilter {
    let recent = *now - Duration::days(1);
    let (booked_only, on_date, since) = match (query.booked, query.include_archived, query.date) {
        (true, true, _) => (true, None, None),
        (true, false, Some(date)) => (true, Some(date), None),
        (true, false, None) => (true, None, Some(recent)),
        (false, true, _) => (false, None, None),
        (false, false, Some(date)) => (false, Some(date), None),
        (false, false, None) => (false, None, Some(recent)),
    };
    DetailFilter {
        booked_only,
        on_date,
        since,
        promotion: query.promotion.clone(),
    }
}

pub fn admin_list(
    conn: &Connection,
    query: &AdminListQuery,
    now: &NaiveDateTime,
) -> Result<Vec<AppointmentDetail>> {
    Ok(queries::list_appointment_details(conn, &admin_filter(query, now))?)
}
