use std::collections::HashSet;

use rusqlite::{Connection, Transaction, TransactionBehavior};
use uuid::Uuid;

use crate::db::{is_unique_violation, queries};
use crate::errors::{AppError, Result};
use crate::models::{
    Appointment, AppointmentStatus, BookingConfirmation, BookingRequest, Client, ClientInfo,
    ConsentForm, ConsentFormRequest, NewSlot, Promotion, PromotionRef,
};

/// Creates a batch of available slots.
///
/// The batch is all-or-nothing: every item is checked against the store and
/// against the rest of the batch first, and if any timestamp is taken the
/// whole batch is rejected with one message per offending item. Nothing is
/// written in that case.
pub fn create_slots(conn: &mut Connection, slots: &[NewSlot]) -> Result<Vec<Appointment>> {
    insert_slots(conn, slots, false)
}

/// Same as [`create_slots`], but every item must name a promotion.
pub fn create_promotional_slots(
    conn: &mut Connection,
    slots: &[NewSlot],
) -> Result<Vec<Appointment>> {
    insert_slots(conn, slots, true)
}

fn insert_slots(
    conn: &mut Connection,
    slots: &[NewSlot],
    require_promotion: bool,
) -> Result<Vec<Appointment>> {
    if slots.is_empty() {
        return Err(AppError::Validation("no appointments supplied".to_string()));
    }
    if require_promotion && slots.iter().any(|s| s.promotion.is_none()) {
        return Err(AppError::Validation(
            "promotion must be specified for every appointment".to_string(),
        ));
    }

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let mut seen = HashSet::new();
    let mut conflicts = vec![];
    for slot in slots {
        let label = slot.date_time.format("%Y-%m-%d %H:%M");
        if !seen.insert(slot.date_time) {
            conflicts.push(format!("Appointment: {label} appears more than once"));
        } else if queries::appointment_exists_at(&tx, &slot.date_time)? {
            conflicts.push(format!("Appointment: {label} already exists"));
        }
    }
    if !conflicts.is_empty() {
        tracing::info!(count = conflicts.len(), "rejected slot batch with conflicts");
        return Err(AppError::SlotConflicts(conflicts));
    }

    let mut created = Vec::with_capacity(slots.len());
    for slot in slots {
        let promotion_id = match &slot.promotion {
            Some(reference) => Some(resolve_promotion(&tx, reference)?.id),
            None => None,
        };
        let appt = Appointment {
            id: Uuid::new_v4(),
            date_time: slot.date_time,
            status: AppointmentStatus::Available,
            promotion_id,
        };
        queries::insert_appointment(&tx, &appt).map_err(|e| {
            if is_unique_violation(&e) {
                AppError::SlotConflicts(vec![format!(
                    "Appointment: {} already exists",
                    appt.date_time.format("%Y-%m-%d %H:%M")
                )])
            } else {
                e.into()
            }
        })?;
        created.push(appt);
    }

    tx.commit()?;
    tracing::info!(count = created.len(), "created appointment slots");
    Ok(created)
}

/// Books an available slot for a client.
///
/// The existence check, client resolution, promotion resolution and status
/// flip commit together. The primary key on
/// `scheduled_appointments.appointment_id` backs the check, so two racing
/// requests end in one booking and one conflict.
pub fn request_booking(conn: &mut Connection, req: &BookingRequest) -> Result<BookingConfirmation> {
    let details = &req.scheduled_appointment;
    if details.service_name.trim().is_empty() {
        return Err(AppError::Validation("serviceName is required".to_string()));
    }
    if details.client.preferred_name.trim().is_empty() {
        return Err(AppError::Validation("client preferredName is required".to_string()));
    }

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let appt = queries::get_appointment(&tx, &req.appointment_id)?
        .ok_or_else(|| AppError::NotFound(format!("appointment {}", req.appointment_id)))?;
    if queries::scheduled_appointment_exists(&tx, &req.appointment_id)? {
        return Err(already_booked());
    }

    let client = resolve_client(&tx, &details.client)?;
    let promotion_id = match &req.promotion {
        Some(reference) => Some(resolve_promotion(&tx, reference)?.id),
        None => None,
    };
    // A slot published under a promotion stays with it.
    if let (Some(existing), Some(requested)) = (appt.promotion_id, promotion_id) {
        if existing != requested {
            return Err(AppError::Conflict(
                "appointment belongs to a different promotion".to_string(),
            ));
        }
    }

    queries::insert_scheduled_appointment(
        &tx,
        &req.appointment_id,
        &client.id,
        details.service_name.trim(),
        &details.skin_concerns,
    )
    .map_err(|e| {
        if is_unique_violation(&e) {
            already_booked()
        } else {
            e.into()
        }
    })?;

    if !queries::mark_booked(&tx, &req.appointment_id, promotion_id.as_ref())? {
        return Err(already_booked());
    }

    tx.commit()?;
    tracing::info!(
        appointment_id = %req.appointment_id,
        client_id = %client.id,
        "appointment booked"
    );

    Ok(BookingConfirmation {
        appointment_id: req.appointment_id,
        client_id: client.id,
        client_email: client.email,
    })
}

fn already_booked() -> AppError {
    AppError::Conflict("appointment is already booked".to_string())
}

/// Reuses the client with the same email, or creates one.
fn resolve_client(tx: &Transaction, info: &ClientInfo) -> Result<Client> {
    let email = info.normalized_email();
    if let Some(email) = &email {
        if let Some(existing) = queries::find_client_by_email(tx, email)? {
            return Ok(existing);
        }
    }

    let client = Client {
        id: Uuid::new_v4(),
        preferred_name: info.preferred_name.trim().to_string(),
        email,
        phone_number: info.phone_number.clone(),
        skin_concerns: info.skin_concerns.clone(),
        dob: info.dob,
        gender: info.gender.clone(),
    };
    queries::insert_client(tx, &client)?;
    Ok(client)
}

/// Looks a promotion up by id, then by name, creating it from the name if
/// neither matches.
pub fn resolve_promotion(conn: &Connection, reference: &PromotionRef) -> Result<Promotion> {
    if let Some(id) = &reference.id {
        if let Some(found) = queries::get_promotion(conn, id)? {
            return Ok(found);
        }
        if reference.trimmed_name().is_none() {
            return Err(AppError::NotFound(format!("promotion {id}")));
        }
    }

    let name = reference.trimmed_name().ok_or_else(|| {
        AppError::Validation("promotion requires an id or a name".to_string())
    })?;
    if let Some(found) = queries::get_promotion_by_name(conn, name)? {
        return Ok(found);
    }

    let promotion = Promotion {
        id: Uuid::new_v4(),
        name: name.to_string(),
    };
    queries::insert_promotion(conn, &promotion)?;
    tracing::info!(name = %promotion.name, "created promotion");
    Ok(promotion)
}

/// Creates a named promotion; the name must be new.
pub fn create_promotion(conn: &Connection, name: &str) -> Result<Promotion> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("promotion name is required".to_string()));
    }
    if queries::get_promotion_by_name(conn, name)?.is_some() {
        return Err(AppError::Conflict("Promotion already exists!".to_string()));
    }

    let promotion = Promotion {
        id: Uuid::new_v4(),
        name: name.to_string(),
    };
    queries::insert_promotion(conn, &promotion).map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("Promotion already exists!".to_string())
        } else {
            e.into()
        }
    })?;
    Ok(promotion)
}

/// Binds a signed consent form to a client.
///
/// The client comes from `clientId` when given. Otherwise the form is bound
/// through `appointmentId` to the client who booked that slot; if the slot
/// has no booking yet, a client is created from the printed name so the form
/// is never stored without an owner. A client holds at most one form.
pub fn attach_consent_form(conn: &mut Connection, req: &ConsentFormRequest) -> Result<ConsentForm> {
    if req.printed_name.trim().is_empty() {
        return Err(AppError::Validation("printedName is required".to_string()));
    }
    if req.initials.trim().is_empty() || req.signature.trim().is_empty() {
        return Err(AppError::Validation("initials and signature are required".to_string()));
    }

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let client_id = match (&req.client_id, &req.appointment_id) {
        (Some(client_id), _) => {
            if queries::get_client(&tx, client_id)?.is_none() {
                return Err(AppError::NotFound(format!("client {client_id}")));
            }
            *client_id
        }
        (None, Some(appointment_id)) => {
            if queries::get_appointment(&tx, appointment_id)?.is_none() {
                return Err(AppError::NotFound(format!("appointment {appointment_id}")));
            }
            match queries::client_id_for_appointment(&tx, appointment_id)? {
                Some(id) => id,
                None => {
                    let stub = Client {
                        id: Uuid::new_v4(),
                        preferred_name: req.printed_name.trim().to_string(),
                        email: None,
                        phone_number: None,
                        skin_concerns: None,
                        dob: None,
                        gender: None,
                    };
                    queries::insert_client(&tx, &stub)?;
                    tracing::info!(client_id = %stub.id, "created client from consent form");
                    stub.id
                }
            }
        }
        (None, None) => {
            return Err(AppError::Validation(
                "clientId or appointmentId is required".to_string(),
            ))
        }
    };

    if let Some(appointment_id) = &req.appointment_id {
        if queries::get_appointment(&tx, appointment_id)?.is_none() {
            return Err(AppError::NotFound(format!("appointment {appointment_id}")));
        }
    }

    let form = ConsentForm {
        id: Uuid::new_v4(),
        client_id,
        appointment_id: req.appointment_id,
        printed_name: req.printed_name.trim().to_string(),
        initialed_statements: req.initialed_statements.clone(),
        initials: req.initials.clone(),
        signature: req.signature.clone(),
    };
    queries::insert_consent_form(&tx, &form).map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("client already has a consent form".to_string())
        } else {
            e.into()
        }
    })?;

    tx.commit()?;
    tracing::info!(client_id = %form.client_id, form_id = %form.id, "consent form attached");
    Ok(form)
}
