use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::{ToSql, Type};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::models::{
    AdminUser, Appointment, AppointmentDetail, AppointmentStatus, Client, ConsentForm,
    ConsentFormStatement, Promotion, ScheduledAppointment, Service, ServiceType,
};

const DATE_TIME_FMT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FMT: &str = "%Y-%m-%d";

pub fn format_date_time(dt: &NaiveDateTime) -> String {
    dt.format(DATE_TIME_FMT).to_string()
}

fn format_date(d: &NaiveDate) -> String {
    d.format(DATE_FMT).to_string()
}

fn conversion_error(
    idx: usize,
    e: impl Into<Box<dyn std::error::Error + Send + Sync>>,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into())
}

fn get_uuid(row: &Row, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw).map_err(|e| conversion_error(idx, e))
}

fn get_opt_uuid(row: &Row, idx: usize) -> rusqlite::Result<Option<Uuid>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| Uuid::parse_str(&s).map_err(|e| conversion_error(idx, e)))
        .transpose()
}

fn get_date_time(row: &Row, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let raw: String = row.get(idx)?;
    NaiveDateTime::parse_from_str(&raw, DATE_TIME_FMT).map_err(|e| conversion_error(idx, e))
}

fn get_opt_date(row: &Row, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| NaiveDate::parse_from_str(&s, DATE_FMT).map_err(|e| conversion_error(idx, e)))
        .transpose()
}

fn get_status(row: &Row, idx: usize) -> rusqlite::Result<AppointmentStatus> {
    let raw: String = row.get(idx)?;
    AppointmentStatus::parse(&raw)
        .ok_or_else(|| conversion_error(idx, format!("unknown appointment status: {raw}")))
}

fn get_opt_json_list(row: &Row, idx: usize) -> rusqlite::Result<Option<Vec<String>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| serde_json::from_str(&s).map_err(|e| conversion_error(idx, e)))
        .transpose()
}

fn to_json_list(items: &Option<Vec<String>>) -> Option<String> {
    items
        .as_ref()
        .map(|v| serde_json::to_string(v).unwrap_or_else(|_| "[]".to_string()))
}

// ── Appointments ──

/// Which slots a read projection considers, by promotion.
#[derive(Debug, Clone, Copy)]
pub enum PromotionFilter<'a> {
    Any,
    NonPromotional,
    Named(&'a str),
}

impl PromotionFilter<'_> {
    fn clause(&self) -> &'static str {
        match self {
            PromotionFilter::Any => "",
            PromotionFilter::NonPromotional => " AND a.promotion_id IS NULL",
            PromotionFilter::Named(_) => {
                " AND a.promotion_id IN (SELECT id FROM promotions WHERE name = :promotion)"
            }
        }
    }
}

const APPOINTMENT_COLUMNS: &str = "a.id, a.date_time, a.status, a.promotion_id";

fn appointment_from_row(row: &Row) -> rusqlite::Result<Appointment> {
    Ok(Appointment {
        id: get_uuid(row, 0)?,
        date_time: get_date_time(row, 1)?,
        status: get_status(row, 2)?,
        promotion_id: get_opt_uuid(row, 3)?,
    })
}

pub fn insert_appointment(conn: &Connection, appt: &Appointment) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO appointments (id, date_time, status, promotion_id) VALUES (?1, ?2, ?3, ?4)",
        params![
            appt.id.to_string(),
            format_date_time(&appt.date_time),
            appt.status.as_str(),
            appt.promotion_id.map(|p| p.to_string()),
        ],
    )?;
    Ok(())
}

pub fn get_appointment(conn: &Connection, id: &Uuid) -> rusqlite::Result<Option<Appointment>> {
    conn.query_row(
        &format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments a WHERE a.id = ?1"),
        params![id.to_string()],
        appointment_from_row,
    )
    .optional()
}

pub fn appointment_exists_at(conn: &Connection, dt: &NaiveDateTime) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM appointments WHERE date_time = ?1",
        params![format_date_time(dt)],
        |row| row.get(0),
    )
}

pub fn list_appointments_on(
    conn: &Connection,
    date: &NaiveDate,
    promotion: PromotionFilter,
) -> rusqlite::Result<Vec<Appointment>> {
    let sql = format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments a
         WHERE date(a.date_time) = :date{} ORDER BY a.date_time ASC",
        promotion.clause()
    );
    query_appointments(conn, &sql, (":date", format_date(date)), promotion)
}

pub fn list_appointments_since(
    conn: &Connection,
    since: &NaiveDateTime,
    promotion: PromotionFilter,
) -> rusqlite::Result<Vec<Appointment>> {
    let sql = format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments a
         WHERE a.date_time >= :since{} ORDER BY a.date_time ASC",
        promotion.clause()
    );
    query_appointments(conn, &sql, (":since", format_date_time(since)), promotion)
}

fn query_appointments(
    conn: &Connection,
    sql: &str,
    (name, value): (&str, String),
    promotion: PromotionFilter,
) -> rusqlite::Result<Vec<Appointment>> {
    let mut stmt = conn.prepare(sql)?;
    let mut named: Vec<(&str, &dyn ToSql)> = vec![(name, &value)];
    if let PromotionFilter::Named(promo) = &promotion {
        named.push((":promotion", promo));
    }
    let rows = stmt.query_map(named.as_slice(), appointment_from_row)?;
    rows.collect()
}

/// Flips an available slot to booked. `promotion_id` only tags a slot that
/// has no promotion yet. Returns false when the slot was not available.
pub fn mark_booked(
    conn: &Connection,
    id: &Uuid,
    promotion_id: Option<&Uuid>,
) -> rusqlite::Result<bool> {
    let count = conn.execute(
        "UPDATE appointments SET status = 'booked', promotion_id = COALESCE(promotion_id, ?2)
         WHERE id = ?1 AND status = 'available'",
        params![id.to_string(), promotion_id.map(|p| p.to_string())],
    )?;
    Ok(count > 0)
}

/// Filter for the admin projection; every set field narrows the result.
#[derive(Debug, Clone, Default)]
pub struct DetailFilter {
    pub booked_only: bool,
    pub on_date: Option<NaiveDate>,
    pub since: Option<NaiveDateTime>,
    pub promotion: Option<String>,
}

pub fn list_appointment_details(
    conn: &Connection,
    filter: &DetailFilter,
) -> rusqlite::Result<Vec<AppointmentDetail>> {
    let mut sql = String::from(
        "SELECT a.id, a.date_time, a.status,
                s.service_name, s.skin_concerns,
                c.id, c.preferred_name, c.email, c.phone_number, c.skin_concerns, c.dob, c.gender,
                p.id, p.name
         FROM appointments a
         LEFT JOIN scheduled_appointments s ON s.appointment_id = a.id
         LEFT JOIN clients c ON c.id = s.client_id
         LEFT JOIN promotions p ON p.id = a.promotion_id
         WHERE 1 = 1",
    );
    let mut params_vec: Vec<Box<dyn ToSql>> = vec![];

    if filter.booked_only {
        sql.push_str(" AND a.status = 'booked'");
    }
    if let Some(date) = &filter.on_date {
        params_vec.push(Box::new(format_date(date)));
        sql.push_str(&format!(" AND date(a.date_time) = ?{}", params_vec.len()));
    }
    if let Some(since) = &filter.since {
        params_vec.push(Box::new(format_date_time(since)));
        sql.push_str(&format!(" AND a.date_time >= ?{}", params_vec.len()));
    }
    if let Some(promotion) = &filter.promotion {
        params_vec.push(Box::new(promotion.clone()));
        sql.push_str(&format!(" AND p.name = ?{}", params_vec.len()));
    }
    sql.push_str(" ORDER BY a.date_time ASC");

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), |row| {
        let id = get_uuid(row, 0)?;
        let service_name: Option<String> = row.get(3)?;
        let scheduled_appointment = match service_name {
            Some(service_name) => Some(ScheduledAppointment {
                appointment_id: id,
                service_name,
                skin_concerns: row.get(4)?,
                client: Client {
                    id: get_uuid(row, 5)?,
                    preferred_name: row.get(6)?,
                    email: row.get(7)?,
                    phone_number: row.get(8)?,
                    skin_concerns: get_opt_json_list(row, 9)?,
                    dob: get_opt_date(row, 10)?,
                    gender: row.get(11)?,
                },
            }),
            None => None,
        };
        let promotion = match get_opt_uuid(row, 12)? {
            Some(promo_id) => Some(Promotion {
                id: promo_id,
                name: row.get(13)?,
            }),
            None => None,
        };
        Ok(AppointmentDetail {
            id,
            date_time: get_date_time(row, 1)?,
            status: get_status(row, 2)?,
            scheduled_appointment,
            promotion,
        })
    })?;
    rows.collect()
}

// ── Scheduled Appointments ──

pub fn scheduled_appointment_exists(conn: &Connection, appointment_id: &Uuid) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM scheduled_appointments WHERE appointment_id = ?1",
        params![appointment_id.to_string()],
        |row| row.get(0),
    )
}

pub fn insert_scheduled_appointment(
    conn: &Connection,
    appointment_id: &Uuid,
    client_id: &Uuid,
    service_name: &str,
    skin_concerns: &str,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO scheduled_appointments (appointment_id, client_id, service_name, skin_concerns)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            appointment_id.to_string(),
            client_id.to_string(),
            service_name,
            skin_concerns,
        ],
    )?;
    Ok(())
}

pub fn client_id_for_appointment(conn: &Connection, appointment_id: &Uuid) -> rusqlite::Result<Option<Uuid>> {
    conn.query_row(
        "SELECT client_id FROM scheduled_appointments WHERE appointment_id = ?1",
        params![appointment_id.to_string()],
        |row| get_uuid(row, 0),
    )
    .optional()
}

// ── Clients ──

const CLIENT_COLUMNS: &str =
    "id, preferred_name, email, phone_number, skin_concerns, dob, gender";

fn client_from_row(row: &Row) -> rusqlite::Result<Client> {
    Ok(Client {
        id: get_uuid(row, 0)?,
        preferred_name: row.get(1)?,
        email: row.get(2)?,
        phone_number: row.get(3)?,
        skin_concerns: get_opt_json_list(row, 4)?,
        dob: get_opt_date(row, 5)?,
        gender: row.get(6)?,
    })
}

pub fn get_client(conn: &Connection, id: &Uuid) -> rusqlite::Result<Option<Client>> {
    conn.query_row(
        &format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE id = ?1"),
        params![id.to_string()],
        client_from_row,
    )
    .optional()
}

pub fn find_client_by_email(conn: &Connection, email: &str) -> rusqlite::Result<Option<Client>> {
    conn.query_row(
        &format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE email = ?1"),
        params![email],
        client_from_row,
    )
    .optional()
}

pub fn insert_client(conn: &Connection, client: &Client) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO clients (id, preferred_name, email, phone_number, skin_concerns, dob, gender)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            client.id.to_string(),
            client.preferred_name,
            client.email,
            client.phone_number,
            to_json_list(&client.skin_concerns),
            client.dob.as_ref().map(format_date),
            client.gender,
        ],
    )?;
    Ok(())
}

// ── Promotions ──

pub fn get_promotion(conn: &Connection, id: &Uuid) -> rusqlite::Result<Option<Promotion>> {
    conn.query_row(
        "SELECT id, name FROM promotions WHERE id = ?1",
        params![id.to_string()],
        |row| {
            Ok(Promotion {
                id: get_uuid(row, 0)?,
                name: row.get(1)?,
            })
        },
    )
    .optional()
}

pub fn get_promotion_by_name(conn: &Connection, name: &str) -> rusqlite::Result<Option<Promotion>> {
    conn.query_row(
        "SELECT id, name FROM promotions WHERE name = ?1",
        params![name],
        |row| {
            Ok(Promotion {
                id: get_uuid(row, 0)?,
                name: row.get(1)?,
            })
        },
    )
    .optional()
}

pub fn insert_promotion(conn: &Connection, promotion: &Promotion) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO promotions (id, name) VALUES (?1, ?2)",
        params![promotion.id.to_string(), promotion.name],
    )?;
    Ok(())
}

pub fn list_promotions(conn: &Connection) -> rusqlite::Result<Vec<Promotion>> {
    let mut stmt = conn.prepare("SELECT id, name FROM promotions ORDER BY name ASC")?;
    let rows = stmt.query_map([], |row| {
        Ok(Promotion {
            id: get_uuid(row, 0)?,
            name: row.get(1)?,
        })
    })?;
    rows.collect()
}

// ── Consent Forms ──

pub fn insert_consent_form(conn: &Connection, form: &ConsentForm) -> rusqlite::Result<()> {
    let statements =
        serde_json::to_string(&form.initialed_statements).unwrap_or_else(|_| "[]".to_string());
    conn.execute(
        "INSERT INTO consent_forms (id, client_id, appointment_id, printed_name, initialed_statements, initials, signature)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            form.id.to_string(),
            form.client_id.to_string(),
            form.appointment_id.map(|a| a.to_string()),
            form.printed_name,
            statements,
            form.initials,
            form.signature,
        ],
    )?;
    Ok(())
}

pub fn get_consent_form_for_client(conn: &Connection, client_id: &Uuid) -> rusqlite::Result<Option<ConsentForm>> {
    conn.query_row(
        "SELECT id, client_id, appointment_id, printed_name, initialed_statements, initials, signature
         FROM consent_forms WHERE client_id = ?1",
        params![client_id.to_string()],
        |row| {
            Ok(ConsentForm {
                id: get_uuid(row, 0)?,
                client_id: get_uuid(row, 1)?,
                appointment_id: get_opt_uuid(row, 2)?,
                printed_name: row.get(3)?,
                initialed_statements: get_opt_json_list(row, 4)?.unwrap_or_default(),
                initials: row.get(5)?,
                signature: row.get(6)?,
            })
        },
    )
    .optional()
}

// ── Consent Form Statements ──

fn statement_from_row(row: &Row) -> rusqlite::Result<ConsentFormStatement> {
    Ok(ConsentFormStatement {
        id: row.get(0)?,
        statement: row.get(1)?,
        is_active: row.get::<_, i32>(2)? != 0,
    })
}

pub fn list_statements(conn: &Connection, include_inactive: bool) -> rusqlite::Result<Vec<ConsentFormStatement>> {
    let sql = if include_inactive {
        "SELECT id, statement, is_active FROM consent_form_statements ORDER BY id ASC"
    } else {
        "SELECT id, statement, is_active FROM consent_form_statements WHERE is_active = 1 ORDER BY id ASC"
    };
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([], statement_from_row)?;
    rows.collect()
}

pub fn get_statement(conn: &Connection, id: i64) -> rusqlite::Result<Option<ConsentFormStatement>> {
    conn.query_row(
        "SELECT id, statement, is_active FROM consent_form_statements WHERE id = ?1",
        params![id],
        statement_from_row,
    )
    .optional()
}

pub fn insert_statement(conn: &Connection, statement: &str, is_active: bool) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO consent_form_statements (statement, is_active) VALUES (?1, ?2)",
        params![statement, is_active as i32],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_statement(
    conn: &Connection,
    id: i64,
    statement: &str,
    is_active: bool,
) -> rusqlite::Result<bool> {
    let count = conn.execute(
        "UPDATE consent_form_statements SET statement = ?1, is_active = ?2 WHERE id = ?3",
        params![statement, is_active as i32, id],
    )?;
    Ok(count > 0)
}

pub fn deactivate_statement(conn: &Connection, id: i64) -> rusqlite::Result<bool> {
    let count = conn.execute(
        "UPDATE consent_form_statements SET is_active = 0 WHERE id = ?1",
        params![id],
    )?;
    Ok(count > 0)
}

// ── Services ──

pub fn list_active_services(
    conn: &Connection,
    service_type: Option<ServiceType>,
) -> rusqlite::Result<Vec<Service>> {
    let mut stmt = conn.prepare(
        "SELECT id, service_name, promotion_name, service_type, card_title, card_content, card_img_src,
                card_overlay_content, package_items, tags, not_bookable, price, is_active
         FROM services
         WHERE is_active = 1 AND (?1 IS NULL OR service_type = ?1)
         ORDER BY id ASC",
    )?;
    let rows = stmt.query_map(params![service_type.map(|t| t.as_str())], |row| {
        let raw_type: String = row.get(3)?;
        Ok(Service {
            id: row.get(0)?,
            service_name: row.get(1)?,
            promotion_name: row.get(2)?,
            service_type: ServiceType::parse(&raw_type)
                .ok_or_else(|| conversion_error(3, format!("unknown service type: {raw_type}")))?,
            card_title: row.get(4)?,
            card_content: row.get(5)?,
            card_img_src: row.get(6)?,
            card_overlay_content: row.get(7)?,
            package_items: get_opt_json_list(row, 8)?,
            tags: get_opt_json_list(row, 9)?,
            not_bookable: row.get::<_, Option<i32>>(10)?.map(|v| v != 0),
            price: row.get(11)?,
            is_active: row.get::<_, i32>(12)? != 0,
        })
    })?;
    rows.collect()
}

pub fn insert_service(conn: &Connection, service: &Service) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO services (service_name, promotion_name, service_type, card_title, card_content, card_img_src,
                               card_overlay_content, package_items, tags, not_bookable, price, is_active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            service.service_name,
            service.promotion_name,
            service.service_type.as_str(),
            service.card_title,
            service.card_content,
            service.card_img_src,
            service.card_overlay_content,
            to_json_list(&service.package_items),
            to_json_list(&service.tags),
            service.not_bookable.map(|b| b as i32),
            service.price,
            service.is_active as i32,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

// ── Admin Users ──

pub fn get_admin_by_username(conn: &Connection, username: &str) -> rusqlite::Result<Option<AdminUser>> {
    conn.query_row(
        "SELECT id, username, password_hash FROM admin_users WHERE username = ?1",
        params![username],
        |row| {
            Ok(AdminUser {
                id: row.get(0)?,
                username: row.get(1)?,
                password_hash: row.get(2)?,
            })
        },
    )
    .optional()
}

pub fn insert_admin(conn: &Connection, username: &str, password_hash: &str) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO admin_users (username, password_hash) VALUES (?1, ?2)",
        params![username, password_hash],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn set_admin_token(
    conn: &Connection,
    id: i64,
    token_hash: &str,
    issued_at: &NaiveDateTime,
) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE admin_users SET token_hash = ?1, token_issued_at = ?2 WHERE id = ?3",
        params![token_hash, format_date_time(issued_at), id],
    )?;
    Ok(())
}

pub fn admin_token_exists(conn: &Connection, token_hash: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM admin_users WHERE token_hash = ?1",
        params![token_hash],
        |row| row.get(0),
    )
}

pub fn count_admins(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM admin_users", [], |row| row.get(0))
}
