use rusqlite::{Connection, TransactionBehavior};

use crate::db::queries;
use crate::errors::{AppError, Result};
use crate::models::{ConsentFormStatement, Service, ServiceType, StatementInput};

// ── Services ──

pub fn active_services(conn: &Connection, service_type: Option<ServiceType>) -> Result<Vec<Service>> {
    Ok(queries::list_active_services(conn, service_type)?)
}

/// Inserts the whole batch or nothing.
pub fn add_services(conn: &mut Connection, services: &[Service]) -> Result<Vec<i64>> {
    if services.is_empty() {
        return Err(AppError::Validation("no services supplied".to_string()));
    }
    if let Some(bad) = services.iter().find(|s| s.service_name.trim().is_empty()) {
        return Err(AppError::Validation(format!(
            "serviceName is required (card \"{}\")",
            bad.card_title
        )));
    }

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let mut ids = Vec::with_capacity(services.len());
    for service in services {
        ids.push(queries::insert_service(&tx, service)?);
    }
    tx.commit()?;

    tracing::info!(count = ids.len(), "added catalog services");
    Ok(ids)
}

// ── Consent Form Statements ──

pub fn statements(conn: &Connection, include_inactive: bool) -> Result<Vec<ConsentFormStatement>> {
    Ok(queries::list_statements(conn, include_inactive)?)
}

pub fn statement(conn: &Connection, id: i64) -> Result<ConsentFormStatement> {
    queries::get_statement(conn, id)?
        .ok_or_else(|| AppError::NotFound(format!("consent form statement {id}")))
}

pub fn add_statements(conn: &mut Connection, inputs: &[StatementInput]) -> Result<Vec<ConsentFormStatement>> {
    if inputs.is_empty() {
        return Err(AppError::Validation("no statements supplied".to_string()));
    }
    if inputs.iter().any(|i| i.statement.trim().is_empty()) {
        return Err(AppError::Validation("statement text is required".to_string()));
    }

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let mut created = Vec::with_capacity(inputs.len());
    for input in inputs {
        let text = input.statement.trim();
        let id = queries::insert_statement(&tx, text, input.is_active)?;
        created.push(ConsentFormStatement {
            id,
            statement: text.to_string(),
            is_active: input.is_active,
        });
    }
    tx.commit()?;
    Ok(created)
}

pub fn update_statement(conn: &Connection, id: i64, input: &StatementInput) -> Result<ConsentFormStatement> {
    let text = input.statement.trim();
    if text.is_empty() {
        return Err(AppError::Validation("statement text is required".to_string()));
    }
    if !queries::update_statement(conn, id, text, input.is_active)? {
        return Err(AppError::NotFound(format!("consent form statement {id}")));
    }
    statement(conn, id)
}

/// Retires a statement. Signed forms keep the text they were shown.
pub fn remove_statement(conn: &Connection, id: i64) -> Result<()> {
    if queries::deactivate_statement(conn, id)? {
        Ok(())
    } else {
        Err(AppError::NotFound(format!("consent form statement {id}")))
    }
}
