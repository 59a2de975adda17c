use std::sync::Mutex;

use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine;
use chrono::Utc;
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use rusqlite::Connection;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::config::AppConfig;
use crate::db::{is_unique_violation, queries};
use crate::errors::{AppError, Result};
use crate::models::AdminUser;

const HASH_SCHEME: &str = "pbkdf2-sha256";
const SALT_LENGTH: usize = 16;
const KEY_LENGTH: usize = 32;
const TOKEN_BYTES: usize = 32;

/// Outcome of checking credentials, decided off the async runtime.
enum Credentials {
    Existing(i64),
    Seed(String),
}

/// Exchanges admin credentials for a fresh bearer token.
///
/// An existing admin row is checked against its stored hash. With no row for
/// the username, the configured account is accepted and its row is created
/// on the spot. Wrong credentials never write anything. Each successful
/// login replaces the previous token.
///
/// Key derivation runs on the blocking pool with the database unlocked.
pub async fn login(
    db: &Mutex<Connection>,
    config: &AppConfig,
    username: &str,
    password: &str,
) -> Result<String> {
    let admin = {
        let conn = db.lock()?;
        queries::get_admin_by_username(&conn, username)?
    };

    let checked = {
        let config = config.clone();
        let username = username.to_string();
        let password = password.to_string();
        tokio::task::spawn_blocking(move || check_credentials(&config, admin, &username, &password))
            .await
            .map_err(|e| AppError::Internal(format!("credential check failed: {e}")))?
    };
    let Some(checked) = checked else {
        tracing::warn!(username = %username, "admin login rejected");
        return Err(AppError::BadCredentials);
    };

    let conn = db.lock()?;
    let admin_id = match checked {
        Credentials::Existing(id) => id,
        Credentials::Seed(hash) => match queries::insert_admin(&conn, username, &hash) {
            Ok(id) => {
                tracing::info!(username = %username, "created admin account");
                id
            }
            // A concurrent login seeded the same account first.
            Err(e) if is_unique_violation(&e) => queries::get_admin_by_username(&conn, username)?
                .map(|a| a.id)
                .ok_or_else(|| AppError::Internal("admin row vanished".to_string()))?,
            Err(e) => return Err(e.into()),
        },
    };

    let token = generate_token();
    queries::set_admin_token(&conn, admin_id, &hash_token(&token), &Utc::now().naive_utc())?;
    tracing::info!(username = %username, "admin token issued");
    Ok(token)
}

fn check_credentials(
    config: &AppConfig,
    admin: Option<AdminUser>,
    username: &str,
    password: &str,
) -> Option<Credentials> {
    match admin {
        Some(admin) => {
            verify_password(password, &admin.password_hash).then_some(Credentials::Existing(admin.id))
        }
        None => matches_configured_admin(config, username, password).then(|| {
            Credentials::Seed(hash_password(password, config.password_hash_iterations))
        }),
    }
}

/// Passes iff some admin currently holds `token`.
pub fn authorize(conn: &Connection, token: &str) -> Result<()> {
    if token.is_empty() {
        return Err(AppError::Unauthorized);
    }
    if queries::admin_token_exists(conn, &hash_token(token))? {
        Ok(())
    } else {
        tracing::warn!("rejected admin token");
        Err(AppError::Unauthorized)
    }
}

fn matches_configured_admin(config: &AppConfig, username: &str, password: &str) -> bool {
    if config.admin_password.is_empty() {
        tracing::warn!("ADMIN_PASSWORD is not set, admin login is disabled");
        return false;
    }
    let user_ok = username.as_bytes().ct_eq(config.admin_username.as_bytes());
    let pass_ok = password.as_bytes().ct_eq(config.admin_password.as_bytes());
    bool::from(user_ok & pass_ok)
}

/// 256 bits from the thread CSPRNG, base64url encoded.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Tokens are stored as their SHA-256 digest.
pub fn hash_token(token: &str) -> String {
    STANDARD_NO_PAD.encode(Sha256::digest(token.as_bytes()))
}

/// Produces `pbkdf2-sha256$<iterations>$<salt>$<key>`.
pub fn hash_password(password: &str, iterations: u32) -> String {
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt);
    let key = derive_key(password, &salt, iterations);
    format!(
        "{HASH_SCHEME}${iterations}${}${}",
        STANDARD_NO_PAD.encode(salt),
        STANDARD_NO_PAD.encode(key)
    )
}

pub fn verify_password(password: &str, encoded: &str) -> bool {
    let parts: Vec<&str> = encoded.split('$').collect();
    let [scheme, iterations, salt, expected] = parts.as_slice() else {
        return false;
    };
    if *scheme != HASH_SCHEME {
        return false;
    }
    let (Ok(iterations), Ok(salt), Ok(expected)) = (
        iterations.parse::<u32>(),
        STANDARD_NO_PAD.decode(salt),
        STANDARD_NO_PAD.decode(expected),
    ) else {
        return false;
    };
    let key = derive_key(password, &salt, iterations);
    key.as_slice().ct_eq(expected.as_slice()).into()
}

fn derive_key(password: &str, salt: &[u8], iterations: u32) -> [u8; KEY_LENGTH] {
    let mut key = [0u8; KEY_LENGTH];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut key);
    key
}
