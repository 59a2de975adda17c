use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub admin_username: String,
    pub admin_password: String,
    pub password_hash_iterations: u32,
    pub smtp_server: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub email_from: String,
    pub email_from_name: String,
    pub consent_form_url: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let smtp_username = env::var("SMTP_USERNAME").unwrap_or_default();
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "booking.db".to_string()),
            admin_username: env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string()),
            admin_password: env::var("ADMIN_PASSWORD").unwrap_or_default(),
            password_hash_iterations: env::var("PASSWORD_HASH_ITERATIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(210_000),
            smtp_server: env::var("SMTP_SERVER").unwrap_or_default(),
            smtp_port: env::var("SMTP_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(587),
            smtp_password: env::var("SMTP_PASSWORD").unwrap_or_default(),
            email_from: env::var("EMAIL_FROM").unwrap_or_else(|_| smtp_username.clone()),
            email_from_name: env::var("EMAIL_FROM_NAME")
                .unwrap_or_else(|_| "Appointments".to_string()),
            consent_form_url: env::var("CONSENT_FORM_URL")
                .unwrap_or_else(|_| "http://localhost:5173/booking/consentForm".to_string()),
            smtp_username,
        }
    }

    pub fn smtp_configured(&self) -> bool {
        !self.smtp_server.is_empty()
    }
}
