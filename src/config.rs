use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub admin_token: String,
    pub max_party_size: u32,
    pub code_prefix: String,
    pub code_digits: u32,
    pub code_max_attempts: u32,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "campsite.db".to_string()),
            admin_token: env::var("ADMIN_TOKEN").unwrap_or_else(|_| "changeme".to_string()),
            max_party_size: env::var("MAX_PARTY_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(50),
            code_prefix: env::var("CODE_PREFIX").unwrap_or_else(|_| "CAMP".to_string()),
            code_digits: env::var("CODE_DIGITS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(4)
                .clamp(1, 9),
            code_max_attempts: env::var("CODE_MAX_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10)
                .max(1),
        }
    }
}
