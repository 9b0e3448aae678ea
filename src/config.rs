use std::{env, str::FromStr, time::Duration};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub otp_ttl: Duration,
    /// Upper bound for the whole create-order transaction.
    pub order_tx_timeout: Duration,
    pub db_max_connections: u32,
    pub concurrency_limit: usize,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET is not set"))?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        Ok(Self {
            database_url,
            host,
            port: env_or("APP_PORT", 3000),
            jwt_secret,
            jwt_ttl_hours: env_or("JWT_TTL_HOURS", 24 * 7),
            otp_ttl: Duration::from_secs(env_or("OTP_TTL_SECS", 120)),
            order_tx_timeout: Duration::from_millis(env_or("ORDER_TX_TIMEOUT_MS", 5000)),
            db_max_connections: env_or("DB_MAX_CONNECTIONS", 10),
            concurrency_limit: env_or("CONCURRENCY_LIMIT", 100),
        })
    }

    /// Defaults for everything but the database, used by the binaries and tests.
    pub fn with_database_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            host: "127.0.0.1".to_string(),
            port: 3000,
            jwt_secret: "dev-secret".to_string(),
            jwt_ttl_hours: 24 * 7,
            otp_ttl: Duration::from_secs(120),
            order_tx_timeout: Duration::from_millis(5000),
            db_max_connections: 10,
            concurrency_limit: 100,
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
