use std::net::{Ipv4Addr, SocketAddr};

use dotenv::dotenv;

/// Process-wide settings, built once at startup and handed to constructors.
/// Everything has a development default so a bare environment still boots.
#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_address: SocketAddr,

    pub secret_key: String,
    pub token_expiry_minutes: i64,

    pub admin_username: String,
    pub admin_password: String,
    pub admin_email: String,

    /// Country prefix applied to short recipient numbers when composing
    /// notification links.
    pub default_country_prefix: String,
    pub whatsapp_base_url: String,

    pub max_tickets_per_purchase: usize,
    pub reservation_hours: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: &str) -> Result<T, ConfigError> {
    let raw = var_or(name, default);
    raw.parse().map_err(|_| ConfigError::Invalid {
        name,
        value: raw.clone(),
    })
}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        dotenv().ok();

        let port: u16 = parse_var("PORT", "8000")?;

        Ok(Config {
            database_url: var_or("DATABASE_URL", "postgres://localhost/raffle"),
            bind_address: SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)),
            secret_key: var_or("SECRET_KEY", "change-this-secret-in-production"),
            token_expiry_minutes: parse_var("TOKEN_EXPIRY_MINUTES", "10080")?,
            admin_username: var_or("ADMIN_USERNAME", "admin"),
            admin_password: var_or("ADMIN_PASSWORD", "Admin123!"),
            admin_email: var_or("ADMIN_EMAIL", "admin@raffleapp.com"),
            default_country_prefix: var_or("DEFAULT_COUNTRY_PREFIX", "53"),
            whatsapp_base_url: var_or("WHATSAPP_BASE_URL", "https://wa.me/"),
            max_tickets_per_purchase: parse_var("MAX_TICKETS_PER_PURCHASE", "50")?,
            reservation_hours: parse_var("RESERVATION_HOURS", "24")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_env() {
        let config = Config::from_env().unwrap();
        assert_eq!(config.max_tickets_per_purchase, 50);
        assert_eq!(config.reservation_hours, 24);
        assert_eq!(config.default_country_prefix, "53");
    }
}
