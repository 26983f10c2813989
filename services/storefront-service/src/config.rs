use std::env;

use anyhow::{anyhow, Context, Result};
use shop_auth::{CookieSameSite, SessionConfig};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub cors_origins: Vec<String>,
    pub session: SessionConfig,
}

/// Read the full service configuration from the environment once, at
/// startup. `SESSION_SECRET` and `DATABASE_URL` are required; everything
/// else has storefront defaults.
pub fn load_app_config() -> Result<AppConfig> {
    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = env::var("PORT")
        .ok()
        .map(|value| value.parse().context("Failed to parse PORT"))
        .transpose()?
        .unwrap_or(8080);

    let database_url = env::var("DATABASE_URL").map_err(|_| anyhow!("DATABASE_URL must be set"))?;

    let cors_origins = env::var("CORS_ORIGINS")
        .ok()
        .map(|value| parse_list(&value))
        .unwrap_or_else(|| vec!["http://localhost:3000".to_string()]);

    let secret = env::var("SESSION_SECRET").map_err(|_| anyhow!("SESSION_SECRET must be set"))?;
    if secret.trim().is_empty() {
        return Err(anyhow!("SESSION_SECRET must not be empty"));
    }
    let issuer = env::var("SESSION_ISSUER").unwrap_or_else(|_| "nexus-storefront".to_string());

    let mut session = SessionConfig::new(secret, issuer);

    if let Ok(ttl) = env::var("SESSION_TTL_DAYS") {
        let days: i64 = ttl.parse().context("Failed to parse SESSION_TTL_DAYS")?;
        if days <= 0 {
            return Err(anyhow!("SESSION_TTL_DAYS must be positive"));
        }
        session = session.with_ttl_days(days);
    }

    let cookie_name =
        env::var("SESSION_COOKIE_NAME").unwrap_or_else(|_| "nexus_session".to_string());
    let cookie_secure = bool_from_env("SESSION_COOKIE_SECURE").unwrap_or(false);
    let cookie_same_site = env::var("SESSION_COOKIE_SAMESITE")
        .ok()
        .map(|value| parse_same_site(&value))
        .transpose()
        .context("Failed to parse SESSION_COOKIE_SAMESITE")?
        .unwrap_or(CookieSameSite::Strict);
    session = session.with_cookie(cookie_name, cookie_secure, cookie_same_site);

    Ok(AppConfig {
        host,
        port,
        database_url,
        cors_origins,
        session,
    })
}

fn bool_from_env(key: &str) -> Option<bool> {
    env::var(key).ok().map(|value| {
        matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(|c| c == ',' || c == ';' || c == ' ')
        .filter_map(|item| {
            let entry = item.trim();
            if entry.is_empty() {
                None
            } else {
                Some(entry.to_string())
            }
        })
        .collect()
}

fn parse_same_site(value: &str) -> Result<CookieSameSite> {
    match value.trim().to_ascii_lowercase().as_str() {
        "lax" => Ok(CookieSameSite::Lax),
        "strict" => Ok(CookieSameSite::Strict),
        "none" => Ok(CookieSameSite::None),
        other => Err(anyhow!(
            "Unsupported cookie same-site policy '{other}'. Use Lax, Strict, or None."
        )),
    }
}
