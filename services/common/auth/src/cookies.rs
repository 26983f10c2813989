use axum::http::header::COOKIE;
use axum::http::HeaderMap;

use crate::config::SessionConfig;

/// Build the Set-Cookie value carrying a freshly issued session token.
/// HttpOnly always; Secure and SameSite follow configuration; Max-Age
/// matches the token validity window.
pub fn session_cookie(config: &SessionConfig, token: &str) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite={}; Max-Age={}",
        config.cookie_name,
        token,
        config.cookie_same_site.as_str(),
        config.max_age_seconds()
    );
    if config.cookie_secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Build the Set-Cookie value that expires the session cookie client-side.
/// The server keeps no session state, so this is the whole logout.
pub fn clear_session_cookie(config: &SessionConfig) -> String {
    let mut cookie = format!(
        "{}=; Path=/; HttpOnly; SameSite={}; Max-Age=0",
        config.cookie_name,
        config.cookie_same_site.as_str()
    );
    if config.cookie_secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Pull a named cookie out of the request's Cookie header, if present.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(COOKIE)?.to_str().ok()?;
    for pair in raw.split(';') {
        let Some((key, value)) = pair.trim().split_once('=') else {
            continue;
        };
        if key == name && !value.is_empty() {
            return Some(value.to_string());
        }
    }
    None
}
