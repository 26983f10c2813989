#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CookieSameSite {
    Lax,
    Strict,
    None,
}

impl CookieSameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            CookieSameSite::Lax => "Lax",
            CookieSameSite::Strict => "Strict",
            CookieSameSite::None => "None",
        }
    }
}

/// Runtime configuration for issuing and verifying session tokens. The
/// embedding service constructs this explicitly at startup and hands it to
/// [`crate::TokenCodec`]; nothing here reads the environment.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Process-wide HS256 signing secret.
    pub secret: String,
    /// Expected issuer claim (iss).
    pub issuer: String,
    /// Fixed validity window for issued tokens.
    pub ttl_days: i64,
    /// Allowable clock skew in seconds when validating exp.
    pub leeway_seconds: u32,
    /// Cookie carrying the session token. Checked before the bearer header.
    pub cookie_name: String,
    pub cookie_secure: bool,
    pub cookie_same_site: CookieSameSite,
}

impl SessionConfig {
    /// Construct config with the storefront defaults: 30-day validity,
    /// 30 second leeway, strict same-site cookie.
    pub fn new(secret: impl Into<String>, issuer: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            issuer: issuer.into(),
            ttl_days: 30,
            leeway_seconds: 30,
            cookie_name: "nexus_session".to_string(),
            cookie_secure: false,
            cookie_same_site: CookieSameSite::Strict,
        }
    }

    pub fn with_ttl_days(mut self, days: i64) -> Self {
        self.ttl_days = days;
        self
    }

    pub fn with_leeway(mut self, seconds: u32) -> Self {
        self.leeway_seconds = seconds;
        self
    }

    pub fn with_cookie(
        mut self,
        name: impl Into<String>,
        secure: bool,
        same_site: CookieSameSite,
    ) -> Self {
        self.cookie_name = name.into();
        self.cookie_secure = secure;
        self.cookie_same_site = same_site;
        self
    }

    pub fn max_age_seconds(&self) -> i64 {
        self.ttl_days * 24 * 60 * 60
    }
}
