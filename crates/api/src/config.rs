/// Receiver configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8081`).
    pub port: u16,
    /// Expected `X-API-Key` value; `None` disables the key check.
    pub api_key: Option<String>,
    /// Shared HMAC secret; `None` disables signature validation.
    pub hmac_secret: Option<String>,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
}

impl ReceiverConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var               | Default                 |
    /// |-----------------------|-------------------------|
    /// | `HOST`                | `0.0.0.0`               |
    /// | `PORT`                | `8081`                  |
    /// | `WEBHOOK_API_KEY`     | unset (check disabled)  |
    /// | `WEBHOOK_HMAC_SECRET` | unset (check disabled)  |
    /// | `CORS_ORIGINS`        | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`| `30`                    |
    ///
    /// An empty string in either secret variable counts as unset; the
    /// checks are controlled purely by the presence of a non-empty value.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "8081".into())
            .parse()
            .expect("PORT must be a valid u16");

        let api_key = std::env::var("WEBHOOK_API_KEY")
            .ok()
            .filter(|s| !s.is_empty());

        let hmac_secret = std::env::var("WEBHOOK_HMAC_SECRET")
            .ok()
            .filter(|s| !s.is_empty());

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        Self {
            host,
            port,
            api_key,
            hmac_secret,
            cors_origins,
            request_timeout_secs,
        }
    }

    /// Whether the API-key check is active.
    pub fn authentication_enabled(&self) -> bool {
        self.api_key.is_some()
    }

    /// Whether HMAC signature validation is active.
    pub fn hmac_enabled(&self) -> bool {
        self.hmac_secret.is_some()
    }
}
