//! Static configuration for the gateway.
//!
//! Configuration is read once at startup from the environment, validated
//! eagerly, and never reloaded. Every field is named and typed; defaulting
//! happens here rather than at the point of use, so a running process has
//! exactly one source of truth for thresholds and credentials.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use crate::backend::ProviderFlavor;
use crate::types::{BackendName, ListAddress};

/// Default ceiling for requests per IP within the rate window.
const DEFAULT_RATE_MAX: u32 = 10;
/// Default rate window.
const DEFAULT_RATE_WINDOW: Duration = Duration::from_secs(60 * 60);
/// Default CSRF token lifetime.
const DEFAULT_CSRF_TTL: Duration = Duration::from_secs(8 * 60 * 60);
/// Default confirmation token lifetime.
const DEFAULT_CONFIRM_TTL: Duration = Duration::from_secs(24 * 60 * 60);
/// Default capacity of each action queue.
const DEFAULT_QUEUE_CAPACITY: usize = 10;
/// Default interval between list-registry refreshes.
const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(15 * 60);
/// Default subscriber-count step that triggers an operator warning.
const DEFAULT_WARN_EVERY: u64 = 100;
/// Default timeout for backend HTTP calls.
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors produced while building or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is absent.
    #[error("missing required environment variable: {0}")]
    MissingVar(&'static str),

    /// A variable is present but cannot be parsed into its typed form.
    #[error("invalid value for {var}: {reason}")]
    InvalidVar {
        /// The variable name.
        var: &'static str,
        /// Why parsing failed.
        reason: String,
    },

    /// The configuration parsed but violates an invariant.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// SMTP relay credentials and sender identity.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    /// Relay hostname.
    pub host: String,
    /// Relay port (STARTTLS submission port by default).
    pub port: u16,
    /// Auth username.
    pub username: String,
    /// Auth password.
    pub password: String,
    /// Display name for the `From` header.
    pub from_name: String,
    /// Address for the `From` header.
    pub from_email: String,
}

/// One configured list-provider backend.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Name lists use to reference this backend.
    pub name: BackendName,
    /// Which provider API dialect this backend speaks.
    pub flavor: ProviderFlavor,
    /// Base API URL, without a trailing slash.
    pub base_url: String,
    /// Auth material (API token or basic-auth password, per flavor).
    pub api_key: String,
}

/// Sliding-window rate limiter thresholds.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    /// Requests admitted per IP within the window.
    pub max_requests: u32,
    /// Trailing window length.
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        RateLimitConfig {
            max_requests: DEFAULT_RATE_MAX,
            window: DEFAULT_RATE_WINDOW,
        }
    }
}

/// Token lifetimes by token type.
#[derive(Debug, Clone, Copy)]
pub struct TokenTtl {
    /// Lifetime of CSRF tokens.
    pub csrf: Duration,
    /// Lifetime of subscribe/unsubscribe confirmation tokens.
    pub confirm: Duration,
}

impl Default for TokenTtl {
    fn default() -> Self {
        TokenTtl {
            csrf: DEFAULT_CSRF_TTL,
            confirm: DEFAULT_CONFIRM_TTL,
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server binds to.
    pub listen_addr: SocketAddr,
    /// Public base URL confirmation links are built against,
    /// without a trailing slash (e.g. `https://lists.example.org`).
    pub public_url: String,
    /// SMTP relay settings.
    pub smtp: SmtpConfig,
    /// Configured provider backends (at least one).
    pub backends: Vec<BackendConfig>,
    /// If non-empty, only lists with these addresses are served.
    pub list_filter: Vec<ListAddress>,
    /// Rate limiter thresholds.
    pub rate_limit: RateLimitConfig,
    /// Token lifetimes.
    pub ttl: TokenTtl,
    /// Operator address for milestone warnings; `None` disables them.
    pub operator_email: Option<String>,
    /// Subscriber-delta step that triggers an operator warning.
    pub warn_every: u64,
    /// Capacity of each per-action work queue.
    pub queue_capacity: usize,
    /// Interval between list-registry refreshes.
    pub refresh_interval: Duration,
    /// Timeout applied to each backend HTTP call.
    pub http_timeout: Duration,
}

impl Config {
    /// Builds the configuration from environment variables.
    ///
    /// Required: `LISTGATE_PUBLIC_URL`, `LISTGATE_SMTP_HOST`,
    /// `LISTGATE_SMTP_USER`, `LISTGATE_SMTP_PASSWORD`, `LISTGATE_SMTP_FROM`,
    /// and at least one backend via `LISTGATE_BACKENDS` (see
    /// [`parse_backends`] for the format). Everything else has a default.
    pub fn from_env() -> Result<Self, ConfigError> {
        let listen_addr = opt_var("LISTGATE_LISTEN")
            .unwrap_or_else(|| "0.0.0.0:8080".to_string())
            .parse()
            .map_err(|e| ConfigError::InvalidVar {
                var: "LISTGATE_LISTEN",
                reason: format!("{e}"),
            })?;

        let public_url = require_var("LISTGATE_PUBLIC_URL")?
            .trim_end_matches('/')
            .to_string();

        let smtp = SmtpConfig {
            host: require_var("LISTGATE_SMTP_HOST")?,
            port: parse_var("LISTGATE_SMTP_PORT", 587u16)?,
            username: require_var("LISTGATE_SMTP_USER")?,
            password: require_var("LISTGATE_SMTP_PASSWORD")?,
            from_name: opt_var("LISTGATE_SMTP_FROM_NAME")
                .unwrap_or_else(|| "Mailing Lists".to_string()),
            from_email: require_var("LISTGATE_SMTP_FROM")?,
        };

        let backends = parse_backends(&require_var("LISTGATE_BACKENDS")?)?;

        let list_filter = opt_var("LISTGATE_LISTS")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(ListAddress::from)
                    .collect()
            })
            .unwrap_or_default();

        let rate_limit = RateLimitConfig {
            max_requests: parse_var("LISTGATE_RATE_MAX", DEFAULT_RATE_MAX)?,
            window: secs_var("LISTGATE_RATE_WINDOW_SECS", DEFAULT_RATE_WINDOW)?,
        };

        let ttl = TokenTtl {
            csrf: secs_var("LISTGATE_CSRF_TTL_SECS", DEFAULT_CSRF_TTL)?,
            confirm: secs_var("LISTGATE_CONFIRM_TTL_SECS", DEFAULT_CONFIRM_TTL)?,
        };

        let config = Config {
            listen_addr,
            public_url,
            smtp,
            backends,
            list_filter,
            rate_limit,
            ttl,
            operator_email: opt_var("LISTGATE_OPERATOR_EMAIL"),
            warn_every: parse_var("LISTGATE_WARN_EVERY", DEFAULT_WARN_EVERY)?,
            queue_capacity: parse_var("LISTGATE_QUEUE_CAPACITY", DEFAULT_QUEUE_CAPACITY)?,
            refresh_interval: secs_var("LISTGATE_REFRESH_SECS", DEFAULT_REFRESH_INTERVAL)?,
            http_timeout: secs_var("LISTGATE_HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field invariants. Called once at startup; the process
    /// refuses to start on any violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backends.is_empty() {
            return Err(ConfigError::Invalid("no backends configured".into()));
        }
        let mut seen = std::collections::HashSet::new();
        for backend in &self.backends {
            if !seen.insert(&backend.name) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate backend name: {}",
                    backend.name
                )));
            }
            if backend.base_url.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "backend {} has an empty base URL",
                    backend.name
                )));
            }
        }
        if self.rate_limit.max_requests == 0 {
            return Err(ConfigError::Invalid(
                "rate limit ceiling must be at least 1".into(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::Invalid("queue capacity must be at least 1".into()));
        }
        if self.warn_every == 0 {
            return Err(ConfigError::Invalid("warn_every must be at least 1".into()));
        }
        if self.ttl.csrf.is_zero() || self.ttl.confirm.is_zero() {
            return Err(ConfigError::Invalid("token TTLs must be non-zero".into()));
        }
        Ok(())
    }
}

/// Parses the `LISTGATE_BACKENDS` format:
/// `name=flavor@base_url#api_key` entries separated by `;`.
///
/// Example:
/// `main=mailman@https://lists.example.org/api#secret;news=listmonk@https://news.example.org#tok`
pub fn parse_backends(raw: &str) -> Result<Vec<BackendConfig>, ConfigError> {
    let mut backends = Vec::new();
    for entry in raw.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        let invalid = |reason: &str| ConfigError::InvalidVar {
            var: "LISTGATE_BACKENDS",
            reason: format!("{reason} in entry {entry:?}"),
        };
        let (name, rest) = entry.split_once('=').ok_or_else(|| invalid("missing '='"))?;
        let (flavor, rest) = rest.split_once('@').ok_or_else(|| invalid("missing '@'"))?;
        let (base_url, api_key) = rest.split_once('#').ok_or_else(|| invalid("missing '#'"))?;
        let flavor = match flavor {
            "mailman" => ProviderFlavor::Mailman,
            "listmonk" => ProviderFlavor::Listmonk,
            other => return Err(invalid(&format!("unknown flavor {other:?}"))),
        };
        backends.push(BackendConfig {
            name: BackendName::new(name),
            flavor,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        });
    }
    Ok(backends)
}

fn opt_var(name: &'static str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn require_var(name: &'static str) -> Result<String, ConfigError> {
    opt_var(name).ok_or(ConfigError::MissingVar(name))
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match opt_var(name) {
        None => Ok(default),
        Some(v) => v.parse().map_err(|e: T::Err| ConfigError::InvalidVar {
            var: name,
            reason: format!("{e}"),
        }),
    }
}

fn secs_var(name: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    Ok(Duration::from_secs(parse_var(
        name,
        default.as_secs(),
    )?))
}
