use dotenvy::dotenv;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use service_core::error::AppError;
use std::{env, fmt, str::FromStr, time::Duration};

pub const DEFAULT_TOKEN_URL: &str = "https://api.addi.com/auth/oauth/token";
pub const DEFAULT_ORDER_URL: &str = "https://api.addi.com/payments/v1/orders";

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    pub server: ServerConfig,
    pub provider: ProviderConfig,
    pub cors: CorsConfig,
    pub service_name: String,
    pub log_level: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Deserialize, Clone, Debug)]
pub struct CorsConfig {
    /// Allowed origins; a single `*` allows any origin.
    pub allowed_origins: Vec<String>,
}

/// Everything needed to talk to the checkout provider.
#[derive(Deserialize, Clone, Debug)]
pub struct ProviderConfig {
    pub token_url: String,
    pub order_url: String,
    pub client_id: String,
    pub client_secret: Secret<String>,
    /// Merchant identifier the provider attributes orders to.
    pub ally_slug: String,
    /// Some identity providers require an `audience` in the token exchange.
    pub audience: Option<String>,
    pub token_encoding: TokenEncoding,
    pub order_response_mode: OrderResponseMode,
    pub currency: String,
    pub redirect_field: String,
    pub redirect_wrapper: String,
    pub default_return_url: Option<String>,
    pub timeout_seconds: u64,
}

/// Body encoding of the client-credentials exchange.
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenEncoding {
    Json,
    Form,
}

/// Where the provider puts the redirect destination of a created order.
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OrderResponseMode {
    /// A JSON body field, possibly nested one level under a wrapper.
    Body,
    /// A 3xx response with a `location` header.
    Redirect,
}

impl FromStr for TokenEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(TokenEncoding::Json),
            "form" | "form-urlencoded" => Ok(TokenEncoding::Form),
            other => Err(format!(
                "Invalid token encoding '{}': expected 'json' or 'form'",
                other
            )),
        }
    }
}

impl FromStr for OrderResponseMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "body" => Ok(OrderResponseMode::Body),
            "redirect" | "redirect-header" => Ok(OrderResponseMode::Redirect),
            other => Err(format!(
                "Invalid order response mode '{}': expected 'body' or 'redirect'",
                other
            )),
        }
    }
}

impl fmt::Display for TokenEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenEncoding::Json => write!(f, "json"),
            TokenEncoding::Form => write!(f, "form"),
        }
    }
}

impl fmt::Display for OrderResponseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderResponseMode::Body => write!(f, "body"),
            OrderResponseMode::Redirect => write!(f, "redirect"),
        }
    }
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Names of the credential variables that are unset.
    ///
    /// The service still starts without them, but every order will fail at
    /// the credential step.
    pub fn missing_credentials(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.client_id.is_empty() {
            missing.push("PROVIDER_CLIENT_ID");
        }
        if self.client_secret.expose_secret().is_empty() {
            missing.push("PROVIDER_CLIENT_SECRET");
        }
        if self.ally_slug.is_empty() {
            missing.push("PROVIDER_ALLY_SLUG");
        }
        missing
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get_env = |key: &str, default: &str| -> String {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        let get_optional_env =
            |key: &str| -> Option<String> { lookup(key).filter(|v| !v.trim().is_empty()) };

        let port = parse_env("PORT", &get_env("PORT", "3000"))?;
        let timeout_seconds = parse_env(
            "PROVIDER_TIMEOUT_SECONDS",
            &get_env("PROVIDER_TIMEOUT_SECONDS", "10"),
        )?;
        if timeout_seconds == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "PROVIDER_TIMEOUT_SECONDS must be greater than zero"
            )));
        }

        let allowed_origins = get_env("CORS_ALLOWED_ORIGINS", "*")
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        Ok(Self {
            server: ServerConfig { port },
            provider: ProviderConfig {
                token_url: get_env("PROVIDER_TOKEN_URL", DEFAULT_TOKEN_URL),
                order_url: get_env("PROVIDER_ORDER_URL", DEFAULT_ORDER_URL),
                client_id: get_env("PROVIDER_CLIENT_ID", ""),
                client_secret: Secret::new(get_env("PROVIDER_CLIENT_SECRET", "")),
                ally_slug: get_env("PROVIDER_ALLY_SLUG", ""),
                audience: get_optional_env("PROVIDER_AUDIENCE"),
                token_encoding: parse_env(
                    "PROVIDER_TOKEN_ENCODING",
                    &get_env("PROVIDER_TOKEN_ENCODING", "json"),
                )?,
                order_response_mode: parse_env(
                    "PROVIDER_ORDER_RESPONSE_MODE",
                    &get_env("PROVIDER_ORDER_RESPONSE_MODE", "body"),
                )?,
                currency: get_env("PROVIDER_CURRENCY", "COP").to_ascii_uppercase(),
                redirect_field: get_env("PROVIDER_REDIRECT_FIELD", "redirectUrl"),
                redirect_wrapper: get_env("PROVIDER_REDIRECT_WRAPPER", "data"),
                default_return_url: get_optional_env("DEFAULT_RETURN_URL"),
                timeout_seconds,
            },
            cors: CorsConfig { allowed_origins },
            service_name: get_env("SERVICE_NAME", "order-proxy-service"),
            log_level: get_env("LOG_LEVEL", "info"),
        })
    }
}

fn parse_env<T>(key: &str, value: &str) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| {
        AppError::ConfigError(anyhow::anyhow!("{} has invalid value: {}", key, e))
    })
}
