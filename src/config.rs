use std::{env, time::Duration};

use anyhow::{Context, bail};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub host: String,
    pub port: u16,
    pub public_url: String,
    pub body_limit_bytes: usize,
    pub jwt: JwtConfig,
    pub smtp: SmtpConfig,
    pub s3: S3Config,
    pub razorpay: RazorpayConfig,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub expiry: Duration,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub sender_email: String,
}

#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible stores (MinIO, LocalStack).
    pub endpoint: Option<String>,
    /// Base URL used to build public photo links; derived from bucket/region when unset.
    pub public_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RazorpayConfig {
    pub key_id: String,
    pub key_secret: String,
    pub api_url: String,
    pub currency: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = required("DATABASE_URL")?;
        let database_max_connections = parsed_or("DATABASE_MAX_CONNECTIONS", 10);
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = parsed_or("APP_PORT", 3000);
        let public_url = env::var("PUBLIC_URL")
            .unwrap_or_else(|_| format!("http://{host}:{port}"))
            .trim_end_matches('/')
            .to_string();
        let body_limit_bytes = parsed_or("BODY_LIMIT_BYTES", 10 * 1024 * 1024);

        let expiry_raw = env::var("JWT_EXPIRY").unwrap_or_else(|_| "30d".to_string());
        let jwt = JwtConfig {
            secret: required("JWT_SECRET")?,
            expiry: parse_expiry(&expiry_raw)
                .with_context(|| format!("invalid JWT_EXPIRY `{expiry_raw}`"))?,
        };

        let smtp = SmtpConfig {
            host: required("SMTP_HOST")?,
            port: parsed_or("SMTP_PORT", 587),
            username: required("SMTP_USERNAME")?,
            password: required("SMTP_PASSWORD")?,
            sender_email: required("SMTP_SENDER_EMAIL")?,
        };

        let s3 = S3Config {
            bucket: required("S3_BUCKET_NAME")?,
            region: env::var("S3_REGION").ok(),
            endpoint: env::var("S3_ENDPOINT").ok(),
            public_url: env::var("S3_PUBLIC_URL").ok(),
        };

        let razorpay = RazorpayConfig {
            key_id: required("RAZORPAY_KEY_ID")?,
            key_secret: required("RAZORPAY_KEY_SECRET")?,
            api_url: env::var("RAZORPAY_API_URL")
                .unwrap_or_else(|_| "https://api.razorpay.com".to_string()),
            currency: env::var("PAYMENT_CURRENCY").unwrap_or_else(|_| "INR".to_string()),
        };

        Ok(Self {
            database_url,
            database_max_connections,
            host,
            port,
            public_url,
            body_limit_bytes,
            jwt,
            smtp,
            s3,
            razorpay,
        })
    }
}

fn required(key: &str) -> anyhow::Result<String> {
    env::var(key).with_context(|| format!("{key} is not set"))
}

fn parsed_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

/// Parses token lifetimes such as `30d`, `12h`, `45m`, `90s` or a bare number of seconds.
pub fn parse_expiry(raw: &str) -> anyhow::Result<Duration> {
    let raw = raw.trim();
    if raw.is_empty() {
        bail!("empty duration");
    }
    let (digits, unit) = match raw.char_indices().last() {
        Some((idx, c)) if c.is_ascii_alphabetic() => (&raw[..idx], c),
        _ => (raw, 's'),
    };
    let value: u64 = digits.parse().context("duration must start with a number")?;
    let seconds = match unit {
        'd' => value * 24 * 60 * 60,
        'h' => value * 60 * 60,
        'm' => value * 60,
        's' => value,
        other => bail!("unknown duration unit `{other}`"),
    };
    if seconds == 0 {
        bail!("duration must be positive");
    }
    Ok(Duration::from_secs(seconds))
}
