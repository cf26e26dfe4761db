use std::env;
use anyhow::{Context, Result};
use zeroize::Zeroizing;

/// Minimum signing-secret length in bytes.
const MIN_JWT_SECRET_BYTES: usize = 32;

/// The application's configuration.
///
/// Loaded once at startup; the signing secret is read-only afterwards.
#[derive(Clone)]
pub struct Config {
    /// The URL of the PostgreSQL database.
    pub database_url: String,
    /// The symmetric secret used to sign access and refresh tokens.
    pub jwt_secret: Zeroizing<Vec<u8>>,
    /// Access token lifetime in minutes.
    pub access_token_ttl_minutes: i64,
    /// Refresh token lifetime in days.
    pub refresh_token_ttl_days: i64,
}

impl Config {
    /// Creates a new `Config` from environment variables.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Config`.
    pub fn from_env() -> Result<Self> {
        let jwt_secret = env::var("JWT_SECRET")
            .context("JWT_SECRET must be set (generate with: openssl rand -base64 48)")?;

        if jwt_secret.len() < MIN_JWT_SECRET_BYTES {
            anyhow::bail!("JWT_SECRET must be at least {} bytes", MIN_JWT_SECRET_BYTES);
        }

        let access_token_ttl_minutes: i64 = env::var("ACCESS_TOKEN_TTL_MINUTES")
            .unwrap_or_else(|_| "15".to_string())
            .parse()
            .context("Invalid ACCESS_TOKEN_TTL_MINUTES")?;

        let refresh_token_ttl_days: i64 = env::var("REFRESH_TOKEN_TTL_DAYS")
            .unwrap_or_else(|_| "7".to_string())
            .parse()
            .context("Invalid REFRESH_TOKEN_TTL_DAYS")?;

        if access_token_ttl_minutes <= 0 || refresh_token_ttl_days <= 0 {
            anyhow::bail!("Token lifetimes must be positive");
        }

        // An access token must always expire before the refresh token
        // that accompanies it.
        if access_token_ttl_minutes >= refresh_token_ttl_days * 24 * 60 {
            anyhow::bail!("ACCESS_TOKEN_TTL_MINUTES must be strictly less than the refresh token lifetime");
        }

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .context("DATABASE_URL must be set")?,
            jwt_secret: Zeroizing::new(jwt_secret.into_bytes()),
            access_token_ttl_minutes,
            refresh_token_ttl_days,
        })
    }
}
