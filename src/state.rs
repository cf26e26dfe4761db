use deadpool_postgres::Pool;
use crate::config::Config;
use crate::crypto::token::TokenCodec;
use crate::error::Result;

/// The application's state.
///
/// Fully stateless between requests: the only mutable shared resource
/// is the database behind the pool. The token codec's keys are built
/// once here and never change.
#[derive(Clone)]
pub struct AppState {
    /// The database connection pool.
    pub db: Pool,
    /// The application's configuration.
    pub config: Config,
    /// Signs and verifies access/refresh tokens.
    pub tokens: TokenCodec,
}

impl AppState {
    /// Creates a new `AppState`.
    ///
    /// # Arguments
    ///
    /// * `config` - The application's configuration.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `AppState`.
    pub fn new(config: &Config) -> Result<Self> {
        let db = crate::db::create_pool(&config.database_url)?;
        tracing::info!("✅ PostgreSQL pool initialized");

        let tokens = TokenCodec::new(
            &config.jwt_secret,
            config.access_token_ttl_minutes,
            config.refresh_token_ttl_days,
        );
        tracing::info!("✅ Token codec initialized");

        Ok(AppState {
            db,
            config: config.clone(),
            tokens,
        })
    }
}
