use deadpool_postgres::Pool;
use redis::aio::ConnectionManager;

use crate::config::Config;
use crate::error::Result;
use crate::repositories::attendance::PgAttendanceStore;
use crate::security::engine::RedemptionEngine;
use crate::security::ledger::SecurityLedger;
use crate::security::registry::SessionRegistry;

/// The application's state.
#[derive(Clone)]
pub struct AppState {
    /// The database connection pool.
    pub db: Pool,
    /// The Redis connection manager.
    pub redis: ConnectionManager,
    /// The application's configuration.
    pub config: Config,
    /// In-memory registry of live QR redemption sessions.
    pub registry: SessionRegistry,
    /// Bounded ledger of suspicious redemption attempts.
    pub ledger: SecurityLedger,
    /// Durable attendance store backed by Postgres.
    pub store: PgAttendanceStore,
    /// The redemption pipeline wired over the three above.
    pub engine: RedemptionEngine<PgAttendanceStore>,
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
    pub async fn new(config: &Config) -> Result<Self> {
        let db = crate::db::create_pool(&config.database_url)?;
        tracing::info!("✅ PostgreSQL pool initialized with deadpool-postgres");

        let redis_client = redis::Client::open(config.redis_url.as_str())?;
        let redis = ConnectionManager::new(redis_client).await?;
        tracing::info!("✅ Redis connection manager initialized (pooled)");

        let registry = SessionRegistry::new(config.validity_window_secs, config.token_length);
        tracing::info!(
            "✅ Session registry initialized (window={}s, token_length={})",
            config.validity_window_secs,
            config.token_length
        );

        let ledger = SecurityLedger::new(config.max_security_events);
        tracing::info!(
            "✅ Security ledger initialized (max {} events)",
            config.max_security_events
        );

        let store = PgAttendanceStore::new(db.clone());
        let engine = RedemptionEngine::new(registry.clone(), ledger.clone(), store.clone());
        tracing::info!("✅ Redemption engine initialized");

        Ok(AppState {
            db,
            redis,
            config: config.clone(),
            registry,
            ledger,
            store,
            engine,
        })
    }
}
