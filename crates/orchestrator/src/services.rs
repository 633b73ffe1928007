use actors::actor_ref::ActorRef;
use cache::EphemeralCache;
use dashmap::DashMap;
use database::PgDatabase;
use events::EventBus;
use model::Booking;
use tokio::sync::watch;
use utility::id::Id;

use crate::actor::BookingActor;
use crate::config::Config;
use crate::error::AppError;

/// Everything a request handler or background workflow needs: the database
/// pool, the ephemeral KV cache, the event bus, process configuration, and
/// the registries backing per-booking serialization and cancellation.
pub struct Services {
    pub db: PgDatabase,
    pub cache: EphemeralCache,
    pub events: EventBus,
    pub config: Config,
    pub(crate) booking_actors: DashMap<Id<Booking>, ActorRef<BookingActor>>,
    /// One cancellation flag per booking currently in a recovery loop; polled
    /// between retry-ladder attempts so a user cancel aborts it early.
    pub(crate) cancel_signals: DashMap<Id<Booking>, watch::Sender<bool>>,
}

impl Services {
    pub async fn connect(config: Config) -> Result<Self, AppError> {
        let db = PgDatabase::connect(config.database_connection_info())
            .await
            .map_err(AppError::from)?;
        let cache =
            EphemeralCache::connect(config.ephemeral_kv_url.as_deref(), config.fallback_allowed)
                .await;

        Ok(Self {
            db,
            cache,
            events: EventBus::new(),
            config,
            booking_actors: DashMap::new(),
            cancel_signals: DashMap::new(),
        })
    }
}

impl auth::AuthState for Services {
    fn jwt_secret(&self) -> &str {
        &self.config.jwt_secret
    }
}
