use anyhow::Context;
use coachline_catalog::DemandThresholds;
use coachline_core::repository::{
    EventPublisher, JobLock, NetworkRepository, PolicyRepository, ReservationRepository, SalesFeed,
};
use coachline_order::{ReservationEngine, TicketVerifier, TripSearch};
use coachline_planning::{CapacityRebalancer, InventoryCleanup, JobRunner, PriceAdjuster, SalesReporter};
use coachline_store::app_config::{Config, SchedulerConfig, StorageBackend};
use coachline_store::{
    DbClient, LocalJobLock, LogEventPublisher, MemoryStore, NetworkSeed, PgNetworkRepository, PgReservationRepository,
    RedisClient,
};
use std::sync::Arc;
use tracing::info;

/// Storage and messaging adapters behind the ports
pub struct Backend {
    pub network: Arc<dyn NetworkRepository>,
    pub reservations: Arc<dyn ReservationRepository>,
    pub sales: Arc<dyn SalesFeed>,
    pub policies: Arc<dyn PolicyRepository>,
    pub lock: Arc<dyn JobLock>,
    pub events: Arc<dyn EventPublisher>,
}

impl Backend {
    pub fn memory(store: Arc<MemoryStore>) -> Self {
        Self {
            network: store.clone(),
            reservations: store.clone(),
            sales: store.clone(),
            policies: store,
            lock: Arc::new(LocalJobLock::new()),
            events: Arc::new(LogEventPublisher::new()),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub network: Arc<dyn NetworkRepository>,
    pub policies: Arc<dyn PolicyRepository>,
    pub engine: Arc<ReservationEngine>,
    pub search: Arc<TripSearch>,
    pub verifier: Arc<TicketVerifier>,
    pub price_adjuster: Arc<PriceAdjuster>,
    pub rebalancer: Arc<CapacityRebalancer>,
    pub cleanup: Arc<InventoryCleanup>,
    pub reporter: Arc<SalesReporter>,
    pub runner: Arc<JobRunner>,
}

impl AppState {
    pub fn new(backend: Backend, scheduler: &SchedulerConfig) -> Self {
        let thresholds = DemandThresholds {
            upper: scheduler.demand_upper,
            lower: scheduler.demand_lower,
        };

        Self {
            engine: Arc::new(ReservationEngine::new(
                backend.network.clone(),
                backend.reservations.clone(),
                backend.events.clone(),
            )),
            search: Arc::new(
                TripSearch::new(backend.network.clone(), backend.reservations.clone())
                    .with_lead_minutes(scheduler.search_lead_minutes),
            ),
            verifier: Arc::new(TicketVerifier::new(backend.network.clone(), backend.reservations.clone())),
            price_adjuster: Arc::new(
                PriceAdjuster::new(
                    backend.network.clone(),
                    backend.policies.clone(),
                    backend.sales.clone(),
                    backend.events.clone(),
                )
                .with_thresholds(thresholds)
                .with_window_days(scheduler.window_days),
            ),
            rebalancer: Arc::new(
                CapacityRebalancer::new(
                    backend.network.clone(),
                    backend.policies.clone(),
                    backend.sales.clone(),
                    backend.events.clone(),
                )
                .with_window_days(scheduler.window_days),
            ),
            cleanup: Arc::new(InventoryCleanup::new(backend.reservations.clone())),
            reporter: Arc::new(SalesReporter::new(backend.network.clone(), backend.sales.clone())),
            runner: Arc::new(JobRunner::new(backend.lock, scheduler.lock_ttl_secs)),
            network: backend.network,
            policies: backend.policies,
        }
    }

    /// Memory backend with default scheduler settings
    pub fn in_memory(store: Arc<MemoryStore>) -> Self {
        Self::new(Backend::memory(store), &SchedulerConfig::default())
    }

    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let mut backend = match config.storage.backend {
            StorageBackend::Memory => {
                let store = match &config.storage.seed_file {
                    Some(path) => {
                        info!("Seeding memory store from {}", path);
                        MemoryStore::from_seed(NetworkSeed::load(path)?)?
                    }
                    None => MemoryStore::new(),
                };
                Backend::memory(Arc::new(store))
            }
            StorageBackend::Postgres => {
                let url = &config
                    .database
                    .as_ref()
                    .context("storage.backend is postgres but [database] is not configured")?
                    .url;
                let db = DbClient::new(url).await.context("Failed to connect to PostgreSQL")?;
                db.migrate().await.context("Failed to run migrations")?;

                let network = Arc::new(PgNetworkRepository::new(db.pool.clone()));
                let reservations = Arc::new(PgReservationRepository::new(db.pool.clone()));
                Backend {
                    network: network.clone(),
                    reservations: reservations.clone(),
                    sales: reservations,
                    policies: network,
                    lock: Arc::new(LocalJobLock::new()),
                    events: Arc::new(LogEventPublisher::new()),
                }
            }
        };

        if let Some(redis) = &config.redis {
            let client = RedisClient::new(&redis.url).await.context("Failed to connect to Redis")?;
            info!("Job locks held in Redis");
            backend.lock = Arc::new(client);
        }

        #[cfg(feature = "kafka")]
        if let Some(kafka) = &config.kafka {
            let producer = coachline_store::EventProducer::new(&kafka.brokers).context("Failed to create Kafka producer")?;
            info!("Publishing events to Kafka at {}", kafka.brokers);
            backend.events = Arc::new(producer);
        }

        Ok(Self::new(backend, &config.scheduler))
    }
}
