pub mod app_config;
pub mod database;
pub mod events;
pub mod memory;
pub mod network_repo;
pub mod redis_repo;
pub mod seed;
pub mod ticket_repo;

pub use database::DbClient;
pub use events::LogEventPublisher;
#[cfg(feature = "kafka")]
pub use events::EventProducer;
pub use memory::{LocalJobLock, MemoryStore};
pub use network_repo::PgNetworkRepository;
pub use redis_repo::RedisClient;
pub use seed::NetworkSeed;
pub use ticket_repo::PgReservationRepository;
