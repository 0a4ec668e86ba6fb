//! hotquery storage
//!
//! Everything that touches the shared key-value store: the store adapters,
//! the connection handle, the result cache, the pre-warm scheduler, and the
//! read-through query path that ties them together.

pub mod executor;
pub mod handle;
pub mod read_through;
pub mod result_cache;
pub mod scheduler;
pub mod store;
pub mod tracker;

pub use executor::QueryExecutor;
pub use handle::{MemoryConnector, StoreConnector, StoreHandle};
#[cfg(feature = "redis")]
pub use handle::RedisConnector;
pub use read_through::{QueryOutcome, QueryRequest, ReadThroughQuery};
pub use result_cache::{ResultCache, Rows};
pub use scheduler::{PlannedCandidate, PrewarmPlan, PrewarmScheduler, QueuedPrewarm, QUEUED_STATUS};
pub use store::{GlobPattern, KvStore, MemoryStore};
#[cfg(feature = "redis")]
pub use store::RedisStore;
pub use tracker::QueryTracker;
