pub mod connection;
pub mod matchings;
pub mod memory;
pub mod migrations;
pub mod store;

pub use connection::{get_db_pool, DatabaseConfig};
pub use matchings::PgMatchingStore;
pub use memory::InMemoryMatchingStore;
pub use store::{JoinOutcome, MatchingStore};
