//! # gatehouse-database
//!
//! PostgreSQL connection management, the store traits the authorization
//! engine is written against, and their PostgreSQL and in-memory
//! implementations.

pub mod connection;
pub mod migration;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use repositories::{PgEmulationGrantStore, PgProfileRepository};
pub use store::{
    ActiveGrant, EmulationGrantStore, MemoryEmulationGrantStore, MemoryProfileStore, ProfileStore,
};
