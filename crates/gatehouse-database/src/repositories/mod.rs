//! PostgreSQL implementations of the store traits.

pub mod emulation;
pub mod profile;

pub use emulation::PgEmulationGrantStore;
pub use profile::PgProfileRepository;
