//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - DuckDB for the persistent StateStore
//! - An in-memory map for tests and embedders that persist elsewhere

pub mod duckdb;
pub mod memory;

pub use self::duckdb::DuckDbStateStore;
pub use self::memory::MemoryStateStore;
