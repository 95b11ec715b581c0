//! Persistence layer: a single-writer [`StateStore`] over a pluggable [`Substrate`].

mod error;
mod file;
mod memory;
mod store;
mod substrate;

pub use error::StoreError;
pub use file::FileSubstrate;
pub use memory::MemorySubstrate;
pub use store::StateStore;
pub use substrate::{Substrate, WriterLock};

#[cfg(feature = "duckdb")]
mod duck;
#[cfg(feature = "duckdb")]
pub use duck::DuckSubstrate;
