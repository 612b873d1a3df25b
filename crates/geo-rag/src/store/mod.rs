//! Durable task records on top of the key-value cache
//!
//! Status and result live under separate key namespaces so a lost status
//! record never hides a finished summary.

mod result_cache;
mod status_store;

pub use result_cache::ResultCache;
pub use status_store::StatusStore;
