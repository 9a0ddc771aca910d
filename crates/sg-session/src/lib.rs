//! sg-session: Structural session engine
//!
//! Owns a session's routing graph and keeps it correct under concurrent
//! modification requests:
//! - Graph operations with existence, channel and cycle validation
//! - Transactional batch application (all-or-nothing)
//! - Optimistic concurrency through a per-session version counter
//! - The at-rest JSON session store

mod graph;
mod transaction;
mod versioned;
mod store;

pub use graph::*;
pub use transaction::*;
pub use versioned::*;
pub use store::*;
