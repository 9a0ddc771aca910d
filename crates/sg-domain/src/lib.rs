//! sg-domain: Domain-side session runtime
//!
//! Drives the live half of a session that the structural engine does
//! not cover:
//! - Playback state machine reconciling desired against actual state
//! - Media download/upload job tracking with retries and eviction
//! - The per-session supervisor and the domain command queue
//!
//! ## Architecture
//!
//! Commands enter through a `DomainHandle` (any thread) and drain into
//! the single-threaded `DomainProcessor`, which owns every session
//! supervisor. One session has exactly one mutator; independent
//! sessions never contend on each other.

mod playback;
mod media;
mod supervisor;

pub use playback::*;
pub use media::*;
pub use supervisor::*;
