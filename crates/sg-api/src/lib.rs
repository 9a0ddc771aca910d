//! sg-api: Wire-contract vocabulary for the StudioGrid platform
//!
//! Shared message and value types exchanged between the cloud control
//! plane, per-site domain services, the audio engine and hardware
//! instance drivers:
//! - Typed identifiers for every addressable object
//! - Session specs: tracks, mixers, instances, connections
//! - Structural modification operations and their error taxonomy
//! - Playback and render state machines (desired vs. actual)
//! - Media download/upload job states
//! - Domain, audio engine, instance driver and media service messages
//!
//! This crate is pure data: no executable session logic lives here, only
//! the shapes every other crate agrees on.

mod ids;
mod time;
mod session;
mod change;
mod media;
mod domain;
mod engine;
mod error;

pub use ids::*;
pub use time::*;
pub use session::*;
pub use change::*;
pub use media::*;
pub use domain::*;
pub use engine::*;
pub use error::*;
