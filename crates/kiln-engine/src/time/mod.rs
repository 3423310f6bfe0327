//! Time subsystem.
//!
//! Provides frame pacing without coupling to the runtime.
//! Intended usage:
//! - one `FramePacer` per screen
//! - call `tick()` once per host iteration and run that many logic updates

mod pacer;

pub use pacer::FramePacer;
