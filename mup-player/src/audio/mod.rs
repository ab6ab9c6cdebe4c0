//! Audio subsystem
//!
//! `backend` defines the seam the engine plays through; the rest is the
//! device implementation of it.

pub mod backend;
pub mod decode;
pub mod fade;
pub mod fetch;
pub mod output;
pub mod resampler;
pub mod session;

pub use backend::{AudioBackend, AudioSession, PlayableSource, SessionErrorKind, SessionEvent, SessionEvents, SessionRequest};
pub use session::DeviceBackend;
