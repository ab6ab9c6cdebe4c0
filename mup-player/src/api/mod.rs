//! HTTP control surface
//!
//! REST endpoints for every engine command, the snapshot and history reads,
//! and the SSE event stream.

pub mod handlers;
pub mod server;
pub mod sse;

pub use server::{build_router, run, AppContext};
