//! Call session management
//!
//! This module provides the `CallSession` abstraction that manages:
//! - The per-call lifecycle (connecting, streaming, closing, closed)
//! - Forwarding caller audio to a recognition stream, with one restart
//! - Routing final transcripts through translation to the dispatcher
//! - The registry inbound dispatcher replies use to find their call

mod handle;
mod pipeline;
mod registry;
mod session;
mod state;
mod stats;

pub use handle::CallHandle;
pub use pipeline::Pipeline;
pub use registry::SessionRegistry;
pub use session::CallSession;
pub use state::LifecycleState;
pub use stats::SessionStats;
