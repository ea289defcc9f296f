//! Request handler module
//!
//! Routes `/api/quotes/{symbol}` and `/`, resolves quotes through the
//! response cache and the upstream provider.

pub mod deferred;
pub mod error;
pub mod quote;
pub mod router;

// Re-export main entry point
pub use deferred::DeferredTasks;
pub use router::handle_request;
