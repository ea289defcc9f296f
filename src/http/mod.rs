//! HTTP protocol layer module
//!
//! Provides HTTP protocol-related base functionality, decoupled from the
//! quote resolution logic.

pub mod cache;
pub mod response;

// Re-export commonly used types
pub use response::{
    build_404_response, build_quote_response, build_redirect_response, build_text_response,
};
