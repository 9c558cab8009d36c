//! Error handling for the RAG chat client.
//!
//! - **Error Categories**: high-level classification for presentation
//! - **Layer errors**: [`NetworkError`] for transport, [`StreamError`] for
//!   what a stream's `on_error` receives, [`ConfigError`] for settings
//! - **Unified Error Type**: [`RagError`] for REST calls and the chat store
//! - **Result Type Alias**: [`RagResult<T>`]
//!
//! Cancelling a stream is not an error at any layer.
//!
//! | Category | Description |
//! |----------|-------------|
//! | Network | Connection, timeout, broken stream |
//! | Server | 5xx, failed or stalled builds |
//! | Client | Unexpected payloads, 4xx |
//! | User | Bad input, no session |
//! | Configuration | Unparsable environment values |

mod category;
mod config;
mod network;
mod rag_error;
mod result;
mod stream;

pub use category::ErrorCategory;
pub use config::ConfigError;
pub use network::{classify_reqwest_error, NetworkError};
pub use rag_error::RagError;
pub use result::RagResult;
pub use stream::StreamError;
