//! SSE (Server-Sent Events) stream consumption
//!
//! The chat stream is a sequence of `data: <json>\n` lines, optionally
//! terminated by `data: [DONE]`. Consumption happens in three layers:
//!
//! - `decoder` - byte chunks to complete lines ([`LineDecoder`])
//! - `dispatcher` - lines to [`StreamEvent`]s ([`classify`], [`parse_line`])
//! - `handler` - the request, the read loop and cancellation ([`SseHandler`])
//!
//! `session` holds per-connection state ([`StreamSession`], [`SessionHandle`]).

mod decoder;
mod dispatcher;
mod events;
mod handler;
mod session;

pub use decoder::LineDecoder;
pub use dispatcher::{classify, parse_line};
pub use events::{SseParseError, StreamEvent, DATA_PREFIX, DONE_SENTINEL};
pub use handler::{SessionOutcome, SseHandler, TrailingLinePolicy};
pub use session::{ConnectionState, SessionHandle, StreamSession};
