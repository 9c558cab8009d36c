//! Client-side state for a chat front end.
//!
//! Each state is an immutable snapshot. `reduce` takes the current snapshot
//! and an event and returns the next one without side effects; anything
//! time-dependent travels inside the event.

pub mod chat;
pub mod session;

pub use chat::{BuildPhase, ChatEvent, ChatState};
pub use session::{SessionEvent, SessionState, SessionStatus};
