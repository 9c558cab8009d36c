//! Stream callback abstraction.
//!
//! A [`StreamHandler`] receives the outcome of one streamed chat request:
//! zero or more `on_message` calls followed by at most one of `on_complete`
//! or `on_error`. An aborted stream receives neither.

use serde_json::Value;

use crate::error::StreamError;

/// Receiver for SSE stream callbacks.
///
/// Every method defaults to a no-op, so implementors only override what they
/// care about.
///
/// # Example
///
/// ```ignore
/// use ragchat::traits::StreamHandler;
///
/// struct Printer;
///
/// impl StreamHandler for Printer {
///     fn on_message(&mut self, payload: serde_json::Value) {
///         println!("{}", payload);
///     }
/// }
/// ```
pub trait StreamHandler: Send {
    /// A `data:` line carried a JSON payload.
    fn on_message(&mut self, payload: Value) {
        let _ = payload;
    }

    /// The stream failed. No further callbacks follow.
    fn on_error(&mut self, error: StreamError) {
        let _ = error;
    }

    /// The stream ended, via `[DONE]` or the transport closing.
    fn on_complete(&mut self) {}
}

type MessageFn = Box<dyn FnMut(Value) + Send>;
type ErrorFn = Box<dyn FnMut(StreamError) + Send>;
type CompleteFn = Box<dyn FnMut() + Send>;

/// A [`StreamHandler`] assembled from closures.
///
/// ```ignore
/// let callbacks = Callbacks::new()
///     .on_message(|payload| println!("{}", payload))
///     .on_complete(|| println!("done"));
/// ```
#[derive(Default)]
pub struct Callbacks {
    message: Option<MessageFn>,
    error: Option<ErrorFn>,
    complete: Option<CompleteFn>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_message(mut self, f: impl FnMut(Value) + Send + 'static) -> Self {
        self.message = Some(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl FnMut(StreamError) + Send + 'static) -> Self {
        self.error = Some(Box::new(f));
        self
    }

    pub fn on_complete(mut self, f: impl FnMut() + Send + 'static) -> Self {
        self.complete = Some(Box::new(f));
        self
    }
}

impl std::fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_message", &self.message.is_some())
            .field("on_error", &self.error.is_some())
            .field("on_complete", &self.complete.is_some())
            .finish()
    }
}

impl StreamHandler for Callbacks {
    fn on_message(&mut self, payload: Value) {
        if let Some(f) = self.message.as_mut() {
            f(payload);
        }
    }

    fn on_error(&mut self, error: StreamError) {
        if let Some(f) = self.error.as_mut() {
            f(error);
        }
    }

    fn on_complete(&mut self) {
        if let Some(f) = self.complete.as_mut() {
            f();
        }
    }
}
