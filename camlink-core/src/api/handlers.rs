//! Error Handlers
//!
//! Observers for command error responses.
//!
//! Every response of kind `Error` is shown to the registered handlers, in
//! registration order, before the caller sees it. A handler returning `true`
//! swallows the response; later handlers do not see it.

use std::sync::Arc;

use tracing::debug;

use crate::command::Response;

/// Error handler trait.
///
/// Implement this trait to observe (and optionally suppress) command errors.
pub trait ErrorHandler: Send + Sync {
    /// Called for each error response. Return `true` to suppress it.
    fn handle(&self, response: &Response) -> bool;
}

/// Simple callback-based error handler.
///
/// Wraps a closure for easy error handling.
pub struct CallbackErrorHandler<F>
where
    F: Fn(&Response) -> bool + Send + Sync,
{
    callback: F,
}

impl<F> CallbackErrorHandler<F>
where
    F: Fn(&Response) -> bool + Send + Sync,
{
    /// Creates a new callback handler.
    pub fn new(callback: F) -> Self {
        CallbackErrorHandler { callback }
    }
}

impl<F> ErrorHandler for CallbackErrorHandler<F>
where
    F: Fn(&Response) -> bool + Send + Sync,
{
    fn handle(&self, response: &Response) -> bool {
        (self.callback)(response)
    }
}

/// Ordered set of error handlers.
#[derive(Default, Clone)]
pub struct ErrorHandlers {
    handlers: Vec<Arc<dyn ErrorHandler>>,
}

impl ErrorHandlers {
    pub fn new() -> Self {
        ErrorHandlers {
            handlers: Vec::new(),
        }
    }

    /// Adds an error handler.
    pub fn add_handler(&mut self, handler: Arc<dyn ErrorHandler>) {
        self.handlers.push(handler);
    }

    /// Runs the handlers on an error response. Returns true if one suppressed it.
    pub fn suppresses(&self, response: &Response) -> bool {
        let suppressed = self.handlers.iter().any(|h| h.handle(response));
        if suppressed {
            debug!(command = response.command(), "error response suppressed by handler");
        }
        suppressed
    }
}
