//! Error types for the client runtime and its channels.

use parley_core::SessionError;
use thiserror::Error;

/// Transport errors raised inside channel implementations.
///
/// These never reach the caller directly; the channel reports them to the
/// session as an error event, which schedules a reconnect.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection could not be established.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Reading or writing the stream failed.
    #[error("stream error: {0}")]
    Stream(String),

    /// Channel was already closed.
    #[error("channel closed")]
    Closed,
}

/// Errors returned from the runtime and its handle.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Session rejected a lifecycle request.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Runtime has exited and no longer accepts commands.
    #[error("runtime stopped")]
    Stopped,
}
