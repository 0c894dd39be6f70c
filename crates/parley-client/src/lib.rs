//! Client
//!
//! Async shell around the Sans-IO [`parley_core::Session`]. Owns the real
//! channels, the clock and the presentation hooks; all protocol decisions
//! stay in the session.
//!
//! # Components
//!
//! - [`Runtime`]: select loop feeding the session and executing its actions
//! - [`Connector`] / [`Channel`]: pluggable transport, one channel per
//!   connection attempt
//! - [`LoopbackConnector`]: in-process demo server, no network required
//! - [`Presenter`]: notification callbacks for a user interface
//! - [`SystemEnv`]: production time and randomness
//!
//! # Transport (optional)
//!
//! With the `transport` feature enabled, this crate also provides
//! [`websocket::WsConnector`] for real WebSocket servers.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod channel;
mod error;
pub mod loopback;
pub mod presenter;
pub mod runtime;
mod system_env;

#[cfg(feature = "transport")]
pub mod websocket;

pub use channel::{Channel, ChannelEvent, ChannelEventKind, Connector, EventSender};
pub use error::{RuntimeError, TransportError};
pub use loopback::LoopbackConnector;
pub use parley_core::{Environment, SessionConfig};
pub use presenter::{NullPresenter, Presenter};
pub use runtime::{Command, Runtime, RuntimeHandle};
pub use system_env::SystemEnv;
