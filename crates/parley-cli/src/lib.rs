//! Parley terminal client.
//!
//! Plain line-based chat front end over [`parley_client::Runtime`]. Without a
//! server URL it talks to the in-process loopback server.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod terminal;

pub use terminal::{TerminalPresenter, forward_input, prompt_name};
