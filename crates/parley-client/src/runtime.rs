//! Async runtime driving a session.
//!
//! The runtime is the only place that performs I/O on the session's behalf.
//! One `tokio::select!` loop serializes three inputs:
//!
//! - channel events from the active (or stale) channel I/O tasks
//! - commands from the user via [`RuntimeHandle`]
//! - timer wake-ups at the session's next deadline
//!
//! Each input becomes a [`SessionEvent`], and the returned actions are
//! executed in order: channels opened and closed through the [`Connector`],
//! envelopes written to channels, notifications handed to the [`Presenter`].

use std::collections::HashMap;

use parley_core::{
    ChannelId, Environment, Session, SessionAction, SessionConfig, SessionEvent, SessionState,
};
use tokio::sync::mpsc;

use crate::{
    channel::{Channel, ChannelEvent, ChannelEventKind, Connector},
    error::RuntimeError,
    presenter::{Presenter, present},
};

/// User commands accepted while the runtime is running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Key pressed in the message input
    Keystroke,
    /// Submit a chat message
    Send(String),
    /// Leave and stop the runtime
    End,
}

/// Cloneable handle for sending commands to a running runtime.
#[derive(Debug, Clone)]
pub struct RuntimeHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl RuntimeHandle {
    /// Report a keystroke.
    pub fn keystroke(&self) -> Result<(), RuntimeError> {
        self.command(Command::Keystroke)
    }

    /// Send a chat message.
    pub fn send(&self, body: impl Into<String>) -> Result<(), RuntimeError> {
        self.command(Command::Send(body.into()))
    }

    /// End the session.
    pub fn end(&self) -> Result<(), RuntimeError> {
        self.command(Command::End)
    }

    /// Queue a command.
    pub fn command(&self, command: Command) -> Result<(), RuntimeError> {
        self.commands.send(command).map_err(|_| RuntimeError::Stopped)
    }
}

/// Runtime orchestrating session, channels and presenter.
///
/// # Type Parameters
///
/// - `E`: Environment supplying time and randomness
/// - `C`: Connector creating channels
/// - `P`: Presenter receiving notifications
pub struct Runtime<E, C, P>
where
    E: Environment,
{
    env: E,
    connector: C,
    presenter: P,
    session: Session<E::Instant>,
    /// Live channels by id. Removed and closed on `CloseChannel`.
    channels: HashMap<ChannelId, Channel>,
    events_tx: mpsc::UnboundedSender<ChannelEvent>,
    events_rx: mpsc::UnboundedReceiver<ChannelEvent>,
    commands: mpsc::UnboundedReceiver<Command>,
}

impl<E, C, P> Runtime<E, C, P>
where
    E: Environment,
    C: Connector,
    P: Presenter,
{
    /// Create a runtime and the handle that controls it.
    pub fn new(env: E, connector: C, presenter: P, config: SessionConfig) -> (Self, RuntimeHandle) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (commands_tx, commands) = mpsc::unbounded_channel();

        let runtime = Self {
            env,
            connector,
            presenter,
            session: Session::new(config),
            channels: HashMap::new(),
            events_tx,
            events_rx,
            commands,
        };
        (runtime, RuntimeHandle { commands: commands_tx })
    }

    /// Run the session as `display_name` until it closes.
    ///
    /// Returns the presenter so callers can inspect or reuse it.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Session`] if the display name is rejected.
    pub async fn run(mut self, display_name: &str) -> Result<P, RuntimeError> {
        let now = self.env.now();
        let actions = self
            .session
            .handle(SessionEvent::StartSession { display_name: display_name.to_owned(), now })?;
        self.execute(actions);

        while self.session.state() != SessionState::Closed {
            let env = self.env.clone();
            let wait = self.session.next_deadline().map(|deadline| deadline - env.now());
            let timer = async move {
                match wait {
                    Some(duration) => env.sleep(duration).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                Some(event) = self.events_rx.recv() => self.on_channel_event(event),
                command = self.commands.recv() => self.on_command(command),
                () = timer => {
                    let now = self.env.now();
                    self.feed(SessionEvent::Tick { now });
                },
            }
        }

        tracing::info!("session closed");
        for (_, mut channel) in self.channels.drain() {
            channel.close();
        }
        Ok(self.presenter)
    }

    /// Current session, for inspection.
    pub fn session(&self) -> &Session<E::Instant> {
        &self.session
    }

    fn on_channel_event(&mut self, event: ChannelEvent) {
        let now = self.env.now();
        let ChannelEvent { channel, kind } = event;

        let event = match kind {
            ChannelEventKind::Open => SessionEvent::ChannelOpened { channel, now },
            ChannelEventKind::Message(raw) => SessionEvent::ChannelMessage { channel, raw, now },
            ChannelEventKind::Closed => SessionEvent::ChannelClosed { channel, now },
            ChannelEventKind::Error(reason) => SessionEvent::ChannelError { channel, reason, now },
        };
        self.feed(event);
    }

    fn on_command(&mut self, command: Option<Command>) {
        let now = self.env.now();
        let event = match command {
            Some(Command::Keystroke) => SessionEvent::Keystroke { now },
            Some(Command::Send(body)) => {
                SessionEvent::SendMessage { body, sent_at: self.env.wall_clock(), now }
            },
            // Every handle dropped: nobody can end the session any other way
            Some(Command::End) | None => SessionEvent::EndSession { now },
        };
        self.feed(event);
    }

    /// Handle an event that cannot be rejected.
    fn feed(&mut self, event: SessionEvent<E::Instant>) {
        match self.session.handle(event) {
            Ok(actions) => self.execute(actions),
            Err(e) => tracing::warn!(error = %e, "session rejected event"),
        }
    }

    fn execute(&mut self, actions: Vec<SessionAction>) {
        for action in actions {
            match action {
                SessionAction::OpenChannel { channel } => {
                    tracing::debug!(%channel, "connecting");
                    let handle = self.connector.connect(channel, self.events_tx.clone());
                    self.channels.insert(channel, handle);
                },
                SessionAction::CloseChannel { channel } => {
                    if let Some(mut handle) = self.channels.remove(&channel) {
                        handle.close();
                    }
                },
                SessionAction::Send { channel, envelope } => {
                    let Some(handle) = self.channels.get(&channel) else {
                        tracing::debug!(%channel, "dropping send to closed channel");
                        continue;
                    };
                    if let Err(e) = handle.send(envelope.to_json()) {
                        tracing::warn!(%channel, error = %e, "send failed");
                    }
                },
                SessionAction::Notify(notification) => {
                    present(&mut self.presenter, &notification);
                },
            }
        }
    }
}
