//! Simulation driver for the session state machine.
//!
//! `SimDriver` plays the part of the production runtime: it feeds events into
//! a [`Session`] and executes the resulting actions against an in-memory
//! transport. Nothing is delivered automatically; tests decide when a channel
//! opens, what the server says, when the channel dies and how much virtual
//! time passes.

use std::{fmt, time::Duration};

use parley_core::{
    ChannelId, Environment, Notification, Session, SessionAction, SessionConfig, SessionError,
    SessionEvent,
};
use parley_proto::Envelope;

use crate::{
    invariants::{InvariantRegistry, SessionSnapshot, Violation},
    operation::Operation,
    sim_env::{SimEnv, SimInstant},
};

/// Display name the simulated user joins with.
pub const LOCAL_NAME: &str = "Alice";

/// Error from replaying an operation.
#[derive(Debug, Clone)]
pub enum SimDriverError {
    /// Session rejected a lifecycle request
    Session(SessionError),
    /// An invariant broke after the operation
    Invariants(Vec<Violation>),
}

impl fmt::Display for SimDriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Session(e) => write!(f, "session error: {e}"),
            Self::Invariants(violations) => {
                let messages: Vec<_> = violations.iter().map(ToString::to_string).collect();
                write!(f, "invariant violation:\n  {}", messages.join("\n  "))
            },
        }
    }
}

impl std::error::Error for SimDriverError {}

/// Deterministic driver around one session.
pub struct SimDriver {
    env: SimEnv,
    session: Session<SimInstant>,
    /// Channel the session asked to open that has not opened yet
    pending: Option<ChannelId>,
    /// Channels the session has closed, in order
    retired: Vec<ChannelId>,
    sent: Vec<(ChannelId, Envelope)>,
    notifications: Vec<Notification>,
    last_status: Option<bool>,
    invariants: Option<InvariantRegistry>,
}

impl SimDriver {
    /// Create a driver with the given environment and configuration.
    pub fn new(env: SimEnv, config: SessionConfig) -> Self {
        Self {
            env,
            session: Session::new(config),
            pending: None,
            retired: Vec::new(),
            sent: Vec::new(),
            notifications: Vec::new(),
            last_status: None,
            invariants: None,
        }
    }

    /// Create a driver with default configuration and a seeded environment.
    pub fn with_seed(seed: u64) -> Self {
        Self::new(SimEnv::with_seed(seed), SessionConfig::default())
    }

    /// Enable invariant checking in [`SimDriver::apply`].
    #[must_use]
    pub fn with_invariants(mut self, registry: InvariantRegistry) -> Self {
        self.invariants = Some(registry);
        self
    }

    /// Start the session as `name`.
    pub fn start(&mut self, name: &str) -> Result<(), SessionError> {
        let now = self.env.now();
        self.feed(SessionEvent::StartSession { display_name: name.to_owned(), now })
    }

    /// End the session.
    pub fn end(&mut self) {
        let now = self.env.now();
        self.feed_infallible(SessionEvent::EndSession { now });
    }

    /// Complete the pending channel open, if any.
    pub fn open(&mut self) {
        if let Some(channel) = self.pending.take() {
            let now = self.env.now();
            self.feed_infallible(SessionEvent::ChannelOpened { channel, now });
        }
    }

    /// Close the active channel from the transport side.
    pub fn close(&mut self) {
        if let Some(channel) = self.session.active_channel() {
            self.pending = None;
            let now = self.env.now();
            self.feed_infallible(SessionEvent::ChannelClosed { channel, now });
        }
    }

    /// Fail the active channel from the transport side.
    pub fn fail(&mut self, reason: &str) {
        if let Some(channel) = self.session.active_channel() {
            self.pending = None;
            let now = self.env.now();
            self.feed_infallible(SessionEvent::ChannelError {
                channel,
                reason: reason.to_owned(),
                now,
            });
        }
    }

    /// Deliver raw text on the active channel. No-op without one.
    pub fn deliver(&mut self, raw: &str) {
        if let Some(channel) = self.session.active_channel() {
            self.deliver_on(channel, raw);
        }
    }

    /// Deliver raw text on a specific channel, live or not.
    pub fn deliver_on(&mut self, channel: ChannelId, raw: &str) {
        let now = self.env.now();
        self.feed_infallible(SessionEvent::ChannelMessage { channel, raw: raw.to_owned(), now });
    }

    /// Register a local keystroke.
    pub fn keystroke(&mut self) {
        let now = self.env.now();
        self.feed_infallible(SessionEvent::Keystroke { now });
    }

    /// Submit a chat message.
    pub fn send(&mut self, body: &str) {
        let now = self.env.now();
        let sent_at = self.env.wall_clock();
        self.feed_infallible(SessionEvent::SendMessage { body: body.to_owned(), sent_at, now });
    }

    /// Advance virtual time and tick the session.
    pub fn advance(&mut self, duration: Duration) {
        self.env.advance(duration);
        self.tick();
    }

    /// Tick the session at the current virtual time.
    pub fn tick(&mut self) {
        let now = self.env.now();
        self.feed_infallible(SessionEvent::Tick { now });
    }

    /// Advance to the session's next deadline and tick.
    ///
    /// Returns `false` if nothing was pending.
    pub fn advance_to_deadline(&mut self) -> bool {
        let Some(deadline) = self.session.next_deadline() else {
            return false;
        };
        let now = self.env.now();
        self.advance(deadline - now);
        true
    }

    /// Replay one generated operation, then check invariants if enabled.
    pub fn apply(&mut self, op: &Operation) -> Result<(), SimDriverError> {
        match op {
            Operation::Start => {
                // Rejections outside Idle are expected and leave no trace
                let _ = self.start(LOCAL_NAME);
            },
            Operation::End => self.end(),
            Operation::Open => self.open(),
            Operation::Close => self.close(),
            Operation::Fail => self.fail("connection reset"),
            Operation::Deliver(inbound) => self.deliver(&inbound.to_raw()),
            Operation::DeliverStale(inbound) => {
                if let Some(&channel) = self.retired.last() {
                    self.deliver_on(channel, &inbound.to_raw());
                }
            },
            Operation::Keystroke => self.keystroke(),
            Operation::Send { blank } => self.send(if *blank { "   " } else { "hi" }),
            Operation::AdvanceTime { millis } => {
                self.advance(Duration::from_millis(u64::from(*millis)));
            },
        }

        self.check_invariants().map_err(SimDriverError::Invariants)
    }

    /// Run the registered invariants against the current state.
    pub fn check_invariants(&self) -> Result<(), Vec<Violation>> {
        match &self.invariants {
            Some(registry) => registry.check_all(&self.snapshot()),
            None => Ok(()),
        }
    }

    /// Observable state for invariant checks.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.session.state(),
            active_channel: self.session.active_channel(),
            roster: self.session.roster().clone(),
            typing: self.session.typing_set(),
            last_status: self.last_status,
            has_deadline: self.session.next_deadline().is_some(),
            pending_open: self.pending,
        }
    }

    /// Session under test.
    pub fn session(&self) -> &Session<SimInstant> {
        &self.session
    }

    /// Simulated environment.
    pub fn env(&self) -> &SimEnv {
        &self.env
    }

    /// Channel waiting to be opened.
    pub fn pending_channel(&self) -> Option<ChannelId> {
        self.pending
    }

    /// Channels the session has closed.
    pub fn retired_channels(&self) -> &[ChannelId] {
        &self.retired
    }

    /// Envelopes sent so far.
    pub fn sent(&self) -> &[(ChannelId, Envelope)] {
        &self.sent
    }

    /// Drain sent envelopes, dropping the channel tags.
    pub fn take_sent(&mut self) -> Vec<Envelope> {
        self.sent.drain(..).map(|(_, envelope)| envelope).collect()
    }

    /// Notifications emitted so far.
    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    /// Drain emitted notifications.
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    fn feed(&mut self, event: SessionEvent<SimInstant>) -> Result<(), SessionError> {
        let actions = self.session.handle(event)?;
        for action in actions {
            self.execute(action);
        }
        Ok(())
    }

    /// Only `StartSession` can fail.
    fn feed_infallible(&mut self, event: SessionEvent<SimInstant>) {
        if let Err(e) = self.feed(event) {
            tracing::error!(error = %e, "unexpected session error");
        }
    }

    fn execute(&mut self, action: SessionAction) {
        match action {
            SessionAction::OpenChannel { channel } => self.pending = Some(channel),
            SessionAction::CloseChannel { channel } => {
                if self.pending == Some(channel) {
                    self.pending = None;
                }
                self.retired.push(channel);
            },
            SessionAction::Send { channel, envelope } => self.sent.push((channel, envelope)),
            SessionAction::Notify(notification) => {
                if let Notification::ConnectionStatusChanged { connected } = notification {
                    self.last_status = Some(connected);
                }
                self.notifications.push(notification);
            },
        }
    }
}
