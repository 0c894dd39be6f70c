//! Session state machine.
//!
//! Owns the connection lifecycle, the reconnect policy, and is the only
//! writer of the roster and the typing set. Uses the action pattern: every
//! input is a [`SessionEvent`] carrying the current time, and the session
//! returns [`SessionAction`]s for the driver to execute. No I/O happens here.
//!
//! # State Machine
//!
//! ```text
//! ┌──────┐ start  ┌────────────┐  open   ┌───────────┐
//! │ Idle │───────>│ Connecting │────────>│ Connected │
//! └──────┘        └────────────┘         └───────────┘
//!                   ↑      │ close/error       │ close/error
//!          backoff  │      ↓                   │
//!                 ┌──────────────┐             │
//!                 │ Reconnecting │<────────────┘
//!                 └──────────────┘
//!
//!   Connecting | Connected | Reconnecting ──end──> Closed
//!   Idle ──end──> Idle (nothing to end)
//! ```
//!
//! # Channel generations
//!
//! Each connection attempt gets a fresh [`ChannelId`]. Only events tagged
//! with the active id are applied; anything from a retired channel is
//! dropped, so a slow close on attempt N can never disturb attempt N+1.

use std::{collections::BTreeSet, time::Duration};

use parley_proto::{DecodeMode, Roster};

use crate::{
    backoff::{Backoff, BackoffConfig},
    dispatch::{Dispatcher, roster_changed},
    env::MonotonicInstant,
    error::SessionError,
    event::{ChannelId, Notification, SessionAction, SessionEvent},
    identity::normalize_identity,
    presence::{DEFAULT_PALETTE_SIZE, PresenceRegistry},
    typing::{DEFAULT_TYPING_DEBOUNCE, DEFAULT_TYPING_EXPIRY, LocalSignal, TypingTracker},
};

/// Session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No identity chosen yet
    Idle,
    /// Channel opening
    Connecting,
    /// Channel open, `join` sent
    Connected,
    /// Channel lost, waiting for the backoff deadline
    Reconnecting,
    /// Ended by the user or by exhausted retries. Terminal.
    Closed,
}

/// Session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Lifetime of a remote `typing` signal without refresh
    pub typing_expiry: Duration,
    /// Local typing debounce window
    pub typing_debounce: Duration,
    /// Reconnect policy
    pub backoff: BackoffConfig,
    /// Unknown envelope policy
    pub decode_mode: DecodeMode,
    /// Number of avatar colors
    pub palette_size: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            typing_expiry: DEFAULT_TYPING_EXPIRY,
            typing_debounce: DEFAULT_TYPING_DEBOUNCE,
            backoff: BackoffConfig::default(),
            decode_mode: DecodeMode::default(),
            palette_size: DEFAULT_PALETTE_SIZE,
        }
    }
}

/// Client-side chat session.
///
/// Generic over the instant type so tests can drive it with virtual time.
#[derive(Debug, Clone)]
pub struct Session<I> {
    state: SessionState,
    /// Local display name. Set once by `StartSession`, never changed.
    identity: Option<String>,
    dispatcher: Dispatcher,
    presence: PresenceRegistry,
    typing: TypingTracker<I>,
    backoff: Backoff,
    /// Channel whose events are currently accepted
    active_channel: Option<ChannelId>,
    /// Next id to hand out; ids are never reused
    next_channel: u64,
    /// When to open the next channel while `Reconnecting`
    reconnect_at: Option<I>,
}

impl<I: MonotonicInstant> Session<I> {
    /// Create an idle session.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            state: SessionState::Idle,
            identity: None,
            dispatcher: Dispatcher::new(config.decode_mode),
            presence: PresenceRegistry::new(config.palette_size),
            typing: TypingTracker::new(config.typing_expiry, config.typing_debounce),
            backoff: Backoff::new(config.backoff),
            active_channel: None,
            next_channel: 1,
            reconnect_at: None,
        }
    }

    /// Process one event.
    ///
    /// Timers due at the event's instant fire first, then the event applies.
    ///
    /// # Errors
    ///
    /// - [`SessionError::InvalidIdentity`] if `StartSession` names nobody
    /// - [`SessionError::InvalidState`] if `StartSession` arrives outside
    ///   `Idle`
    pub fn handle(&mut self, event: SessionEvent<I>) -> Result<Vec<SessionAction>, SessionError> {
        // Idle has no timers, and a rejected start must not fire any
        if let SessionEvent::StartSession { display_name, .. } = &event {
            return self.start(display_name);
        }

        let now = event.now();
        let mut actions = self.fire_due(now);

        match event {
            SessionEvent::StartSession { .. } => {},
            SessionEvent::EndSession { .. } => actions.extend(self.end()),
            SessionEvent::ChannelOpened { channel, .. } => actions.extend(self.on_open(channel)),
            SessionEvent::ChannelMessage { channel, raw, .. } => {
                actions.extend(self.on_message(channel, &raw, now));
            },
            SessionEvent::ChannelClosed { channel, .. } => {
                actions.extend(self.on_channel_down(channel, "channel closed", now));
            },
            SessionEvent::ChannelError { channel, reason, .. } => {
                actions.extend(self.on_channel_down(channel, &reason, now));
            },
            SessionEvent::Keystroke { .. } => actions.extend(self.on_keystroke(now)),
            SessionEvent::SendMessage { body, sent_at, .. } => {
                actions.extend(self.on_send_message(&body, sent_at));
            },
            SessionEvent::Tick { .. } => {},
        }

        Ok(actions)
    }

    fn start(&mut self, display_name: &str) -> Result<Vec<SessionAction>, SessionError> {
        if self.state != SessionState::Idle {
            return Err(SessionError::InvalidState {
                state: self.state,
                operation: "start_session",
            });
        }

        let identity = normalize_identity(display_name)?;
        tracing::info!(identity = %identity, "starting session");

        self.identity = Some(identity);
        self.state = SessionState::Connecting;
        Ok(vec![self.open_channel()])
    }

    fn end(&mut self) -> Vec<SessionAction> {
        if matches!(self.state, SessionState::Idle | SessionState::Closed) {
            return vec![];
        }

        tracing::info!(state = ?self.state, "ending session");

        let was_connected = self.state == SessionState::Connected;
        let mut actions = self.reset_presence();

        if let Some(channel) = self.active_channel.take() {
            actions.push(SessionAction::CloseChannel { channel });
        }
        if was_connected {
            actions.push(notify_status(false));
        }

        self.reconnect_at = None;
        self.state = SessionState::Closed;
        actions
    }

    fn on_open(&mut self, channel: ChannelId) -> Vec<SessionAction> {
        if !self.is_active(channel) || self.state != SessionState::Connecting {
            tracing::debug!(%channel, state = ?self.state, "ignoring open from inactive channel");
            return vec![];
        }

        let Some(identity) = self.identity.clone() else {
            return vec![];
        };

        tracing::info!(%channel, "connected");
        self.state = SessionState::Connected;
        self.backoff.reset();

        let mut actions = self.reset_presence();
        actions.push(SessionAction::Send {
            channel,
            envelope: self.dispatcher.announce_join(&identity),
        });
        actions.push(notify_status(true));
        actions
    }

    fn on_message(&mut self, channel: ChannelId, raw: &str, now: I) -> Vec<SessionAction> {
        if !self.is_active(channel) {
            tracing::debug!(%channel, "dropping envelope from stale channel");
            return vec![];
        }

        let envelope = match self.dispatcher.decode(raw) {
            Ok(Some(envelope)) => envelope,
            Ok(None) => return vec![],
            Err(e) => {
                tracing::warn!(%channel, error = %e, "dropping undecodable envelope");
                return vec![];
            },
        };

        let connected = self.state == SessionState::Connected;
        self.dispatcher
            .route(envelope, &mut self.presence, &mut self.typing, connected, now)
            .into_iter()
            .map(SessionAction::Notify)
            .collect()
    }

    fn on_channel_down(&mut self, channel: ChannelId, reason: &str, now: I) -> Vec<SessionAction> {
        if !self.is_active(channel) {
            tracing::debug!(%channel, "ignoring closure of stale channel");
            return vec![];
        }
        if !matches!(self.state, SessionState::Connecting | SessionState::Connected) {
            return vec![];
        }

        tracing::warn!(%channel, reason, state = ?self.state, "channel lost");

        let was_connected = self.state == SessionState::Connected;
        let mut actions = self.reset_presence();
        self.active_channel = None;
        actions.push(SessionAction::CloseChannel { channel });
        if was_connected {
            actions.push(notify_status(false));
        }

        if let Some(delay) = self.backoff.next_delay() {
            tracing::info!(?delay, attempt = self.backoff.attempts(), "scheduling reconnect");
            self.state = SessionState::Reconnecting;
            self.reconnect_at = Some(now + delay);
        } else {
            tracing::error!(attempts = self.backoff.attempts(), "reconnect attempts exhausted");
            self.state = SessionState::Closed;
            actions.push(SessionAction::Notify(Notification::SessionFailed {
                reason: reason.to_owned(),
            }));
        }

        actions
    }

    fn on_keystroke(&mut self, now: I) -> Vec<SessionAction> {
        if self.state != SessionState::Connected {
            return vec![];
        }
        match self.typing.keystroke(now) {
            Some(signal) => self.send_signal(signal),
            None => vec![],
        }
    }

    fn on_send_message(
        &mut self,
        body: &str,
        sent_at: chrono::DateTime<chrono::Utc>,
    ) -> Vec<SessionAction> {
        let (Some(channel), Some(identity)) = (self.connected_channel(), self.identity.as_deref())
        else {
            tracing::debug!(state = ?self.state, "not connected, message not sent");
            return vec![];
        };

        let Some(envelope) = self.dispatcher.send_message(identity, body, sent_at) else {
            return vec![];
        };

        let stop = self.dispatcher.signal_stop_typing(identity);
        self.typing.force_stop();

        vec![SessionAction::Send { channel, envelope }, SessionAction::Send {
            channel,
            envelope: stop,
        }]
    }

    /// Fire every timer due at `now`.
    fn fire_due(&mut self, now: I) -> Vec<SessionAction> {
        let mut actions = Vec::new();

        if self.state == SessionState::Reconnecting
            && self.reconnect_at.is_some_and(|at| at <= now)
        {
            self.reconnect_at = None;
            self.state = SessionState::Connecting;
            actions.push(self.open_channel());
        }

        if self.state == SessionState::Connected {
            if self.typing.expire(now) {
                actions.push(SessionAction::Notify(Notification::TypingSetChanged(
                    self.typing.names(),
                )));
            }
            if let Some(signal) = self.typing.poll_local(now) {
                actions.extend(self.send_signal(signal));
            }
        }

        actions
    }

    /// Encode a local typing signal for the active channel.
    fn send_signal(&self, signal: LocalSignal) -> Vec<SessionAction> {
        let (Some(channel), Some(identity)) = (self.connected_channel(), self.identity.as_deref())
        else {
            return vec![];
        };

        let envelope = match signal {
            LocalSignal::Typing => self.dispatcher.signal_typing(identity),
            LocalSignal::StopTyping => self.dispatcher.signal_stop_typing(identity),
        };
        vec![SessionAction::Send { channel, envelope }]
    }

    fn open_channel(&mut self) -> SessionAction {
        let channel = ChannelId(self.next_channel);
        self.next_channel += 1;
        self.active_channel = Some(channel);

        tracing::debug!(%channel, "opening channel");
        SessionAction::OpenChannel { channel }
    }

    /// Clear roster and typing set, cancelling every typing timer.
    fn reset_presence(&mut self) -> Vec<SessionAction> {
        let mut actions = Vec::new();
        if self.presence.clear() {
            actions.push(SessionAction::Notify(roster_changed(&self.presence)));
        }
        if self.typing.clear() {
            actions.push(SessionAction::Notify(Notification::TypingSetChanged(BTreeSet::new())));
        }
        actions
    }

    fn is_active(&self, channel: ChannelId) -> bool {
        self.active_channel == Some(channel)
    }

    fn connected_channel(&self) -> Option<ChannelId> {
        if self.state == SessionState::Connected { self.active_channel } else { None }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// True while `Connected`.
    pub fn is_connected(&self) -> bool {
        self.state == SessionState::Connected
    }

    /// Local display name. `None` before `StartSession`.
    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    /// Current roster.
    pub fn roster(&self) -> &Roster {
        self.presence.roster()
    }

    /// Participants currently typing.
    pub fn typing_set(&self) -> BTreeSet<String> {
        self.typing.names()
    }

    /// Channel whose events are accepted. `None` while reconnecting or closed.
    pub fn active_channel(&self) -> Option<ChannelId> {
        self.active_channel
    }

    /// Consecutive reconnect attempts since the last successful open.
    pub fn reconnect_attempts(&self) -> u32 {
        self.backoff.attempts()
    }

    /// Earliest instant at which a timer is due. `None` if nothing pending.
    ///
    /// Drivers sleep until this instant and then send a `Tick`.
    pub fn next_deadline(&self) -> Option<I> {
        let typing = if self.state == SessionState::Connected {
            self.typing.next_deadline()
        } else {
            None
        };
        match (self.reconnect_at, typing) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}

fn notify_status(connected: bool) -> SessionAction {
    SessionAction::Notify(Notification::ConnectionStatusChanged { connected })
}
