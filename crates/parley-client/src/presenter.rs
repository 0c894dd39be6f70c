//! Presentation hooks.
//!
//! The runtime turns every [`Notification`] into one call on a [`Presenter`].
//! Presenters only ever see owned or borrowed snapshots; they cannot reach
//! back into the session.

use std::collections::BTreeSet;

use parley_core::Notification;
use parley_proto::{Message, Roster};

/// Receives session notifications. Every method defaults to doing nothing.
pub trait Presenter: Send {
    /// Connection indicator changed.
    fn on_connection_status_changed(&mut self, _connected: bool) {}

    /// New message for the log.
    fn on_message_received(&mut self, _message: &Message) {}

    /// Replace the log. Empty means show the welcome placeholder.
    fn on_history_loaded(&mut self, _messages: &[Message]) {}

    /// Roster changed; `total` is the participant count.
    fn on_roster_changed(&mut self, _roster: &Roster, _total: usize) {}

    /// Set of typing participants changed.
    fn on_typing_set_changed(&mut self, _typing: &BTreeSet<String>) {}

    /// Someone announced themselves.
    fn on_participant_joined(&mut self, _name: &str) {}

    /// Someone left.
    fn on_participant_left(&mut self, _name: &str) {}

    /// Retries exhausted; the session is over.
    fn on_session_failed(&mut self, _reason: &str) {}
}

/// Route a notification to the matching callback.
pub fn present<P: Presenter + ?Sized>(presenter: &mut P, notification: &Notification) {
    match notification {
        Notification::ConnectionStatusChanged { connected } => {
            presenter.on_connection_status_changed(*connected);
        },
        Notification::MessageReceived(message) => presenter.on_message_received(message),
        Notification::HistoryLoaded(messages) => presenter.on_history_loaded(messages),
        Notification::RosterChanged { roster, total } => presenter.on_roster_changed(roster, *total),
        Notification::TypingSetChanged(typing) => presenter.on_typing_set_changed(typing),
        Notification::ParticipantJoined(name) => presenter.on_participant_joined(name),
        Notification::ParticipantLeft(name) => presenter.on_participant_left(name),
        Notification::SessionFailed { reason } => presenter.on_session_failed(reason),
    }
}

/// Presenter that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPresenter;

impl Presenter for NullPresenter {}
