//! Line-oriented terminal front end.
//!
//! [`TerminalPresenter`] renders notifications as plain text lines, and
//! [`forward_input`] turns input lines into runtime commands.

use std::{
    collections::BTreeSet,
    fmt,
    io::{self, BufRead, Write},
};

use chrono::Local;
use parley_client::{Presenter, RuntimeError, RuntimeHandle};
use parley_proto::{Message, Roster};

/// Placeholder shown when history is empty.
pub const EMPTY_HISTORY: &str = "Welcome to the chat! Messages will appear here.";

/// Input line that ends the session.
pub const QUIT_COMMAND: &str = "/quit";

/// Input line that signals typing without sending anything.
pub const TYPING_COMMAND: &str = "/typing";

/// Presenter writing one line per notification.
pub struct TerminalPresenter<W> {
    out: W,
}

impl<W: Write + Send> TerminalPresenter<W> {
    /// Render to `out`.
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Consume the presenter, returning the writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, args: fmt::Arguments<'_>) {
        if let Err(e) = self.out.write_fmt(args).and_then(|()| self.out.write_all(b"\n")) {
            tracing::warn!(error = %e, "terminal write failed");
        }
    }

    fn message(&mut self, message: &Message) {
        if message.is_system() {
            self.line(format_args!("* {}", message.body));
        } else {
            let stamp = message.sent_at.with_timezone(&Local).format("%H:%M");
            self.line(format_args!("[{stamp}] {}: {}", message.sender, message.body));
        }
    }
}

impl<W: Write + Send> Presenter for TerminalPresenter<W> {
    fn on_connection_status_changed(&mut self, connected: bool) {
        let status = if connected { "Connected" } else { "Disconnected" };
        self.line(format_args!("-- {status} --"));
    }

    fn on_message_received(&mut self, message: &Message) {
        self.message(message);
    }

    fn on_history_loaded(&mut self, messages: &[Message]) {
        if messages.is_empty() {
            self.line(format_args!("{EMPTY_HISTORY}"));
        }
        for message in messages {
            self.message(message);
        }
    }

    fn on_roster_changed(&mut self, roster: &Roster, total: usize) {
        let names: Vec<_> = roster.keys().map(String::as_str).collect();
        self.line(format_args!("-- {total} users online: {} --", names.join(", ")));
    }

    fn on_typing_set_changed(&mut self, typing: &BTreeSet<String>) {
        let names: Vec<_> = typing.iter().map(String::as_str).collect();
        match names.as_slice() {
            [] => {},
            [one] => self.line(format_args!("{one} is typing...")),
            many => self.line(format_args!("{} are typing...", many.join(", "))),
        }
    }

    fn on_participant_joined(&mut self, name: &str) {
        self.line(format_args!("{name} has joined the chat"));
    }

    fn on_participant_left(&mut self, name: &str) {
        self.line(format_args!("{name} has left the chat"));
    }

    fn on_session_failed(&mut self, reason: &str) {
        self.line(format_args!("-- Giving up: {reason} --"));
    }
}

/// Forward input lines to the runtime until EOF or [`QUIT_COMMAND`].
///
/// Blocking; run it on its own thread.
pub fn forward_input<R: BufRead>(input: R, handle: &RuntimeHandle) -> Result<(), RuntimeError> {
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(error = %e, "stdin read failed");
                break;
            },
        };

        match line.trim() {
            QUIT_COMMAND => break,
            TYPING_COMMAND => handle.keystroke()?,
            _ => handle.send(line)?,
        }
    }
    handle.end()
}

/// Ask for a display name on `out`, reading one line from `input`.
///
/// Returns `None` for a blank answer.
pub fn prompt_name<R: BufRead, W: Write>(input: &mut R, out: &mut W) -> io::Result<Option<String>> {
    write!(out, "Display name (blank for guest): ")?;
    out.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    let answer = answer.trim();
    Ok((!answer.is_empty()).then(|| answer.to_owned()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn render(f: impl FnOnce(&mut TerminalPresenter<Vec<u8>>)) -> String {
        let mut presenter = TerminalPresenter::new(Vec::new());
        f(&mut presenter);
        String::from_utf8(presenter.into_inner()).unwrap()
    }

    #[test]
    fn system_messages_have_no_stamp() {
        let message = Message::new("System", "Welcome to the chat, Alice!", Utc::now());
        let out = render(|p| p.on_message_received(&message));
        assert_eq!(out, "* Welcome to the chat, Alice!\n");
    }

    #[test]
    fn chat_messages_show_sender() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 9, 15, 0).unwrap();
        let out = render(|p| p.on_message_received(&Message::new("Bob", "hey", at)));
        assert!(out.starts_with('['));
        assert!(out.ends_with("] Bob: hey\n"));
    }

    #[test]
    fn empty_history_shows_placeholder() {
        let out = render(|p| p.on_history_loaded(&[]));
        assert_eq!(out, format!("{EMPTY_HISTORY}\n"));
    }

    #[test]
    fn typing_lines_pluralize() {
        let one: BTreeSet<String> = ["Bob".to_owned()].into();
        let two: BTreeSet<String> = ["Bob".to_owned(), "Carol".to_owned()].into();

        assert_eq!(render(|p| p.on_typing_set_changed(&one)), "Bob is typing...\n");
        assert_eq!(render(|p| p.on_typing_set_changed(&two)), "Bob, Carol are typing...\n");
        assert_eq!(render(|p| p.on_typing_set_changed(&BTreeSet::new())), "");
    }

    #[test]
    fn roster_line_counts_users() {
        let roster = Roster::from([("Alice".to_owned(), 0), ("Bob".to_owned(), 3)]);
        let out = render(|p| p.on_roster_changed(&roster, 2));
        assert_eq!(out, "-- 2 users online: Alice, Bob --\n");
    }

    #[test]
    fn blank_prompt_answer_means_guest() {
        let mut out = Vec::new();
        assert_eq!(prompt_name(&mut "  \n".as_bytes(), &mut out).unwrap(), None);
        assert_eq!(
            prompt_name(&mut " Alice \n".as_bytes(), &mut out).unwrap(),
            Some("Alice".to_owned())
        );
    }
}
