//! Property-based tests for the session state machine.
//!
//! Tests verify that invariants hold under arbitrary event sequences.
//! This ensures behavioral correctness across all possible execution paths.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use parley_core::{Environment, SessionState};
use parley_harness::{
    Inbound, InvariantRegistry, LOCAL_NAME, Operation, PARTICIPANTS, SimDriver, SimInstant,
};
use parley_proto::{Envelope, Roster};
use proptest::prelude::*;

const EXPIRY: Duration = Duration::from_secs(5);

fn participant_id() -> impl Strategy<Value = u8> {
    0u8..4
}

fn inbound_strategy() -> impl Strategy<Value = Inbound> {
    prop_oneof![
        2 => participant_id().prop_map(Inbound::Message),
        2 => participant_id().prop_map(Inbound::Join),
        2 => participant_id().prop_map(Inbound::Leave),
        3 => participant_id().prop_map(Inbound::Typing),
        2 => participant_id().prop_map(Inbound::StopTyping),
        1 => any::<u8>().prop_map(Inbound::UserList),
        1 => any::<u8>().prop_map(Inbound::History),
        1 => Just(Inbound::Unknown),
        1 => Just(Inbound::Garbage),
    ]
}

fn operation_strategy() -> impl Strategy<Value = Operation> {
    prop_oneof![
        1 => Just(Operation::Start),
        1 => Just(Operation::End),
        3 => Just(Operation::Open),
        1 => Just(Operation::Close),
        1 => Just(Operation::Fail),
        8 => inbound_strategy().prop_map(Operation::Deliver),
        2 => inbound_strategy().prop_map(Operation::DeliverStale),
        3 => Just(Operation::Keystroke),
        1 => any::<bool>().prop_map(|blank| Operation::Send { blank }),
        4 => (0u16..8_000).prop_map(|millis| Operation::AdvanceTime { millis }),
    ]
}

fn connected(seed: u64) -> SimDriver {
    let mut driver = SimDriver::with_seed(seed);
    driver.start(LOCAL_NAME).unwrap();
    driver.open();
    driver
}

proptest! {
    /// Session invariants hold under arbitrary operation sequences.
    #[test]
    fn prop_session_invariants_hold(
        seed in any::<u64>(),
        ops in prop::collection::vec(operation_strategy(), 0..80),
    ) {
        let mut driver = SimDriver::with_seed(seed).with_invariants(InvariantRegistry::standard());

        for op in &ops {
            let result = driver.apply(op);
            prop_assert!(result.is_ok(), "after {:?}: {}", op, result.unwrap_err());
        }
    }

    /// A participant is typing iff their last signal was `typing` and it has
    /// not yet expired.
    #[test]
    fn prop_typing_follows_last_signal(
        steps in prop::collection::vec((any::<bool>(), 0u64..8_000), 1..40),
    ) {
        let mut driver = connected(0);
        let mut typing_since: Option<SimInstant> = None;

        let expected = |since: Option<SimInstant>, now: SimInstant| {
            since.is_some_and(|at| now - at < EXPIRY)
        };

        for (is_typing, gap_ms) in steps {
            driver.advance(Duration::from_millis(gap_ms));
            let now = driver.env().now();
            prop_assert_eq!(driver.session().typing_set().contains("Bob"), expected(typing_since, now));

            if is_typing {
                driver.deliver(r#"{"type":"typing","user":"Bob"}"#);
                typing_since = Some(now);
            } else {
                driver.deliver(r#"{"type":"stop_typing","user":"Bob"}"#);
                typing_since = None;
            }
            prop_assert_eq!(driver.session().typing_set().contains("Bob"), is_typing);
        }

        driver.advance(EXPIRY);
        prop_assert!(driver.session().typing_set().is_empty());
    }

    /// `user_list` replaces the roster no matter what came before.
    #[test]
    fn prop_user_list_is_authoritative(
        history in prop::collection::vec(inbound_strategy(), 0..30),
        users in prop::collection::btree_map("[a-z]{1,8}", 0u32..8, 0..6),
    ) {
        let mut driver = connected(0);
        for inbound in &history {
            driver.deliver(&inbound.to_raw());
        }

        let roster: Roster = users;
        driver.deliver(&Envelope::UserList { users: roster.clone() }.to_json());

        prop_assert_eq!(driver.session().roster(), &roster);
    }

    /// Retired channels never alter the live session.
    #[test]
    fn prop_stale_channel_is_inert(
        traffic in prop::collection::vec(inbound_strategy(), 1..30),
    ) {
        let mut driver = connected(0);
        let old = driver.session().active_channel().unwrap();
        driver.close();
        driver.advance_to_deadline();
        driver.open();

        driver.deliver(&Envelope::UserList {
            users: Roster::from([(PARTICIPANTS[0].to_owned(), 1)]),
        }.to_json());
        let roster = driver.session().roster().clone();
        driver.take_notifications();

        for inbound in &traffic {
            driver.deliver_on(old, &inbound.to_raw());
        }

        prop_assert_eq!(driver.session().state(), SessionState::Connected);
        prop_assert_eq!(driver.session().roster(), &roster);
        prop_assert!(driver.session().typing_set().is_empty());
        prop_assert!(driver.take_notifications().is_empty());
    }

    /// Continuous typing sends at most one `typing` per window and exactly
    /// one `stop_typing` once the user goes quiet.
    #[test]
    fn prop_keystrokes_are_debounced(
        gaps in prop::collection::vec(0u64..2_999, 1..40),
    ) {
        let mut driver = connected(0);
        driver.take_sent();

        let mut typing_sent_at = Vec::new();
        driver.keystroke();
        for gap in gaps {
            let before = driver.take_sent();
            if !before.is_empty() {
                typing_sent_at.push(driver.env().now());
            }
            prop_assert!(
                before.iter().all(|e| matches!(e, Envelope::Typing { .. })),
                "non-typing send before the stop: {:?}",
                before
            );

            driver.advance(Duration::from_millis(gap));
            driver.keystroke();
        }
        if !driver.take_sent().is_empty() {
            typing_sent_at.push(driver.env().now());
        }

        for pair in typing_sent_at.windows(2) {
            prop_assert!(pair[1] - pair[0] >= Duration::from_secs(3));
        }

        driver.advance(Duration::from_secs(3));
        prop_assert_eq!(driver.take_sent(), vec![Envelope::StopTyping { user: LOCAL_NAME.into() }]);
        driver.advance(Duration::from_secs(30));
        prop_assert!(driver.take_sent().is_empty());
    }

    /// Same seed and same operations produce the same transcript.
    #[test]
    fn prop_replay_is_deterministic(
        seed in any::<u64>(),
        ops in prop::collection::vec(operation_strategy(), 0..40),
    ) {
        let run = || {
            let mut driver = SimDriver::with_seed(seed);
            for op in &ops {
                let _ = driver.apply(op);
            }
            (driver.sent().to_vec(), driver.notifications().to_vec())
        };
        prop_assert_eq!(run(), run());
    }
}
