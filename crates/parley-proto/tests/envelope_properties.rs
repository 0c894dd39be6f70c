//! Property-based tests for envelope decoding.
//!
//! Decoding sits directly behind the network, so it must hold up against
//! arbitrary input, not just the shapes our own encoder produces.

#![allow(clippy::unwrap_used)]

use parley_proto::{DecodeError, DecodeMode, Envelope, EnvelopeKind};
use proptest::prelude::*;

/// Tags that look plausible but are not part of the protocol.
fn unknown_tag() -> impl Strategy<Value = String> {
    "[a-z_]{1,16}".prop_filter("must not be a known tag", |tag| EnvelopeKind::from_tag(tag).is_none())
}

proptest! {
    #[test]
    fn prop_decode_never_panics(raw in ".{0,256}") {
        let _ = Envelope::decode(&raw, DecodeMode::Permissive);
        let _ = Envelope::decode(&raw, DecodeMode::Strict);
    }

    #[test]
    fn prop_unknown_tags_depend_on_mode(tag in unknown_tag(), user in "[A-Za-z]{1,8}") {
        let raw = serde_json::json!({ "type": tag, "user": user }).to_string();

        prop_assert_eq!(Envelope::decode(&raw, DecodeMode::Permissive), Ok(None));
        prop_assert_eq!(
            Envelope::decode(&raw, DecodeMode::Strict),
            Err(DecodeError::UnknownKind(tag))
        );
    }

    #[test]
    fn prop_user_list_preserves_mapping(
        users in prop::collection::btree_map("[A-Za-z0-9 -]{1,12}", 0u32..8, 0..16)
    ) {
        let raw = serde_json::json!({ "type": "user_list", "users": users }).to_string();
        let decoded = Envelope::decode(&raw, DecodeMode::Strict);

        prop_assert_eq!(decoded, Ok(Some(Envelope::UserList { users })));
    }

    #[test]
    fn prop_presence_kinds_carry_user(user in "\\PC{0,24}", kind_index in 0usize..4) {
        let kind = [
            EnvelopeKind::Join,
            EnvelopeKind::Leave,
            EnvelopeKind::Typing,
            EnvelopeKind::StopTyping,
        ][kind_index];
        let raw = serde_json::json!({ "type": kind.tag(), "user": user }).to_string();

        let envelope = Envelope::decode(&raw, DecodeMode::Strict).unwrap().unwrap();
        prop_assert_eq!(envelope.kind(), kind);
    }
}
