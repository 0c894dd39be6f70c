//! Fuzz target for Envelope::decode
//!
//! Feeds arbitrary text to the decoder in both modes to find:
//! - Parser panics on malformed JSON
//! - Tag handling that disagrees between modes
//! - Envelopes that decode but do not survive re-encoding
//!
//! The fuzzer should NEVER panic. All invalid inputs should return an error.

#![no_main]

use libfuzzer_sys::fuzz_target;
use parley_proto::{DecodeError, DecodeMode, Envelope};

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = std::str::from_utf8(data) else {
        return;
    };

    let permissive = Envelope::decode(raw, DecodeMode::Permissive);
    let strict = Envelope::decode(raw, DecodeMode::Strict);

    match (&permissive, &strict) {
        // Unknown kinds are skipped in one mode and rejected in the other
        (Ok(None), Err(DecodeError::UnknownKind(_))) => {},
        (Ok(Some(a)), Ok(Some(b))) => {
            assert_eq!(a, b);
            let again = Envelope::decode(&a.to_json(), DecodeMode::Strict);
            assert_eq!(again.ok().flatten().as_ref(), Some(a));
        },
        (Err(_), Err(_)) => {},
        other => panic!("modes disagree: {other:?}"),
    }
});
