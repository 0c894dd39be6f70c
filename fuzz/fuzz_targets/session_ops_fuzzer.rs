//! Fuzz target for the session state machine
//!
//! Replays arbitrary operation sequences (user input, server traffic,
//! transport failures, time) through the simulation driver.
//!
//! # Invariants
//!
//! - Roster and typing set are empty unless connected
//! - An active channel exists exactly while connecting or connected
//! - The connection indicator always matches the state
//! - Reconnecting always has a pending deadline
//! - NEVER panic

#![no_main]

use libfuzzer_sys::fuzz_target;
use parley_harness::{InvariantRegistry, Operation, SimDriver};

fuzz_target!(|input: (u64, Vec<Operation>)| {
    let (seed, ops) = input;
    let mut driver = SimDriver::with_seed(seed).with_invariants(InvariantRegistry::standard());

    for op in &ops {
        if let Err(e) = driver.apply(op) {
            panic!("after {op:?}: {e}");
        }
    }
});
