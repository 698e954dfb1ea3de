//! Property-based tests for the bulk writer's circuit breaker state
//! machine (spec §4.7, §8.1 "circuit idempotence").
//!
//! The direct analogue of the teacher's `proptest_session.rs` session
//! state-machine test: instead of walking a fixed session-status graph,
//! this drives `CircuitBreaker` through random sequences of its four
//! transition calls (`record_failure`, `trip_immediately`,
//! `record_success`, `force_closed`) and checks invariants that must hold
//! after every single call, not just at the end of a run.
//!
//! Run with: cargo test --test proptest_circuit

use proptest::prelude::*;
use smartpixl_engine::writer::circuit::{CircuitBreaker, CircuitState};

#[derive(Debug, Clone, Copy)]
enum Transition {
    RecordFailure,
    TripImmediately,
    RecordSuccess,
    ForceClosed,
}

fn transition_strategy() -> impl Strategy<Value = Transition> {
    prop_oneof![
        Just(Transition::RecordFailure),
        Just(Transition::TripImmediately),
        Just(Transition::RecordSuccess),
        Just(Transition::ForceClosed),
    ]
}

proptest! {
    /// After any sequence of transitions, `record_success` and
    /// `force_closed` always leave the breaker `Closed` with zeroed
    /// failures — the reset path is idempotent no matter what preceded
    /// it (spec §8.1).
    #[test]
    fn reset_transitions_always_zero_the_breaker(
        steps in prop::collection::vec(transition_strategy(), 0..50),
    ) {
        let cb = CircuitBreaker::new();
        for step in steps {
            match step {
                Transition::RecordFailure => cb.record_failure(),
                Transition::TripImmediately => cb.trip_immediately(),
                Transition::RecordSuccess => cb.record_success(),
                Transition::ForceClosed => cb.force_closed(),
            }
        }
        cb.record_success();
        prop_assert_eq!(cb.state(), CircuitState::Closed);
        prop_assert_eq!(cb.consecutive_failures(), 0);

        cb.trip_immediately();
        cb.force_closed();
        prop_assert_eq!(cb.state(), CircuitState::Closed);
        prop_assert_eq!(cb.consecutive_failures(), 0);
    }

    /// `consecutive_failures` only ever increases on `record_failure` /
    /// `trip_immediately` and only ever resets to exactly zero (never
    /// some other value) on `record_success` / `force_closed`.
    #[test]
    fn consecutive_failures_never_goes_negative_or_partial_reset(
        steps in prop::collection::vec(transition_strategy(), 0..50),
    ) {
        let cb = CircuitBreaker::new();
        let mut prev = 0u32;
        for step in steps {
            match step {
                Transition::RecordFailure => {
                    cb.record_failure();
                    let now = cb.consecutive_failures();
                    prop_assert!(now == prev + 1);
                    prev = now;
                }
                Transition::TripImmediately => {
                    cb.trip_immediately();
                    let now = cb.consecutive_failures();
                    prop_assert!(now == prev + 1);
                    prev = now;
                }
                Transition::RecordSuccess => {
                    cb.record_success();
                    prop_assert_eq!(cb.consecutive_failures(), 0);
                    prev = 0;
                }
                Transition::ForceClosed => {
                    cb.force_closed();
                    prop_assert_eq!(cb.consecutive_failures(), 0);
                    prev = 0;
                }
            }
        }
    }

    /// A breaker that has just been opened (by either failure path) never
    /// allows an immediate attempt — `should_attempt` must wait out the
    /// backoff, it can't be bypassed by interleaving unrelated calls.
    #[test]
    fn freshly_opened_breaker_never_immediately_attempts(
        use_trip_immediately in any::<bool>(),
    ) {
        let cb = CircuitBreaker::new();
        if use_trip_immediately {
            cb.trip_immediately();
        } else {
            cb.record_failure();
        }
        prop_assert_eq!(cb.state(), CircuitState::Open);
        prop_assert!(!cb.should_attempt());
    }
}
