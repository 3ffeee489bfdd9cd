//! Property-based tests for backoff and the connection state machine

use proptest::prelude::*;
use std::time::Duration;

use resilink_stream::{CloseOutcome, ConnectionState, ReconnectConfig, StreamState};

fn reconnect_config() -> impl Strategy<Value = ReconnectConfig> {
    (1u64..5_000, 1u64..120_000, 0u32..12).prop_map(|(base, max, attempts)| {
        ReconnectConfig::default()
            .with_base_delay(Duration::from_millis(base))
            .with_max_delay(Duration::from_millis(max))
            .with_max_attempts(attempts)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: delays never decrease and never exceed the cap
    #[test]
    fn prop_backoff_monotonic_and_capped(config in reconnect_config(), attempts in 0u32..64) {
        let current = config.delay_for(attempts);
        let next = config.delay_for(attempts + 1);

        prop_assert!(current <= next);
        prop_assert!(next <= config.max_delay);
    }

    /// Property: below the cap each delay doubles the previous one
    #[test]
    fn prop_backoff_doubles_below_cap(config in reconnect_config(), attempts in 0u32..16) {
        let next = config.delay_for(attempts + 1);
        let doubled = config.delay_for(attempts) * 2;

        if doubled <= config.max_delay {
            prop_assert_eq!(next, doubled);
        } else {
            prop_assert_eq!(next, config.max_delay);
        }
    }

    /// Property: consecutive failures schedule exactly max_attempts reconnects
    #[test]
    fn prop_failures_exhaust_after_budget(config in reconnect_config()) {
        let budget = config.max_attempts;
        let mut machine = StreamState::new(config);
        let mut scheduled = 0;

        machine.begin_connect();
        loop {
            match machine.on_close() {
                CloseOutcome::Reconnect { attempt, .. } => {
                    scheduled += 1;
                    prop_assert_eq!(attempt, scheduled);
                    prop_assert!(machine.begin_connect());
                }
                CloseOutcome::Exhausted { attempts } => {
                    prop_assert_eq!(attempts, budget);
                    break;
                }
                CloseOutcome::Stopped => prop_assert!(false, "reconnect is enabled"),
            }
        }

        prop_assert_eq!(scheduled, budget);
        prop_assert_eq!(machine.state(), ConnectionState::Closed);
    }

    /// Property: an open after any number of failures restores the full budget
    #[test]
    fn prop_open_restores_budget(config in reconnect_config(), failures in 0u32..12) {
        let budget = config.max_attempts;
        let mut machine = StreamState::new(config);

        machine.begin_connect();
        for _ in 0..failures.min(budget) {
            machine.on_close();
            machine.begin_connect();
        }
        machine.on_open();

        prop_assert_eq!(machine.reconnect_attempts(), 0);
        prop_assert!(!machine.begin_connect());
    }
}
