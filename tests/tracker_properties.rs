//! Property tests for the health tracker
//!
//! For any interleaving of check outcomes and alert/recovery decisions:
//! - at most one of the two streak counters is nonzero
//! - the streak returned by `record_*` matches the record afterwards
//! - `is_recovered` is never true for a service that was never alerted

use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use vigil::monitor::{HealthTracker, ManualClock};

const NAME: &str = "svc";

#[derive(Debug, Clone, Copy)]
enum Step {
    Fail,
    Succeed,
    Tick(u64),
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        3 => Just(Step::Fail),
        3 => Just(Step::Succeed),
        1 => (1u64..300).prop_map(Step::Tick),
    ]
}

proptest! {
    #[test]
    fn counters_are_mutually_exclusive(
        steps in prop::collection::vec(step(), 1..200),
        threshold in 1u32..5,
        recovery in 1u32..5,
    ) {
        let clock = Arc::new(ManualClock::default());
        let mut tracker = HealthTracker::new(clock.clone());
        let repeat = Duration::from_secs(120);

        for step in steps {
            match step {
                Step::Fail => {
                    let failures = tracker.record_failure(NAME);
                    let record = tracker.record(NAME).unwrap();
                    prop_assert_eq!(record.consecutive_failures(), failures);
                    prop_assert_eq!(record.consecutive_successes(), 0);
                    if tracker.should_alert(NAME, threshold, repeat) {
                        tracker.mark_alerted(NAME);
                    }
                }
                Step::Succeed => {
                    let successes = tracker.record_success(NAME);
                    let record = tracker.record(NAME).unwrap();
                    prop_assert_eq!(record.consecutive_successes(), successes);
                    prop_assert_eq!(record.consecutive_failures(), 0);
                    if tracker.is_recovered(NAME, recovery) {
                        prop_assert!(tracker.record(NAME).unwrap().is_down());
                        tracker.mark_recovered(NAME);
                    }
                }
                Step::Tick(secs) => clock.advance(Duration::from_secs(secs)),
            }

            let record = tracker.record(NAME).unwrap();
            prop_assert!(
                record.consecutive_failures() == 0 || record.consecutive_successes() == 0
            );
        }
    }

    #[test]
    fn successes_alone_never_recover(
        successes in 1usize..50,
        recovery in 1u32..5,
    ) {
        let mut tracker = HealthTracker::new(Arc::new(ManualClock::default()));
        for _ in 0..successes {
            tracker.record_success(NAME);
            prop_assert!(!tracker.is_recovered(NAME, recovery));
        }
    }

    #[test]
    fn no_alert_below_threshold(
        threshold in 2u32..10,
    ) {
        let mut tracker = HealthTracker::new(Arc::new(ManualClock::default()));
        for _ in 1..threshold {
            tracker.record_failure(NAME);
            prop_assert!(!tracker.should_alert(NAME, threshold, Duration::ZERO));
        }
        tracker.record_failure(NAME);
        prop_assert!(tracker.should_alert(NAME, threshold, Duration::ZERO));
    }
}
