//! Clock source & deadline arithmetic (C8 support, §4.6, §4.8). Grounded on
//! the teacher's `clock.rs` (`to_relative_ns_delay`), generalized from
//! "host wall clock only" to the full `ClockSource` collaborator contract
//! (§6.2): realtime and monotonic readings come from the host, not from
//! `SystemTime` directly, since an embedder may run inside a sandbox with
//! no ambient clock.

use crate::errno::{Error, Result};
use crate::types::{
    Clockid, Subclockflags, SubscriptionClock, Timestamp, CLOCKID_MONOTONIC,
    CLOCKID_PROCESS_CPUTIME_ID, CLOCKID_REALTIME, CLOCKID_THREAD_CPUTIME_ID,
};

/// Host-provided clock readings (§6.2): realtime is wall-clock ns since the
/// Unix epoch; monotonic is ns since some fixed, unspecified anchor. Both
/// are non-decreasing for the lifetime of a single host instance.
pub trait ClockSource {
    fn realtime_ns(&self) -> Timestamp;
    fn monotonic_ns(&self) -> Timestamp;
}

/// Resolution reported for every supported clock (§8: "clock_res_get
/// returns 1 ns for all four supported clocks").
pub const RESOLUTION_NS: Timestamp = 1;

pub fn time_get(clocks: &dyn ClockSource, id: Clockid) -> Result<Timestamp> {
    match id {
        CLOCKID_REALTIME => Ok(clocks.realtime_ns()),
        CLOCKID_MONOTONIC => Ok(clocks.monotonic_ns()),
        CLOCKID_PROCESS_CPUTIME_ID | CLOCKID_THREAD_CPUTIME_ID => Ok(clocks.monotonic_ns()),
        _ => Err(Error::InvalidArgument("clockid")),
    }
}

pub fn res_get(id: Clockid) -> Result<Timestamp> {
    match id {
        CLOCKID_REALTIME | CLOCKID_MONOTONIC | CLOCKID_PROCESS_CPUTIME_ID
        | CLOCKID_THREAD_CPUTIME_ID => Ok(RESOLUTION_NS),
        _ => Err(Error::InvalidArgument("clockid")),
    }
}

/// Converts a clock subscription (§4.8) into an absolute deadline on its own
/// clock's timeline: if `abstime` is set, `timeout` already is that
/// deadline; otherwise it is relative to the clock's current reading.
/// `thread_cputime_id`/`process_cputime_id` timeouts are treated as
/// wall-clock sleeps per §4.8, since the host does not multiplex compute.
pub fn to_absolute_deadline_ns(clocks: &dyn ClockSource, clock: &SubscriptionClock) -> Result<u64> {
    if clock.flags.contains(Subclockflags::SUBSCRIPTION_CLOCK_ABSTIME) {
        return Ok(clock.timeout);
    }
    let now = time_get(clocks, clock.id)?;
    Ok(now.saturating_add(clock.timeout))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct FakeClock {
        realtime: Cell<Timestamp>,
        monotonic: Cell<Timestamp>,
    }

    impl ClockSource for FakeClock {
        fn realtime_ns(&self) -> Timestamp {
            self.realtime.get()
        }
        fn monotonic_ns(&self) -> Timestamp {
            self.monotonic.get()
        }
    }

    #[test]
    fn resolution_is_one_nanosecond_for_every_supported_clock() {
        for id in [
            CLOCKID_REALTIME,
            CLOCKID_MONOTONIC,
            CLOCKID_PROCESS_CPUTIME_ID,
            CLOCKID_THREAD_CPUTIME_ID,
        ] {
            assert_eq!(res_get(id).unwrap(), 1);
        }
    }

    #[test]
    fn unknown_clock_is_rejected() {
        assert!(matches!(res_get(99), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn relative_timeout_adds_to_current_reading() {
        let clock = FakeClock {
            realtime: Cell::new(1_000),
            monotonic: Cell::new(500),
        };
        let sub = SubscriptionClock {
            id: CLOCKID_MONOTONIC,
            timeout: 250,
            precision: 0,
            flags: Subclockflags::empty(),
        };
        assert_eq!(to_absolute_deadline_ns(&clock, &sub).unwrap(), 750);
    }

    #[test]
    fn absolute_timeout_passes_through_unchanged() {
        let clock = FakeClock {
            realtime: Cell::new(1_000),
            monotonic: Cell::new(500),
        };
        let sub = SubscriptionClock {
            id: CLOCKID_REALTIME,
            timeout: 9_999,
            flags: Subclockflags::SUBSCRIPTION_CLOCK_ABSTIME,
            precision: 0,
        };
        assert_eq!(to_absolute_deadline_ns(&clock, &sub).unwrap(), 9_999);
    }
}
