//! `wasi:clocks/wall-clock` and `wasi:clocks/monotonic-clock` (§4.10): thin
//! wrappers over the same [`crate::clock::ClockSource`] collaborator C8
//! already uses, returning the same readings `clock_time_get` would. No
//! independent state or behavior of their own.

use crate::clock::ClockSource;
use crate::types::Timestamp;

/// `wasi:clocks/wall-clock.now`: wall-clock nanoseconds since the Unix epoch.
pub fn wall_clock_now(clocks: &dyn ClockSource) -> Timestamp {
    clocks.realtime_ns()
}

/// `wasi:clocks/wall-clock.resolution`: matches C8's 1ns resolution.
pub fn wall_clock_resolution() -> Timestamp {
    crate::clock::RESOLUTION_NS
}

/// `wasi:clocks/monotonic-clock.now`.
pub fn monotonic_clock_now(clocks: &dyn ClockSource) -> Timestamp {
    clocks.monotonic_ns()
}

/// `wasi:clocks/monotonic-clock.resolution`.
pub fn monotonic_clock_resolution() -> Timestamp {
    crate::clock::RESOLUTION_NS
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
    fn wrappers_pass_through_the_same_clock_source() {
        let clock = FakeClock { realtime: Cell::new(123), monotonic: Cell::new(456) };
        assert_eq!(wall_clock_now(&clock), 123);
        assert_eq!(monotonic_clock_now(&clock), 456);
        assert_eq!(wall_clock_resolution(), 1);
        assert_eq!(monotonic_clock_resolution(), 1);
    }
}
