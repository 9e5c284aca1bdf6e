//! Poll/Timer Engine (C8, §4.8). Grounded on the teacher's `poll.rs`
//! (`ClockEventData`/`FdEventData` split) and `sys/unix/poll.rs`
//! (`handle_timeout_event`/`handle_fd_event` shape), replaced underneath:
//! the teacher polls real OS file descriptors via `yanix`; every driver
//! here is synchronous and backed by host collaborators rather than OS
//! fds, so readiness is queried directly through [`Handle::poll_readable`]
//! / [`Handle::poll_writable`] and a blocking deadline is delegated to the
//! host's `Timer` collaborator (§6.3) instead of a real `poll(2)` call.

use crate::errno::Errno;
use crate::handle::Handle;
use crate::types::{Event, EventFdReadwrite, Eventrwflags, Eventtype, Filesize, Userdata};

/// Host-provided synchronous sleep primitive (§6.3).
pub trait Timer {
    fn sleep_ns(&self, ns: u64);
}

#[derive(Debug, Copy, Clone)]
pub struct ClockEventData {
    pub delay_ns: u64,
    pub userdata: Userdata,
}

#[derive(Debug)]
pub struct FdEventData<'a> {
    pub handle: &'a dyn Handle,
    pub eventtype: Eventtype,
    pub userdata: Userdata,
}

fn is_ready(handle: &dyn Handle, eventtype: Eventtype) -> bool {
    match eventtype {
        Eventtype::FdRead => handle.poll_readable(),
        Eventtype::FdWrite => handle.poll_writable(),
        Eventtype::Clock => false,
    }
}

fn readable_bytes(handle: &dyn Handle) -> Filesize {
    handle.filestat().map(|st| st.size).unwrap_or(0)
}

/// Evaluates one `poll_oneoff` call (§4.8): every fd subscription that is
/// immediately ready fires; if none are, and a clock subscription is
/// present, the host sleeps until its deadline and that subscription fires
/// alone. `nevents` is monotonically <= the number of subscriptions, and a
/// subscription fires at most once (no cancellation primitive exists).
pub fn oneoff(
    timeout: Option<ClockEventData>,
    fd_events: Vec<FdEventData>,
    timer: &dyn Timer,
) -> Vec<Event> {
    let ready: Vec<&FdEventData> = fd_events
        .iter()
        .filter(|e| is_ready(e.handle, e.eventtype))
        .collect();

    if ready.is_empty() {
        if let Some(timeout) = timeout {
            timer.sleep_ns(timeout.delay_ns);
            return vec![Event {
                userdata: timeout.userdata,
                error: Errno::Success,
                type_: Eventtype::Clock,
                fd_readwrite: EventFdReadwrite {
                    nbytes: 0,
                    flags: Eventrwflags::empty(),
                },
            }];
        }
        return Vec::new();
    }

    ready
        .into_iter()
        .map(|fd_event| {
            let nbytes = if fd_event.eventtype == Eventtype::FdRead {
                readable_bytes(fd_event.handle)
            } else {
                0
            };
            Event {
                userdata: fd_event.userdata,
                error: Errno::Success,
                type_: fd_event.eventtype,
                fd_readwrite: EventFdReadwrite {
                    nbytes,
                    flags: Eventrwflags::empty(),
                },
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::memfs::MemDir;
    use std::cell::Cell;

    struct NoopTimer {
        slept_ns: Cell<u64>,
    }

    impl Timer for NoopTimer {
        fn sleep_ns(&self, ns: u64) {
            self.slept_ns.set(ns);
        }
    }

    #[test]
    fn regular_file_is_always_ready() {
        let dir = MemDir::new(true);
        let timer = NoopTimer { slept_ns: Cell::new(0) };
        let events = oneoff(
            None,
            vec![FdEventData {
                handle: &dir,
                eventtype: Eventtype::FdWrite,
                userdata: 42,
            }],
            &timer,
        );
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].userdata, 42);
        assert_eq!(events[0].error, Errno::Success);
    }

    #[test]
    fn no_ready_fds_sleeps_and_fires_clock() {
        let timer = NoopTimer { slept_ns: Cell::new(0) };
        let events = oneoff(
            Some(ClockEventData { delay_ns: 5_000, userdata: 7 }),
            Vec::new(),
            &timer,
        );
        assert_eq!(timer.slept_ns.get(), 5_000);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].type_, Eventtype::Clock);
        assert_eq!(events[0].userdata, 7);
    }

    #[test]
    fn no_subscriptions_and_no_timeout_yields_nothing() {
        let timer = NoopTimer { slept_ns: Cell::new(0) };
        let events = oneoff(None, Vec::new(), &timer);
        assert!(events.is_empty());
    }
}
