//! Property-based coverage for the universal invariants a WASI host must
//! hold regardless of which specific path, fd, or byte content a guest
//! happens to pick.

use proptest::collection::{hash_set, vec};
use proptest::prelude::*;
use std::cell::Cell;
use std::io::{IoSlice, IoSliceMut};
use wasi_vfs_host::argv::PackedStrings;
use wasi_vfs_host::clock::{self, ClockSource};
use wasi_vfs_host::ctx::{DeviceDescription, HostConfig, WasiCtxBuilder};
use wasi_vfs_host::drivers::memfs::MemDir;
use wasi_vfs_host::errno::Errno;
use wasi_vfs_host::handle::Handle;
use wasi_vfs_host::host::ProcessExit;
use wasi_vfs_host::memory::{self, VecMemory};
use wasi_vfs_host::poll::Timer;
use wasi_vfs_host::rights::HandleRights;
use wasi_vfs_host::types::*;
use wasi_vfs_host::Dispatcher;

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

struct NoopTimer;
impl Timer for NoopTimer {
    fn sleep_ns(&self, _ns: u64) {}
}

struct UnusedProcessExit;
impl ProcessExit for UnusedProcessExit {
    fn exit(&self, code: Exitcode) -> ! {
        panic!("proc_exit unexpectedly invoked with code {code}");
    }
}

/// Valid guest path/arg component: non-empty, no NUL, no '/'.
fn path_component() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_.-]{1,12}".prop_filter("not dot entries", |s| s != "." && s != "..")
}

proptest! {
    #[test]
    fn argv_round_trip_preserves_every_string(args in vec(path_component(), 0..8)) {
        let packed = PackedStrings::pack(&args);
        prop_assert_eq!(packed.count(), args.len() as u32);
        let mut rebuilt = Vec::new();
        for (i, offset) in packed.offsets.iter().enumerate() {
            let start = *offset as usize;
            let end = packed.blob[start..].iter().position(|&b| b == 0).unwrap() + start;
            rebuilt.push(String::from_utf8(packed.blob[start..end].to_vec()).unwrap());
            prop_assert_eq!(&rebuilt[i], &args[i]);
        }
    }

    #[test]
    fn env_round_trip_preserves_every_pair(
        pairs in vec((path_component(), path_component()), 0..8)
    ) {
        let entries: Vec<String> = pairs.iter().map(|(k, v)| format!("{k}={v}")).collect();
        let packed = PackedStrings::pack(&entries);
        prop_assert_eq!(packed.count(), entries.len() as u32);
        for (i, offset) in packed.offsets.iter().enumerate() {
            let start = *offset as usize;
            let end = packed.blob[start..].iter().position(|&b| b == 0).unwrap() + start;
            let s = String::from_utf8(packed.blob[start..end].to_vec()).unwrap();
            prop_assert_eq!(s, entries[i].clone());
        }
    }

    #[test]
    fn clock_resolution_is_always_one_nanosecond(id in prop_oneof![
        Just(CLOCKID_REALTIME), Just(CLOCKID_MONOTONIC),
        Just(CLOCKID_PROCESS_CPUTIME_ID), Just(CLOCKID_THREAD_CPUTIME_ID),
    ]) {
        prop_assert_eq!(clock::res_get(id).unwrap(), 1);
    }

    #[test]
    fn realtime_reading_always_matches_the_host_clock_source(reading in any::<u64>()) {
        let clock = FakeClock { realtime: Cell::new(reading), monotonic: Cell::new(0) };
        prop_assert_eq!(clock::time_get(&clock, CLOCKID_REALTIME).unwrap(), reading);
    }

    #[test]
    fn write_then_read_returns_exactly_the_written_bytes(bytes in vec(any::<u8>(), 0..256)) {
        let file = MemDir::new(true)
            .openat("scratch.bin", Oflags::CREAT, Fdflags::empty())
            .unwrap();
        let written = file.write(&[IoSlice::new(&bytes)]).unwrap();
        prop_assert_eq!(written, bytes.len());
        file.seek(std::io::SeekFrom::Start(0)).unwrap();
        let mut buf = vec![0u8; bytes.len()];
        let read = file.read(&mut [IoSliceMut::new(&mut buf)]).unwrap();
        prop_assert_eq!(read, bytes.len());
        prop_assert_eq!(buf, bytes);
    }

    #[test]
    fn directory_iteration_covers_every_entry_exactly_once(names in hash_set(path_component(), 0..20)) {
        let dir = MemDir::new(true);
        for name in &names {
            dir.openat(name, Oflags::CREAT, Fdflags::empty()).unwrap();
        }
        let mut seen: Vec<String> = Vec::new();
        let mut cookie = DIRCOOKIE_START;
        loop {
            let mut iter = dir.readdir(cookie).unwrap();
            match iter.next() {
                None => break,
                Some(item) => {
                    let (dirent, name) = item.unwrap();
                    cookie = dirent.d_next;
                    seen.push(name);
                }
            }
        }
        seen.retain(|n| n != "." && n != "..");
        let seen_set: std::collections::HashSet<String> = seen.iter().cloned().collect();
        prop_assert_eq!(seen.len(), seen_set.len(), "an entry was yielded more than once");
        prop_assert_eq!(seen_set, names);
    }

    #[test]
    fn rights_narrowing_never_exceeds_parent_inheriting(
        parent_base in any::<u64>(), parent_inheriting in any::<u64>(),
        requested_base in any::<u64>(), requested_inheriting in any::<u64>(),
    ) {
        let parent = HandleRights::new(
            Rights::from_bits_truncate(parent_base),
            Rights::from_bits_truncate(parent_inheriting),
        );
        let requested_base = Rights::from_bits_truncate(requested_base);
        let requested_inheriting = Rights::from_bits_truncate(requested_inheriting);
        let child = parent.narrow_for_child(requested_base, requested_inheriting);
        prop_assert!(parent.inheriting().contains(child.base()));
        prop_assert!(parent.inheriting().contains(child.inheriting()));
    }
}

#[test]
fn fd_fdstat_set_rights_rejects_any_bit_outside_current_rights() {
    let mut config = HostConfig::new("testApp");
    config.mounts.push(("/".to_owned(), DeviceDescription::InMemory { root: MemDir::new(true) }));
    let ctx = WasiCtxBuilder::new(config).unwrap().build().unwrap();
    let clocks = FakeClock { realtime: Cell::new(0), monotonic: Cell::new(0) };
    let timer = NoopTimer;
    let process_exit = UnusedProcessExit;
    let d = Dispatcher::new(&ctx, &clocks, &timer, &process_exit);
    let mut mem = VecMemory::new(4096);

    let path_ptr = 0;
    memory::write_string(&mut mem, path_ptr, "f.txt").unwrap();
    let out_fd_ptr = 100;
    let errno = d.path_open(
        &mut mem,
        3,
        0,
        path_ptr,
        "f.txt".len() as u32,
        Oflags::CREAT.bits(),
        Rights::FD_READ.bits(),
        0,
        0,
        out_fd_ptr,
    );
    assert_eq!(errno, Errno::Success);
    let fd = memory::read_u32(&mem, out_fd_ptr).unwrap();

    let errno = d.fd_fdstat_set_rights(fd, Rights::FD_READ.bits(), 0);
    assert_eq!(errno, Errno::Success);

    let errno = d.fd_fdstat_set_rights(fd, (Rights::FD_READ | Rights::FD_WRITE).bits(), 0);
    assert_eq!(errno, Errno::Notcapable);
}
