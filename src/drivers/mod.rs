//! Concrete Device Drivers (C9, §4.9): console/tty, workspace-filesystem,
//! and in-memory. Each is a family of [`crate::handle::Handle`]
//! implementations rather than a separate "driver object" — the tagged,
//! closed set itself *is* the polymorphic dispatch point (§9 design note:
//! "a tagged variant is preferable to open-ended trait objects"). A device
//! id is attached to each family for `filestat.dev` (§4.3 `id()`).

pub mod console;
pub mod memfs;
pub mod workspace;

/// Stable per-family device id surfaced as `filestat.dev` (§4.3).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u64)]
pub enum DeviceId {
    Console = 1,
    Workspace = 2,
    InMemory = 3,
}
