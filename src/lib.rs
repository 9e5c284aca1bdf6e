//! A WASI `wasi_snapshot_preview1` host that routes guest ABI calls through
//! a capability-scoped virtual filesystem with pluggable device backends
//! (console/tty, workspace filesystem, in-memory). See each module for its
//! piece of the design; [`dispatcher::Dispatcher`] is the entry point an
//! embedder drives once per guest import call.

pub mod argv;
pub mod clock;
pub mod ctx;
pub mod dirent;
pub mod dispatcher;
pub mod drivers;
pub mod errno;
pub mod fdtable;
pub mod handle;
pub mod host;
pub mod memory;
pub mod p2;
pub mod poll;
pub mod rights;
pub mod types;
pub mod vfs;

pub use ctx::{HostConfig, WasiCtx, WasiCtxBuilder};
pub use dispatcher::Dispatcher;
pub use errno::{Error, Errno, Result};
