//! External collaborators (§6): the contracts this crate consumes but never
//! implements itself. A real embedder (the VS Code extension host) supplies
//! concrete types for all of these; the test suite uses the in-memory/
//! fixture stand-ins colocated with each trait's consumer.

use crate::clock::ClockSource;
use crate::drivers::console::{TtySink, TtySource};
use crate::drivers::workspace::FileSystem;
use crate::poll::Timer;
use crate::types::Exitcode;

/// The Wasm instance whose linear memory this host marshals against (§6.1).
/// `memory_mut` must be re-derived at every dispatcher entry, never cached,
/// because `memory_grow` may relocate the backing buffer between calls
/// (§5 "Shared-resource policy").
pub trait WasmInstance {
    fn memory(&self) -> &[u8];
    fn memory_mut(&mut self) -> &mut [u8];
    fn memory_grow(&mut self, delta_pages: u32) -> u32;
}

/// `proc_exit`'s sink (§6.4): invoked with the guest's exit code and never
/// expected to return control to the dispatcher.
pub trait ProcessExit {
    fn exit(&self, code: Exitcode) -> !;
}

/// Everything besides the Wasm instance and linear memory that a `WasiCtx`
/// needs from its embedder: clocks, a timer, process exit, and the default
/// console sink/source backing fds 0/1/2 when the caller doesn't override
/// them (§6.2-6.6).
pub struct HostServices {
    pub clocks: std::rc::Rc<dyn ClockSource>,
    pub timer: std::rc::Rc<dyn Timer>,
    pub process_exit: std::rc::Rc<dyn ProcessExit>,
    pub stdout_sink: std::rc::Rc<dyn TtySink>,
    pub stderr_sink: std::rc::Rc<dyn TtySink>,
    pub stdin_source: std::rc::Rc<dyn TtySource>,
    pub workspace_fs: Option<std::rc::Rc<dyn FileSystem>>,
}

impl std::fmt::Debug for HostServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostServices")
            .field("workspace_fs", &self.workspace_fs.is_some())
            .finish_non_exhaustive()
    }
}
