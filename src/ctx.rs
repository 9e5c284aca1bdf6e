//! WasiCtx / WasiCtxBuilder (ambient, §4.9a, grounded on the teacher's
//! `ctx.rs`). The builder accumulates pending stdio, preopened mounts,
//! argv, and env; `build()` validates everything (UTF-8/NUL-freedom,
//! preopen directory-ness) and freezes the result into an immutable
//! `WasiCtx` — the same validate-then-freeze shape as `WasiCtxBuilder::build`
//! in the teacher, generalized from "real OS files" to "any Handle a
//! device driver yields".

use crate::argv::PackedStrings;
use crate::drivers::console::ConsoleHandle;
use crate::drivers::memfs::MemDir;
use crate::drivers::workspace::{FileSystem, WorkspaceHandle};
use crate::errno::{Error, Result};
use crate::fdtable::{DescriptorEntry, FdTable};
use crate::handle::Handle;
use crate::host::HostServices;
use crate::rights::{HandleRights, RightsExt};
use crate::types::{Fdflags, Rights};
use std::cell::RefCell;
use std::rc::Rc;

/// One device entry of a `HostConfig` (§3 Data Model): either the console
/// (backing stdio) or a workspace filesystem root, optionally mounted at a
/// guest path so `fd_prestat_get`/`path_open` can see it as a preopen.
pub enum DeviceDescription {
    Console,
    FileSystem { fs: Rc<dyn FileSystem>, uri: String },
    InMemory { root: MemDir },
}

impl std::fmt::Debug for DeviceDescription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Console => write!(f, "DeviceDescription::Console"),
            Self::FileSystem { uri, .. } => {
                write!(f, "DeviceDescription::FileSystem({uri:?})")
            }
            Self::InMemory { .. } => write!(f, "DeviceDescription::InMemory"),
        }
    }
}

/// Program name, device descriptions, stdio mapping, args, and environment
/// — everything `WasiCtxBuilder::build()` consumes once at construction
/// time (§3 "HostConfig").
#[derive(Debug)]
pub struct HostConfig {
    pub program_name: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub mounts: Vec<(String, DeviceDescription)>,
}

impl HostConfig {
    pub fn new(program_name: impl Into<String>) -> Self {
        Self {
            program_name: program_name.into(),
            args: Vec::new(),
            env: Vec::new(),
            mounts: Vec::new(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WasiCtxBuilderError {
    #[error("argument or environment entry contained an unexpected NUL byte")]
    UnexpectedNul,
    #[error("preopened mount path {0:?} does not resolve to a directory")]
    NotADirectory(String),
    #[error("too many open files while populating the descriptor table")]
    TooManyFilesOpen,
}

impl From<WasiCtxBuilderError> for Error {
    fn from(e: WasiCtxBuilderError) -> Self {
        match e {
            WasiCtxBuilderError::UnexpectedNul => Error::UnexpectedNul,
            WasiCtxBuilderError::NotADirectory(_) => Error::NotADirectory,
            WasiCtxBuilderError::TooManyFilesOpen => Error::TooManyFiles,
        }
    }
}

type BuildResult<T> = std::result::Result<T, WasiCtxBuilderError>;

pub struct WasiCtxBuilder {
    program_name: String,
    args: Vec<String>,
    env: Vec<(String, String)>,
    stdin: Option<Box<dyn Handle>>,
    stdout: Option<Box<dyn Handle>>,
    stderr: Option<Box<dyn Handle>>,
    preopens: Vec<(String, Box<dyn Handle>)>,
}

impl WasiCtxBuilder {
    pub fn new(config: HostConfig) -> BuildResult<Self> {
        let mut builder = Self {
            program_name: config.program_name,
            args: config.args,
            env: config.env,
            stdin: None,
            stdout: None,
            stderr: None,
            preopens: Vec::new(),
        };
        for (mount_point, device) in config.mounts {
            match device {
                DeviceDescription::Console => {}
                DeviceDescription::FileSystem { fs, uri } => {
                    let root: Box<dyn Handle> = Box::new(WorkspaceHandle::new_root(fs, uri));
                    builder.preopens.push((mount_point, root));
                }
                DeviceDescription::InMemory { root } => {
                    builder.preopens.push((mount_point, Box::new(root)));
                }
            }
        }
        Ok(builder)
    }

    /// Wires stdin/stdout/stderr from the embedder's default console
    /// collaborators (§3 "stdio mapping"); callers needing something
    /// different (e.g. fd 1 backed by an in-memory buffer for capture in
    /// tests) still use `stdin`/`stdout`/`stderr` afterward to override.
    pub fn with_default_stdio(mut self, host: &HostServices) -> Self {
        self.stdin = Some(Box::new(ConsoleHandle::new(
            None,
            Some(Rc::clone(&host.stdin_source)),
        )));
        self.stdout = Some(Box::new(ConsoleHandle::new(
            Some(Rc::clone(&host.stdout_sink)),
            None,
        )));
        self.stderr = Some(Box::new(ConsoleHandle::new(
            Some(Rc::clone(&host.stderr_sink)),
            None,
        )));
        self
    }

    pub fn stdin(mut self, handle: Box<dyn Handle>) -> Self {
        self.stdin = Some(handle);
        self
    }

    pub fn stdout(mut self, handle: Box<dyn Handle>) -> Self {
        self.stdout = Some(handle);
        self
    }

    pub fn stderr(mut self, handle: Box<dyn Handle>) -> Self {
        self.stderr = Some(handle);
        self
    }

    fn check_no_nul(s: &str) -> BuildResult<()> {
        if s.as_bytes().contains(&0) {
            Err(WasiCtxBuilderError::UnexpectedNul)
        } else {
            Ok(())
        }
    }

    pub fn build(self) -> BuildResult<WasiCtx> {
        Self::check_no_nul(&self.program_name)?;
        for arg in &self.args {
            Self::check_no_nul(arg)?;
        }
        let mut env_entries = Vec::with_capacity(self.env.len());
        for (k, v) in &self.env {
            Self::check_no_nul(k)?;
            Self::check_no_nul(v)?;
            env_entries.push(format!("{k}={v}"));
        }

        let mut argv = vec![self.program_name];
        argv.extend(self.args);
        let packed_args = PackedStrings::pack(&argv);
        let packed_env = PackedStrings::pack(&env_entries);

        let mut fd_table = FdTable::new();

        let stdin = self.stdin.unwrap_or_else(|| Box::new(ConsoleHandle::new(None, None)));
        let stdout = self.stdout.unwrap_or_else(|| Box::new(ConsoleHandle::new(None, None)));
        let stderr = self.stderr.unwrap_or_else(|| Box::new(ConsoleHandle::new(None, None)));

        let tty_rights = HandleRights::new(Rights::tty_base(), Rights::tty_inheriting());
        fd_table.insert_at(0, DescriptorEntry::new(stdin, tty_rights, Fdflags::empty()));
        fd_table.insert_at(1, DescriptorEntry::new(stdout, tty_rights, Fdflags::empty()));
        fd_table.insert_at(2, DescriptorEntry::new(stderr, tty_rights, Fdflags::empty()));

        for (mount_point, handle) in self.preopens {
            if !handle.is_directory() {
                return Err(WasiCtxBuilderError::NotADirectory(mount_point));
            }
            let dir_rights = HandleRights::new(Rights::directory_base(), Rights::directory_inheriting());
            let entry = DescriptorEntry::new(handle, dir_rights, Fdflags::empty())
                .with_preopen(mount_point);
            fd_table
                .insert(entry)
                .map_err(|_| WasiCtxBuilderError::TooManyFilesOpen)?;
        }

        Ok(WasiCtx {
            fd_table: RefCell::new(fd_table),
            packed_args,
            packed_env,
        })
    }
}

/// The frozen, immutable result of a successful build (§4.9a). Holds the
/// fd table, the flattened argv/env byte buffers, and nothing else —
/// persistence beyond this lives entirely in driver backends (§6
/// "Persisted state: None at the core level").
#[derive(Debug)]
pub struct WasiCtx {
    pub(crate) fd_table: RefCell<FdTable>,
    pub(crate) packed_args: PackedStrings,
    pub(crate) packed_env: PackedStrings,
}

impl WasiCtx {
    pub fn fd_table(&self) -> std::cell::Ref<FdTable> {
        self.fd_table.borrow()
    }

    pub fn fd_table_mut(&self) -> std::cell::RefMut<FdTable> {
        self.fd_table.borrow_mut()
    }

    pub fn args(&self) -> &PackedStrings {
        &self.packed_args
    }

    pub fn env(&self) -> &PackedStrings {
        &self.packed_env
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_populates_stdio_and_packs_argv() {
        let mut config = HostConfig::new("testApp");
        config.args = vec!["arg1".into(), "arg22".into(), "arg333".into()];
        let ctx = WasiCtxBuilder::new(config).unwrap().build().unwrap();
        assert_eq!(ctx.args().count(), 4);
        assert_eq!(ctx.args().buf_size(), 8 + 5 + 6 + 7);
        assert!(ctx.fd_table().get(0).is_ok());
        assert!(ctx.fd_table().get(1).is_ok());
        assert!(ctx.fd_table().get(2).is_ok());
    }

    #[test]
    fn preopen_gets_first_free_fd_and_preopen_prefix() {
        let mut config = HostConfig::new("testApp");
        config.mounts.push((
            "/".to_owned(),
            DeviceDescription::InMemory { root: MemDir::new(true) },
        ));
        let ctx = WasiCtxBuilder::new(config).unwrap().build().unwrap();
        let table = ctx.fd_table();
        let (fd, prefix) = table.iter_preopens().next().unwrap();
        assert_eq!(fd, 3);
        assert_eq!(prefix, "/");
    }

    #[test]
    fn nul_byte_in_arg_is_rejected() {
        let mut config = HostConfig::new("testApp");
        config.args = vec!["bad\0arg".into()];
        let err = WasiCtxBuilder::new(config).unwrap().build();
        assert!(matches!(err, Err(WasiCtxBuilderError::UnexpectedNul)));
    }
}
