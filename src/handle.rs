//! Device Driver Interface (C3, §4.3): the polymorphic contract every
//! concrete driver (§4.9, `drivers/`) implements, and the `FileHandle`
//! abstraction (here, `Box<dyn Handle>`) it yields. Methods that do not
//! apply to a given handle fail with a sensible default (`nosys`/`badf`),
//! mirroring the teacher's `Handle` trait in `handle.rs`.

use crate::errno::{Error, Result};
use crate::rights::HandleRights;
use crate::types::{Advice, Dircookie, Dirent, Fdflags, Filesize, Filestat, Filetype, Fstflags, Oflags, Timestamp};
use std::any::Any;
use std::io::{self, SeekFrom};

/// Generic interface for all WASI-compatible handles. Concrete drivers group
/// into three families (§4.9): console/tty, workspace-filesystem, and
/// in-memory. A closed, tagged `Device` enum (§9 design note) picks which
/// driver owns a given handle; handles themselves stay trait objects so the
/// descriptor table (C5) doesn't need to know the concrete driver type.
pub trait Handle: std::fmt::Debug {
    fn as_any(&self) -> &dyn Any;

    fn try_clone(&self) -> io::Result<Box<dyn Handle>>;

    fn file_type(&self) -> Filetype;

    /// Conservative approximation of POSIX `isatty`: WASI itself has no
    /// such syscall, so the host infers it from filetype plus the absence
    /// of seek rights.
    fn is_tty(&self, rights: HandleRights) -> bool {
        self.file_type() == Filetype::CharacterDevice
            && !rights
                .base()
                .intersects(crate::types::Rights::FD_SEEK | crate::types::Rights::FD_TELL)
    }

    fn is_directory(&self) -> bool {
        self.file_type() == Filetype::Directory
    }

    // -- fd ops --

    fn advise(&self, _advice: Advice, _offset: Filesize, _len: Filesize) -> Result<()> {
        Ok(())
    }

    fn allocate(&self, _offset: Filesize, _len: Filesize) -> Result<()> {
        Err(Error::NotSupported)
    }

    fn datasync(&self) -> Result<()> {
        Ok(())
    }

    fn sync(&self) -> Result<()> {
        Ok(())
    }

    fn fdstat_flags(&self) -> Result<Fdflags> {
        Ok(Fdflags::empty())
    }

    fn set_fdstat_flags(&self, _flags: Fdflags) -> Result<()> {
        Err(Error::NotSupported)
    }

    fn filestat(&self) -> Result<Filestat>;

    fn set_filestat_size(&self, _size: Filesize) -> Result<()> {
        Err(Error::NotSupported)
    }

    fn set_filestat_times(
        &self,
        _atim: Timestamp,
        _mtim: Timestamp,
        _fst_flags: Fstflags,
    ) -> Result<()> {
        Err(Error::NotSupported)
    }

    /// Reads at the handle's own cursor, advancing it. Non-seekable handles
    /// (tty) ignore the cursor notion entirely.
    fn read(&self, _bufs: &mut [io::IoSliceMut]) -> Result<usize> {
        Err(Error::BadFileDescriptor)
    }

    /// Reads at `offset` without touching the handle's cursor (`fd_pread`).
    fn pread(&self, _bufs: &mut [io::IoSliceMut], _offset: Filesize) -> Result<usize> {
        Err(Error::BadFileDescriptor)
    }

    fn write(&self, _bufs: &[io::IoSlice]) -> Result<usize> {
        Err(Error::BadFileDescriptor)
    }

    fn pwrite(&self, _bufs: &[io::IoSlice], _offset: Filesize) -> Result<usize> {
        Err(Error::BadFileDescriptor)
    }

    fn seek(&self, _pos: SeekFrom) -> Result<Filesize> {
        Err(Error::InvalidSeek)
    }

    fn tell(&self) -> Result<Filesize> {
        self.seek(SeekFrom::Current(0))
    }

    fn readdir<'a>(
        &'a self,
        _cookie: Dircookie,
    ) -> Result<Box<dyn Iterator<Item = Result<(Dirent, String)>> + 'a>> {
        Err(Error::NotADirectory)
    }

    /// `poll_oneoff` readiness for a read subscription (§4.8): true unless a
    /// driver has a reason to say otherwise. Regular files, directories, and
    /// in-memory handles are always ready; the console driver overrides this
    /// to reflect whether its byte-source currently has data.
    fn poll_readable(&self) -> bool {
        true
    }

    /// `poll_oneoff` readiness for a write subscription (§4.8): stdout/
    /// stderr and regular files are always writable.
    fn poll_writable(&self) -> bool {
        true
    }

    // -- path ops, resolved relative to this handle as an anchor --

    fn create_directory(&self, _path: &str) -> Result<()> {
        Err(Error::NotADirectory)
    }

    fn openat(
        &self,
        _path: &str,
        _oflags: Oflags,
        _fd_flags: Fdflags,
    ) -> Result<Box<dyn Handle>> {
        Err(Error::NotADirectory)
    }

    fn filestat_at(&self, _path: &str, _follow: bool) -> Result<Filestat> {
        Err(Error::NotADirectory)
    }

    fn set_filestat_times_at(
        &self,
        _path: &str,
        _atim: Timestamp,
        _mtim: Timestamp,
        _fst_flags: Fstflags,
        _follow: bool,
    ) -> Result<()> {
        Err(Error::NotSupported)
    }

    fn rename(&self, _old_path: &str, _new_parent: &dyn Handle, _new_path: &str) -> Result<()> {
        Err(Error::NotADirectory)
    }

    fn unlink_file(&self, _path: &str) -> Result<()> {
        Err(Error::NotADirectory)
    }

    fn remove_directory(&self, _path: &str) -> Result<()> {
        Err(Error::NotADirectory)
    }

    fn symlink(&self, _old_path: &str, _new_path: &str) -> Result<()> {
        Err(Error::NotSupported)
    }

    fn readlink(&self, _path: &str) -> Result<String> {
        Err(Error::NoLink)
    }
}

impl dyn Handle {
    pub fn downcast_ref<T: Handle + 'static>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}
