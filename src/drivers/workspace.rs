//! Workspace-filesystem device (§4.9b): wraps the host's synchronous,
//! URI-addressed `FileSystem` collaborator (§6.7). Reads fetch the whole
//! file and slice on offset; writes read-modify-write the region starting
//! at offset, then overwrite whole — the backend offers no partial I/O.
//! Grounded on the teacher's host-fs `Handle` (`sys/fd.rs`), adapted from a
//! raw OS fd onto an opaque host URI.

use crate::drivers::DeviceId;
use crate::errno::{Error, Result};
use crate::handle::Handle;
use crate::types::{Dircookie, Dirent, Fdflags, Filesize, Filestat, Filetype, Oflags};
use std::any::Any;
use std::cell::Cell;
use std::convert::TryInto;
use std::io::{IoSlice, IoSliceMut, SeekFrom};
use std::rc::Rc;

/// What the host reports back for a path (§6.7 `stat` result shape).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostFileKind {
    File,
    Directory,
    SymbolicLink,
    Unknown,
}

#[derive(Debug, Clone)]
pub struct HostStat {
    pub kind: HostFileKind,
    pub size: Filesize,
    pub ctime: u64,
    pub mtime: u64,
}

/// The external collaborator contract itself (§6.7): a synchronous,
/// URI-addressed filesystem. Implementations block the host thread, which
/// is acceptable because the dispatcher is single-threaded (§5, §9).
pub trait FileSystem: std::fmt::Debug {
    fn stat(&self, uri: &str) -> Result<HostStat>;
    fn read_file(&self, uri: &str) -> Result<Vec<u8>>;
    fn write_file(&self, uri: &str, contents: &[u8]) -> Result<()>;
    fn read_directory(&self, uri: &str) -> Result<Vec<(String, HostFileKind)>>;
    fn create_directory(&self, uri: &str) -> Result<()>;
    fn delete(&self, uri: &str, recursive: bool) -> Result<()>;
    fn rename(&self, from_uri: &str, to_uri: &str, overwrite: bool) -> Result<()>;
}

fn join_uri(base: &str, child: &str) -> String {
    if base.ends_with('/') {
        format!("{base}{child}")
    } else {
        format!("{base}/{child}")
    }
}

/// A single open workspace file or directory, addressed by URI against a
/// shared `FileSystem` collaborator.
#[derive(Debug, Clone)]
pub struct WorkspaceHandle {
    fs: Rc<dyn FileSystem>,
    uri: String,
    is_dir: bool,
    cursor: Cell<Filesize>,
    fd_flags: Cell<Fdflags>,
}

impl WorkspaceHandle {
    pub fn new_root(fs: Rc<dyn FileSystem>, uri: String) -> Self {
        Self {
            fs,
            uri,
            is_dir: true,
            cursor: Cell::new(0),
            fd_flags: Cell::new(Fdflags::empty()),
        }
    }

    fn child(&self, path: &str, is_dir: bool, fd_flags: Fdflags) -> Self {
        Self {
            fs: Rc::clone(&self.fs),
            uri: join_uri(&self.uri, path),
            is_dir,
            cursor: Cell::new(0),
            fd_flags: Cell::new(fd_flags),
        }
    }

    fn read_whole(&self) -> Result<Vec<u8>> {
        self.fs.read_file(&self.uri)
    }
}

impl Handle for WorkspaceHandle {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn try_clone(&self) -> std::io::Result<Box<dyn Handle>> {
        Ok(Box::new(self.clone()))
    }

    fn file_type(&self) -> Filetype {
        if self.is_dir {
            Filetype::Directory
        } else {
            Filetype::RegularFile
        }
    }

    fn filestat(&self) -> Result<Filestat> {
        let stat = self.fs.stat(&self.uri)?;
        Ok(Filestat {
            dev: DeviceId::Workspace as u64,
            ino: 0,
            filetype: match stat.kind {
                HostFileKind::File => Filetype::RegularFile,
                HostFileKind::Directory => Filetype::Directory,
                HostFileKind::SymbolicLink => Filetype::SymbolicLink,
                HostFileKind::Unknown => Filetype::Unknown,
            },
            nlink: 1,
            size: stat.size,
            atim: stat.mtime,
            mtim: stat.mtime,
            ctim: stat.ctime,
        })
    }

    fn set_filestat_size(&self, size: Filesize) -> Result<()> {
        let mut contents = self.read_whole()?;
        let size: usize = size.try_into().map_err(|_| Error::Overflow)?;
        contents.resize(size, 0);
        self.fs.write_file(&self.uri, &contents)
    }

    fn fdstat_flags(&self) -> Result<Fdflags> {
        Ok(self.fd_flags.get())
    }

    fn set_fdstat_flags(&self, flags: Fdflags) -> Result<()> {
        self.fd_flags.set(flags);
        Ok(())
    }

    fn read(&self, bufs: &mut [IoSliceMut]) -> Result<usize> {
        let contents = self.read_whole()?;
        let mut offset = self.cursor.get() as usize;
        let mut total = 0usize;
        for buf in bufs.iter_mut() {
            let available = contents.len().saturating_sub(offset);
            let n = buf.len().min(available);
            buf[..n].copy_from_slice(&contents[offset..offset + n]);
            offset += n;
            total += n;
        }
        self.cursor.set(offset as Filesize);
        Ok(total)
    }

    fn pread(&self, bufs: &mut [IoSliceMut], offset: Filesize) -> Result<usize> {
        let contents = self.read_whole()?;
        let mut offset: usize = offset.try_into().map_err(|_| Error::InvalidArgument("offset"))?;
        let mut total = 0usize;
        for buf in bufs.iter_mut() {
            let available = contents.len().saturating_sub(offset);
            let n = buf.len().min(available);
            buf[..n].copy_from_slice(&contents[offset..offset + n]);
            offset += n;
            total += n;
        }
        Ok(total)
    }

    /// Writes at the cursor and advances it. Append mode (§9) is the
    /// dispatcher's job: it seeks to end-of-file before calling this when the
    /// owning fd carries `fdflags.append`, so this method never inspects
    /// that flag itself.
    fn write(&self, bufs: &[IoSlice]) -> Result<usize> {
        let mut contents = self.read_whole()?;
        let mut offset = self.cursor.get() as usize;
        let mut total = 0usize;
        for buf in bufs.iter() {
            let end = offset + buf.len();
            if end > contents.len() {
                contents.resize(end, 0);
            }
            contents[offset..end].copy_from_slice(buf);
            offset = end;
            total += buf.len();
        }
        self.fs.write_file(&self.uri, &contents)?;
        self.cursor.set(offset as Filesize);
        Ok(total)
    }

    fn pwrite(&self, bufs: &[IoSlice], offset: Filesize) -> Result<usize> {
        let mut contents = self.read_whole()?;
        let mut offset: usize = offset.try_into().map_err(|_| Error::InvalidArgument("offset"))?;
        let mut total = 0usize;
        for buf in bufs.iter() {
            let end = offset + buf.len();
            if end > contents.len() {
                contents.resize(end, 0);
            }
            contents[offset..end].copy_from_slice(buf);
            offset = end;
            total += buf.len();
        }
        self.fs.write_file(&self.uri, &contents)?;
        Ok(total)
    }

    fn seek(&self, pos: SeekFrom) -> Result<Filesize> {
        let len = self.read_whole()?.len() as Filesize;
        let new_cursor = match pos {
            SeekFrom::Start(off) => off.min(len),
            SeekFrom::End(delta) => {
                if delta >= 0 {
                    len.saturating_add(delta as u64)
                } else {
                    len.checked_sub(delta.unsigned_abs()).ok_or(Error::InvalidArgument("seek"))?
                }
            }
            SeekFrom::Current(delta) => {
                let cur = self.cursor.get();
                if delta >= 0 {
                    cur.checked_add(delta as u64).ok_or(Error::Overflow)?
                } else {
                    cur.checked_sub(delta.unsigned_abs()).ok_or(Error::InvalidArgument("seek"))?
                }
            }
        };
        self.cursor.set(new_cursor);
        Ok(new_cursor)
    }

    fn sync(&self) -> Result<()> {
        Ok(())
    }

    fn datasync(&self) -> Result<()> {
        Ok(())
    }

    fn create_directory(&self, path: &str) -> Result<()> {
        self.fs.create_directory(&join_uri(&self.uri, path))
    }

    fn openat(&self, path: &str, oflags: Oflags, fd_flags: Fdflags) -> Result<Box<dyn Handle>> {
        if path == "." {
            return Ok(Box::new(self.clone()));
        }
        let uri = join_uri(&self.uri, path);
        let creat_excl = Oflags::CREAT | Oflags::EXCL;
        let stat = self.fs.stat(&uri);
        match stat {
            Ok(s) => {
                if oflags.contains(creat_excl) {
                    return Err(Error::AlreadyExists);
                }
                let is_dir = matches!(s.kind, HostFileKind::Directory);
                if oflags.contains(Oflags::DIRECTORY) && !is_dir {
                    return Err(Error::NotADirectory);
                }
                if oflags.contains(Oflags::TRUNC) && !is_dir {
                    self.fs.write_file(&uri, &[])?;
                }
                Ok(Box::new(self.child(path, is_dir, fd_flags)))
            }
            Err(Error::NotFound) if oflags.contains(Oflags::CREAT) => {
                self.fs.write_file(&uri, &[])?;
                Ok(Box::new(self.child(path, false, fd_flags)))
            }
            Err(e) => Err(e),
        }
    }

    fn filestat_at(&self, path: &str, _follow: bool) -> Result<Filestat> {
        self.child(path, false, Fdflags::empty()).filestat()
    }

    fn rename(&self, old_path: &str, new_parent: &dyn Handle, new_path: &str) -> Result<()> {
        let new_dir = new_parent
            .downcast_ref::<WorkspaceHandle>()
            .ok_or(Error::NotSupported)?;
        let from = join_uri(&self.uri, old_path);
        let to = join_uri(&new_dir.uri, new_path);
        self.fs.rename(&from, &to, true)
    }

    fn unlink_file(&self, path: &str) -> Result<()> {
        let uri = join_uri(&self.uri, path);
        let stat = self.fs.stat(&uri)?;
        if matches!(stat.kind, HostFileKind::Directory) {
            return Err(Error::IsADirectory);
        }
        self.fs.delete(&uri, false)
    }

    fn remove_directory(&self, path: &str) -> Result<()> {
        let uri = join_uri(&self.uri, path);
        let stat = self.fs.stat(&uri)?;
        if !matches!(stat.kind, HostFileKind::Directory) {
            return Err(Error::NotADirectory);
        }
        let children = self.fs.read_directory(&uri)?;
        if !children.is_empty() {
            return Err(Error::NotEmpty);
        }
        self.fs.delete(&uri, false)
    }

    fn readdir<'a>(
        &'a self,
        cookie: Dircookie,
    ) -> Result<Box<dyn Iterator<Item = Result<(Dirent, String)>> + 'a>> {
        let mut names = self.fs.read_directory(&self.uri)?;
        names.sort_by(|a, b| a.0.cmp(&b.0));

        struct Iter {
            names: Vec<(String, HostFileKind)>,
            next: u64,
        }

        impl Iterator for Iter {
            type Item = Result<(Dirent, String)>;

            fn next(&mut self) -> Option<Self::Item> {
                let idx = self.next as usize;
                let (name, kind) = self.names.get(idx)?;
                self.next += 1;
                let d_type = match kind {
                    HostFileKind::Directory => Filetype::Directory,
                    HostFileKind::SymbolicLink => Filetype::SymbolicLink,
                    HostFileKind::File => Filetype::RegularFile,
                    HostFileKind::Unknown => Filetype::Unknown,
                };
                Some(Ok((
                    Dirent {
                        d_next: self.next,
                        d_ino: 0,
                        d_namlen: name.len() as u32,
                        d_type,
                    },
                    name.clone(),
                )))
            }
        }

        Ok(Box::new(Iter { names, next: cookie }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    #[derive(Debug, Default)]
    struct FakeFs {
        files: RefCell<HashMap<String, Vec<u8>>>,
        dirs: RefCell<std::collections::HashSet<String>>,
    }

    impl FakeFs {
        fn new() -> Self {
            let fs = Self::default();
            fs.dirs.borrow_mut().insert("ws:/".to_owned());
            fs
        }
    }

    impl FileSystem for FakeFs {
        fn stat(&self, uri: &str) -> Result<HostStat> {
            if self.dirs.borrow().contains(uri) {
                return Ok(HostStat {
                    kind: HostFileKind::Directory,
                    size: 0,
                    ctime: 0,
                    mtime: 0,
                });
            }
            let files = self.files.borrow();
            let contents = files.get(uri).ok_or(Error::NotFound)?;
            Ok(HostStat {
                kind: HostFileKind::File,
                size: contents.len() as Filesize,
                ctime: 0,
                mtime: 0,
            })
        }

        fn read_file(&self, uri: &str) -> Result<Vec<u8>> {
            self.files.borrow().get(uri).cloned().ok_or(Error::NotFound)
        }

        fn write_file(&self, uri: &str, contents: &[u8]) -> Result<()> {
            self.files
                .borrow_mut()
                .insert(uri.to_owned(), contents.to_vec());
            Ok(())
        }

        fn read_directory(&self, _uri: &str) -> Result<Vec<(String, HostFileKind)>> {
            Ok(Vec::new())
        }

        fn create_directory(&self, uri: &str) -> Result<()> {
            self.dirs.borrow_mut().insert(uri.to_owned());
            Ok(())
        }

        fn delete(&self, uri: &str, _recursive: bool) -> Result<()> {
            self.files.borrow_mut().remove(uri);
            self.dirs.borrow_mut().remove(uri);
            Ok(())
        }

        fn rename(&self, from_uri: &str, to_uri: &str, _overwrite: bool) -> Result<()> {
            let data = self.files.borrow_mut().remove(from_uri).ok_or(Error::NotFound)?;
            self.files.borrow_mut().insert(to_uri.to_owned(), data);
            Ok(())
        }
    }

    #[test]
    fn open_missing_without_creat_fails_noent() {
        let fs: Rc<dyn FileSystem> = Rc::new(FakeFs::new());
        let root = WorkspaceHandle::new_root(fs, "ws:/".to_owned());
        let err = root.openat("test.txt", Oflags::empty(), Fdflags::empty());
        assert!(matches!(err, Err(Error::NotFound)));
    }

    #[test]
    fn create_write_reopen_read_back() {
        let fs: Rc<dyn FileSystem> = Rc::new(FakeFs::new());
        let root = WorkspaceHandle::new_root(fs, "ws:/".to_owned());
        let f = root.openat("test.txt", Oflags::CREAT, Fdflags::empty()).unwrap();
        f.write(&[IoSlice::new(b"Hello World")]).unwrap();
        let f2 = root.openat("test.txt", Oflags::empty(), Fdflags::empty()).unwrap();
        let mut buf = vec![0u8; 1024];
        let n = f2.read(&mut [IoSliceMut::new(&mut buf)]).unwrap();
        assert_eq!(&buf[..n], b"Hello World");
    }

    #[test]
    fn excl_create_collision() {
        let fs: Rc<dyn FileSystem> = Rc::new(FakeFs::new());
        let root = WorkspaceHandle::new_root(fs, "ws:/".to_owned());
        root.openat("test.txt", Oflags::CREAT, Fdflags::empty()).unwrap();
        let err = root.openat("test.txt", Oflags::CREAT | Oflags::EXCL, Fdflags::empty());
        assert!(matches!(err, Err(Error::AlreadyExists)));
    }
}
