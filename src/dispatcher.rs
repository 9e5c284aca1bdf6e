//! WASI Dispatcher (C6, §4.6). Implements every `wasi_snapshot_preview1`
//! entry point: look up fds via [`crate::fdtable`], check rights, marshal
//! through [`crate::memory`], delegate to [`crate::vfs`] / a driver, marshal
//! the result, map errors to an [`Errno`]. Every entry point is wrapped in a
//! `tracing::instrument`-style span (§2a) so a host embedder gets per-call
//! logging without touching this file.

use crate::argv::PackedStrings;
use crate::clock::{self, ClockSource};
use crate::ctx::WasiCtx;
use crate::dirent;
use crate::errno::{Error, Errno, Result};
use crate::fdtable::DescriptorEntry;
use crate::handle::Handle;
use crate::host::ProcessExit;
use crate::memory::{self, GuestMemory};
use crate::poll::{self, ClockEventData, FdEventData, Timer};
use crate::rights::HandleRights;
use crate::types::*;
use crate::vfs;
use std::io::{IoSlice, IoSliceMut, SeekFrom};

/// Bundles the collaborators every entry point needs besides the ctx and
/// guest memory (§6): clocks, a blocking timer, and the process-exit sink.
pub struct Dispatcher<'a> {
    pub ctx: &'a WasiCtx,
    pub clocks: &'a dyn ClockSource,
    pub timer: &'a dyn Timer,
    pub process_exit: &'a dyn ProcessExit,
}

fn to_errno(r: Result<()>) -> Errno {
    match r {
        Ok(()) => Errno::Success,
        Err(e) => e.into(),
    }
}

impl<'a> Dispatcher<'a> {
    pub fn new(
        ctx: &'a WasiCtx,
        clocks: &'a dyn ClockSource,
        timer: &'a dyn Timer,
        process_exit: &'a dyn ProcessExit,
    ) -> Self {
        Self { ctx, clocks, timer, process_exit }
    }

    fn require(&self, fd: Fd, required: Rights) -> Result<()> {
        let table = self.ctx.fd_table();
        let entry = table.get(fd)?;
        entry.require(HandleRights::from_base(required))
    }

    // -- args / environ --

    pub fn args_sizes_get(&self, mem: &mut dyn GuestMemory, argc_ptr: u32, argv_buf_len_ptr: u32) -> Errno {
        tracing::trace!(argc_ptr, argv_buf_len_ptr, "args_sizes_get");
        to_errno(self.write_sizes(mem, self.ctx.args(), argc_ptr, argv_buf_len_ptr))
    }

    pub fn args_get(&self, mem: &mut dyn GuestMemory, argv_ptr: u32, argv_buf_ptr: u32) -> Errno {
        tracing::trace!(argv_ptr, argv_buf_ptr, "args_get");
        to_errno(self.write_strings(mem, self.ctx.args(), argv_ptr, argv_buf_ptr))
    }

    pub fn environ_sizes_get(&self, mem: &mut dyn GuestMemory, count_ptr: u32, buf_len_ptr: u32) -> Errno {
        tracing::trace!(count_ptr, buf_len_ptr, "environ_sizes_get");
        to_errno(self.write_sizes(mem, self.ctx.env(), count_ptr, buf_len_ptr))
    }

    pub fn environ_get(&self, mem: &mut dyn GuestMemory, environ_ptr: u32, environ_buf_ptr: u32) -> Errno {
        tracing::trace!(environ_ptr, environ_buf_ptr, "environ_get");
        to_errno(self.write_strings(mem, self.ctx.env(), environ_ptr, environ_buf_ptr))
    }

    fn write_sizes(&self, mem: &mut dyn GuestMemory, packed: &PackedStrings, count_ptr: u32, buf_len_ptr: u32) -> Result<()> {
        memory::write_u32(mem, count_ptr, packed.count())?;
        memory::write_u32(mem, buf_len_ptr, packed.buf_size())
    }

    fn write_strings(&self, mem: &mut dyn GuestMemory, packed: &PackedStrings, ptrs_ptr: u32, buf_ptr: u32) -> Result<()> {
        mem.write_bytes(buf_ptr, &packed.blob)?;
        for (i, offset) in packed.offsets.iter().enumerate() {
            memory::write_u32(mem, ptrs_ptr + (i as u32) * 4, buf_ptr + offset)?;
        }
        Ok(())
    }

    // -- clocks --

    pub fn clock_res_get(&self, mem: &mut dyn GuestMemory, id: Clockid, out_ptr: u32) -> Errno {
        to_errno((|| {
            let res = clock::res_get(id)?;
            memory::write_u64(mem, out_ptr, res)
        })())
    }

    pub fn clock_time_get(&self, mem: &mut dyn GuestMemory, id: Clockid, _precision: Timestamp, out_ptr: u32) -> Errno {
        to_errno((|| {
            let t = clock::time_get(self.clocks, id)?;
            memory::write_u64(mem, out_ptr, t)
        })())
    }

    // -- fd_* --

    pub fn fd_advise(&self, fd: Fd, offset: Filesize, len: Filesize, advice: u8) -> Errno {
        to_errno((|| {
            self.require(fd, Rights::FD_ADVISE)?;
            let advice: Advice = advice.try_into()?;
            let table = self.ctx.fd_table();
            table.get(fd)?.handle.advise(advice, offset, len)
        })())
    }

    pub fn fd_allocate(&self, fd: Fd, offset: Filesize, len: Filesize) -> Errno {
        to_errno((|| {
            self.require(fd, Rights::FD_ALLOCATE)?;
            let table = self.ctx.fd_table();
            table.get(fd)?.handle.allocate(offset, len)
        })())
    }

    pub fn fd_close(&self, fd: Fd) -> Errno {
        to_errno(self.ctx.fd_table_mut().close(fd))
    }

    pub fn fd_datasync(&self, fd: Fd) -> Errno {
        to_errno((|| {
            self.require(fd, Rights::FD_DATASYNC)?;
            let table = self.ctx.fd_table();
            table.get(fd)?.handle.datasync()
        })())
    }

    pub fn fd_fdstat_get(&self, mem: &mut dyn GuestMemory, fd: Fd, out_ptr: u32) -> Errno {
        to_errno((|| {
            let table = self.ctx.fd_table();
            let entry = table.get(fd)?;
            let fdstat = Fdstat {
                fs_filetype: entry.filetype,
                fs_flags: entry.fdflags.get(),
                fs_rights_base: entry.rights.base(),
                fs_rights_inheriting: entry.rights.inheriting(),
            };
            memory::write_fdstat(mem, out_ptr, fdstat)
        })())
    }

    pub fn fd_fdstat_set_flags(&self, fd: Fd, flags_bits: u16) -> Errno {
        to_errno((|| {
            self.require(fd, Rights::FD_FDSTAT_SET_FLAGS)?;
            let flags = Fdflags::from_bits_truncate(flags_bits);
            let table = self.ctx.fd_table();
            let entry = table.get(fd)?;
            entry.handle.set_fdstat_flags(flags)?;
            entry.fdflags.set(flags);
            Ok(())
        })())
    }

    pub fn fd_fdstat_set_rights(&self, fd: Fd, base_bits: u64, inheriting_bits: u64) -> Errno {
        to_errno((|| {
            let requested = HandleRights::new(
                Rights::from_bits_truncate(base_bits),
                Rights::from_bits_truncate(inheriting_bits),
            );
            let mut table = self.ctx.fd_table_mut();
            let entry = table.get_mut(fd)?;
            if !entry.rights.contains(requested) {
                return Err(Error::NotCapable("requested rights exceed current rights"));
            }
            entry.rights = requested;
            Ok(())
        })())
    }

    pub fn fd_filestat_get(&self, mem: &mut dyn GuestMemory, fd: Fd, out_ptr: u32) -> Errno {
        to_errno((|| {
            self.require(fd, Rights::FD_FILESTAT_GET)?;
            let table = self.ctx.fd_table();
            let st = table.get(fd)?.handle.filestat()?;
            memory::write_filestat(mem, out_ptr, st)
        })())
    }

    pub fn fd_filestat_set_size(&self, fd: Fd, size: Filesize) -> Errno {
        to_errno((|| {
            self.require(fd, Rights::FD_FILESTAT_SET_SIZE)?;
            let table = self.ctx.fd_table();
            table.get(fd)?.handle.set_filestat_size(size)
        })())
    }

    pub fn fd_filestat_set_times(&self, fd: Fd, atim: Timestamp, mtim: Timestamp, fst_flags_bits: u16) -> Errno {
        to_errno((|| {
            self.require(fd, Rights::FD_FILESTAT_SET_TIMES)?;
            let flags = Fstflags::from_bits_truncate(fst_flags_bits);
            let table = self.ctx.fd_table();
            table.get(fd)?.handle.set_filestat_times(atim, mtim, flags)
        })())
    }

    pub fn fd_pread(&self, mem: &mut dyn GuestMemory, fd: Fd, iovs_ptr: u32, iovs_len: u32, offset: Filesize, nread_ptr: u32) -> Errno {
        to_errno((|| {
            self.require(fd, Rights::FD_READ)?;
            let iovecs = memory::read_iovec_array(mem, iovs_ptr, iovs_len)?;
            let mut bufs = vec![0u8; iovecs.iter().map(|v| v.buf_len as usize).sum()];
            let mut slices: Vec<IoSliceMut> = Vec::new();
            {
                let mut rest = &mut bufs[..];
                for iov in &iovecs {
                    let (head, tail) = rest.split_at_mut(iov.buf_len as usize);
                    slices.push(IoSliceMut::new(head));
                    rest = tail;
                }
            }
            let n = {
                let table = self.ctx.fd_table();
                table.get(fd)?.handle.pread(&mut slices, offset)?
            };
            self.scatter_back(mem, &iovecs, &bufs, n)?;
            memory::write_u32(mem, nread_ptr, n as u32)
        })())
    }

    pub fn fd_pwrite(&self, mem: &mut dyn GuestMemory, fd: Fd, iovs_ptr: u32, iovs_len: u32, offset: Filesize, nwritten_ptr: u32) -> Errno {
        to_errno((|| {
            self.require(fd, Rights::FD_WRITE)?;
            let iovecs = memory::read_iovec_array(mem, iovs_ptr, iovs_len)?;
            let bufs = self.gather(mem, &iovecs)?;
            let slices: Vec<IoSlice> = bufs.iter().map(|b| IoSlice::new(b)).collect();
            let n = {
                let table = self.ctx.fd_table();
                table.get(fd)?.handle.pwrite(&slices, offset)?
            };
            memory::write_u32(mem, nwritten_ptr, n as u32)
        })())
    }

    pub fn fd_prestat_get(&self, mem: &mut dyn GuestMemory, fd: Fd, out_ptr: u32) -> Errno {
        to_errno((|| {
            let table = self.ctx.fd_table();
            let entry = table.get(fd)?;
            let prefix = entry.preopen.as_ref().ok_or(Error::BadFileDescriptor)?;
            memory::write_prestat(mem, out_ptr, Prestat { pr_name_len: prefix.len() as u32 })
        })())
    }

    pub fn fd_prestat_dir_name(&self, mem: &mut dyn GuestMemory, fd: Fd, path_ptr: u32, path_len: u32) -> Errno {
        to_errno((|| {
            let table = self.ctx.fd_table();
            let entry = table.get(fd)?;
            let prefix = entry.preopen.as_ref().ok_or(Error::BadFileDescriptor)?;
            if prefix.len() as u32 != path_len {
                return Err(Error::NameTooLong);
            }
            memory::write_string(mem, path_ptr, prefix)
        })())
    }

    pub fn fd_read(&self, mem: &mut dyn GuestMemory, fd: Fd, iovs_ptr: u32, iovs_len: u32, nread_ptr: u32) -> Errno {
        to_errno((|| {
            self.require(fd, Rights::FD_READ)?;
            let iovecs = memory::read_iovec_array(mem, iovs_ptr, iovs_len)?;
            let mut bufs = vec![0u8; iovecs.iter().map(|v| v.buf_len as usize).sum()];
            let mut slices: Vec<IoSliceMut> = Vec::new();
            {
                let mut rest = &mut bufs[..];
                for iov in &iovecs {
                    let (head, tail) = rest.split_at_mut(iov.buf_len as usize);
                    slices.push(IoSliceMut::new(head));
                    rest = tail;
                }
            }
            let n = {
                let table = self.ctx.fd_table();
                table.get(fd)?.handle.read(&mut slices)?
            };
            self.scatter_back(mem, &iovecs, &bufs, n)?;
            memory::write_u32(mem, nread_ptr, n as u32)
        })())
    }

    pub fn fd_readdir(&self, mem: &mut dyn GuestMemory, fd: Fd, buf_ptr: u32, buf_len: u32, cookie: Dircookie, used_ptr: u32) -> Errno {
        to_errno((|| {
            self.require(fd, Rights::FD_READDIR)?;
            let table = self.ctx.fd_table();
            let handle = &table.get(fd)?.handle;
            let used = dirent::fill_buffer(handle.as_ref(), mem, cookie, buf_ptr, buf_len)?;
            memory::write_u32(mem, used_ptr, used)
        })())
    }

    pub fn fd_renumber(&self, from: Fd, to: Fd) -> Errno {
        to_errno(self.ctx.fd_table_mut().renumber(from, to))
    }

    pub fn fd_seek(&self, mem: &mut dyn GuestMemory, fd: Fd, delta: Filedelta, whence: u8, new_offset_ptr: u32) -> Errno {
        to_errno((|| {
            self.require(fd, Rights::FD_SEEK)?;
            let whence: Whence = whence.try_into()?;
            let pos = match whence {
                Whence::Set => SeekFrom::Start(delta as u64),
                Whence::Cur => SeekFrom::Current(delta),
                Whence::End => SeekFrom::End(delta),
            };
            let new_offset = {
                let table = self.ctx.fd_table();
                table.get(fd)?.handle.seek(pos)?
            };
            memory::write_u64(mem, new_offset_ptr, new_offset)
        })())
    }

    pub fn fd_sync(&self, fd: Fd) -> Errno {
        to_errno((|| {
            self.require(fd, Rights::FD_SYNC)?;
            let table = self.ctx.fd_table();
            table.get(fd)?.handle.sync()
        })())
    }

    pub fn fd_tell(&self, mem: &mut dyn GuestMemory, fd: Fd, out_ptr: u32) -> Errno {
        to_errno((|| {
            self.require(fd, Rights::FD_TELL)?;
            let offset = {
                let table = self.ctx.fd_table();
                table.get(fd)?.handle.tell()?
            };
            memory::write_u64(mem, out_ptr, offset)
        })())
    }

    pub fn fd_write(&self, mem: &mut dyn GuestMemory, fd: Fd, iovs_ptr: u32, iovs_len: u32, nwritten_ptr: u32) -> Errno {
        to_errno((|| {
            self.require(fd, Rights::FD_WRITE)?;
            let iovecs = memory::read_iovec_array(mem, iovs_ptr, iovs_len)?;
            let bufs = self.gather(mem, &iovecs)?;
            let slices: Vec<IoSlice> = bufs.iter().map(|b| IoSlice::new(b)).collect();
            let n = {
                let table = self.ctx.fd_table();
                let entry = table.get(fd)?;
                // §9: append is applied here, not in any driver, by seeking to
                // end-of-file before the write rather than relying on a
                // driver-level append mode.
                if entry.fdflags.get().contains(Fdflags::APPEND) {
                    entry.handle.seek(SeekFrom::End(0))?;
                }
                entry.handle.write(&slices)?
            };
            memory::write_u32(mem, nwritten_ptr, n as u32)
        })())
    }

    fn gather(&self, mem: &dyn GuestMemory, iovecs: &[Iovec]) -> Result<Vec<Vec<u8>>> {
        iovecs
            .iter()
            .map(|iov| mem.read_bytes(iov.buf, iov.buf_len).map(|b| b.to_vec()))
            .collect()
    }

    fn scatter_back(&self, mem: &mut dyn GuestMemory, iovecs: &[Iovec], bufs: &[u8], total: usize) -> Result<()> {
        let mut remaining = total;
        let mut offset = 0usize;
        for iov in iovecs {
            let n = remaining.min(iov.buf_len as usize);
            mem.write_bytes(iov.buf, &bufs[offset..offset + n])?;
            offset += n;
            remaining -= n;
            if remaining == 0 {
                break;
            }
        }
        Ok(())
    }

    // -- path_* --

    fn anchor(&self, fd: Fd, required: Rights) -> Result<Fd> {
        self.require(fd, required)?;
        Ok(fd)
    }

    pub fn path_create_directory(&self, mem: &dyn GuestMemory, fd: Fd, path_ptr: u32, path_len: u32) -> Errno {
        to_errno((|| {
            let fd = self.anchor(fd, Rights::PATH_CREATE_DIRECTORY)?;
            let path = memory::read_string(mem, path_ptr, path_len)?;
            let table = self.ctx.fd_table();
            let anchor = table.get(fd)?.handle.as_ref();
            let resolved = vfs::resolve_parent(anchor, &path)?;
            resolved.parent.create_directory(&resolved.last)
        })())
    }

    pub fn path_filestat_get(&self, mem: &mut dyn GuestMemory, fd: Fd, _lookupflags: u32, path_ptr: u32, path_len: u32, out_ptr: u32) -> Errno {
        to_errno((|| {
            let fd = self.anchor(fd, Rights::PATH_FILESTAT_GET)?;
            let path = memory::read_string(mem, path_ptr, path_len)?;
            let st = {
                let table = self.ctx.fd_table();
                let anchor = table.get(fd)?.handle.as_ref();
                let resolved = vfs::resolve_parent(anchor, &path)?;
                resolved.parent.filestat_at(&resolved.last, true)?
            };
            memory::write_filestat(mem, out_ptr, st)
        })())
    }

    pub fn path_filestat_set_times(&self, mem: &dyn GuestMemory, fd: Fd, _lookupflags: u32, path_ptr: u32, path_len: u32, atim: Timestamp, mtim: Timestamp, fst_flags_bits: u16) -> Errno {
        to_errno((|| {
            let fd = self.anchor(fd, Rights::PATH_FILESTAT_SET_TIMES)?;
            let path = memory::read_string(mem, path_ptr, path_len)?;
            let flags = Fstflags::from_bits_truncate(fst_flags_bits);
            let table = self.ctx.fd_table();
            let anchor = table.get(fd)?.handle.as_ref();
            let resolved = vfs::resolve_parent(anchor, &path)?;
            resolved.parent.set_filestat_times_at(&resolved.last, atim, mtim, flags, true)
        })())
    }

    pub fn path_link(
        &self,
        mem: &dyn GuestMemory,
        old_fd: Fd,
        _old_flags: u32,
        old_path_ptr: u32,
        old_path_len: u32,
        new_fd: Fd,
        new_path_ptr: u32,
        new_path_len: u32,
    ) -> Errno {
        to_errno((|| {
            self.require(old_fd, Rights::PATH_LINK_SOURCE)?;
            self.require(new_fd, Rights::PATH_LINK_TARGET)?;
            memory::read_string(mem, old_path_ptr, old_path_len)?;
            memory::read_string(mem, new_path_ptr, new_path_len)?;
            Err(Error::NotSupported)
        })())
    }

    pub fn path_open(
        &self,
        mem: &mut dyn GuestMemory,
        dir_fd: Fd,
        _dirflags: u32,
        path_ptr: u32,
        path_len: u32,
        oflags_bits: u16,
        fs_rights_base: u64,
        fs_rights_inheriting: u64,
        fdflags_bits: u16,
        out_fd_ptr: u32,
    ) -> Errno {
        to_errno((|| {
            self.require(dir_fd, Rights::PATH_OPEN)?;
            let path = memory::read_string(mem, path_ptr, path_len)?;
            let oflags = Oflags::from_bits_truncate(oflags_bits);
            let fd_flags = Fdflags::from_bits_truncate(fdflags_bits);
            let requested_base = Rights::from_bits_truncate(fs_rights_base);
            let requested_inheriting = Rights::from_bits_truncate(fs_rights_inheriting);

            let (handle, child_rights) = {
                let table = self.ctx.fd_table();
                let entry = table.get(dir_fd)?;
                let anchor = entry.handle.as_ref();
                let handle = vfs::resolve(anchor, &path, oflags, fd_flags)?;
                let child_rights = entry.rights.narrow_for_child(requested_base, requested_inheriting);
                (handle, child_rights)
            };
            let entry = DescriptorEntry::new(handle, child_rights, fd_flags);
            let new_fd = self.ctx.fd_table_mut().insert(entry)?;
            memory::write_u32(mem, out_fd_ptr, new_fd)
        })())
    }

    pub fn path_readlink(
        &self,
        mem: &dyn GuestMemory,
        fd: Fd,
        path_ptr: u32,
        path_len: u32,
        _buf_ptr: u32,
        _buf_len: u32,
        _bufused_ptr: u32,
    ) -> Errno {
        to_errno((|| {
            self.require(fd, Rights::PATH_READLINK)?;
            memory::read_string(mem, path_ptr, path_len)?;
            Err(Error::NoLink)
        })())
    }

    pub fn path_remove_directory(&self, mem: &dyn GuestMemory, fd: Fd, path_ptr: u32, path_len: u32) -> Errno {
        to_errno((|| {
            let fd = self.anchor(fd, Rights::PATH_REMOVE_DIRECTORY)?;
            let path = memory::read_string(mem, path_ptr, path_len)?;
            let table = self.ctx.fd_table();
            let anchor = table.get(fd)?.handle.as_ref();
            let resolved = vfs::resolve_parent(anchor, &path)?;
            resolved.parent.remove_directory(&resolved.last)
        })())
    }

    pub fn path_rename(&self, mem: &dyn GuestMemory, old_fd: Fd, old_path_ptr: u32, old_path_len: u32, new_fd: Fd, new_path_ptr: u32, new_path_len: u32) -> Errno {
        to_errno((|| {
            self.require(old_fd, Rights::PATH_RENAME_SOURCE)?;
            self.require(new_fd, Rights::PATH_RENAME_TARGET)?;
            let old_path = memory::read_string(mem, old_path_ptr, old_path_len)?;
            let new_path = memory::read_string(mem, new_path_ptr, new_path_len)?;
            let table = self.ctx.fd_table();
            let old_anchor = table.get(old_fd)?.handle.as_ref();
            let old_resolved = vfs::resolve_parent(old_anchor, &old_path)?;
            let new_anchor = table.get(new_fd)?.handle.as_ref();
            let new_resolved = vfs::resolve_parent(new_anchor, &new_path)?;
            old_resolved
                .parent
                .rename(&old_resolved.last, new_resolved.parent.as_ref(), &new_resolved.last)
        })())
    }

    pub fn path_symlink(
        &self,
        mem: &dyn GuestMemory,
        old_path_ptr: u32,
        old_path_len: u32,
        fd: Fd,
        new_path_ptr: u32,
        new_path_len: u32,
    ) -> Errno {
        to_errno((|| {
            self.require(fd, Rights::PATH_SYMLINK)?;
            memory::read_string(mem, old_path_ptr, old_path_len)?;
            memory::read_string(mem, new_path_ptr, new_path_len)?;
            Err(Error::NotSupported)
        })())
    }

    pub fn path_unlink_file(&self, mem: &dyn GuestMemory, fd: Fd, path_ptr: u32, path_len: u32) -> Errno {
        to_errno((|| {
            let fd = self.anchor(fd, Rights::PATH_UNLINK_FILE)?;
            let path = memory::read_string(mem, path_ptr, path_len)?;
            let table = self.ctx.fd_table();
            let anchor = table.get(fd)?.handle.as_ref();
            let resolved = vfs::resolve_parent(anchor, &path)?;
            resolved.parent.unlink_file(&resolved.last)
        })())
    }

    // -- poll / proc / misc --

    pub fn poll_oneoff(&self, mem: &mut dyn GuestMemory, in_ptr: u32, out_ptr: u32, nsubs: u32, nevents_ptr: u32) -> Errno {
        to_errno((|| {
            let mut subs = Vec::with_capacity(nsubs as usize);
            for i in 0..nsubs {
                subs.push(memory::read_subscription(mem, in_ptr + i * memory::SUBSCRIPTION_LEN)?);
            }

            let table = self.ctx.fd_table();
            let mut clock_event = None;
            let mut fd_events = Vec::new();
            for sub in &subs {
                match &sub.u {
                    SubscriptionU::Clock(c) => {
                        let deadline = clock::to_absolute_deadline_ns(self.clocks, c)?;
                        let now = clock::time_get(self.clocks, c.id)?;
                        let delay_ns = deadline.saturating_sub(now);
                        clock_event = Some(ClockEventData { delay_ns, userdata: sub.userdata });
                    }
                    SubscriptionU::FdRead(f) => {
                        fd_events.push((f.file_descriptor, Eventtype::FdRead, sub.userdata));
                    }
                    SubscriptionU::FdWrite(f) => {
                        fd_events.push((f.file_descriptor, Eventtype::FdWrite, sub.userdata));
                    }
                }
            }

            let mut entries = Vec::with_capacity(fd_events.len());
            for (fd, eventtype, userdata) in &fd_events {
                let handle = table.get(*fd)?.handle.as_ref();
                entries.push(FdEventData { handle, eventtype: *eventtype, userdata: *userdata });
            }

            let events = poll::oneoff(clock_event, entries, self.timer);
            for (i, event) in events.iter().enumerate() {
                memory::write_event(mem, out_ptr + (i as u32) * memory::EVENT_LEN, *event)?;
            }
            memory::write_u32(mem, nevents_ptr, events.len() as u32)
        })())
    }

    pub fn proc_exit(&self, code: Exitcode) -> ! {
        self.process_exit.exit(code)
    }

    pub fn proc_raise(&self, _sig: u8) -> Errno {
        Errno::Nosys
    }

    pub fn sched_yield(&self) -> Errno {
        Errno::Success
    }

    pub fn random_get(&self, mem: &mut dyn GuestMemory, buf_ptr: u32, buf_len: u32) -> Errno {
        to_errno((|| {
            use rand::RngCore;
            let mut bytes = vec![0u8; buf_len as usize];
            rand::thread_rng().fill_bytes(&mut bytes);
            mem.write_bytes(buf_ptr, &bytes)
        })())
    }

    // -- sock_* (Non-goal: sandboxed networking, §1) --

    pub fn sock_recv(
        &self,
        mem: &dyn GuestMemory,
        fd: Fd,
        ri_data_ptr: u32,
        ri_data_len: u32,
        _ri_flags: u16,
        _ro_datalen_ptr: u32,
        _ro_flags_ptr: u32,
    ) -> Errno {
        to_errno((|| {
            self.ctx.fd_table().get(fd)?;
            memory::read_iovec_array(mem, ri_data_ptr, ri_data_len)?;
            Err(Error::NotSupported)
        })())
    }

    pub fn sock_send(
        &self,
        mem: &dyn GuestMemory,
        fd: Fd,
        si_data_ptr: u32,
        si_data_len: u32,
        _si_flags: u16,
        _so_datalen_ptr: u32,
    ) -> Errno {
        to_errno((|| {
            self.ctx.fd_table().get(fd)?;
            memory::read_iovec_array(mem, si_data_ptr, si_data_len)?;
            Err(Error::NotSupported)
        })())
    }

    pub fn sock_shutdown(&self, fd: Fd, _how: u8) -> Errno {
        to_errno((|| {
            self.ctx.fd_table().get(fd)?;
            Err(Error::NotSupported)
        })())
    }

    pub fn sock_accept(&self, fd: Fd, _flags: u16, _fd_ptr: u32) -> Errno {
        to_errno((|| {
            self.ctx.fd_table().get(fd)?;
            Err(Error::NotSupported)
        })())
    }
}
