//! ABI / Memory Marshaller (C1, §4.1).
//!
//! The dispatcher never caches a raw pointer into guest memory across calls
//! (memory.grow may relocate the backing buffer between two dispatcher
//! entries), so every encode/decode here takes a `&mut dyn GuestMemory`
//! freshly borrowed from the [`crate::host::WasmInstance`] at the top of the
//! call. All records are written explicitly little-endian; we never rely on
//! the host's native endianness.

use crate::errno::{Error, Result};
use crate::types::*;
use std::convert::TryInto;

/// A view onto a Wasm instance's linear memory, re-derived by the caller on
/// every dispatcher entry. Implementors back this with whatever the embedder
/// uses to represent `memory.buffer` (e.g. a growable `Vec<u8>` standing in
/// for the wasm linear memory, or a real `wasmtime::Memory` view).
pub trait GuestMemory {
    fn as_slice(&self) -> &[u8];
    fn as_slice_mut(&mut self) -> &mut [u8];

    fn len(&self) -> usize {
        self.as_slice().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read_bytes(&self, offset: u32, len: u32) -> Result<&[u8]> {
        let start = offset as usize;
        let end = start
            .checked_add(len as usize)
            .ok_or(Error::GuestMemoryFault)?;
        self.as_slice()
            .get(start..end)
            .ok_or(Error::GuestMemoryFault)
    }

    fn write_bytes(&mut self, offset: u32, bytes: &[u8]) -> Result<()> {
        let start = offset as usize;
        let end = start
            .checked_add(bytes.len())
            .ok_or(Error::GuestMemoryFault)?;
        let dst = self
            .as_slice_mut()
            .get_mut(start..end)
            .ok_or(Error::GuestMemoryFault)?;
        dst.copy_from_slice(bytes);
        Ok(())
    }
}

/// A simple, embeddable [`GuestMemory`] backed by an owned buffer. Stands in
/// for a Wasm instance's linear memory whenever the host does not expose one
/// directly (used pervasively by the test suite, and a reasonable default
/// for an embedder driving this crate from outside a real Wasm engine).
#[derive(Debug, Default)]
pub struct VecMemory {
    bytes: Vec<u8>,
}

impl VecMemory {
    pub fn new(size: usize) -> Self {
        Self {
            bytes: vec![0u8; size],
        }
    }

    /// Mirrors `memory.grow`: grows by `delta_pages` 64KiB pages, returning
    /// the previous size in pages.
    pub fn grow(&mut self, delta_pages: u32) -> u32 {
        const PAGE: usize = 64 * 1024;
        let previous_pages = (self.bytes.len() / PAGE) as u32;
        self.bytes.resize(self.bytes.len() + delta_pages as usize * PAGE, 0);
        previous_pages
    }
}

impl GuestMemory for VecMemory {
    fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
    fn as_slice_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}

macro_rules! prim_rw {
    ($read:ident, $write:ident, $t:ty) => {
        pub fn $read(mem: &dyn GuestMemory, offset: u32) -> Result<$t> {
            let bytes = mem.read_bytes(offset, std::mem::size_of::<$t>() as u32)?;
            Ok(<$t>::from_le_bytes(bytes.try_into().unwrap()))
        }

        pub fn $write(mem: &mut dyn GuestMemory, offset: u32, value: $t) -> Result<()> {
            mem.write_bytes(offset, &value.to_le_bytes())
        }
    };
}

prim_rw!(read_u8, write_u8, u8);
prim_rw!(read_u16, write_u16, u16);
prim_rw!(read_u32, write_u32, u32);
prim_rw!(read_u64, write_u64, u64);
prim_rw!(read_i64, write_i64, i64);

pub fn read_string(mem: &dyn GuestMemory, ptr: u32, len: u32) -> Result<String> {
    let bytes = mem.read_bytes(ptr, len)?;
    String::from_utf8(bytes.to_vec()).map_err(|_| Error::InvalidUtf8)
}

pub fn write_string(mem: &mut dyn GuestMemory, ptr: u32, s: &str) -> Result<()> {
    // No trailing NUL: the guest-supplied length argument is authoritative
    // and the marshaller must not write past it.
    mem.write_bytes(ptr, s.as_bytes())
}

pub fn read_iovec(mem: &dyn GuestMemory, ptr: u32) -> Result<Iovec> {
    Ok(Iovec {
        buf: read_u32(mem, ptr)?,
        buf_len: read_u32(mem, ptr + 4)?,
    })
}

pub fn read_iovec_array(mem: &dyn GuestMemory, ptr: u32, len: u32) -> Result<Vec<Iovec>> {
    (0..len).map(|i| read_iovec(mem, ptr + i * 8)).collect()
}

pub const PRESTAT_LEN: u32 = 8;

pub fn write_prestat(mem: &mut dyn GuestMemory, ptr: u32, prestat: Prestat) -> Result<()> {
    write_u8(mem, ptr, 0)?; // tag: dir
    write_u8(mem, ptr + 1, 0)?;
    write_u8(mem, ptr + 2, 0)?;
    write_u8(mem, ptr + 3, 0)?;
    write_u32(mem, ptr + 4, prestat.pr_name_len)
}

pub const FDSTAT_LEN: u32 = 24;

pub fn write_fdstat(mem: &mut dyn GuestMemory, ptr: u32, fdstat: Fdstat) -> Result<()> {
    write_u8(mem, ptr, fdstat.fs_filetype as u8)?;
    write_u8(mem, ptr + 1, 0)?;
    write_u16(mem, ptr + 2, fdstat.fs_flags.bits())?;
    write_u32(mem, ptr + 4, 0)?;
    write_u64(mem, ptr + 8, fdstat.fs_rights_base.bits())?;
    write_u64(mem, ptr + 16, fdstat.fs_rights_inheriting.bits())
}

pub const FILESTAT_LEN: u32 = 64;

pub fn write_filestat(mem: &mut dyn GuestMemory, ptr: u32, st: Filestat) -> Result<()> {
    write_u64(mem, ptr, st.dev)?;
    write_u64(mem, ptr + 8, st.ino)?;
    write_u8(mem, ptr + 16, st.filetype as u8)?;
    for pad in 0..7 {
        write_u8(mem, ptr + 17 + pad, 0)?;
    }
    write_u64(mem, ptr + 24, st.nlink)?;
    write_u64(mem, ptr + 32, st.size)?;
    write_u64(mem, ptr + 40, st.atim)?;
    write_u64(mem, ptr + 48, st.mtim)?;
    write_u64(mem, ptr + 56, st.ctim)
}

pub const DIRENT_LEN: u32 = 24;

/// Encodes a `dirent` header only; the caller appends the raw name bytes
/// immediately afterward (§4.7) and is responsible for not writing past the
/// caller-supplied buffer.
pub fn write_dirent_header(mem: &mut dyn GuestMemory, ptr: u32, d: Dirent) -> Result<()> {
    write_u64(mem, ptr, d.d_next)?;
    write_u64(mem, ptr + 8, d.d_ino)?;
    write_u32(mem, ptr + 16, d.d_namlen)?;
    write_u8(mem, ptr + 20, d.d_type as u8)?;
    write_u8(mem, ptr + 21, 0)?;
    write_u8(mem, ptr + 22, 0)?;
    write_u8(mem, ptr + 23, 0)
}

pub const SUBSCRIPTION_LEN: u32 = 48;

pub fn read_subscription(mem: &dyn GuestMemory, ptr: u32) -> Result<Subscription> {
    let userdata = read_u64(mem, ptr)?;
    let tag = read_u8(mem, ptr + 8)?;
    let body = ptr + 16;
    let u = match tag {
        0 => SubscriptionU::Clock(SubscriptionClock {
            id: read_u32(mem, body)?,
            timeout: read_u64(mem, body + 8)?,
            precision: read_u64(mem, body + 16)?,
            flags: Subclockflags::from_bits_truncate(read_u16(mem, body + 24)?),
        }),
        1 => SubscriptionU::FdRead(SubscriptionFdReadwrite {
            file_descriptor: read_u32(mem, body)?,
        }),
        2 => SubscriptionU::FdWrite(SubscriptionFdReadwrite {
            file_descriptor: read_u32(mem, body)?,
        }),
        _ => return Err(Error::InvalidArgument("subscription tag")),
    };
    Ok(Subscription { userdata, u })
}

pub const EVENT_LEN: u32 = 32;

pub fn write_event(mem: &mut dyn GuestMemory, ptr: u32, e: Event) -> Result<()> {
    write_u64(mem, ptr, e.userdata)?;
    write_u16(mem, ptr + 8, e.error as u16)?;
    write_u8(mem, ptr + 10, e.type_ as u8)?;
    for pad in 0..5 {
        write_u8(mem, ptr + 11 + pad, 0)?;
    }
    write_u64(mem, ptr + 16, e.fd_readwrite.nbytes)?;
    write_u16(mem, ptr + 24, e.fd_readwrite.flags.bits())?;
    for pad in 0..6 {
        write_u8(mem, ptr + 26 + pad, 0)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_roundtrip() {
        let mut mem = VecMemory::new(64);
        write_u32(&mut mem, 0, 0xdead_beef).unwrap();
        assert_eq!(read_u32(&mem, 0).unwrap(), 0xdead_beef);
        write_u64(&mut mem, 8, u64::MAX).unwrap();
        assert_eq!(read_u64(&mem, 8).unwrap(), u64::MAX);
    }

    #[test]
    fn out_of_bounds_faults() {
        let mem = VecMemory::new(4);
        assert!(matches!(read_u64(&mem, 0), Err(Error::GuestMemoryFault)));
        assert!(matches!(read_u32(&mem, 4), Err(Error::GuestMemoryFault)));
    }

    #[test]
    fn string_roundtrip_writes_no_trailing_nul() {
        let mut mem = VecMemory::new(64);
        write_string(&mut mem, 0, "hello").unwrap();
        assert_eq!(read_string(&mem, 0, 5).unwrap(), "hello");
        assert_eq!(mem.as_slice()[5], 0); // untouched, not an implicit NUL write
    }

    #[test]
    fn prestat_roundtrip() {
        let mut mem = VecMemory::new(64);
        write_prestat(&mut mem, 0, Prestat { pr_name_len: 7 }).unwrap();
        assert_eq!(read_u32(&mem, 4).unwrap(), 7);
    }

    #[test]
    fn fdstat_roundtrip() {
        let mut mem = VecMemory::new(64);
        let fdstat = Fdstat {
            fs_filetype: Filetype::RegularFile,
            fs_flags: Fdflags::APPEND,
            fs_rights_base: Rights::FD_READ | Rights::FD_WRITE,
            fs_rights_inheriting: Rights::empty(),
        };
        write_fdstat(&mut mem, 0, fdstat).unwrap();
        assert_eq!(read_u8(&mem, 0).unwrap(), Filetype::RegularFile as u8);
        assert_eq!(read_u16(&mem, 2).unwrap(), Fdflags::APPEND.bits());
        assert_eq!(
            read_u64(&mem, 8).unwrap(),
            (Rights::FD_READ | Rights::FD_WRITE).bits()
        );
    }
}
