//! Wire vocabulary for `wasi_snapshot_preview1` (§4.1, §4.2): scalar enums,
//! bitflag sets, and the fixed-layout records the marshaller (§ [`crate::memory`])
//! reads and writes at guest pointers. Field names and bit positions follow
//! the published WASI snapshot exactly; this module has no host-side
//! behavior of its own.

use bitflags::bitflags;

pub type Fd = u32;
pub type Size = u32;
pub type Filesize = u64;
pub type Filedelta = i64;
pub type Timestamp = u64;
pub type Dircookie = u64;
pub type Userdata = u64;
pub type Exitcode = u32;
pub type Clockid = u32;

pub const CLOCKID_REALTIME: Clockid = 0;
pub const CLOCKID_MONOTONIC: Clockid = 1;
pub const CLOCKID_PROCESS_CPUTIME_ID: Clockid = 2;
pub const CLOCKID_THREAD_CPUTIME_ID: Clockid = 3;

pub const DIRCOOKIE_START: Dircookie = 0;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum Filetype {
    Unknown = 0,
    BlockDevice = 1,
    CharacterDevice = 2,
    Directory = 3,
    RegularFile = 4,
    SocketDgram = 5,
    SocketStream = 6,
    SymbolicLink = 7,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum Whence {
    Set = 0,
    Cur = 1,
    End = 2,
}

impl TryFrom<u8> for Whence {
    type Error = crate::errno::Error;
    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(Whence::Set),
            1 => Ok(Whence::Cur),
            2 => Ok(Whence::End),
            _ => Err(crate::errno::Error::InvalidArgument("whence")),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum Advice {
    Normal = 0,
    Sequential = 1,
    Random = 2,
    Willneed = 3,
    Dontneed = 4,
    Noreuse = 5,
}

impl TryFrom<u8> for Advice {
    type Error = crate::errno::Error;
    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(Advice::Normal),
            1 => Ok(Advice::Sequential),
            2 => Ok(Advice::Random),
            3 => Ok(Advice::Willneed),
            4 => Ok(Advice::Dontneed),
            5 => Ok(Advice::Noreuse),
            _ => Err(crate::errno::Error::InvalidArgument("advice")),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum Eventtype {
    Clock = 0,
    FdRead = 1,
    FdWrite = 2,
}

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct Fdflags: u16 {
        const APPEND   = 0b0_0001;
        const DSYNC    = 0b0_0010;
        const NONBLOCK = 0b0_0100;
        const RSYNC    = 0b0_1000;
        const SYNC     = 0b1_0000;
    }
}

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct Oflags: u16 {
        const CREAT     = 0b0001;
        const DIRECTORY = 0b0010;
        const EXCL      = 0b0100;
        const TRUNC     = 0b1000;
    }
}

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct Lookupflags: u32 {
        const SYMLINK_FOLLOW = 0b1;
    }
}

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct Fstflags: u16 {
        const ATIM     = 0b0_0001;
        const ATIM_NOW = 0b0_0010;
        const MTIM     = 0b0_0100;
        const MTIM_NOW = 0b0_1000;
    }
}

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct Subclockflags: u16 {
        const SUBSCRIPTION_CLOCK_ABSTIME = 0b1;
    }
}

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct Eventrwflags: u16 {
        const FD_READWRITE_HANGUP = 0b1;
    }
}

bitflags! {
    /// Capability bits a descriptor may hold or a caller may request. Bit
    /// positions match the published WASI snapshot so that guest modules
    /// compiled against the real ABI request the rights they expect.
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct Rights: u64 {
        const FD_DATASYNC             = 1 << 0;
        const FD_READ                 = 1 << 1;
        const FD_SEEK                 = 1 << 2;
        const FD_FDSTAT_SET_FLAGS     = 1 << 3;
        const FD_SYNC                 = 1 << 4;
        const FD_TELL                 = 1 << 5;
        const FD_WRITE                = 1 << 6;
        const FD_ADVISE               = 1 << 7;
        const FD_ALLOCATE             = 1 << 8;
        const PATH_CREATE_DIRECTORY   = 1 << 9;
        const PATH_CREATE_FILE        = 1 << 10;
        const PATH_LINK_SOURCE        = 1 << 11;
        const PATH_LINK_TARGET        = 1 << 12;
        const PATH_OPEN                = 1 << 13;
        const FD_READDIR               = 1 << 14;
        const PATH_READLINK            = 1 << 15;
        const PATH_RENAME_SOURCE       = 1 << 16;
        const PATH_RENAME_TARGET       = 1 << 17;
        const PATH_FILESTAT_GET        = 1 << 18;
        const PATH_FILESTAT_SET_SIZE   = 1 << 19;
        const PATH_FILESTAT_SET_TIMES  = 1 << 20;
        const FD_FILESTAT_GET          = 1 << 21;
        const FD_FILESTAT_SET_SIZE     = 1 << 22;
        const FD_FILESTAT_SET_TIMES    = 1 << 23;
        const PATH_SYMLINK             = 1 << 24;
        const PATH_REMOVE_DIRECTORY    = 1 << 25;
        const PATH_UNLINK_FILE         = 1 << 26;
        const POLL_FD_READWRITE        = 1 << 27;
        const SOCK_SHUTDOWN            = 1 << 28;
    }
}

/// `prestat` (8 bytes): {tag:u8, pad:u24, len:u32}.
#[derive(Debug, Copy, Clone)]
pub struct Prestat {
    pub pr_name_len: Size,
}

/// `fdstat` (24 bytes): {filetype:u8, pad:u8, flags:u16, pad:u32, rights_base:u64, rights_inheriting:u64}.
#[derive(Debug, Copy, Clone)]
pub struct Fdstat {
    pub fs_filetype: Filetype,
    pub fs_flags: Fdflags,
    pub fs_rights_base: Rights,
    pub fs_rights_inheriting: Rights,
}

/// `filestat` (64 bytes).
#[derive(Debug, Copy, Clone)]
pub struct Filestat {
    pub dev: u64,
    pub ino: u64,
    pub filetype: Filetype,
    pub nlink: u64,
    pub size: Filesize,
    pub atim: Timestamp,
    pub mtim: Timestamp,
    pub ctim: Timestamp,
}

/// `dirent` header (24 bytes), followed by `d_namlen` raw name bytes.
#[derive(Debug, Copy, Clone)]
pub struct Dirent {
    pub d_next: Dircookie,
    pub d_ino: u64,
    pub d_namlen: u32,
    pub d_type: Filetype,
}

/// `ciovec`/`iovec` (8 bytes): {buf:u32, len:u32}.
#[derive(Debug, Copy, Clone)]
pub struct Iovec {
    pub buf: u32,
    pub buf_len: u32,
}

#[derive(Debug, Copy, Clone)]
pub struct SubscriptionClock {
    pub id: Clockid,
    pub timeout: Timestamp,
    pub precision: Timestamp,
    pub flags: Subclockflags,
}

#[derive(Debug, Copy, Clone)]
pub struct SubscriptionFdReadwrite {
    pub file_descriptor: Fd,
}

#[derive(Debug, Copy, Clone)]
pub enum SubscriptionU {
    Clock(SubscriptionClock),
    FdRead(SubscriptionFdReadwrite),
    FdWrite(SubscriptionFdReadwrite),
}

#[derive(Debug, Copy, Clone)]
pub struct Subscription {
    pub userdata: Userdata,
    pub u: SubscriptionU,
}

#[derive(Debug, Copy, Clone)]
pub struct EventFdReadwrite {
    pub nbytes: Filesize,
    pub flags: Eventrwflags,
}

#[derive(Debug, Copy, Clone)]
pub struct Event {
    pub userdata: Userdata,
    pub error: crate::errno::Errno,
    pub type_: Eventtype,
    pub fd_readwrite: EventFdReadwrite,
}
