//! Optional per-entry metadata (spec §3 "FileStat").

use crate::error::{Result, TarError};

/// Largest value that fits an 11-digit octal field with a trailing NUL
/// (`size`, `mtime`): `8^11 - 1`.
pub const MAX_OCTAL11: u64 = 2u64.pow(33) - 1;

/// Largest value that fits a 7-digit octal field with a trailing NUL
/// (`uid`, `gid`): `8^7 - 1`.
pub const MAX_OCTAL7: u32 = 2u32.pow(21) - 1;

/// Longest `uname`/`gname` the 32-byte header fields can hold.
pub const MAX_OWNER_NAME_LEN: usize = 32;

/// Metadata attached to a [`crate::entry::Entry`]. Every field defaults to
/// the value a completely absent stat would decode to: empty strings, zero
/// numbers, epoch mtime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileStat {
    pub size: u64,
    pub mode: u32,
    pub mtime: u64,
    pub uid: u32,
    pub gid: u32,
    pub uname: String,
    pub gname: String,
}

bitflags::bitflags! {
    /// UNIX permission bits packed into [`FileStat::mode`]. A courtesy
    /// decomposition; the codec itself treats `mode` as an opaque octal
    /// `u32` and never interprets individual bits.
    pub struct ModeFlags: u32 {
        const SET_UID = 0o4000;
        const SET_GID = 0o2000;
        const STICKY = 0o1000;
        const OWNER_READ = 0o400;
        const OWNER_WRITE = 0o200;
        const OWNER_EXEC = 0o100;
        const GROUP_READ = 0o040;
        const GROUP_WRITE = 0o020;
        const GROUP_EXEC = 0o010;
        const OTHERS_READ = 0o004;
        const OTHERS_WRITE = 0o002;
        const OTHERS_EXEC = 0o001;
    }
}

impl FileStat {
    /// Decomposes `mode` into its individual permission bits, ignoring any
    /// bits outside [`ModeFlags::all`].
    pub fn mode_flags(&self) -> ModeFlags {
        ModeFlags::from_bits_truncate(self.mode)
    }

    /// Validates the numeric/length limits spec §3/§6 place on a stat.
    pub fn validate(&self) -> Result<()> {
        if self.size > MAX_OCTAL11 {
            return Err(TarError::InvalidStat(format!(
                "size {} exceeds {} (2^33 - 1)",
                self.size, MAX_OCTAL11
            )));
        }
        if self.mtime > MAX_OCTAL11 {
            return Err(TarError::InvalidStat(format!(
                "mtime {} exceeds {} (11 octal digits)",
                self.mtime, MAX_OCTAL11
            )));
        }
        if self.uid > MAX_OCTAL7 {
            return Err(TarError::InvalidStat(format!(
                "uid {} exceeds {} (7 octal digits)",
                self.uid, MAX_OCTAL7
            )));
        }
        if self.gid > MAX_OCTAL7 {
            return Err(TarError::InvalidStat(format!(
                "gid {} exceeds {} (7 octal digits)",
                self.gid, MAX_OCTAL7
            )));
        }
        if self.uname.len() > MAX_OWNER_NAME_LEN {
            return Err(TarError::InvalidStat(format!(
                "uname {:?} longer than {} bytes",
                self.uname, MAX_OWNER_NAME_LEN
            )));
        }
        if self.gname.len() > MAX_OWNER_NAME_LEN {
            return Err(TarError::InvalidStat(format!(
                "gname {:?} longer than {} bytes",
                self.gname, MAX_OWNER_NAME_LEN
            )));
        }
        Ok(())
    }
}
