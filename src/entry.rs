//! Data model shared by the generator and parser (spec §3).

use crate::stat::FileStat;

/// One logical item a caller asks the generator to emit. `Extended` is
/// deliberately not a variant here: it is an implementation detail of how
/// long paths get framed, never something a caller constructs directly.
#[derive(Debug, Clone)]
pub enum Entry<P> {
    File {
        path: String,
        stat: FileStat,
        content: P,
    },
    Directory {
        path: String,
        stat: FileStat,
    },
}

/// Which kind of header a [`Header`] token describes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Extended,
}

/// Parser output: one per header block (spec §3 "Header token").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub kind: EntryKind,
    pub path: String,
    pub size: u64,
    pub mode: u32,
    pub mtime: u64,
    pub uid: u32,
    pub gid: u32,
    pub uname: String,
    pub gname: String,
    /// PAX keys other than `path`, retained verbatim but not acted on by
    /// the core (spec §3: "Unrecognized keys are decoded to a string value
    /// and retained"). Always empty unless this entry was preceded by an
    /// extended header carrying extra keys.
    pub extra: Vec<(String, String)>,
}

/// Parser output: one per data block belonging to a file or extended
/// header (spec §3 "Data token"). `bytes` is truncated to the meaningful
/// length of this block (no padding bleed); `end` is true exactly on the
/// last data block of the current file/record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Data {
    pub bytes: Vec<u8>,
    pub end: bool,
}

/// Parser output: emitted exactly once, after the second all-zero block.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct End;

/// One token produced by [`crate::parser::Parser::write`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Header(Header),
    Data(Data),
    End,
}
