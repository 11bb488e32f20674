/*
MIT License

Copyright (c) 2021 Philipp Schuster

Permission is hereby granted, free of charge, to any person obtaining a copy
of this software and associated documentation files (the "Software"), to deal
in the Software without restriction, including without limitation the rights
to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all
copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
SOFTWARE.
*/
//! Streaming, filesystem-free codec for USTAR tar archives with PAX
//! extended headers. Archives are generated and parsed one 512-byte block
//! at a time, so archives of arbitrary size can be produced or consumed
//! without buffering more than a handful of blocks.
//!
//! The crate is organized bottom-up:
//!
//! - [`layout`] reads and writes the bytes of a single 512-byte header
//!   block, including PAX extended-header record framing.
//! - [`generator`] and [`parser`] are linear one-block-in/one-token-out
//!   state machines built on top of `layout`.
//! - [`facade`] re-chunks arbitrary-sized input/output to the 512-byte
//!   blocks `generator`/`parser` expect, and transparently folds PAX
//!   extended headers into the entry they describe.
//!
//! Directories and long (>255 byte) paths are supported; GNU longname,
//! sparse files, and compression are not — see `SPEC_FULL.md` for the
//! full list of non-goals.

#![deny(rustdoc::all)]
#![deny(clippy::all)]
#![deny(missing_debug_implementations)]

pub mod entry;
pub mod error;
pub mod facade;
pub mod generator;
pub mod layout;
pub mod parser;
pub mod stat;

pub use entry::{Data, End, Entry, EntryKind, Header, Token};
pub use error::{Result, TarError};
pub use facade::{ArchiveReader, ArchiveVisitor, ArchiveWriter, Payload};
pub use generator::Generator;
pub use parser::Parser;
pub use stat::FileStat;

/// Every header and data block in a USTAR/PAX stream is exactly this many
/// bytes.
pub const BLOCKSIZE: usize = 512;

/// One 512-byte block, the unit every generator/parser/facade method
/// consumes or produces.
pub type Block = [u8; BLOCKSIZE];
