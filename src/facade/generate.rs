//! Generation facade (spec §4.4): re-chunks caller-supplied, arbitrary
//! sized payloads to 512-byte boundaries and drives [`Generator`].

use std::collections::VecDeque;

use crate::entry::Entry;
use crate::error::{Result, TarError};
use crate::generator::{encode_long_path, Generator};
use crate::stat::FileStat;
use crate::Block;

/// One piece of a [`Payload::Chunks`] lazy sequence.
pub enum PayloadChunk<'a> {
    Bytes(&'a [u8]),
    Text(&'a str),
}

/// Content supplied to [`ArchiveWriter::add_file`]. Spec §4.4/§9: "buffer |
/// string | lazy sequence of bytes|strings".
pub enum Payload<'a> {
    Bytes(&'a [u8]),
    Text(&'a str),
    Chunks(Box<dyn Iterator<Item = PayloadChunk<'a>> + 'a>),
}

impl<'a> From<&'a [u8]> for Payload<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Payload::Bytes(bytes)
    }
}

impl<'a> From<&'a str> for Payload<'a> {
    fn from(text: &'a str) -> Self {
        Payload::Text(text)
    }
}

impl<'a> From<&'a Vec<u8>> for Payload<'a> {
    fn from(bytes: &'a Vec<u8>) -> Self {
        Payload::Bytes(bytes)
    }
}

impl<'a> From<&'a String> for Payload<'a> {
    fn from(text: &'a String) -> Self {
        Payload::Text(text)
    }
}

/// Builds a USTAR/PAX archive incrementally. `add_file`/`add_directory` run
/// to completion synchronously and queue their blocks; `drain_blocks`
/// drains that queue (spec §4.4's `yieldChunks`), and `is_settled` reports
/// whether anything is left to drain (spec §4.4's `settled`). See
/// `SPEC_FULL.md` §4.4 for why this crate maps the async suspension points
/// spec.md describes onto plain synchronous calls.
#[derive(Debug, Default)]
pub struct ArchiveWriter {
    generator: Generator,
    pending: VecDeque<Block>,
    ended: bool,
}

impl ArchiveWriter {
    pub fn new() -> Self {
        Self {
            generator: Generator::new(),
            pending: VecDeque::new(),
            ended: false,
        }
    }

    /// Queues a file entry. If `path` is longer than 255 bytes, a PAX
    /// extended header carrying the full path precedes the normal header
    /// automatically.
    pub fn add_file(&mut self, path: &str, stat: FileStat, payload: Payload<'_>) -> Result<()> {
        self.require_not_ended()?;

        if path.len() > 255 {
            self.emit_extended_path(path)?;
            self.pending.push_back(self.generator.generate_file("", &stat)?);
        } else {
            self.pending.push_back(self.generator.generate_file(path, &stat)?);
        }

        if stat.size > 0 {
            let blocks = write_payload(&mut self.generator, payload, stat.size)?;
            self.pending.extend(blocks);
        }
        Ok(())
    }

    /// Queues a directory entry. The stored path always ends with `/`;
    /// `stat`, if given, has its `size` ignored (forced to 0 by
    /// [`Generator::generate_directory`]).
    pub fn add_directory(&mut self, path: &str, stat: Option<FileStat>) -> Result<()> {
        self.require_not_ended()?;

        let stored_path = if path.is_empty() || path.ends_with('/') {
            path.to_string()
        } else {
            format!("{path}/")
        };

        if stored_path.len() > 255 {
            self.emit_extended_path(&stored_path)?;
            self.pending
                .push_back(self.generator.generate_directory("", stat.as_ref())?);
        } else {
            self.pending
                .push_back(self.generator.generate_directory(path, stat.as_ref())?);
        }
        Ok(())
    }

    /// Queues both terminating null blocks and marks the writer ended; no
    /// further entries may be added.
    pub fn finalize(&mut self) -> Result<()> {
        self.require_not_ended()?;
        self.pending.push_back(self.generator.generate_end()?);
        self.pending.push_back(self.generator.generate_end()?);
        self.ended = true;
        Ok(())
    }

    /// Drains every block queued so far (spec §4.4's `yieldChunks`).
    pub fn drain_blocks(&mut self) -> impl Iterator<Item = Block> + '_ {
        self.pending.drain(..)
    }

    /// True once the queue is empty (spec §4.4's `settled`). Does not imply
    /// `finalize` has been called.
    pub fn is_settled(&self) -> bool {
        self.pending.is_empty()
    }

    /// Queues a whole sequence of entries at once, a convenience on top of
    /// `add_file`/`add_directory` matching spec §3's `Entry` tagged union.
    pub fn add_entries<'a, P>(&mut self, entries: impl IntoIterator<Item = Entry<P>>) -> Result<()>
    where
        P: Into<Payload<'a>>,
    {
        for entry in entries {
            match entry {
                Entry::File { path, stat, content } => {
                    self.add_file(&path, stat, content.into())?;
                }
                Entry::Directory { path, stat } => {
                    self.add_directory(&path, Some(stat))?;
                }
            }
        }
        Ok(())
    }

    fn emit_extended_path(&mut self, path: &str) -> Result<()> {
        let record = encode_long_path(path);
        self.pending
            .push_back(self.generator.generate_extended(record.len() as u32)?);
        self.pending
            .extend(chunk_into_blocks(&mut self.generator, &record)?);
        Ok(())
    }

    fn require_not_ended(&self) -> Result<()> {
        if self.ended {
            Err(TarError::InvalidState(
                "archive already finalized".into(),
            ))
        } else {
            Ok(())
        }
    }
}

fn chunk_into_blocks(generator: &mut Generator, data: &[u8]) -> Result<Vec<Block>> {
    let mut blocks = Vec::with_capacity(data.len() / 512 + 1);
    let mut offset = 0;
    while offset < data.len() {
        let end = (offset + 512).min(data.len());
        blocks.push(generator.generate_data(&data[offset..end])?);
        offset = end;
    }
    Ok(blocks)
}

fn write_payload(generator: &mut Generator, payload: Payload<'_>, total_size: u64) -> Result<Vec<Block>> {
    let mut blocks = Vec::new();
    let mut buf: Vec<u8> = Vec::with_capacity(512);
    let mut written = 0u64;

    match payload {
        Payload::Bytes(bytes) => feed(generator, &mut blocks, &mut buf, &mut written, bytes)?,
        Payload::Text(text) => feed(generator, &mut blocks, &mut buf, &mut written, text.as_bytes())?,
        Payload::Chunks(iter) => {
            for part in iter {
                let bytes: &[u8] = match &part {
                    PayloadChunk::Bytes(b) => b,
                    PayloadChunk::Text(s) => s.as_bytes(),
                };
                feed(generator, &mut blocks, &mut buf, &mut written, bytes)?;
            }
        }
    }

    if !buf.is_empty() {
        written += buf.len() as u64;
        blocks.push(generator.generate_data(&buf)?);
    }

    if written != total_size {
        return Err(TarError::InvalidStat(format!(
            "payload length {written} does not match declared size {total_size}"
        )));
    }
    Ok(blocks)
}

fn feed(
    generator: &mut Generator,
    blocks: &mut Vec<Block>,
    buf: &mut Vec<u8>,
    written: &mut u64,
    bytes: &[u8],
) -> Result<()> {
    buf.extend_from_slice(bytes);
    while buf.len() >= 512 {
        let chunk: Vec<u8> = buf.drain(..512).collect();
        blocks.push(generator.generate_data(&chunk)?);
        *written += 512;
    }
    Ok(())
}
