//! Parsing facade (spec §4.4): reassembles PAX extended headers behind the
//! scenes and dispatches plain file/directory events to a visitor, driving
//! [`Parser`] one block at a time.

use crate::entry::{EntryKind, Header, Token};
use crate::error::{Result, TarError};
use crate::layout::pax;
use crate::parser::Parser;
use crate::Block;

/// Receives the archive's logical content. Default method bodies are
/// no-ops, so implementors only override what they care about — the same
/// shape as a SAX-style callback interface.
pub trait ArchiveVisitor {
    /// Called once per directory entry, with its final `/`-terminated path.
    fn on_directory(&mut self, header: &Header) {
        let _ = header;
    }

    /// Called once per file entry, before any of its data arrives. `size`
    /// is `header.size`.
    fn on_file_start(&mut self, header: &Header) {
        let _ = header;
    }

    /// Called once per data block belonging to the file most recently
    /// started. `end` is true on the last call for that file.
    fn on_file_data(&mut self, path: &str, bytes: &[u8], end: bool) {
        let _ = (path, bytes, end);
    }

    /// Called once, after the archive's two terminating null blocks.
    fn on_end(&mut self) {}
}

#[derive(Debug, Clone, Default)]
struct PendingExtended {
    path: Option<String>,
    extra: Vec<(String, String)>,
}

/// Feeds arbitrary-length byte chunks to an internal [`Parser`], re-chunking
/// them to 512-byte blocks internally, and turns its tokens into
/// [`ArchiveVisitor`] calls, transparently folding a preceding PAX extended
/// header into the real entry that follows it.
pub struct ArchiveReader<V: ArchiveVisitor> {
    parser: Parser,
    visitor: V,
    input_buf: Vec<u8>,
    extended_buf: Vec<u8>,
    pending: Option<PendingExtended>,
    current_file_path: Option<String>,
}

impl<V: ArchiveVisitor> ArchiveReader<V> {
    pub fn new(visitor: V) -> Self {
        Self {
            parser: Parser::new(),
            visitor,
            input_buf: Vec::new(),
            extended_buf: Vec::new(),
            pending: None,
            current_file_path: None,
        }
    }

    /// Feeds an arbitrary-length chunk of archive bytes. Internally buffers
    /// it alongside any carry-over from previous calls and peels off
    /// complete 512-byte blocks as they become available, dispatching zero
    /// or more visitor calls per block.
    pub fn write(&mut self, chunk: &[u8]) -> Result<()> {
        self.input_buf.extend_from_slice(chunk);
        while self.input_buf.len() >= 512 {
            let block: Vec<u8> = self.input_buf.drain(..512).collect();
            self.write_block(&block)?;
        }
        Ok(())
    }

    /// True once the archive's terminating null blocks have been seen.
    pub fn is_ended(&self) -> bool {
        self.parser.is_ended()
    }

    /// True once every block handed to `write` so far has been consumed
    /// and dispatched. Since dispatch is synchronous, this is only ever
    /// false while fewer than 512 bytes of a block are buffered internally
    /// — there is no asynchronous callback queue to drain.
    pub fn is_settled(&self) -> bool {
        true
    }

    /// Consumes the reader, handing back the visitor.
    pub fn into_visitor(self) -> V {
        self.visitor
    }

    pub fn visitor(&self) -> &V {
        &self.visitor
    }

    pub fn visitor_mut(&mut self) -> &mut V {
        &mut self.visitor
    }

    fn write_block(&mut self, block: &[u8]) -> Result<()> {
        match self.parser.write(block)? {
            None => Ok(()),
            Some(Token::Header(header)) => self.dispatch_header(header),
            Some(Token::Data(data)) => self.dispatch_data(&data.bytes, data.end),
            Some(Token::End) => {
                self.visitor.on_end();
                Ok(())
            }
        }
    }

    fn dispatch_header(&mut self, header: Header) -> Result<()> {
        if header.kind == EntryKind::Extended {
            self.extended_buf.clear();
            self.pending = Some(PendingExtended::default());
            return Ok(());
        }

        let (resolved_path, extra) = match self.pending.take() {
            Some(pending) => (pending.path.unwrap_or(header.path), pending.extra),
            None => (header.path, Vec::new()),
        };
        let header = Header {
            path: resolved_path,
            extra,
            ..header
        };

        match header.kind {
            EntryKind::Directory => {
                self.visitor.on_directory(&header);
                Ok(())
            }
            EntryKind::File => {
                self.current_file_path = Some(header.path.clone());
                self.visitor.on_file_start(&header);
                if header.size == 0 {
                    self.current_file_path = None;
                }
                Ok(())
            }
            EntryKind::Extended => Err(TarError::UndefinedBehaviour(
                "extended header token reached post-filter dispatch".into(),
            )),
        }
    }

    fn dispatch_data(&mut self, bytes: &[u8], end: bool) -> Result<()> {
        if let Some(pending) = self.pending.as_mut() {
            self.extended_buf.extend_from_slice(bytes);
            if end {
                let records = pax::decode_records(&self.extended_buf)?;
                for (key, value) in records {
                    if key == "path" {
                        pending.path = Some(value);
                    } else {
                        pending.extra.push((key, value));
                    }
                }
            }
            return Ok(());
        }

        if let Some(path) = self.current_file_path.clone() {
            self.visitor.on_file_data(&path, bytes, end);
            if end {
                self.current_file_path = None;
            }
        }
        Ok(())
    }
}

/// Convenience for tests and small tools: collects every entry into memory
/// instead of streaming them to a caller-defined visitor.
#[derive(Debug, Clone, Default)]
pub struct CollectingVisitor {
    pub directories: Vec<Header>,
    pub files: Vec<(Header, Vec<u8>)>,
    pub ended: bool,
}

impl ArchiveVisitor for CollectingVisitor {
    fn on_directory(&mut self, header: &Header) {
        self.directories.push(header.clone());
    }

    fn on_file_start(&mut self, header: &Header) {
        self.files.push((header.clone(), Vec::new()));
    }

    fn on_file_data(&mut self, path: &str, bytes: &[u8], _end: bool) {
        if let Some((header, buf)) = self.files.last_mut() {
            debug_assert_eq!(header.path, path);
            buf.extend_from_slice(bytes);
        }
    }

    fn on_end(&mut self) {
        self.ended = true;
    }
}

/// Parses a complete in-memory archive (any chunking, so long as the
/// concatenation is a multiple of 512 bytes) into a [`CollectingVisitor`]
/// in one call.
pub fn parse_all(blocks: &[Block]) -> Result<CollectingVisitor> {
    let mut reader = ArchiveReader::new(CollectingVisitor::default());
    for block in blocks {
        reader.write(block)?;
    }
    Ok(reader.into_visitor())
}
