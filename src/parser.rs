//! Block-consuming state machine that turns a USTAR/PAX block stream into
//! tokens (spec §4.3).

use crate::entry::{Data, End, EntryKind, Header, Token};
use crate::error::{Result, TarError};
use crate::layout::{self, TypeFlag};
use crate::Block;

const BLOCKSIZE: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Header,
    Data { remaining: u64 },
    Null,
    Ended,
}

/// Drives the parser side of the USTAR/PAX codec one block at a time.
///
/// A fresh `Parser` starts in the `Header` state. [`Parser::write`] takes
/// exactly one 512-byte block and returns at most one token; callers feed
/// it blocks until it reports [`Token::End`] (or an error).
#[derive(Debug)]
pub struct Parser {
    state: State,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    pub fn new() -> Self {
        Self {
            state: State::Header,
        }
    }

    /// True once the second all-zero block has been seen.
    pub fn is_ended(&self) -> bool {
        self.state == State::Ended
    }

    /// Feeds one 512-byte block and returns the token it produced, if any.
    /// `block.len()` must be exactly 512 or this returns
    /// [`TarError::BlockSize`].
    pub fn write(&mut self, block: &[u8]) -> Result<Option<Token>> {
        if block.len() != BLOCKSIZE {
            return Err(TarError::BlockSize(block.len()));
        }
        let mut fixed = [0u8; BLOCKSIZE];
        fixed.copy_from_slice(block);

        match self.state {
            State::Header => self.write_header(&fixed),
            State::Data { remaining } => Ok(Some(self.write_data(&fixed, remaining))),
            State::Null => self.write_null(&fixed),
            State::Ended => Err(TarError::EndOfArchive(
                "write called after the archive already ended".into(),
            )),
        }
    }

    fn write_header(&mut self, block: &Block) -> Result<Option<Token>> {
        if layout::is_zero_block(block) {
            log::debug!("first null block, expecting one more to end the archive");
            self.state = State::Null;
            return Ok(None);
        }

        let decoded = layout::decode_header_block(block)?;
        if decoded.path.is_empty() && decoded.typeflag != TypeFlag::Extended {
            log::warn!("header decoded with an empty path");
        }
        let kind = match decoded.typeflag {
            TypeFlag::File => EntryKind::File,
            TypeFlag::Directory => EntryKind::Directory,
            TypeFlag::Extended => EntryKind::Extended,
        };

        let header = Header {
            kind,
            path: decoded.path,
            size: decoded.size,
            mode: decoded.stat.mode,
            mtime: decoded.stat.mtime,
            uid: decoded.stat.uid,
            gid: decoded.stat.gid,
            uname: decoded.stat.uname,
            gname: decoded.stat.gname,
            extra: Vec::new(),
        };

        self.state = match kind {
            EntryKind::Directory => State::Header,
            EntryKind::File if decoded.size == 0 => State::Header,
            EntryKind::File | EntryKind::Extended => State::Data {
                remaining: decoded.size,
            },
        };

        Ok(Some(Token::Header(header)))
    }

    fn write_data(&mut self, block: &Block, remaining: u64) -> Token {
        let useful = remaining.min(BLOCKSIZE as u64) as usize;
        let end = remaining <= BLOCKSIZE as u64;

        let new_remaining = remaining.saturating_sub(BLOCKSIZE as u64);
        self.state = if new_remaining == 0 {
            State::Header
        } else {
            State::Data {
                remaining: new_remaining,
            }
        };

        Token::Data(Data {
            bytes: block[..useful].to_vec(),
            end,
        })
    }

    fn write_null(&mut self, block: &Block) -> Result<Option<Token>> {
        if layout::is_zero_block(block) {
            log::debug!("second null block, archive ended gracefully");
            self.state = State::Ended;
            Ok(Some(Token::End))
        } else {
            log::warn!("non-zero block after the first null block, archive malformed");
            Err(TarError::EndOfArchive(
                "non-zero block following the first null terminator block".into(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::Generator;
    use crate::stat::FileStat;

    fn file_stat(size: u64) -> FileStat {
        FileStat {
            size,
            mode: 0o644,
            ..FileStat::default()
        }
    }

    #[test]
    fn block_size_mismatch_is_an_error() {
        let mut parser = Parser::new();
        assert!(matches!(
            parser.write(&[0u8; 10]),
            Err(TarError::BlockSize(10))
        ));
    }

    #[test]
    fn gibberish_header_is_invalid_header() {
        let mut parser = Parser::new();
        assert!(matches!(
            parser.write(&[0xAB; 512]),
            Err(TarError::InvalidHeader(_))
        ));
    }

    #[test]
    fn empty_file_emits_one_header_token_only() {
        let mut gen = Generator::new();
        let header_block = gen.generate_file("empty.txt", &file_stat(0)).unwrap();

        let mut parser = Parser::new();
        let token = parser.write(&header_block).unwrap().unwrap();
        match token {
            Token::Header(h) => {
                assert_eq!(h.kind, EntryKind::File);
                assert_eq!(h.size, 0);
            }
            other => panic!("expected Header, got {other:?}"),
        }
    }

    #[test]
    fn file_size_512_single_full_data_token() {
        let mut gen = Generator::new();
        let header_block = gen.generate_file("f", &file_stat(512)).unwrap();
        let data_block = gen.generate_data(&[b'a'; 512]).unwrap();

        let mut parser = Parser::new();
        parser.write(&header_block).unwrap();
        let token = parser.write(&data_block).unwrap().unwrap();
        match token {
            Token::Data(d) => {
                assert_eq!(d.bytes.len(), 512);
                assert!(d.end);
            }
            other => panic!("expected Data, got {other:?}"),
        }
    }

    #[test]
    fn file_size_513_two_data_tokens() {
        let mut gen = Generator::new();
        let header_block = gen.generate_file("f", &file_stat(513)).unwrap();
        let d1 = gen.generate_data(&[b'a'; 512]).unwrap();
        let d2 = gen.generate_data(&[b'b'; 1]).unwrap();

        let mut parser = Parser::new();
        parser.write(&header_block).unwrap();
        let t1 = parser.write(&d1).unwrap().unwrap();
        let t2 = parser.write(&d2).unwrap().unwrap();
        match t1 {
            Token::Data(d) => {
                assert_eq!(d.bytes.len(), 512);
                assert!(!d.end);
            }
            other => panic!("expected Data, got {other:?}"),
        }
        match t2 {
            Token::Data(d) => {
                assert_eq!(d.bytes, vec![b'b']);
                assert!(d.end);
            }
            other => panic!("expected Data, got {other:?}"),
        }
    }

    #[test]
    fn two_zero_blocks_yield_end() {
        let mut parser = Parser::new();
        assert_eq!(parser.write(&[0u8; 512]).unwrap(), None);
        assert_eq!(parser.write(&[0u8; 512]).unwrap(), Some(Token::End));
        assert!(parser.is_ended());
    }

    #[test]
    fn write_after_end_is_end_of_archive() {
        let mut parser = Parser::new();
        parser.write(&[0u8; 512]).unwrap();
        parser.write(&[0u8; 512]).unwrap();
        assert!(matches!(
            parser.write(&[0u8; 512]),
            Err(TarError::EndOfArchive(_))
        ));
    }

    #[test]
    fn malformed_end_one_null_then_a_header() {
        let mut gen = Generator::new();
        let header_block = gen.generate_file("f", &file_stat(0)).unwrap();

        let mut parser = Parser::new();
        assert_eq!(parser.write(&[0u8; 512]).unwrap(), None);
        assert!(matches!(
            parser.write(&header_block),
            Err(TarError::EndOfArchive(_))
        ));
    }
}
