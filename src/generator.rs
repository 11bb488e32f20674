//! Block-emitting state machine that turns a sequence of entries into a
//! USTAR/PAX block stream (spec §4.2).

use crate::error::{Result, TarError};
use crate::layout::{self, pax, HeaderFields, TypeFlag};
use crate::stat::FileStat;
use crate::Block;

const BLOCKSIZE: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DataKind {
    File,
    Extended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Header,
    Data { remaining: u64, kind: DataKind },
    Null,
    Ended,
}

/// Drives the generator side of the USTAR/PAX codec one block at a time.
///
/// A fresh `Generator` starts in the `Header` state and is only usable
/// until two [`Generator::generate_end`] calls have been made; every method
/// after that returns [`TarError::InvalidState`].
#[derive(Debug)]
pub struct Generator {
    state: State,
    /// Set right after an extended header's data has been fully emitted;
    /// cleared by the next `generate_file`/`generate_directory`. Lets an
    /// empty path through exactly once, per spec §4.2's contract.
    pending_extended: bool,
}

impl Default for Generator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator {
    pub fn new() -> Self {
        Self {
            state: State::Header,
            pending_extended: false,
        }
    }

    /// Emits a header block for a regular file. If `stat.size == 0` the
    /// generator stays in the `Header` state (no data blocks follow);
    /// otherwise it moves to `Data` and expects exactly
    /// `ceil(stat.size / 512)` `generate_data` calls.
    pub fn generate_file(&mut self, path: &str, stat: &FileStat) -> Result<Block> {
        self.require_state_header()?;
        self.check_path(path)?;

        let block = layout::build_header_block(&HeaderFields {
            path,
            typeflag: TypeFlag::File,
            size: stat.size,
            stat,
        })?;

        self.pending_extended = false;
        self.state = if stat.size == 0 {
            State::Header
        } else {
            State::Data {
                remaining: stat.size,
                kind: DataKind::File,
            }
        };
        Ok(block)
    }

    /// Emits a header block for a directory. The stored path always ends
    /// with `/` and the stored size is always 0, regardless of
    /// `stat.size` (spec §3 "Directory canonicalization").
    pub fn generate_directory(&mut self, path: &str, stat: Option<&FileStat>) -> Result<Block> {
        self.require_state_header()?;

        let owned;
        let stat = match stat {
            Some(s) => s,
            None => {
                owned = FileStat::default();
                &owned
            }
        };
        let mut stat_for_wire = stat.clone();
        stat_for_wire.size = 0;

        let stored_path = if path.is_empty() || path.ends_with('/') {
            path.to_string()
        } else {
            format!("{path}/")
        };
        self.check_path(&stored_path)?;

        let block = layout::build_header_block(&HeaderFields {
            path: &stored_path,
            typeflag: TypeFlag::Directory,
            size: 0,
            stat: &stat_for_wire,
        })?;

        self.pending_extended = false;
        self.state = State::Header;
        Ok(block)
    }

    /// Emits an extended header announcing `size` bytes of PAX payload to
    /// follow. The normal header's name field is conventionally
    /// `"./PaxHeader"` (spec §9, advisory only).
    pub fn generate_extended(&mut self, size: u32) -> Result<Block> {
        self.require_state_header()?;

        let stat = FileStat::default();
        let block = layout::build_header_block(&HeaderFields {
            path: "./PaxHeader",
            typeflag: TypeFlag::Extended,
            size: size as u64,
            stat: &stat,
        })?;

        self.state = State::Data {
            remaining: size as u64,
            kind: DataKind::Extended,
        };
        Ok(block)
    }

    /// Emits one zero-padded 512-byte data block for the file or extended
    /// record currently open. `chunk` must be 1..=512 bytes; if fewer than
    /// 512 bytes remain for this entry, `chunk` must be exactly that many
    /// bytes (spec §4.2).
    pub fn generate_data(&mut self, chunk: &[u8]) -> Result<Block> {
        let (remaining, kind) = match self.state {
            State::Data { remaining, kind } => (remaining, kind),
            _ => {
                return Err(TarError::InvalidState(
                    "generate_data called outside a Data state".into(),
                ))
            }
        };

        if chunk.is_empty() || chunk.len() > BLOCKSIZE {
            return Err(TarError::InvalidState(format!(
                "data chunk must be 1..=512 bytes, got {}",
                chunk.len()
            )));
        }
        if (chunk.len() as u64) < remaining && chunk.len() < BLOCKSIZE {
            return Err(TarError::InvalidState(format!(
                "short chunk of {} bytes with {} bytes still remaining",
                chunk.len(),
                remaining
            )));
        }

        let mut block = [0u8; BLOCKSIZE];
        block[..chunk.len()].copy_from_slice(chunk);

        let new_remaining = remaining.saturating_sub(BLOCKSIZE as u64);
        self.state = if new_remaining == 0 {
            self.pending_extended = kind == DataKind::Extended;
            State::Header
        } else {
            State::Data {
                remaining: new_remaining,
                kind,
            }
        };
        Ok(block)
    }

    /// Emits one all-zero block. The first call moves `Header -> Null`;
    /// the second moves `Null -> Ended`, completing the archive.
    pub fn generate_end(&mut self) -> Result<Block> {
        match self.state {
            State::Header => {
                log::debug!("emitting first null block");
                self.state = State::Null;
                Ok([0u8; BLOCKSIZE])
            }
            State::Null => {
                log::debug!("emitting second null block, archive ended");
                self.state = State::Ended;
                Ok([0u8; BLOCKSIZE])
            }
            State::Data { .. } => Err(TarError::InvalidState(
                "generate_end called mid-file, data still pending".into(),
            )),
            State::Ended => Err(TarError::InvalidState(
                "generate_end called after the archive already ended".into(),
            )),
        }
    }

    /// True once two terminating null blocks have been emitted.
    pub fn is_ended(&self) -> bool {
        self.state == State::Ended
    }

    fn require_state_header(&self) -> Result<()> {
        match self.state {
            State::Header => Ok(()),
            State::Data { .. } => Err(TarError::InvalidState(
                "cannot start a new header while data is still pending".into(),
            )),
            State::Null | State::Ended => Err(TarError::InvalidState(
                "cannot start a new header after the archive has ended".into(),
            )),
        }
    }

    fn check_path(&self, path: &str) -> Result<()> {
        if path.is_empty() {
            if self.pending_extended {
                return Ok(());
            }
            return Err(TarError::InvalidFileName(
                "empty path with no preceding extended header".into(),
            ));
        }
        if path.len() > 255 {
            return Err(TarError::InvalidFileName(format!(
                "path of {} bytes exceeds 255; precede it with an extended header",
                path.len()
            )));
        }
        Ok(())
    }
}

/// Encodes `path` as one or more PAX records, for use when a path exceeds
/// 255 bytes and must be framed through an extended header instead of the
/// normal name/prefix split.
pub fn encode_long_path(path: &str) -> Vec<u8> {
    pax::encode_path_record(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stat(size: u64) -> FileStat {
        FileStat {
            size,
            mode: 0o644,
            ..FileStat::default()
        }
    }

    #[test]
    fn empty_file_emits_only_a_header() {
        let mut gen = Generator::new();
        gen.generate_file("empty.txt", &stat(0)).unwrap();
        // Immediately ready for the next header or an end marker.
        gen.generate_directory("d", None).unwrap();
    }

    #[test]
    fn file_size_exactly_512() {
        let mut gen = Generator::new();
        gen.generate_file("f", &stat(512)).unwrap();
        let data = vec![b'a'; 512];
        gen.generate_data(&data).unwrap();
        // Back in Header state, ready for the next entry.
        gen.generate_directory("d", None).unwrap();
    }

    #[test]
    fn file_size_513_requires_two_chunks() {
        let mut gen = Generator::new();
        gen.generate_file("f", &stat(513)).unwrap();
        gen.generate_data(&[b'a'; 512]).unwrap();
        gen.generate_data(&[b'a'; 1]).unwrap();
        gen.generate_directory("d", None).unwrap();
    }

    #[test]
    fn short_chunk_with_remaining_data_is_invalid() {
        let mut gen = Generator::new();
        gen.generate_file("f", &stat(1000)).unwrap();
        assert!(matches!(
            gen.generate_data(&[b'a'; 10]),
            Err(TarError::InvalidState(_))
        ));
    }

    #[test]
    fn directory_forces_size_zero_and_trailing_slash() {
        let mut gen = Generator::new();
        let block = gen.generate_directory("d", Some(&stat(999))).unwrap();
        let decoded = layout::decode_header_block(&block).unwrap();
        assert_eq!(decoded.path, "d/");
        assert_eq!(decoded.size, 0);
    }

    #[test]
    fn generate_file_twice_without_data_is_invalid_state() {
        let mut gen = Generator::new();
        gen.generate_file("a", &stat(10)).unwrap();
        assert!(matches!(
            gen.generate_file("b", &stat(0)),
            Err(TarError::InvalidState(_))
        ));
    }

    #[test]
    fn two_ends_then_terminal() {
        let mut gen = Generator::new();
        gen.generate_end().unwrap();
        gen.generate_end().unwrap();
        assert!(gen.is_ended());
        assert!(matches!(gen.generate_end(), Err(TarError::InvalidState(_))));
    }

    #[test]
    fn long_path_requires_preceding_extended_header() {
        let mut gen = Generator::new();
        let long_path = "z".repeat(256);
        assert!(matches!(
            gen.generate_file(&long_path, &stat(0)),
            Err(TarError::InvalidFileName(_))
        ));

        let record = encode_long_path(&long_path);
        gen.generate_extended(record.len() as u32).unwrap();
        gen.generate_data(&record).unwrap();
        // Empty path is legal exactly once, right after the extended header.
        gen.generate_file("", &stat(0)).unwrap();
    }

    #[test]
    fn empty_path_without_pending_extended_is_invalid() {
        let mut gen = Generator::new();
        assert!(matches!(
            gen.generate_file("", &stat(0)),
            Err(TarError::InvalidFileName(_))
        ));
    }
}
