//! Bit-exact USTAR header field I/O (spec §4.1).
//!
//! A header is a single 512-byte [`Block`](crate::Block). This module only
//! knows how to read and write the fields of one such block; it has no
//! notion of a stream of blocks, that's [`crate::generator`] and
//! [`crate::parser`].

pub mod pax;

use crate::error::{Result, TarError};
use crate::stat::FileStat;
use crate::Block;
use core::ops::Range;

const NAME: Range<usize> = 0..100;
const MODE: Range<usize> = 100..108;
const UID: Range<usize> = 108..116;
const GID: Range<usize> = 116..124;
const SIZE: Range<usize> = 124..136;
const MTIME: Range<usize> = 136..148;
const CHECKSUM: Range<usize> = 148..156;
const TYPEFLAG: usize = 156;
// linkname (157..257) is unused by this crate but kept NUL per the layout.
const MAGIC: Range<usize> = 257..263;
const VERSION: Range<usize> = 263..265;
const UNAME: Range<usize> = 265..297;
const GNAME: Range<usize> = 297..329;
// devmajor (329..337) / devminor (337..345) are unused, kept NUL.
const PREFIX: Range<usize> = 345..500;
// bytes 500..512 are reserved padding, kept NUL.

const USTAR_MAGIC: &[u8; 6] = b"ustar\0";
const USTAR_VERSION: &[u8; 2] = b"00";

/// The three typeflags this codec understands; anything else decodes as
/// [`TarError::InvalidHeader`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TypeFlag {
    File,
    Directory,
    Extended,
}

impl TypeFlag {
    const fn as_byte(self) -> u8 {
        match self {
            TypeFlag::File => b'0',
            TypeFlag::Directory => b'5',
            TypeFlag::Extended => b'x',
        }
    }

    fn from_byte(b: u8) -> Result<Self> {
        match b {
            b'0' => Ok(TypeFlag::File),
            b'5' => Ok(TypeFlag::Directory),
            b'x' => Ok(TypeFlag::Extended),
            other => Err(TarError::InvalidHeader(format!(
                "unknown typeflag {:?}",
                other as char
            ))),
        }
    }
}

/// Fields needed to build one header block (spec §4.1's field table, minus
/// bytes this crate never populates: linkname, devmajor, devminor).
#[derive(Debug, Clone)]
pub struct HeaderFields<'a> {
    pub path: &'a str,
    pub typeflag: TypeFlag,
    pub size: u64,
    pub stat: &'a FileStat,
}

/// Fields decoded out of one header block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedHeader {
    pub path: String,
    pub typeflag: TypeFlag,
    pub size: u64,
    pub stat: FileStat,
}

/// True if every one of the block's 512 bytes is zero.
pub fn is_zero_block(block: &Block) -> bool {
    block.iter().all(|b| *b == 0)
}

/// Builds a fully checksummed header block.
pub fn build_header_block(fields: &HeaderFields<'_>) -> Result<Block> {
    fields.stat.validate()?;

    let mut block = [0u8; 512];

    let (name, prefix) = split_path(fields.path)?;
    block[NAME].copy_from_slice(&name);
    block[PREFIX].copy_from_slice(&prefix);

    write_octal(&mut block[MODE], fields.stat.mode as u64)?;
    write_octal(&mut block[UID], fields.stat.uid as u64)?;
    write_octal(&mut block[GID], fields.stat.gid as u64)?;
    write_octal(&mut block[SIZE], fields.size)?;
    write_octal(&mut block[MTIME], fields.stat.mtime)?;

    block[TYPEFLAG] = fields.typeflag.as_byte();
    block[MAGIC].copy_from_slice(USTAR_MAGIC);
    block[VERSION].copy_from_slice(USTAR_VERSION);

    write_padded_string(&mut block[UNAME], &fields.stat.uname)?;
    write_padded_string(&mut block[GNAME], &fields.stat.gname)?;

    write_checksum(&mut block);
    Ok(block)
}

/// Decodes and validates a header block (checksum, magic, version,
/// typeflag).
pub fn decode_header_block(block: &Block) -> Result<DecodedHeader> {
    verify_checksum(block)?;

    if &block[MAGIC] != USTAR_MAGIC {
        return Err(TarError::InvalidHeader(format!(
            "bad magic {:?}",
            &block[MAGIC]
        )));
    }
    if &block[VERSION] != USTAR_VERSION {
        return Err(TarError::InvalidHeader(format!(
            "bad version {:?}",
            &block[VERSION]
        )));
    }

    let typeflag = TypeFlag::from_byte(block[TYPEFLAG])?;
    let name = read_padded_string(&block[NAME])?;
    let prefix = read_padded_string(&block[PREFIX])?;
    let path = join_path(&prefix, &name);

    let stat = FileStat {
        mode: read_octal(&block[MODE])? as u32,
        mtime: read_octal(&block[MTIME])?,
        uid: read_octal(&block[UID])? as u32,
        gid: read_octal(&block[GID])? as u32,
        uname: read_padded_string(&block[UNAME])?,
        gname: read_padded_string(&block[GNAME])?,
    };
    let size = read_octal(&block[SIZE])?;

    Ok(DecodedHeader {
        path,
        typeflag,
        size,
        stat,
    })
}

/// Splits `path` per spec §4.1's path encoding policy. Callers are
/// responsible for having already routed paths longer than 255 bytes
/// through a PAX extended header; this function only handles the
/// name/prefix split for paths up to 255 bytes (or an empty path, which is
/// legal immediately after an extended header).
fn split_path(path: &str) -> Result<([u8; 100], [u8; 155])> {
    let bytes = path.as_bytes();
    if bytes.len() > 255 {
        return Err(TarError::InvalidFileName(format!(
            "path of {} bytes exceeds 255 and was not preceded by an extended header",
            bytes.len()
        )));
    }

    let mut name = [0u8; 100];
    let mut prefix = [0u8; 155];

    if bytes.len() <= 100 {
        name[..bytes.len()].copy_from_slice(bytes);
    } else {
        let split = bytes.len() - 100;
        prefix[..split].copy_from_slice(&bytes[..split]);
        name.copy_from_slice(&bytes[split..]);
    }

    Ok((name, prefix))
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}{name}")
    }
}

/// Right-justifies `value` in octal within `field.len() - 1` characters,
/// left-pads with ASCII `'0'`, and terminates with one NUL.
fn write_octal(field: &mut [u8], value: u64) -> Result<()> {
    let digits = field.len() - 1;
    let rendered = format!("{value:o}");
    if rendered.len() > digits {
        return Err(TarError::InvalidStat(format!(
            "value {value} does not fit {digits} octal digits"
        )));
    }
    for b in field.iter_mut() {
        *b = b'0';
    }
    let start = digits - rendered.len();
    field[start..digits].copy_from_slice(rendered.as_bytes());
    field[digits] = 0;
    Ok(())
}

/// Writes the checksum field using the `"\0 "` suffix convention spec §4.1
/// mandates on write.
fn write_checksum(block: &mut Block) {
    let sum = compute_checksum(block);
    let rendered = format!("{sum:o}");
    let digits = 6;
    debug_assert!(rendered.len() <= digits, "checksum overflowed 6 octal digits");
    let field = &mut block[CHECKSUM];
    for b in field.iter_mut() {
        *b = b'0';
    }
    let start = digits - rendered.len();
    field[start..digits].copy_from_slice(rendered.as_bytes());
    field[digits] = 0;
    field[digits + 1] = b' ';
}

/// Sum of all 512 header bytes, treating the checksum field as eight ASCII
/// spaces, per spec §4.1.
fn compute_checksum(block: &Block) -> u64 {
    let mut sum = 0u64;
    for (i, b) in block.iter().enumerate() {
        if CHECKSUM.contains(&i) {
            sum += 0x20;
        } else {
            sum += *b as u64;
        }
    }
    sum
}

fn verify_checksum(block: &Block) -> Result<()> {
    let stored = read_octal(&block[CHECKSUM])?;
    let computed = compute_checksum(block);
    if stored != computed {
        return Err(TarError::InvalidHeader(format!(
            "checksum mismatch: header says {stored}, computed {computed}"
        )));
    }
    Ok(())
}

/// Reads ASCII out of `field` up to the first NUL or space (this crate
/// writes NUL, but tolerates the historical space-padded convention on
/// read, per spec §9), then parses it as octal.
fn read_octal(field: &[u8]) -> Result<u64> {
    let end = memchr::memchr2(0, b' ', field).unwrap_or(field.len());
    let text = core::str::from_utf8(&field[..end])
        .map_err(|_| TarError::InvalidHeader("non-UTF-8 numeric field".into()))?
        .trim();
    if text.is_empty() {
        return Ok(0);
    }
    u64::from_str_radix(text, 8)
        .map_err(|_| TarError::InvalidHeader(format!("malformed octal field {text:?}")))
}

fn write_padded_string(field: &mut [u8], value: &str) -> Result<()> {
    let bytes = value.as_bytes();
    if bytes.len() > field.len() {
        return Err(TarError::InvalidStat(format!(
            "{value:?} does not fit {} bytes",
            field.len()
        )));
    }
    for b in field.iter_mut() {
        *b = 0;
    }
    field[..bytes.len()].copy_from_slice(bytes);
    Ok(())
}

fn read_padded_string(field: &[u8]) -> Result<String> {
    let end = memchr::memchr(0, field).unwrap_or(field.len());
    core::str::from_utf8(&field[..end])
        .map(str::to_string)
        .map_err(|_| TarError::InvalidHeader("non-UTF-8 string field".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_stat() -> FileStat {
        FileStat {
            size: 0,
            mode: 0o777,
            mtime: 0,
            uid: 0,
            gid: 0,
            uname: String::new(),
            gname: String::new(),
        }
    }

    #[test]
    fn round_trips_short_path() {
        let fields = HeaderFields {
            path: "a",
            typeflag: TypeFlag::File,
            size: 3,
            stat: &base_stat(),
        };
        let block = build_header_block(&fields).unwrap();
        let decoded = decode_header_block(&block).unwrap();
        assert_eq!(decoded.path, "a");
        assert_eq!(decoded.size, 3);
        assert_eq!(decoded.typeflag, TypeFlag::File);
        assert_eq!(decoded.stat.mode, 0o777);
    }

    #[test]
    fn path_boundary_100() {
        let path = "a".repeat(100);
        let fields = HeaderFields {
            path: &path,
            typeflag: TypeFlag::File,
            size: 0,
            stat: &base_stat(),
        };
        let block = build_header_block(&fields).unwrap();
        assert_eq!(&block[NAME], path.as_bytes());
        assert!(block[PREFIX].iter().all(|b| *b == 0));
        let decoded = decode_header_block(&block).unwrap();
        assert_eq!(decoded.path, path);
    }

    #[test]
    fn path_boundary_101_to_255() {
        for len in [101usize, 155, 255] {
            let path = "b".repeat(len);
            let fields = HeaderFields {
                path: &path,
                typeflag: TypeFlag::File,
                size: 0,
                stat: &base_stat(),
            };
            let block = build_header_block(&fields).unwrap();
            let decoded = decode_header_block(&block).unwrap();
            assert_eq!(decoded.path, path, "len={len}");
        }
    }

    #[test]
    fn path_over_255_rejected() {
        let path = "c".repeat(256);
        let fields = HeaderFields {
            path: &path,
            typeflag: TypeFlag::File,
            size: 0,
            stat: &base_stat(),
        };
        assert!(matches!(
            build_header_block(&fields),
            Err(TarError::InvalidFileName(_))
        ));
    }

    #[test]
    fn checksum_self_consistent() {
        let fields = HeaderFields {
            path: "checksum-me",
            typeflag: TypeFlag::File,
            size: 42,
            stat: &base_stat(),
        };
        let block = build_header_block(&fields).unwrap();
        assert!(decode_header_block(&block).is_ok());
    }

    #[test]
    fn checksum_mismatch_detected() {
        let fields = HeaderFields {
            path: "x",
            typeflag: TypeFlag::File,
            size: 0,
            stat: &base_stat(),
        };
        let mut block = build_header_block(&fields).unwrap();
        // Flip a byte outside the checksum field itself.
        block[0] ^= 0xFF;
        assert!(matches!(
            decode_header_block(&block),
            Err(TarError::InvalidHeader(_))
        ));
    }

    #[test]
    fn bad_magic_rejected() {
        let fields = HeaderFields {
            path: "x",
            typeflag: TypeFlag::File,
            size: 0,
            stat: &base_stat(),
        };
        let mut block = build_header_block(&fields).unwrap();
        block[MAGIC].copy_from_slice(b"GARBAG");
        // Corrupting the magic bytes also perturbs the checksum; either
        // check failing first is a correct rejection.
        assert!(decode_header_block(&block).is_err());
    }

    #[test]
    fn gibberish_block_is_invalid_header() {
        let block = [0xABu8; 512];
        assert!(matches!(
            decode_header_block(&block),
            Err(TarError::InvalidHeader(_))
        ));
    }
}
