//! Error type shared by every component of the codec.

/// Everything that can go wrong while generating or parsing a tar stream.
///
/// All variants are fatal to the archive being produced or consumed; there
/// is no local recovery (see spec §7 "Propagation policy").
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TarError {
    /// A header failed checksum/magic/version validation, used an unknown
    /// typeflag, or contained a malformed octal/PAX field.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// `Parser::write` (or a facade `write`) received a block whose length
    /// was not exactly 512 bytes.
    #[error("block must be 512 bytes, got {0}")]
    BlockSize(usize),

    /// Generator input violated a numeric or string-length limit.
    #[error("invalid stat: {0}")]
    InvalidStat(String),

    /// Generator input path was empty with no preceding extended header, or
    /// longer than 255 bytes.
    #[error("invalid file name: {0}")]
    InvalidFileName(String),

    /// An operation was illegal in the generator's, parser's, or facade's
    /// current state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A write arrived after the archive had already ended, or a non-zero
    /// block followed the first null block.
    #[error("write past end of archive: {0}")]
    EndOfArchive(String),

    /// A branch that should be logically unreachable was taken; this
    /// signals a bug in this crate.
    #[error("unreachable state reached: {0}")]
    UndefinedBehaviour(String),
}

pub type Result<T> = core::result::Result<T, TarError>;
