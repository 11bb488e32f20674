//! The streaming facade (spec §4.4): two thin coordinators that re-chunk
//! arbitrary-sized input/output to 512-byte boundaries and drive
//! [`crate::generator::Generator`]/[`crate::parser::Parser`].

pub mod generate;
pub mod parse;

pub use generate::{ArchiveWriter, Payload};
pub use parse::{ArchiveReader, ArchiveVisitor};
