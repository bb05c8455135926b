//! A linker and inspector for the AmigaDOS hunk object/executable format.
//!
//! The linker reads relocatable object files (HUNK_UNIT streams), pools
//! their section hunks and global symbols, resolves cross-unit references,
//! merges same-named sections, and emits a loadable executable
//! (HUNK_HEADER stream) with consolidated 32-bit relocation tables. The
//! inspector pretty-prints the block structure of either file kind.

pub mod driver;
pub mod error;
pub mod hunk;
pub mod inspect;
pub mod link;

pub use driver::{link_files, LinkReport};
pub use error::Error;
pub use hunk::error::HunkError;
pub use hunk::load::{read_load_file, LoadFile, LoadHunk};
pub use hunk::reader::{read_object, UnitSummary};
pub use hunk::types::{
    BlockType, RefWidth, Reference, Reloc, RelocGroup, RelocTarget, SectionHunk, SectionKey,
    SectionKind, Symbol,
};
pub use hunk::writer::write_executable;
pub use inspect::{hexdump, inspect_file};
pub use link::database::{Database, Placement};
pub use link::engine::{OutputHunk, ResolveReport};
