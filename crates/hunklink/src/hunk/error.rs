use std::fmt;

/// Errors that can occur while decoding a hunk-format stream.
///
/// All variants are self-contained (no std::io references) so the library
/// stays usable on plain byte slices. Variants carry the byte offset where
/// the problem was detected whenever one is meaningful.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HunkError {
    /// Stream is too short to contain the expected data.
    TooShort {
        offset: usize,
        needed: usize,
        available: usize,
    },
    /// Load file does not start with the HUNK_HEADER magic.
    BadMagic { found: u32 },
    /// Encountered an unrecognized block type id.
    UnknownBlock { raw: u32, offset: usize },
    /// Encountered a block type that is valid hunk format but that this
    /// tool does not process (library/index blocks, short relocations, ...).
    UnsupportedBlock { block: &'static str, offset: usize },
    /// A block that must follow a content block appeared without one.
    StrayBlock { block: &'static str, offset: usize },
    /// The stream ended somewhere other than directly after a HUNK_END.
    UnexpectedEof { context: &'static str },
    /// A string length field exceeds reasonable bounds.
    InvalidStringLength { length: u32, offset: usize },
    /// The number of hunks found doesn't match the header.
    HunkCountMismatch { expected: usize, found: usize },
    /// An invalid value was encountered in a specific field.
    InvalidValue { context: &'static str, value: u32 },
}

impl fmt::Display for HunkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HunkError::TooShort {
                offset,
                needed,
                available,
            } => {
                write!(
                    f,
                    "at offset 0x{offset:X}: need {needed} bytes, only {available} available"
                )
            }
            HunkError::BadMagic { found } => {
                write!(
                    f,
                    "not an AmigaDOS executable: expected magic 0x000003F3, found 0x{found:08X}"
                )
            }
            HunkError::UnknownBlock { raw, offset } => {
                write!(f, "unknown block type 0x{raw:08X} at offset 0x{offset:X}")
            }
            HunkError::UnsupportedBlock { block, offset } => {
                write!(f, "{block} block at offset 0x{offset:X} is not supported")
            }
            HunkError::StrayBlock { block, offset } => {
                write!(
                    f,
                    "{block} block at offset 0x{offset:X} appears outside a hunk"
                )
            }
            HunkError::UnexpectedEof { context } => {
                write!(f, "unexpected end of file while reading {context}")
            }
            HunkError::InvalidStringLength { length, offset } => {
                write!(
                    f,
                    "invalid string length {length} longwords at offset 0x{offset:X}"
                )
            }
            HunkError::HunkCountMismatch { expected, found } => {
                write!(f, "header declares {expected} hunks but found {found}")
            }
            HunkError::InvalidValue { context, value } => {
                write!(f, "invalid {context}: 0x{value:08X}")
            }
        }
    }
}

impl std::error::Error for HunkError {}
