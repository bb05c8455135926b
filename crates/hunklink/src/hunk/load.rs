//! Load-file (executable) reader.
//!
//! Parses a HUNK_HEADER stream into its content hunks with their reloc and
//! symbol tables. Load files are simpler than object units: hunks have no
//! names or external symbols, and the header declares every hunk's
//! allocation size up front.

use log::debug;

use super::cursor::Cursor;
use super::error::HunkError;
use super::types::{block_ids, BlockType, RelocGroup, SectionKind};

/// One content hunk of a load file.
#[derive(Debug, Clone)]
pub struct LoadHunk {
    /// Zero-based position in the header's size table.
    pub index: usize,
    pub kind: SectionKind,
    /// Allocation size in bytes from the header size table.
    pub alloc_size: u32,
    /// Body bytes. Empty for BSS.
    pub data: Vec<u8>,
    pub relocs: Vec<RelocGroup>,
    /// Debug symbols from HUNK_SYMBOL blocks.
    pub symbols: Vec<(String, u32)>,
}

/// A parsed load file.
#[derive(Debug, Clone)]
pub struct LoadFile {
    pub hunks: Vec<LoadHunk>,
    pub first_hunk: u32,
    pub last_hunk: u32,
}

/// Parse a complete load file from raw bytes.
pub fn read_load_file(data: &[u8]) -> Result<LoadFile, HunkError> {
    let mut cursor = Cursor::new(data);

    let magic = cursor.read_u32_be()?;
    if magic != block_ids::HUNK_HEADER {
        return Err(HunkError::BadMagic { found: magic });
    }

    // Resident library names: strings terminated by an empty one
    loop {
        let nwords = cursor.read_u32_be()?;
        if nwords == 0 {
            break;
        }
        cursor.skip(nwords as usize * 4)?;
    }

    let num_hunks = cursor.read_u32_be()? as usize;
    if num_hunks > 65536 {
        return Err(HunkError::InvalidValue {
            context: "hunk count",
            value: num_hunks as u32,
        });
    }
    let first_hunk = cursor.read_u32_be()?;
    let last_hunk = cursor.read_u32_be()?;

    let mut alloc_sizes = Vec::with_capacity(num_hunks);
    for _ in 0..num_hunks {
        // upper two bits are memory attribute flags
        let size_words = cursor.read_u32_be()? & 0x3FFF_FFFF;
        alloc_sizes.push(size_words * 4);
    }
    debug!(
        "load file: {num_hunks} hunks (first {first_hunk}, last {last_hunk})"
    );

    let mut hunks: Vec<LoadHunk> = Vec::with_capacity(num_hunks);
    let mut current: usize = 0;

    while !cursor.is_eof() {
        let block_offset = cursor.position();
        let raw = cursor.read_u32_be()?;
        let block = BlockType::from_raw(raw).ok_or(HunkError::UnknownBlock {
            raw,
            offset: block_offset,
        })?;
        debug!("{block} at offset 0x{block_offset:X}");

        match block {
            BlockType::Code | BlockType::Data => {
                let nwords = cursor.read_u32_be()?;
                let body = cursor.read_bytes(nwords as usize * 4)?.to_vec();
                let kind = if block == BlockType::Code {
                    SectionKind::Code
                } else {
                    SectionKind::Data
                };
                hunks.push(LoadHunk {
                    index: current,
                    kind,
                    alloc_size: alloc_sizes.get(current).copied().unwrap_or(nwords * 4),
                    data: body,
                    relocs: Vec::new(),
                    symbols: Vec::new(),
                });
            }

            BlockType::Bss => {
                let nwords = cursor.read_u32_be()?;
                hunks.push(LoadHunk {
                    index: current,
                    kind: SectionKind::Bss,
                    alloc_size: alloc_sizes.get(current).copied().unwrap_or(nwords * 4),
                    data: Vec::new(),
                    relocs: Vec::new(),
                    symbols: Vec::new(),
                });
            }

            BlockType::Reloc32 => loop {
                let count = cursor.read_u32_be()?;
                if count == 0 {
                    break;
                }
                let needed = (count as usize + 1) * 4;
                if cursor.remaining() < needed {
                    return Err(HunkError::TooShort {
                        offset: cursor.position(),
                        needed,
                        available: cursor.remaining(),
                    });
                }
                let target = cursor.read_u32_be()?;
                let mut offsets = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    offsets.push(cursor.read_u32_be()?);
                }
                let hunk = hunks.last_mut().ok_or(HunkError::StrayBlock {
                    block: "HUNK_RELOC32",
                    offset: block_offset,
                })?;
                hunk.relocs.push(RelocGroup { target, offsets });
            },

            BlockType::Symbol => loop {
                let nwords = cursor.read_u32_be()?;
                if nwords == 0 {
                    break;
                }
                let name = cursor.read_name_words(nwords)?;
                let value = cursor.read_u32_be()?;
                let hunk = hunks.last_mut().ok_or(HunkError::StrayBlock {
                    block: "HUNK_SYMBOL",
                    offset: block_offset,
                })?;
                hunk.symbols.push((name, value));
            },

            BlockType::Debug => {
                let nwords = cursor.read_u32_be()?;
                cursor.skip(nwords as usize * 4)?;
            }

            // some linkers name hunks even in load files
            BlockType::Name => {
                let name = cursor.read_name()?;
                debug!("hunk name: {name}");
            }

            BlockType::End => {
                current += 1;
                if current >= num_hunks {
                    break;
                }
            }

            BlockType::Header => {
                return Err(HunkError::InvalidValue {
                    context: "HUNK_HEADER inside the file body",
                    value: raw,
                });
            }

            other => {
                return Err(HunkError::UnsupportedBlock {
                    block: other.name(),
                    offset: block_offset,
                });
            }
        }
    }

    if hunks.len() != num_hunks {
        return Err(HunkError::HunkCountMismatch {
            expected: num_hunks,
            found: hunks.len(),
        });
    }

    Ok(LoadFile {
        hunks,
        first_hunk,
        last_hunk,
    })
}
