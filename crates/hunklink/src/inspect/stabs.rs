//! HUNK_DEBUG payload decoding.
//!
//! The debug block's content was never standardized, so compilers invented
//! their own layouts. Two are common enough to decode here:
//!
//! - the `LINE` format written by SAS/C and VBCC: a section offset, the
//!   magic "LINE", the source file name, then line/address pairs;
//! - the stabs tables written by GCC: a 36-byte preamble, then 12-byte
//!   stab records whose leading `N_SO` entry carries the record count in
//!   its string-index field, with the string table following the records.
//!
//! Anything else is reported as unknown and left to the hex dump.

use crate::hunk::cursor::Cursor;

/// A decoded HUNK_DEBUG payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebugInfo {
    /// SAS/C and VBCC line tables.
    Line {
        /// Offset of the debugged section within its hunk.
        section_offset: u32,
        /// Source file name.
        file: String,
        /// (line number, address) pairs.
        entries: Vec<(u32, u32)>,
    },
    /// GCC stab table.
    Stabs(Vec<StabEntry>),
    /// Unrecognized payload.
    Unknown,
}

/// One 12-byte stab record with its string resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StabEntry {
    pub type_name: String,
    pub raw_type: u8,
    pub other: u8,
    pub desc: u16,
    pub value: u32,
    pub string: String,
}

/// Decode a HUNK_DEBUG payload.
pub fn decode_debug(data: &[u8]) -> DebugInfo {
    if data.len() >= 8 && &data[4..8] == b"LINE" {
        if let Some(info) = decode_line(data) {
            return info;
        }
        return DebugInfo::Unknown;
    }
    match decode_stabs(data) {
        Some(entries) => DebugInfo::Stabs(entries),
        None => DebugInfo::Unknown,
    }
}

fn decode_line(data: &[u8]) -> Option<DebugInfo> {
    let mut cursor = Cursor::new(data);
    let section_offset = cursor.read_u32_be().ok()?;
    cursor.skip(4).ok()?; // "LINE"
    let fname_words = cursor.read_u32_be().ok()?;
    let file = cursor.read_name_words(fname_words).ok()?;

    let total_words = data.len() / 4;
    // section offset, magic, and file name length each took one word
    let mut remaining = total_words.checked_sub(fname_words as usize + 3)?;
    let mut entries = Vec::new();
    while remaining >= 2 {
        let line = cursor.read_u32_be().ok()?;
        let address = cursor.read_u32_be().ok()?;
        entries.push((line, address));
        remaining -= 2;
    }
    Some(DebugInfo::Line {
        section_offset,
        file,
        entries,
    })
}

const STAB_SIZE: usize = 12;
const N_EXT: u8 = 0x01;

struct RawStab {
    strx: u32,
    stab_type: u8,
    other: u8,
    desc: u16,
    value: u32,
}

fn read_stab(cursor: &mut Cursor<'_>) -> Option<RawStab> {
    Some(RawStab {
        strx: cursor.read_u32_be().ok()?,
        stab_type: cursor.read_u8().ok()?,
        other: cursor.read_u8().ok()?,
        desc: cursor.read_u16_be().ok()?,
        value: cursor.read_u32_be().ok()?,
    })
}

fn decode_stabs(data: &[u8]) -> Option<Vec<StabEntry>> {
    // GCC places the stab table 36 bytes into the block. The first stab is
    // N_SO and its string index doubles as the number of stabs that follow.
    let table = data.get(36..)?;
    let mut cursor = Cursor::new(table);
    let first = read_stab(&mut cursor)?;
    if stab_type_name(first.stab_type) != Some("N_SO") {
        return None;
    }
    let nstabs = first.strx as usize;
    if nstabs == 0 || table.len() < STAB_SIZE * nstabs {
        return None;
    }
    let strtab = &table[STAB_SIZE * nstabs..];

    let mut entries = Vec::with_capacity(nstabs);
    entries.push(make_entry(&first, strtab));
    for _ in 1..nstabs {
        let stab = read_stab(&mut cursor)?;
        entries.push(make_entry(&stab, strtab));
    }
    Some(entries)
}

fn make_entry(stab: &RawStab, strtab: &[u8]) -> StabEntry {
    let type_name = match stab_type_name(stab.stab_type) {
        Some(name) => name.to_string(),
        // external symbols carry the N_EXT bit on top of the base type
        None => match stab_type_name(stab.stab_type & !N_EXT) {
            Some(name) => format!("{name} (external)"),
            None => format!("0x{:02x}", stab.stab_type),
        },
    };
    StabEntry {
        type_name,
        raw_type: stab.stab_type,
        other: stab.other,
        desc: stab.desc,
        value: stab.value,
        string: string_at(strtab, stab.strx as usize),
    }
}

/// NUL-terminated string at `index` in the string table.
fn string_at(strtab: &[u8], index: usize) -> String {
    let Some(tail) = strtab.get(index..) else {
        return String::new();
    };
    let end = tail.iter().position(|&b| b == 0).unwrap_or(tail.len());
    String::from_utf8_lossy(&tail[..end]).into_owned()
}

/// Stab type names from binutils' stab.def (the commonly seen subset).
fn stab_type_name(stab_type: u8) -> Option<&'static str> {
    Some(match stab_type {
        0x00 => "N_UNDF",
        0x02 => "N_ABS",
        0x04 => "N_TEXT",
        0x06 => "N_DATA",
        0x08 => "N_BSS",
        0x0a => "N_INDR",
        0x0c => "N_FN_SEQ",
        0x12 => "N_COMM",
        0x14 => "N_SETA",
        0x16 => "N_SETT",
        0x18 => "N_SETD",
        0x1a => "N_SETB",
        0x1c => "N_SETV",
        0x1e => "N_WARNING",
        0x1f => "N_FN",
        0x20 => "N_GSYM",
        0x22 => "N_FNAME",
        0x24 => "N_FUN",
        0x26 => "N_STSYM",
        0x28 => "N_LCSYM",
        0x2a => "N_MAIN",
        0x2c => "N_ROSYM",
        0x30 => "N_PC",
        0x3c => "N_OPT",
        0x40 => "N_RSYM",
        0x44 => "N_SLINE",
        0x46 => "N_DSLINE",
        0x48 => "N_BSLINE",
        0x60 => "N_SSYM",
        0x64 => "N_SO",
        0x66 => "N_OSO",
        0x80 => "N_LSYM",
        0x82 => "N_BINCL",
        0x84 => "N_SOL",
        0xa0 => "N_PSYM",
        0xa2 => "N_EINCL",
        0xa4 => "N_ENTRY",
        0xc0 => "N_LBRAC",
        0xc2 => "N_EXCL",
        0xc4 => "N_SCOPE",
        0xe0 => "N_RBRAC",
        0xe2 => "N_BCOMM",
        0xe4 => "N_ECOMM",
        0xe8 => "N_ECOML",
        0xfe => "N_LENG",
        _ => return None,
    })
}
