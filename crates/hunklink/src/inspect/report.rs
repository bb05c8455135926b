//! Block-by-block report of a hunk-format file.
//!
//! Works on both object files (HUNK_UNIT streams) and load files
//! (HUNK_HEADER streams); the first block decides which framing applies.

use crate::hunk::cursor::Cursor;
use crate::hunk::error::HunkError;
use crate::hunk::types::{ext_ids, BlockType};

use super::hexdump::hexdump;
use super::stabs::{decode_debug, DebugInfo};

/// Describe every block of `data` as human-readable lines.
pub fn inspect_file(data: &[u8]) -> Result<Vec<String>, HunkError> {
    let mut cursor = Cursor::new(data);
    let mut lines = Vec::new();

    let first_offset = cursor.position();
    let raw = cursor.read_u32_be()?;
    match BlockType::from_raw(raw) {
        Some(BlockType::Header) => {
            lines.push("HUNK_HEADER: AmigaDOS load file".to_string());
            inspect_header(&mut cursor, &mut lines)?;
        }
        Some(BlockType::Unit) => {
            let name = cursor.read_name()?;
            lines.push(format!("HUNK_UNIT: object file, unit '{name}'"));
        }
        _ => {
            return Err(HunkError::UnknownBlock {
                raw,
                offset: first_offset,
            })
        }
    }

    let mut hunk_index = 0usize;
    let mut after_end = true;
    while !cursor.is_eof() {
        let block_offset = cursor.position();
        let raw = cursor.read_u32_be()?;
        let block = BlockType::from_raw(raw).ok_or(HunkError::UnknownBlock {
            raw,
            offset: block_offset,
        })?;
        after_end = false;

        match block {
            BlockType::Name => {
                let name = cursor.read_name()?;
                lines.push(format!("HUNK_NAME: '{name}'"));
            }

            BlockType::Unit => {
                let name = cursor.read_name()?;
                lines.push(format!("HUNK_UNIT: unit '{name}'"));
                hunk_index = 0;
            }

            BlockType::Code | BlockType::Data => {
                let nwords = cursor.read_u32_be()?;
                let body = cursor.read_bytes(nwords as usize * 4)?;
                lines.push(format!("{block}: {} bytes", body.len()));
                lines.extend(hexdump(body).into_iter().map(|l| format!("  {l}")));
            }

            BlockType::Bss => {
                let nwords = cursor.read_u32_be()?;
                lines.push(format!("HUNK_BSS: {} bytes of zeroed memory", nwords * 4));
            }

            BlockType::Reloc32 => {
                lines.push("HUNK_RELOC32:".to_string());
                loop {
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
                        offsets.push(format!("0x{:08X}", cursor.read_u32_be()?));
                    }
                    lines.push(format!(
                        "  {count} offsets referencing hunk #{target}: {}",
                        offsets.join(", ")
                    ));
                }
            }

            BlockType::Ext => {
                lines.push("HUNK_EXT:".to_string());
                inspect_ext(&mut cursor, &mut lines)?;
            }

            BlockType::Symbol => {
                lines.push("HUNK_SYMBOL:".to_string());
                loop {
                    let nwords = cursor.read_u32_be()?;
                    if nwords == 0 {
                        break;
                    }
                    let name = cursor.read_name_words(nwords)?;
                    let value = cursor.read_u32_be()?;
                    lines.push(format!("  {name} = 0x{value:08X}"));
                }
            }

            BlockType::Debug => {
                let nwords = cursor.read_u32_be()?;
                let payload = cursor.read_bytes(nwords as usize * 4)?;
                lines.push(format!("HUNK_DEBUG: {} bytes", payload.len()));
                inspect_debug(payload, &mut lines);
            }

            BlockType::End => {
                lines.push(format!("HUNK_END: hunk #{hunk_index} finished"));
                hunk_index += 1;
                after_end = true;
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

    if !after_end {
        return Err(HunkError::UnexpectedEof {
            context: "hunk stream",
        });
    }
    Ok(lines)
}

fn inspect_header(cursor: &mut Cursor<'_>, lines: &mut Vec<String>) -> Result<(), HunkError> {
    loop {
        let nwords = cursor.read_u32_be()?;
        if nwords == 0 {
            break;
        }
        let name = cursor.read_name_words(nwords)?;
        lines.push(format!("  resident library: '{name}'"));
    }
    let num_hunks = cursor.read_u32_be()?;
    let first = cursor.read_u32_be()?;
    let last = cursor.read_u32_be()?;
    lines.push(format!("  {num_hunks} hunks (first {first}, last {last})"));
    for index in first..=last {
        let size_words = cursor.read_u32_be()? & 0x3FFF_FFFF;
        lines.push(format!("  size of hunk #{index}: {} bytes", size_words * 4));
    }
    Ok(())
}

fn inspect_ext(cursor: &mut Cursor<'_>, lines: &mut Vec<String>) -> Result<(), HunkError> {
    loop {
        let header = cursor.read_u32_be()?;
        if header == 0 {
            break;
        }
        let tag = header >> 24;
        let name = cursor.read_name_words(header & 0x00FF_FFFF)?;
        match tag {
            ext_ids::EXT_DEF | ext_ids::EXT_ABS | ext_ids::EXT_RES => {
                let value = cursor.read_u32_be()?;
                lines.push(format!(
                    "  definition (type {tag}): {name} = 0x{value:08X}"
                ));
            }
            ext_ids::EXT_REF32 | ext_ids::EXT_REF16 | ext_ids::EXT_REF8 => {
                let count = cursor.read_u32_be()?;
                let needed = count as usize * 4;
                if cursor.remaining() < needed {
                    return Err(HunkError::TooShort {
                        offset: cursor.position(),
                        needed,
                        available: cursor.remaining(),
                    });
                }
                let mut offsets = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    offsets.push(format!("0x{:08X}", cursor.read_u32_be()?));
                }
                lines.push(format!(
                    "  references (type {tag}) to {name}: {}",
                    offsets.join(", ")
                ));
            }
            _ => {
                lines.push(format!("  unsupported symbol type {tag} for {name}"));
                if tag < 128 {
                    cursor.skip(4)?;
                } else {
                    if tag == ext_ids::EXT_COMMON {
                        cursor.skip(4)?;
                    }
                    let count = cursor.read_u32_be()?;
                    cursor.skip(count as usize * 4)?;
                }
            }
        }
    }
    Ok(())
}

fn inspect_debug(payload: &[u8], lines: &mut Vec<String>) {
    match decode_debug(payload) {
        DebugInfo::Line {
            section_offset,
            file,
            entries,
        } => {
            lines.push(format!(
                "  LINE debug info for '{file}' (section offset 0x{section_offset:08X}):"
            ));
            for (line, address) in entries {
                lines.push(format!("  line {line} at address 0x{address:08X}"));
            }
        }
        DebugInfo::Stabs(entries) => {
            lines.push(format!("  stab table, {} entries:", entries.len()));
            for stab in entries {
                lines.push(format!(
                    "  {}: '{}' other=0x{:02X} desc=0x{:04X} value=0x{:08X}",
                    stab.type_name, stab.string, stab.other, stab.desc, stab.value
                ));
            }
        }
        DebugInfo::Unknown => {
            lines.push("  unrecognized debug format:".to_string());
            lines.extend(hexdump(payload).into_iter().map(|l| format!("  {l}")));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hunk::types::block_ids;

    fn word(out: &mut Vec<u8>, w: u32) {
        out.extend_from_slice(&w.to_be_bytes());
    }

    #[test]
    fn object_file_report() {
        let mut obj = Vec::new();
        word(&mut obj, block_ids::HUNK_UNIT);
        word(&mut obj, 1);
        obj.extend_from_slice(b"u\0\0\0");
        word(&mut obj, block_ids::HUNK_NAME);
        word(&mut obj, 1);
        obj.extend_from_slice(b"text");
        word(&mut obj, block_ids::HUNK_CODE);
        word(&mut obj, 1);
        obj.extend_from_slice(&[0x4E, 0x75, 0x00, 0x00]);
        word(&mut obj, block_ids::HUNK_EXT);
        word(&mut obj, (ext_ids::EXT_DEF << 24) | 1);
        obj.extend_from_slice(b"_f\0\0");
        word(&mut obj, 0);
        word(&mut obj, 0);
        word(&mut obj, block_ids::HUNK_END);

        let lines = inspect_file(&obj).unwrap();
        assert_eq!(lines[0], "HUNK_UNIT: object file, unit 'u'");
        assert_eq!(lines[1], "HUNK_NAME: 'text'");
        assert_eq!(lines[2], "HUNK_CODE: 4 bytes");
        assert!(lines[3].contains("4e 75 00 00"));
        assert!(lines.iter().any(|l| l.contains("_f = 0x00000000")));
        assert_eq!(lines.last().unwrap(), "HUNK_END: hunk #0 finished");
    }

    #[test]
    fn load_file_report() {
        let mut exe = Vec::new();
        word(&mut exe, block_ids::HUNK_HEADER);
        word(&mut exe, 0);
        word(&mut exe, 1);
        word(&mut exe, 0);
        word(&mut exe, 0);
        word(&mut exe, 1);
        word(&mut exe, block_ids::HUNK_BSS);
        word(&mut exe, 1);
        word(&mut exe, block_ids::HUNK_END);

        let lines = inspect_file(&exe).unwrap();
        assert_eq!(lines[0], "HUNK_HEADER: AmigaDOS load file");
        assert!(lines.iter().any(|l| l.contains("1 hunks (first 0, last 0)")));
        assert!(lines.iter().any(|l| l.contains("size of hunk #0: 4 bytes")));
        assert!(lines.iter().any(|l| l == "HUNK_BSS: 4 bytes of zeroed memory"));
    }

    #[test]
    fn truncated_stream_is_reported() {
        let mut obj = Vec::new();
        word(&mut obj, block_ids::HUNK_UNIT);
        word(&mut obj, 1);
        obj.extend_from_slice(b"u\0\0\0");
        word(&mut obj, block_ids::HUNK_CODE);
        word(&mut obj, 4); // promises 16 bytes, delivers none

        assert!(matches!(
            inspect_file(&obj),
            Err(HunkError::TooShort { .. })
        ));
    }

    #[test]
    fn stream_must_end_after_hunk_end() {
        let mut obj = Vec::new();
        word(&mut obj, block_ids::HUNK_UNIT);
        word(&mut obj, 1);
        obj.extend_from_slice(b"u\0\0\0");
        word(&mut obj, block_ids::HUNK_CODE);
        word(&mut obj, 0);

        assert!(matches!(
            inspect_file(&obj),
            Err(HunkError::UnexpectedEof { .. })
        ));
    }
}
