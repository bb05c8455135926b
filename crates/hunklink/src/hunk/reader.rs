//! Object-file (HUNK_UNIT) block decoder.
//!
//! The block stream is stateful: a HUNK_NAME buffers the name of the next
//! content block, and HUNK_EXT / HUNK_SYMBOL / HUNK_RELOC32 / HUNK_DEBUG
//! blocks attach to the most recently opened content block. HUNK_END closes
//! the current hunk and assigns it the next per-unit hunk index; those
//! indices are what RELOC32 groups reference, so at the end of the unit
//! every index-keyed relocation is rewritten to the `(unit, class, name)`
//! site it denotes.

use log::{debug, warn};

use super::cursor::Cursor;
use super::error::HunkError;
use super::types::{
    ext_ids, BlockType, RefWidth, Reference, Reloc, RelocTarget, SectionHunk, SectionKey,
    SectionKind, Symbol,
};
use crate::link::database::Database;

/// What one call to [`read_object`] decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitSummary {
    /// Name from the HUNK_UNIT block (the last one, if a file carries
    /// several units).
    pub name: String,
    /// Content hunks completed by a HUNK_END.
    pub hunks: usize,
    /// Global symbols defined.
    pub symbols: usize,
    /// EXT records with a symbol type this linker does not handle; they
    /// were reported and skipped.
    pub unsupported_symbols: usize,
}

/// Decode state for the unit currently being read.
struct UnitState {
    name: String,
    /// Name buffered by a HUNK_NAME block, consumed by the next content block.
    pending_name: Option<String>,
    /// The open content hunk that metadata blocks attach to. Pushed to the
    /// database when its HUNK_END arrives.
    current: Option<SectionHunk>,
    /// Per-unit hunk index -> (class, name), filled in HUNK_END order.
    sites: Vec<(SectionKind, String)>,
}

impl UnitState {
    fn new(name: String) -> Self {
        UnitState {
            name,
            pending_name: None,
            current: None,
            sites: Vec::new(),
        }
    }

    fn anchor(&mut self, block: &'static str, offset: usize) -> Result<&mut SectionHunk, HunkError> {
        self.current
            .as_mut()
            .ok_or(HunkError::StrayBlock { block, offset })
    }
}

/// Decode one object file and pool its hunks and symbols into `db`.
///
/// Hunks are registered as each HUNK_END completes them, so a stream that
/// fails mid-decode leaves its earlier hunks (and any symbols already
/// defined) in the database; the caller decides whether to keep linking.
pub fn read_object(data: &[u8], db: &mut Database) -> Result<UnitSummary, HunkError> {
    let mut cursor = Cursor::new(data);

    let first = cursor.read_u32_be()?;
    if BlockType::from_raw(first) != Some(BlockType::Unit) {
        return Err(HunkError::InvalidValue {
            context: "first block of an object file (HUNK_UNIT expected)",
            value: first,
        });
    }
    let mut state = UnitState::new(cursor.read_name()?);
    debug!("unit name: {}", state.name);

    let mut summary = UnitSummary {
        name: state.name.clone(),
        hunks: 0,
        symbols: 0,
        unsupported_symbols: 0,
    };
    // EOF is only legal directly after a HUNK_END
    let mut after_end = false;

    loop {
        if cursor.is_eof() {
            if after_end {
                break;
            }
            return Err(HunkError::UnexpectedEof {
                context: "object unit body",
            });
        }

        let block_offset = cursor.position();
        let raw = cursor.read_u32_be()?;
        let block = BlockType::from_raw(raw).ok_or(HunkError::UnknownBlock {
            raw,
            offset: block_offset,
        })?;
        debug!("{block} at offset 0x{block_offset:X}");
        after_end = false;

        match block {
            BlockType::Unit => {
                // A fresh unit in the same stream: close out the previous one
                if state.current.is_some() {
                    return Err(HunkError::StrayBlock {
                        block: "HUNK_UNIT",
                        offset: block_offset,
                    });
                }
                normalize_unit(db, &state)?;
                state = UnitState::new(cursor.read_name()?);
                debug!("unit name: {}", state.name);
                summary.name = state.name.clone();
            }

            BlockType::Name => {
                let name = cursor.read_name()?;
                debug!("hunk name: {name}");
                state.pending_name = Some(name);
            }

            BlockType::Code => read_content(&mut cursor, &mut state, SectionKind::Code)?,
            BlockType::Data => read_content(&mut cursor, &mut state, SectionKind::Data)?,

            BlockType::Bss => {
                let nwords = cursor.read_u32_be()?;
                let name = state.pending_name.take().unwrap_or_default();
                debug!("bss hunk '{name}', {} bytes", nwords * 4);
                state.current = Some(SectionHunk::new(
                    state.name.clone(),
                    SectionKind::Bss,
                    name,
                    Vec::new(),
                    nwords * 4,
                ));
            }

            BlockType::Reloc32 => read_reloc32(&mut cursor, &mut state, block_offset)?,

            BlockType::Ext => read_ext(&mut cursor, &mut state, db, &mut summary, block_offset)?,

            BlockType::Symbol => {
                // Debug symbols carry no link information
                loop {
                    let nwords = cursor.read_u32_be()?;
                    if nwords == 0 {
                        break;
                    }
                    let name = cursor.read_name_words(nwords)?;
                    let value = cursor.read_u32_be()?;
                    debug!("symbol {name} = 0x{value:08X}");
                }
            }

            BlockType::Debug => {
                let nwords = cursor.read_u32_be()?;
                debug!("skipping {} bytes of debug data", nwords as usize * 4);
                cursor.skip(nwords as usize * 4)?;
            }

            BlockType::End => {
                let hunk = state.current.take().ok_or(HunkError::StrayBlock {
                    block: "HUNK_END",
                    offset: block_offset,
                })?;
                debug!(
                    "hunk #{} finished: {} '{}', {} bytes",
                    state.sites.len(),
                    hunk.kind,
                    hunk.name,
                    hunk.size
                );
                state.sites.push((hunk.kind, hunk.name.clone()));
                db.add_hunk(hunk);
                summary.hunks += 1;
                after_end = true;
            }

            BlockType::Header
            | BlockType::Reloc16
            | BlockType::Reloc8
            | BlockType::Overlay
            | BlockType::Break
            | BlockType::DRel32
            | BlockType::DRel16
            | BlockType::DRel8
            | BlockType::Lib
            | BlockType::Index => {
                return Err(HunkError::UnsupportedBlock {
                    block: block.name(),
                    offset: block_offset,
                });
            }
        }
    }

    normalize_unit(db, &state)?;
    summary.symbols = db
        .symbols()
        .values()
        .filter(|s| s.site.unit == summary.name)
        .count();
    Ok(summary)
}

fn read_content(
    cursor: &mut Cursor<'_>,
    state: &mut UnitState,
    kind: SectionKind,
) -> Result<(), HunkError> {
    let nwords = cursor.read_u32_be()?;
    let body = cursor.read_bytes(nwords as usize * 4)?.to_vec();
    let name = state.pending_name.take().unwrap_or_default();
    debug!("{kind} hunk '{name}', {} bytes", body.len());
    let size = body.len() as u32;
    state.current = Some(SectionHunk::new(
        state.name.clone(),
        kind,
        name,
        body,
        size,
    ));
    Ok(())
}

/// HUNK_RELOC32: groups of {count, target hunk index, count offsets} until
/// a zero count.
fn read_reloc32(
    cursor: &mut Cursor<'_>,
    state: &mut UnitState,
    block_offset: usize,
) -> Result<(), HunkError> {
    loop {
        let count = cursor.read_u32_be()?;
        if count == 0 {
            break;
        }
        // Bound the allocation before trusting the count
        let needed = (count as usize + 1) * 4;
        if cursor.remaining() < needed {
            return Err(HunkError::TooShort {
                offset: cursor.position(),
                needed,
                available: cursor.remaining(),
            });
        }
        let target = cursor.read_u32_be()?;
        let hunk = state.anchor("HUNK_RELOC32", block_offset)?;
        for _ in 0..count {
            let offset = cursor.read_u32_be()?;
            hunk.relocs.push(Reloc {
                target: RelocTarget::Index(target),
                offset,
            });
        }
        debug!("{count} relocations referencing hunk #{target}");
    }
    Ok(())
}

/// HUNK_EXT: records of {type/length word, name, payload} until a zero word.
/// The high byte of the header is the symbol type, the low 24 bits the name
/// length in longwords.
fn read_ext(
    cursor: &mut Cursor<'_>,
    state: &mut UnitState,
    db: &mut Database,
    summary: &mut UnitSummary,
    block_offset: usize,
) -> Result<(), HunkError> {
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
                let hunk = state.anchor("HUNK_EXT", block_offset)?;
                debug!("definition of symbol (type {tag}): {name} = 0x{value:08X}");
                let site = hunk.key();
                db.define_symbol(name, Symbol { site, value });
            }

            ext_ids::EXT_REF32 | ext_ids::EXT_REF16 | ext_ids::EXT_REF8 => {
                let width = RefWidth::from_ext_tag(tag).unwrap_or(RefWidth::Ref32);
                let count = cursor.read_u32_be()?;
                let needed = count as usize * 4;
                if cursor.remaining() < needed {
                    return Err(HunkError::TooShort {
                        offset: cursor.position(),
                        needed,
                        available: cursor.remaining(),
                    });
                }
                let hunk = state.anchor("HUNK_EXT", block_offset)?;
                for _ in 0..count {
                    let offset = cursor.read_u32_be()?;
                    debug!("{width} reference to symbol {name} at offset 0x{offset:08X}");
                    hunk.refs.push(Reference {
                        symbol: name.clone(),
                        width,
                        offset,
                    });
                }
            }

            _ => {
                warn!("symbol type {tag} not supported, skipping record for {name}");
                summary.unsupported_symbols += 1;
                skip_ext_payload(cursor, tag)?;
            }
        }
    }
    Ok(())
}

/// Best-effort skip of an EXT record payload this linker does not process.
/// Types below 128 are definitions with one value word; COMMON adds a size
/// word before its reference list; everything else is a reference list.
fn skip_ext_payload(cursor: &mut Cursor<'_>, tag: u32) -> Result<(), HunkError> {
    if tag < 128 {
        cursor.skip(4)?;
        return Ok(());
    }
    if tag == ext_ids::EXT_COMMON {
        cursor.skip(4)?;
    }
    let count = cursor.read_u32_be()?;
    cursor.skip(count as usize * 4)
}

/// Rewrite every index-keyed relocation of the unit's hunks to the section
/// site the index denotes.
fn normalize_unit(db: &mut Database, state: &UnitState) -> Result<(), HunkError> {
    for hunk in db.unit_hunks_mut(&state.name) {
        for reloc in &mut hunk.relocs {
            if let RelocTarget::Index(index) = reloc.target {
                let (kind, name) =
                    state
                        .sites
                        .get(index as usize)
                        .ok_or(HunkError::InvalidValue {
                            context: "relocation target hunk index",
                            value: index,
                        })?;
                reloc.target = RelocTarget::Site(SectionKey {
                    unit: state.name.clone(),
                    kind: *kind,
                    name: name.clone(),
                });
            }
        }
    }
    Ok(())
}
