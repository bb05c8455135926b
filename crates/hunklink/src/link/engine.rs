//! The link passes.
//!
//! Linking runs three passes in a fixed order over the database:
//!
//! 1. **resolve** — turn external references into relocations against the
//!    defining section site, writing the symbol's value into the slot.
//! 2. **place** — assign every section name an output hunk index (classes
//!    in code, bss, data order; names in arrival order) and every fragment
//!    its byte displacement inside the merged hunk.
//! 3. **merge** — add target displacements into relocated slots, shift each
//!    fragment's relocation offsets by its own displacement, concatenate
//!    same-named bodies, and group the surviving relocations by target
//!    output hunk.

use std::collections::BTreeMap;

use log::{debug, error, info, warn};

use crate::hunk::types::{RefWidth, Reloc, RelocGroup, RelocTarget, SectionKey, SectionKind};
use crate::link::database::{Database, Placement};

/// One hunk of the output executable: the merged body of every input hunk
/// sharing a class and name, plus its consolidated relocation table.
#[derive(Debug, Clone)]
pub struct OutputHunk {
    /// Zero-based position in the executable's header size table.
    pub index: u32,
    pub kind: SectionKind,
    pub name: String,
    /// Concatenated fragment bodies. Empty for BSS.
    pub data: Vec<u8>,
    /// Total byte size (BSS fragments contribute their declared size).
    pub size: u32,
    /// Relocation groups ordered by target class, then target name.
    pub relocs: Vec<RelocGroup>,
}

/// Counts of problems found while resolving references.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveReport {
    /// References whose symbol has no definition anywhere.
    pub undefined: usize,
    /// References with a width the linker does not patch.
    pub unsupported_width: usize,
}

/// Pass 1: convert every reference in code and data hunks into a relocation
/// against the symbol's defining site, and write the symbol value into the
/// referencing slot. Undefined symbols are reported and leave the slot as
/// the compiler emitted it.
pub fn resolve(db: &mut Database) -> ResolveReport {
    let mut report = ResolveReport::default();
    let (symbols, buckets) = db.resolve_view();
    for bucket in buckets {
        for hunks in bucket.values_mut() {
            for hunk in hunks {
                for reference in std::mem::take(&mut hunk.refs) {
                    let Some(symbol) = symbols.get(&reference.symbol) else {
                        error!("undefined symbol {}", reference.symbol);
                        report.undefined += 1;
                        continue;
                    };
                    if reference.width != RefWidth::Ref32 {
                        warn!(
                            "{} reference to symbol {} not supported, skipped",
                            reference.width, reference.symbol
                        );
                        report.unsupported_width += 1;
                        continue;
                    }
                    if !write_slot(&mut hunk.data, reference.offset, symbol.value) {
                        error!(
                            "reference to {} at offset 0x{:08X} lies outside hunk {}:{}",
                            reference.symbol, reference.offset, hunk.unit, hunk.name
                        );
                        continue;
                    }
                    debug!(
                        "resolved {} -> {} + 0x{:08X}",
                        reference.symbol, symbol.site, symbol.value
                    );
                    hunk.relocs.push(Reloc {
                        target: RelocTarget::Site(symbol.site.clone()),
                        offset: reference.offset,
                    });
                }
            }
        }
    }
    report
}

/// Pass 2: build the placement map. Classes are laid out in the fixed
/// code, bss, data order; within a class, section names keep their arrival
/// order; within a name, fragments stack at increasing displacements.
pub fn place(db: &mut Database) {
    let mut entries: Vec<(SectionKey, Placement)> = Vec::new();
    let mut next_hunk: u32 = 0;
    for kind in SectionKind::ALL {
        for (name, hunks) in db.sections(kind) {
            let hunk = next_hunk;
            next_hunk += 1;
            info!("output hunk #{hunk}: {kind} '{name}'");
            let mut displacement: u32 = 0;
            for fragment in hunks {
                debug!(
                    "  unit {} at displacement 0x{displacement:08X} ({} bytes)",
                    fragment.unit, fragment.size
                );
                entries.push((fragment.key(), Placement { hunk, displacement }));
                displacement += fragment.size;
            }
        }
    }
    db.set_placements(entries);
}

/// Pass 3: patch and merge. Returns the output hunks in index order.
pub fn merge(db: &mut Database) -> Vec<OutputHunk> {
    let mut output = Vec::with_capacity(db.output_hunk_count());
    let mut index: u32 = 0;
    for kind in SectionKind::ALL {
        let (placements, bucket) = db.patch_view(kind);
        for (name, hunks) in bucket.iter_mut() {
            let mut body = Vec::new();
            let mut size: u32 = 0;
            // target (class, name) -> (output hunk index, offsets); the key
            // order is the emission order of the RELOC32 groups
            let mut groups: BTreeMap<(SectionKind, String), (u32, Vec<u32>)> = BTreeMap::new();

            for fragment in hunks.iter_mut() {
                for reloc in &fragment.relocs {
                    let site = match &reloc.target {
                        RelocTarget::Site(site) => site,
                        RelocTarget::Index(i) => {
                            error!(
                                "relocation in {}:{} still targets raw hunk #{i}, skipped",
                                fragment.unit, fragment.name
                            );
                            continue;
                        }
                    };
                    let Some(placement) = placements.get(site).copied() else {
                        error!("relocation target {site} has no placement, skipped");
                        continue;
                    };
                    if placement.displacement > 0
                        && !add_to_slot(&mut fragment.data, reloc.offset, placement.displacement)
                    {
                        error!(
                            "relocation at offset 0x{:08X} lies outside hunk {}:{}",
                            reloc.offset, fragment.unit, fragment.name
                        );
                        continue;
                    }
                    groups
                        .entry((site.kind, site.name.clone()))
                        .or_insert_with(|| (placement.hunk, Vec::new()))
                        .1
                        .push(reloc.offset + size);
                }
                body.extend_from_slice(&fragment.data);
                size += fragment.size;
            }

            output.push(OutputHunk {
                index,
                kind,
                name: name.clone(),
                data: body,
                size,
                relocs: groups
                    .into_values()
                    .map(|(target, offsets)| RelocGroup { target, offsets })
                    .collect(),
            });
            index += 1;
        }
    }
    output
}

/// Run all three passes.
pub fn link(db: &mut Database) -> (Vec<OutputHunk>, ResolveReport) {
    let report = resolve(db);
    place(db);
    (merge(db), report)
}

fn write_slot(data: &mut [u8], offset: u32, value: u32) -> bool {
    let Some(slot) = slot_at(data, offset) else {
        return false;
    };
    slot.copy_from_slice(&value.to_be_bytes());
    true
}

fn add_to_slot(data: &mut [u8], offset: u32, delta: u32) -> bool {
    let Some(slot) = slot_at(data, offset) else {
        return false;
    };
    let current = u32::from_be_bytes([slot[0], slot[1], slot[2], slot[3]]);
    slot.copy_from_slice(&current.wrapping_add(delta).to_be_bytes());
    true
}

fn slot_at(data: &mut [u8], offset: u32) -> Option<&mut [u8]> {
    let offset = offset as usize;
    data.get_mut(offset..offset + 4)
}
