/// Raw block type id constants from dos/doshunks.h.
pub mod block_ids {
    pub const HUNK_UNIT: u32 = 0x3E7;
    pub const HUNK_NAME: u32 = 0x3E8;
    pub const HUNK_CODE: u32 = 0x3E9;
    pub const HUNK_DATA: u32 = 0x3EA;
    pub const HUNK_BSS: u32 = 0x3EB;
    pub const HUNK_RELOC32: u32 = 0x3EC;
    pub const HUNK_RELOC16: u32 = 0x3ED;
    pub const HUNK_RELOC8: u32 = 0x3EE;
    pub const HUNK_EXT: u32 = 0x3EF;
    pub const HUNK_SYMBOL: u32 = 0x3F0;
    pub const HUNK_DEBUG: u32 = 0x3F1;
    pub const HUNK_END: u32 = 0x3F2;
    pub const HUNK_HEADER: u32 = 0x3F3;
    pub const HUNK_OVERLAY: u32 = 0x3F5;
    pub const HUNK_BREAK: u32 = 0x3F6;
    pub const HUNK_DREL32: u32 = 0x3F7;
    pub const HUNK_DREL16: u32 = 0x3F8;
    pub const HUNK_DREL8: u32 = 0x3F9;
    pub const HUNK_LIB: u32 = 0x3FA;
    pub const HUNK_INDEX: u32 = 0x3FB;
}

/// Symbol type tags carried in the high byte of a HUNK_EXT record header,
/// also from dos/doshunks.h.
pub mod ext_ids {
    pub const EXT_SYMB: u32 = 0;
    pub const EXT_DEF: u32 = 1;
    pub const EXT_ABS: u32 = 2;
    pub const EXT_RES: u32 = 3;
    pub const EXT_REF32: u32 = 129;
    pub const EXT_COMMON: u32 = 130;
    pub const EXT_REF16: u32 = 131;
    pub const EXT_REF8: u32 = 132;
    pub const EXT_DEXT32: u32 = 133;
    pub const EXT_DEXT16: u32 = 134;
    pub const EXT_DEXT8: u32 = 135;
}

/// Identifies the type of a block in a hunk-format stream.
///
/// Object files and executables share one block namespace: a 32-bit
/// big-endian word tags each block. The primary content blocks are CODE,
/// DATA, and BSS; everything else either frames them (UNIT, NAME, END,
/// HEADER) or attaches metadata to the most recent content block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockType {
    /// HUNK_UNIT (0x3E7) — starts an object file unit.
    Unit,
    /// HUNK_NAME (0x3E8) — names the next content block.
    Name,
    /// HUNK_CODE (0x3E9) — executable machine code.
    Code,
    /// HUNK_DATA (0x3EA) — initialized data.
    Data,
    /// HUNK_BSS (0x3EB) — zero-initialized memory reservation.
    Bss,
    /// HUNK_RELOC32 (0x3EC) — 32-bit absolute relocation table.
    Reloc32,
    /// HUNK_RELOC16 (0x3ED) — 16-bit relocations.
    Reloc16,
    /// HUNK_RELOC8 (0x3EE) — 8-bit relocations.
    Reloc8,
    /// HUNK_EXT (0x3EF) — external symbol definitions and references.
    Ext,
    /// HUNK_SYMBOL (0x3F0) — symbol name/value pairs for debugging.
    Symbol,
    /// HUNK_DEBUG (0x3F1) — compiler-defined debug information.
    Debug,
    /// HUNK_END (0x3F2) — terminates the current hunk.
    End,
    /// HUNK_HEADER (0x3F3) — load file header.
    Header,
    /// HUNK_OVERLAY (0x3F5) — overlay table for demand loading.
    Overlay,
    /// HUNK_BREAK (0x3F6) — overlay break marker.
    Break,
    /// HUNK_DREL32 (0x3F7) — 32-bit data-relative relocations.
    DRel32,
    /// HUNK_DREL16 (0x3F8) — 16-bit data-relative relocations.
    DRel16,
    /// HUNK_DREL8 (0x3F9) — 8-bit data-relative relocations.
    DRel8,
    /// HUNK_LIB (0x3FA) — library marker.
    Lib,
    /// HUNK_INDEX (0x3FB) — library index.
    Index,
}

impl BlockType {
    /// Parse a block type from a raw 32-bit word, masking off the memory
    /// attribute bits some tools set in the upper two bits.
    /// Returns `None` for unrecognized type ids.
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw & 0x3FFF_FFFF {
            block_ids::HUNK_UNIT => Some(BlockType::Unit),
            block_ids::HUNK_NAME => Some(BlockType::Name),
            block_ids::HUNK_CODE => Some(BlockType::Code),
            block_ids::HUNK_DATA => Some(BlockType::Data),
            block_ids::HUNK_BSS => Some(BlockType::Bss),
            block_ids::HUNK_RELOC32 => Some(BlockType::Reloc32),
            block_ids::HUNK_RELOC16 => Some(BlockType::Reloc16),
            block_ids::HUNK_RELOC8 => Some(BlockType::Reloc8),
            block_ids::HUNK_EXT => Some(BlockType::Ext),
            block_ids::HUNK_SYMBOL => Some(BlockType::Symbol),
            block_ids::HUNK_DEBUG => Some(BlockType::Debug),
            block_ids::HUNK_END => Some(BlockType::End),
            block_ids::HUNK_HEADER => Some(BlockType::Header),
            block_ids::HUNK_OVERLAY => Some(BlockType::Overlay),
            block_ids::HUNK_BREAK => Some(BlockType::Break),
            block_ids::HUNK_DREL32 => Some(BlockType::DRel32),
            block_ids::HUNK_DREL16 => Some(BlockType::DRel16),
            block_ids::HUNK_DREL8 => Some(BlockType::DRel8),
            block_ids::HUNK_LIB => Some(BlockType::Lib),
            block_ids::HUNK_INDEX => Some(BlockType::Index),
            _ => None,
        }
    }

    /// Returns the canonical name for this block type.
    pub fn name(&self) -> &'static str {
        match self {
            BlockType::Unit => "HUNK_UNIT",
            BlockType::Name => "HUNK_NAME",
            BlockType::Code => "HUNK_CODE",
            BlockType::Data => "HUNK_DATA",
            BlockType::Bss => "HUNK_BSS",
            BlockType::Reloc32 => "HUNK_RELOC32",
            BlockType::Reloc16 => "HUNK_RELOC16",
            BlockType::Reloc8 => "HUNK_RELOC8",
            BlockType::Ext => "HUNK_EXT",
            BlockType::Symbol => "HUNK_SYMBOL",
            BlockType::Debug => "HUNK_DEBUG",
            BlockType::End => "HUNK_END",
            BlockType::Header => "HUNK_HEADER",
            BlockType::Overlay => "HUNK_OVERLAY",
            BlockType::Break => "HUNK_BREAK",
            BlockType::DRel32 => "HUNK_DREL32",
            BlockType::DRel16 => "HUNK_DREL16",
            BlockType::DRel8 => "HUNK_DREL8",
            BlockType::Lib => "HUNK_LIB",
            BlockType::Index => "HUNK_INDEX",
        }
    }
}

impl std::fmt::Display for BlockType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Section class of a hunk.
///
/// The declaration order (code, bss, data) is the layout order of the
/// output executable and therefore also the `Ord` used when relocation
/// tables are grouped by target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SectionKind {
    Code,
    Bss,
    Data,
}

impl SectionKind {
    /// All classes in output layout order.
    pub const ALL: [SectionKind; 3] = [SectionKind::Code, SectionKind::Bss, SectionKind::Data];

    /// The block type id used when a hunk of this class is emitted.
    pub fn block_id(&self) -> u32 {
        match self {
            SectionKind::Code => block_ids::HUNK_CODE,
            SectionKind::Bss => block_ids::HUNK_BSS,
            SectionKind::Data => block_ids::HUNK_DATA,
        }
    }
}

impl std::fmt::Display for SectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SectionKind::Code => f.write_str("code"),
            SectionKind::Bss => f.write_str("bss"),
            SectionKind::Data => f.write_str("data"),
        }
    }
}

/// Width of an external symbol reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefWidth {
    Ref8,
    Ref16,
    Ref32,
}

impl RefWidth {
    /// Map an EXT symbol tag to a reference width.
    pub fn from_ext_tag(tag: u32) -> Option<Self> {
        match tag {
            ext_ids::EXT_REF32 => Some(RefWidth::Ref32),
            ext_ids::EXT_REF16 => Some(RefWidth::Ref16),
            ext_ids::EXT_REF8 => Some(RefWidth::Ref8),
            _ => None,
        }
    }
}

impl std::fmt::Display for RefWidth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RefWidth::Ref8 => f.write_str("8-bit"),
            RefWidth::Ref16 => f.write_str("16-bit"),
            RefWidth::Ref32 => f.write_str("32-bit"),
        }
    }
}

/// Identifies one section hunk across the whole link: the unit it came
/// from, its class, and its name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SectionKey {
    pub unit: String,
    pub kind: SectionKind,
    pub name: String,
}

impl std::fmt::Display for SectionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.unit, self.kind, self.name)
    }
}

/// Target of a relocation.
///
/// Object files encode targets as hunk indices local to the unit; at the
/// end of a unit's decode every index is rewritten to the section site it
/// denotes, which stays valid once hunks from many units are pooled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelocTarget {
    /// Hunk index within the originating unit (pre-normalization only).
    Index(u32),
    /// Fully qualified section site.
    Site(SectionKey),
}

/// A single 32-bit absolute relocation: add the load address of the target
/// to the word stored at `offset` in the owning hunk's body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reloc {
    pub target: RelocTarget,
    pub offset: u32,
}

/// An unresolved reference to an external symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub symbol: String,
    pub width: RefWidth,
    pub offset: u32,
}

/// A global symbol definition: the section site that defines it and the
/// byte offset of the symbol within that section's body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub site: SectionKey,
    pub value: u32,
}

/// One section hunk of one unit.
///
/// Created by the object decoder; the link engine converts its references
/// into relocations and patches its body before same-named hunks are
/// concatenated into an output hunk.
#[derive(Debug, Clone)]
pub struct SectionHunk {
    /// Name of the owning unit.
    pub unit: String,
    pub kind: SectionKind,
    /// Section name; empty when the object file had no HUNK_NAME block.
    pub name: String,
    /// Raw body bytes. Always empty for BSS.
    pub data: Vec<u8>,
    /// Byte size: `data.len()` for code/data, the declared zero-fill size
    /// for BSS.
    pub size: u32,
    pub relocs: Vec<Reloc>,
    pub refs: Vec<Reference>,
}

impl SectionHunk {
    pub fn new(unit: String, kind: SectionKind, name: String, data: Vec<u8>, size: u32) -> Self {
        SectionHunk {
            unit,
            kind,
            name,
            data,
            size,
            relocs: Vec::new(),
            refs: Vec::new(),
        }
    }

    pub fn key(&self) -> SectionKey {
        SectionKey {
            unit: self.unit.clone(),
            kind: self.kind,
            name: self.name.clone(),
        }
    }
}

/// One group of a RELOC32 table: all patch offsets that share a target hunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelocGroup {
    /// Output hunk index whose load address gets added at each offset.
    pub target: u32,
    /// Byte offsets within the owning hunk's body.
    pub offsets: Vec<u32>,
}
