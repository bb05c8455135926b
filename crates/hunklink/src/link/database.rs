//! The global link database: every section hunk read from the input units,
//! the global symbol table, and the computed placement of each section site
//! in the output executable.

use std::collections::{BTreeMap, HashMap};

use indexmap::IndexMap;
use log::warn;

use crate::hunk::types::{SectionHunk, SectionKey, SectionKind, Symbol};

/// Where a section site lands in the output: which output hunk holds it and
/// at which byte displacement its body starts inside that hunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub hunk: u32,
    pub displacement: u32,
}

type Bucket = IndexMap<String, Vec<SectionHunk>>;

/// Pool of everything the link works on.
///
/// Each section class has an insertion-ordered bucket mapping section name
/// to the hunks carrying that name, in arrival order. Both orders are
/// load-bearing: together with the fixed class order they determine output
/// hunk numbering and fragment displacements.
#[derive(Debug, Default)]
pub struct Database {
    code: Bucket,
    bss: Bucket,
    data: Bucket,
    symbols: BTreeMap<String, Symbol>,
    placement: HashMap<SectionKey, Placement>,
}

impl Database {
    pub fn new() -> Self {
        Database::default()
    }

    /// Append a decoded hunk to its class/name bucket.
    pub fn add_hunk(&mut self, hunk: SectionHunk) {
        let bucket = self.bucket_mut(hunk.kind);
        bucket
            .entry(hunk.name.clone())
            .or_insert_with(Vec::new)
            .push(hunk);
    }

    /// Register a global symbol definition. A later definition of the same
    /// name wins; the collision is reported but tolerated.
    pub fn define_symbol(&mut self, name: String, symbol: Symbol) {
        if let Some(previous) = self.symbols.insert(name.clone(), symbol) {
            let current = &self.symbols[&name];
            warn!(
                "duplicate definition of symbol {name}: {} superseded by {}",
                previous.site, current.site
            );
        }
    }

    pub fn symbol(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    pub fn symbols(&self) -> &BTreeMap<String, Symbol> {
        &self.symbols
    }

    /// The bucket of one section class, in name insertion order.
    pub fn sections(&self, kind: SectionKind) -> &IndexMap<String, Vec<SectionHunk>> {
        match kind {
            SectionKind::Code => &self.code,
            SectionKind::Bss => &self.bss,
            SectionKind::Data => &self.data,
        }
    }

    fn bucket_mut(&mut self, kind: SectionKind) -> &mut Bucket {
        match kind {
            SectionKind::Code => &mut self.code,
            SectionKind::Bss => &mut self.bss,
            SectionKind::Data => &mut self.data,
        }
    }

    /// Total number of output hunks: one per distinct section name per class.
    pub fn output_hunk_count(&self) -> usize {
        self.code.len() + self.bss.len() + self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty() && self.bss.is_empty() && self.data.is_empty()
    }

    /// All hunks belonging to one unit, across every class.
    pub(crate) fn unit_hunks_mut<'a>(
        &'a mut self,
        unit: &'a str,
    ) -> impl Iterator<Item = &'a mut SectionHunk> + 'a {
        self.code
            .values_mut()
            .chain(self.bss.values_mut())
            .chain(self.data.values_mut())
            .flatten()
            .filter(move |h| h.unit == unit)
    }

    /// Symbol table plus the mutable code and data buckets, for the
    /// reference resolution pass.
    pub(crate) fn resolve_view(
        &mut self,
    ) -> (&BTreeMap<String, Symbol>, [&mut Bucket; 2]) {
        (&self.symbols, [&mut self.code, &mut self.data])
    }

    /// Placement map plus one mutable bucket, for the patch pass.
    pub(crate) fn patch_view(
        &mut self,
        kind: SectionKind,
    ) -> (&HashMap<SectionKey, Placement>, &mut Bucket) {
        let bucket = match kind {
            SectionKind::Code => &mut self.code,
            SectionKind::Bss => &mut self.bss,
            SectionKind::Data => &mut self.data,
        };
        (&self.placement, bucket)
    }

    pub fn placement(&self, key: &SectionKey) -> Option<Placement> {
        self.placement.get(key).copied()
    }

    pub(crate) fn set_placements(&mut self, entries: Vec<(SectionKey, Placement)>) {
        self.placement.clear();
        self.placement.extend(entries);
    }
}
