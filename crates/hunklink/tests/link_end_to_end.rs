//! Whole-pipeline tests: object bytes in, executable bytes out, re-read
//! with the load-file reader.

use hunklink::hunk::types::{block_ids, ext_ids};
use hunklink::link::engine;
use hunklink::{read_load_file, read_object, write_executable, Database, SectionKind};

/// Builds object-file byte streams block by block.
struct ObjectBuilder {
    bytes: Vec<u8>,
}

impl ObjectBuilder {
    fn new(unit: &str) -> Self {
        let mut b = ObjectBuilder { bytes: Vec::new() };
        b.word(block_ids::HUNK_UNIT);
        b.name(unit);
        b
    }

    fn word(&mut self, w: u32) -> &mut Self {
        self.bytes.extend_from_slice(&w.to_be_bytes());
        self
    }

    fn name(&mut self, s: &str) -> &mut Self {
        let nwords = (s.len() + 3) / 4;
        self.word(nwords as u32);
        self.padded(s);
        self
    }

    fn padded(&mut self, s: &str) -> &mut Self {
        let nwords = (s.len() + 3) / 4;
        self.bytes.extend_from_slice(s.as_bytes());
        self.bytes
            .extend(std::iter::repeat(0u8).take(nwords * 4 - s.len()));
        self
    }

    fn hunk_name(&mut self, s: &str) -> &mut Self {
        self.word(block_ids::HUNK_NAME);
        self.name(s)
    }

    fn code(&mut self, body: &[u8]) -> &mut Self {
        self.word(block_ids::HUNK_CODE);
        self.word((body.len() / 4) as u32);
        self.bytes.extend_from_slice(body);
        self
    }

    fn data(&mut self, body: &[u8]) -> &mut Self {
        self.word(block_ids::HUNK_DATA);
        self.word((body.len() / 4) as u32);
        self.bytes.extend_from_slice(body);
        self
    }

    fn bss(&mut self, nwords: u32) -> &mut Self {
        self.word(block_ids::HUNK_BSS);
        self.word(nwords)
    }

    fn reloc32(&mut self, target: u32, offsets: &[u32]) -> &mut Self {
        self.word(block_ids::HUNK_RELOC32);
        self.word(offsets.len() as u32);
        self.word(target);
        for o in offsets {
            self.word(*o);
        }
        self.word(0)
    }

    fn ext_def(&mut self, name: &str, value: u32) -> &mut Self {
        self.word(block_ids::HUNK_EXT);
        self.word((ext_ids::EXT_DEF << 24) | (((name.len() + 3) / 4) as u32));
        self.padded(name);
        self.word(value);
        self.word(0)
    }

    fn ext_ref32(&mut self, name: &str, offsets: &[u32]) -> &mut Self {
        self.word(block_ids::HUNK_EXT);
        self.word((ext_ids::EXT_REF32 << 24) | (((name.len() + 3) / 4) as u32));
        self.padded(name);
        self.word(offsets.len() as u32);
        for o in offsets {
            self.word(*o);
        }
        self.word(0)
    }

    fn end(&mut self) -> &mut Self {
        self.word(block_ids::HUNK_END)
    }

    fn build(&self) -> Vec<u8> {
        self.bytes.clone()
    }
}

fn link_objects(objects: &[Vec<u8>]) -> (Vec<u8>, engine::ResolveReport) {
    let mut db = Database::new();
    for object in objects {
        read_object(object, &mut db).unwrap();
    }
    let (hunks, report) = engine::link(&mut db);
    (write_executable(&hunks), report)
}

#[test]
fn self_referencing_symbol_round_trips() {
    // One code hunk defining foo at 0 and referencing it at offset 0: the
    // slot keeps its value (symbol value 0, displacement 0) and the output
    // carries a single relocation at offset 0 against hunk 0.
    let mut b = ObjectBuilder::new("a.o");
    b.hunk_name("text")
        .code(&[0, 0, 0, 0])
        .ext_def("foo", 0)
        .ext_ref32("foo", &[0])
        .end();

    let (exe, report) = link_objects(&[b.build()]);
    assert_eq!(report, engine::ResolveReport::default());

    let load = read_load_file(&exe).unwrap();
    assert_eq!(load.hunks.len(), 1);
    assert_eq!(load.hunks[0].kind, SectionKind::Code);
    assert_eq!(load.hunks[0].alloc_size, 4);
    assert_eq!(load.hunks[0].data, [0, 0, 0, 0]);
    assert_eq!(load.hunks[0].relocs.len(), 1);
    assert_eq!(load.hunks[0].relocs[0].target, 0);
    assert_eq!(load.hunks[0].relocs[0].offsets, [0]);
}

#[test]
fn cross_unit_reference_patches_value_plus_displacement() {
    // b.o arrives first, so a.o's "text" fragment sits at displacement 4;
    // the referencing slot becomes symbol value 4 + displacement 4 = 8.
    let mut a = ObjectBuilder::new("a.o");
    a.hunk_name("text")
        .code(&[0x11; 8])
        .ext_def("foo", 4)
        .end();
    let mut b = ObjectBuilder::new("b.o");
    b.hunk_name("text")
        .code(&[0; 4])
        .ext_ref32("foo", &[0])
        .end();

    let (exe, report) = link_objects(&[b.build(), a.build()]);
    assert_eq!(report.undefined, 0);

    let load = read_load_file(&exe).unwrap();
    assert_eq!(load.hunks.len(), 1);
    let hunk = &load.hunks[0];
    assert_eq!(hunk.data.len(), 12);
    assert_eq!(&hunk.data[..4], &[0, 0, 0, 8]);
    assert_eq!(&hunk.data[4..], &[0x11; 8]);
    assert_eq!(hunk.relocs.len(), 1);
    assert_eq!(hunk.relocs[0].target, 0);
    assert_eq!(hunk.relocs[0].offsets, [0]);
}

#[test]
fn class_order_gives_data_the_last_hunk_index() {
    // Unit hunks: code (#0), data (#1), bss (#2). Output layout is
    // code, bss, data, so the internal reloc against unit hunk #1 must
    // point at output hunk 2.
    let mut b = ObjectBuilder::new("a.o");
    b.hunk_name("text")
        .code(&[0, 0, 0, 0])
        .reloc32(1, &[0])
        .end();
    b.hunk_name("vars").data(&[0x22; 12]).end();
    b.hunk_name("heap").bss(2).end();

    let (exe, _) = link_objects(&[b.build()]);
    let load = read_load_file(&exe).unwrap();

    assert_eq!(load.hunks.len(), 3);
    assert_eq!(load.hunks[0].kind, SectionKind::Code);
    assert_eq!(load.hunks[1].kind, SectionKind::Bss);
    assert_eq!(load.hunks[1].alloc_size, 8);
    assert_eq!(load.hunks[2].kind, SectionKind::Data);
    assert_eq!(load.hunks[0].relocs.len(), 1);
    assert_eq!(load.hunks[0].relocs[0].target, 2);
    assert_eq!(load.hunks[0].relocs[0].offsets, [0]);
    // single fragment at displacement 0: the slot is untouched
    assert_eq!(load.hunks[0].data, [0, 0, 0, 0]);
}

#[test]
fn undefined_symbol_leaves_slot_and_emits_no_reloc() {
    let mut b = ObjectBuilder::new("a.o");
    b.hunk_name("text")
        .code(&[0xAB, 0xCD, 0xEF, 0x01])
        .ext_ref32("bar", &[0])
        .end();

    let (exe, report) = link_objects(&[b.build()]);
    assert_eq!(report.undefined, 1);

    let load = read_load_file(&exe).unwrap();
    assert_eq!(load.hunks[0].data, [0xAB, 0xCD, 0xEF, 0x01]);
    assert!(load.hunks[0].relocs.is_empty());
}

#[test]
fn empty_bss_unit() {
    let mut b = ObjectBuilder::new("a.o");
    b.hunk_name("heap").bss(0).end();

    let (exe, _) = link_objects(&[b.build()]);
    let load = read_load_file(&exe).unwrap();
    assert_eq!(load.hunks.len(), 1);
    assert_eq!(load.hunks[0].kind, SectionKind::Bss);
    assert_eq!(load.hunks[0].alloc_size, 0);
    assert!(load.hunks[0].data.is_empty());
    assert!(load.hunks[0].relocs.is_empty());
}

#[test]
fn empty_code_hunk_round_trips() {
    let mut b = ObjectBuilder::new("a.o");
    b.hunk_name("text").code(&[]).end();

    let (exe, _) = link_objects(&[b.build()]);
    let load = read_load_file(&exe).unwrap();
    assert_eq!(load.hunks.len(), 1);
    assert_eq!(load.hunks[0].kind, SectionKind::Code);
    assert!(load.hunks[0].data.is_empty());
}

#[test]
fn bodies_survive_emission_unchanged_without_references() {
    // Re-emitting a unit with no references reproduces every body, with
    // SYMBOL and DEBUG blocks dropped.
    let code_body: Vec<u8> = (0u8..16).collect();
    let data_body = [0xCA, 0xFE, 0xBA, 0xBE];

    let mut b = ObjectBuilder::new("a.o");
    b.hunk_name("text").code(&code_body);
    b.word(block_ids::HUNK_DEBUG);
    b.word(1);
    b.word(0x12345678);
    b.end();
    b.hunk_name("vars").data(&data_body).end();
    b.hunk_name("heap").bss(4).end();

    let (exe, _) = link_objects(&[b.build()]);
    let load = read_load_file(&exe).unwrap();

    assert_eq!(load.hunks.len(), 3);
    assert_eq!(load.hunks[0].data, code_body);
    assert_eq!(load.hunks[2].data, data_body);
    assert_eq!(load.hunks[1].alloc_size, 16);
    for hunk in &load.hunks {
        assert!(hunk.symbols.is_empty());
        assert!(hunk.relocs.is_empty());
    }
}

#[test]
fn same_named_hunks_merge_across_files() {
    let mut a = ObjectBuilder::new("a.o");
    a.hunk_name("text").code(&[0x11; 4]).end();
    let mut b = ObjectBuilder::new("b.o");
    b.hunk_name("text").code(&[0x22; 8]).end();
    let mut c = ObjectBuilder::new("c.o");
    c.hunk_name("other").code(&[0x33; 4]).end();

    let (exe, _) = link_objects(&[a.build(), b.build(), c.build()]);
    let load = read_load_file(&exe).unwrap();

    assert_eq!(load.hunks.len(), 2);
    assert_eq!(load.hunks[0].data.len(), 12);
    assert_eq!(&load.hunks[0].data[..4], &[0x11; 4]);
    assert_eq!(&load.hunks[0].data[4..], &[0x22; 8]);
    assert_eq!(load.hunks[1].data, [0x33; 4]);
}

#[test]
fn merged_relocs_fold_into_one_group_per_target() {
    // Two files each relocating into the shared "vars" hunk: the output
    // RELOC32 must carry one group with both (shifted) offsets.
    let mut a = ObjectBuilder::new("a.o");
    a.hunk_name("text")
        .code(&[0, 0, 0, 0])
        .reloc32(1, &[0])
        .end();
    a.hunk_name("vars").data(&[0; 8]).end();
    let mut b = ObjectBuilder::new("b.o");
    b.hunk_name("text")
        .code(&[0, 0, 0, 0, 0, 0, 0, 0])
        .reloc32(1, &[4])
        .end();
    b.hunk_name("vars").data(&[0; 4]).end();

    let (exe, _) = link_objects(&[a.build(), b.build()]);
    let load = read_load_file(&exe).unwrap();

    // hunk 0: merged code, hunk 1: merged data
    assert_eq!(load.hunks.len(), 2);
    let relocs = &load.hunks[0].relocs;
    assert_eq!(relocs.len(), 1);
    assert_eq!(relocs[0].target, 1);
    // a's offset 0, then b's offset 4 shifted by b's displacement 4
    assert_eq!(relocs[0].offsets, [0, 8]);
    // b's slot gained the displacement of b's "vars" fragment (4)
    assert_eq!(&load.hunks[0].data[8..12], &[0, 0, 0, 4]);
}

#[test]
fn driver_links_files_and_skips_broken_input() {
    use std::fs;

    let dir = std::env::temp_dir().join(format!("hunklink-e2e-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();

    let mut good = ObjectBuilder::new("good.o");
    good.hunk_name("text").code(&[0x4E, 0x75, 0x00, 0x00]).end();
    let good_path = dir.join("good.o");
    fs::write(&good_path, good.build()).unwrap();

    // truncated mid-body
    let mut bad = ObjectBuilder::new("bad.o");
    bad.word(block_ids::HUNK_CODE).word(4);
    let bad_path = dir.join("bad.o");
    fs::write(&bad_path, bad.build()).unwrap();

    let out_path = dir.join("a.out");
    let report = hunklink::link_files(&[good_path, bad_path], &out_path).unwrap();
    assert_eq!(report.units, 1);
    assert_eq!(report.failed_files, 1);
    assert!(!report.is_clean());

    let load = read_load_file(&fs::read(&out_path).unwrap()).unwrap();
    assert_eq!(load.hunks.len(), 1);
    assert_eq!(load.hunks[0].data, [0x4E, 0x75, 0x00, 0x00]);

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn missing_input_file_is_fatal() {
    let dir = std::env::temp_dir().join(format!("hunklink-e2e-missing-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let result = hunklink::link_files(&[dir.join("nonexistent.o")], &dir.join("a.out"));
    assert!(matches!(result, Err(hunklink::Error::Io { .. })));
    std::fs::remove_dir_all(&dir).unwrap();
}
