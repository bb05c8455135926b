//! Load-file (executable) block encoder.
//!
//! The output is a HUNK_HEADER listing every hunk's size in longwords,
//! followed by one CODE/DATA/BSS block per output hunk, each trailed by its
//! consolidated RELOC32 table (when it has one) and a HUNK_END.

use super::types::{block_ids, SectionKind};
use crate::link::engine::OutputHunk;

/// Byte size rounded up to whole longwords.
fn size_in_words(bytes: u32) -> u32 {
    (bytes + 3) / 4
}

fn push_word(out: &mut Vec<u8>, word: u32) {
    out.extend_from_slice(&word.to_be_bytes());
}

/// Encode the output hunks, in index order, into executable bytes.
pub fn write_executable(hunks: &[OutputHunk]) -> Vec<u8> {
    let mut out = Vec::new();

    push_word(&mut out, block_ids::HUNK_HEADER);
    // no resident library names
    push_word(&mut out, 0);
    let count = hunks.len() as u32;
    push_word(&mut out, count);
    push_word(&mut out, 0);
    push_word(&mut out, count.saturating_sub(1));
    for hunk in hunks {
        push_word(&mut out, size_in_words(hunk.size));
    }

    for hunk in hunks {
        push_word(&mut out, hunk.kind.block_id());
        push_word(&mut out, size_in_words(hunk.size));
        if hunk.kind != SectionKind::Bss {
            out.extend_from_slice(&hunk.data);
            let padding = size_in_words(hunk.size) as usize * 4 - hunk.data.len();
            out.extend(std::iter::repeat(0u8).take(padding));
        }
        if !hunk.relocs.is_empty() {
            push_word(&mut out, block_ids::HUNK_RELOC32);
            for group in &hunk.relocs {
                push_word(&mut out, group.offsets.len() as u32);
                push_word(&mut out, group.target);
                for offset in &group.offsets {
                    push_word(&mut out, *offset);
                }
            }
            push_word(&mut out, 0);
        }
        push_word(&mut out, block_ids::HUNK_END);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hunk::types::RelocGroup;

    fn words(bytes: &[u8]) -> Vec<u32> {
        bytes
            .chunks(4)
            .map(|c| u32::from_be_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }

    #[test]
    fn single_code_hunk_layout() {
        let hunks = [OutputHunk {
            index: 0,
            kind: SectionKind::Code,
            name: "text".to_string(),
            data: vec![0x4E, 0x75, 0x00, 0x00],
            size: 4,
            relocs: vec![RelocGroup {
                target: 0,
                offsets: vec![0],
            }],
        }];

        let out = words(&write_executable(&hunks));
        assert_eq!(
            out,
            [
                block_ids::HUNK_HEADER,
                0, // resident libraries
                1, // hunk count
                0, // first hunk
                0, // last hunk
                1, // size of hunk 0 in words
                block_ids::HUNK_CODE,
                1,
                0x4E75_0000,
                block_ids::HUNK_RELOC32,
                1, // one offset
                0, // targeting hunk 0
                0, // at offset 0
                0, // reloc terminator
                block_ids::HUNK_END,
            ]
        );
    }

    #[test]
    fn bss_hunk_has_no_body_or_relocs() {
        let hunks = [OutputHunk {
            index: 0,
            kind: SectionKind::Bss,
            name: "heap".to_string(),
            data: Vec::new(),
            size: 32,
            relocs: Vec::new(),
        }];

        let out = words(&write_executable(&hunks));
        assert_eq!(
            out,
            [
                block_ids::HUNK_HEADER,
                0,
                1,
                0,
                0,
                8,
                block_ids::HUNK_BSS,
                8,
                block_ids::HUNK_END,
            ]
        );
    }

    #[test]
    fn empty_bss_lists_zero_size() {
        let hunks = [OutputHunk {
            index: 0,
            kind: SectionKind::Bss,
            name: String::new(),
            data: Vec::new(),
            size: 0,
            relocs: Vec::new(),
        }];

        let out = words(&write_executable(&hunks));
        assert_eq!(
            out,
            [
                block_ids::HUNK_HEADER,
                0,
                1,
                0,
                0,
                0,
                block_ids::HUNK_BSS,
                0,
                block_ids::HUNK_END,
            ]
        );
    }

    #[test]
    fn header_counts_every_class() {
        let hunks = [
            OutputHunk {
                index: 0,
                kind: SectionKind::Code,
                name: "text".to_string(),
                data: vec![0; 8],
                size: 8,
                relocs: Vec::new(),
            },
            OutputHunk {
                index: 1,
                kind: SectionKind::Bss,
                name: "heap".to_string(),
                data: Vec::new(),
                size: 16,
                relocs: Vec::new(),
            },
            OutputHunk {
                index: 2,
                kind: SectionKind::Data,
                name: "vars".to_string(),
                data: vec![0; 4],
                size: 4,
                relocs: Vec::new(),
            },
        ];

        let out = words(&write_executable(&hunks));
        assert_eq!(&out[..8], &[block_ids::HUNK_HEADER, 0, 3, 0, 2, 2, 4, 1]);
    }
}
