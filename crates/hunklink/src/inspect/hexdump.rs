//! Classic offset / hex / ASCII dump.

/// Format `data` as dump lines of 16 bytes each:
/// `0010  4e 75 00 00 ...              |Nu..|`
pub fn hexdump(data: &[u8]) -> Vec<String> {
    let mut lines = Vec::with_capacity((data.len() + 15) / 16);
    for (row, chunk) in data.chunks(16).enumerate() {
        let hex: Vec<String> = chunk.iter().map(|b| format!("{b:02x}")).collect();
        let ascii: String = chunk
            .iter()
            .map(|&b| {
                if (0x20..=0x7e).contains(&b) {
                    b as char
                } else {
                    '.'
                }
            })
            .collect();
        lines.push(format!("{:04x}  {:<47}  |{}|", row * 16, hex.join(" "), ascii));
    }
    lines
}
