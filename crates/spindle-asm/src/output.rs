//! Machine code serializations: hex listing, raw bytes, Intel HEX.

use std::fmt::Write as _;

/// Bytes per program slot in an EEPROM image (128 words × 4 bytes).
pub const SLOT_BYTES: usize = 512;

/// Number of program slots in an EEPROM image.
pub const SLOT_COUNT: usize = 8;

const RECORD_BYTES: usize = 16;

/// One `0xXXXXXXXX` word per line.
pub fn to_hex_lines(words: &[u32]) -> String {
    let mut out = String::with_capacity(words.len() * 11);
    for word in words {
        let _ = writeln!(out, "0x{word:08X}");
    }
    out
}

/// Words as big-endian bytes.
pub fn to_bytes(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|word| word.to_be_bytes()).collect()
}

/// Intel HEX image with the program placed in `slot` (0..=7).
///
/// Returns `None` for a slot outside the image.
pub fn to_intel_hex(words: &[u32], slot: usize) -> Option<String> {
    if slot >= SLOT_COUNT {
        return None;
    }
    let bytes = to_bytes(words);
    let base = slot * SLOT_BYTES;
    let mut out = String::new();
    for (i, chunk) in bytes.chunks(RECORD_BYTES).enumerate() {
        out.push_str(&record(base + i * RECORD_BYTES, 0x00, chunk));
    }
    out.push_str(&record(0, 0x01, &[]));
    Some(out)
}

fn record(address: usize, kind: u8, data: &[u8]) -> String {
    let address = address as u16;
    let [hi, lo] = address.to_be_bytes();
    let mut sum = (data.len() as u8).wrapping_add(hi).wrapping_add(lo).wrapping_add(kind);
    let mut line = format!(":{:02X}{address:04X}{kind:02X}", data.len());
    for byte in data {
        sum = sum.wrapping_add(*byte);
        let _ = write!(line, "{byte:02X}");
    }
    let _ = writeln!(line, "{:02X}", sum.wrapping_neg());
    line
}
