//! Reader for the binary `container.N` file the WGS store keeps in each container.
//!
//! Layout (little endian):
//! - u32 version, u32 entry count
//! - per entry: 64 UTF-16 code units of NUL-padded name, a 16-byte GUID that
//!   repeats the next one, and the 16-byte GUID of the blob.
//!
//! The blob is stored on disk as that GUID in uppercase hex without dashes.
//! The GUID bytes keep the first three groups little endian.

pub const HEADER_LEN: usize = 8;
pub const NAME_UNITS: usize = 64;
pub const ENTRY_LEN: usize = NAME_UNITS * 2 + 16 + 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// Logical name, e.g. `Data`.
    pub name: String,
    /// File name of the blob in the container folder.
    pub blob_name: String,
}

/// `None` when the bytes are not a well-formed index.
pub fn parse_index(data: &[u8]) -> Option<Vec<IndexEntry>> {
    if data.len() < HEADER_LEN {
        return None;
    }
    let count = u32::from_le_bytes(data[4..8].try_into().ok()?) as usize;
    let body = &data[HEADER_LEN..];
    if count == 0 || body.len() < count.checked_mul(ENTRY_LEN)? {
        return None;
    }
    let mut out = Vec::with_capacity(count);
    for rec in body.chunks_exact(ENTRY_LEN).take(count) {
        let units: Vec<u16> = rec[..NAME_UNITS * 2]
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .take_while(|u| *u != 0)
            .collect();
        let name = String::from_utf16(&units).ok()?;
        let guid = &rec[NAME_UNITS * 2 + 16..];
        out.push(IndexEntry {
            name,
            blob_name: guid_file_name(guid),
        });
    }
    Some(out)
}

/// Mixed-endian GUID bytes to the uppercase hex name used on disk.
pub fn guid_file_name(le: &[u8]) -> String {
    let order = [3, 2, 1, 0, 5, 4, 7, 6, 8, 9, 10, 11, 12, 13, 14, 15];
    order.iter().map(|&i| format!("{:02X}", le[i])).collect()
}

// Test helper: inverse of `parse_index`, blob names given as 32 hex chars.
pub fn build_index_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let order = [3, 2, 1, 0, 5, 4, 7, 6, 8, 9, 10, 11, 12, 13, 14, 15];
    let mut w = Vec::with_capacity(HEADER_LEN + entries.len() * ENTRY_LEN);
    w.extend_from_slice(&4u32.to_le_bytes());
    w.extend_from_slice(&(entries.len() as u32).to_le_bytes());
    for (name, hex) in entries {
        let mut units: Vec<u16> = name.encode_utf16().take(NAME_UNITS).collect();
        units.resize(NAME_UNITS, 0);
        for u in units {
            w.extend_from_slice(&u.to_le_bytes());
        }
        let mut canon = [0u8; 16];
        for (i, slot) in canon.iter_mut().enumerate() {
            *slot = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).unwrap_or(0);
        }
        let mut le = [0u8; 16];
        for (pos, &src) in order.iter().enumerate() {
            le[src] = canon[pos];
        }
        w.extend_from_slice(&le);
        w.extend_from_slice(&le);
    }
    w
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_roundtrip_keeps_disk_names() {
        let bytes = build_index_bytes(&[
            ("Data", "0123456789ABCDEF0011223344556677"),
            ("Screenshot", "FFEEDDCCBBAA99887766554433221100"),
        ]);
        assert_eq!(bytes.len(), HEADER_LEN + 2 * ENTRY_LEN);
        let entries = parse_index(&bytes).unwrap();
        assert_eq!(entries[0].name, "Data");
        assert_eq!(entries[0].blob_name, "0123456789ABCDEF0011223344556677");
        assert_eq!(entries[1].name, "Screenshot");
        assert_eq!(entries[1].blob_name, "FFEEDDCCBBAA99887766554433221100");
    }

    #[test]
    fn le_guid_byte_order() {
        let le = [
            0x67, 0x45, 0x23, 0x01, 0xAB, 0x89, 0xEF, 0xCD, 0, 1, 2, 3, 4, 5, 6, 7,
        ];
        assert_eq!(guid_file_name(&le), "0123456789ABCDEF0001020304050607");
    }

    #[test]
    fn text_is_not_an_index() {
        assert!(parse_index(b"save.bin").is_none());
        assert!(parse_index(b"").is_none());
    }
}
