//! Payload selection: which blob in a container holds the actual save.
//!
//! A metadata file that names a blob is authoritative: a binary WGS index
//! (matched by GUID), a JSON object, or text mentioning a blob name. Without
//! one the largest blob wins; the save archive dwarfs the screenshots and header.
use std::fs;
use std::path::Path;

use crate::container::{BlobEntry, SaveContainer};
use crate::error::ConvertError;
use crate::index::{IndexEntry, parse_index};

/// JSON keys checked, in order, when the metadata file is a JSON object.
const REFERENCE_KEYS: [&str; 3] = ["payload", "file", "blob"];
/// Index entry holding the save itself.
const DATA_ENTRY: &str = "Data";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionRule {
    Metadata,
    Largest,
}

impl core::fmt::Display for SelectionRule {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SelectionRule::Metadata => f.write_str("metadata"),
            SelectionRule::Largest => f.write_str("largest blob"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PayloadChoice<'a> {
    pub blob: &'a BlobEntry,
    pub rule: SelectionRule,
}

pub fn select_payload(container: &SaveContainer) -> Result<PayloadChoice<'_>, ConvertError> {
    if let Some(meta) = &container.metadata {
        match referenced_blob(container, meta) {
            Some(blob) => {
                return Ok(PayloadChoice {
                    blob,
                    rule: SelectionRule::Metadata,
                });
            }
            None => log::debug!(
                "{}: metadata {} names no blob, using largest",
                container.id,
                meta.display()
            ),
        }
    }
    largest_blob(&container.blobs)
        .map(|blob| PayloadChoice {
            blob,
            rule: SelectionRule::Largest,
        })
        .ok_or(ConvertError::NoPayload)
}

/// Largest by size; on equal sizes the earlier entry is kept.
pub fn largest_blob(blobs: &[BlobEntry]) -> Option<&BlobEntry> {
    blobs.iter().fold(None, |best: Option<&BlobEntry>, b| match best {
        Some(cur) if cur.size >= b.size => Some(cur),
        _ => Some(b),
    })
}

fn referenced_blob<'a>(container: &'a SaveContainer, meta: &Path) -> Option<&'a BlobEntry> {
    let data = match fs::read(meta) {
        Ok(d) => d,
        Err(e) => {
            log::warn!("{}: cannot read metadata {}: {}", container.id, meta.display(), e);
            return None;
        }
    };
    if let Some(entries) = parse_index(&data) {
        return indexed_blob(container, &entries);
    }
    if let Some(name) = json_reference(&data) {
        return container.blob(&name);
    }
    text_reference(&container.blobs, &decode_text(&data))
}

/// The entry named `Data` if its blob exists, else the largest blob the index lists.
fn indexed_blob<'a>(container: &'a SaveContainer, entries: &[IndexEntry]) -> Option<&'a BlobEntry> {
    let found: Vec<(&IndexEntry, &BlobEntry)> = entries
        .iter()
        .filter_map(|e| {
            container
                .blobs
                .iter()
                .find(|b| b.name.eq_ignore_ascii_case(&e.blob_name))
                .map(|b| (e, b))
        })
        .collect();
    for (e, b) in &found {
        log::debug!("{}: index entry {} -> {}", container.id, e.name, b.name);
    }
    if let Some((_, b)) = found.iter().find(|(e, _)| e.name.eq_ignore_ascii_case(DATA_ENTRY)) {
        return Some(*b);
    }
    found
        .iter()
        .map(|(_, b)| *b)
        .reduce(|cur, b| if cur.size >= b.size { cur } else { b })
}

/// Earliest whole-name occurrence; a longer name wins at the same position.
pub fn text_reference<'a>(blobs: &'a [BlobEntry], text: &str) -> Option<&'a BlobEntry> {
    blobs
        .iter()
        .filter_map(|b| whole_name_pos(text, &b.name).map(|pos| (pos, b)))
        .min_by(|(pa, a), (pb, b)| pa.cmp(pb).then(b.name.len().cmp(&a.name.len())))
        .map(|(_, b)| b)
}

fn whole_name_pos(text: &str, name: &str) -> Option<usize> {
    if name.is_empty() {
        return None;
    }
    text.match_indices(name).map(|(pos, _)| pos).find(|&pos| {
        let before = text[..pos].chars().next_back();
        let after = text[pos + name.len()..].chars().next();
        !before.is_some_and(is_name_char) && !after.is_some_and(is_name_char)
    })
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '.' | '_' | '-')
}

fn json_reference(data: &[u8]) -> Option<String> {
    let v: serde_json::Value = serde_json::from_slice(data).ok()?;
    let obj = v.as_object()?;
    REFERENCE_KEYS
        .iter()
        .find_map(|k| obj.get(*k).and_then(|s| s.as_str()))
        .map(|s| s.trim().to_string())
}

// Text that looks like UTF-16LE is decoded as such, anything else as UTF-8.
fn decode_text(data: &[u8]) -> String {
    let odd_nuls = data.iter().skip(1).step_by(2).filter(|b| **b == 0).count();
    if data.len() >= 4 && odd_nuls * 2 >= data.len() / 2 {
        let units: Vec<u16> = data
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        String::from_utf8_lossy(data).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf16_text_is_decoded() {
        let mut raw = Vec::new();
        for u in "xxsave.binyy".encode_utf16() {
            raw.extend_from_slice(&u.to_le_bytes());
        }
        assert_eq!(decode_text(&raw), "xxsave.binyy");
        assert_eq!(decode_text(b"ref: save.bin\n"), "ref: save.bin\n");
    }

    #[test]
    fn json_reference_keys_in_order() {
        assert_eq!(
            json_reference(br#"{"blob":"b","payload":" a "}"#).as_deref(),
            Some("a")
        );
        assert_eq!(json_reference(br#"{"file":"f"}"#).as_deref(), Some("f"));
        assert_eq!(json_reference(br#"["save.bin"]"#), None);
        assert_eq!(json_reference(b"save.bin"), None);
    }

    fn blob(name: &str) -> BlobEntry {
        BlobEntry {
            path: name.into(),
            name: name.to_string(),
            size: 1,
            modified: None,
        }
    }

    #[test]
    fn text_reference_matches_whole_names() {
        let blobs = [blob("save.bin"), blob("save.bin.new")];
        let pick = |t: &str| text_reference(&blobs, t).map(|b| b.name.as_str());
        assert_eq!(pick("save.bin.new"), Some("save.bin.new"));
        assert_eq!(pick("old=save.bin; new=save.bin.new"), Some("save.bin"));
        assert_eq!(pick("mysave.bin.bak"), None);
        assert_eq!(pick("\"save.bin.new\""), Some("save.bin.new"));
    }
}
