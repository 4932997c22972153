use std::fs;
use std::io::{Cursor, Read, Write};

use zip::CompressionMethod;
use zip::write::FileOptions;

use crate::container::{BlobEntry, SaveContainer};
use crate::error::ConvertError;

/// Archive names for the non-payload blobs, largest first.
pub const AUXILIARY_NAMES: [&str; 3] = ["highres.png", "header.png", "header.json"];

const HEADER_DLC_FIELDS: [&str; 1] = ["m_DlcRewards"];
const PLAYER_DLC_FIELDS: [&str; 3] = [
    "m_StartNewGameAdditionalContentDlcStatus",
    "UsedDlcRewards",
    "ClaimedDlcRewards",
];

/// Rebuild a Steam `.zks` from a container whose payload is the zipped save.
///
/// Entries of the payload archive are carried over; the three auxiliary blobs
/// are added under [`AUXILIARY_NAMES`], replacing same-named entries.
pub fn assemble_zks(
    container: &SaveContainer,
    payload: &BlobEntry,
    fix_dlc: bool,
) -> Result<Vec<u8>, ConvertError> {
    let aux = auxiliary_blobs(container, payload)?;
    let payload_bytes = read_blob(payload)?;
    let mut src = zip::ZipArchive::new(Cursor::new(payload_bytes))?;

    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644);

    let mut carried = 0usize;
    for i in 0..src.len() {
        let mut entry = src.by_index(i)?;
        let name = entry.name().replace('\\', "/");
        if AUXILIARY_NAMES.contains(&name.as_str()) {
            continue;
        }
        if entry.is_dir() {
            zip.add_directory(name, options)?;
            continue;
        }
        let mut data = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut data).map_err(|source| ConvertError::PayloadRead {
            path: payload.path.clone(),
            source,
        })?;
        if fix_dlc && name == "player.json" {
            data = clear_json_fields(&container.id, &name, data, &PLAYER_DLC_FIELDS);
        }
        zip.start_file(name, options)?;
        zip.write_all(&data).map_err(zip::result::ZipError::Io)?;
        carried += 1;
    }

    for (blob, name) in aux.iter().zip(AUXILIARY_NAMES) {
        let mut data = read_blob(blob)?;
        if fix_dlc && name == "header.json" {
            data = clear_json_fields(&container.id, name, data, &HEADER_DLC_FIELDS);
        }
        log::debug!("{}: {} -> {}", container.id, blob.name, name);
        zip.start_file(name, options)?;
        zip.write_all(&data).map_err(zip::result::ZipError::Io)?;
    }

    let out = zip.finish()?.into_inner();
    log::info!(
        "{}: assembled {} save entries + {} auxiliary files ({} bytes)",
        container.id,
        carried,
        aux.len(),
        out.len()
    );
    Ok(out)
}

/// The non-payload blobs ranked by size, largest first; ties keep listing order.
pub fn auxiliary_blobs<'a>(
    container: &'a SaveContainer,
    payload: &BlobEntry,
) -> Result<Vec<&'a BlobEntry>, ConvertError> {
    let mut rest: Vec<&BlobEntry> = container
        .blobs
        .iter()
        .filter(|b| b.path != payload.path)
        .collect();
    if rest.len() < AUXILIARY_NAMES.len() {
        return Err(ConvertError::MissingAuxiliary(rest.len()));
    }
    rest.sort_by(|a, b| b.size.cmp(&a.size));
    rest.truncate(AUXILIARY_NAMES.len());
    Ok(rest)
}

/// Reset the named top-level fields to `[]`. Unparseable JSON is returned as-is.
pub fn clear_json_fields(id: &str, file: &str, data: Vec<u8>, fields: &[&str]) -> Vec<u8> {
    let mut value: serde_json::Value = match serde_json::from_slice(&data) {
        Ok(v) => v,
        Err(e) => {
            log::warn!("{}: could not fix {}: {}", id, file, e);
            return data;
        }
    };
    let Some(obj) = value.as_object_mut() else {
        log::warn!("{}: could not fix {}: not a JSON object", id, file);
        return data;
    };
    let mut cleared = Vec::new();
    for field in fields {
        if let Some(slot) = obj.get_mut(*field) {
            *slot = serde_json::Value::Array(Vec::new());
            cleared.push(*field);
        }
    }
    if cleared.is_empty() {
        return data;
    }
    log::info!("{}: cleared {} in {}", id, cleared.join(", "), file);
    match serde_json::to_vec_pretty(&value) {
        Ok(v) => v,
        Err(e) => {
            log::warn!("{}: could not fix {}: {}", id, file, e);
            data
        }
    }
}

fn read_blob(blob: &BlobEntry) -> Result<Vec<u8>, ConvertError> {
    fs::read(&blob.path).map_err(|source| ConvertError::PayloadRead {
        path: blob.path.clone(),
        source,
    })
}
