use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use walkdir::WalkDir;

use crate::error::ConvertError;

/// One file inside a container.
#[derive(Debug, Clone)]
pub struct BlobEntry {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
    pub modified: Option<DateTime<Local>>,
}

/// One save slot: a folder of opaque blobs plus an optional metadata file.
///
/// `blobs` is ordered by file name and never contains the metadata file.
#[derive(Debug, Clone)]
pub struct SaveContainer {
    pub path: PathBuf,
    pub id: String,
    pub blobs: Vec<BlobEntry>,
    pub metadata: Option<PathBuf>,
    pub modified: Option<DateTime<Local>>,
}

impl SaveContainer {
    /// Read the folder listing. Blob contents are not touched.
    pub fn open(path: &Path) -> Result<Self, ConvertError> {
        let unreadable = |source: io::Error| ConvertError::Unreadable {
            path: path.to_path_buf(),
            source,
        };
        let meta = path.metadata().map_err(unreadable)?;
        if !meta.is_dir() {
            return Err(unreadable(io::Error::new(
                io::ErrorKind::InvalidInput,
                "not a directory",
            )));
        }
        let id = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut blobs = Vec::new();
        let mut metadata = None;
        for entry in WalkDir::new(path)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| unreadable(walk_to_io(e)))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if is_metadata_name(&name) {
                // first match wins; extra index files are ignored
                if metadata.is_none() {
                    metadata = Some(entry.path().to_path_buf());
                }
                continue;
            }
            let m = entry.metadata().map_err(|e| unreadable(walk_to_io(e)))?;
            blobs.push(BlobEntry {
                path: entry.path().to_path_buf(),
                name,
                size: m.len(),
                modified: m.modified().ok().map(DateTime::<Local>::from),
            });
        }
        log::debug!("{}: {} blob(s), metadata={:?}", id, blobs.len(), metadata);

        Ok(SaveContainer {
            path: path.to_path_buf(),
            id,
            blobs,
            metadata,
            modified: meta.modified().ok().map(DateTime::<Local>::from),
        })
    }

    pub fn blob(&self, name: &str) -> Option<&BlobEntry> {
        self.blobs.iter().find(|b| b.name == name)
    }

    pub fn total_size(&self) -> u64 {
        self.blobs.iter().map(|b| b.size).sum()
    }
}

/// `container.*`, `*.index` and `metadata.json` describe blobs; they are never payloads.
pub fn is_metadata_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.starts_with("container.") || lower.ends_with(".index") || lower == "metadata.json"
}

pub(crate) fn walk_to_io(e: walkdir::Error) -> io::Error {
    let msg = e.to_string();
    e.into_io_error().unwrap_or_else(|| io::Error::other(msg))
}

#[cfg(test)]
mod tests {
    use super::is_metadata_name;

    #[test]
    fn metadata_names() {
        assert!(is_metadata_name("container.7"));
        assert!(is_metadata_name("Containers.index"));
        assert!(is_metadata_name("metadata.json"));
        assert!(!is_metadata_name("save.bin"));
        assert!(!is_metadata_name("4F0A9C1E2B3D4E5F60718293A4B5C6D7"));
    }
}
