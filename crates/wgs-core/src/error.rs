use std::path::PathBuf;
use thiserror::Error;

/// Setup-level failures. These abort the whole run.
#[derive(Debug, Error)]
pub enum LocateError {
    #[error("save root not found (tried: {})", format_tried(.tried))]
    RootNotFound { tried: Vec<PathBuf> },

    #[error("cannot read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot create destination {}: {source}", .path.display())]
    Destination {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Per-container failures. The batch records these and moves on.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("container unreadable: {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no payload found")]
    NoPayload,

    #[error("cannot read payload {}: {source}", .path.display())]
    PayloadRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("payload is not a save archive: {0}")]
    BadArchive(#[from] zip::result::ZipError),

    #[error("expected 3 auxiliary blobs next to the payload, found {0}")]
    MissingAuxiliary(usize),

    #[error("{} was already written for container {first}", .path.display())]
    DuplicateOutput { path: PathBuf, first: String },

    #[error("cannot write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn format_tried(tried: &[PathBuf]) -> String {
    if tried.is_empty() {
        return "<nothing>".to_string();
    }
    tried
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
