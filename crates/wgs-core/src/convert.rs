use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::archive::assemble_zks;
use crate::container::SaveContainer;
use crate::error::{ConvertError, LocateError};
use crate::payload::{SelectionRule, select_payload};

pub const OUTPUT_PREFIX: &str = "gamepass_save_";
pub const OUTPUT_EXT: &str = "zks";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputMode {
    /// Payload bytes copied as-is.
    #[default]
    Verbatim,
    /// Payload unzipped and re-zipped together with the screenshots and header.
    Assemble,
}

#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub dest_dir: PathBuf,
    pub mode: OutputMode,
    pub fix_dlc: bool,
    pub dry_run: bool,
}

impl ConvertOptions {
    pub fn new(dest_dir: impl Into<PathBuf>) -> Self {
        Self {
            dest_dir: dest_dir.into(),
            mode: OutputMode::Verbatim,
            fix_dlc: false,
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConvertedSave {
    pub dest: PathBuf,
    pub payload: PathBuf,
    pub rule: SelectionRule,
    pub len: u64,
    pub written: bool,
}

#[derive(Debug)]
pub struct Outcome {
    pub id: String,
    pub result: Result<ConvertedSave, ConvertError>,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<Outcome>,
}

impl BatchReport {
    pub fn successes(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }
    pub fn failures(&self) -> usize {
        self.outcomes.len() - self.successes()
    }
}

/// Keep ASCII alphanumerics, `-` and `_`; everything else becomes `_`.
pub fn sanitize_id(id: &str) -> String {
    let s: String = id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if s.is_empty() { "unnamed".to_string() } else { s }
}

pub fn output_file_name(id: &str) -> String {
    format!("{}{}.{}", OUTPUT_PREFIX, sanitize_id(id), OUTPUT_EXT)
}

pub fn ensure_dest_dir(dir: &Path) -> Result<(), LocateError> {
    fs::create_dir_all(dir).map_err(|source| LocateError::Destination {
        path: dir.to_path_buf(),
        source,
    })
}

/// Dry-run confidence check used by the interactive listing.
pub fn probe(container: &SaveContainer, opts: &ConvertOptions) -> Result<ConvertedSave, ConvertError> {
    let probe_opts = ConvertOptions {
        dry_run: true,
        ..opts.clone()
    };
    convert_container(container, &probe_opts)
}

pub fn convert_container(
    container: &SaveContainer,
    opts: &ConvertOptions,
) -> Result<ConvertedSave, ConvertError> {
    let choice = select_payload(container)?;
    let dest = opts.dest_dir.join(output_file_name(&container.id));
    log::info!(
        "{}: payload {} ({} bytes, by {})",
        container.id,
        choice.blob.name,
        choice.blob.size,
        choice.rule
    );

    let bytes = match opts.mode {
        OutputMode::Verbatim => fs::read(&choice.blob.path).map_err(|source| ConvertError::PayloadRead {
            path: choice.blob.path.clone(),
            source,
        })?,
        OutputMode::Assemble => assemble_zks(container, choice.blob, opts.fix_dlc)?,
    };
    let len = bytes.len() as u64;

    if !opts.dry_run {
        let write_err = |source: std::io::Error| ConvertError::Write {
            path: dest.clone(),
            source,
        };
        fs::create_dir_all(&opts.dest_dir).map_err(write_err)?;
        fs::write(&dest, &bytes).map_err(write_err)?;
        log::info!("{}: wrote {}", container.id, dest.display());
    }

    Ok(ConvertedSave {
        dest,
        payload: choice.blob.path.clone(),
        rule: choice.rule,
        len,
        written: !opts.dry_run,
    })
}

/// Opens and converts each directory in order; failures are recorded, never fatal.
///
/// A container whose output name was already produced earlier in the batch
/// fails with [`ConvertError::DuplicateOutput`] instead of overwriting it.
pub fn convert_all<'a, I>(dirs: I, opts: &ConvertOptions) -> BatchReport
where
    I: IntoIterator<Item = &'a Path>,
{
    let mut report = BatchReport::default();
    let mut produced: HashMap<PathBuf, String> = HashMap::new();
    for dir in dirs {
        let id = dir
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| dir.display().to_string());
        let dest = opts.dest_dir.join(output_file_name(&id));
        let result = match produced.get(&dest) {
            Some(first) => Err(ConvertError::DuplicateOutput {
                path: dest,
                first: first.clone(),
            }),
            None => SaveContainer::open(dir).and_then(|c| convert_container(&c, opts)),
        };
        match &result {
            Ok(saved) => {
                produced.insert(saved.dest.clone(), dir.display().to_string());
            }
            Err(e) => log::warn!("{}: {}", id, e),
        }
        report.outcomes.push(Outcome { id, result });
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_disallowed() {
        assert_eq!(sanitize_id("My Save #1"), "My_Save__1");
        assert_eq!(sanitize_id("A1B2-c_d"), "A1B2-c_d");
        assert_eq!(sanitize_id("../x"), "___x");
        assert_eq!(sanitize_id(""), "unnamed");
        assert_eq!(output_file_name("é"), "gamepass_save__.zks");
    }
}
