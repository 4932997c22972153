use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::container::{SaveContainer, walk_to_io};
use crate::error::{ConvertError, LocateError};

/// Rogue Trader's Game Pass package, relative to the user profile.
pub const PACKAGES_DIR: &str = "AppData/Local/Packages";
pub const PACKAGE_NAME: &str = "OwlcatGames.3387926822CE4_197r75gc6ce9t";
pub const PACKAGE_NEEDLE: &str = "OwlcatGames";
pub const WGS_SUFFIX: &str = "SystemAppData/wgs";
/// Steam save folder, relative to the user profile.
pub const STEAM_SAVE_DIR: &str = "AppData/LocalLow/Owlcat Games/Warhammer 40000 Rogue Trader/Saved Games";

/// One way of finding the WGS root. Tried in order; first hit wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootStrategy {
    Exact(PathBuf),
    /// First directory in `parent` whose name contains `needle`, joined with `suffix`.
    Fuzzy {
        parent: PathBuf,
        needle: String,
        suffix: PathBuf,
    },
}

impl RootStrategy {
    /// The path this strategy resolves to, if it points at an existing directory.
    pub fn resolve(&self) -> Option<PathBuf> {
        match self {
            RootStrategy::Exact(p) => p.is_dir().then(|| p.clone()),
            RootStrategy::Fuzzy {
                parent,
                needle,
                suffix,
            } => {
                let needle = needle.to_lowercase();
                let mut names: Vec<PathBuf> = fs::read_dir(parent)
                    .ok()?
                    .flatten()
                    .map(|e| e.path())
                    .filter(|p| p.is_dir())
                    .filter(|p| {
                        p.file_name()
                            .map(|n| n.to_string_lossy().to_lowercase().contains(&needle))
                            .unwrap_or(false)
                    })
                    .collect();
                names.sort();
                let found = names.into_iter().next()?.join(suffix);
                found.is_dir().then_some(found)
            }
        }
    }

    fn describe(&self) -> PathBuf {
        match self {
            RootStrategy::Exact(p) => p.clone(),
            RootStrategy::Fuzzy {
                parent,
                needle,
                suffix,
            } => parent.join(format!("*{}*", needle)).join(suffix),
        }
    }
}

/// Exact package path first, then any package whose name mentions the publisher.
pub fn default_strategies(profile: &Path) -> Vec<RootStrategy> {
    let packages = profile.join(PACKAGES_DIR);
    vec![
        RootStrategy::Exact(packages.join(PACKAGE_NAME).join(WGS_SUFFIX)),
        RootStrategy::Fuzzy {
            parent: packages,
            needle: PACKAGE_NEEDLE.to_string(),
            suffix: PathBuf::from(WGS_SUFFIX),
        },
    ]
}

pub fn default_destination(profile: &Path) -> PathBuf {
    profile.join(STEAM_SAVE_DIR)
}

/// `USERPROFILE` on Windows, `HOME` elsewhere.
pub fn user_profile() -> Option<PathBuf> {
    std::env::var_os("USERPROFILE")
        .filter(|v| !v.is_empty())
        .or_else(|| std::env::var_os("HOME").filter(|v| !v.is_empty()))
        .map(PathBuf::from)
}

pub fn resolve_root(strategies: &[RootStrategy]) -> Result<PathBuf, LocateError> {
    for s in strategies {
        if let Some(p) = s.resolve() {
            log::info!("save root: {}", p.display());
            return Ok(p);
        }
        log::debug!("no save root at {}", s.describe().display());
    }
    Err(LocateError::RootNotFound {
        tried: strategies.iter().map(RootStrategy::describe).collect(),
    })
}

/// Enumerates containers below a resolved WGS root.
///
/// A real WGS root holds per-user save folders (name longer than 20 chars with
/// a `_`), each holding containers named by 32 hex digits; anything else in
/// such a root (the `t` folder and the like) is skipped. A root without any
/// save folder is flat: each of its subfolders is a container.
#[derive(Debug, Clone)]
pub struct Locator {
    root: PathBuf,
    dirs: Vec<PathBuf>,
}

impl Locator {
    pub fn new(root: &Path) -> Result<Self, LocateError> {
        if !root.is_dir() {
            return Err(LocateError::RootNotFound {
                tried: vec![root.to_path_buf()],
            });
        }
        let read_err = |path: &Path, e: walkdir::Error| LocateError::Read {
            path: path.to_path_buf(),
            source: walk_to_io(e),
        };
        let tops = subdirs(root).map_err(|e| read_err(root, e))?;
        let (users, others): (Vec<PathBuf>, Vec<PathBuf>) =
            tops.into_iter().partition(|p| name_matches(p, is_save_folder_name));

        let dirs = if users.is_empty() {
            others
        } else {
            for p in &others {
                log::debug!("skipping {}: not a save folder", p.display());
            }
            let mut dirs = Vec::new();
            for user in &users {
                let inner = match subdirs(user) {
                    Ok(inner) => inner,
                    Err(e) => {
                        log::warn!("cannot list {}: {}", user.display(), e);
                        continue;
                    }
                };
                for dir in inner {
                    if name_matches(&dir, is_container_name) {
                        dirs.push(dir);
                    } else {
                        log::debug!("skipping {}: not a container", dir.display());
                    }
                }
            }
            dirs
        };
        log::info!("found {} container folder(s) in {}", dirs.len(), root.display());
        Ok(Locator {
            root: root.to_path_buf(),
            dirs,
        })
    }

    pub fn from_strategies(strategies: &[RootStrategy]) -> Result<Self, LocateError> {
        Locator::new(&resolve_root(strategies)?)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn container_dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    /// Lazily opens each container. Calling again starts over.
    pub fn containers(&self) -> impl Iterator<Item = Result<SaveContainer, ConvertError>> + '_ {
        self.dirs.iter().map(|d| SaveContainer::open(d))
    }

    /// Most recently modified container folder; ties go to the later folder.
    pub fn latest(&self) -> Option<&Path> {
        self.dirs
            .iter()
            .filter_map(|d| d.metadata().and_then(|m| m.modified()).ok().map(|t| (t, d)))
            .max_by_key(|(t, _)| *t)
            .map(|(_, d)| d.as_path())
    }
}

/// Per-user folder under the WGS root, e.g. `000901F2A1B2C3D4_0000000000000000000000007E1E2B3A`.
pub fn is_save_folder_name(name: &str) -> bool {
    name.len() > 20 && name.contains('_')
}

/// Container folders are a GUID in 32 hex digits.
pub fn is_container_name(name: &str) -> bool {
    name.len() == 32 && name.bytes().all(|b| b.is_ascii_hexdigit())
}

fn name_matches(p: &Path, pred: fn(&str) -> bool) -> bool {
    p.file_name().and_then(|n| n.to_str()).is_some_and(pred)
}

fn subdirs(dir: &Path) -> Result<Vec<PathBuf>, walkdir::Error> {
    let mut out = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        if entry.file_type().is_dir() {
            out.push(entry.into_path());
        }
    }
    Ok(out)
}
