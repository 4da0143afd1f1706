//! Class map manifests.
//!
//! Walks source roots once and records which file declares each class, so a
//! [`ClassMapLoader`] can load classes without touching the filesystem per
//! lookup.

use ignore::WalkBuilder;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use tracing::{debug, warn};

use crate::declarations::parse_declarations;
use crate::error::{ClassLoaderError, Result};
use crate::identifier::class_key;
use crate::resolver::DirectoryClassResolver;
use crate::runtime::{Autoloader, Runtime};

/// Collects every file below `root` with the given extension, sorted.
pub fn scan_sources(root: &Path, extension: &str) -> Vec<PathBuf> {
    let suffix = format!(".{extension}");
    let (tx, rx) = mpsc::channel();

    let walker = WalkBuilder::new(root)
        .hidden(false)
        .ignore(false)
        .parents(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .build_parallel();

    walker.run(|| {
        let tx = tx.clone();
        let suffix = suffix.as_str();
        Box::new(move |entry| {
            if let Ok(entry) = entry {
                let is_file = entry.file_type().is_some_and(|t| t.is_file());
                if is_file && has_suffix(entry.file_name(), suffix) {
                    let _ = tx.send(entry.path().to_path_buf());
                }
            }
            ignore::WalkState::Continue
        })
    });

    drop(tx);
    let mut files: Vec<PathBuf> = rx.iter().collect();
    files.sort();
    files
}

/// Matches the whole `.<ext>` suffix, so dotted extensions such as
/// `class.php` agree with the resolver's candidate paths.
fn has_suffix(file_name: &OsStr, suffix: &str) -> bool {
    let name = file_name.to_string_lossy();
    name.len() > suffix.len() && name.ends_with(suffix)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassMap {
    pub roots: Vec<PathBuf>,
    pub extension: String,
    pub classes: BTreeMap<String, PathBuf>,
}

impl ClassMap {
    /// Indexes the declarations under each root. When two files declare the
    /// same class, the one under the earlier root wins; within a root, the
    /// lexically first path wins.
    pub fn build(roots: &[PathBuf], extension: &str) -> Result<Self> {
        let mut classes = BTreeMap::new();
        let mut seen = HashSet::new();

        for root in roots {
            let files = scan_sources(root, extension);
            let parsed: Vec<(PathBuf, Vec<String>)> = files
                .into_par_iter()
                .filter_map(|file| match std::fs::read(&file) {
                    Ok(content) => Some(parse_declarations(&content).map(|decls| {
                        let names = decls.into_iter().map(|d| d.name).collect();
                        (file, names)
                    })),
                    Err(err) => {
                        warn!(path = %file.display(), error = %err, "skipping unreadable source");
                        None
                    }
                })
                .collect::<Result<_>>()?;

            for (file, names) in parsed {
                for name in names {
                    if seen.insert(class_key(&name)) {
                        classes.insert(name, file.clone());
                    } else {
                        debug!(class = %name, path = %file.display(), "shadowed declaration");
                    }
                }
            }
        }

        Ok(Self {
            roots: roots.to_vec(),
            extension: extension.to_string(),
            classes,
        })
    }

    pub fn from_resolver(resolver: &DirectoryClassResolver) -> Result<Self> {
        Self::build(resolver.class_dirs(), resolver.extension())
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn open(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| ClassLoaderError::ClassMap {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ClassLoaderError::ClassMapFormat {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json =
            serde_json::to_string_pretty(self).map_err(|source| ClassLoaderError::ClassMapFormat {
                path: path.to_path_buf(),
                source,
            })?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|source| ClassLoaderError::ClassMap {
                path: path.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, json).map_err(|source| ClassLoaderError::ClassMap {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Autoloader backed by a prebuilt [`ClassMap`].
#[derive(Debug, Clone)]
pub struct ClassMapLoader {
    index: HashMap<String, PathBuf>,
}

impl ClassMapLoader {
    pub fn new(map: &ClassMap) -> Self {
        let index = map
            .classes
            .iter()
            .map(|(name, path)| (class_key(name), path.clone()))
            .collect();
        Self { index }
    }

    pub fn find_class_file(&self, class_name: &str) -> Option<&Path> {
        self.index.get(&class_key(class_name)).map(PathBuf::as_path)
    }
}

impl Autoloader for ClassMapLoader {
    fn autoload(&self, class_name: &str, runtime: &mut Runtime) -> Result<bool> {
        let Some(path) = self.find_class_file(class_name) else {
            return Ok(false);
        };
        debug!(class = %class_name, path = %path.display(), "loading mapped class");
        runtime.define_from_file(path)?;
        Ok(true)
    }

    fn describe(&self) -> String {
        format!("ClassMapLoader[{} classes]", self.index.len())
    }
}
