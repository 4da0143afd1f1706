use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, trace};

use crate::error::{ClassLoaderError, Result};
use crate::identifier::{DEFAULT_EXTENSION, class_name_to_relative_path};
use crate::runtime::{Autoloader, Runtime};

/// Resolves class names to files below an ordered list of root directories.
///
/// `Vendor\Pkg_Thing` is looked up as `<root>/Vendor/Pkg/Thing.php` in each
/// root, in registration order. The first root that has the file wins.
#[derive(Debug, Clone)]
pub struct DirectoryClassResolver {
    class_dirs: Vec<PathBuf>,
    extension: String,
}

impl Default for DirectoryClassResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectoryClassResolver {
    pub fn new() -> Self {
        Self::with_extension(DEFAULT_EXTENSION)
    }

    pub fn with_extension(extension: &str) -> Self {
        Self {
            class_dirs: Vec::new(),
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Canonical search roots, in registration order.
    pub fn class_dirs(&self) -> &[PathBuf] {
        &self.class_dirs
    }

    /// Adds a root directory. The path is canonicalized first, so relative
    /// paths and symlinks are pinned at registration time.
    pub fn register(&mut self, class_dir: impl AsRef<Path>) -> Result<&mut Self> {
        let class_dir = class_dir.as_ref();
        let canonical = std::fs::canonicalize(class_dir)
            .ok()
            .filter(|p| p.is_dir())
            .ok_or_else(|| ClassLoaderError::InvalidPath {
                path: class_dir.display().to_string(),
            })?;

        debug!(input = %class_dir.display(), dir = %canonical.display(), "registered class dir");
        self.class_dirs.push(canonical);
        Ok(self)
    }

    /// Registers each directory in order. Stops at the first invalid one;
    /// directories registered before it stay registered.
    pub fn register_all<I, P>(&mut self, class_dirs: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        for class_dir in class_dirs {
            self.register(class_dir)?;
        }
        Ok(self)
    }

    /// Every candidate path for `class_name`, in search order.
    pub fn candidate_paths(&self, class_name: &str) -> Vec<PathBuf> {
        let Some(relative) = class_name_to_relative_path(class_name, &self.extension) else {
            return Vec::new();
        };
        self.class_dirs
            .iter()
            .map(|dir| dir.join(&relative))
            .collect()
    }

    /// Returns the file that would be loaded for `class_name`, without loading it.
    pub fn find_class_file(&self, class_name: &str) -> Option<PathBuf> {
        self.candidate_paths(class_name).into_iter().find(|path| {
            let hit = path.is_file();
            trace!(class = %class_name, path = %path.display(), hit, "checked candidate");
            hit
        })
    }

    /// Loads the first matching file into `runtime`.
    ///
    /// `Ok(false)` means no root has a file for the name, and nothing was
    /// touched. Errors only come from loading a file that was found.
    pub fn resolve(&self, class_name: &str, runtime: &mut Runtime) -> Result<bool> {
        let Some(path) = self.find_class_file(class_name) else {
            debug!(class = %class_name, "no class file in search path");
            return Ok(false);
        };

        debug!(class = %class_name, path = %path.display(), "loading class file");
        runtime.define_from_file(&path)?;
        Ok(true)
    }

    /// Adds this resolver to, or removes it from, the runtime's autoloader
    /// chain. Removal matches on the `Arc` allocation, so pass the same
    /// handle that was used to enable it.
    pub fn set_autoload_hook(self: &Arc<Self>, runtime: &mut Runtime, enabled: bool) {
        let loader: Arc<dyn Autoloader> = Arc::clone(self) as Arc<dyn Autoloader>;
        if enabled {
            runtime.register_autoloader(loader);
        } else {
            runtime.unregister_autoloader(&loader);
        }
    }
}

impl Autoloader for DirectoryClassResolver {
    fn autoload(&self, class_name: &str, runtime: &mut Runtime) -> Result<bool> {
        self.resolve(class_name, runtime)
    }

    fn describe(&self) -> String {
        let dirs: Vec<String> = self
            .class_dirs
            .iter()
            .map(|d| d.display().to_string())
            .collect();
        format!("DirectoryClassResolver[{}]", dirs.join(", "))
    }
}
