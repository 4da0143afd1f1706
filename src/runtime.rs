//! Host environment for loaded classes.
//!
//! A [`Runtime`] owns the table of defined classes and an ordered chain of
//! [`Autoloader`]s supplied by startup code. Nothing here is process-global:
//! two runtimes never observe each other's classes or loaders.

use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::declarations::{DeclarationKind, hash_content, parse_declarations};
use crate::error::{ClassLoaderError, Result};
use crate::identifier::class_key;

/// Callback invoked when a referenced class is not yet defined.
///
/// Returns `true` when it found and loaded a file for the name. The runtime
/// treats that as a hint only: it checks its own table afterwards.
pub trait Autoloader {
    fn autoload(&self, class_name: &str, runtime: &mut Runtime) -> Result<bool>;

    fn describe(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DefinedClass {
    pub name: String,
    pub kind: DeclarationKind,
    pub path: PathBuf,
    pub content_hash: String,
}

#[derive(Default)]
pub struct Runtime {
    classes: BTreeMap<String, DefinedClass>,
    autoloaders: Vec<Arc<dyn Autoloader>>,
    loading: HashSet<String>,
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("classes", &self.classes.len())
            .field(
                "autoloaders",
                &self
                    .autoloaders
                    .iter()
                    .map(|a| a.describe())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Runtime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_autoloaders(autoloaders: Vec<Arc<dyn Autoloader>>) -> Self {
        Self {
            autoloaders,
            ..Self::default()
        }
    }

    pub fn register_autoloader(&mut self, autoloader: Arc<dyn Autoloader>) {
        debug!(autoloader = %autoloader.describe(), "registering autoloader");
        self.autoloaders.push(autoloader);
    }

    /// Removes the first registered entry that is the same allocation as
    /// `autoloader`. Returns whether anything was removed.
    pub fn unregister_autoloader(&mut self, autoloader: &Arc<dyn Autoloader>) -> bool {
        let target = Arc::as_ptr(autoloader);
        let Some(pos) = self
            .autoloaders
            .iter()
            .position(|a| std::ptr::addr_eq(Arc::as_ptr(a), target))
        else {
            return false;
        };
        let removed = self.autoloaders.remove(pos);
        debug!(autoloader = %removed.describe(), "unregistered autoloader");
        true
    }

    pub fn autoloaders(&self) -> &[Arc<dyn Autoloader>] {
        &self.autoloaders
    }

    pub fn is_defined(&self, class_name: &str) -> bool {
        self.classes.contains_key(&class_key(class_name))
    }

    pub fn get(&self, class_name: &str) -> Option<&DefinedClass> {
        self.classes.get(&class_key(class_name))
    }

    pub fn classes(&self) -> impl Iterator<Item = &DefinedClass> {
        self.classes.values()
    }

    /// Reads a source file and defines every class it declares.
    ///
    /// All-or-nothing: if any declared name is already taken, nothing from
    /// the file is recorded.
    pub fn define_from_file(&mut self, path: &Path) -> Result<Vec<String>> {
        let content = std::fs::read(path).map_err(|source| ClassLoaderError::ReadSource {
            path: path.to_path_buf(),
            source,
        })?;
        let content_hash = hash_content(&content);
        let declarations = parse_declarations(&content)?;

        let mut seen = HashSet::new();
        for decl in &declarations {
            let key = class_key(&decl.name);
            if self.classes.contains_key(&key) || !seen.insert(key) {
                return Err(ClassLoaderError::ClassAlreadyDefined {
                    name: decl.name.clone(),
                    path: path.to_path_buf(),
                });
            }
        }

        let mut defined = Vec::with_capacity(declarations.len());
        for decl in declarations {
            debug!(class = %decl.name, path = %path.display(), "defined class");
            self.classes.insert(
                class_key(&decl.name),
                DefinedClass {
                    name: decl.name.clone(),
                    kind: decl.kind,
                    path: path.to_path_buf(),
                    content_hash: content_hash.clone(),
                },
            );
            defined.push(decl.name);
        }
        Ok(defined)
    }

    /// Checks the class table, optionally running the autoloader chain on a
    /// miss. The chain stops at the first loader after which the class is
    /// defined.
    pub fn class_exists(&mut self, class_name: &str, autoload: bool) -> Result<bool> {
        let class_name = class_name.trim_start_matches('\\');
        let key = class_key(class_name);
        if self.classes.contains_key(&key) {
            return Ok(true);
        }
        if !autoload || key.is_empty() {
            return Ok(false);
        }
        // A loader asking for the class it is currently loading.
        if !self.loading.insert(key.clone()) {
            return Ok(false);
        }

        let result = self.run_autoloaders(class_name, &key);
        self.loading.remove(&key);
        result
    }

    fn run_autoloaders(&mut self, class_name: &str, key: &str) -> Result<bool> {
        let chain = self.autoloaders.clone();
        for autoloader in chain {
            let loaded = autoloader.autoload(class_name, self)?;
            debug!(
                class = %class_name,
                autoloader = %autoloader.describe(),
                loaded,
                "autoloader finished"
            );
            if self.classes.contains_key(key) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn require_class(&mut self, class_name: &str) -> Result<&DefinedClass> {
        if !self.class_exists(class_name, true)? {
            return Err(ClassLoaderError::ClassNotFound {
                name: class_name.trim_start_matches('\\').to_string(),
            });
        }
        self.get(class_name)
            .ok_or_else(|| ClassLoaderError::ClassNotFound {
                name: class_name.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Loads from a fixed name → file table and records every call.
    struct FixedLoader {
        files: HashMap<String, PathBuf>,
        calls: RefCell<Vec<String>>,
    }

    impl FixedLoader {
        fn new(files: &[(&str, &Path)]) -> Arc<Self> {
            Arc::new(Self {
                files: files
                    .iter()
                    .map(|(name, path)| (name.to_string(), path.to_path_buf()))
                    .collect(),
                calls: RefCell::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }
    }

    impl Autoloader for FixedLoader {
        fn autoload(&self, class_name: &str, runtime: &mut Runtime) -> Result<bool> {
            self.calls.borrow_mut().push(class_name.to_string());
            match self.files.get(class_name) {
                Some(path) => {
                    runtime.define_from_file(path)?;
                    Ok(true)
                }
                None => Ok(false),
            }
        }
    }

    fn write_php(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, format!("<?php\n{body}\n")).unwrap();
        path
    }

    #[test]
    fn define_from_file_records_every_declaration() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        let path = write_php(
            dir.path(),
            "Pair.php",
            "namespace Acme;\ninterface Left {}\nclass Pair implements Left {}",
        );

        let mut runtime = Runtime::new();
        let defined = runtime.define_from_file(&path)?;
        assert_eq!(defined, vec!["Acme\\Left", "Acme\\Pair"]);

        let pair = runtime.get("\\acme\\PAIR").unwrap();
        assert_eq!(pair.name, "Acme\\Pair");
        assert_eq!(pair.kind, DeclarationKind::Class);
        assert_eq!(pair.path, path);
        assert_eq!(pair.content_hash.len(), 64);
        Ok(())
    }

    #[test]
    fn redeclaration_is_rejected_without_partial_definitions() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        let first = write_php(dir.path(), "A.php", "class A {}");
        let second = write_php(dir.path(), "AB.php", "class B {}\nclass A {}");

        let mut runtime = Runtime::new();
        runtime.define_from_file(&first)?;
        let err = runtime.define_from_file(&second).unwrap_err();
        assert!(matches!(err, ClassLoaderError::ClassAlreadyDefined { ref name, .. } if name == "A"));
        assert!(!runtime.is_defined("B"));
        Ok(())
    }

    #[test]
    fn missing_source_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Runtime::new()
            .define_from_file(&dir.path().join("Gone.php"))
            .unwrap_err();
        assert!(matches!(err, ClassLoaderError::ReadSource { .. }));
    }

    #[test]
    fn chain_stops_once_class_is_defined() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        let foo = write_php(dir.path(), "Foo.php", "class Foo {}");

        let first = FixedLoader::new(&[]);
        let second = FixedLoader::new(&[("Foo", foo.as_path())]);
        let third = FixedLoader::new(&[("Foo", foo.as_path())]);
        let chain: Vec<Arc<dyn Autoloader>> = vec![first.clone(), second.clone(), third.clone()];
        let mut runtime = Runtime::with_autoloaders(chain);

        assert!(runtime.class_exists("Foo", true)?);
        assert_eq!(first.calls(), vec!["Foo"]);
        assert_eq!(second.calls(), vec!["Foo"]);
        assert!(third.calls().is_empty());

        // Defined classes never reach the chain again.
        assert!(runtime.class_exists("\\Foo", true)?);
        assert_eq!(second.calls().len(), 1);
        Ok(())
    }

    #[test]
    fn class_exists_without_autoload_skips_the_chain() -> Result<()> {
        let loader = FixedLoader::new(&[]);
        let mut runtime = Runtime::new();
        runtime.register_autoloader(loader.clone());
        assert!(!runtime.class_exists("Nope", false)?);
        assert!(loader.calls().is_empty());
        Ok(())
    }

    #[test]
    fn require_class_reports_missing_classes() {
        let mut runtime = Runtime::new();
        runtime.register_autoloader(FixedLoader::new(&[]));
        let err = runtime.require_class("\\Missing\\Thing").unwrap_err();
        assert!(matches!(err, ClassLoaderError::ClassNotFound { ref name } if name == "Missing\\Thing"));
    }

    struct Reentrant;

    impl Autoloader for Reentrant {
        fn autoload(&self, class_name: &str, runtime: &mut Runtime) -> Result<bool> {
            runtime.class_exists(class_name, true)
        }
    }

    #[test]
    fn nested_lookup_of_the_loading_class_does_not_recurse() -> Result<()> {
        let mut runtime = Runtime::new();
        runtime.register_autoloader(Arc::new(Reentrant));
        assert!(!runtime.class_exists("Loop", true)?);
        // The guard is released afterwards.
        assert!(!runtime.class_exists("Loop", true)?);
        Ok(())
    }

    #[test]
    fn unregister_matches_by_identity() {
        let a: Arc<dyn Autoloader> = FixedLoader::new(&[]);
        let b: Arc<dyn Autoloader> = FixedLoader::new(&[]);
        let mut runtime = Runtime::new();
        runtime.register_autoloader(a.clone());
        runtime.register_autoloader(b.clone());

        assert!(runtime.unregister_autoloader(&a));
        assert!(!runtime.unregister_autoloader(&a));
        assert_eq!(runtime.autoloaders().len(), 1);
        assert!(std::ptr::addr_eq(
            Arc::as_ptr(&runtime.autoloaders()[0]),
            Arc::as_ptr(&b)
        ));
    }
}
