use anyhow::{Context, Result};
use std::env;
use std::ffi::OsString;
use std::path::PathBuf;

use crate::cli::Cli;
use crate::identifier::DEFAULT_EXTENSION;
use crate::resolver::DirectoryClassResolver;

/// Search roots, in the platform's path-list syntax (`a:b` or `a;b`).
pub const PATH_ENV: &str = "CLASS_LOADER_PATH";
pub const EXT_ENV: &str = "CLASS_LOADER_EXT";

pub fn resolve_class_dirs(cli: &Cli) -> Result<Vec<PathBuf>> {
    let cwd = env::current_dir().context("Failed to resolve current directory")?;
    Ok(class_dirs_from(&cli.dirs, env::var_os(PATH_ENV), cwd))
}

/// `--dir` flags win over the environment; the working directory is the
/// last resort.
pub fn class_dirs_from(
    flags: &[PathBuf],
    env_value: Option<OsString>,
    cwd: PathBuf,
) -> Vec<PathBuf> {
    if !flags.is_empty() {
        return flags.to_vec();
    }

    if let Some(value) = env_value {
        let dirs: Vec<PathBuf> = env::split_paths(&value)
            .filter(|p| !p.as_os_str().is_empty())
            .collect();
        if !dirs.is_empty() {
            return dirs;
        }
    }

    vec![cwd]
}

pub fn resolve_extension(cli: &Cli) -> String {
    extension_from(cli.ext.as_deref(), env::var(EXT_ENV).ok())
}

pub fn extension_from(flag: Option<&str>, env_value: Option<String>) -> String {
    flag.map(str::to_string)
        .or(env_value)
        .map(|e| e.trim().trim_start_matches('.').to_string())
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

pub fn build_resolver(cli: &Cli) -> Result<DirectoryClassResolver> {
    let mut resolver = DirectoryClassResolver::with_extension(&resolve_extension(cli));
    resolver
        .register_all(resolve_class_dirs(cli)?)
        .context("Failed to register class directories")?;
    Ok(resolver)
}
