//! # class-loader
//!
//! Resolves PHP-style class names (`Vendor\Package\Class`, `Vendor_Package_Class`)
//! to source files below an ordered list of root directories, and loads them
//! into an explicit [`runtime::Runtime`] on demand.
//!
//! ## Architecture
//!
//! - **identifier**: class name to relative path translation
//! - **resolver**: `DirectoryClassResolver`, the ordered search path and its lookups
//! - **runtime**: class table plus the injected autoloader chain
//! - **declarations**: tree-sitter extraction of declared classes from PHP sources
//! - **catalog**: prebuilt class map manifests and their autoloader
//! - **cli** / **config** / **logging**: the `class-loader` binary's surface

pub mod catalog;
pub mod cli;
pub mod config;
pub mod declarations;
pub mod error;
pub mod identifier;
pub mod logging;
pub mod resolver;
pub mod runtime;

pub use error::{ClassLoaderError, Result};
pub use resolver::DirectoryClassResolver;
pub use runtime::{Autoloader, Runtime};
