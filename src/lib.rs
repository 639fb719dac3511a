//! # classpath-bridge
//!
//! Lets a guest-language toolchain living inside a Java host resolve host
//! symbols (types, packages, binary names, deprecation) against the classpath
//! of the project a file belongs to, and keeps parsed guest files cached until
//! their text changes.
//!
//! ## Architecture
//!
//! - **parsed**: Per-file cache of guest parse trees, re-parsed only on text change
//! - **source**: File identities, line-ending normalization and content providers
//! - **project**: Project identities, classpath roots and the open-project registry
//! - **classpath**: Merged, fingerprinted classpath configs
//! - **cache**: Per-project cache of classpath configs and their type indexes
//! - **index**: The `TypeIndex` contract and the jar/source backed implementation
//! - **catalog**: Class listings of jar archives and class directories
//! - **classfile**: Class file reader for deprecation markers
//! - **structure**: Java source declarations via tree-sitter
//! - **search**: Read-only searchers over a type index
//! - **executor**: Runs searchers inside a project's serialized index task
//! - **resolver**: Finds the project that declares a host symbol
//! - **config**: Runtime settings and workspace file loading
//! - **error**: Error types shared across the crate

pub mod cache;
pub mod catalog;
pub mod classfile;
pub mod classpath;
pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod index;
pub mod parsed;
pub mod project;
pub mod resolver;
pub mod search;
pub mod source;
pub mod structure;

#[cfg(test)]
mod testing;
