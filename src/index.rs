//! The type index contract and the archive/source backed implementation.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::catalog::{self, CatalogEntry};
use crate::classpath::ClasspathConfig;
use crate::error::IndexBuildError;
use crate::project::scan_files;
use crate::structure::parse_java_unit;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Type,
    Package,
    Element,
}

/// Reference to a host symbol that outlives any single query or index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SymbolHandle {
    /// Source-level qualified name: `java.util.Map.Entry`, not `Map$Entry`.
    pub fq_name: String,
    pub kind: SymbolKind,
}

impl SymbolHandle {
    pub fn new(fq_name: impl Into<String>, kind: SymbolKind) -> Self {
        Self {
            fq_name: fq_name.into(),
            kind,
        }
    }

    pub fn of_type(fq_name: impl Into<String>) -> Self {
        Self::new(fq_name, SymbolKind::Type)
    }

    pub fn of_package(fq_name: impl Into<String>) -> Self {
        Self::new(fq_name, SymbolKind::Package)
    }
}

/// Where a symbol is declared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SymbolLocation {
    Source { path: PathBuf },
    Archive { archive: PathBuf, entry: String },
    Directory { path: PathBuf },
}

/// Read-only queries over one project's classpath.
pub trait TypeIndex: Send + Sync {
    fn find_type(&self, fq_name: &str) -> Option<SymbolHandle>;

    fn find_package(&self, fq_name: &str) -> Option<SymbolHandle>;

    /// Linkage name for a source-level type name (`a.Outer.Inner` to
    /// `a.Outer$Inner`). Binary names the index knows map to themselves.
    fn binary_name(&self, name: &str) -> Option<String>;

    /// `None` when the symbol cannot be found in this index.
    fn is_deprecated(&self, symbol: &SymbolHandle) -> Option<bool>;

    fn location_of(&self, symbol: &SymbolHandle) -> Option<SymbolLocation>;

    /// Qualified names of every type whose simple name is `simple_name`, sorted.
    fn types_with_simple_name(&self, simple_name: &str) -> Vec<String>;

    /// Packages equal to or nested under `prefix`, sorted. An empty prefix lists all.
    fn packages_with_prefix(&self, prefix: &str) -> Vec<String>;

    fn type_count(&self) -> usize;
}

pub trait IndexBuilder: Send + Sync {
    fn build(&self, config: &ClasspathConfig) -> Result<Arc<dyn TypeIndex>, IndexBuildError>;
}

#[derive(Debug, Clone)]
struct TypeRecord {
    binary_name: String,
    location: SymbolLocation,
    deprecated: bool,
}

/// Index over jars, class directories and Java source roots.
///
/// Source roots shadow the search path, and earlier search entries shadow
/// later ones, as on a real classpath.
#[derive(Debug, Default)]
pub struct ArchiveIndex {
    types: HashMap<String, TypeRecord>,
    by_binary: HashMap<String, String>,
    by_simple: HashMap<String, BTreeSet<String>>,
    packages: BTreeSet<String>,
}

impl ArchiveIndex {
    pub fn build(config: &ClasspathConfig, parallel: bool) -> Result<Self, IndexBuildError> {
        let mut index = Self::default();

        let sources: Vec<PathBuf> = config
            .source_roots()
            .iter()
            .filter(|root| root.is_dir())
            .flat_map(|root| {
                let mut files = scan_files(root, |p| p.extension().is_some_and(|e| e == "java"));
                files.sort();
                files
            })
            .collect();
        let units = map_maybe_parallel(&sources, parallel, |path| read_source_types(path));
        for (path, unit) in sources.iter().zip(units) {
            for (binary_name, deprecated) in unit? {
                index.insert(
                    binary_name,
                    SymbolLocation::Source { path: path.clone() },
                    deprecated,
                );
            }
        }

        let roots: Vec<&PathBuf> = config
            .search_path()
            .iter()
            .filter(|root| {
                if root.is_dir() || (root.is_file() && catalog::is_archive(root)) {
                    return true;
                }
                tracing::debug!(root = %root.display(), "skipping missing or unsupported classpath root");
                false
            })
            .collect();
        let catalogs = map_maybe_parallel(&roots, parallel, |root| catalog_root(root));
        for (root, entries) in roots.into_iter().zip(catalogs) {
            let is_archive = !root.is_dir();
            for entry in entries? {
                let CatalogEntry {
                    binary_name,
                    entry,
                    deprecated,
                } = entry;
                let location = if is_archive {
                    SymbolLocation::Archive {
                        archive: root.clone(),
                        entry,
                    }
                } else {
                    SymbolLocation::Directory {
                        path: root.join(entry),
                    }
                };
                index.insert(binary_name, location, deprecated);
            }
        }

        Ok(index)
    }

    fn insert(&mut self, binary_name: String, location: SymbolLocation, deprecated: bool) {
        let fq_name = source_name(&binary_name);
        if self.types.contains_key(&fq_name) {
            return;
        }

        let (package, _) = split_package(&binary_name);
        let mut pkg = package;
        while !pkg.is_empty() {
            if !self.packages.insert(pkg.to_string()) {
                break;
            }
            pkg = split_package(pkg).0;
        }

        let simple = fq_name.rsplit('.').next().unwrap_or(&fq_name).to_string();
        self.by_simple.entry(simple).or_default().insert(fq_name.clone());
        self.by_binary.insert(binary_name.clone(), fq_name.clone());
        self.types.insert(
            fq_name,
            TypeRecord {
                binary_name,
                location,
                deprecated,
            },
        );
    }

    fn record(&self, name: &str) -> Option<&TypeRecord> {
        self.types.get(name).or_else(|| {
            self.by_binary
                .get(name)
                .and_then(|fq| self.types.get(fq))
        })
    }
}

impl TypeIndex for ArchiveIndex {
    fn find_type(&self, fq_name: &str) -> Option<SymbolHandle> {
        self.types
            .contains_key(fq_name)
            .then(|| SymbolHandle::of_type(fq_name))
    }

    fn find_package(&self, fq_name: &str) -> Option<SymbolHandle> {
        self.packages
            .contains(fq_name)
            .then(|| SymbolHandle::of_package(fq_name))
    }

    fn binary_name(&self, name: &str) -> Option<String> {
        self.record(name).map(|r| r.binary_name.clone())
    }

    fn is_deprecated(&self, symbol: &SymbolHandle) -> Option<bool> {
        match symbol.kind {
            SymbolKind::Type => self.types.get(&symbol.fq_name).map(|r| r.deprecated),
            // package-info annotations are not read
            SymbolKind::Package => self.packages.contains(&symbol.fq_name).then_some(false),
            SymbolKind::Element => None,
        }
    }

    fn location_of(&self, symbol: &SymbolHandle) -> Option<SymbolLocation> {
        match symbol.kind {
            SymbolKind::Type => self.types.get(&symbol.fq_name).map(|r| r.location.clone()),
            SymbolKind::Package | SymbolKind::Element => None,
        }
    }

    fn types_with_simple_name(&self, simple_name: &str) -> Vec<String> {
        self.by_simple
            .get(simple_name)
            .map(|names| names.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn packages_with_prefix(&self, prefix: &str) -> Vec<String> {
        let nested = format!("{prefix}.");
        self.packages
            .range(prefix.to_string()..)
            .take_while(|p| p.starts_with(prefix))
            .filter(|p| prefix.is_empty() || p.as_str() == prefix || p.starts_with(&nested))
            .cloned()
            .collect()
    }

    fn type_count(&self) -> usize {
        self.types.len()
    }
}

/// Builds [`ArchiveIndex`] instances, cataloging roots on the rayon pool.
#[derive(Debug, Clone, Copy)]
pub struct ArchiveIndexBuilder {
    parallel: bool,
}

impl ArchiveIndexBuilder {
    pub fn new(parallel: bool) -> Self {
        Self { parallel }
    }
}

impl Default for ArchiveIndexBuilder {
    fn default() -> Self {
        Self::new(true)
    }
}

impl IndexBuilder for ArchiveIndexBuilder {
    fn build(&self, config: &ClasspathConfig) -> Result<Arc<dyn TypeIndex>, IndexBuildError> {
        Ok(Arc::new(ArchiveIndex::build(config, self.parallel)?))
    }
}

/// `a.b.Outer$Inner` to `a.b.Outer.Inner`.
pub fn source_name(binary_name: &str) -> String {
    binary_name.replace('$', ".")
}

/// Splits a binary name at its last `.`; `("", name)` in the default package.
fn split_package(name: &str) -> (&str, &str) {
    name.rsplit_once('.').unwrap_or(("", name))
}

fn map_maybe_parallel<T, R, F>(items: &[T], parallel: bool, f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync + Send,
{
    if parallel {
        items.par_iter().map(f).collect()
    } else {
        items.iter().map(f).collect()
    }
}

fn catalog_root(root: &Path) -> Result<Vec<CatalogEntry>, IndexBuildError> {
    if root.is_dir() {
        catalog::catalog_directory(root)
    } else {
        catalog::catalog_archive(root)
    }
}

fn read_source_types(path: &Path) -> Result<Vec<(String, bool)>, IndexBuildError> {
    let bytes = std::fs::read(path).map_err(|source| IndexBuildError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let Ok(text) = String::from_utf8(bytes) else {
        tracing::trace!(path = %path.display(), "skipping non UTF-8 source file");
        return Ok(Vec::new());
    };
    Ok(parse_java_unit(&text)
        .map(|unit| {
            unit.types
                .into_iter()
                .map(|t| (t.binary_name, t.deprecated))
                .collect()
        })
        .unwrap_or_default())
}
