use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

use crate::project::ClasspathRoots;

/// Effective classpath of one project: an immutable snapshot.
///
/// Boot and compile roots are concatenated into a single search path (boot
/// first, duplicates dropped); source roots stay separate. A changed project
/// gets a new config, never an edited one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClasspathConfig {
    search: Vec<PathBuf>,
    source: Vec<PathBuf>,
    fingerprint: String,
}

impl ClasspathConfig {
    pub fn merge(roots: &ClasspathRoots) -> Self {
        let search = dedup_in_order(roots.boot.iter().chain(roots.compile.iter()));
        let source = dedup_in_order(roots.source.iter());
        let fingerprint = fingerprint(&search, &source);
        Self {
            search,
            source,
            fingerprint,
        }
    }

    pub fn search_path(&self) -> &[PathBuf] {
        &self.search
    }

    pub fn source_roots(&self) -> &[PathBuf] {
        &self.source
    }

    /// SHA-256 over both root lists, hex encoded.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn is_empty(&self) -> bool {
        self.search.is_empty() && self.source.is_empty()
    }
}

fn dedup_in_order<'a>(paths: impl Iterator<Item = &'a PathBuf>) -> Vec<PathBuf> {
    let mut out: Vec<PathBuf> = Vec::new();
    for path in paths {
        if !out.contains(path) {
            out.push(path.clone());
        }
    }
    out
}

fn fingerprint(search: &[PathBuf], source: &[PathBuf]) -> String {
    let mut hasher = Sha256::new();
    hash_role(&mut hasher, "search", search);
    hash_role(&mut hasher, "source", source);
    hex::encode(hasher.finalize())
}

fn hash_role(hasher: &mut Sha256, role: &str, paths: &[PathBuf]) {
    hasher.update(role.as_bytes());
    hasher.update([0u8]);
    for path in paths {
        hasher.update(path_bytes(path).as_bytes());
        hasher.update([b'\n']);
    }
}

fn path_bytes(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
