//! In-memory collaborators for unit tests.
//!
//! `FakeBuilder` treats every search-path root as a binary type name, so a
//! project with `compile: ["java.util.Map$Entry", "pkg.Old!"]` knows
//! `java.util.Map.Entry` and a deprecated `pkg.Old`. Each index also knows a
//! marker type `fp.<fingerprint>` naming the config it was built from.

use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use crate::classpath::ClasspathConfig;
use crate::error::{IndexBuildError, RootsError};
use crate::index::{
    IndexBuilder, SymbolHandle, SymbolKind, SymbolLocation, TypeIndex, source_name,
};
use crate::project::{ClasspathRoots, ProjectId, ProjectModel};

#[derive(Default)]
pub struct FakeModel {
    roots: RwLock<HashMap<ProjectId, ClasspathRoots>>,
    guest_disabled: RwLock<HashSet<ProjectId>>,
    broken: RwLock<HashSet<ProjectId>>,
}

impl FakeModel {
    pub fn with_types(projects: &[(&str, &[&str])]) -> Self {
        let model = Self::default();
        for (name, types) in projects {
            model.set_types(&ProjectId::new(*name), types);
        }
        model
    }

    pub fn set_types(&self, project: &ProjectId, types: &[&str]) {
        let roots = ClasspathRoots {
            compile: types.iter().map(PathBuf::from).collect(),
            ..ClasspathRoots::default()
        };
        self.roots.write().insert(project.clone(), roots);
    }

    pub fn disable_guest(&self, project: &ProjectId) {
        self.guest_disabled.write().insert(project.clone());
    }

    /// Keeps the project listed but makes its roots unreadable.
    pub fn break_roots(&self, project: &ProjectId) {
        self.broken.write().insert(project.clone());
    }
}

impl ProjectModel for FakeModel {
    fn roots(&self, project: &ProjectId) -> Result<ClasspathRoots, RootsError> {
        if self.broken.read().contains(project) {
            return Err(RootsError::Unavailable {
                project: project.clone(),
                reason: "roots unreadable".to_string(),
            });
        }
        self.roots
            .read()
            .get(project)
            .cloned()
            .ok_or_else(|| RootsError::UnknownProject(project.clone()))
    }

    fn is_guest_enabled(&self, project: &ProjectId) -> bool {
        self.roots.read().contains_key(project) && !self.guest_disabled.read().contains(project)
    }
}

#[derive(Default)]
pub struct FakeBuilder {
    pub builds: AtomicUsize,
    pub lookups: Arc<AtomicUsize>,
    pub failing: AtomicBool,
    pub delay: Option<Duration>,
}

impl FakeBuilder {
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl IndexBuilder for FakeBuilder {
    fn build(&self, config: &ClasspathConfig) -> Result<Arc<dyn TypeIndex>, IndexBuildError> {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(IndexBuildError::Io {
                path: PathBuf::from("fake.jar"),
                source: std::io::Error::other("builder failure"),
            });
        }
        self.builds.fetch_add(1, Ordering::SeqCst);

        let mut index = FakeIndex {
            lookups: Arc::clone(&self.lookups),
            ..FakeIndex::default()
        };
        index.add(&format!("fp.{}", config.fingerprint()));
        for root in config.search_path() {
            index.add(&root.to_string_lossy());
        }
        Ok(Arc::new(index))
    }
}

#[derive(Default)]
pub struct FakeIndex {
    /// source name -> (binary name, deprecated)
    types: HashMap<String, (String, bool)>,
    packages: BTreeSet<String>,
    lookups: Arc<AtomicUsize>,
}

impl FakeIndex {
    fn add(&mut self, entry: &str) {
        let (binary, deprecated) = match entry.strip_suffix('!') {
            Some(binary) => (binary, true),
            None => (entry, false),
        };
        let mut pkg = binary.rsplit_once('.').map(|(p, _)| p).unwrap_or("");
        while !pkg.is_empty() {
            self.packages.insert(pkg.to_string());
            pkg = pkg.rsplit_once('.').map(|(p, _)| p).unwrap_or("");
        }
        self.types
            .insert(source_name(binary), (binary.to_string(), deprecated));
    }

    fn touch(&self) {
        self.lookups.fetch_add(1, Ordering::SeqCst);
    }
}

impl TypeIndex for FakeIndex {
    fn find_type(&self, fq_name: &str) -> Option<SymbolHandle> {
        self.touch();
        self.types
            .contains_key(fq_name)
            .then(|| SymbolHandle::of_type(fq_name))
    }

    fn find_package(&self, fq_name: &str) -> Option<SymbolHandle> {
        self.touch();
        self.packages
            .contains(fq_name)
            .then(|| SymbolHandle::of_package(fq_name))
    }

    fn binary_name(&self, name: &str) -> Option<String> {
        self.touch();
        self.types
            .get(name)
            .or_else(|| self.types.values().find(|(binary, _)| binary == name))
            .map(|(binary, _)| binary.clone())
    }

    fn is_deprecated(&self, symbol: &SymbolHandle) -> Option<bool> {
        self.touch();
        match symbol.kind {
            SymbolKind::Type => self.types.get(&symbol.fq_name).map(|(_, d)| *d),
            SymbolKind::Package => self.packages.contains(&symbol.fq_name).then_some(false),
            SymbolKind::Element => None,
        }
    }

    fn location_of(&self, symbol: &SymbolHandle) -> Option<SymbolLocation> {
        self.touch();
        let (binary, _) = self.types.get(&symbol.fq_name)?;
        Some(SymbolLocation::Archive {
            archive: PathBuf::from("fake.jar"),
            entry: format!("{}.class", binary.replace('.', "/")),
        })
    }

    fn types_with_simple_name(&self, simple_name: &str) -> Vec<String> {
        self.touch();
        let mut names: Vec<String> = self
            .types
            .keys()
            .filter(|fq| fq.rsplit('.').next() == Some(simple_name))
            .cloned()
            .collect();
        names.sort();
        names
    }

    fn packages_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.touch();
        let nested = format!("{prefix}.");
        self.packages
            .iter()
            .filter(|p| prefix.is_empty() || p.as_str() == prefix || p.starts_with(&nested))
            .cloned()
            .collect()
    }

    fn type_count(&self) -> usize {
        self.types.len()
    }
}
