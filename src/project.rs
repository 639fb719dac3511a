//! Host project model: identities, classpath roots and the open-project set.

use ignore::WalkBuilder;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

use crate::error::RootsError;
use crate::source::FileId;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(String);

impl ProjectId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Root locations of a project, grouped by role. Order is significant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClasspathRoots {
    pub boot: Vec<PathBuf>,
    pub source: Vec<PathBuf>,
    pub compile: Vec<PathBuf>,
}

pub trait ProjectModel: Send + Sync {
    fn roots(&self, project: &ProjectId) -> Result<ClasspathRoots, RootsError>;

    /// Whether the guest language is enabled for `project`. Disabled projects
    /// are never consulted when resolving symbol ownership.
    fn is_guest_enabled(&self, project: &ProjectId) -> bool;
}

pub trait OpenProjectRegistry {
    fn open_projects(&self) -> Vec<ProjectId>;
}

/// The one open project, if there is exactly one.
///
/// Only meant for outer surfaces (CLI, editor glue) that have no project at
/// hand. Core operations always take an explicit [`ProjectId`].
pub fn sole_open_project(registry: &dyn OpenProjectRegistry) -> Option<ProjectId> {
    match registry.open_projects().as_slice() {
        [only] => Some(only.clone()),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDescriptor {
    pub name: String,
    #[serde(default = "default_guest")]
    pub guest: bool,
    #[serde(flatten)]
    pub roots: ClasspathRoots,
}

fn default_guest() -> bool {
    true
}

/// A fixed set of projects, typically loaded from a JSON workspace file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    #[serde(default)]
    pub projects: Vec<ProjectDescriptor>,
}

impl Workspace {
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    pub fn descriptor(&self, project: &ProjectId) -> Option<&ProjectDescriptor> {
        self.projects.iter().find(|p| p.name == project.as_str())
    }
}

impl ProjectModel for Workspace {
    fn roots(&self, project: &ProjectId) -> Result<ClasspathRoots, RootsError> {
        self.descriptor(project)
            .map(|p| p.roots.clone())
            .ok_or_else(|| RootsError::UnknownProject(project.clone()))
    }

    fn is_guest_enabled(&self, project: &ProjectId) -> bool {
        self.descriptor(project).is_some_and(|p| p.guest)
    }
}

impl OpenProjectRegistry for Workspace {
    fn open_projects(&self) -> Vec<ProjectId> {
        self.projects.iter().map(|p| ProjectId::new(&p.name)).collect()
    }
}

pub fn is_guest_file(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| extensions.iter().any(|wanted| wanted == ext))
}

/// Guest-language files under the source roots of `project`, sorted by path.
///
/// Projects without the guest language enabled have no guest files.
pub fn guest_files(
    model: &dyn ProjectModel,
    project: &ProjectId,
    extensions: &[String],
) -> Result<Vec<FileId>, RootsError> {
    if !model.is_guest_enabled(project) {
        return Ok(Vec::new());
    }

    let roots = model.roots(project)?;
    let mut files = Vec::new();
    for root in roots.source.iter().filter(|r| r.is_dir()) {
        files.extend(scan_files(root, |p| is_guest_file(p, extensions)));
    }
    files.sort();
    files.dedup();

    Ok(files
        .into_iter()
        .map(|path| FileId::new(project.clone(), path))
        .collect())
}

/// Parallel walk of `base_path` collecting every regular file accepted by `keep`.
pub(crate) fn scan_files<F>(base_path: &Path, keep: F) -> Vec<PathBuf>
where
    F: Fn(&Path) -> bool + Sync,
{
    let (tx, rx) = mpsc::channel();

    let walker = WalkBuilder::new(base_path)
        .hidden(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .build_parallel();

    let keep = &keep;
    walker.run(|| {
        let tx = tx.clone();
        Box::new(move |entry| {
            if let Ok(entry) = entry {
                let path = entry.path();
                if entry.file_type().is_some_and(|t| t.is_file()) && keep(path) {
                    let _ = tx.send(path.to_path_buf());
                }
            }
            ignore::WalkState::Continue
        })
    });

    drop(tx);
    rx.iter().collect()
}
