//! Error taxonomy shared by the caches and the query layer.
//!
//! Expected misses (unknown type, no owning project) are `Ok(None)` and never
//! appear here. Everything in this module is an infrastructure failure the
//! caller decides how to handle.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::project::ProjectId;

/// A source file could not be read. Cache entries are left untouched.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("file is not valid UTF-8: {}", .0.display())]
    Encoding(PathBuf),
}

/// The guest parser refused the input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("parser rejected input: {0}")]
    Rejected(String),
    #[error("parser produced no root node")]
    NoRoot,
}

/// Failure of `ParsedFileCache::get_or_update`.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// The project model could not describe a project's classpath.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RootsError {
    #[error("unknown project: {0}")]
    UnknownProject(ProjectId),
    #[error("classpath unavailable for {project}: {reason}")]
    Unavailable { project: ProjectId, reason: String },
}

/// Building a type index from a classpath failed.
#[derive(Debug, Error)]
pub enum IndexBuildError {
    #[error("io error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unreadable archive {}: {source}", .path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
}

/// A query or index task could not run. Distinct from "not found".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexUnavailable {
    #[error("no classpath for project {project}: {reason}")]
    Roots { project: ProjectId, reason: String },
    #[error("failed to build type index for project {project}: {reason}")]
    Build { project: ProjectId, reason: String },
    #[error("timed out after {waited:?} waiting for the index of project {project}")]
    Timeout { project: ProjectId, waited: Duration },
}

impl IndexUnavailable {
    pub fn project(&self) -> &ProjectId {
        match self {
            IndexUnavailable::Roots { project, .. }
            | IndexUnavailable::Build { project, .. }
            | IndexUnavailable::Timeout { project, .. } => project,
        }
    }
}
