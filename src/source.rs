//! Source identities, normalized text, and where text comes from.

use parking_lot::RwLock;
use serde::Serialize;
use std::borrow::Cow;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::ContentError;
use crate::project::ProjectId;

/// Stable handle to a guest source file. Compared by identity, never content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FileId {
    project: ProjectId,
    path: PathBuf,
}

impl FileId {
    pub fn new(project: ProjectId, path: impl Into<PathBuf>) -> Self {
        Self {
            project,
            path: path.into(),
        }
    }

    pub fn project(&self) -> &ProjectId {
        &self.project
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Converts `\r\n` and lone `\r` to `\n`. Borrows when there is nothing to do.
pub fn normalize_line_endings(text: &str) -> Cow<'_, str> {
    if !text.contains('\r') {
        return Cow::Borrowed(text);
    }
    Cow::Owned(text.replace("\r\n", "\n").replace('\r', "\n"))
}

/// Immutable logical content of a file: identity plus normalized text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceText {
    file: Option<FileId>,
    text: Arc<str>,
}

impl SourceText {
    pub fn new(file: FileId, text: &str) -> Self {
        Self {
            file: Some(file),
            text: Arc::from(normalize_line_endings(text)),
        }
    }

    /// Text with no identity, for scratch parses.
    pub fn detached(text: &str) -> Self {
        Self {
            file: None,
            text: Arc::from(normalize_line_endings(text)),
        }
    }

    pub fn file(&self) -> Option<&FileId> {
        self.file.as_ref()
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

pub trait ContentProvider: Send + Sync {
    fn read_text(&self, file: &FileId) -> Result<String, ContentError>;
}

/// Reads files straight from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsContentProvider;

impl ContentProvider for FsContentProvider {
    fn read_text(&self, file: &FileId) -> Result<String, ContentError> {
        let path = file.path();
        let bytes = std::fs::read(path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => ContentError::NotFound(path.to_path_buf()),
            _ => ContentError::Io {
                path: path.to_path_buf(),
                source,
            },
        })?;
        String::from_utf8(bytes).map_err(|_| ContentError::Encoding(path.to_path_buf()))
    }
}

/// Unsaved editor buffers layered over another provider.
///
/// An open buffer wins over whatever `base` would return for the same file.
#[derive(Debug, Default)]
pub struct OverlayContentProvider<C = FsContentProvider> {
    base: C,
    buffers: RwLock<HashMap<FileId, Arc<str>>>,
}

impl<C: ContentProvider> OverlayContentProvider<C> {
    pub fn new(base: C) -> Self {
        Self {
            base,
            buffers: RwLock::new(HashMap::new()),
        }
    }

    pub fn set_buffer(&self, file: FileId, text: &str) {
        self.buffers.write().insert(file, Arc::from(text));
    }

    /// Drops the buffer for `file`; later reads fall through to the base provider.
    pub fn close_buffer(&self, file: &FileId) -> bool {
        self.buffers.write().remove(file).is_some()
    }
}

impl<C: ContentProvider> ContentProvider for OverlayContentProvider<C> {
    fn read_text(&self, file: &FileId) -> Result<String, ContentError> {
        if let Some(text) = self.buffers.read().get(file) {
            return Ok(text.to_string());
        }
        self.base.read_text(file)
    }
}
