//! Cache of parsed guest-language files.
//!
//! A cached tree is replaced only when the text read for its file differs from
//! the text it was built from. The comparison is full-text after line-ending
//! normalization; there is no incremental reparsing. When a file changes twice
//! in quick succession the last complete read wins.

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use crate::error::{ParseError, SourceError};
use crate::source::{ContentProvider, FileId, SourceText, normalize_line_endings};

pub trait GuestParser: Send + Sync {
    type Tree: Send + Sync;

    fn parse(&self, source: &SourceText) -> Result<Self::Tree, ParseError>;
}

/// A parse result together with the exact text it was produced from.
#[derive(Debug)]
pub struct ParsedTree<T> {
    source: SourceText,
    tree: T,
}

impl<T> ParsedTree<T> {
    pub fn source(&self) -> &SourceText {
        &self.source
    }

    pub fn text(&self) -> &str {
        self.source.text()
    }

    pub fn file(&self) -> Option<&FileId> {
        self.source.file()
    }

    pub fn tree(&self) -> &T {
        &self.tree
    }
}

type Slot<T> = Arc<Mutex<Option<Arc<ParsedTree<T>>>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ParseCacheStats {
    pub cached_files: usize,
    pub parses: u64,
    pub hits: u64,
}

pub struct ParsedFileCache<P: GuestParser, C> {
    parser: P,
    content: C,
    // The map lock is only held to find a slot; each slot serializes its file.
    slots: Mutex<HashMap<FileId, Slot<P::Tree>>>,
    cached_files: AtomicUsize,
    parses: AtomicU64,
    hits: AtomicU64,
}

impl<P: GuestParser, C: ContentProvider> ParsedFileCache<P, C> {
    pub fn new(parser: P, content: C) -> Self {
        Self {
            parser,
            content,
            slots: Mutex::new(HashMap::new()),
            cached_files: AtomicUsize::new(0),
            parses: AtomicU64::new(0),
            hits: AtomicU64::new(0),
        }
    }

    pub fn parser(&self) -> &P {
        &self.parser
    }

    pub fn content(&self) -> &C {
        &self.content
    }

    /// Parses `text` as the content of `file` without touching the cache.
    pub fn parse(&self, file: &FileId, text: &str) -> Result<ParsedTree<P::Tree>, ParseError> {
        self.parse_source(SourceText::new(file.clone(), text))
    }

    /// Parses throwaway text with no identity. Never cached.
    pub fn ephemeral_tree(&self, text: &str) -> Result<ParsedTree<P::Tree>, ParseError> {
        self.parse_source(SourceText::detached(text))
    }

    /// Current tree for `file`, re-parsing only if its text changed.
    ///
    /// On a read failure or a parse failure the cached tree, if any, is kept.
    pub fn get_or_update(&self, file: &FileId) -> Result<Arc<ParsedTree<P::Tree>>, SourceError> {
        loop {
            let slot = self.slot(file);
            let mut entry = slot.lock();
            // evicted while we waited
            if !self.is_registered(file, &slot) {
                continue;
            }

            let result = self.refresh(file, &mut entry);
            if result.is_err() && entry.is_none() {
                self.unregister(file, &slot);
            }
            return result;
        }
    }

    /// Cached tree for `file` without reading its content.
    pub fn cached(&self, file: &FileId) -> Option<Arc<ParsedTree<P::Tree>>> {
        let slot = self.slots.lock().get(file).cloned()?;
        let entry = slot.lock();
        entry.clone()
    }

    pub fn evict(&self, file: &FileId) -> bool {
        let Some(slot) = self.slots.lock().remove(file) else {
            return false;
        };
        let removed = slot.lock().take().is_some();
        if removed {
            self.cached_files.fetch_sub(1, Ordering::Relaxed);
        }
        removed
    }

    pub fn clear(&self) {
        let drained: Vec<_> = self.slots.lock().drain().map(|(_, slot)| slot).collect();
        for slot in drained {
            if slot.lock().take().is_some() {
                self.cached_files.fetch_sub(1, Ordering::Relaxed);
            }
        }
    }

    pub fn stats(&self) -> ParseCacheStats {
        ParseCacheStats {
            cached_files: self.cached_files.load(Ordering::Relaxed),
            parses: self.parses.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
        }
    }

    fn refresh(
        &self,
        file: &FileId,
        entry: &mut Option<Arc<ParsedTree<P::Tree>>>,
    ) -> Result<Arc<ParsedTree<P::Tree>>, SourceError> {
        let raw = self.content.read_text(file)?;
        let text = normalize_line_endings(&raw);

        if let Some(cached) = entry.as_ref()
            && cached.text() == text
        {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(path = %file.path().display(), "parsed file cache hit");
            return Ok(Arc::clone(cached));
        }

        let parsed = match self.parse(file, &text) {
            Ok(parsed) => Arc::new(parsed),
            Err(err) => {
                tracing::debug!(
                    path = %file.path().display(),
                    kept_previous = entry.is_some(),
                    error = %err,
                    "guest parse failed"
                );
                return Err(err.into());
            }
        };

        if entry.replace(Arc::clone(&parsed)).is_none() {
            self.cached_files.fetch_add(1, Ordering::Relaxed);
        }
        tracing::debug!(path = %file.path().display(), bytes = text.len(), "parsed file cached");
        Ok(parsed)
    }

    fn parse_source(&self, source: SourceText) -> Result<ParsedTree<P::Tree>, ParseError> {
        let tree = self.parser.parse(&source)?;
        self.parses.fetch_add(1, Ordering::Relaxed);
        Ok(ParsedTree { source, tree })
    }

    fn slot(&self, file: &FileId) -> Slot<P::Tree> {
        let mut slots = self.slots.lock();
        Arc::clone(slots.entry(file.clone()).or_default())
    }

    // Taken with the slot lock held; never the other way round.
    fn is_registered(&self, file: &FileId, slot: &Slot<P::Tree>) -> bool {
        self.slots
            .lock()
            .get(file)
            .is_some_and(|registered| Arc::ptr_eq(registered, slot))
    }

    fn unregister(&self, file: &FileId, slot: &Slot<P::Tree>) {
        let mut slots = self.slots.lock();
        if slots
            .get(file)
            .is_some_and(|registered| Arc::ptr_eq(registered, slot))
        {
            slots.remove(file);
        }
    }
}
