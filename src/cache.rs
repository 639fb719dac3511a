//! Per-project cache of classpath configs and their type indexes.
//!
//! A project's config and index are built together and replaced together, so
//! a reader never sees an index built from a different config than the one it
//! is paired with. Each project has its own lock; building and querying a
//! project's index happen under that lock, and waiting for it is bounded by
//! the configured query timeout. Invalidation only raises a flag.

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crate::classpath::ClasspathConfig;
use crate::config::BridgeConfig;
use crate::error::IndexUnavailable;
use crate::index::{IndexBuilder, TypeIndex};
use crate::project::{ProjectId, ProjectModel};

/// A classpath config and the index built from it.
pub struct IndexedClasspath {
    config: ClasspathConfig,
    index: Arc<dyn TypeIndex>,
}

impl IndexedClasspath {
    pub fn config(&self) -> &ClasspathConfig {
        &self.config
    }

    pub fn index(&self) -> &dyn TypeIndex {
        self.index.as_ref()
    }

    pub fn fingerprint(&self) -> &str {
        self.config.fingerprint()
    }
}

impl std::fmt::Debug for IndexedClasspath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexedClasspath")
            .field("fingerprint", &self.config.fingerprint())
            .field("types", &self.index.type_count())
            .finish()
    }
}

#[derive(Default)]
struct ProjectSlot {
    current: Mutex<Option<Arc<IndexedClasspath>>>,
    // Set without the lock so marking a project never waits on its rebuild.
    stale: AtomicBool,
}

type Slot = Arc<ProjectSlot>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexCacheStats {
    pub indexed_projects: usize,
    pub builds: u64,
    pub failed_builds: u64,
    pub hits: u64,
}

pub struct ClasspathIndexCache {
    model: Arc<dyn ProjectModel>,
    builder: Arc<dyn IndexBuilder>,
    timeout: Duration,
    slots: Mutex<HashMap<ProjectId, Slot>>,
    indexed_projects: AtomicUsize,
    builds: AtomicU64,
    failed_builds: AtomicU64,
    hits: AtomicU64,
}

impl ClasspathIndexCache {
    pub fn new(
        model: Arc<dyn ProjectModel>,
        builder: Arc<dyn IndexBuilder>,
        config: &BridgeConfig,
    ) -> Self {
        Self {
            model,
            builder,
            timeout: config.query_timeout(),
            slots: Mutex::new(HashMap::new()),
            indexed_projects: AtomicUsize::new(0),
            builds: AtomicU64::new(0),
            failed_builds: AtomicU64::new(0),
            hits: AtomicU64::new(0),
        }
    }

    pub fn model(&self) -> &dyn ProjectModel {
        self.model.as_ref()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Current config and index for `project`, building them if missing or
    /// invalidated.
    pub fn get_or_build(&self, project: &ProjectId) -> Result<Arc<IndexedClasspath>, IndexUnavailable> {
        self.with_index(project, Arc::clone)
    }

    /// Runs `task` against the project's index while holding the project lock.
    pub fn with_index<R>(
        &self,
        project: &ProjectId,
        task: impl FnOnce(&Arc<IndexedClasspath>) -> R,
    ) -> Result<R, IndexUnavailable> {
        let deadline = Instant::now() + self.timeout;
        loop {
            let slot = self.slot(project);
            let Some(mut current) = slot.current.try_lock_until(deadline) else {
                tracing::warn!(%project, timeout_ms = self.timeout.as_millis() as u64, "index task timed out");
                return Err(IndexUnavailable::Timeout {
                    project: project.clone(),
                    waited: self.timeout,
                });
            };
            // removed while we waited; start over on the live slot
            if !self.is_registered(project, &slot) {
                continue;
            }

            let result = self.ensure_current(project, &slot.stale, &mut current);
            if result.is_err() && current.is_none() {
                self.unregister(project, &slot);
            }
            return result.map(|indexed| task(&indexed));
        }
    }

    /// Marks the project's index for rebuild; the next query re-reads its roots.
    ///
    /// Never waits for a build in progress. Returns `false` if the project is
    /// not cached.
    pub fn invalidate(&self, project: &ProjectId) -> bool {
        let Some(slot) = self.slots.lock().get(project).cloned() else {
            return false;
        };
        slot.stale.store(true, Ordering::SeqCst);
        tracing::debug!(%project, "type index invalidated");
        true
    }

    /// Forgets the project entirely, e.g. once it has been closed.
    pub fn remove_project(&self, project: &ProjectId) -> bool {
        let Some(slot) = self.slots.lock().remove(project) else {
            return false;
        };
        let removed = self.drop_index(&slot);
        tracing::debug!(%project, removed, "project removed from index cache");
        removed
    }

    pub fn clear(&self) {
        let drained: Vec<_> = self.slots.lock().drain().map(|(_, slot)| slot).collect();
        for slot in drained {
            self.drop_index(&slot);
        }
    }

    pub fn stats(&self) -> IndexCacheStats {
        IndexCacheStats {
            indexed_projects: self.indexed_projects.load(Ordering::Relaxed),
            builds: self.builds.load(Ordering::Relaxed),
            failed_builds: self.failed_builds.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
        }
    }

    fn ensure_current(
        &self,
        project: &ProjectId,
        stale: &AtomicBool,
        current: &mut Option<Arc<IndexedClasspath>>,
    ) -> Result<Arc<IndexedClasspath>, IndexUnavailable> {
        if let Some(indexed) = current.as_ref()
            && !stale.load(Ordering::SeqCst)
        {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(indexed));
        }

        // cleared before reading roots so an invalidation during the build sticks
        stale.store(false, Ordering::SeqCst);
        match self.build(project) {
            Ok(indexed) => {
                let indexed = Arc::new(indexed);
                if current.replace(Arc::clone(&indexed)).is_none() {
                    self.indexed_projects.fetch_add(1, Ordering::Relaxed);
                }
                Ok(indexed)
            }
            Err(err) => {
                self.failed_builds.fetch_add(1, Ordering::Relaxed);
                // keep the previous pair; it stays marked for rebuild
                let kept_previous = current.is_some();
                if kept_previous {
                    stale.store(true, Ordering::SeqCst);
                }
                tracing::warn!(%project, kept_previous, error = %err, "type index build failed");
                Err(err)
            }
        }
    }

    fn build(&self, project: &ProjectId) -> Result<IndexedClasspath, IndexUnavailable> {
        let start = Instant::now();
        let roots = self
            .model
            .roots(project)
            .map_err(|err| IndexUnavailable::Roots {
                project: project.clone(),
                reason: err.to_string(),
            })?;
        let config = ClasspathConfig::merge(&roots);
        let index = self
            .builder
            .build(&config)
            .map_err(|err| IndexUnavailable::Build {
                project: project.clone(),
                reason: err.to_string(),
            })?;
        self.builds.fetch_add(1, Ordering::Relaxed);

        tracing::info!(
            %project,
            search_roots = config.search_path().len(),
            source_roots = config.source_roots().len(),
            types = index.type_count(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "type index built"
        );
        Ok(IndexedClasspath { config, index })
    }

    fn slot(&self, project: &ProjectId) -> Slot {
        let mut slots = self.slots.lock();
        Arc::clone(slots.entry(project.clone()).or_default())
    }

    // Called with the slot's lock held. Slot locks are never taken while the
    // map lock is held, so this order cannot deadlock.
    fn is_registered(&self, project: &ProjectId, slot: &Slot) -> bool {
        self.slots
            .lock()
            .get(project)
            .is_some_and(|registered| Arc::ptr_eq(registered, slot))
    }

    fn unregister(&self, project: &ProjectId, slot: &Slot) {
        let mut slots = self.slots.lock();
        if slots
            .get(project)
            .is_some_and(|registered| Arc::ptr_eq(registered, slot))
        {
            slots.remove(project);
        }
    }

    /// Empties a slot that is no longer registered.
    fn drop_index(&self, slot: &Slot) -> bool {
        let removed = slot.current.lock().take().is_some();
        if removed {
            self.indexed_projects.fetch_sub(1, Ordering::Relaxed);
        }
        removed
    }
}
