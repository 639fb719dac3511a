//! Finds which open project a host symbol belongs to.

use std::collections::HashSet;

use crate::error::IndexUnavailable;
use crate::executor::SymbolQueryExecutor;
use crate::index::SymbolHandle;
use crate::project::{OpenProjectRegistry, ProjectId};
use crate::search::DeclarationCheck;

pub struct ProjectResolver {
    executor: SymbolQueryExecutor,
}

impl ProjectResolver {
    pub fn new(executor: SymbolQueryExecutor) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &SymbolQueryExecutor {
        &self.executor
    }

    /// The candidate whose classpath declares `symbol`.
    ///
    /// A single candidate is returned as is, without consulting any index.
    /// Otherwise candidates are tried in order, skipping duplicates and
    /// projects without the guest language. A candidate whose index cannot be
    /// built is skipped; if no candidate matches, the first such failure is
    /// returned instead of `None`.
    pub fn resolve_owning_project(
        &self,
        symbol: &SymbolHandle,
        candidates: &[ProjectId],
    ) -> Result<Option<ProjectId>, IndexUnavailable> {
        if let [only] = candidates {
            return Ok(Some(only.clone()));
        }

        let model = self.executor.indexes().model();
        let probe = DeclarationCheck {
            symbol: symbol.clone(),
        };
        let mut seen = HashSet::new();
        let mut first_failure = None;

        for project in candidates {
            if !seen.insert(project) {
                continue;
            }
            if !model.is_guest_enabled(project) {
                tracing::trace!(%project, "skipping project without guest language");
                continue;
            }

            match self.executor.execute(project, &probe) {
                Ok(true) => {
                    tracing::debug!(%project, symbol = %symbol.fq_name, "owning project resolved");
                    return Ok(Some(project.clone()));
                }
                Ok(false) => {}
                Err(err) => {
                    tracing::warn!(%project, error = %err, "skipping project with unavailable index");
                    first_failure.get_or_insert(err);
                }
            }
        }

        match first_failure {
            Some(err) => Err(err),
            None => Ok(None),
        }
    }

    pub fn resolve_in_registry(
        &self,
        symbol: &SymbolHandle,
        registry: &dyn OpenProjectRegistry,
    ) -> Result<Option<ProjectId>, IndexUnavailable> {
        self.resolve_owning_project(symbol, &registry.open_projects())
    }

    /// Deprecation of `symbol` in whichever candidate owns it; `false` when no
    /// candidate does.
    pub fn is_deprecated_in_owner(
        &self,
        symbol: &SymbolHandle,
        candidates: &[ProjectId],
    ) -> Result<bool, IndexUnavailable> {
        match self.resolve_owning_project(symbol, candidates)? {
            Some(owner) => self.executor.is_deprecated(&owner, symbol),
            None => Ok(false),
        }
    }
}
