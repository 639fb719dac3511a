//! Runs searchers against a project's index inside the project's read task.

use std::sync::Arc;

use crate::cache::ClasspathIndexCache;
use crate::error::IndexUnavailable;
use crate::index::{SymbolHandle, SymbolLocation};
use crate::project::ProjectId;
use crate::search::{
    BinaryNameLookup, DeprecationCheck, LocationLookup, PackageListing, PackageLookup, QueryResult,
    SearchQuery, Searcher, SimpleNameLookup, TypeLookup,
};

#[derive(Clone)]
pub struct SymbolQueryExecutor {
    indexes: Arc<ClasspathIndexCache>,
}

impl SymbolQueryExecutor {
    pub fn new(indexes: Arc<ClasspathIndexCache>) -> Self {
        Self { indexes }
    }

    pub fn indexes(&self) -> &ClasspathIndexCache {
        &self.indexes
    }

    /// Runs `searcher` against the current index of `project`.
    ///
    /// `Err` means the query could not run at all; a symbol that simply does
    /// not exist is an `Ok` with an empty output.
    pub fn execute<S: Searcher>(
        &self,
        project: &ProjectId,
        searcher: &S,
    ) -> Result<S::Output, IndexUnavailable> {
        let output = self
            .indexes
            .with_index(project, |indexed| searcher.search(indexed.index()))?;
        tracing::trace!(%project, searcher = std::any::type_name::<S>(), "query executed");
        Ok(output)
    }

    pub fn run(&self, project: &ProjectId, query: &SearchQuery) -> Result<QueryResult, IndexUnavailable> {
        self.execute(project, query)
    }

    pub fn find_type(
        &self,
        project: &ProjectId,
        fq_name: &str,
    ) -> Result<Option<SymbolHandle>, IndexUnavailable> {
        self.execute(
            project,
            &TypeLookup {
                fq_name: fq_name.to_string(),
            },
        )
    }

    pub fn find_package(
        &self,
        project: &ProjectId,
        fq_name: &str,
    ) -> Result<Option<SymbolHandle>, IndexUnavailable> {
        self.execute(
            project,
            &PackageLookup {
                fq_name: fq_name.to_string(),
            },
        )
    }

    pub fn binary_name(
        &self,
        project: &ProjectId,
        fq_name: &str,
    ) -> Result<Option<String>, IndexUnavailable> {
        self.execute(
            project,
            &BinaryNameLookup {
                fq_name: fq_name.to_string(),
            },
        )
    }

    pub fn is_deprecated(
        &self,
        project: &ProjectId,
        symbol: &SymbolHandle,
    ) -> Result<bool, IndexUnavailable> {
        self.execute(
            project,
            &DeprecationCheck {
                symbol: symbol.clone(),
            },
        )
    }

    pub fn location_of(
        &self,
        project: &ProjectId,
        symbol: &SymbolHandle,
    ) -> Result<Option<SymbolLocation>, IndexUnavailable> {
        self.execute(
            project,
            &LocationLookup {
                symbol: symbol.clone(),
            },
        )
    }

    pub fn types_with_simple_name(
        &self,
        project: &ProjectId,
        simple_name: &str,
    ) -> Result<Vec<String>, IndexUnavailable> {
        self.execute(
            project,
            &SimpleNameLookup {
                simple_name: simple_name.to_string(),
            },
        )
    }

    pub fn packages_with_prefix(
        &self,
        project: &ProjectId,
        prefix: &str,
    ) -> Result<Vec<String>, IndexUnavailable> {
        self.execute(
            project,
            &PackageListing {
                prefix: prefix.to_string(),
            },
        )
    }
}
