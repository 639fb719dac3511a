//! Read-only queries over a [`TypeIndex`].
//!
//! A searcher is a plain value describing one question. Running it is a pure
//! function of the index, so the same searcher can be replayed against any
//! project's index.

use serde::{Deserialize, Serialize};

use crate::index::{SymbolHandle, SymbolKind, SymbolLocation, TypeIndex};

pub trait Searcher {
    type Output;

    fn search(&self, index: &dyn TypeIndex) -> Self::Output;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeLookup {
    pub fq_name: String,
}

impl Searcher for TypeLookup {
    type Output = Option<SymbolHandle>;

    fn search(&self, index: &dyn TypeIndex) -> Self::Output {
        index.find_type(&self.fq_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageLookup {
    pub fq_name: String,
}

impl Searcher for PackageLookup {
    type Output = Option<SymbolHandle>;

    fn search(&self, index: &dyn TypeIndex) -> Self::Output {
        index.find_package(&self.fq_name)
    }
}

/// Linkage name of a type, `None` when the type is unknown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryNameLookup {
    pub fq_name: String,
}

impl Searcher for BinaryNameLookup {
    type Output = Option<String>;

    fn search(&self, index: &dyn TypeIndex) -> Self::Output {
        index.binary_name(&self.fq_name)
    }
}

/// Deprecation of a previously resolved symbol. A handle the index can no
/// longer resolve reads as not deprecated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeprecationCheck {
    pub symbol: SymbolHandle,
}

impl Searcher for DeprecationCheck {
    type Output = bool;

    fn search(&self, index: &dyn TypeIndex) -> Self::Output {
        index.is_deprecated(&self.symbol).unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationLookup {
    pub symbol: SymbolHandle,
}

impl Searcher for LocationLookup {
    type Output = Option<SymbolLocation>;

    fn search(&self, index: &dyn TypeIndex) -> Self::Output {
        index.location_of(&self.symbol)
    }
}

/// Whether the index declares `symbol`: a type with a known location, or a
/// known package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarationCheck {
    pub symbol: SymbolHandle,
}

impl Searcher for DeclarationCheck {
    type Output = bool;

    fn search(&self, index: &dyn TypeIndex) -> Self::Output {
        match self.symbol.kind {
            SymbolKind::Package => index.find_package(&self.symbol.fq_name).is_some(),
            SymbolKind::Type | SymbolKind::Element => index.location_of(&self.symbol).is_some(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleNameLookup {
    pub simple_name: String,
}

impl Searcher for SimpleNameLookup {
    type Output = Vec<String>;

    fn search(&self, index: &dyn TypeIndex) -> Self::Output {
        index.types_with_simple_name(&self.simple_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageListing {
    pub prefix: String,
}

impl Searcher for PackageListing {
    type Output = Vec<String>;

    fn search(&self, index: &dyn TypeIndex) -> Self::Output {
        index.packages_with_prefix(&self.prefix)
    }
}

/// Every supported query as one value, for callers that dispatch dynamically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "query", rename_all = "snake_case")]
pub enum SearchQuery {
    Type { fq_name: String },
    Package { fq_name: String },
    BinaryName { fq_name: String },
    IsDeprecated { symbol: SymbolHandle },
    Location { symbol: SymbolHandle },
    SimpleName { simple_name: String },
    Packages { prefix: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", content = "value", rename_all = "snake_case")]
pub enum QueryResult {
    Symbol(Option<SymbolHandle>),
    BinaryName(Option<String>),
    Deprecated(bool),
    Location(Option<SymbolLocation>),
    Names(Vec<String>),
}

impl Searcher for SearchQuery {
    type Output = QueryResult;

    fn search(&self, index: &dyn TypeIndex) -> QueryResult {
        match self {
            SearchQuery::Type { fq_name } => QueryResult::Symbol(
                TypeLookup {
                    fq_name: fq_name.clone(),
                }
                .search(index),
            ),
            SearchQuery::Package { fq_name } => QueryResult::Symbol(
                PackageLookup {
                    fq_name: fq_name.clone(),
                }
                .search(index),
            ),
            SearchQuery::BinaryName { fq_name } => QueryResult::BinaryName(
                BinaryNameLookup {
                    fq_name: fq_name.clone(),
                }
                .search(index),
            ),
            SearchQuery::IsDeprecated { symbol } => QueryResult::Deprecated(
                DeprecationCheck {
                    symbol: symbol.clone(),
                }
                .search(index),
            ),
            SearchQuery::Location { symbol } => QueryResult::Location(
                LocationLookup {
                    symbol: symbol.clone(),
                }
                .search(index),
            ),
            SearchQuery::SimpleName { simple_name } => QueryResult::Names(
                SimpleNameLookup {
                    simple_name: simple_name.clone(),
                }
                .search(index),
            ),
            SearchQuery::Packages { prefix } => QueryResult::Names(
                PackageListing {
                    prefix: prefix.clone(),
                }
                .search(index),
            ),
        }
    }
}
