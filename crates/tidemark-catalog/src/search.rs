//! Entity search criteria.
//!
//! Deliberately small: exact, any-of and prefix matches on indexed fields,
//! combined with AND. Anything richer belongs to the caller.

use serde_json::{json, Value};

use crate::model::Projection;

/// Indexed field names used in search criteria.
pub mod fields {
    pub const GUID: &str = "__guid";
    pub const TYPE_NAME: &str = "__typeName.keyword";
    pub const STATE: &str = "__state";
    pub const QUALIFIED_NAME: &str = "qualifiedName";
    pub const NAME: &str = "name.keyword";
    pub const CONNECTOR_NAME: &str = "connectorName";
    pub const GLOSSARY: &str = "__glossary";
}

/// One search criterion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchFilter {
    Term { field: String, value: String },
    Terms { field: String, values: Vec<String> },
    Prefix { field: String, value: String },
}

impl SearchFilter {
    /// Field this criterion applies to.
    pub fn field(&self) -> &str {
        match self {
            SearchFilter::Term { field, .. }
            | SearchFilter::Terms { field, .. }
            | SearchFilter::Prefix { field, .. } => field,
        }
    }

    /// Whether a stored value satisfies the criterion.
    pub fn matches(&self, candidate: &str) -> bool {
        match self {
            SearchFilter::Term { value, .. } => candidate == value,
            SearchFilter::Terms { values, .. } => values.iter().any(|v| v == candidate),
            SearchFilter::Prefix { value, .. } => candidate.starts_with(value.as_str()),
        }
    }

    pub(crate) fn to_dsl(&self) -> Value {
        match self {
            SearchFilter::Term { field, value } => json!({ "term": { field: value } }),
            SearchFilter::Terms { field, values } => json!({ "terms": { field: values } }),
            SearchFilter::Prefix { field, value } => json!({ "prefix": { field: value } }),
        }
    }
}

/// Search request against the catalog's entity index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub filters: Vec<SearchFilter>,
    pub active_only: bool,
    pub from: usize,
    pub page_size: usize,
    pub projection: Projection,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            active_only: true,
            from: 0,
            page_size: 100,
            projection: Projection::default(),
        }
    }
}

impl SearchQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn term(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push(SearchFilter::Term {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn terms<I, S>(mut self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filters.push(SearchFilter::Terms {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn prefix(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push(SearchFilter::Prefix {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn type_name(self, type_name: impl Into<String>) -> Self {
        self.term(fields::TYPE_NAME, type_name)
    }

    /// Include archived and soft-deleted entities.
    pub fn include_inactive(mut self) -> Self {
        self.active_only = false;
        self
    }

    pub fn page(mut self, from: usize, page_size: usize) -> Self {
        self.from = from;
        self.page_size = page_size;
        self
    }

    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }

    /// Elasticsearch-style query body understood by the index search endpoint.
    pub(crate) fn to_dsl(&self) -> Value {
        let mut filters: Vec<Value> = self.filters.iter().map(SearchFilter::to_dsl).collect();
        if self.active_only {
            filters.push(json!({ "term": { fields::STATE: "ACTIVE" } }));
        }
        json!({
            "from": self.from,
            "size": self.page_size,
            "track_total_hits": true,
            "query": { "bool": { "filter": filters } },
        })
    }
}
