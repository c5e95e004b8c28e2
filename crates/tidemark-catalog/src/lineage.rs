//! Lineage traversal requests.
//!
//! A [`LineageRequest`] walks the graph from one starting entity in one
//! direction and returns the entities it reaches, flattened into a list.
//! Criteria narrow the list without stopping the walk.

use serde_json::{json, Value};

use crate::model::{AssetField, EntitySnapshot, Projection};

/// Depth that covers any realistic lineage graph.
pub const UNBOUNDED_DEPTH: u32 = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineageDirection {
    Upstream,
    Downstream,
}

impl LineageDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineageDirection::Upstream => "UPSTREAM",
            LineageDirection::Downstream => "DOWNSTREAM",
        }
    }
}

/// Criterion on an attribute of a reached entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineageFilter {
    Equals { field: AssetField, value: String },
    Contains { field: AssetField, value: String },
}

impl LineageFilter {
    pub fn field(&self) -> AssetField {
        match self {
            LineageFilter::Equals { field, .. } | LineageFilter::Contains { field, .. } => *field,
        }
    }

    /// Whether a reached entity satisfies the criterion.
    pub fn matches(&self, snapshot: &EntitySnapshot) -> bool {
        let Some(candidate) = snapshot.text(self.field()) else {
            return false;
        };
        match self {
            LineageFilter::Equals { value, .. } => candidate == value,
            LineageFilter::Contains { value, .. } => candidate.contains(value.as_str()),
        }
    }

    fn to_wire(&self) -> Value {
        let (operator, value) = match self {
            LineageFilter::Equals { value, .. } => ("eq", value),
            LineageFilter::Contains { value, .. } => ("contains", value),
        };
        json!({
            "attributeName": self.field().as_str(),
            "operator": operator,
            "attributeValue": value,
        })
    }
}

/// One page of a lineage walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineageRequest {
    pub guid: String,
    pub direction: LineageDirection,
    pub depth: u32,
    pub from: usize,
    pub page_size: usize,
    pub filters: Vec<LineageFilter>,
    pub projection: Projection,
}

impl LineageRequest {
    pub fn new(guid: impl Into<String>, direction: LineageDirection) -> Self {
        Self {
            guid: guid.into(),
            direction,
            depth: UNBOUNDED_DEPTH,
            from: 0,
            page_size: 100,
            filters: Vec::new(),
            projection: Projection::default(),
        }
    }

    pub fn upstream(guid: impl Into<String>) -> Self {
        Self::new(guid, LineageDirection::Upstream)
    }

    pub fn depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }

    pub fn page(mut self, from: usize, page_size: usize) -> Self {
        self.from = from;
        self.page_size = page_size;
        self
    }

    pub fn filter(mut self, filter: LineageFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }

    /// Whether a reached entity passes every criterion.
    pub fn admits(&self, snapshot: &EntitySnapshot) -> bool {
        self.filters.iter().all(|f| f.matches(snapshot))
    }

    /// Body understood by the lineage list endpoint.
    pub(crate) fn to_wire(&self, attributes: &[String]) -> Value {
        let mut body = json!({
            "guid": self.guid,
            "depth": self.depth,
            "direction": self.direction.as_str(),
            "from": self.from,
            "size": self.page_size,
            "attributes": attributes,
            "excludeMeanings": !self.projection.include_terms,
            "excludeClassifications": !self.projection.include_tags,
            "immediateNeighbors": false,
        });
        if !self.filters.is_empty() {
            body["entityFilters"] = json!({
                "condition": "AND",
                "criteria": self.filters.iter().map(LineageFilter::to_wire).collect::<Vec<_>>(),
            });
        }
        body
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::EntityRef;

    #[test]
    fn test_contains_filter() {
        let filter = LineageFilter::Contains {
            field: AssetField::CertificateStatus,
            value: "VERIFIED".to_string(),
        };
        let verified = EntitySnapshot::new(EntityRef::new("v-1", "View"))
            .with_attribute(AssetField::CertificateStatus, "VERIFIED");
        let draft = EntitySnapshot::new(EntityRef::new("v-2", "View"))
            .with_attribute(AssetField::CertificateStatus, "DRAFT");

        assert!(filter.matches(&verified));
        assert!(!filter.matches(&draft));
        assert!(!filter.matches(&EntitySnapshot::new(EntityRef::new("p-1", "Process"))));
    }

    #[test]
    fn test_wire_body() {
        let body = LineageRequest::upstream("wb-1")
            .filter(LineageFilter::Contains {
                field: AssetField::CertificateStatus,
                value: "VERIFIED".to_string(),
            })
            .to_wire(&["name".to_string()]);

        assert_eq!(body["direction"], "UPSTREAM");
        assert_eq!(body["depth"], 1_000_000);
        assert_eq!(body["size"], 100);
        assert_eq!(body["entityFilters"]["criteria"][0]["attributeName"], "certificateStatus");
        assert_eq!(body["entityFilters"]["criteria"][0]["operator"], "contains");
    }

    #[test]
    fn test_no_filters_omits_criteria() {
        let body = LineageRequest::new("t-1", LineageDirection::Downstream)
            .depth(1)
            .to_wire(&[]);
        assert!(body.get("entityFilters").is_none());
        assert_eq!(body["depth"], 1);
    }
}
