//! Completeness scoring.
//!
//! Scores every asset out of 100 by how well it is documented and records
//! the score in the `DaaP` custom metadata, creating that definition on
//! first use. Glossary terms use their own rubric; glossaries and
//! categories are not scored and keep the floor score.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use tidemark_catalog::{
    AssetField, CertificateStatus, ChangeSet, CustomMetadataKey, EntityRef, EntitySnapshot,
    Projection, SchemaDefinition,
};

use super::signals::{has_description, has_lineage, has_owner};
use crate::context::PolicyContext;
use crate::error::{ReconcileError, ReconcileResult};
use crate::policy::Policy;
use crate::schemas::{daap_definition, DAAP_SCORE};

const GLOSSARY_TERM: &str = "AtlasGlossaryTerm";
const README: &str = "Readme";

/// Score given to entities the rubric does not cover.
const FLOOR_SCORE: f64 = 1.0;
/// Stands in for a missing score when comparing.
const UNSCORED: f64 = -1.0;

const SCORED_FIELDS: [AssetField; 13] = [
    AssetField::Description,
    AssetField::UserDescription,
    AssetField::OwnerUsers,
    AssetField::OwnerGroups,
    AssetField::HasLineage,
    AssetField::InputToProcesses,
    AssetField::OutputFromProcesses,
    AssetField::AssignedEntities,
    AssetField::SeeAlso,
    AssetField::Links,
    AssetField::CertificateStatus,
    AssetField::Readme,
    AssetField::Meanings,
];

/// Writes a documentation completeness score to every asset it sees.
#[derive(Debug, Clone)]
pub struct CompletenessScorer {
    definition: SchemaDefinition,
}

impl Default for CompletenessScorer {
    fn default() -> Self {
        Self {
            definition: daap_definition(),
        }
    }
}

impl CompletenessScorer {
    pub fn new() -> Self {
        Self::default()
    }

    fn score_key(&self, ctx: &PolicyContext<'_>) -> ReconcileResult<CustomMetadataKey> {
        let schema = ctx.schema().ok_or_else(|| {
            ReconcileError::policy(self.name(), "score custom metadata was not provisioned")
        })?;
        schema
            .key(DAAP_SCORE)
            .map_err(|e| ReconcileError::policy(self.name(), e.to_string()))
    }

    async fn score_term(&self, ctx: &PolicyContext<'_>, term: &EntitySnapshot) -> ReconcileResult<f64> {
        let mut score = 0.0;
        if has_description(term) {
            score += 15.0;
        }
        if term.has_any(AssetField::SeeAlso) {
            score += 10.0;
        }
        if term.has_any(AssetField::Links) {
            score += 10.0;
        }
        if term.has_any(AssetField::AssignedEntities) {
            score += 20.0;
        }
        score += match term.certificate_status() {
            Some(CertificateStatus::Draft) => 15.0,
            Some(CertificateStatus::Verified) => 25.0,
            _ => 0.0,
        };
        score += self.score_readme(ctx, term).await?;
        Ok(score)
    }

    /// Readme content lives on its own entity and is read by guid.
    async fn score_readme(&self, ctx: &PolicyContext<'_>, term: &EntitySnapshot) -> ReconcileResult<f64> {
        let Some(guid) = term
            .get(AssetField::Readme)
            .and_then(|r| r.get("guid"))
            .and_then(Value::as_str)
        else {
            return Ok(0.0);
        };

        let readme = ctx
            .fetch_related(
                &EntityRef::new(guid, README),
                &Projection::new([AssetField::Description]),
            )
            .await?;
        let length = readme
            .as_ref()
            .and_then(|r| r.text(AssetField::Description))
            .map(|d| d.chars().count())
            .unwrap_or(0);

        Ok(match length {
            l if l > 1000 => 20.0,
            l if l > 500 => 10.0,
            l if l > 100 => 5.0,
            _ => 0.0,
        })
    }

    fn score_asset(asset: &EntitySnapshot) -> f64 {
        let mut score = 0.0;
        if has_description(asset) {
            score += 15.0;
        }
        if has_owner(asset) {
            score += 20.0;
        }
        if asset.has_any(AssetField::Meanings) {
            score += 20.0;
        }
        if asset.has_any(AssetField::Classifications) {
            score += 20.0;
        }
        if has_lineage(asset) {
            score += 20.0;
        }
        score
    }
}

#[async_trait]
impl Policy for CompletenessScorer {
    fn name(&self) -> &str {
        "completeness-scorer"
    }

    fn projection(&self) -> Projection {
        Projection::new(SCORED_FIELDS).with_terms().with_tags()
    }

    fn required_schema(&self) -> Option<&SchemaDefinition> {
        Some(&self.definition)
    }

    async fn calculate_changes(
        &self,
        ctx: &PolicyContext<'_>,
        current: &EntitySnapshot,
    ) -> ReconcileResult<Option<ChangeSet>> {
        let key = self.score_key(ctx)?;

        let score = if current.type_name() == GLOSSARY_TERM {
            self.score_term(ctx, current).await?
        } else if current.reference().is_glossary_type() {
            FLOOR_SCORE
        } else {
            Self::score_asset(current)
        };

        debug!(score, qualified_name = ?current.qualified_name(), "Computed completeness score");
        Ok(Some(
            ChangeSet::for_snapshot(current).set_custom_metadata(&key, score),
        ))
    }

    fn has_changes(
        &self,
        ctx: &PolicyContext<'_>,
        current: &EntitySnapshot,
        candidate: &ChangeSet,
    ) -> bool {
        let Ok(key) = self.score_key(ctx) else {
            return candidate.differs_from(current);
        };
        let existing = current.custom_metadata_f64(&key).unwrap_or(UNSCORED);
        let proposed = candidate
            .custom_metadata_value(&key)
            .and_then(Value::as_f64)
            .unwrap_or(UNSCORED);
        debug!(existing, proposed, "Comparing completeness scores");
        existing != proposed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use tidemark_catalog::{InMemoryCatalog, RegisteredSchema};

    fn setup() -> (InMemoryCatalog, RegisteredSchema) {
        let catalog = InMemoryCatalog::new();
        let schema = catalog.register_schema(&daap_definition());
        (catalog, schema)
    }

    async fn score_of(catalog: &InMemoryCatalog, schema: &RegisteredSchema, snapshot: &EntitySnapshot) -> f64 {
        let ctx = PolicyContext::new(catalog, Some(schema), Duration::from_secs(1));
        let change = CompletenessScorer::new()
            .calculate_changes(&ctx, snapshot)
            .await
            .unwrap()
            .unwrap();
        change
            .custom_metadata_value(&schema.key(DAAP_SCORE).unwrap())
            .and_then(Value::as_f64)
            .unwrap()
    }

    #[tokio::test]
    async fn test_asset_rubric() {
        let (catalog, schema) = setup();
        let table = EntitySnapshot::new(EntityRef::new("g-1", "Table"))
            .with_attribute(AssetField::Description, "Orders")
            .with_attribute(AssetField::OwnerGroups, json!(["data-eng"]))
            .with_attribute(AssetField::Classifications, json!(["PII"]))
            .with_attribute(AssetField::HasLineage, true);

        assert_eq!(score_of(&catalog, &schema, &table).await, 75.0);
    }

    #[tokio::test]
    async fn test_term_rubric_reads_readme() {
        let (catalog, schema) = setup();
        catalog.insert_entity(
            EntitySnapshot::new(EntityRef::new("r-1", README))
                .with_attribute(AssetField::Description, "x".repeat(600)),
        );
        let term = EntitySnapshot::new(EntityRef::new("t-1", GLOSSARY_TERM))
            .with_attribute(AssetField::Description, "Revenue recognised on shipment")
            .with_attribute(AssetField::SeeAlso, json!([{ "guid": "t-2" }]))
            .with_attribute(AssetField::CertificateStatus, "VERIFIED")
            .with_attribute(AssetField::Readme, json!({ "guid": "r-1", "typeName": "Readme" }));

        // description 15 + related 10 + verified 25 + readme over 500 chars 10
        assert_eq!(score_of(&catalog, &schema, &term).await, 60.0);
    }

    #[tokio::test]
    async fn test_glossary_and_category_keep_floor_score() {
        let (catalog, schema) = setup();
        let glossary = EntitySnapshot::new(EntityRef::new("gl-1", "AtlasGlossary"))
            .with_attribute(AssetField::Description, "Finance terms");
        let category = EntitySnapshot::new(EntityRef::new("c-1", "AtlasGlossaryCategory"));

        assert_eq!(score_of(&catalog, &schema, &glossary).await, FLOOR_SCORE);
        assert_eq!(score_of(&catalog, &schema, &category).await, FLOOR_SCORE);
    }

    #[tokio::test]
    async fn test_missing_score_counts_as_unscored() {
        let (catalog, schema) = setup();
        let key = schema.key(DAAP_SCORE).unwrap();
        let ctx = PolicyContext::new(&catalog, Some(&schema), Duration::from_secs(1));
        let scorer = CompletenessScorer::new();
        let current = EntitySnapshot::new(EntityRef::new("g-1", "Table"));

        let zero = ChangeSet::for_snapshot(&current).set_custom_metadata(&key, 0.0);
        assert!(scorer.has_changes(&ctx, &current, &zero));

        let scored = current.clone().with_custom_metadata(&key, 0.0);
        assert!(!scorer.has_changes(&ctx, &scored, &zero));
    }

    #[tokio::test]
    async fn test_unprovisioned_schema_is_policy_error() {
        let catalog = InMemoryCatalog::new();
        let ctx = PolicyContext::new(&catalog, None, Duration::from_secs(1));
        let err = CompletenessScorer::new()
            .calculate_changes(&ctx, &EntitySnapshot::new(EntityRef::new("g-1", "Table")))
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::Policy { .. }));
    }
}
