//! Starring glossary terms on behalf of a group.
//!
//! Every member of the group ends up in the `starredBy` set of every active
//! term in the glossary. Members who already starred a term keep their
//! original star; terms every member has already starred are not written.

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info, instrument};

use tidemark_catalog::{search_fields, AssetField, ChangeSet, EntitySnapshot, Projection, SearchQuery};

use crate::context::{bounded, ReconcileContext};
use crate::error::{ReconcileError, ReconcileResult};

const GLOSSARY_TYPE: &str = "AtlasGlossary";
const TERM_TYPE: &str = "AtlasGlossaryTerm";
const TERM_PAGE_SIZE: usize = 100;

/// What a starring run did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StarSummary {
    pub glossary: String,
    pub members: usize,
    pub terms: usize,
    pub terms_updated: usize,
    pub stars_added: usize,
}

/// Star every active term of a glossary for every member of a group.
#[instrument(skip(ctx))]
pub async fn star_glossary_terms(
    ctx: &ReconcileContext,
    glossary: &str,
    group: &str,
) -> ReconcileResult<StarSummary> {
    let timeout = ctx.config().call_timeout;
    let gateway = ctx.gateway();

    let members = bounded(timeout, "group_members", gateway.group_members(group))
        .await
        .map_err(|e| ReconcileError::catalog("group_members", e))?
        .ok_or_else(|| ReconcileError::missing("group", group))?;

    let glossary_qn = find_glossary(ctx, glossary).await?;
    let mut summary = StarSummary {
        glossary: glossary.to_string(),
        members: members.len(),
        ..StarSummary::default()
    };

    let starred_at = chrono::Utc::now().timestamp_millis();
    let mut from = 0;
    loop {
        let query = SearchQuery::new()
            .type_name(TERM_TYPE)
            .term(search_fields::GLOSSARY, glossary_qn.clone())
            .page(from, TERM_PAGE_SIZE)
            .with_projection(Projection::new([
                AssetField::Name,
                AssetField::StarredBy,
                AssetField::StarredCount,
                AssetField::StarredDetailsList,
                AssetField::Anchor,
            ]));
        let terms = bounded(timeout, "search_entities", gateway.search_entities(&query))
            .await
            .map_err(|e| ReconcileError::catalog("search_entities", e))?;
        let page_len = terms.len();

        for term in &terms {
            summary.terms += 1;
            let Some((change, added)) = star_change(term, &members, starred_at) else {
                debug!(guid = %term.guid(), "Every member already starred the term");
                continue;
            };
            bounded(timeout, "merge_upsert", gateway.merge_upsert(&change))
                .await
                .map_err(|e| ReconcileError::catalog("merge_upsert", e))?;
            info!(guid = %term.guid(), added, "Starred term");
            summary.terms_updated += 1;
            summary.stars_added += added;
        }

        if page_len < TERM_PAGE_SIZE {
            break;
        }
        from += page_len;
    }

    Ok(summary)
}

async fn find_glossary(ctx: &ReconcileContext, name: &str) -> ReconcileResult<String> {
    let query = SearchQuery::new()
        .type_name(GLOSSARY_TYPE)
        .term(search_fields::NAME, name)
        .page(0, 1);
    let found = bounded(
        ctx.config().call_timeout,
        "search_entities",
        ctx.gateway().search_entities(&query),
    )
    .await
    .map_err(|e| ReconcileError::catalog("search_entities", e))?;

    found
        .first()
        .and_then(EntitySnapshot::qualified_name)
        .map(str::to_string)
        .ok_or_else(|| ReconcileError::missing("glossary", name))
}

/// Patch adding the members who have not yet starred the term, with the
/// number of stars added. `None` when every member already has.
///
/// The patch carries only the term's identity and the three star fields.
pub fn star_change(
    term: &EntitySnapshot,
    members: &[String],
    starred_at: i64,
) -> Option<(ChangeSet, usize)> {
    let mut starred_by: Vec<String> = term
        .get(AssetField::StarredBy)
        .and_then(Value::as_array)
        .map(|users| {
            users
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    let mut details: Vec<Value> = term
        .get(AssetField::StarredDetailsList)
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut added = 0;
    for member in members {
        if starred_by.contains(member) {
            continue;
        }
        starred_by.push(member.clone());
        details.push(json!({
            "assetStarredBy": member,
            "assetStarredAt": starred_at,
        }));
        added += 1;
    }
    if added == 0 {
        return None;
    }

    let change = ChangeSet::for_snapshot(term)
        .set(AssetField::StarredCount, details.len())
        .set(AssetField::StarredBy, starred_by)
        .set(AssetField::StarredDetailsList, details);
    Some((change, added))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tidemark_catalog::EntityRef;

    fn term(starred_by: &[&str]) -> EntitySnapshot {
        let details: Vec<Value> = starred_by
            .iter()
            .map(|u| json!({ "assetStarredBy": u, "assetStarredAt": 1_686_000_000_000_i64 }))
            .collect();
        EntitySnapshot::new(
            EntityRef::new("term-1", TERM_TYPE).with_qualified_name("revenue@gls-metrics"),
        )
        .with_attribute(AssetField::Name, "Revenue")
        .with_attribute(AssetField::StarredBy, json!(starred_by))
        .with_attribute(AssetField::StarredCount, starred_by.len())
        .with_attribute(AssetField::StarredDetailsList, details)
    }

    fn members(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_adds_only_missing_members() {
        let (change, added) =
            star_change(&term(&["jsmith"]), &members(&["jsmith", "achen"]), 42).unwrap();

        assert_eq!(added, 1);
        assert_eq!(change.field(AssetField::StarredBy), Some(&json!(["jsmith", "achen"])));
        assert_eq!(change.field(AssetField::StarredCount), Some(&json!(2)));
        let details = change.field(AssetField::StarredDetailsList).unwrap();
        assert_eq!(details[0]["assetStarredAt"], 1_686_000_000_000_i64);
        assert_eq!(details[1], json!({ "assetStarredBy": "achen", "assetStarredAt": 42 }));
    }

    #[test]
    fn test_patch_carries_only_star_fields() {
        let (change, _) = star_change(&term(&[]), &members(&["jsmith"]), 42).unwrap();

        let mut names = change.changed_names();
        names.sort();
        assert_eq!(names, vec!["starredBy", "starredCount", "starredDetailsList"]);
        assert_eq!(change.target().qualified_name.as_deref(), Some("revenue@gls-metrics"));
        assert_eq!(change.target().name.as_deref(), Some("Revenue"));
    }

    #[test]
    fn test_fully_starred_term_needs_no_write() {
        assert!(star_change(&term(&["jsmith", "achen"]), &members(&["achen", "jsmith"]), 42).is_none());
        assert!(star_change(&term(&["jsmith"]), &[], 42).is_none());
    }

    #[test]
    fn test_unstarred_term_without_star_fields() {
        let bare = EntitySnapshot::new(EntityRef::new("term-2", TERM_TYPE));
        let (change, added) = star_change(&bare, &members(&["jsmith"]), 7).unwrap();
        assert_eq!(added, 1);
        assert_eq!(change.field(AssetField::StarredCount), Some(&json!(1)));
    }
}
