//! Completeness checks shared by the bundled policies.

use tidemark_catalog::{AssetField, EntitySnapshot};

/// A system or user description is present.
pub fn has_description(asset: &EntitySnapshot) -> bool {
    asset.text(AssetField::Description).is_some() || asset.text(AssetField::UserDescription).is_some()
}

/// At least one owning user or group.
pub fn has_owner(asset: &EntitySnapshot) -> bool {
    asset.has_any(AssetField::OwnerUsers) || asset.has_any(AssetField::OwnerGroups)
}

/// The asset feeds, or is fed by, at least one process.
pub fn has_lineage(asset: &EntitySnapshot) -> bool {
    asset.flag(AssetField::HasLineage)
        || asset.has_any(AssetField::InputToProcesses)
        || asset.has_any(AssetField::OutputFromProcesses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tidemark_catalog::EntityRef;

    fn bare() -> EntitySnapshot {
        EntitySnapshot::new(EntityRef::new("g-1", "Table"))
    }

    #[test]
    fn test_user_description_counts() {
        assert!(!has_description(&bare()));
        assert!(has_description(
            &bare().with_attribute(AssetField::UserDescription, "Daily orders")
        ));
        assert!(!has_description(
            &bare().with_attribute(AssetField::Description, "")
        ));
    }

    #[test]
    fn test_group_owner_counts() {
        assert!(!has_owner(
            &bare().with_attribute(AssetField::OwnerUsers, json!([]))
        ));
        assert!(has_owner(
            &bare().with_attribute(AssetField::OwnerGroups, json!(["data-eng"]))
        ));
    }

    #[test]
    fn test_lineage_from_flag_or_processes() {
        assert!(!has_lineage(&bare().with_attribute(AssetField::HasLineage, false)));
        assert!(has_lineage(&bare().with_attribute(AssetField::HasLineage, true)));
        assert!(has_lineage(&bare().with_attribute(
            AssetField::OutputFromProcesses,
            json!([{ "guid": "p-1", "typeName": "Process" }])
        )));
    }
}
