//! Certification enforcement.
//!
//! Verified assets must carry a description, an owner and lineage. Any
//! verified asset missing one of them is demoted to draft, with a message
//! telling the steward why.

use async_trait::async_trait;
use tracing::info;

use tidemark_catalog::{AssetField, CertificateStatus, ChangeSet, EntitySnapshot, Projection};

use super::signals::{has_description, has_lineage, has_owner};
use crate::context::PolicyContext;
use crate::error::ReconcileResult;
use crate::policy::Policy;

pub const ENFORCEMENT_MESSAGE: &str =
    "To be verified, an asset must have a description, at least one owner, and lineage.";

const REQUIRED_FIELDS: [AssetField; 8] = [
    AssetField::Description,
    AssetField::UserDescription,
    AssetField::OwnerUsers,
    AssetField::OwnerGroups,
    AssetField::HasLineage,
    AssetField::InputToProcesses,
    AssetField::OutputFromProcesses,
    AssetField::CertificateStatus,
];

/// Demotes incompletely documented verified assets.
#[derive(Debug, Default, Clone, Copy)]
pub struct VerificationEnforcer;

impl VerificationEnforcer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Policy for VerificationEnforcer {
    fn name(&self) -> &str {
        "verification-enforcer"
    }

    fn projection(&self) -> Projection {
        Projection::new(REQUIRED_FIELDS)
    }

    async fn calculate_changes(
        &self,
        _ctx: &PolicyContext<'_>,
        current: &EntitySnapshot,
    ) -> ReconcileResult<Option<ChangeSet>> {
        let qualified_name = current.qualified_name().unwrap_or_default();

        if current.certificate_status() != Some(CertificateStatus::Verified) {
            info!(qualified_name, "Asset is not verified, no enforcement to consider");
            return Ok(None);
        }
        if has_description(current) && has_owner(current) && has_lineage(current) {
            info!(qualified_name, "Verified asset has everything it needs");
            return Ok(None);
        }

        info!(qualified_name, "Verified asset is incomplete, demoting to draft");
        Ok(Some(
            ChangeSet::for_snapshot(current)
                .set(AssetField::CertificateStatus, CertificateStatus::Draft)
                .set(AssetField::CertificateStatusMessage, ENFORCEMENT_MESSAGE),
        ))
    }
}
