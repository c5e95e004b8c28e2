//! Shared-secret check for webhook deliveries.

use subtle::ConstantTimeEq;

/// Header the catalog sets to the secret configured on the webhook.
pub const SIGNING_SECRET_HEADER: &str = "x-atlan-signing-secret";

/// Verify the secret presented with a delivery.
///
/// Comparison is constant-time; a missing header never matches.
pub fn verify_signing_secret(expected: &str, presented: Option<&str>) -> bool {
    match presented {
        Some(presented) => constant_time_eq(expected.as_bytes(), presented.as_bytes()),
        None => false,
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_secret() {
        assert!(verify_signing_secret("s3cr3t", Some("s3cr3t")));
    }

    #[test]
    fn test_wrong_or_missing_secret() {
        assert!(!verify_signing_secret("s3cr3t", Some("s3cr3")));
        assert!(!verify_signing_secret("s3cr3t", Some("S3CR3T")));
        assert!(!verify_signing_secret("s3cr3t", None));
    }
}
