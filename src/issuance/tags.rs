use log::{debug, info};

use crate::core::error::Result;
use crate::core::types::TagSet;
use crate::issuance::authority::CertificateAuthority;

/// Replaces the certificate's tags with `desired`.
///
/// Existing tags are removed in one call, then the desired set is added in
/// one call. Nothing is mutated when both sets are empty.
pub async fn apply_tags(
    authority: &dyn CertificateAuthority,
    arn: &str,
    desired: &TagSet,
) -> Result<()> {
    let current = authority.list_tags(arn).await?;

    if !current.is_empty() {
        debug!(
            "[cert-tags] Removing {} existing tag(s) from {}",
            current.len(),
            arn
        );
        authority.remove_tags(arn, &current).await?;
    }

    if desired.is_empty() {
        if current.is_empty() {
            debug!("[cert-tags] No tags to reconcile for {}", arn);
        }
        return Ok(());
    }

    authority.add_tags(arn, desired).await?;
    info!(
        "[cert-tags] Applied tags to {}: {}",
        arn,
        desired.keys().cloned().collect::<Vec<_>>().join(", ")
    );
    Ok(())
}
