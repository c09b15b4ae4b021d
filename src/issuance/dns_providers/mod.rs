use async_trait::async_trait;
use std::fmt::Debug;

use crate::core::error::Result;
use crate::core::types::{HostedZone, RecordChange, RecordSetCursor, RecordSetPage};

mod route53;

pub use route53::Route53ZoneClient;

/// Typed view of the DNS hosted-zone service.
#[async_trait]
pub trait DnsZoneClient: Send + Sync + Debug {
    /// Lists every hosted zone visible to the caller. May be empty.
    async fn list_hosted_zones(&self) -> Result<Vec<HostedZone>>;

    /// Returns one page of record sets for `zone_id` starting at `cursor`.
    async fn list_record_sets(
        &self,
        zone_id: &str,
        cursor: Option<RecordSetCursor>,
    ) -> Result<RecordSetPage>;

    /// Applies `changes` to `zone_id` as a single atomic batch.
    async fn change_record_sets(
        &self,
        zone_id: &str,
        comment: &str,
        changes: &[RecordChange],
    ) -> Result<()>;
}
