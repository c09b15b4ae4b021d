use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_route53::Client;
use aws_sdk_route53::error::DisplayErrorContext;
use aws_sdk_route53::types::{
    Change, ChangeAction as SdkChangeAction, ChangeBatch, ResourceRecord, ResourceRecordSet,
    RrType,
};
use log::debug;

use super::DnsZoneClient;
use crate::core::error::{CertificateError, Result};
use crate::core::types::{
    ChangeAction, HostedZone, RecordChange, RecordSet, RecordSetCursor, RecordSetPage,
};
use crate::domain::{normalize_record_name, normalize_zone_id};

/// Route 53 is a global service; its API lives in us-east-1.
const ROUTE53_REGION: &str = "us-east-1";

pub struct Route53ZoneClient {
    client: Client,
}

impl std::fmt::Debug for Route53ZoneClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route53ZoneClient").finish_non_exhaustive()
    }
}

impl Route53ZoneClient {
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            client: Client::new(sdk_config),
        }
    }

    /// Builds a client from the default credential chain.
    pub async fn connect() -> Self {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(ROUTE53_REGION))
            .load()
            .await;
        Self::new(&sdk_config)
    }

    fn build_change(change: &RecordChange) -> Result<Change> {
        let action = match change.action {
            ChangeAction::Create => SdkChangeAction::Create,
            ChangeAction::Upsert => SdkChangeAction::Upsert,
            ChangeAction::Delete => SdkChangeAction::Delete,
        };

        let records = change
            .values
            .iter()
            .map(|value| {
                ResourceRecord::builder()
                    .value(value)
                    .build()
                    .map_err(|e| build_error("ResourceRecord", e))
            })
            .collect::<Result<Vec<_>>>()?;

        let record_set = ResourceRecordSet::builder()
            .name(&change.name)
            .r#type(RrType::from(change.record_type.as_str()))
            .ttl(change.ttl)
            .set_resource_records(Some(records))
            .build()
            .map_err(|e| build_error("ResourceRecordSet", e))?;

        Change::builder()
            .action(action)
            .resource_record_set(record_set)
            .build()
            .map_err(|e| build_error("Change", e))
    }
}

fn build_error(what: &str, err: impl std::fmt::Display) -> CertificateError {
    CertificateError::service(
        "route53.change_resource_record_sets",
        format!("failed to build {what}: {err}"),
    )
}

/// Zone names leave here lower-cased and without the trailing dot; nothing
/// downstream normalizes them again.
fn hosted_zone(zone: &aws_sdk_route53::types::HostedZone) -> HostedZone {
    HostedZone {
        zone_id: normalize_zone_id(zone.id()),
        zone_name: normalize_record_name(zone.name()),
    }
}

fn sdk_error<E>(operation: &str, err: E) -> CertificateError
where
    E: std::error::Error + 'static,
{
    CertificateError::service(operation, DisplayErrorContext(&err).to_string())
}

#[async_trait]
impl DnsZoneClient for Route53ZoneClient {
    async fn list_hosted_zones(&self) -> Result<Vec<HostedZone>> {
        let mut paginator = self
            .client
            .list_hosted_zones()
            .into_paginator()
            .page_size(100)
            .send();

        let mut zones = Vec::new();
        while let Some(page) = paginator.next().await {
            let page = page.map_err(|e| sdk_error("route53.list_hosted_zones", e))?;
            zones.extend(page.hosted_zones().iter().map(hosted_zone));
        }
        debug!("[route53] Listed {} hosted zone(s)", zones.len());
        Ok(zones)
    }

    async fn list_record_sets(
        &self,
        zone_id: &str,
        cursor: Option<RecordSetCursor>,
    ) -> Result<RecordSetPage> {
        let (start_name, start_type, start_identifier) = match cursor {
            Some(cursor) => (
                Some(cursor.name),
                Some(RrType::from(cursor.record_type.as_str())),
                cursor.identifier,
            ),
            None => (None, None, None),
        };

        let output = self
            .client
            .list_resource_record_sets()
            .hosted_zone_id(zone_id)
            .set_start_record_name(start_name)
            .set_start_record_type(start_type)
            .set_start_record_identifier(start_identifier)
            .send()
            .await
            .map_err(|e| sdk_error("route53.list_resource_record_sets", e))?;

        let record_sets = output
            .resource_record_sets()
            .iter()
            .map(|set| RecordSet {
                name: set.name().to_string(),
                record_type: set.r#type().as_str().to_string(),
                ttl: set.ttl(),
                values: set
                    .resource_records()
                    .iter()
                    .map(|record| record.value().to_string())
                    .collect(),
                set_identifier: set.set_identifier().map(str::to_string),
            })
            .collect();

        let next = if output.is_truncated() {
            let name = output.next_record_name().ok_or_else(|| {
                CertificateError::service(
                    "route53.list_resource_record_sets",
                    "truncated listing without NextRecordName",
                )
            })?;
            Some(RecordSetCursor {
                name: name.to_string(),
                record_type: output
                    .next_record_type()
                    .map(|kind| kind.as_str().to_string())
                    .unwrap_or_default(),
                identifier: output.next_record_identifier().map(str::to_string),
            })
        } else {
            None
        };

        Ok(RecordSetPage { record_sets, next })
    }

    async fn change_record_sets(
        &self,
        zone_id: &str,
        comment: &str,
        changes: &[RecordChange],
    ) -> Result<()> {
        let changes_len = changes.len();
        let changes = changes
            .iter()
            .map(Self::build_change)
            .collect::<Result<Vec<_>>>()?;

        let change_batch = ChangeBatch::builder()
            .set_changes(Some(changes))
            .comment(comment)
            .build()
            .map_err(|e| build_error("ChangeBatch", e))?;

        self.client
            .change_resource_record_sets()
            .hosted_zone_id(zone_id)
            .change_batch(change_batch)
            .send()
            .await
            .map_err(|e| sdk_error("route53.change_resource_record_sets", e))?;

        debug!(
            "[route53] Applied {} change(s) to zone {}",
            changes_len, zone_id
        );
        Ok(())
    }
}
