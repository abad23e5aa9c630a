//! Route53 hosted zones and records.
use anyhow::Context;
use aws_config::SdkConfig;
use aws_sdk_route53::types::{
    Change, ChangeAction, ChangeBatch, ChangeStatus, ResourceRecord, ResourceRecordSet, RrType,
};

/// Returns whether two domain names are the same, ignoring a trailing dot on
/// either one.
pub fn domain_names_match(a: &str, b: &str) -> bool {
    a.strip_suffix('.').unwrap_or(a) == b.strip_suffix('.').unwrap_or(b)
}

/// Creates a public hosted zone for the domain and returns its name servers.
pub async fn create_hosted_zone(domain_name: &str, cfg: &SdkConfig) -> anyhow::Result<Vec<String>> {
    let client = aws_sdk_route53::Client::new(cfg);
    let out = client
        .create_hosted_zone()
        .name(domain_name)
        .caller_reference(super::caller_reference())
        .send()
        .await?;
    let name_servers = out
        .delegation_set
        .context("missing delegation set")?
        .name_servers()
        .to_vec();
    log::info!("created hosted zone {domain_name} served by {name_servers:?}");
    Ok(name_servers)
}

/// Returns the id of the hosted zone for the domain, if there is one.
pub async fn find_hosted_zone_id(
    domain_name: &str,
    cfg: &SdkConfig,
) -> anyhow::Result<Option<String>> {
    let client = aws_sdk_route53::Client::new(cfg);
    let out = client
        .list_hosted_zones_by_name()
        .dns_name(domain_name)
        .send()
        .await?;
    // Zones are listed in order starting from `dns_name`, so the first one is
    // the only possible match.
    Ok(out
        .hosted_zones()
        .first()
        .filter(|zone| domain_names_match(zone.name(), domain_name))
        .map(|zone| zone.id().to_owned()))
}

async fn require_hosted_zone_id(domain_name: &str, cfg: &SdkConfig) -> anyhow::Result<String> {
    find_hosted_zone_id(domain_name, cfg)
        .await?
        .with_context(|| format!("no hosted zone found for domain {domain_name}"))
}

fn record_set(
    record_type: &str,
    record_name: &str,
    values: &[String],
    ttl: i64,
) -> anyhow::Result<ResourceRecordSet> {
    let records = values
        .iter()
        .map(|value| ResourceRecord::builder().value(value).build())
        .collect::<Result<Vec<_>, _>>()?;
    let ty = RrType::from(record_type);
    log::trace!("name: {record_name} ttl: {ttl} ty: {ty:?}");
    Ok(ResourceRecordSet::builder()
        .name(record_name)
        .r#type(ty)
        .ttl(ttl)
        .set_resource_records(Some(records))
        .build()?)
}

/// Creates or replaces a record in the domain's hosted zone and waits for the
/// change to propagate.
pub async fn change_record(
    domain_name: &str,
    record_type: &str,
    record_name: &str,
    values: &[String],
    ttl: i64,
    cfg: &SdkConfig,
) -> anyhow::Result<()> {
    let hosted_zone_id = require_hosted_zone_id(domain_name, cfg).await?;
    let change = Change::builder()
        .action(ChangeAction::Upsert)
        .resource_record_set(record_set(record_type, record_name, values, ttl)?)
        .build()?;
    let client = aws_sdk_route53::Client::new(cfg);
    let out = client
        .change_resource_record_sets()
        .hosted_zone_id(&hosted_zone_id)
        .change_batch(ChangeBatch::builder().changes(change).build()?)
        .send()
        .await?;
    let mut info = out.change_info.context("missing change_info")?;
    log::info!("awaiting record change");
    let timeout_secs = 60;
    let start = std::time::Instant::now();
    while *info.status() == ChangeStatus::Pending {
        if start.elapsed().as_secs() >= timeout_secs {
            anyhow::bail!("record change did not sync within {timeout_secs} seconds");
        }
        tokio::time::sleep(std::time::Duration::from_secs(2)).await;
        let out = client.get_change().id(info.id()).send().await?;
        info = out.change_info.context("missing change_info")?;
    }
    log::info!("...records in sync");
    Ok(())
}

async fn list_record_sets(
    hosted_zone_id: &str,
    client: &aws_sdk_route53::Client,
) -> anyhow::Result<Vec<ResourceRecordSet>> {
    let mut records = vec![];
    let mut start_name = None;
    let mut start_type = None;
    let mut start_identifier = None;
    loop {
        let out = client
            .list_resource_record_sets()
            .hosted_zone_id(hosted_zone_id)
            .set_start_record_name(start_name)
            .set_start_record_type(start_type)
            .set_start_record_identifier(start_identifier)
            .send()
            .await?;
        records.extend_from_slice(out.resource_record_sets());
        if !out.is_truncated() {
            return Ok(records);
        }
        start_name = out.next_record_name;
        start_type = out.next_record_type;
        start_identifier = out.next_record_identifier;
    }
}

/// Every zone has an SOA and NS record that AWS manages and that cannot be
/// deleted.
fn is_managed_by_aws(record: &ResourceRecordSet) -> bool {
    matches!(record.r#type(), RrType::Soa | RrType::Ns)
}

fn deletion_batch(
    records: impl IntoIterator<Item = ResourceRecordSet>,
    comment: &str,
) -> anyhow::Result<Option<ChangeBatch>> {
    let changes = records
        .into_iter()
        .map(|record| {
            Change::builder()
                .action(ChangeAction::Delete)
                .resource_record_set(record)
                .build()
        })
        .collect::<Result<Vec<_>, _>>()?;
    if changes.is_empty() {
        return Ok(None);
    }
    Ok(Some(
        ChangeBatch::builder()
            .set_changes(Some(changes))
            .comment(comment)
            .build()?,
    ))
}

async fn delete_records(
    hosted_zone_id: &str,
    records: Vec<ResourceRecordSet>,
    comment: &str,
    client: &aws_sdk_route53::Client,
) -> anyhow::Result<()> {
    let count = records.len();
    if let Some(batch) = deletion_batch(records, comment)? {
        client
            .change_resource_record_sets()
            .hosted_zone_id(hosted_zone_id)
            .change_batch(batch)
            .send()
            .await?;
        log::info!("deleted {count} record sets from {hosted_zone_id}");
    }
    Ok(())
}

/// Deletes every record named `record_name` in the domain's hosted zone.
///
/// Does nothing if the domain has no hosted zone.
pub async fn delete_record(
    domain_name: &str,
    record_name: &str,
    cfg: &SdkConfig,
) -> anyhow::Result<()> {
    let Some(hosted_zone_id) = find_hosted_zone_id(domain_name, cfg).await? else {
        log::warn!("no hosted zone for {domain_name}, nothing to delete");
        return Ok(());
    };
    let client = aws_sdk_route53::Client::new(cfg);
    let records = list_record_sets(&hosted_zone_id, &client)
        .await?
        .into_iter()
        .filter(|record| domain_names_match(record.name(), record_name))
        .collect();
    delete_records(&hosted_zone_id, records, "deleted records by name", &client).await
}

/// Deletes the domain's hosted zone along with all of its records.
///
/// Does nothing if the domain has no hosted zone.
pub async fn delete_hosted_zone(domain_name: &str, cfg: &SdkConfig) -> anyhow::Result<()> {
    let Some(hosted_zone_id) = find_hosted_zone_id(domain_name, cfg).await? else {
        log::warn!("no hosted zone for {domain_name}, nothing to delete");
        return Ok(());
    };
    let client = aws_sdk_route53::Client::new(cfg);
    let records = list_record_sets(&hosted_zone_id, &client)
        .await?
        .into_iter()
        .filter(|record| !is_managed_by_aws(record))
        .collect();
    delete_records(
        &hosted_zone_id,
        records,
        "deleted records before deleting the hosted zone",
        &client,
    )
    .await?;
    client.delete_hosted_zone().id(&hosted_zone_id).send().await?;
    log::info!("deleted hosted zone {domain_name} ({hosted_zone_id})");
    Ok(())
}
