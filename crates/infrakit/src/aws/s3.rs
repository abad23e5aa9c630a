//! AWS S3 buckets.
use aws_config::SdkConfig;
use aws_sdk_s3::types::{
    BucketCannedAcl, BucketLocationConstraint, BucketVersioningStatus, CreateBucketConfiguration,
    Delete, ErrorDocument, IndexDocument, MfaDelete, ObjectIdentifier, ServerSideEncryption,
    ServerSideEncryptionByDefault, ServerSideEncryptionConfiguration, ServerSideEncryptionRule,
    VersioningConfiguration, WebsiteConfiguration,
};

/// Document served both as the index and on errors by website buckets.
pub const WEBSITE_DOCUMENT: &str = "index.html";

/// Returns the bucket name of a bucket ARN, or the input if it is not an ARN.
pub fn bucket_name(arn_or_name: &str) -> &str {
    if super::is_arn(arn_or_name) {
        arn_or_name
            .rsplit_once(":::")
            .map_or(arn_or_name, |(_, name)| name)
    } else {
        arn_or_name
    }
}

/// `us-east-1` is the default location and S3 rejects it as an explicit
/// constraint.
fn bucket_configuration(region: &str) -> Option<CreateBucketConfiguration> {
    (region != "us-east-1").then(|| {
        CreateBucketConfiguration::builder()
            .location_constraint(BucketLocationConstraint::from(region))
            .build()
    })
}

/// Creates a bucket with the given canned ACL (`private`, `public-read`, ...)
/// in the given region.
pub async fn make_bucket(
    bucket: &str,
    acl: &str,
    region: &str,
    cfg: &SdkConfig,
) -> anyhow::Result<()> {
    let client = aws_sdk_s3::Client::new(cfg);
    client
        .create_bucket()
        .bucket(bucket)
        .acl(BucketCannedAcl::from(acl))
        .set_create_bucket_configuration(bucket_configuration(region))
        .object_lock_enabled_for_bucket(false)
        .send()
        .await?;
    log::info!("created bucket {bucket} in {region}");
    Ok(())
}

pub async fn delete_bucket(arn_or_name: &str, cfg: &SdkConfig) -> anyhow::Result<()> {
    let bucket = bucket_name(arn_or_name);
    let client = aws_sdk_s3::Client::new(cfg);
    client.delete_bucket().bucket(bucket).send().await?;
    log::info!("deleted bucket {bucket}");
    Ok(())
}

/// Deletes every object in the bucket, one batch per listed page.
pub async fn empty_bucket(arn_or_name: &str, cfg: &SdkConfig) -> anyhow::Result<()> {
    let bucket = bucket_name(arn_or_name);
    let client = aws_sdk_s3::Client::new(cfg);
    let mut pages = client.list_objects_v2().bucket(bucket).into_paginator().send();
    let mut deleted = 0;
    while let Some(page) = pages.try_next().await? {
        let keys = page
            .contents()
            .iter()
            .filter_map(|object| object.key())
            .collect::<Vec<_>>();
        // S3 rejects a delete request with no objects.
        if keys.is_empty() {
            continue;
        }
        let out = client
            .delete_objects()
            .bucket(bucket)
            .delete(delete_batch(&keys)?)
            .send()
            .await?;
        if let Some(error) = out.errors().first() {
            anyhow::bail!(
                "could not delete {} objects from {bucket}, first failure: {:?} {:?}",
                out.errors().len(),
                error.key(),
                error.message()
            );
        }
        deleted += keys.len();
    }
    log::info!("emptied bucket {bucket} of {deleted} objects");
    Ok(())
}

fn delete_batch(keys: &[&str]) -> anyhow::Result<Delete> {
    let objects = keys
        .iter()
        .map(|key| ObjectIdentifier::builder().key(*key).build())
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Delete::builder().set_objects(Some(objects)).quiet(true).build()?)
}

/// Serves the bucket as a static website with [`WEBSITE_DOCUMENT`] as index
/// and error document.
pub async fn enable_website_hosting(bucket: &str, cfg: &SdkConfig) -> anyhow::Result<()> {
    let client = aws_sdk_s3::Client::new(cfg);
    let website = WebsiteConfiguration::builder()
        .error_document(ErrorDocument::builder().key(WEBSITE_DOCUMENT).build()?)
        .index_document(IndexDocument::builder().suffix(WEBSITE_DOCUMENT).build()?)
        .build();
    client
        .put_bucket_website()
        .bucket(bucket)
        .website_configuration(website)
        .send()
        .await?;
    log::info!("bucket {bucket} now serves a website");
    Ok(())
}

fn kms_encryption(kms_key_id: &str) -> anyhow::Result<ServerSideEncryptionConfiguration> {
    let by_default = ServerSideEncryptionByDefault::builder()
        .sse_algorithm(ServerSideEncryption::AwsKms)
        .kms_master_key_id(kms_key_id)
        .build()?;
    let rule = ServerSideEncryptionRule::builder()
        .apply_server_side_encryption_by_default(by_default)
        .build();
    Ok(ServerSideEncryptionConfiguration::builder()
        .rules(rule)
        .build()?)
}

/// Turns on default KMS encryption of new objects with the given key.
pub async fn encrypt_bucket(bucket: &str, kms_key_id: &str, cfg: &SdkConfig) -> anyhow::Result<()> {
    let client = aws_sdk_s3::Client::new(cfg);
    client
        .put_bucket_encryption()
        .bucket(bucket)
        .server_side_encryption_configuration(kms_encryption(kms_key_id)?)
        .send()
        .await?;
    log::info!("bucket {bucket} now has KMS encryption by default");
    Ok(())
}

pub async fn enable_versioning(bucket: &str, cfg: &SdkConfig) -> anyhow::Result<()> {
    let client = aws_sdk_s3::Client::new(cfg);
    client
        .put_bucket_versioning()
        .bucket(bucket)
        .versioning_configuration(
            VersioningConfiguration::builder()
                .mfa_delete(MfaDelete::Disabled)
                .status(BucketVersioningStatus::Enabled)
                .build(),
        )
        .send()
        .await?;
    log::info!("bucket {bucket} is now versioned");
    Ok(())
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn bucket_name_from_arn() {
        assert_eq!("saveferris", bucket_name("arn:aws:s3:::saveferris"));
        assert_eq!("saveferris", bucket_name("saveferris"));
    }

    #[test]
    fn us_east_1_has_no_location_constraint() {
        assert!(bucket_configuration("us-east-1").is_none());
        let config = bucket_configuration("us-east-2").unwrap();
        assert_eq!(
            Some(&BucketLocationConstraint::UsEast2),
            config.location_constraint()
        );
    }

    #[test]
    fn delete_batch_is_quiet() {
        let batch = delete_batch(&["a.txt", "b/c.txt"]).unwrap();
        assert_eq!(Some(true), batch.quiet());
        let keys: Vec<_> = batch.objects().iter().map(|o| o.key()).collect();
        assert_eq!(vec!["a.txt", "b/c.txt"], keys);
    }

    #[test]
    fn kms_encryption_rule() {
        let config = kms_encryption("fc8181c8-a0ca-4a95-9bd7-8673b179dee5").unwrap();
        let by_default = config.rules()[0]
            .apply_server_side_encryption_by_default()
            .unwrap();
        assert_eq!(&ServerSideEncryption::AwsKms, by_default.sse_algorithm());
        assert_eq!(
            Some("fc8181c8-a0ca-4a95-9bd7-8673b179dee5"),
            by_default.kms_master_key_id()
        );
    }
}
