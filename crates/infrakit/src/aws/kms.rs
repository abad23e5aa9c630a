//! AWS KMS customer managed keys.
use anyhow::Context;
use aws_config::SdkConfig;

/// The shortest waiting period AWS allows before a key is deleted.
pub const PENDING_WINDOW_IN_DAYS: i32 = 7;

/// Creates a customer managed key and returns its key id.
pub async fn create_encryption_key(cfg: &SdkConfig) -> anyhow::Result<String> {
    let client = aws_sdk_kms::Client::new(cfg);
    let out = client.create_key().send().await?;
    let metadata = out.key_metadata.context("missing key metadata")?;
    let key_id = metadata.key_id().to_owned();
    log::info!("created kms key {key_id}");
    Ok(key_id)
}

/// Schedules the key for deletion after [`PENDING_WINDOW_IN_DAYS`].
///
/// AWS does not allow immediate deletion of keys, in case encrypted data
/// turns up later that still needs decrypting.
pub async fn schedule_encryption_key_deletion(key_id: &str, cfg: &SdkConfig) -> anyhow::Result<()> {
    let client = aws_sdk_kms::Client::new(cfg);
    let out = client
        .schedule_key_deletion()
        .key_id(key_id)
        .pending_window_in_days(PENDING_WINDOW_IN_DAYS)
        .send()
        .await?;
    log::info!(
        "kms key {key_id} is scheduled for deletion on {:?}",
        out.deletion_date()
    );
    Ok(())
}
