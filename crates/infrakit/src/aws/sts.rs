//! AWS STS caller identity.
use anyhow::Context;
use aws_config::SdkConfig;

/// Returns the account id of the credentials in `cfg`.
pub async fn get_account_id(cfg: &SdkConfig) -> anyhow::Result<String> {
    let client = aws_sdk_sts::Client::new(cfg);
    let out = client
        .get_caller_identity()
        .send()
        .await
        .context("could not get caller identity")?;
    let account = out.account.context("caller identity has no account")?;
    log::debug!("caller account is {account}");
    Ok(account)
}
