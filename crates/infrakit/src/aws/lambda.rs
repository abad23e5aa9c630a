//! AWS Lambda functions.
use aws_config::SdkConfig;

/// Deletes the function with the given name or ARN.
pub async fn delete_function(arn_or_name: &str, cfg: &SdkConfig) -> anyhow::Result<()> {
    let client = aws_sdk_lambda::Client::new(cfg);
    client
        .delete_function()
        .function_name(arn_or_name)
        .send()
        .await?;
    log::info!("deleted lambda {arn_or_name}");
    Ok(())
}
