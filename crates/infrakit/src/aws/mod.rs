//! Helpers for AWS.
//!
//! Every helper takes an [`SdkConfig`] and creates the service client it
//! needs, so callers only ever hold on to the one config. Use [`Aws::load`] to
//! build that config from the environment.
use anyhow::Context;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::provider::ProvideCredentials;

pub use aws_config::SdkConfig;

pub mod cloudfront;
pub mod dynamodb;
pub mod ec2;
pub mod ecs;
pub mod elbv2;
pub mod kms;
pub mod lambda;
pub mod route53;
pub mod s3;
pub mod sts;

const ARN_PREFIX: &str = "arn:aws:";

/// A wrapper around the AWS `SdkConfig` that provides `AsRef<SdkConfig>`.
#[derive(Debug, Clone)]
pub struct Aws(pub SdkConfig);

impl AsRef<SdkConfig> for Aws {
    fn as_ref(&self) -> &SdkConfig {
        &self.0
    }
}

/// The access key pair the default provider chain resolved to.
#[derive(Clone)]
pub struct AccessKeys {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl core::fmt::Debug for AccessKeys {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AccessKeys")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .finish()
    }
}

impl Aws {
    /// Loads the config from the default provider chain (environment, shared
    /// profile files, instance metadata), optionally pinning the region.
    ///
    /// Credentials are resolved once up front so that a misconfigured
    /// environment fails here rather than on the first service call.
    pub async fn load(region: Option<&str>) -> anyhow::Result<Self> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region.to_owned()));
        }
        let aws = Aws(loader.load().await);
        log::debug!("loaded aws config for region {:?}", aws.0.region());
        let _ = aws.credentials().await?;
        Ok(aws)
    }

    pub async fn credentials(&self) -> anyhow::Result<AccessKeys> {
        let provider = self
            .0
            .credentials_provider()
            .context("no aws credentials provider is configured")?;
        let creds = provider
            .provide_credentials()
            .await
            .context("could not resolve aws credentials")?;
        Ok(AccessKeys {
            access_key_id: creds.access_key_id().to_owned(),
            secret_access_key: creds.secret_access_key().to_owned(),
        })
    }
}

/// A caller reference for create calls that must be unique per request.
pub(crate) fn caller_reference() -> String {
    let since_epoch = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    format!("infrakit-{}", since_epoch.as_nanos())
}

/// Returns whether `s` looks like an AWS ARN.
pub fn is_arn(s: &str) -> bool {
    s.starts_with(ARN_PREFIX)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn arn_detection() {
        assert!(is_arn("arn:aws:s3:::my-bucket"));
        assert!(is_arn("arn:aws:dynamodb:us-east-2:123456789012:table/locks"));
        assert!(!is_arn("my-bucket"));
        assert!(!is_arn("aws:arn:s3:::my-bucket"));
    }

    #[test]
    fn caller_references_have_a_prefix() {
        let reference = caller_reference();
        assert!(reference.starts_with("infrakit-"));
        assert!(reference.len() > "infrakit-".len());
    }

    #[test]
    fn access_keys_debug_hides_the_secret() {
        let keys = AccessKeys {
            access_key_id: "AKIDEXAMPLE".into(),
            secret_access_key: "wJalrXUtnFEMI".into(),
        };
        let shown = format!("{keys:?}");
        assert!(shown.contains("AKIDEXAMPLE"));
        assert!(!shown.contains("wJalrXUtnFEMI"));
    }
}
