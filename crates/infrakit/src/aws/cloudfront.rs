//! AWS CloudFront distributions in front of S3 website buckets.
use anyhow::Context;
use aws_config::SdkConfig;
use aws_sdk_cloudfront::types::{
    Aliases, AllowedMethods, CloudFrontOriginAccessIdentityConfig, CookiePreference,
    CustomErrorResponse, CustomErrorResponses, DefaultCacheBehavior, DistributionConfig,
    ForwardedValues, ItemSelection, Method, Origin, Origins, S3OriginConfig, TrustedSigners,
    ViewerProtocolPolicy,
};

const ROOT_OBJECT: &str = "index.html";
const ERROR_CACHING_MIN_TTL: i64 = 60 * 60 * 24;
const DEFAULT_TTL: i64 = 300;

/// Missing objects (403 from S3) and unknown paths are answered with the root
/// object so that client side routing keeps working.
fn custom_error_responses() -> anyhow::Result<CustomErrorResponses> {
    let responses = [403, 404]
        .into_iter()
        .map(|code| {
            CustomErrorResponse::builder()
                .error_code(code)
                .response_code("200")
                .response_page_path(format!("/{ROOT_OBJECT}"))
                .error_caching_min_ttl(ERROR_CACHING_MIN_TTL)
                .build()
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(CustomErrorResponses::builder()
        .quantity(responses.len() as i32)
        .set_items(Some(responses))
        .build()?)
}

fn default_cache_behavior(origin_id: &str) -> anyhow::Result<DefaultCacheBehavior> {
    let methods = vec![Method::Get, Method::Head, Method::Options];
    Ok(DefaultCacheBehavior::builder()
        .allowed_methods(
            AllowedMethods::builder()
                .quantity(methods.len() as i32)
                .set_items(Some(methods))
                .build()?,
        )
        .default_ttl(DEFAULT_TTL)
        .min_ttl(0)
        .forwarded_values(
            ForwardedValues::builder()
                .cookies(CookiePreference::builder().forward(ItemSelection::None).build()?)
                .query_string(false)
                .build()?,
        )
        .target_origin_id(origin_id)
        .trusted_signers(TrustedSigners::builder().enabled(false).quantity(0).build()?)
        .viewer_protocol_policy(ViewerProtocolPolicy::AllowAll)
        .build()?)
}

/// The distribution serves the bucket named after `domain_name` under that
/// same domain, reading through the given origin access identity.
fn distribution_config(
    domain_name: &str,
    origin_access_identity_id: &str,
    caller_reference: String,
) -> anyhow::Result<DistributionConfig> {
    let origin = Origin::builder()
        .id(domain_name)
        .domain_name(format!("{domain_name}.s3.amazonaws.com"))
        .s3_origin_config(
            S3OriginConfig::builder()
                .origin_access_identity(format!(
                    "origin-access-identity/cloudfront/{origin_access_identity_id}"
                ))
                .build()?,
        )
        .build()?;
    Ok(DistributionConfig::builder()
        .aliases(Aliases::builder().quantity(1).items(domain_name).build()?)
        .caller_reference(caller_reference)
        .comment(format!("Distribution for {domain_name}"))
        .custom_error_responses(custom_error_responses()?)
        .default_cache_behavior(default_cache_behavior(domain_name)?)
        .default_root_object(ROOT_OBJECT)
        .enabled(true)
        .origins(Origins::builder().quantity(1).items(origin).build()?)
        .build()?)
}

/// Creates a distribution for the S3 website bucket named `domain_name`,
/// returning the domain name CloudFront assigned to it.
pub async fn create_distribution_from_s3_bucket(
    domain_name: &str,
    cfg: &SdkConfig,
) -> anyhow::Result<String> {
    let client = aws_sdk_cloudfront::Client::new(cfg);
    let identity = client
        .create_cloud_front_origin_access_identity()
        .cloud_front_origin_access_identity_config(
            CloudFrontOriginAccessIdentityConfig::builder()
                .caller_reference(super::caller_reference())
                .comment(format!("Identity for {domain_name}"))
                .build()?,
        )
        .send()
        .await?
        .cloud_front_origin_access_identity
        .context("missing origin access identity")?;
    log::debug!("created origin access identity {}", identity.id());

    let out = client
        .create_distribution()
        .distribution_config(distribution_config(
            domain_name,
            identity.id(),
            super::caller_reference(),
        )?)
        .send()
        .await?;
    let distribution = out.distribution.context("missing distribution")?;
    log::info!(
        "created distribution {} for {domain_name}",
        distribution.domain_name()
    );
    Ok(distribution.domain_name().to_owned())
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn distribution_points_at_the_bucket() {
        let config =
            distribution_config("www.example.com", "E2QWRUHAPOMQZL", "ref-1".into()).unwrap();
        assert_eq!("ref-1", config.caller_reference());
        assert!(config.enabled());
        assert_eq!(Some("index.html"), config.default_root_object());
        assert_eq!(
            vec!["www.example.com".to_string()],
            config.aliases().unwrap().items().to_vec()
        );

        let origins = config.origins().unwrap();
        assert_eq!(1, origins.quantity());
        let origin = &origins.items()[0];
        assert_eq!("www.example.com.s3.amazonaws.com", origin.domain_name());
        assert_eq!(
            "origin-access-identity/cloudfront/E2QWRUHAPOMQZL",
            origin.s3_origin_config().unwrap().origin_access_identity()
        );
    }

    #[test]
    fn quantities_match_items() {
        let errors = custom_error_responses().unwrap();
        assert_eq!(errors.quantity() as usize, errors.items().len());
        let codes: Vec<i32> = errors.items().iter().map(|r| r.error_code()).collect();
        assert_eq!(vec![403, 404], codes);

        let behavior = default_cache_behavior("www.example.com").unwrap();
        let methods = behavior.allowed_methods().unwrap();
        assert_eq!(methods.quantity() as usize, methods.items().len());
        assert_eq!("www.example.com", behavior.target_origin_id());
    }
}
