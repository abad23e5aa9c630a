//! AWS Elastic Load Balancing (v2) application load balancers.
use anyhow::Context;
use aws_config::SdkConfig;
use aws_sdk_elasticloadbalancingv2::types::{
    Action, ActionTypeEnum, ProtocolEnum, RedirectActionConfig, RedirectActionStatusCodeEnum,
};

use super::ec2;

/// What callers need to know about a freshly created load balancer.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LoadBalancer {
    pub arn: String,
    pub listener_arn: String,
    pub dns_name: String,
}

/// Redirects any plain HTTP request on port 80 to `/api` on the same host.
fn default_listener_action() -> anyhow::Result<Action> {
    Ok(Action::builder()
        .r#type(ActionTypeEnum::Redirect)
        .order(1)
        .redirect_config(
            RedirectActionConfig::builder()
                .host("#{host}")
                .path("/api")
                .port("80")
                .protocol("HTTP")
                .query("#{query}")
                .status_code(RedirectActionStatusCodeEnum::Http301)
                .build()?,
        )
        .build()?)
}

/// Creates a load balancer spanning every subnet of the VPC, with a default
/// HTTP listener on port 80.
pub async fn create(name: &str, vpc_id: &str, cfg: &SdkConfig) -> anyhow::Result<LoadBalancer> {
    let subnets = ec2::list_all_subnet_ids(vpc_id, cfg).await?;
    let client = aws_sdk_elasticloadbalancingv2::Client::new(cfg);
    let out = client
        .create_load_balancer()
        .name(name)
        .set_subnets(Some(subnets))
        .send()
        .await?;
    let created = out
        .load_balancers()
        .first()
        .context("no load balancer was created")?;
    let arn = created
        .load_balancer_arn()
        .context("load balancer missing arn")?
        .to_owned();
    let dns_name = created
        .dns_name()
        .context("load balancer missing dns name")?
        .to_owned();

    let out = client
        .create_listener()
        .load_balancer_arn(&arn)
        .port(80)
        .protocol(ProtocolEnum::Http)
        .default_actions(default_listener_action()?)
        .send()
        .await?;
    let listener_arn = out
        .listeners()
        .first()
        .and_then(|listener| listener.listener_arn())
        .context("listener missing arn")?
        .to_owned();
    log::info!("created load balancer {name} at {dns_name}");
    Ok(LoadBalancer {
        arn,
        listener_arn,
        dns_name,
    })
}

pub async fn delete(arn: &str, cfg: &SdkConfig) -> anyhow::Result<()> {
    let client = aws_sdk_elasticloadbalancingv2::Client::new(cfg);
    client
        .delete_load_balancer()
        .load_balancer_arn(arn)
        .send()
        .await?;
    log::info!("deleted load balancer {arn}");
    Ok(())
}

/// Returns whether a load balancer with the given name or ARN exists.
pub async fn exists(name_or_arn: &str, cfg: &SdkConfig) -> anyhow::Result<bool> {
    let client = aws_sdk_elasticloadbalancingv2::Client::new(cfg);
    // A lookup by an unknown name (or by something that is not a valid name,
    // like an ARN) is an error, so any failure here just means "try the ARN".
    let by_name = client
        .describe_load_balancers()
        .names(name_or_arn)
        .send()
        .await;
    if let Ok(out) = by_name {
        if !out.load_balancers().is_empty() {
            return Ok(true);
        }
    }
    if !super::is_arn(name_or_arn) {
        return Ok(false);
    }
    let by_arn = client
        .describe_load_balancers()
        .load_balancer_arns(name_or_arn)
        .send()
        .await;
    Ok(by_arn.is_ok_and(|out| !out.load_balancers().is_empty()))
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn listener_redirects_to_api() {
        let action = default_listener_action().unwrap();
        assert_eq!(&ActionTypeEnum::Redirect, action.r#type());
        assert_eq!(Some(1), action.order());
        let redirect = action.redirect_config().unwrap();
        assert_eq!(Some("/api"), redirect.path());
        assert_eq!(&RedirectActionStatusCodeEnum::Http301, redirect.status_code());
    }

    #[test]
    fn load_balancer_serializes() {
        let lb = LoadBalancer {
            arn: "arn:aws:elasticloadbalancing:us-east-2:123456789012:loadbalancer/app/web/1".into(),
            listener_arn: "arn:aws:elasticloadbalancing:us-east-2:123456789012:listener/app/web/1/2".into(),
            dns_name: "web-1.us-east-2.elb.amazonaws.com".into(),
        };
        let json = serde_json::to_value(&lb).unwrap();
        assert_eq!("web-1.us-east-2.elb.amazonaws.com", json["dns_name"]);
        assert_eq!(lb, serde_json::from_value(json).unwrap());
    }
}
