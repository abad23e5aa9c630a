//! AWS ECS clusters and Fargate tasks.
use anyhow::Context;
use aws_config::SdkConfig;
use aws_sdk_ecs::types::{
    AssignPublicIp, AwsVpcConfiguration, LaunchType, NetworkConfiguration, Task,
};

use super::ec2;

const STOP_REASON: &str = "Stopped by infrakit";

pub async fn delete_cluster(arn_or_name: &str, cfg: &SdkConfig) -> anyhow::Result<()> {
    let client = aws_sdk_ecs::Client::new(cfg);
    client.delete_cluster().cluster(arn_or_name).send().await?;
    log::info!("deleted ecs cluster {arn_or_name}");
    Ok(())
}

pub async fn deregister_task_definition(arn: &str, cfg: &SdkConfig) -> anyhow::Result<()> {
    let client = aws_sdk_ecs::Client::new(cfg);
    client
        .deregister_task_definition()
        .task_definition(arn)
        .send()
        .await?;
    log::info!("deregistered ecs task definition {arn}");
    Ok(())
}

pub async fn stop_task(
    task_id_or_arn: &str,
    cluster_arn_or_name: &str,
    cfg: &SdkConfig,
) -> anyhow::Result<()> {
    let client = aws_sdk_ecs::Client::new(cfg);
    client
        .stop_task()
        .cluster(cluster_arn_or_name)
        .task(task_id_or_arn)
        .reason(STOP_REASON)
        .send()
        .await?;
    log::debug!("stopped task {task_id_or_arn}");
    Ok(())
}

pub async fn stop_all_tasks_in_cluster(
    cluster_arn_or_name: &str,
    cfg: &SdkConfig,
) -> anyhow::Result<()> {
    let client = aws_sdk_ecs::Client::new(cfg);
    let mut pages = client
        .list_tasks()
        .cluster(cluster_arn_or_name)
        .into_paginator()
        .send();
    let mut task_arns = vec![];
    while let Some(page) = pages.try_next().await? {
        task_arns.extend_from_slice(page.task_arns());
    }
    for task_arn in task_arns.iter() {
        stop_task(task_arn, cluster_arn_or_name, cfg).await?;
    }
    log::info!(
        "stopped {} tasks in cluster {cluster_arn_or_name}",
        task_arns.len()
    );
    Ok(())
}

fn cluster_arn_matches(arn: &str, cluster_name: &str) -> bool {
    arn.strip_suffix(cluster_name)
        .is_some_and(|prefix| prefix.ends_with('/'))
}

/// Returns the ARN of the cluster with the given name, if there is one.
pub async fn find_cluster(cluster_name: &str, cfg: &SdkConfig) -> anyhow::Result<Option<String>> {
    let client = aws_sdk_ecs::Client::new(cfg);
    let mut pages = client.list_clusters().into_paginator().send();
    while let Some(page) = pages.try_next().await? {
        if let Some(arn) = page
            .cluster_arns()
            .iter()
            .find(|arn| cluster_arn_matches(arn, cluster_name))
        {
            return Ok(Some(arn.clone()));
        }
    }
    Ok(None)
}

pub async fn create_cluster(cluster_name: &str, cfg: &SdkConfig) -> anyhow::Result<String> {
    let client = aws_sdk_ecs::Client::new(cfg);
    let out = client
        .create_cluster()
        .cluster_name(cluster_name)
        .send()
        .await?;
    let arn = out
        .cluster
        .and_then(|cluster| cluster.cluster_arn)
        .context("created cluster is missing its arn")?;
    log::info!("created ecs cluster {arn}");
    Ok(arn)
}

/// Returns the id of the elastic network interface attached to an
/// `awsvpc` task, once AWS has attached one.
fn network_interface_id(task: &Task) -> Option<&str> {
    task.attachments()
        .iter()
        .flat_map(|attachment| attachment.details())
        .find(|detail| detail.name() == Some("networkInterfaceId"))
        .and_then(|detail| detail.value())
}

/// Errors if the task has already stopped, since a stopped task never
/// gets a reachable network interface.
fn ensure_not_stopped(task: &Task) -> anyhow::Result<()> {
    if task.last_status() == Some("STOPPED") {
        anyhow::bail!(
            "task {} stopped before it was reachable: {}",
            task.task_arn().unwrap_or("<unknown>"),
            task.stopped_reason().unwrap_or("no reason given")
        );
    }
    Ok(())
}

async fn run_task(
    task_definition: &str,
    cluster_name: &str,
    security_group_name: &str,
    vpc_id: &str,
    cfg: &SdkConfig,
) -> anyhow::Result<String> {
    let security_group = ec2::get_security_group_id(security_group_name, cfg)
        .await?
        .with_context(|| format!("security group {security_group_name} was not found"))?;
    let subnets = ec2::list_all_subnet_ids(vpc_id, cfg).await?;
    let network = NetworkConfiguration::builder()
        .awsvpc_configuration(
            AwsVpcConfiguration::builder()
                .assign_public_ip(AssignPublicIp::Enabled)
                .security_groups(security_group)
                .set_subnets(Some(subnets))
                .build()?,
        )
        .build();

    let client = aws_sdk_ecs::Client::new(cfg);
    let out = client
        .run_task()
        .cluster(cluster_name)
        .launch_type(LaunchType::Fargate)
        .network_configuration(network)
        .task_definition(task_definition)
        .send()
        .await?;
    anyhow::ensure!(
        out.failures().is_empty(),
        "The ECS task named {task_definition} had a failure. Did you reach the max number \
         of ECS tasks you are allowed to run? {:?}",
        out.failures()
    );
    let task_arn = out
        .tasks()
        .first()
        .and_then(|task| task.task_arn())
        .context("run task returned no task")?;
    log::info!("started task {task_arn}");
    Ok(task_arn.to_owned())
}

async fn find_public_ip_of_task(
    cluster_name: &str,
    task_arn: &str,
    cfg: &SdkConfig,
) -> anyhow::Result<String> {
    // timeout after 2 minutes
    let timeout_secs = 60 * 2;
    let start = std::time::Instant::now();
    let client = aws_sdk_ecs::Client::new(cfg);
    log::info!("awaiting the network interface of task {task_arn}");
    let network_interface_id = loop {
        let out = client
            .describe_tasks()
            .cluster(cluster_name)
            .tasks(task_arn)
            .send()
            .await?;
        let task = out
            .tasks()
            .first()
            .with_context(|| format!("task {task_arn} was not found"))?;
        ensure_not_stopped(task)?;
        if let Some(id) = network_interface_id(task) {
            break id.to_owned();
        }
        if start.elapsed().as_secs() >= timeout_secs {
            anyhow::bail!("task {task_arn} got no network interface within {timeout_secs} seconds");
        }
        tokio::time::sleep(std::time::Duration::from_secs(3)).await;
    };
    ec2::find_public_ip_of_network_interface(&network_interface_id, cfg).await
}

/// Runs the task definition on Fargate in the given cluster (creating the
/// cluster if needed) and returns the public IP of the running task.
pub async fn launch_fargate_container(
    task_definition: &str,
    cluster_name: &str,
    security_group_name: &str,
    vpc_id: &str,
    cfg: &SdkConfig,
) -> anyhow::Result<String> {
    if find_cluster(cluster_name, cfg).await?.is_none() {
        create_cluster(cluster_name, cfg).await?;
    }
    let task_arn = run_task(task_definition, cluster_name, security_group_name, vpc_id, cfg).await?;
    find_public_ip_of_task(cluster_name, &task_arn, cfg).await
}

#[cfg(test)]
mod test {
    use aws_sdk_ecs::types::{Attachment, KeyValuePair};

    use super::*;

    #[test]
    fn matches_cluster_by_name_suffix() {
        let arn = "arn:aws:ecs:us-east-2:123456789012:cluster/jenkins";
        assert!(cluster_arn_matches(arn, "jenkins"));
        assert!(!cluster_arn_matches(arn, "kins"));
        assert!(!cluster_arn_matches(arn, "other"));
    }

    #[test]
    fn finds_the_network_interface() {
        let detail = |name: &str, value: &str| KeyValuePair::builder().name(name).value(value).build();
        let task = Task::builder()
            .attachments(
                Attachment::builder()
                    .details(detail("subnetId", "subnet-1"))
                    .details(detail("networkInterfaceId", "eni-0abc"))
                    .build(),
            )
            .build();
        assert_eq!(Some("eni-0abc"), network_interface_id(&task));
        assert_eq!(None, network_interface_id(&Task::builder().build()));
    }

    #[test]
    fn stopped_tasks_are_not_awaited() {
        let pending = Task::builder().last_status("PROVISIONING").build();
        assert!(ensure_not_stopped(&pending).is_ok());
        assert!(ensure_not_stopped(&Task::builder().build()).is_ok());

        let stopped = Task::builder()
            .task_arn("arn:aws:ecs:us-east-2:123456789012:task/jenkins/abc")
            .last_status("STOPPED")
            .stopped_reason("Essential container in task exited")
            .build();
        let err = ensure_not_stopped(&stopped).unwrap_err().to_string();
        assert!(err.contains("Essential container in task exited"), "{err}");
        assert!(err.contains("task/jenkins/abc"), "{err}");
    }
}
