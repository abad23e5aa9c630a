//! AWS EC2 networking lookups.
use anyhow::Context;
use aws_config::SdkConfig;
use aws_sdk_ec2::types::{Filter, Vpc, VpcCidrBlockAssociation, VpcCidrBlockStateCode};

use crate::cidr::{self, CidrBlock};

/// Returns every IPv4 CIDR block held by a VPC in the configured region.
///
/// Includes both the primary block and any additionally associated blocks of
/// each VPC. Errors if the region has no VPCs at all, as that almost always
/// means the wrong account or region is configured.
pub async fn get_all_vpc_cidr_blocks(cfg: &SdkConfig) -> anyhow::Result<Vec<String>> {
    vpc_cidr_blocks(&describe_all_vpcs(cfg).await?)
}

async fn describe_all_vpcs(cfg: &SdkConfig) -> anyhow::Result<Vec<Vpc>> {
    let client = aws_sdk_ec2::Client::new(cfg);
    let mut pages = client.describe_vpcs().into_paginator().send();
    let mut vpcs = vec![];
    while let Some(page) = pages.try_next().await? {
        vpcs.extend_from_slice(page.vpcs());
    }
    Ok(vpcs)
}

/// Associations that are gone or never took hold no longer reserve their block.
fn holds_block(assoc: &VpcCidrBlockAssociation) -> bool {
    match assoc.cidr_block_state().and_then(|state| state.state()) {
        Some(VpcCidrBlockStateCode::Associated | VpcCidrBlockStateCode::Associating) | None => {
            true
        }
        Some(_) => false,
    }
}

fn vpc_cidr_blocks(vpcs: &[Vpc]) -> anyhow::Result<Vec<String>> {
    anyhow::ensure!(
        !vpcs.is_empty(),
        "VPC information was queried, but no VPCs were found"
    );
    let mut blocks: Vec<String> = vec![];
    for vpc in vpcs {
        let associated = vpc
            .cidr_block_association_set()
            .iter()
            .filter(|assoc| holds_block(assoc))
            .filter_map(|assoc| assoc.cidr_block());
        for block in vpc.cidr_block().into_iter().chain(associated) {
            if !blocks.iter().any(|b| b == block) {
                blocks.push(block.to_owned());
            }
        }
    }
    log::debug!("{} vpcs hold {} cidr blocks", vpcs.len(), blocks.len());
    Ok(blocks)
}

fn available_blocks(vpcs: &[Vpc], number_to_find: usize) -> anyhow::Result<Vec<CidrBlock>> {
    let used = vpc_cidr_blocks(vpcs)?;
    Ok(cidr::find_available(&used, number_to_find)?)
}

/// Finds `number_to_find` `10.N.0.0/16` blocks not held by any VPC.
///
/// The used blocks are fetched fresh on every call. See
/// [`cidr::find_available`] for the search itself.
pub async fn find_available_vpc_cidr_blocks(
    number_to_find: usize,
    cfg: &SdkConfig,
) -> anyhow::Result<Vec<CidrBlock>> {
    let free = available_blocks(&describe_all_vpcs(cfg).await?, number_to_find)?;
    log::info!(
        "found free cidr blocks: {}",
        free.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
    );
    Ok(free)
}

/// Returns the public IP associated with the given network interface.
pub async fn find_public_ip_of_network_interface(
    network_interface_id: &str,
    cfg: &SdkConfig,
) -> anyhow::Result<String> {
    let client = aws_sdk_ec2::Client::new(cfg);
    let out = client
        .describe_network_interfaces()
        .network_interface_ids(network_interface_id)
        .send()
        .await?;
    let interface = out
        .network_interfaces()
        .first()
        .with_context(|| format!("A network interface with ID {network_interface_id} was not found"))?;
    let ip = interface
        .association()
        .and_then(|assoc| assoc.public_ip())
        .with_context(|| format!("network interface {network_interface_id} has no public IP"))?;
    Ok(ip.to_owned())
}

/// Returns the IDs of all subnets within the given VPC.
pub async fn list_all_subnet_ids(vpc_id: &str, cfg: &SdkConfig) -> anyhow::Result<Vec<String>> {
    let client = aws_sdk_ec2::Client::new(cfg);
    let mut pages = client
        .describe_subnets()
        .filters(Filter::builder().name("vpc-id").values(vpc_id).build())
        .into_paginator()
        .send();
    let mut ids = vec![];
    while let Some(page) = pages.try_next().await? {
        ids.extend(
            page.subnets()
                .iter()
                .filter(|subnet| subnet.vpc_id() == Some(vpc_id))
                .filter_map(|subnet| subnet.subnet_id().map(str::to_owned)),
        );
    }
    log::debug!("vpc {vpc_id} has subnets {ids:?}");
    Ok(ids)
}

/// Returns the ID of the security group with the given name, if exactly one
/// such group exists.
pub async fn get_security_group_id(
    security_group_name: &str,
    cfg: &SdkConfig,
) -> anyhow::Result<Option<String>> {
    let client = aws_sdk_ec2::Client::new(cfg);
    let out = client
        .describe_security_groups()
        .group_names(security_group_name)
        .send()
        .await?;
    Ok(match out.security_groups() {
        [group] => group.group_id().map(str::to_owned),
        groups => {
            log::warn!(
                "expected exactly one security group named {security_group_name}, found {}",
                groups.len()
            );
            None
        }
    })
}

#[cfg(test)]
mod test {
    use aws_sdk_ec2::types::VpcCidrBlockState;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn collects_primary_and_associated_blocks_once() {
        let vpcs = vec![
            Vpc::builder().cidr_block("10.1.0.0/16").build(),
            Vpc::builder()
                .cidr_block("10.2.0.0/16")
                .cidr_block_association_set(
                    VpcCidrBlockAssociation::builder()
                        .cidr_block("10.2.0.0/16")
                        .build(),
                )
                .cidr_block_association_set(
                    VpcCidrBlockAssociation::builder()
                        .cidr_block("10.3.0.0/16")
                        .build(),
                )
                .build(),
            Vpc::builder().build(),
        ];
        assert_eq!(
            vec!["10.1.0.0/16", "10.2.0.0/16", "10.3.0.0/16"],
            vpc_cidr_blocks(&vpcs).unwrap()
        );
    }

    #[test]
    fn collected_blocks_feed_the_allocator() {
        let vpcs = vec![
            Vpc::builder().cidr_block("172.31.0.0/16").build(),
            Vpc::builder().cidr_block("10.1.0.0/16").build(),
        ];
        let free = available_blocks(&vpcs, 2).unwrap();
        assert_eq!(vec![CidrBlock::new(2), CidrBlock::new(3)], free);
    }

    #[test]
    fn no_vpcs_is_an_error() {
        let err = vpc_cidr_blocks(&[]).unwrap_err().to_string();
        assert!(err.contains("no VPCs were found"), "{err}");
        assert!(available_blocks(&[], 1).is_err());
    }

    #[test]
    fn exhaustion_surfaces_through_the_vpc_search() {
        let vpcs: Vec<Vpc> = (1..=255)
            .map(|n| Vpc::builder().cidr_block(format!("10.{n}.0.0/16")).build())
            .collect();
        let err = available_blocks(&vpcs, 1).unwrap_err();
        assert!(
            matches!(
                err.downcast_ref::<crate::Error>(),
                Some(crate::Error::CidrSpaceExhausted { requested: 1, found: 0 })
            ),
            "{err}"
        );
    }

    #[test]
    fn released_associations_do_not_hold_blocks() {
        let assoc = |block: &str, state: VpcCidrBlockStateCode| {
            VpcCidrBlockAssociation::builder()
                .cidr_block(block)
                .cidr_block_state(VpcCidrBlockState::builder().state(state).build())
                .build()
        };
        let vpcs = vec![Vpc::builder()
            .cidr_block("10.1.0.0/16")
            .cidr_block_association_set(assoc("10.1.0.0/16", VpcCidrBlockStateCode::Associated))
            .cidr_block_association_set(assoc("10.2.0.0/16", VpcCidrBlockStateCode::Associating))
            .cidr_block_association_set(assoc("10.3.0.0/16", VpcCidrBlockStateCode::Disassociated))
            .cidr_block_association_set(assoc("10.4.0.0/16", VpcCidrBlockStateCode::Failed))
            .build()];
        assert_eq!(
            vec!["10.1.0.0/16", "10.2.0.0/16"],
            vpc_cidr_blocks(&vpcs).unwrap()
        );
        let free = available_blocks(&vpcs, 2).unwrap();
        assert_eq!(vec![CidrBlock::new(3), CidrBlock::new(4)], free);
    }
}
