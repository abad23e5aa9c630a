//! Free VPC CIDR block discovery.
//!
//! VPCs provisioned with this crate each get a `10.N.0.0/16` block. Finding
//! room for new VPCs means walking the second octet upwards from 1 and
//! skipping any block that an existing VPC already holds.
use std::collections::HashSet;

use snafu::prelude::*;

use crate::{CidrSpaceExhaustedSnafu, Error, ParseCidrSnafu};

/// A `10.N.0.0/16` block, identified by its second octet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CidrBlock(u8);

impl CidrBlock {
    pub const fn new(second_octet: u8) -> Self {
        CidrBlock(second_octet)
    }

    pub const fn second_octet(&self) -> u8 {
        self.0
    }
}

impl core::fmt::Display for CidrBlock {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "10.{}.0.0/16", self.0)
    }
}

impl core::str::FromStr for CidrBlock {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_prefix("10.")
            .and_then(|rest| rest.strip_suffix(".0.0/16"))
            // Reject forms like "+1" or "01" that `u8::from_str` would accept.
            .filter(|octet| {
                !octet.is_empty()
                    && octet.bytes().all(|b| b.is_ascii_digit())
                    && (octet.len() == 1 || !octet.starts_with('0'))
            })
            .and_then(|octet| octet.parse::<u8>().ok())
            .map(CidrBlock)
            .context(ParseCidrSnafu { block: s })
    }
}

impl serde::Serialize for CidrBlock {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for CidrBlock {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Returns `number_to_find` blocks of the form `10.N.0.0/16` that do not
/// appear in `used`.
///
/// Candidates are probed in ascending order starting at `10.1.0.0/16`, so the
/// result is sorted, free of duplicates and the same for the same input.
/// Entries of `used` are compared by their exact string form, which means
/// blocks of any other shape never collide with a candidate.
///
/// Errors with [`Error::CidrSpaceExhausted`] if the second octet would have to
/// go past 255. No partial result is returned in that case.
pub fn find_available<S: AsRef<str>>(
    used: &[S],
    number_to_find: usize,
) -> Result<Vec<CidrBlock>, Error> {
    let used: HashSet<&str> = used.iter().map(AsRef::as_ref).collect();
    log::trace!("searching for {number_to_find} free blocks among {} used", used.len());

    let mut free = Vec::with_capacity(number_to_find);
    // u16 so that stepping past 255 is observable instead of wrapping.
    let mut candidate: u16 = 1;
    while free.len() < number_to_find {
        let block = loop {
            let octet = u8::try_from(candidate).ok().context(CidrSpaceExhaustedSnafu {
                requested: number_to_find,
                found: free.len(),
            })?;
            let block = CidrBlock(octet);
            if !used.contains(block.to_string().as_str()) {
                break block;
            }
            log::trace!("  {block} is taken");
            candidate += 1;
        };
        free.push(block);
        candidate += 1;
    }
    Ok(free)
}
