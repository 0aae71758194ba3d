//! Job contract identities and per-job status.

use std::{fmt, str::FromStr};

use alloy::primitives::Address;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

/// The address of a monitored job contract.
///
/// Equality is byte-wise, so two addresses that differ only in hex case are the
/// same job. The canonical textual form is lower-case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct JobAddress(Address);

impl JobAddress {
    /// Wraps a raw address.
    pub const fn new(address: Address) -> Self {
        Self(address)
    }

    /// Returns the underlying address.
    pub const fn address(&self) -> Address {
        self.0
    }
}

impl From<Address> for JobAddress {
    fn from(address: Address) -> Self {
        Self(address)
    }
}

impl From<JobAddress> for Address {
    fn from(job: JobAddress) -> Self {
        job.0
    }
}

impl FromStr for JobAddress {
    type Err = alloy::hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Parsing the raw hex skips checksum validation, so mixed-case input that
        // is not EIP-55 encoded is still accepted.
        let trimmed = s.trim();
        let hex = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")).unwrap_or(trimmed);
        let bytes = <[u8; 20]>::try_from(alloy::hex::decode(hex)?.as_slice())
            .map_err(|_| alloy::hex::FromHexError::InvalidStringLength)?;
        Ok(Self(Address::from(bytes)))
    }
}

impl fmt::Display for JobAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0.as_slice()))
    }
}

impl Serialize for JobAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for JobAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// The outcome of a `workable(network)` check for one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkableStatus {
    /// The job that was checked.
    pub address: JobAddress,
    /// Whether the job reported it can execute work. Failed checks read as `false`.
    pub workable: bool,
}

/// Per-job status used by the stale-job alert policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    /// The job contract.
    pub address: JobAddress,
    /// Whether the job is currently workable.
    pub workable: bool,
    /// The most recent block in the analyzed window where the job executed work.
    pub last_worked_block: Option<u64>,
    /// `true` when no work execution was observed in the analyzed window.
    pub is_stale: bool,
}

impl JobStatus {
    /// Builds a status from a workability check and the last observed work.
    pub fn new(address: JobAddress, workable: bool, last_worked_block: Option<u64>) -> Self {
        Self { address, workable, last_worked_block, is_stale: last_worked_block.is_none() }
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::address;

    use super::*;

    #[test]
    fn test_job_address_case_insensitive_equality() {
        let lower: JobAddress = "0xabcdefabcdefabcdefabcdefabcdefabcdefabcd".parse().unwrap();
        let upper: JobAddress = "0xABCDEFABCDEFABCDEFABCDEFABCDEFABCDEFABCD".parse().unwrap();
        let mixed: JobAddress = "AbCdEfabcdefabcdefabcdefabcdefabcdefabcd".parse().unwrap();
        assert_eq!(lower, upper);
        assert_eq!(lower, mixed);
    }

    #[test]
    fn test_job_address_displays_lower_case() {
        let job = JobAddress::from(address!("238b4E35dAed6100C6162fAE4510261f88996EC9"));
        assert_eq!(job.to_string(), "0x238b4e35daed6100c6162fae4510261f88996ec9");
    }

    #[test]
    fn test_job_address_rejects_wrong_length() {
        assert!("0x1234".parse::<JobAddress>().is_err());
        assert!("not hex at all".parse::<JobAddress>().is_err());
    }

    #[test]
    fn test_job_address_serde() {
        let job: JobAddress =
            serde_json::from_str("\"0xAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA\"").unwrap();
        assert_eq!(
            serde_json::to_string(&job).unwrap(),
            "\"0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa\""
        );
    }

    #[test]
    fn test_job_status_staleness() {
        let job = JobAddress::default();
        assert!(JobStatus::new(job, true, None).is_stale);
        assert!(!JobStatus::new(job, true, Some(10)).is_stale);
    }
}
