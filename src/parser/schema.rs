//! Decoded profile data structures.
//!
//! A [`Profile`] is built once by the decoder and never mutated afterwards.

use super::framer::WordLayout;
use std::time::Duration;

/// Header of a legacy CPU profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileHeader {
    /// Format version, always 0
    pub version: u64,

    /// Time between two samples
    pub period: Duration,

    /// Header words past version and period, kept verbatim
    pub extra: Vec<u64>,
}

/// One distinct call stack and how often it was sampled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackRecord {
    /// Program counters, innermost frame first
    pub pcs: Vec<u64>,

    /// Number of samples that hit this exact stack
    pub count: u64,
}

impl StackRecord {
    pub fn new(pcs: Vec<u64>, count: u64) -> Self {
        Self { pcs, count }
    }
}

/// A fully decoded and aggregated profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub header: ProfileHeader,

    /// Distinct stacks, sorted by sample count (descending)
    pub stacks: Vec<StackRecord>,

    /// Sum of all stack counts
    pub total_samples: u64,

    /// The stream ended at a record boundary without a stop sentinel
    pub incomplete: bool,

    /// Word width and byte order the stream was written with
    pub layout: WordLayout,
}

impl Profile {
    /// Highest per-stack sample count (0 for an empty profile)
    pub fn max_count(&self) -> u64 {
        self.stacks.first().map_or(0, |s| s.count)
    }

    /// All stacks tied for the highest sample count
    pub fn hottest_stacks(&self) -> &[StackRecord] {
        let max = self.max_count();
        let tied = self.stacks.iter().take_while(|s| s.count == max).count();
        &self.stacks[..tied]
    }

    /// Wall time represented by `samples` samples
    pub fn sample_duration(&self, samples: u64) -> Duration {
        let nanos = self.header.period.as_nanos().saturating_mul(u128::from(samples));
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }
}
