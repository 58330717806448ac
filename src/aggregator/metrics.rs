//! Summary scalars and hot stack selection.
//!
//! The hottest stacks are the primary targets for optimization: by default
//! every stack tied for the maximum sample count, or the top N on request.

use crate::parser::schema::{Profile, StackRecord};
use log::debug;
use std::time::Duration;

/// Summary statistics for a decoded profile
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileSummary {
    /// Samples across all stacks
    pub total_samples: u64,

    /// Number of distinct stacks
    pub distinct_stacks: usize,

    /// Samples of the hottest stack
    pub max_samples: u64,

    /// `total_samples` as wall time
    pub total_time: Duration,

    /// `max_samples` as wall time
    pub max_time: Duration,
}

impl ProfileSummary {
    /// Share of all samples taken by the hottest stack, in percent
    pub fn max_percentage(&self) -> f64 {
        if self.total_samples == 0 {
            0.0
        } else {
            (self.max_samples as f64 / self.total_samples as f64) * 100.0
        }
    }

    /// Human-readable one-liner
    ///
    /// **Public** - for logging and debugging
    pub fn summary(&self) -> String {
        format!(
            "Total: {} samples ({:?}) | Stacks: {} | Max: {} samples ({:?}, {:.1}%)",
            self.total_samples,
            self.total_time,
            self.distinct_stacks,
            self.max_samples,
            self.max_time,
            self.max_percentage()
        )
    }
}

/// Calculate summary scalars for a profile
pub fn summarize(profile: &Profile) -> ProfileSummary {
    let max_samples = profile.max_count();

    ProfileSummary {
        total_samples: profile.total_samples,
        distinct_stacks: profile.stacks.len(),
        max_samples,
        total_time: profile.sample_duration(profile.total_samples),
        max_time: profile.sample_duration(max_samples),
    }
}

/// Select the stacks to report
///
/// # Arguments
/// * `profile` - Decoded profile
/// * `top_n` - `None` for every stack tied at the maximum, `Some(n)` for the first `n`
pub fn select_stacks(profile: &Profile, top_n: Option<usize>) -> &[StackRecord] {
    let selected = match top_n {
        Some(n) => &profile.stacks[..n.min(profile.stacks.len())],
        None => profile.hottest_stacks(),
    };

    debug!(
        "Selected {} of {} stacks for reporting",
        selected.len(),
        profile.stacks.len()
    );

    selected
}
