//! Plain text rendering of summaries and resolved frames.

use crate::aggregator::ProfileSummary;
use crate::parser::StackRecord;
use crate::symbols::ResolvedFrame;

/// `file:line function+0xoffset`, or `?:? <unknown>+0xpc` when unresolved
pub fn format_frame(frame: &ResolvedFrame) -> String {
    match &frame.function {
        Some(function) => {
            let file = if frame.file.is_empty() {
                "?"
            } else {
                frame.file.as_str()
            };
            let line = frame
                .line
                .map_or_else(|| "?".to_string(), |l| l.to_string());
            format!("{}:{} {}+{:#x}", file, line, function, frame.offset)
        }
        None => format!("?:? <unknown>+{:#x}", frame.pc),
    }
}

/// Summary scalars, one per line
pub fn format_summary(summary: &ProfileSummary) -> Vec<String> {
    vec![
        format!(
            "{} total samples {:?}",
            summary.total_samples, summary.total_time
        ),
        format!("{} distinct stacks", summary.distinct_stacks),
        format!("{} max samples {:?}", summary.max_samples, summary.max_time),
    ]
}

/// Heading printed above each reported stack
pub fn format_stack_heading(rank: usize, stack: &StackRecord, total_samples: u64) -> String {
    let percentage = if total_samples > 0 {
        (stack.count as f64 / total_samples as f64) * 100.0
    } else {
        0.0
    };
    format!(
        "#{} {} samples ({:.1}%), {} frames",
        rank,
        stack.count,
        percentage,
        stack.pcs.len()
    )
}
