// THEORY:
// The `summarizer` module is the aggregation layer of the engine. It consumes
// the flat sample buffers produced by `sampler`, runs every byte through the
// read path of `channel_codec`, and collapses the result into a `MapSummary`:
// one total, sixteen group buckets, and a locked/unlocked split. The summary
// is the single data structure hosts display to users, so its shape is rigid:
// all sixteen buckets are always present, even for an empty document.
//
// Key architectural principles:
// 1.  **Graceful absence**: A document with no metadata layers is a normal
//     state, not an error. No group map means a fully zeroed summary; no lock
//     map means the lock counters stay at zero while the total still reflects
//     the group channel.
// 2.  **Fail fast on shape bugs**: When both maps are present they must cover
//     the same pixels. A length mismatch is always a host-side sampling bug,
//     and silently truncating would undercount locked pixels with no signal,
//     so the summarizer refuses with a typed error instead.
// 3.  **Rigid output shape**: Consumers index buckets 0 through 15 directly
//     for display. The bucket array never shrinks, reorders, or omits.

use crate::core_modules::channel_codec::channel_codec::{self, GROUP_COUNT};
use crate::core_modules::sampler::sampler::SampleBuffer;
use serde::Serialize;
use std::fmt::Write;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error(
        "group map holds {group_len} samples but lock map holds {lock_len}; both maps must cover the same pixels"
    )]
    LengthMismatch { group_len: usize, lock_len: usize },
}

/// Aggregate usage statistics for one document's metadata maps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapSummary {
    /// Number of pixels inspected in the group map.
    pub total_pixels: u64,
    /// Pixel tally per group ID; index `i` counts pixels decoded into
    /// group `i`. Always sixteen entries.
    pub group_counts: [u64; GROUP_COUNT],
    /// Pixels whose lock byte decoded as locked.
    pub locked_pixels: u64,
    /// Pixels whose lock byte decoded as unlocked.
    pub unlocked_pixels: u64,
}

impl MapSummary {
    /// The summary for a document with no metadata captured yet.
    pub fn empty() -> Self {
        Self {
            total_pixels: 0,
            group_counts: [0; GROUP_COUNT],
            locked_pixels: 0,
            unlocked_pixels: 0,
        }
    }

    /// Renders the host-facing preview block: total, lock split, and the
    /// full sixteen-entry group mapping.
    pub fn render_report(&self) -> String {
        let mut report = String::new();
        let _ = writeln!(report, "GRIN Preview:");
        let _ = writeln!(report, "Total Pixels: {}", self.total_pixels);
        let _ = writeln!(report, "Locked Pixels: {}", self.locked_pixels);
        let _ = writeln!(report, "Unlocked Pixels: {}", self.unlocked_pixels);
        let buckets = self
            .group_counts
            .iter()
            .enumerate()
            .map(|(group_id, count)| format!("{}: {}", group_id, count))
            .collect::<Vec<_>>()
            .join(", ");
        let _ = write!(report, "Group Counts: {{{}}}", buckets);
        report
    }
}

/// Aggregates group and lock sample buffers into a `MapSummary`.
///
/// The group buffer drives the totals; without it the summary is fully
/// zeroed even when a lock buffer exists, because there is no pixel universe
/// to count against. Lock counters only move when a lock buffer is supplied,
/// and it must then match the group buffer sample for sample.
pub fn summarize_maps(
    group_samples: Option<&SampleBuffer>,
    lock_samples: Option<&SampleBuffer>,
) -> Result<MapSummary, SummaryError> {
    let mut summary = MapSummary::empty();

    let Some(group_samples) = group_samples else {
        return Ok(summary);
    };

    if let Some(lock_samples) = lock_samples {
        if lock_samples.len() != group_samples.len() {
            return Err(SummaryError::LengthMismatch {
                group_len: group_samples.len(),
                lock_len: lock_samples.len(),
            });
        }
    }

    summary.total_pixels = group_samples.len() as u64;
    for &value in group_samples {
        let group_id = channel_codec::decode_group(value);
        summary.group_counts[group_id as usize] += 1;
    }

    if let Some(lock_samples) = lock_samples {
        for &value in lock_samples {
            if channel_codec::decode_lock(value) {
                summary.locked_pixels += 1;
            } else {
                summary.unlocked_pixels += 1;
            }
        }
    }

    Ok(summary)
}
