//! Process correlation
//!
//! Prefetch, UserAssist, shell items, 4688 and Sysmon 1 can each describe
//! the same execution. Two process records are merged when their filenames
//! match ignoring case, their timestamps are within a tolerance and they do
//! not name different computers. A record without a computer matches any host.
//! The earlier record (by position) absorbs every later match.

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::collection::Collection;
use crate::entity::Process;

/// Correlate the last `window` processes with `tolerance` (µs)
///
/// Returns the number of records absorbed.
pub fn merge_recent(processes: &mut Collection<Process>, window: usize, tolerance: i64) -> usize {
    let items = processes.items_mut();
    let start = items.len().saturating_sub(window);
    merge_from(items, start, tolerance)
}

/// Correlate the whole collection with `tolerance` (µs)
pub fn merge_all(processes: &mut Collection<Process>, tolerance: i64) -> usize {
    merge_from(processes.items_mut(), 0, tolerance)
}

fn mergeable(a: &Process, b: &Process, tolerance: i64) -> bool {
    let same_host = a.computer.is_empty()
        || b.computer.is_empty()
        || a.computer.eq_ignore_ascii_case(&b.computer);
    same_host && a.timestamp.abs_diff(b.timestamp) <= tolerance.unsigned_abs()
}

fn merge_from(items: &mut Vec<Process>, start: usize, tolerance: i64) -> usize {
    let mut by_name: FxHashMap<String, Vec<usize>> = FxHashMap::default();
    for (idx, process) in items.iter().enumerate().skip(start) {
        by_name
            .entry(process.filename.to_lowercase())
            .or_default()
            .push(idx);
    }

    let mut removed = vec![false; items.len()];
    let mut absorbed = 0;

    for i in start..items.len() {
        if removed[i] {
            continue;
        }
        let Some(bucket) = by_name.get(&items[i].filename.to_lowercase()) else {
            continue;
        };
        for &j in bucket.iter().filter(|&&j| j > i) {
            if removed[j] || !mergeable(&items[i], &items[j], tolerance) {
                continue;
            }
            let other = std::mem::take(&mut items[j]);
            items[i].absorb(other);
            removed[j] = true;
            absorbed += 1;
        }
    }

    if absorbed > 0 {
        let mut idx = 0;
        items.retain(|_| {
            let keep = !removed[idx];
            idx += 1;
            keep
        });
        debug!("Correlated {} process records ({} remain)", absorbed, items.len());
    }
    absorbed
}
