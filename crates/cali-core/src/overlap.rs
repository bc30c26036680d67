use tracing::debug;

use crate::event::ClippedEvent;

/// Per-event lane result. `lane` is the collision-avoiding slot index;
/// `concurrency` counts the other events in the batch this one was
/// found to intersect. A lone event keeps `0`/`0` and renders full
/// width.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LaneAssignment {
    pub lane: u32,
    pub concurrency: u32,
}

/// Interval intersection, inclusive on both ends.
pub fn overlaps(a: &ClippedEvent, b: &ClippedEvent) -> bool {
    a.start <= b.end && a.end >= b.start
}

/// Assigns lanes over a batch already in store sort order (start
/// ascending, longer-first ties). Each event bumps every overlapping
/// successor one lane past its own, producing a staircase rather than
/// minimal-width packing. The inner scan stops at the first successor
/// that does not overlap: overlap runs are assumed contiguous once
/// sorted by start, so a later event past a gap is never re-examined.
///
/// Returns one assignment per input event plus the batch maximum of
/// all lane and concurrency values, which callers use to divide lane
/// width as `1 / (1 + max_lane)`.
#[tracing::instrument(skip(events), fields(count = events.len()))]
pub fn assign_lanes(events: &[ClippedEvent]) -> (Vec<LaneAssignment>, u32) {
    let mut lanes = vec![LaneAssignment::default(); events.len()];
    let mut max_lane = 0u32;

    for i in 0..events.len() {
        for j in (i + 1)..events.len() {
            if !overlaps(&events[i], &events[j]) {
                break;
            }

            lanes[i].concurrency += 1;
            lanes[j].concurrency += 1;
            lanes[j].lane = lanes[i].lane + 1;

            max_lane = max_lane
                .max(lanes[j].lane)
                .max(lanes[i].concurrency)
                .max(lanes[j].concurrency);
        }
    }

    debug!(max_lane, "assigned lanes");
    (lanes, max_lane)
}
