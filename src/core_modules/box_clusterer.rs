// THEORY:
// The `BoxClusterer` is the engine of the detection core. Contour extraction on
// a noisy foreground mask produces several overlapping or fragmented rectangles
// for every physical object; the clusterer collapses them into one box per
// object and drops whatever is too small to be anything but noise.
//
// Key architectural principles & algorithm steps:
// 1.  **Fixed-Point Merging**: Any two boxes whose `distance` is below the merge
//     threshold are replaced by their enclosing box. This repeats until no such
//     pair is left. Because merged boxes only ever grow, and growing a box can
//     only shrink its distance to others, the final set does not depend on the
//     order in which pairs are discovered.
// 2.  **Settled Worklist**: Instead of rescanning every pair after each merge,
//     the clusterer keeps a list of boxes that are already pairwise apart. A new
//     box absorbs every settled box it is close to (re-checking after each
//     absorption, since it grew), then joins the list. Only the new box can form
//     a fresh pair, so one pass over the candidates reaches the fixed point.
// 3.  **Size Filtering**: After merging, boxes narrower or shorter than
//     `min_size` are discarded. Filtering after merging lets small fragments
//     of one object combine into a box that survives.
// 4.  **Stateless Utility**: The clusterer holds only its immutable
//     configuration. `detect` works on its own copy of the candidates, so a
//     single instance can be shared across threads and camera streams.

use crate::core_modules::bounding_box::BoundingBox;
use crate::error::{Error, Result};
use tracing::{debug, trace, warn};

/// Configuration for a `BoxClusterer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClustererConfig {
    /// Boxes closer than this (see `BoundingBox::distance`) are merged.
    pub merge_distance: i32,
    /// Boxes whose width or height is below this are dropped after merging.
    pub min_size: i32,
}

impl Default for ClustererConfig {
    fn default() -> Self {
        Self {
            merge_distance: 30,
            min_size: 100,
        }
    }
}

/// Merges proximate candidate boxes and filters out small ones.
#[derive(Debug, Clone)]
pub struct BoxClusterer {
    merge_distance: i32,
    min_size: i32,
}

impl BoxClusterer {
    /// Creates a clusterer. Both parameters are in pixels and must not be negative.
    pub fn new(merge_distance: i32, min_size: i32) -> Result<Self> {
        if merge_distance < 0 {
            return Err(Error::InvalidArgument(format!(
                "merge distance must not be negative, got {merge_distance}"
            )));
        }
        if min_size < 0 {
            return Err(Error::InvalidArgument(format!(
                "minimum box size must not be negative, got {min_size}"
            )));
        }
        if merge_distance == 0 {
            warn!("merge distance is 0: only strictly overlapping boxes will be merged");
        }
        Ok(Self {
            merge_distance,
            min_size,
        })
    }

    pub fn from_config(config: ClustererConfig) -> Result<Self> {
        Self::new(config.merge_distance, config.min_size)
    }

    pub fn merge_distance(&self) -> i32 {
        self.merge_distance
    }

    pub fn min_size(&self) -> i32 {
        self.min_size
    }

    /// Turns one frame's raw candidate rectangles into the final object boxes.
    ///
    /// The result has no pair of boxes closer than the merge distance and no box
    /// narrower or shorter than the minimum size. Its contents depend only on the
    /// geometry of the candidates; the order of the returned boxes does not
    /// carry meaning.
    ///
    /// Every candidate must satisfy `x1 <= x2` and `y1 <= y2`. Boxes built with
    /// `BoundingBox::new` always do; corners are not re-normalized here.
    pub fn detect<I>(&self, candidates: I) -> Vec<BoundingBox>
    where
        I: IntoIterator<Item = BoundingBox>,
    {
        let merged = self.merge_boxes(candidates);
        let merged_count = merged.len();

        let boxes: Vec<BoundingBox> = merged
            .into_iter()
            .filter(|b| {
                b.width() >= i64::from(self.min_size) && b.height() >= i64::from(self.min_size)
            })
            .collect();

        debug!(
            merged = merged_count,
            kept = boxes.len(),
            min_size = self.min_size,
            "filtered merged boxes by size"
        );
        boxes
    }

    /// Runs the merge step alone, without size filtering.
    pub fn merge_boxes<I>(&self, candidates: I) -> Vec<BoundingBox>
    where
        I: IntoIterator<Item = BoundingBox>,
    {
        let candidates = candidates.into_iter();
        let mut settled: Vec<BoundingBox> = Vec::with_capacity(candidates.size_hint().0);
        let mut candidate_count = 0usize;
        let mut merge_count = 0usize;

        for candidate in candidates {
            debug_assert!(
                candidate.x1 <= candidate.x2 && candidate.y1 <= candidate.y2,
                "candidate box has inverted corners: {candidate:?}"
            );
            candidate_count += 1;

            let mut current = candidate;
            while let Some(pos) = settled
                .iter()
                .position(|other| current.distance(other) < i64::from(self.merge_distance))
            {
                let other = settled.swap_remove(pos);
                let grown = current.merge(&other);
                trace!(?current, ?other, ?grown, "merged boxes");
                current = grown;
                merge_count += 1;
            }
            settled.push(current);
        }

        debug!(
            candidates = candidate_count,
            merges = merge_count,
            merged = settled.len(),
            merge_distance = self.merge_distance,
            "merged candidate boxes"
        );
        settled
    }
}
