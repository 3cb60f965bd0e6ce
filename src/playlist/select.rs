//! Variant stream selection for master playlists.

use std::sync::Arc;

use crate::config::VariantPolicy;
use crate::playlist::types::VariantStream;

/// Picks one of the offered variants by index. Never called with an empty slice.
pub type VariantSelector = Arc<dyn Fn(&[VariantStream]) -> usize + Send + Sync>;

/// Index of the variant with the largest `width x height`; the first one wins ties.
pub fn largest_resolution(variants: &[VariantStream]) -> usize {
    best_by(variants, |current, best| {
        current.resolution.area() > best.resolution.area()
    })
}

/// Index of the variant with the highest bandwidth; the first one wins ties.
pub fn highest_bandwidth(variants: &[VariantStream]) -> usize {
    best_by(variants, |current, best| current.bandwidth > best.bandwidth)
}

/// Index of the variant with the lowest bandwidth; the first one wins ties.
pub fn lowest_bandwidth(variants: &[VariantStream]) -> usize {
    best_by(variants, |current, best| current.bandwidth < best.bandwidth)
}

fn best_by(
    variants: &[VariantStream],
    better: impl Fn(&VariantStream, &VariantStream) -> bool,
) -> usize {
    let mut best = 0;
    for (i, variant) in variants.iter().enumerate().skip(1) {
        if better(variant, &variants[best]) {
            best = i;
        }
    }
    best
}

/// Build the selector for a configured policy.
pub fn selector_for(policy: VariantPolicy) -> VariantSelector {
    match policy {
        VariantPolicy::LargestResolution => Arc::new(largest_resolution),
        VariantPolicy::HighestBandwidth => Arc::new(highest_bandwidth),
        VariantPolicy::LowestBandwidth => Arc::new(lowest_bandwidth),
    }
}
