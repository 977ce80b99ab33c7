//! Horizontal slide-zone activation.
//!
//! The slide region emulates the 32-sensor touch strip along the lower
//! part of the playfield. Zone 1 is leftmost. The banding math is the
//! air algorithm rotated onto the horizontal axis: half-open intervals,
//! 1-based IDs, a pairing band clamped to half a zone width, and a
//! union over simultaneous pointers. A pointer only participates while
//! its vertical position lies inside the slide sub-region (with the
//! same edge slack as the air axis).

use super::{EDGE_SLACK, PointerSample, ZoneSet, activate_banded};

/// Number of discrete slide zones.
pub const SLIDE_ZONE_COUNT: u32 = 32;

/// Compute the activated slide zones for all simultaneous pointers.
///
/// The slide sub-region spans `air_height..air_height + slide_height`
/// vertically and the full `region_width` horizontally. Degenerate
/// geometry yields an empty set.
pub fn slide_zones(
    pointers: &[PointerSample],
    region_width: f32,
    air_height: f32,
    slide_height: f32,
    multiplier: f32,
) -> ZoneSet {
    let mut activated = ZoneSet::new();
    if region_width <= 0.0 || slide_height <= 0.0 {
        return activated;
    }
    for pointer in pointers {
        activated.union(pointer_slide_zones(
            pointer.x,
            pointer.y,
            region_width,
            air_height,
            slide_height,
            multiplier,
        ));
    }
    activated
}

fn pointer_slide_zones(
    x: f32,
    y: f32,
    region_width: f32,
    air_height: f32,
    slide_height: f32,
    multiplier: f32,
) -> ZoneSet {
    let mut activated = ZoneSet::new();

    // Vertical gate: the pointer must rest on the strip itself.
    if y < air_height - EDGE_SLACK || y > air_height + slide_height + EDGE_SLACK {
        return activated;
    }
    if x < -EDGE_SLACK || x > region_width + EDGE_SLACK {
        return activated;
    }

    activate_banded(x, region_width, SLIDE_ZONE_COUNT, multiplier, &mut activated);
    activated
}

// ── Tests ────────────────────────────────────────────────────────
