//! Vertical air-zone activation.
//!
//! The air region emulates a bar of 6 stacked proximity sensors. Zone 1
//! sits at the bottom of the region, zone 6 at the top; a pointer's
//! height selects the base zone, and near a boundary the pairing band
//! additionally activates the adjacent zone.

use super::{EDGE_SLACK, PointerSample, ZoneSet, activate_banded};

/// Number of discrete air zones.
pub const AIR_ZONE_COUNT: u32 = 6;

/// Compute the activated air zones for all simultaneous pointers.
///
/// `region_height` is the pixel height of the air sub-region;
/// `multiplier` scales the pairing band (0.0 disables pairing, 0.5
/// widens it to half a zone). Degenerate geometry yields an empty set.
pub fn air_zones(pointers: &[PointerSample], region_height: f32, multiplier: f32) -> ZoneSet {
    let mut activated = ZoneSet::new();
    if region_height <= 0.0 {
        return activated;
    }
    for pointer in pointers {
        activated.union(pointer_air_zones(pointer.y, region_height, multiplier));
    }
    activated
}

/// Zones activated by a single pointer at vertical offset `y` from the
/// top of the air region.
fn pointer_air_zones(y: f32, region_height: f32, multiplier: f32) -> ZoneSet {
    let mut activated = ZoneSet::new();

    // Zone boundary 0 is the bottom of the surface.
    let from_bottom = region_height - y;
    if from_bottom < -EDGE_SLACK || from_bottom > region_height + EDGE_SLACK {
        return activated;
    }

    activate_banded(from_bottom, region_height, AIR_ZONE_COUNT, multiplier, &mut activated);
    activated
}

// ── Tests ────────────────────────────────────────────────────────
