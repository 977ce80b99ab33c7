//! Flick-gesture air output.
//!
//! In [`AirOutput::Flick`](crate::frame::AirOutput) mode the air byte
//! is not a zone bitmask: instead, vertical pointer drift is integrated
//! per pointer, and once the accumulated drift crosses a threshold the
//! detector emits a two-stage sweep across the sensor bits — emulating
//! a hand passing through the proximity sensors.
//!
//! The detector is sampled at a fixed cadence ([`SAMPLE_INTERVAL`]) by
//! the engine worker; each sample advances active sweeps by one step
//! and integrates fresh movement on idle lanes. Accumulated drift
//! decays continuously so slow repositioning never triggers a sweep.

use std::time::Duration;

/// Cadence at which the engine samples the detector.
pub const SAMPLE_INTERVAL: Duration = Duration::from_micros(1600);

/// Accumulated-drift decay, in pixels per stage worth of samples.
const DRAIN_SPEED: f32 = 120.0;

/// Drift (px) that triggers a sweep.
const FLICK_THRESHOLD: f32 = 60.0;

/// Samples per sweep stage; a sweep is two stages.
const STAGE_SAMPLES: i32 = 625;
const TOTAL_SAMPLES: i32 = STAGE_SAMPLES * 2;

/// Simultaneously tracked pointers.
const LANES: usize = 10;

const FREE: i32 = -1;
/// Pointer lifted mid-sweep; the sweep finishes before the lane frees.
const FINISHING: i32 = -2;

// ── FlickLane ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct FlickLane {
    pointer: i32,
    drift: f32,
    last_y: f32,
    samples_left: i32,
    drift_down: bool,
}

impl FlickLane {
    const fn idle() -> Self {
        Self {
            pointer: FREE,
            drift: 0.0,
            last_y: 0.0,
            samples_left: 0,
            drift_down: false,
        }
    }
}

// ── FlickDetector ────────────────────────────────────────────────

/// Per-pointer flick accumulator. One instance lives on the engine
/// worker; no interior locking needed.
#[derive(Debug)]
pub struct FlickDetector {
    lanes: [FlickLane; LANES],
    live_y: [f32; LANES],
}

impl Default for FlickDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl FlickDetector {
    pub fn new() -> Self {
        Self {
            lanes: [FlickLane::idle(); LANES],
            live_y: [0.0; LANES],
        }
    }

    /// A pointer touched down at vertical position `y`.
    pub fn touch_down(&mut self, pointer: i32, y: f32) {
        if self.lanes.iter().any(|l| l.pointer == pointer) {
            return;
        }
        if let Some(lane) = self.lanes.iter_mut().find(|l| l.pointer == FREE) {
            lane.pointer = pointer;
            lane.drift = 0.0;
            lane.last_y = y;
            lane.samples_left = 0;
        }
        if (0..LANES as i32).contains(&pointer) {
            self.live_y[pointer as usize] = y;
        }
    }

    /// A tracked pointer moved to vertical position `y`.
    pub fn touch_move(&mut self, pointer: i32, y: f32) {
        if !(0..LANES as i32).contains(&pointer) {
            return;
        }
        if self.lanes.iter().any(|l| l.pointer == pointer) {
            self.live_y[pointer as usize] = y;
        }
    }

    /// A pointer lifted. A sweep in progress finishes on its own.
    pub fn touch_up(&mut self, pointer: i32) {
        if let Some(lane) = self.lanes.iter_mut().find(|l| l.pointer == pointer) {
            if lane.samples_left > 0 {
                lane.pointer = FINISHING;
            } else {
                lane.pointer = FREE;
                lane.drift = 0.0;
            }
        }
    }

    /// Advance one sample tick and return the current air byte.
    pub fn sample(&mut self) -> u8 {
        let mut byte = 0u8;

        for lane in &mut self.lanes {
            if lane.samples_left > 0 {
                let stage = (TOTAL_SAMPLES - lane.samples_left) / STAGE_SAMPLES;
                let bit = if lane.drift_down {
                    if stage == 0 { 2 } else { 3 }
                } else if stage == 0 {
                    5
                } else {
                    4
                };
                byte |= 1 << (bit - 1);

                lane.samples_left -= 1;
                if lane.samples_left == 0 && lane.pointer == FINISHING {
                    lane.pointer = FREE;
                    lane.drift = 0.0;
                }
                continue;
            }

            if lane.pointer >= 0 {
                let current = self
                    .live_y
                    .get(lane.pointer as usize)
                    .copied()
                    .unwrap_or(lane.last_y);
                let dy = current - lane.last_y;
                lane.last_y = current;
                lane.drift += dy;

                let drain = DRAIN_SPEED / STAGE_SAMPLES as f32;
                if lane.drift > 0.0 {
                    lane.drift = (lane.drift - drain).max(0.0);
                } else if lane.drift < 0.0 {
                    lane.drift = (lane.drift + drain).min(0.0);
                }

                if lane.drift >= FLICK_THRESHOLD {
                    lane.samples_left = TOTAL_SAMPLES;
                    lane.drift_down = true;
                    lane.drift = 0.0;
                } else if lane.drift <= -FLICK_THRESHOLD {
                    lane.samples_left = TOTAL_SAMPLES;
                    lane.drift_down = false;
                    lane.drift = 0.0;
                }
            }
        }

        byte
    }
}

// ── Tests ────────────────────────────────────────────────────────
