//! Touch-trace replay.
//!
//! Drives the full pointer → zone → frame pipeline from a recorded
//! trace, so the bridge can be exercised end to end without a
//! touchscreen. Trace format, one event per line:
//!
//! ```text
//! # comment
//! <ms> <pointer> down <x> <y>
//! <ms> <pointer> move <x> <y>
//! <ms> <pointer> up
//! ```
//!
//! Timestamps are milliseconds from trace start and must be
//! non-decreasing; replay sleeps out the gaps to reproduce the
//! original pacing.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use airslide_core::{
    BridgeError, ControlPort, ControllerSnapshot, PointerSample, air_zones, slide_zones,
};
use tracing::info;

use crate::config::BridgeConfig;

// ── Trace parsing ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TracePhase {
    Down,
    Move,
    Up,
}

/// One parsed trace line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceEvent {
    pub ms: u64,
    pub pointer: i32,
    pub phase: TracePhase,
    pub x: f32,
    pub y: f32,
}

/// Parse a single line. Blank lines and `#` comments yield `None`.
pub fn parse_line(line: &str) -> Result<Option<TraceEvent>, BridgeError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut fields = line.split_whitespace();
    let ms = fields
        .next()
        .and_then(|f| f.parse().ok())
        .ok_or_else(|| BridgeError::Other(format!("bad timestamp: {line}")))?;
    let pointer = fields
        .next()
        .and_then(|f| f.parse().ok())
        .ok_or_else(|| BridgeError::Other(format!("bad pointer id: {line}")))?;
    let phase = match fields.next() {
        Some("down") => TracePhase::Down,
        Some("move") => TracePhase::Move,
        Some("up") => TracePhase::Up,
        _ => return Err(BridgeError::Other(format!("bad phase: {line}"))),
    };

    let (x, y) = if phase == TracePhase::Up {
        (0.0, 0.0)
    } else {
        let x = fields
            .next()
            .and_then(|f| f.parse().ok())
            .ok_or_else(|| BridgeError::Other(format!("bad x: {line}")))?;
        let y = fields
            .next()
            .and_then(|f| f.parse().ok())
            .ok_or_else(|| BridgeError::Other(format!("bad y: {line}")))?;
        (x, y)
    };

    Ok(Some(TraceEvent {
        ms,
        pointer,
        phase,
        x,
        y,
    }))
}

/// Parse a whole trace, reporting the offending line on failure.
pub fn parse_trace(text: &str) -> Result<Vec<TraceEvent>, BridgeError> {
    let mut events = Vec::new();
    for (number, line) in text.lines().enumerate() {
        let parsed = parse_line(line)
            .map_err(|e| BridgeError::Other(format!("line {}: {e}", number + 1)))?;
        if let Some(event) = parsed {
            events.push(event);
        }
    }
    Ok(events)
}

/// Load and parse a trace file.
pub fn load_trace(path: &Path) -> Result<Vec<TraceEvent>, BridgeError> {
    parse_trace(&std::fs::read_to_string(path)?)
}

// ── Replay ───────────────────────────────────────────────────────

/// What a replay did, for the operator's summary line.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReplayStats {
    pub events: usize,
    pub snapshots: usize,
}

/// Feed a trace through the control port, recomputing zone activations
/// after every event the way the input layer would.
pub async fn run_trace(
    events: &[TraceEvent],
    config: &BridgeConfig,
    control: &impl ControlPort,
) -> Result<ReplayStats, BridgeError> {
    let sensitivity = config.sensitivity();
    let air_height = config.air_height();
    let slide_height = config.slide_height();
    let air_output = config.air_output()?;

    let mut active: BTreeMap<i32, (f32, f32)> = BTreeMap::new();
    let mut stats = ReplayStats::default();
    let mut clock_ms = 0u64;

    for event in events {
        if event.ms > clock_ms {
            tokio::time::sleep(Duration::from_millis(event.ms - clock_ms)).await;
            clock_ms = event.ms;
        }

        match event.phase {
            TracePhase::Down => {
                active.insert(event.pointer, (event.x, event.y));
                control.touch_down(event.pointer, event.y)?;
            }
            TracePhase::Move => {
                active.insert(event.pointer, (event.x, event.y));
                control.touch_move(event.pointer, event.y)?;
            }
            TracePhase::Up => {
                active.remove(&event.pointer);
                control.touch_up(event.pointer)?;
            }
        }
        stats.events += 1;

        let pointers: Vec<PointerSample> = active
            .iter()
            .map(|(&id, &(x, y))| PointerSample::new(id, x, y))
            .collect();

        let air = air_zones(&pointers, air_height, sensitivity.air_multiplier);
        let slide = slide_zones(
            &pointers,
            config.surface.width,
            air_height,
            slide_height,
            sensitivity.slide_multiplier,
        );

        control.update_state(ControllerSnapshot {
            air,
            slide,
            air_output,
            ..Default::default()
        })?;
        stats.snapshots += 1;
    }

    info!("replayed {} events", stats.events);
    Ok(stats)
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use airslide_core::FakeControl;

    #[test]
    fn parse_line_variants() {
        assert_eq!(parse_line("").unwrap(), None);
        assert_eq!(parse_line("# header").unwrap(), None);

        let event = parse_line("120 0 down 640.5 100").unwrap().unwrap();
        assert_eq!(event.ms, 120);
        assert_eq!(event.pointer, 0);
        assert_eq!(event.phase, TracePhase::Down);
        assert_eq!(event.x, 640.5);

        let event = parse_line("500 3 up").unwrap().unwrap();
        assert_eq!(event.phase, TracePhase::Up);
    }

    #[test]
    fn parse_line_rejects_garbage() {
        assert!(parse_line("abc 0 down 1 2").is_err());
        assert!(parse_line("10 0 hover 1 2").is_err());
        assert!(parse_line("10 0 down 1").is_err());
    }

    #[test]
    fn parse_trace_reports_line_numbers() {
        let err = parse_trace("0 0 down 1 2\nnot a line\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[tokio::test]
    async fn replay_feeds_zones_through_the_port() {
        // Default surface: 1280x800, split 0.5 → air 0..400, slide 400..800.
        let trace = "\
# one finger into the air region, one onto the strip
0 0 down 100 50
0 1 down 20 600
0 1 up
";
        let events = parse_trace(trace).unwrap();
        let config = BridgeConfig::default();
        let fake = FakeControl::new();

        let stats = run_trace(&events, &config, &fake).await.unwrap();
        assert_eq!(stats.events, 3);
        assert_eq!(stats.snapshots, 3);

        fake.with_log(|log| {
            assert_eq!(log.touches, vec![("down", 0), ("down", 1), ("up", 1)]);

            // After the second event both pointers are live: the air
            // finger near the top of a 400 px region is zone 6, the
            // strip finger at x=20 is slide zone 1.
            let mid = &log.snapshots[1];
            assert_eq!(mid.air.iter().collect::<Vec<_>>(), vec![6]);
            assert_eq!(mid.slide.iter().collect::<Vec<_>>(), vec![1]);

            // After the lift only the air finger remains.
            let last = &log.snapshots[2];
            assert!(last.slide.is_empty());
        });
    }

    #[tokio::test]
    async fn replay_rejects_bad_air_mode() {
        let mut config = BridgeConfig::default();
        config.controller.air_mode = "sideways".into();
        let events = parse_trace("0 0 down 1 2\n").unwrap();
        assert!(run_trace(&events, &config, &FakeControl::new()).await.is_err());
    }
}
