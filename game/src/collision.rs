//! Swept-circle collision detection between moving gatherers and static items.
//!
//! Each gatherer sweeps a disk of its width along the segment from `start`
//! to `end` during one tick. An item is crossed when the segment passes
//! within the combined widths of the pair; the crossing is reported at the
//! parameter of closest approach, and events are returned in ascending
//! time order so the caller can apply them first-come, first-served.

use crate::geometry::Vec2;

/// A circle moving along a straight segment during one tick.
#[derive(Debug, Clone, Copy)]
pub struct Gatherer {
    pub start: Vec2,
    pub end: Vec2,
    pub width: f64,
}

/// A static circle that can be crossed by a gatherer.
#[derive(Debug, Clone, Copy)]
pub struct Item {
    pub position: Vec2,
    pub width: f64,
}

/// One gatherer/item crossing, at the motion parameter of closest approach.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GatheringEvent {
    pub item_id: usize,
    pub gatherer_id: usize,
    pub sq_distance: f64,
    pub time: f64,
}

/// Squared distance from the motion line and projection parameter of a
/// point `c` onto the segment `a -> b`. Callers must not pass `a == b`.
fn project_point(a: Vec2, b: Vec2, c: Vec2) -> (f64, f64) {
    let u_x = c.x - a.x;
    let u_y = c.y - a.y;
    let v_x = b.x - a.x;
    let v_y = b.y - a.y;
    let u_dot_v = u_x * v_x + u_y * v_y;
    let u_len2 = u_x * u_x + u_y * u_y;
    let v_len2 = v_x * v_x + v_y * v_y;
    let proj_ratio = u_dot_v / v_len2;
    let sq_distance = u_len2 - (u_dot_v * u_dot_v) / v_len2;
    (sq_distance, proj_ratio)
}

/// Finds every gatherer/item crossing for this tick, sorted by time.
///
/// Stationary gatherers produce no events. Ties on `time` keep the original
/// pair order (gatherer-major, item-minor) because the sort is stable.
pub fn find_gather_events(gatherers: &[Gatherer], items: &[Item]) -> Vec<GatheringEvent> {
    let mut events = Vec::new();

    for (gatherer_id, gatherer) in gatherers.iter().enumerate() {
        if gatherer.start == gatherer.end {
            continue;
        }

        for (item_id, item) in items.iter().enumerate() {
            let (sq_distance, time) = project_point(gatherer.start, gatherer.end, item.position);
            let reach = gatherer.width + item.width;

            if time > 0.0 && time <= 1.0 && sq_distance <= reach * reach {
                events.push(GatheringEvent {
                    item_id,
                    gatherer_id,
                    sq_distance,
                    time,
                });
            }
        }
    }

    events.sort_by(|a, b| a.time.total_cmp(&b.time));
    events
}
