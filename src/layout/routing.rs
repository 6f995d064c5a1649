//! Connector paths and arrowheads.

use super::types::{Arrowhead, LayoutTable, Point};

/// Orthogonal path between two edge points.
///
/// Bends at the horizontal midpoint when the endpoints are further apart
/// horizontally than vertically, otherwise at the vertical midpoint.
pub fn route_between(from: Point, to: Point) -> Vec<Point> {
    if (from.x - to.x).abs() > (from.y - to.y).abs() {
        let mid_x = (from.x + to.x) / 2.0;
        vec![
            from,
            Point::new(mid_x, from.y),
            Point::new(mid_x, to.y),
            to,
        ]
    } else {
        let mid_y = (from.y + to.y) / 2.0;
        vec![
            from,
            Point::new(from.x, mid_y),
            Point::new(to.x, mid_y),
            to,
        ]
    }
}

/// Generate waypoints for a self-referential relationship.
///
/// Leaves the right edge in the upper part of the body and re-enters it
/// lower down.
pub fn route_self_ref(table: &LayoutTable, loop_offset: f64) -> Vec<Point> {
    let x = table.right();
    let y_top = table.y - table.height * 0.3;
    let y_bottom = table.y - table.height * 0.7;

    vec![
        Point::new(x, y_top),
        Point::new(x + loop_offset, y_top),
        Point::new(x + loop_offset, y_bottom),
        Point::new(x, y_bottom),
    ]
}

/// Arrowhead at the last waypoint, aligned with the last segment that has
/// non-zero length.
pub fn arrowhead(waypoints: &[Point]) -> Arrowhead {
    let tip = waypoints[waypoints.len() - 1];
    let angle = waypoints
        .iter()
        .rev()
        .skip(1)
        .find(|p| p.x != tip.x || p.y != tip.y)
        .map(|p| (tip.y - p.y).atan2(tip.x - p.x))
        // Degenerate path: point down onto the table below
        .unwrap_or(-std::f64::consts::FRAC_PI_2);

    Arrowhead { tip, angle }
}
