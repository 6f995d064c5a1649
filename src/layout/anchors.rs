//! Connection points on table edges.

use super::types::{LayoutTable, Point};

/// Point on `table`'s outline facing `target`.
///
/// Picks one of the four edge midpoints by the dominant axis between the
/// table center and the target; ties go to the top/bottom edge.
pub fn edge_point(table: &LayoutTable, target: Point) -> Point {
    let center = table.center();
    let dx = target.x - center.x;
    let dy = target.y - center.y;

    if dx.abs() > dy.abs() {
        if dx > 0.0 {
            Point::new(table.right(), center.y)
        } else {
            Point::new(table.x, center.y)
        }
    } else if dy > 0.0 {
        Point::new(center.x, table.y)
    } else {
        Point::new(center.x, table.bottom())
    }
}
