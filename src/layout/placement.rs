//! Table sizing and grid placement.

use crate::ir::GraphIR;
use crate::measure::TextMetrics;
use crate::theme::RowFill;
use std::collections::HashMap;

use super::types::{LayoutRow, LayoutTable, Point};

/// Hand-balanced corners used for small diagrams.
pub const CORNER_POSITIONS: [Point; 4] = [
    Point::new(15.0, 75.0),
    Point::new(75.0, 75.0),
    Point::new(15.0, 25.0),
    Point::new(75.0, 25.0),
];

const GRID_LEFT: f64 = 10.0;
const GRID_TOP: f64 = 85.0;
const GRID_WIDTH: f64 = 80.0;
const GRID_HEIGHT: f64 = 70.0;

/// Columns of the near-square grid used for more than four tables.
pub fn grid_columns(table_count: usize) -> usize {
    (table_count as f64).sqrt().ceil() as usize
}

/// Top-left header positions for `table_count` tables, in iteration order.
///
/// Cell spacing does not account for actual table widths, so wide tables in
/// a dense grid can overlap their neighbours.
pub fn place(table_count: usize) -> Vec<Point> {
    if table_count <= CORNER_POSITIONS.len() {
        return CORNER_POSITIONS[..table_count].to_vec();
    }

    let cols = grid_columns(table_count);
    let rows = table_count.div_ceil(cols);
    let x_spacing = GRID_WIDTH / cols as f64;
    let y_spacing = GRID_HEIGHT / rows as f64;

    (0..table_count)
        .map(|i| {
            let row = i / cols;
            let col = i % cols;
            Point::new(
                GRID_LEFT + col as f64 * x_spacing,
                GRID_TOP - row as f64 * y_spacing,
            )
        })
        .collect()
}

/// Calculate table sizes from their labels.
pub fn calculate_table_sizes(ir: &GraphIR, metrics: &TextMetrics) -> Vec<(f64, f64)> {
    ir.tables
        .iter()
        .map(|t| metrics.table_size(&t.name, &t.columns))
        .collect()
}

/// Position every table and lay out its rows.
pub fn place_tables(
    ir: &GraphIR,
    sizes: &[(f64, f64)],
    metrics: &TextMetrics,
) -> Vec<LayoutTable> {
    let positions = place(ir.tables.len());

    ir.tables
        .iter()
        .zip(positions)
        .zip(sizes)
        .map(|((table, pos), &(width, height))| {
            let rows = table
                .columns
                .iter()
                .enumerate()
                .map(|(i, c)| LayoutRow {
                    y: pos.y - metrics.header_height - i as f64 * metrics.row_height,
                    height: metrics.row_height,
                    fill: RowFill::for_row(c.is_pk, c.is_fk, i),
                })
                .collect();

            LayoutTable {
                id: table.name.clone(),
                x: pos.x,
                y: pos.y,
                width,
                height,
                header_height: metrics.header_height,
                rows,
            }
        })
        .collect()
}

/// Build table lookup from layout tables.
pub fn build_table_positions(tables: &[LayoutTable]) -> HashMap<&str, &LayoutTable> {
    tables.iter().map(|t| (t.id.as_str(), t)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_counts_use_corners() {
        for n in 0..=4 {
            assert_eq!(place(n), CORNER_POSITIONS[..n].to_vec());
        }
    }

    #[test]
    fn test_five_tables_grid() {
        // cols = 3, rows = 2
        let pos = place(5);
        assert_eq!(pos.len(), 5);
        assert_eq!(pos[0], Point::new(10.0, 85.0));
        assert!((pos[1].x - (10.0 + 80.0 / 3.0)).abs() < 1e-9);
        assert_eq!(pos[3], Point::new(10.0, 50.0));
        assert!((pos[4].y - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_perfect_square() {
        assert_eq!(grid_columns(9), 3);
        assert_eq!(grid_columns(10), 4);
        let pos = place(9);
        assert!((pos[8].y - (85.0 - 2.0 * 70.0 / 3.0)).abs() < 1e-9);
        assert!((pos[8].x - (10.0 + 2.0 * 80.0 / 3.0)).abs() < 1e-9);
    }
}
