//! Data structures for layout computation.
//!
//! All coordinates live on the 100×100 canvas with `y` growing upward. A
//! table's `(x, y)` is the top-left corner of its header.

use crate::theme::RowFill;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A positioned table.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutTable {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub header_height: f64,
    pub rows: Vec<LayoutRow>,
}

impl LayoutTable {
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y - self.height / 2.0)
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y - self.height
    }

    /// True when `p` lies on the rectangle's outline.
    pub fn on_boundary(&self, p: Point) -> bool {
        const EPS: f64 = 1e-9;
        let within_x = p.x >= self.x - EPS && p.x <= self.right() + EPS;
        let within_y = p.y >= self.bottom() - EPS && p.y <= self.y + EPS;
        let on_vertical = (p.x - self.x).abs() < EPS || (p.x - self.right()).abs() < EPS;
        let on_horizontal = (p.y - self.y).abs() < EPS || (p.y - self.bottom()).abs() < EPS;
        (on_vertical && within_y) || (on_horizontal && within_x)
    }
}

/// One column row inside a table box.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutRow {
    /// Top edge of the row
    pub y: f64,
    pub height: f64,
    pub fill: RowFill,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arrowhead {
    pub tip: Point,
    /// Direction of travel at the tip, radians from +x toward +y
    pub angle: f64,
}

/// A relationship line with orthogonal waypoints.
#[derive(Debug, Clone, PartialEq)]
pub struct Connector {
    pub from: String,
    pub to: String,
    /// Path points (start, turns, end)
    pub waypoints: Vec<Point>,
    pub arrowhead: Arrowhead,
    pub is_self_ref: bool,
    /// Index into GraphIR.relationships
    pub edge_index: usize,
}

impl Connector {
    pub fn start(&self) -> Point {
        self.waypoints[0]
    }

    pub fn end(&self) -> Point {
        self.waypoints[self.waypoints.len() - 1]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn include(&mut self, p: Point) {
        self.min_x = self.min_x.min(p.x);
        self.min_y = self.min_y.min(p.y);
        self.max_x = self.max_x.max(p.x);
        self.max_y = self.max_y.max(p.y);
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

/// The complete layout result.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub tables: Vec<LayoutTable>,
    pub connectors: Vec<Connector>,
    /// Canvas extended to everything drawn
    pub bounds: Bounds,
}

impl Layout {
    pub fn table(&self, id: &str) -> Option<&LayoutTable> {
        self.tables.iter().find(|t| t.id == id)
    }
}
