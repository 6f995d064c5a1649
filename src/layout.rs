//! Diagram layout: table sizing, grid placement and connector geometry.

pub mod anchors;
pub mod engine;
pub mod placement;
pub mod routing;
pub mod types;

pub use anchors::edge_point;
pub use engine::{LayoutEngine, LayoutError};
pub use placement::place;
pub use types::{Arrowhead, Bounds, Connector, Layout, LayoutRow, LayoutTable, Point};
