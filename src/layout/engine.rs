//! Layout engine core implementation.

use crate::ir::{GraphIR, Relationship};
use crate::measure::TextMetrics;

use super::anchors::edge_point;
use super::placement::{build_table_positions, calculate_table_sizes, place_tables};
use super::routing::{arrowhead, route_between, route_self_ref};
use super::types::{Bounds, Connector, Layout, LayoutTable, Point};

#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error(
        "relationship {}.{} -> {}.{} references table '{table}' which is not in the diagram",
        .relationship.from_table,
        .relationship.from_column,
        .relationship.to_table,
        .relationship.to_column
    )]
    UnknownTable {
        table: String,
        relationship: Box<Relationship>,
    },
}

/// Layout engine configuration and computation.
pub struct LayoutEngine {
    pub(crate) metrics: TextMetrics,
    pub(crate) self_ref_offset: f64,
    pub(crate) shadow_offset: f64,
}

impl Default for LayoutEngine {
    fn default() -> Self {
        Self {
            metrics: TextMetrics::default(),
            self_ref_offset: 3.0,
            shadow_offset: 0.3,
        }
    }
}

impl LayoutEngine {
    /// Compute layout for the given graph.
    ///
    /// Fails as a whole if any relationship names a table that is not part
    /// of `ir.tables`.
    pub fn layout(&self, ir: &GraphIR) -> Result<Layout, LayoutError> {
        // Phase 1: sizing
        let sizes = calculate_table_sizes(ir, &self.metrics);

        // Phase 2: placement
        let tables = place_tables(ir, &sizes, &self.metrics);
        let positions = build_table_positions(&tables);

        // Phase 3: connectors
        let mut connectors = Vec::with_capacity(ir.relationships.len());
        for (idx, rel) in ir.relationships.iter().enumerate() {
            let lookup = |name: &str| {
                positions
                    .get(name)
                    .copied()
                    .ok_or_else(|| LayoutError::UnknownTable {
                        table: name.to_string(),
                        relationship: Box::new(rel.clone()),
                    })
            };
            let from = lookup(&rel.from_table)?;
            let to = lookup(&rel.to_table)?;

            let is_self_ref = rel.from_table == rel.to_table;
            let waypoints = if is_self_ref {
                route_self_ref(from, self.self_ref_offset)
            } else {
                route_between(
                    edge_point(from, to.position()),
                    edge_point(to, from.position()),
                )
            };

            connectors.push(Connector {
                from: rel.from_table.clone(),
                to: rel.to_table.clone(),
                arrowhead: arrowhead(&waypoints),
                waypoints,
                is_self_ref,
                edge_index: idx,
            });
        }

        let bounds = self.scene_bounds(&tables, &connectors);

        Ok(Layout {
            tables,
            connectors,
            bounds,
        })
    }

    /// The canvas grown to cover tables (with shadows) and connectors that
    /// spill past it.
    fn scene_bounds(&self, tables: &[LayoutTable], connectors: &[Connector]) -> Bounds {
        let mut bounds = Bounds {
            min_x: 0.0,
            min_y: 0.0,
            max_x: 100.0,
            max_y: 100.0,
        };

        for t in tables {
            bounds.include(Point::new(t.x, t.y));
            bounds.include(Point::new(
                t.right() + self.shadow_offset,
                t.bottom() - self.shadow_offset,
            ));
        }
        for c in connectors {
            for &p in &c.waypoints {
                bounds.include(p);
            }
        }

        bounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Column, Table};

    fn table(name: &str, columns: usize) -> Table {
        Table {
            name: name.to_string(),
            columns: (0..columns)
                .map(|i| Column {
                    name: format!("col_{i}"),
                    typ: "int".to_string(),
                    is_pk: i == 0,
                    is_fk: false,
                })
                .collect(),
        }
    }

    fn rel(from: &str, to: &str) -> Relationship {
        Relationship {
            from_table: from.to_string(),
            to_table: to.to_string(),
            from_column: format!("{to}_id"),
            to_column: "id".to_string(),
            relationship_type: None,
        }
    }

    #[test]
    fn test_basic_layout() {
        let ir = GraphIR {
            tables: vec![table("users", 3)],
            relationships: vec![],
        };
        let layout = LayoutEngine::default().layout(&ir).unwrap();

        assert_eq!(layout.tables.len(), 1);
        let users = &layout.tables[0];
        assert_eq!(users.position(), Point::new(15.0, 75.0));
        assert_eq!(users.rows.len(), 3);
        assert_eq!(users.rows[0].y, 75.0 - 3.5);
        assert!((users.height - (3.0 * 2.2 + 3.5)).abs() < 1e-9);
    }

    #[test]
    fn test_empty_diagram() {
        let ir = GraphIR {
            tables: vec![],
            relationships: vec![],
        };
        let layout = LayoutEngine::default().layout(&ir).unwrap();
        assert!(layout.tables.is_empty());
        assert!(layout.connectors.is_empty());
        assert_eq!(layout.bounds.width(), 100.0);
    }

    #[test]
    fn test_layout_edges_attach_to_boundaries() {
        let ir = GraphIR {
            tables: vec![table("a", 2), table("b", 3), table("c", 1)],
            relationships: vec![rel("a", "b"), rel("b", "c")],
        };
        let layout = LayoutEngine::default().layout(&ir).unwrap();

        assert_eq!(layout.connectors.len(), 2);
        for c in &layout.connectors {
            let from = layout.table(&c.from).unwrap();
            let to = layout.table(&c.to).unwrap();
            assert!(from.on_boundary(c.start()));
            assert!(to.on_boundary(c.end()));
            assert_ne!(c.start(), from.center());
            assert_eq!(c.arrowhead.tip, c.end());
        }

        // a and b sit side by side: right edge of a to left edge of b
        let ab = &layout.connectors[0];
        let a = layout.table("a").unwrap();
        let b = layout.table("b").unwrap();
        assert_eq!(ab.start().x, a.right());
        assert_eq!(ab.end().x, b.x);
    }

    #[test]
    fn test_unknown_table_fails_whole_build() {
        let ir = GraphIR {
            tables: vec![table("a", 1), table("b", 1)],
            relationships: vec![rel("a", "b"), rel("b", "ghost")],
        };
        let err = LayoutEngine::default().layout(&ir).unwrap_err();
        let LayoutError::UnknownTable { table, .. } = &err;
        assert_eq!(table, "ghost");
        assert!(err.to_string().contains("b.ghost_id -> ghost.id"));
    }

    #[test]
    fn test_self_reference() {
        let ir = GraphIR {
            tables: vec![table("employees", 4)],
            relationships: vec![rel("employees", "employees")],
        };
        let layout = LayoutEngine::default().layout(&ir).unwrap();
        let c = &layout.connectors[0];
        assert!(c.is_self_ref);
        let t = &layout.tables[0];
        assert!(t.on_boundary(c.start()) && t.on_boundary(c.end()));
        assert!(layout.bounds.max_x >= t.right() + 3.0);
    }

    #[test]
    fn test_tall_table_extends_bounds() {
        let ir = GraphIR {
            tables: vec![table("a", 1), table("b", 1), table("wide", 30)],
            relationships: vec![],
        };
        let layout = LayoutEngine::default().layout(&ir).unwrap();
        let wide = layout.table("wide").unwrap();
        assert!(wide.bottom() < 0.0);
        assert!(layout.bounds.min_y <= wide.bottom());
    }
}
