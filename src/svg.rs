use crate::config::RenderConfig;
use crate::ir::{GraphIR, Relationship, Table};
use crate::layout::{Connector, Layout, LayoutTable, Point};
use crate::measure::TextMetrics;
use std::collections::HashMap;
use std::fmt::{self, Write};

/// Advance of one monospace glyph, in em.
const MONO_ADVANCE_EM: f64 = 0.6;
const GRID_STEP: usize = 20;
const SHADOW_OFFSET: f64 = 0.3;
const TEXT_INSET: f64 = 1.0;
/// Table-name font size relative to row text.
const HEADER_FONT_SCALE: f64 = 1.15;
const ARROW_LENGTH: f64 = 14.0;
const ARROW_HALF_WIDTH: f64 = 6.0;

/// Maps canvas units (y up) to SVG pixels (y down).
struct Viewport {
    min_x: f64,
    max_y: f64,
    sx: f64,
    sy: f64,
    left: f64,
    top: f64,
    width: f64,
    height: f64,
}

impl Viewport {
    fn new(layout: &Layout, config: &RenderConfig) -> Self {
        let b = layout.bounds;
        let sx = config.px_per_unit_x;
        let sy = config.px_per_unit_y;
        Self {
            min_x: b.min_x,
            max_y: b.max_y,
            sx,
            sy,
            left: config.margin,
            top: config.margin + config.title_height,
            width: b.width() * sx + config.margin * 2.0,
            height: b.height() * sy + config.margin * 2.0 + config.title_height,
        }
    }

    fn x(&self, x: f64) -> f64 {
        self.left + (x - self.min_x) * self.sx
    }

    fn y(&self, y: f64) -> f64 {
        self.top + (self.max_y - y) * self.sy
    }

    fn point(&self, p: Point) -> (f64, f64) {
        (self.x(p.x), self.y(p.y))
    }
}

pub struct SvgRenderer {
    metrics: TextMetrics,
    config: RenderConfig,
}

impl Default for SvgRenderer {
    fn default() -> Self {
        Self::new(RenderConfig::default())
    }
}

impl SvgRenderer {
    pub fn new(config: RenderConfig) -> Self {
        Self {
            metrics: TextMetrics::default(),
            config,
        }
    }

    /// Pixel size of the document `render` would produce for `layout`.
    pub fn canvas_size(&self, layout: &Layout) -> (f64, f64) {
        let vp = Viewport::new(layout, &self.config);
        (vp.width.ceil(), vp.height.ceil())
    }

    pub fn render(&self, ir: &GraphIR, layout: &Layout) -> Result<String, fmt::Error> {
        let vp = Viewport::new(layout, &self.config);
        let palette = &self.config.palette;
        let mut svg = String::new();

        writeln!(
            &mut svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w:.0}" height="{h:.0}" viewBox="0 0 {w:.0} {h:.0}">"#,
            w = vp.width.ceil(),
            h = vp.height.ceil()
        )?;

        let row_font = self.metrics.char_width * vp.sx / MONO_ADVANCE_EM;
        writeln!(
            &mut svg,
            r#"<style>
  .grid {{ stroke: {grid}; stroke-width: 1; opacity: 0.5; }}
  .title {{ font-family: serif; font-size: 32px; font-weight: bold; fill: {header_bg}; }}
  .table-name {{ font-family: sans-serif; font-size: {header_font:.1}px; font-weight: bold; fill: {header_text}; }}
  .column-text {{ font-family: monospace; font-size: {row_font:.1}px; fill: {text}; }}
  .pk {{ font-weight: bold; }}
  .border {{ stroke: {border}; }}
  .relationship {{ stroke: {rel}; stroke-width: 2.5; fill: none; opacity: 0.8; }}
  .arrowhead {{ fill: {rel}; opacity: 0.9; }}
  .rel-label {{ font-family: sans-serif; font-size: 12px; fill: {text}; }}
</style>"#,
            grid = palette.grid,
            header_bg = palette.header_bg,
            header_text = palette.header_text,
            header_font = row_font * HEADER_FONT_SCALE,
            row_font = row_font,
            text = palette.text,
            border = palette.table_border,
            rel = palette.relationship,
        )?;

        writeln!(
            &mut svg,
            r#"<rect x="0" y="0" width="100%" height="100%" fill="{}" />"#,
            palette.background
        )?;

        self.render_grid(&mut svg, &vp)?;

        writeln!(
            &mut svg,
            r#"<text class="title" x="{:.2}" y="{:.2}" text-anchor="middle">{}</text>"#,
            vp.width / 2.0,
            self.config.margin + self.config.title_height / 2.0,
            escape_xml(&self.config.title)
        )?;

        // Build table lookup
        let table_map: HashMap<&str, &Table> =
            ir.tables.iter().map(|t| (t.name.as_str(), t)).collect();

        // Render connectors first (behind tables)
        for connector in &layout.connectors {
            if let Some(rel) = ir.relationships.get(connector.edge_index) {
                self.render_connector(&mut svg, &vp, connector, rel)?;
            }
        }

        for table in &layout.tables {
            if let Some(ir_table) = table_map.get(table.id.as_str()) {
                self.render_table(&mut svg, &vp, table, ir_table)?;
            }
        }

        writeln!(&mut svg, "</svg>")?;
        Ok(svg)
    }

    fn render_grid(&self, svg: &mut String, vp: &Viewport) -> fmt::Result {
        for i in (0..=100).step_by(GRID_STEP) {
            let v = i as f64;
            writeln!(
                svg,
                r#"<line class="grid" x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" />"#,
                vp.x(0.0),
                vp.y(v),
                vp.x(100.0),
                vp.y(v)
            )?;
            writeln!(
                svg,
                r#"<line class="grid" x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" />"#,
                vp.x(v),
                vp.y(0.0),
                vp.x(v),
                vp.y(100.0)
            )?;
        }
        Ok(())
    }

    fn render_table(
        &self,
        svg: &mut String,
        vp: &Viewport,
        layout: &LayoutTable,
        table: &Table,
    ) -> fmt::Result {
        let palette = &self.config.palette;
        let x = vp.x(layout.x);
        let w = layout.width * vp.sx;
        let header_h = layout.header_height * vp.sy;
        let shadow_dx = SHADOW_OFFSET * vp.sx;
        let shadow_dy = SHADOW_OFFSET * vp.sy;

        // 1. Header
        let top = vp.y(layout.y);
        writeln!(
            svg,
            r##"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="#000000" fill-opacity="0.125" />"##,
            x + shadow_dx,
            top + shadow_dy,
            w,
            header_h
        )?;
        writeln!(
            svg,
            r#"<rect class="border" x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="{}" stroke-width="2.5" />"#,
            x, top, w, header_h, palette.header_bg
        )?;

        let name = self.metrics.fit_label_scaled(
            &table.name,
            layout.width - TEXT_INSET,
            HEADER_FONT_SCALE,
        );
        writeln!(
            svg,
            r#"<text class="table-name" x="{:.2}" y="{:.2}" text-anchor="middle" dominant-baseline="central">{}</text>"#,
            x + w / 2.0,
            top + header_h / 2.0,
            escape_xml(&name)
        )?;

        // 2. Rows
        for (row, col) in layout.rows.iter().zip(&table.columns) {
            let row_top = vp.y(row.y);
            let row_h = row.height * vp.sy;

            writeln!(
                svg,
                r##"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="#000000" fill-opacity="0.0625" />"##,
                x + shadow_dx,
                row_top + shadow_dy,
                w,
                row_h
            )?;
            writeln!(
                svg,
                r#"<rect class="border" x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="{}" stroke-width="1.5" />"#,
                x,
                row_top,
                w,
                row_h,
                row.fill.color(palette)
            )?;

            let text = format!("{}{}", row.fill.marker(), col.label());
            let text = self
                .metrics
                .fit_label(&text, layout.width - TEXT_INSET * 2.0);
            let class = if col.is_pk { "column-text pk" } else { "column-text" };
            writeln!(
                svg,
                r#"<text class="{}" x="{:.2}" y="{:.2}" dominant-baseline="central">{}</text>"#,
                class,
                x + TEXT_INSET * vp.sx,
                row_top + row_h / 2.0,
                escape_xml(&text)
            )?;
        }

        Ok(())
    }

    fn render_connector(
        &self,
        svg: &mut String,
        vp: &Viewport,
        connector: &Connector,
        rel: &Relationship,
    ) -> fmt::Result {
        let points: Vec<String> = connector
            .waypoints
            .iter()
            .map(|&p| {
                let (px, py) = vp.point(p);
                format!("{px:.2},{py:.2}")
            })
            .collect();
        writeln!(
            svg,
            r#"<polyline class="relationship" points="{}" />"#,
            points.join(" ")
        )?;

        // Arrowhead, direction taken in pixel space
        let head = connector.arrowhead;
        let (tx, ty) = vp.point(head.tip);
        let (dx, dy) = (head.angle.cos() * vp.sx, -head.angle.sin() * vp.sy);
        let len = (dx * dx + dy * dy).sqrt();
        if len > 0.0 {
            let (ux, uy) = (dx / len, dy / len);
            let (bx, by) = (tx - ux * ARROW_LENGTH, ty - uy * ARROW_LENGTH);
            let (nx, ny) = (-uy * ARROW_HALF_WIDTH, ux * ARROW_HALF_WIDTH);
            writeln!(
                svg,
                r#"<polygon class="arrowhead" points="{:.2},{:.2} {:.2},{:.2} {:.2},{:.2}" />"#,
                tx,
                ty,
                bx + nx,
                by + ny,
                bx - nx,
                by - ny
            )?;
        }

        if let Some(label) = &rel.relationship_type {
            let (sx, sy) = vp.point(connector.start());
            let (ex, ey) = vp.point(connector.end());
            let (mx, my) = ((sx + ex) / 2.0, (sy + ey) / 2.0);
            let box_w = label.chars().count() as f64 * 7.5 + 12.0;
            writeln!(
                svg,
                r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="20" rx="6" fill="white" fill-opacity="0.9" stroke="{}" />"#,
                mx - box_w / 2.0,
                my - 10.0,
                box_w,
                self.config.palette.relationship
            )?;
            writeln!(
                svg,
                r#"<text class="rel-label" x="{:.2}" y="{:.2}" text-anchor="middle" dominant-baseline="central">{}</text>"#,
                mx,
                my,
                escape_xml(label)
            )?;
        }

        Ok(())
    }
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{ColumnDescriptor, TableInfo, TablesData, relationships_within};
    use crate::ir::ForeignKey;
    use crate::layout::LayoutEngine;

    fn render(tables: &TablesData) -> String {
        let ir = GraphIR::from_tables(tables, &relationships_within(tables));
        let layout = LayoutEngine::default().layout(&ir).unwrap();
        SvgRenderer::default().render(&ir, &layout).unwrap()
    }

    fn shop() -> TablesData {
        let mut tables = TablesData::new();
        tables.insert(
            "users".to_string(),
            TableInfo {
                schema: vec![
                    ColumnDescriptor::new("id", "int").with_key("PRI"),
                    ColumnDescriptor::new("name", "varchar(64)"),
                ],
                foreign_keys: vec![],
            },
        );
        tables.insert(
            "orders".to_string(),
            TableInfo {
                schema: vec![
                    ColumnDescriptor::new("id", "int").with_key("PRI"),
                    ColumnDescriptor::new("user_id", "int"),
                ],
                foreign_keys: vec![ForeignKey {
                    column: "user_id".to_string(),
                    referenced_table: "users".to_string(),
                    referenced_column: "id".to_string(),
                }],
            },
        );
        tables
    }

    #[test]
    fn test_render_basic() {
        let svg = render(&shop());
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("users"));
        assert!(svg.contains("◆ id: int"));
        assert!(svg.contains("◇ user_id: int"));
        assert!(svg.contains("#FFE5B4"));
        assert!(svg.contains("#E3F2FD"));
        assert!(svg.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn test_render_with_edges() {
        let svg = render(&shop());
        assert_eq!(svg.matches(r#"class="relationship""#).count(), 1);
        assert!(svg.contains(r#"class="arrowhead""#));
    }

    #[test]
    fn test_render_empty_has_title_only() {
        let svg = render(&TablesData::new());
        assert!(svg.contains("ERGenix - Database ER Diagram"));
        assert!(!svg.contains("column-text\" x"));
        assert!(!svg.contains("<polyline"));
    }

    #[test]
    fn test_render_escapes_labels() {
        let mut tables = TablesData::new();
        tables.insert(
            "a<b>".to_string(),
            TableInfo {
                schema: vec![ColumnDescriptor::new("x&y", "enum('a','b')")],
                foreign_keys: vec![],
            },
        );
        let svg = render(&tables);
        assert!(svg.contains("a&lt;b&gt;"));
        assert!(svg.contains("x&amp;y"));
    }

    #[test]
    fn test_relationship_label() {
        let tables = shop();
        let mut rels = relationships_within(&tables);
        rels[0].relationship_type = Some("places".to_string());
        let ir = GraphIR::from_tables(&tables, &rels);
        let layout = LayoutEngine::default().layout(&ir).unwrap();
        let svg = SvgRenderer::default().render(&ir, &layout).unwrap();
        assert!(svg.contains(">places</text>"));
    }

    #[test]
    fn test_long_table_name_fits_header() {
        let name = "customer_loyalty_program_membership_history_archive";
        let mut tables = TablesData::new();
        tables.insert(
            name.to_string(),
            TableInfo {
                schema: vec![ColumnDescriptor::new("id", "int").with_key("PRI")],
                foreign_keys: vec![],
            },
        );
        let svg = render(&tables);
        assert!(!svg.contains(name));

        let metrics = TextMetrics::default();
        let start = svg.find(r#"class="table-name""#).unwrap();
        let text = &svg[start..];
        let text = &text[text.find('>').unwrap() + 1..text.find("</text>").unwrap()];
        assert!(text.ends_with('…'));
        let drawn = metrics.text_width(text) * HEADER_FONT_SCALE;
        assert!(drawn <= metrics.max_table_width - TEXT_INSET);
    }

    #[test]
    fn test_viewport_flips_y() {
        let ir = GraphIR::from_tables(&TablesData::new(), &[]);
        let layout = LayoutEngine::default().layout(&ir).unwrap();
        let config = RenderConfig::default();
        let vp = Viewport::new(&layout, &config);
        assert_eq!(vp.y(100.0), config.margin + config.title_height);
        assert!(vp.y(0.0) > vp.y(100.0));
        assert_eq!(vp.width, 100.0 * 18.0 + 80.0);
        assert_eq!(
            SvgRenderer::default().canvas_size(&layout),
            (1880.0, 100.0 * 14.0 + 80.0 + 70.0)
        );
    }
}
