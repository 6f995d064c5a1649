pub mod api;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod ir;
pub mod layout;
pub mod measure;
pub mod raster;
pub mod svg;
pub mod theme;

use config::RenderConfig;
use ir::{GraphIR, Relationship, TablesData};
use layout::{LayoutEngine, LayoutError};
use raster::{Rasterizer, RenderError};
use svg::SvgRenderer;

#[derive(Debug, thiserror::Error)]
pub enum DiagramError {
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Render the given tables and relationships to SVG.
///
/// Every relationship must reference tables present in `tables`.
pub fn render_svg(
    tables: &TablesData,
    relationships: &[Relationship],
    config: &RenderConfig,
) -> Result<String, DiagramError> {
    let ir = GraphIR::from_tables(tables, relationships);
    let layout = LayoutEngine::default().layout(&ir)?;
    tracing::debug!(
        tables = layout.tables.len(),
        connectors = layout.connectors.len(),
        "computed layout"
    );

    let svg = SvgRenderer::new(config.clone())
        .render(&ir, &layout)
        .map_err(RenderError::from)?;
    Ok(svg)
}

/// Render to PNG. Layout runs unlocked; building the SVG and rasterizing it
/// happen inside one [`RenderScope`](raster::RenderScope).
pub fn render_png(
    tables: &TablesData,
    relationships: &[Relationship],
    rasterizer: &Rasterizer,
    config: &RenderConfig,
) -> Result<Vec<u8>, DiagramError> {
    let ir = GraphIR::from_tables(tables, relationships);
    let layout = LayoutEngine::default().layout(&ir)?;

    let png = rasterizer.scope().render_diagram(&ir, &layout, config)?;
    Ok(png)
}
