//! SVG to PNG rasterization.
//!
//! Rendering to an image is serialized: callers obtain a [`RenderScope`]
//! from [`Rasterizer::scope`], which holds the rasterizer lock for as long as
//! it lives. The font database is loaded once and shared by every scope.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use resvg::tiny_skia::{Pixmap, Transform};
use resvg::usvg;

use crate::config::RenderConfig;
use crate::ir::GraphIR;
use crate::layout::Layout;
use crate::svg::SvgRenderer;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to write SVG")]
    Format(#[from] std::fmt::Error),
    #[error("failed to parse generated SVG: {0}")]
    Svg(#[from] usvg::Error),
    #[error("scale must be a finite number greater than zero, got {0}")]
    InvalidScale(f32),
    #[error("diagram is too large to render: {width}x{height} pixels exceeds the limit of {limit}")]
    TooLarge { width: u64, height: u64, limit: u64 },
    #[error("failed to allocate {width}x{height} surface")]
    Allocation { width: u32, height: u32 },
    #[error("failed to encode PNG: {0}")]
    Encode(String),
}

pub struct Rasterizer {
    fontdb: Arc<usvg::fontdb::Database>,
    lock: Mutex<()>,
}

impl Default for Rasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Rasterizer {
    pub fn new() -> Self {
        let mut fontdb = usvg::fontdb::Database::new();
        fontdb.load_system_fonts();
        tracing::debug!(faces = fontdb.len(), "loaded system fonts");
        Self {
            fontdb: Arc::new(fontdb),
            lock: Mutex::new(()),
        }
    }

    /// Acquire exclusive use of the rasterizer. Blocks while another scope
    /// is alive.
    pub fn scope(&self) -> RenderScope<'_> {
        RenderScope {
            fontdb: &self.fontdb,
            _guard: self.lock.lock(),
        }
    }
}

/// Exclusive rasterizing capability; released on drop.
pub struct RenderScope<'a> {
    fontdb: &'a Arc<usvg::fontdb::Database>,
    _guard: MutexGuard<'a, ()>,
}

impl RenderScope<'_> {
    /// Draw a laid-out diagram and encode it as PNG. The raster size is
    /// checked against `config.max_pixels` before the SVG is built.
    pub fn render_diagram(
        &self,
        ir: &GraphIR,
        layout: &Layout,
        config: &RenderConfig,
    ) -> Result<Vec<u8>, RenderError> {
        let renderer = SvgRenderer::new(config.clone());
        let (width, height) = renderer.canvas_size(layout);
        raster_size(width, height, config.scale, config.max_pixels)?;

        let svg = renderer.render(ir, layout)?;
        self.render_png(&svg, config.scale, config.max_pixels)
    }

    pub fn render_png(&self, svg: &str, scale: f32, max_pixels: u64) -> Result<Vec<u8>, RenderError> {
        let mut options = usvg::Options::default();
        options.font_family = "DejaVu Sans".to_string();
        options.fontdb = Arc::clone(self.fontdb);

        let tree = usvg::Tree::from_str(svg, &options)?;

        let size = tree.size();
        let (width, height) = raster_size(
            f64::from(size.width()),
            f64::from(size.height()),
            scale,
            max_pixels,
        )?;

        let mut pixmap =
            Pixmap::new(width, height).ok_or(RenderError::Allocation { width, height })?;
        resvg::render(&tree, Transform::from_scale(scale, scale), &mut pixmap.as_mut());

        pixmap
            .encode_png()
            .map_err(|err| RenderError::Encode(err.to_string()))
    }
}

/// Pixel dimensions of a `width`×`height` document at `scale`, refused when
/// the area exceeds `max_pixels`.
fn raster_size(width: f64, height: f64, scale: f32, max_pixels: u64) -> Result<(u32, u32), RenderError> {
    if !scale.is_finite() || scale <= 0.0 {
        return Err(RenderError::InvalidScale(scale));
    }
    let scale = f64::from(scale);
    let w = (width * scale).ceil().max(1.0) as u64;
    let h = (height * scale).ceil().max(1.0) as u64;

    match (u32::try_from(w), u32::try_from(h)) {
        (Ok(pw), Ok(ph)) if w.saturating_mul(h) <= max_pixels => Ok((pw, ph)),
        _ => Err(RenderError::TooLarge {
            width: w,
            height: h,
            limit: max_pixels,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMIT: u64 = 1_000_000;
    const SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="40" height="20" viewBox="0 0 40 20"><rect width="40" height="20" fill="#2E86AB"/></svg>"##;

    #[test]
    fn test_render_png_signature_and_size() {
        let raster = Rasterizer::new();
        let png = raster.scope().render_png(SVG, 2.0, LIMIT).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
        // IHDR width/height
        assert_eq!(u32::from_be_bytes([png[16], png[17], png[18], png[19]]), 80);
        assert_eq!(u32::from_be_bytes([png[20], png[21], png[22], png[23]]), 40);
    }

    #[test]
    fn test_invalid_scale() {
        let raster = Rasterizer::new();
        let err = raster.scope().render_png(SVG, 0.0, LIMIT).unwrap_err();
        assert!(matches!(err, RenderError::InvalidScale(_)));
    }

    #[test]
    fn test_bad_svg() {
        let raster = Rasterizer::new();
        let err = raster.scope().render_png("<svg", 1.0, LIMIT).unwrap_err();
        assert!(matches!(err, RenderError::Svg(_)));
    }

    #[test]
    fn test_oversized_raster_is_refused() {
        let raster = Rasterizer::new();
        let huge = r#"<svg xmlns="http://www.w3.org/2000/svg" width="2000" height="3000000"></svg>"#;
        let err = raster.scope().render_png(huge, 1.0, LIMIT).unwrap_err();
        assert!(matches!(
            err,
            RenderError::TooLarge { width: 2000, height: 3_000_000, limit: LIMIT }
        ));

        // the limit applies after scaling
        let err = raster.scope().render_png(SVG, 200.0, LIMIT).unwrap_err();
        assert!(matches!(err, RenderError::TooLarge { .. }));
    }

    #[test]
    fn test_raster_size_bounds() {
        assert_eq!(raster_size(40.0, 20.0, 1.5, LIMIT).unwrap(), (60, 30));
        assert_eq!(raster_size(0.0, 0.0, 1.0, LIMIT).unwrap(), (1, 1));
        assert!(matches!(
            raster_size(1e12, 1.0, 1.0, u64::MAX),
            Err(RenderError::TooLarge { .. })
        ));
        assert!(matches!(
            raster_size(10.0, 10.0, f32::NAN, LIMIT),
            Err(RenderError::InvalidScale(_))
        ));
    }

    #[test]
    fn test_scopes_are_exclusive() {
        let raster = Rasterizer::new();
        let scope = raster.scope();
        assert!(raster.lock.try_lock().is_none());
        drop(scope);
        assert!(raster.lock.try_lock().is_some());
    }
}
