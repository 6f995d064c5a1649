//! Server and rendering configuration.

use std::net::SocketAddr;
use std::time::Duration;

use crate::theme::Palette;

/// Rendering configuration.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Title drawn above the diagram
    pub title: String,
    /// Horizontal pixels per canvas unit
    pub px_per_unit_x: f64,
    /// Vertical pixels per canvas unit
    pub px_per_unit_y: f64,
    /// Outer margin in pixels
    pub margin: f64,
    /// Height of the title band in pixels
    pub title_height: f64,
    /// Raster scale factor applied when encoding PNG
    pub scale: f32,
    /// Largest raster, in pixels, a render may allocate
    pub max_pixels: u64,
    pub palette: Palette,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            title: "ERGenix - Database ER Diagram".to_string(),
            px_per_unit_x: 18.0,
            px_per_unit_y: 14.0,
            margin: 40.0,
            title_height: 70.0,
            scale: 1.0,
            max_pixels: 40_000_000,
            palette: Palette::default(),
        }
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    /// Lifetime of a cached database connection, counted from `/connect`
    pub connection_ttl: Duration,
    /// How often expired connections are swept
    pub sweep_interval: Duration,
    /// Deadline for reading a request body
    pub request_timeout: Duration,
    pub render: RenderConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 5000)),
            connection_ttl: Duration::from_secs(300),
            sweep_interval: Duration::from_secs(60),
            request_timeout: Duration::from_millis(5000),
            render: RenderConfig::default(),
        }
    }
}
