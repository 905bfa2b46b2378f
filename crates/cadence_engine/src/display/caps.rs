//! Adapter capability and display mode snapshots

use crate::display::formats::PixelFormat;

/// Immutable snapshot of adapter limits, queried once at startup
#[derive(Debug, Clone, Copy)]
pub struct DeviceCaps {
    /// Largest supported texture width in texels
    pub max_texture_width: u32,
    /// Largest supported texture height in texels
    pub max_texture_height: u32,
    /// Number of texture blend stages the fixed pipeline exposes
    pub max_texture_blend_stages: u32,
    /// Number of textures that can be bound simultaneously
    pub max_simultaneous_textures: u32,
}

/// A display mode the adapter can drive
///
/// The desktop mode captured at startup uses this same record; its format
/// is the fixed display format for all windowed-mode negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayMode {
    /// Horizontal resolution in pixels
    pub width: u32,
    /// Vertical resolution in pixels
    pub height: u32,
    /// Refresh rate in Hz; 0 when the backend does not report one
    pub refresh_hz: u32,
    /// Pixel format of the mode
    pub format: PixelFormat,
}

/// Driver/device identity strings, queried for diagnostics only
#[derive(Debug, Clone)]
pub struct AdapterIdentifier {
    /// Driver name or version string
    pub driver: String,
    /// Human-readable device description
    pub description: String,
}
