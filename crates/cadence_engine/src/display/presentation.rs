//! Presentation parameters
//!
//! The configuration bundle consumed by device creation and reset. Rebuilt
//! from scratch on every mode switch; the copy held by the display layer
//! always reflects the last mode that actually took effect.

use crate::display::formats::{DepthFormat, NegotiatedFormats, PixelFormat};

/// Back buffer swap behavior on present
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapEffect {
    /// Back buffer contents are undefined after present
    Discard,
}

/// Frame pacing relative to the display's vertical refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentInterval {
    /// Driver default (synchronized to refresh)
    Default,
    /// Present as fast as possible
    Immediate,
}

/// Configuration for creating or resetting the rendering device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentationParameters {
    /// Back buffer width in pixels
    pub back_buffer_width: u32,
    /// Back buffer height in pixels
    pub back_buffer_height: u32,
    /// Negotiated back buffer format
    pub back_buffer_format: PixelFormat,
    /// Negotiated display format
    pub display_format: PixelFormat,
    /// Number of back buffers
    pub back_buffer_count: u32,
    /// Swap behavior
    pub swap_effect: SwapEffect,
    /// Windowed rather than exclusive fullscreen
    pub windowed: bool,
    /// Whether the device manages a depth-stencil surface
    pub enable_auto_depth_stencil: bool,
    /// Format of the managed depth-stencil surface
    pub auto_depth_stencil_format: DepthFormat,
    /// Fullscreen refresh rate in Hz; 0 selects the driver default.
    /// Always 0 in windowed mode.
    pub refresh_rate_hz: u32,
    /// Frame pacing
    pub presentation_interval: PresentInterval,
}

impl PresentationParameters {
    /// Build parameters for a freshly negotiated mode.
    ///
    /// Depth-stencil is always enabled at D16 and the swap effect is always
    /// discard; nothing in the engine relies on retained back buffer
    /// contents.
    pub fn for_mode(
        formats: &NegotiatedFormats,
        windowed: bool,
        width: u32,
        height: u32,
        fullscreen_hz: u32,
    ) -> Self {
        Self {
            back_buffer_width: width,
            back_buffer_height: height,
            back_buffer_format: formats.back_buffer,
            display_format: formats.display,
            back_buffer_count: 1,
            swap_effect: SwapEffect::Discard,
            windowed,
            enable_auto_depth_stencil: true,
            auto_depth_stencil_format: DepthFormat::D16,
            refresh_rate_hz: if windowed { 0 } else { fullscreen_hz },
            presentation_interval: PresentInterval::Default,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn formats() -> NegotiatedFormats {
        NegotiatedFormats {
            display: PixelFormat::X8R8G8B8,
            back_buffer: PixelFormat::R5G6B5,
        }
    }

    #[test]
    fn test_depth_stencil_and_swap_effect_are_fixed() {
        let params = PresentationParameters::for_mode(&formats(), true, 640, 480, 0);
        assert!(params.enable_auto_depth_stencil);
        assert_eq!(params.auto_depth_stencil_format, DepthFormat::D16);
        assert_eq!(params.swap_effect, SwapEffect::Discard);
    }

    #[test]
    fn test_windowed_mode_ignores_refresh_rate() {
        let params = PresentationParameters::for_mode(&formats(), true, 640, 480, 120);
        assert_eq!(params.refresh_rate_hz, 0);

        let params = PresentationParameters::for_mode(&formats(), false, 640, 480, 120);
        assert_eq!(params.refresh_rate_hz, 120);
    }
}
