//! Pixel formats and back-buffer format negotiation
//!
//! Negotiation is trial-based: build an ordered candidate list, ask the
//! adapter whether each (display format, back buffer format, windowed)
//! combination works, and take the first hit. No scoring beyond list order.

use log::trace;

use crate::display::backend::DisplayAdapter;
use crate::display::caps::DisplayMode;
use crate::display::error::NegotiationError;

/// Color pixel formats the engine understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 16-bit, 5-6-5
    R5G6B5,
    /// 16-bit, unused high bit
    X1R5G5B5,
    /// 16-bit with 1-bit alpha
    A1R5G5B5,
    /// 24-bit packed RGB
    R8G8B8,
    /// 32-bit, unused high byte
    X8R8G8B8,
    /// 32-bit with alpha
    A8R8G8B8,
}

impl PixelFormat {
    /// Color depth of the format in bits per pixel
    pub const fn bits_per_pixel(self) -> u32 {
        match self {
            Self::R5G6B5 | Self::X1R5G5B5 | Self::A1R5G5B5 => 16,
            Self::R8G8B8 => 24,
            Self::X8R8G8B8 | Self::A8R8G8B8 => 32,
        }
    }
}

/// Depth-stencil formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthFormat {
    /// 16-bit depth, no stencil
    D16,
}

/// A (display format, back buffer format) pair that passed negotiation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NegotiatedFormats {
    /// Format the display itself runs in
    pub display: PixelFormat,
    /// Format of the back buffer
    pub back_buffer: PixelFormat,
}

/// Ordered candidate list of back-buffer formats for a request.
///
/// Windowed mode ignores the requested depth and tries everything, lowest
/// color depth first. Fullscreen narrows to the variants matching the
/// requested depth; any depth outside {16, 32} is rejected here, before any
/// adapter call.
pub fn candidate_back_buffer_formats(
    windowed: bool,
    bpp: u32,
) -> Result<Vec<PixelFormat>, NegotiationError> {
    use PixelFormat::{A1R5G5B5, A8R8G8B8, R5G6B5, R8G8B8, X1R5G5B5, X8R8G8B8};

    if windowed {
        return Ok(vec![R5G6B5, X1R5G5B5, A1R5G5B5, R8G8B8, X8R8G8B8, A8R8G8B8]);
    }

    match bpp {
        16 => Ok(vec![R5G6B5, X1R5G5B5, A1R5G5B5]),
        32 => Ok(vec![R8G8B8, X8R8G8B8, A8R8G8B8]),
        _ => Err(NegotiationError::UnsupportedBitDepth { bpp }),
    }
}

/// Find a compatible format pair for the requested mode.
///
/// In windowed mode candidates are tested against the fixed desktop format;
/// in fullscreen the display runs in the back-buffer format itself. The
/// first compatible candidate in list order wins.
pub fn negotiate(
    adapter: &dyn DisplayAdapter,
    desktop_mode: &DisplayMode,
    windowed: bool,
    width: u32,
    height: u32,
    bpp: u32,
) -> Result<NegotiatedFormats, NegotiationError> {
    let candidates = candidate_back_buffer_formats(windowed, bpp)?;

    for back_buffer in candidates {
        let display = if windowed {
            desktop_mode.format
        } else {
            back_buffer
        };

        trace!(
            "Testing format: display {:?}, back buffer {:?}, windowed {}...",
            display,
            back_buffer,
            windowed
        );

        if adapter.check_device_format(display, back_buffer, windowed) {
            trace!("This will work.");
            return Ok(NegotiatedFormats {
                display,
                back_buffer,
            });
        }
        trace!("This won't work.  Keep searching.");
    }

    Err(NegotiationError::NoCompatibleFormat {
        windowed,
        width,
        height,
        bpp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use crate::display::backend::tests_support::ProbeAdapter;

    #[test]
    fn test_windowed_candidates_ordered_lowest_depth_first() {
        let candidates = candidate_back_buffer_formats(true, 0).unwrap();
        assert_eq!(candidates.len(), 6);
        let depths: Vec<u32> = candidates.iter().map(|f| f.bits_per_pixel()).collect();
        let mut sorted = depths.clone();
        sorted.sort_unstable();
        assert_eq!(depths, sorted);
    }

    #[test]
    fn test_fullscreen_candidates_match_requested_depth() {
        for format in candidate_back_buffer_formats(false, 16).unwrap() {
            assert_eq!(format.bits_per_pixel(), 16);
        }
        for format in candidate_back_buffer_formats(false, 32).unwrap() {
            assert!(format.bits_per_pixel() >= 24);
        }
    }

    #[test]
    fn test_invalid_fullscreen_depth_rejected_before_any_adapter_call() {
        let adapter = ProbeAdapter::rejecting_all();
        let desktop = adapter.desktop_mode().unwrap();

        for bpp in [0, 8, 24, 48] {
            let result = negotiate(&adapter, &desktop, false, 640, 480, bpp);
            assert_eq!(result, Err(NegotiationError::UnsupportedBitDepth { bpp }));
        }
        assert_eq!(adapter.checks.borrow().len(), 0);
    }

    #[test]
    fn test_windowed_failure_tries_all_six_candidates() {
        let adapter = ProbeAdapter::rejecting_all();
        let desktop = adapter.desktop_mode().unwrap();

        let result = negotiate(&adapter, &desktop, true, 640, 480, 16);
        assert!(matches!(
            result,
            Err(NegotiationError::NoCompatibleFormat { windowed: true, .. })
        ));
        assert_eq!(adapter.checks.borrow().len(), 6);
    }

    #[test]
    fn test_windowed_display_format_is_always_desktop_format() {
        let adapter = ProbeAdapter::rejecting_all();
        let desktop = adapter.desktop_mode().unwrap();

        let _ = negotiate(&adapter, &desktop, true, 640, 480, 16);
        for (display, _, windowed) in adapter.checks.borrow().iter() {
            assert_eq!(*display, desktop.format);
            assert!(*windowed);
        }
    }

    #[test]
    fn test_first_compatible_candidate_wins() {
        // Accept only the second 16-bit variant; negotiation must stop there.
        let adapter = ProbeAdapter {
            accept: Some(PixelFormat::X1R5G5B5),
            checks: RefCell::new(Vec::new()),
        };
        let desktop = adapter.desktop_mode().unwrap();

        let negotiated = negotiate(&adapter, &desktop, false, 640, 480, 16).unwrap();
        assert_eq!(negotiated.back_buffer, PixelFormat::X1R5G5B5);
        assert_eq!(negotiated.display, PixelFormat::X1R5G5B5);
        assert_eq!(adapter.checks.borrow().len(), 2);
    }
}
