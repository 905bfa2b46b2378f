//! Display layer error taxonomy
//!
//! Fatal conditions are `Err` values that terminate the operation or the
//! session; recoverable conditions are ordinary return values (`Ok(false)`
//! mode-switch outcomes, [`FrameStatus`](crate::display::FrameStatus)
//! polling) and never surface as errors or panics.

use thiserror::Error;

/// Fatal display layer errors
#[derive(Error, Debug)]
pub enum DisplayError {
    /// The graphics subsystem could not be acquired at startup
    #[error("graphics adapter unavailable: {0}")]
    AdapterUnavailable(String),

    /// The adapter capability query failed
    #[error("adapter capability query failed: {0}")]
    CapabilityQuery(String),

    /// The desktop display mode could not be read
    #[error("desktop mode query failed: {0}")]
    DesktopModeQuery(String),

    /// The fixed-capacity vertex buffer could not be allocated.
    ///
    /// Vertex rendering is impossible without it; there is no degraded mode.
    #[error("vertex buffer allocation failed: {0}")]
    VertexBufferAllocation(String),
}

/// Mode negotiation failures
#[derive(Error, Debug, PartialEq, Eq)]
pub enum NegotiationError {
    /// Requested fullscreen bit depth is not 16 or 32.
    ///
    /// Rejected before any adapter call is made.
    #[error("invalid fullscreen bit depth '{bpp}' specified")]
    UnsupportedBitDepth {
        /// The offending bit depth
        bpp: u32,
    },

    /// Every candidate format failed the compatibility check.
    ///
    /// Recoverable: the caller may retry with different parameters.
    #[error("no compatible pixel format for windowed={windowed}, {width}x{height}x{bpp}")]
    NoCompatibleFormat {
        /// Windowed flag of the failed request
        windowed: bool,
        /// Requested width
        width: u32,
        /// Requested height
        height: u32,
        /// Requested bit depth
        bpp: u32,
    },
}

/// Errors from individual device operations
#[derive(Error, Debug)]
pub enum DeviceError {
    /// Opening the scene for the current frame failed
    #[error("scene open failed: {0}")]
    SceneOpen(String),

    /// A buffer or image allocation failed
    #[error("resource allocation of {bytes} bytes failed: {reason}")]
    Allocation {
        /// Size of the failed request
        bytes: usize,
        /// Backend-reported cause
        reason: String,
    },

    /// Any other backend failure
    #[error("graphics backend error: {0}")]
    Backend(String),
}

/// Outcome of a failed device reset
#[derive(Error, Debug)]
pub enum ResetError {
    /// The reset did not take; the device is still valid and the caller may
    /// retry after correcting parameters or waiting out a lost state
    #[error("device reset failed, retry later: {0}")]
    TryAgain(String),

    /// The device is gone for good and must be recreated from scratch
    #[error("device removed: {0}")]
    DeviceRemoved(String),
}
