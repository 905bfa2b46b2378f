//! # Display Backend Abstraction
//!
//! Defines the interface between the display layer and a concrete graphics
//! backend. The [`Display`](crate::display::Display) state machine talks to
//! the adapter and device exclusively through these traits, so the mode
//! negotiation and frame lifecycle are testable without hardware and
//! backends can be swapped without touching the high-level code.
//!
//! ## Implementation Notes
//!
//! Backends should:
//! - Manage their own GPU resources and state
//! - Report lost/needs-reset conditions through [`CooperativeLevel`], not
//!   errors or panics
//! - Defer work where their API requires it (e.g. a clear requested before
//!   the scene opens applies to the frame opened by the following
//!   `begin_scene`)

use crate::display::caps::{AdapterIdentifier, DeviceCaps, DisplayMode};
use crate::display::error::{DeviceError, ResetError};
use crate::display::formats::PixelFormat;
use crate::display::presentation::PresentationParameters;
use crate::display::state::{ClearFlags, FrameRenderState};
use crate::display::vertex::SpriteVertex;

/// Readiness of the device for rendering, polled at the top of each frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooperativeLevel {
    /// Device is ready to render
    Ready,
    /// Device is temporarily unusable (e.g. focus lost); wait and poll again
    Lost,
    /// Device is recoverable but parameters must be reapplied first
    NeedsReset,
}

/// Graphics adapter: capability queries, mode enumeration, and device creation
pub trait DisplayAdapter {
    /// Query adapter capability limits
    fn capabilities(&self) -> Result<DeviceCaps, DeviceError>;

    /// Number of display modes the adapter reports
    fn adapter_mode_count(&self) -> u32;

    /// Display mode at `index`, or `None` if that entry cannot be read.
    ///
    /// Enumeration is diagnostic only; callers skip unreadable entries.
    fn adapter_mode(&self, index: u32) -> Option<DisplayMode>;

    /// The desktop display mode at startup
    fn desktop_mode(&self) -> Result<DisplayMode, DeviceError>;

    /// Driver identity strings, for logging
    fn identifier(&self) -> Result<AdapterIdentifier, DeviceError>;

    /// Whether the adapter can drive `display` while presenting a
    /// `back_buffer`-formatted back buffer in the given windowed mode
    fn check_device_format(
        &self,
        display: PixelFormat,
        back_buffer: PixelFormat,
        windowed: bool,
    ) -> bool;

    /// Create the rendering device for the given presentation parameters
    fn create_device(
        &mut self,
        params: &PresentationParameters,
    ) -> Result<Box<dyn RenderDevice>, DeviceError>;
}

/// The active rendering device
pub trait RenderDevice {
    /// Poll device readiness; called before any per-frame work
    fn test_cooperative_level(&mut self) -> CooperativeLevel;

    /// Reapply presentation parameters in place, without recreating the
    /// device
    fn reset(&mut self, params: &PresentationParameters) -> Result<(), ResetError>;

    /// Clear the selected buffers for the upcoming frame
    fn clear(
        &mut self,
        flags: ClearFlags,
        color: [f32; 4],
        depth: f32,
        stencil: u32,
    ) -> Result<(), DeviceError>;

    /// Open the scene for drawing
    fn begin_scene(&mut self) -> Result<(), DeviceError>;

    /// Apply the fixed per-frame render state
    fn apply_render_state(&mut self, state: &FrameRenderState);

    /// Close the scene
    fn end_scene(&mut self) -> Result<(), DeviceError>;

    /// Present the completed back buffer to the display.
    ///
    /// Presentation problems are folded into the next
    /// [`test_cooperative_level`](Self::test_cooperative_level) poll rather
    /// than failing the caller.
    fn present(&mut self);

    /// Allocate a write-only vertex buffer holding `capacity` vertices
    fn create_vertex_buffer(
        &mut self,
        capacity: u32,
    ) -> Result<Box<dyn GpuVertexBuffer>, DeviceError>;

    /// Free texture memory in bytes, if the backend reports it
    fn available_texture_memory(&self) -> Option<u64> {
        None
    }
}

/// Fixed-capacity GPU vertex buffer tied to the device's lifetime
pub trait GpuVertexBuffer {
    /// Capacity in vertices
    fn capacity(&self) -> u32;

    /// Upload vertices starting at the front of the buffer
    fn write(&mut self, vertices: &[SpriteVertex]) -> Result<(), DeviceError>;
}

#[cfg(test)]
pub(crate) mod tests_support {
    //! Minimal scripted adapter shared by display layer tests

    use std::cell::RefCell;

    use super::*;

    /// Adapter that records every compatibility check and accepts either
    /// nothing or a single designated back-buffer format
    pub struct ProbeAdapter {
        /// Back-buffer format to accept; `None` rejects everything
        pub accept: Option<PixelFormat>,
        /// Log of (display, back buffer, windowed) checks in call order
        pub checks: RefCell<Vec<(PixelFormat, PixelFormat, bool)>>,
    }

    impl ProbeAdapter {
        pub fn rejecting_all() -> Self {
            Self {
                accept: None,
                checks: RefCell::new(Vec::new()),
            }
        }
    }

    impl DisplayAdapter for ProbeAdapter {
        fn capabilities(&self) -> Result<DeviceCaps, DeviceError> {
            Ok(DeviceCaps {
                max_texture_width: 2048,
                max_texture_height: 2048,
                max_texture_blend_stages: 8,
                max_simultaneous_textures: 8,
            })
        }

        fn adapter_mode_count(&self) -> u32 {
            0
        }

        fn adapter_mode(&self, _index: u32) -> Option<DisplayMode> {
            None
        }

        fn desktop_mode(&self) -> Result<DisplayMode, DeviceError> {
            Ok(DisplayMode {
                width: 1024,
                height: 768,
                refresh_hz: 60,
                format: PixelFormat::X8R8G8B8,
            })
        }

        fn identifier(&self) -> Result<AdapterIdentifier, DeviceError> {
            Ok(AdapterIdentifier {
                driver: "probe".to_string(),
                description: "scripted test adapter".to_string(),
            })
        }

        fn check_device_format(
            &self,
            display: PixelFormat,
            back_buffer: PixelFormat,
            windowed: bool,
        ) -> bool {
            self.checks.borrow_mut().push((display, back_buffer, windowed));
            self.accept == Some(back_buffer)
        }

        fn create_device(
            &mut self,
            _params: &PresentationParameters,
        ) -> Result<Box<dyn RenderDevice>, DeviceError> {
            Err(DeviceError::Backend("probe adapter has no device".to_string()))
        }
    }
}
