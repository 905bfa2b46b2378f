//! # Cadence Engine
//!
//! A rhythm game engine built around a hardware-accelerated display layer.
//!
//! ## Features
//!
//! - **Display Abstraction**: device lifecycle, mode negotiation, and frame
//!   presentation behind a backend-agnostic interface
//! - **Vulkan Backend**: ash-based implementation with GLFW windowing
//! - **Recoverable Failures**: device-lost and needs-reset surfaced as
//!   pollable statuses, never panics
//! - **Configuration**: TOML/RON display settings
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cadence_engine::display::{Display, FrameStatus};
//! use cadence_engine::display::vulkan::{VulkanAdapter, Window};
//! use cadence_engine::foundation::time::SystemClock;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut window = Window::new("Cadence", 640, 480)?;
//!     let adapter = VulkanAdapter::new(&mut window, "Cadence")?;
//!     let mut display = Display::new(Box::new(adapter), Box::new(SystemClock::new()))?;
//!
//!     if !display.switch_display_mode(true, 640, 480, 16, 0)? {
//!         return Err("no compatible display mode".into());
//!     }
//!
//!     while !window.should_close() {
//!         window.poll_events();
//!         match display.begin_frame() {
//!             FrameStatus::Ready => {
//!                 // draw the current screen here
//!                 display.end_frame();
//!                 display.show_frame();
//!             }
//!             // device comes back on its own (e.g. after alt-tab); keep polling
//!             FrameStatus::DeviceLost => {}
//!             FrameStatus::NeedsReset => {
//!                 display.switch_display_mode(true, 640, 480, 16, 0)?;
//!             }
//!             FrameStatus::SceneOpenFailed => break,
//!         }
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod display;
pub mod foundation;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        config::{Config, DisplaySettings},
        display::{
            CooperativeLevel, Display, DisplayError, FrameStatus, PixelFormat,
            PresentationParameters, SpriteVertex,
        },
        foundation::time::{SystemClock, TimeSource},
    };
}
