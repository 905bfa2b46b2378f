//! Display and device management
//!
//! Owns the graphics adapter, negotiates pixel formats across
//! windowed/fullscreen switches, manages device creation and reset, and
//! drives the per-frame begin/end/present cycle. Everything below talks to
//! the backend through the traits in [`backend`]; the shipping backend
//! lives in [`vulkan`].

pub mod backend;
pub mod caps;
mod display;
pub mod error;
pub mod formats;
pub mod presentation;
pub mod state;
pub mod vertex;
pub mod vulkan;

pub use backend::{CooperativeLevel, DisplayAdapter, GpuVertexBuffer, RenderDevice};
pub use caps::{AdapterIdentifier, DeviceCaps, DisplayMode};
pub use display::{Display, FrameStatus};
pub use error::{DeviceError, DisplayError, NegotiationError, ResetError};
pub use formats::{DepthFormat, NegotiatedFormats, PixelFormat};
pub use presentation::{PresentInterval, PresentationParameters, SwapEffect};
pub use state::{BlendFactor, ClearFlags, CullMode, FrameRenderState, TextureFilter};
pub use vertex::{SpriteVertex, MAX_SPRITE_VERTICES};
