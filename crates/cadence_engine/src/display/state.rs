//! Per-frame render state

use bitflags::bitflags;

bitflags! {
    /// Buffers targeted by a clear operation
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ClearFlags: u32 {
        /// Color render target
        const TARGET = 0b01;
        /// Depth buffer
        const DEPTH = 0b10;
    }
}

/// Polygon culling mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullMode {
    /// Draw both windings; sprites flip freely
    None,
    /// Cull clockwise faces
    Clockwise,
    /// Cull counter-clockwise faces
    CounterClockwise,
}

/// Blend factor for alpha blending
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendFactor {
    /// Source alpha
    SrcAlpha,
    /// One minus source alpha
    InvSrcAlpha,
    /// Constant one
    One,
    /// Constant zero
    Zero,
}

/// Texture sampling filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFilter {
    /// Nearest-texel sampling
    Point,
    /// Bilinear sampling
    Linear,
}

/// Fixed render state applied at the top of every frame.
///
/// Applied unconditionally each frame rather than cached, so state clobbered
/// by external code between frames never leaks into the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRenderState {
    /// Culling mode
    pub cull: CullMode,
    /// Fixed-function lighting toggle
    pub lighting: bool,
    /// Alpha blending toggle
    pub alpha_blend: bool,
    /// Source blend factor
    pub src_blend: BlendFactor,
    /// Destination blend factor
    pub dest_blend: BlendFactor,
    /// Depth test toggle
    pub depth_test: bool,
    /// Minification filter on texture stage 0
    pub min_filter: TextureFilter,
    /// Magnification filter on texture stage 0
    pub mag_filter: TextureFilter,
}

impl Default for FrameRenderState {
    /// The engine's standard sprite state: no culling, no lighting, standard
    /// alpha blending, depth test off, linear filtering
    fn default() -> Self {
        Self {
            cull: CullMode::None,
            lighting: false,
            alpha_blend: true,
            src_blend: BlendFactor::SrcAlpha,
            dest_blend: BlendFactor::InvSrcAlpha,
            depth_test: false,
            min_filter: TextureFilter::Linear,
            mag_filter: TextureFilter::Linear,
        }
    }
}
