//! Sprite vertex format and buffer sizing

use bytemuck::{Pod, Zeroable};

/// Capacity of the engine's single vertex buffer, in vertices.
///
/// Sized for the worst-case screen: every arrow, judgment, and banner quad
/// on screen at once still fits with headroom.
pub const MAX_SPRITE_VERTICES: u32 = 4096;

/// Vertex record for sprite and UI quads
///
/// Matches the fixed-function layout the frame state expects: transformed
/// position, modulate color, and one texture coordinate set.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SpriteVertex {
    /// Position in screen space
    pub position: [f32; 3],
    /// RGBA modulate color in [0.0, 1.0]
    pub color: [f32; 4],
    /// Texture coordinates for stage 0
    pub tex_coord: [f32; 2],
}

impl SpriteVertex {
    /// Size of one vertex in bytes
    pub const STRIDE: usize = std::mem::size_of::<Self>();

    /// Build a vertex from position, color, and texture coordinates
    pub const fn new(position: [f32; 3], color: [f32; 4], tex_coord: [f32; 2]) -> Self {
        Self {
            position,
            color,
            tex_coord,
        }
    }
}
