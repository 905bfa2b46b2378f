//! Vulkan display backend
//!
//! ash-based implementation of the display backend traits, plus the GLFW
//! window wrapper it presents into. Unsafe Vulkan calls are confined to
//! this module; everything is wrapped in RAII types so teardown happens on
//! every exit path.

mod adapter;
mod device;
mod swapchain;
mod window;

pub use adapter::VulkanAdapter;
pub use device::VulkanDevice;
pub use window::{Window, WindowError, WindowResult};

use ash::vk;

use crate::display::formats::PixelFormat;

/// Closest presentable Vulkan equivalent of each engine pixel format
pub(crate) fn map_pixel_format(format: PixelFormat) -> vk::Format {
    match format {
        PixelFormat::R5G6B5 => vk::Format::R5G6B5_UNORM_PACK16,
        PixelFormat::X1R5G5B5 | PixelFormat::A1R5G5B5 => vk::Format::A1R5G5B5_UNORM_PACK16,
        PixelFormat::R8G8B8 => vk::Format::R8G8B8_UNORM,
        PixelFormat::X8R8G8B8 => vk::Format::B8G8R8A8_UNORM,
        PixelFormat::A8R8G8B8 => vk::Format::B8G8R8A8_SRGB,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_mapping_preserves_color_depth_class() {
        for format in [
            PixelFormat::R5G6B5,
            PixelFormat::X1R5G5B5,
            PixelFormat::A1R5G5B5,
        ] {
            let mapped = map_pixel_format(format);
            assert!(matches!(
                mapped,
                vk::Format::R5G6B5_UNORM_PACK16 | vk::Format::A1R5G5B5_UNORM_PACK16
            ));
        }
    }
}
