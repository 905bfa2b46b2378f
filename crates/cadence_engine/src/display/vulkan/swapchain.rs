//! Vulkan swapchain management
//!
//! The swapchain is the backend's realization of the negotiated
//! presentation parameters: extent, format, buffer count, and pacing all
//! come from them. Recreation passes the retired swapchain as
//! `old_swapchain` so in-flight presents drain cleanly.

use ash::extensions::khr::{Surface, Swapchain as SwapchainLoader};
use ash::vk;

use crate::display::presentation::{PresentInterval, PresentationParameters};
use crate::display::vulkan::map_pixel_format;

/// Swapchain wrapper with RAII cleanup
pub struct Swapchain {
    loader: SwapchainLoader,
    swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    format: vk::SurfaceFormatKHR,
    extent: vk::Extent2D,
}

impl Swapchain {
    /// Create a swapchain for the given presentation parameters.
    ///
    /// Pass the retired swapchain's handle (or null on first creation) as
    /// `old_swapchain`.
    pub fn new(
        instance: &ash::Instance,
        device: &ash::Device,
        surface: vk::SurfaceKHR,
        surface_loader: &Surface,
        physical_device: vk::PhysicalDevice,
        params: &PresentationParameters,
        old_swapchain: vk::SwapchainKHR,
    ) -> Result<Self, vk::Result> {
        let loader = SwapchainLoader::new(instance, device);

        let surface_caps = unsafe {
            surface_loader.get_physical_device_surface_capabilities(physical_device, surface)?
        };

        // Negotiation already established the format is presentable; fall
        // back to whatever the surface prefers if the driver disagrees.
        let wanted = map_pixel_format(params.back_buffer_format);
        let surface_formats = unsafe {
            surface_loader.get_physical_device_surface_formats(physical_device, surface)?
        };
        let format = surface_formats
            .iter()
            .find(|sf| sf.format == wanted)
            .or_else(|| surface_formats.first())
            .copied()
            .ok_or(vk::Result::ERROR_FORMAT_NOT_SUPPORTED)?;

        let present_modes = unsafe {
            surface_loader.get_physical_device_surface_present_modes(physical_device, surface)?
        };
        let wanted_mode = match params.presentation_interval {
            PresentInterval::Default => vk::PresentModeKHR::FIFO,
            PresentInterval::Immediate => vk::PresentModeKHR::IMMEDIATE,
        };
        let present_mode = present_modes
            .iter()
            .copied()
            .find(|&mode| mode == wanted_mode)
            .unwrap_or(vk::PresentModeKHR::FIFO);

        let extent = if surface_caps.current_extent.width != u32::MAX {
            surface_caps.current_extent
        } else {
            vk::Extent2D {
                width: params.back_buffer_width.clamp(
                    surface_caps.min_image_extent.width,
                    surface_caps.max_image_extent.width,
                ),
                height: params.back_buffer_height.clamp(
                    surface_caps.min_image_extent.height,
                    surface_caps.max_image_extent.height,
                ),
            }
        };

        let mut image_count = (params.back_buffer_count + 1).max(surface_caps.min_image_count);
        if surface_caps.max_image_count > 0 {
            image_count = image_count.min(surface_caps.max_image_count);
        }

        let create_info = vk::SwapchainCreateInfoKHR::builder()
            .surface(surface)
            .min_image_count(image_count)
            .image_format(format.format)
            .image_color_space(format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            // Cleared via transfer; nothing renders directly into these yet
            .image_usage(
                vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST,
            )
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .pre_transform(surface_caps.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true)
            .old_swapchain(old_swapchain);

        let swapchain = unsafe { loader.create_swapchain(&create_info, None)? };
        let images = unsafe { loader.get_swapchain_images(swapchain)? };

        Ok(Self {
            loader,
            swapchain,
            images,
            format,
            extent,
        })
    }

    /// Get swapchain handle
    pub fn handle(&self) -> vk::SwapchainKHR {
        self.swapchain
    }

    /// Get swapchain loader
    pub fn loader(&self) -> &SwapchainLoader {
        &self.loader
    }

    /// Swapchain images, indexed by acquired image index
    pub fn images(&self) -> &[vk::Image] {
        &self.images
    }

    /// Get surface format
    pub fn format(&self) -> vk::SurfaceFormatKHR {
        self.format
    }

    /// Get swapchain extent
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        unsafe {
            // Images belong to the swapchain; destroying it releases them
            self.loader.destroy_swapchain(self.swapchain, None);
        }
    }
}
