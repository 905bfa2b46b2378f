//! Vulkan adapter: instance ownership, capability probing, device creation

use std::ffi::{CStr, CString};

use ash::extensions::khr::Surface;
use ash::vk;
use log::trace;

use crate::display::backend::{DisplayAdapter, RenderDevice};
use crate::display::caps::{AdapterIdentifier, DeviceCaps, DisplayMode};
use crate::display::error::{DeviceError, DisplayError};
use crate::display::formats::PixelFormat;
use crate::display::presentation::PresentationParameters;
use crate::display::vulkan::device::VulkanDevice;
use crate::display::vulkan::{map_pixel_format, Window};

/// The engine's Vulkan graphics adapter.
///
/// Owns the instance and presentation surface for the lifetime of the
/// process. Capability limits, surface formats, and monitor modes are
/// snapshotted at construction; mode negotiation afterwards is pure lookup.
pub struct VulkanAdapter {
    entry: ash::Entry,
    instance: ash::Instance,
    surface_loader: Surface,
    surface: vk::SurfaceKHR,
    physical_device: vk::PhysicalDevice,
    queue_family_index: u32,
    limits: vk::PhysicalDeviceLimits,
    device_name: String,
    api_version: u32,
    surface_formats: Vec<vk::SurfaceFormatKHR>,
    modes: Vec<DisplayMode>,
    desktop: DisplayMode,
}

impl VulkanAdapter {
    /// Acquire the Vulkan subsystem and probe the adapter.
    ///
    /// Failure anywhere in here is unrecoverable and surfaces as a startup
    /// error; there is no retry.
    pub fn new(window: &mut Window, app_name: &str) -> Result<Self, DisplayError> {
        let entry = unsafe { ash::Entry::load() }
            .map_err(|e| DisplayError::AdapterUnavailable(format!("failed to load Vulkan: {e:?}")))?;

        let app_name_cstr = CString::new(app_name)
            .map_err(|e| DisplayError::AdapterUnavailable(e.to_string()))?;
        let engine_name_cstr = CString::new("CadenceEngine")
            .map_err(|e| DisplayError::AdapterUnavailable(e.to_string()))?;
        let app_info = vk::ApplicationInfo::builder()
            .application_name(&app_name_cstr)
            .application_version(vk::make_api_version(0, 1, 0, 0))
            .engine_name(&engine_name_cstr)
            .engine_version(vk::make_api_version(0, 1, 0, 0))
            .api_version(vk::API_VERSION_1_0);

        let required_extensions = window.get_required_instance_extensions().map_err(|e| {
            DisplayError::AdapterUnavailable(format!("failed to get required extensions: {e}"))
        })?;
        let cstr_extensions: Vec<CString> = required_extensions
            .iter()
            .filter_map(|ext| CString::new(ext.as_str()).ok())
            .collect();
        let extension_ptrs: Vec<*const i8> =
            cstr_extensions.iter().map(|ext| ext.as_ptr()).collect();

        let create_info = vk::InstanceCreateInfo::builder()
            .application_info(&app_info)
            .enabled_extension_names(&extension_ptrs);

        let instance = unsafe { entry.create_instance(&create_info, None) }
            .map_err(|e| DisplayError::AdapterUnavailable(format!("instance creation: {e:?}")))?;

        let surface = match window.create_vulkan_surface(instance.handle()) {
            Ok(surface) => surface,
            Err(e) => {
                unsafe { instance.destroy_instance(None) };
                return Err(DisplayError::AdapterUnavailable(e.to_string()));
            }
        };
        let surface_loader = Surface::new(&entry, &instance);

        let probed = Self::pick_physical_device(&instance, &surface_loader, surface);
        let (physical_device, queue_family_index) = match probed {
            Ok(found) => found,
            Err(e) => {
                unsafe {
                    surface_loader.destroy_surface(surface, None);
                    instance.destroy_instance(None);
                }
                return Err(e);
            }
        };

        let properties = unsafe { instance.get_physical_device_properties(physical_device) };
        let device_name = unsafe { CStr::from_ptr(properties.device_name.as_ptr()) }
            .to_string_lossy()
            .into_owned();

        let surface_formats = unsafe {
            surface_loader.get_physical_device_surface_formats(physical_device, surface)
        }
        .map_err(|e| DisplayError::CapabilityQuery(format!("surface formats: {e:?}")))?;

        let modes: Vec<DisplayMode> = window
            .video_modes()
            .iter()
            .map(Self::mode_from_glfw)
            .collect();
        let desktop = window
            .desktop_video_mode()
            .as_ref()
            .map(Self::mode_from_glfw)
            .ok_or_else(|| {
                DisplayError::DesktopModeQuery("primary monitor reports no mode".to_string())
            })?;

        trace!(
            "Vulkan adapter ready: {device_name}, {} surface formats, {} monitor modes",
            surface_formats.len(),
            modes.len()
        );

        Ok(Self {
            entry,
            instance,
            surface_loader,
            surface,
            physical_device,
            queue_family_index,
            limits: properties.limits,
            device_name,
            api_version: properties.api_version,
            surface_formats,
            modes,
            desktop,
        })
    }

    fn pick_physical_device(
        instance: &ash::Instance,
        surface_loader: &Surface,
        surface: vk::SurfaceKHR,
    ) -> Result<(vk::PhysicalDevice, u32), DisplayError> {
        let devices = unsafe { instance.enumerate_physical_devices() }
            .map_err(|e| DisplayError::AdapterUnavailable(format!("device enumeration: {e:?}")))?;

        for device in devices {
            let families =
                unsafe { instance.get_physical_device_queue_family_properties(device) };
            for (index, family) in families.iter().enumerate() {
                let index = index as u32;
                if !family.queue_flags.contains(vk::QueueFlags::GRAPHICS) {
                    continue;
                }
                let presentable = unsafe {
                    surface_loader.get_physical_device_surface_support(device, index, surface)
                }
                .unwrap_or(false);
                if presentable {
                    return Ok((device, index));
                }
            }
        }

        Err(DisplayError::AdapterUnavailable(
            "no device with a graphics queue that can present to the window".to_string(),
        ))
    }

    /// The loaded Vulkan entry point; kept alive for the adapter's lifetime
    pub fn entry(&self) -> &ash::Entry {
        &self.entry
    }

    fn mode_from_glfw(mode: &glfw::VidMode) -> DisplayMode {
        let format = match (mode.red_bits, mode.green_bits, mode.blue_bits) {
            (5, 6, 5) => PixelFormat::R5G6B5,
            (5, 5, 5) => PixelFormat::X1R5G5B5,
            _ => PixelFormat::X8R8G8B8,
        };
        DisplayMode {
            width: mode.width,
            height: mode.height,
            refresh_hz: mode.refresh_rate,
            format,
        }
    }
}

impl DisplayAdapter for VulkanAdapter {
    fn capabilities(&self) -> Result<DeviceCaps, DeviceError> {
        Ok(DeviceCaps {
            max_texture_width: self.limits.max_image_dimension2_d,
            max_texture_height: self.limits.max_image_dimension2_d,
            max_texture_blend_stages: self.limits.max_color_attachments,
            max_simultaneous_textures: self.limits.max_per_stage_descriptor_samplers,
        })
    }

    fn adapter_mode_count(&self) -> u32 {
        self.modes.len() as u32
    }

    fn adapter_mode(&self, index: u32) -> Option<DisplayMode> {
        self.modes.get(index as usize).copied()
    }

    fn desktop_mode(&self) -> Result<DisplayMode, DeviceError> {
        Ok(self.desktop)
    }

    fn identifier(&self) -> Result<AdapterIdentifier, DeviceError> {
        Ok(AdapterIdentifier {
            driver: format!(
                "Vulkan {}.{}.{}",
                vk::api_version_major(self.api_version),
                vk::api_version_minor(self.api_version),
                vk::api_version_patch(self.api_version)
            ),
            description: self.device_name.clone(),
        })
    }

    fn check_device_format(
        &self,
        _display: PixelFormat,
        back_buffer: PixelFormat,
        _windowed: bool,
    ) -> bool {
        // Vulkan draws no windowed/fullscreen distinction at the format
        // level; compatibility is whether the surface can present it.
        let wanted = map_pixel_format(back_buffer);
        self.surface_formats.iter().any(|sf| sf.format == wanted)
    }

    fn create_device(
        &mut self,
        params: &PresentationParameters,
    ) -> Result<Box<dyn RenderDevice>, DeviceError> {
        let device = VulkanDevice::new(
            &self.instance,
            self.physical_device,
            self.queue_family_index,
            self.surface_loader.clone(),
            self.surface,
            params,
        )?;
        Ok(Box::new(device))
    }
}

impl Drop for VulkanAdapter {
    fn drop(&mut self) {
        unsafe {
            self.surface_loader.destroy_surface(self.surface, None);
            self.instance.destroy_instance(None);
        }
    }
}
