//! Vulkan render device
//!
//! Maps the device contract onto Vulkan: the cooperative level is derived
//! from acquire/present results (out-of-date becomes needs-reset, a lost
//! surface or device becomes lost), reset recreates the swapchain in place,
//! and the per-frame path is acquire, clear via transfer, submit, present.

use ash::extensions::khr::{Surface, Swapchain as SwapchainLoader};
use ash::vk;
use log::warn;

use crate::display::backend::{CooperativeLevel, GpuVertexBuffer, RenderDevice};
use crate::display::error::{DeviceError, ResetError};
use crate::display::presentation::PresentationParameters;
use crate::display::state::{ClearFlags, FrameRenderState};
use crate::display::vertex::SpriteVertex;
use crate::display::vulkan::swapchain::Swapchain;

fn backend_err(result: vk::Result) -> DeviceError {
    DeviceError::Backend(format!("{result:?}"))
}

/// Find a memory type satisfying the filter and property requirements
fn find_memory_type(
    type_filter: u32,
    properties: vk::MemoryPropertyFlags,
    memory_properties: &vk::PhysicalDeviceMemoryProperties,
) -> Option<u32> {
    (0..memory_properties.memory_type_count).find(|&i| {
        (type_filter & (1 << i)) != 0
            && memory_properties.memory_types[i as usize]
                .property_flags
                .contains(properties)
    })
}

const COLOR_RANGE: vk::ImageSubresourceRange = vk::ImageSubresourceRange {
    aspect_mask: vk::ImageAspectFlags::COLOR,
    base_mip_level: 0,
    level_count: 1,
    base_array_layer: 0,
    layer_count: 1,
};

const DEPTH_RANGE: vk::ImageSubresourceRange = vk::ImageSubresourceRange {
    aspect_mask: vk::ImageAspectFlags::DEPTH,
    base_mip_level: 0,
    level_count: 1,
    base_array_layer: 0,
    layer_count: 1,
};

struct PendingClear {
    flags: ClearFlags,
    color: [f32; 4],
    depth: f32,
    stencil: u32,
}

/// Depth image backing the device's auto depth-stencil surface
struct DepthImage {
    device: ash::Device,
    image: vk::Image,
    memory: vk::DeviceMemory,
}

impl DepthImage {
    fn new(
        device: &ash::Device,
        extent: vk::Extent2D,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
    ) -> Result<Self, DeviceError> {
        let image_info = vk::ImageCreateInfo::builder()
            .image_type(vk::ImageType::TYPE_2D)
            .extent(vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .format(vk::Format::D16_UNORM)
            .tiling(vk::ImageTiling::OPTIMAL)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .usage(
                vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST,
            )
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .samples(vk::SampleCountFlags::TYPE_1);

        let image =
            unsafe { device.create_image(&image_info, None) }.map_err(backend_err)?;

        let requirements = unsafe { device.get_image_memory_requirements(image) };
        let Some(memory_type_index) = find_memory_type(
            requirements.memory_type_bits,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
            memory_properties,
        ) else {
            unsafe { device.destroy_image(image, None) };
            return Err(DeviceError::Allocation {
                bytes: requirements.size as usize,
                reason: "no suitable memory type for depth image".to_string(),
            });
        };

        let alloc_info = vk::MemoryAllocateInfo::builder()
            .allocation_size(requirements.size)
            .memory_type_index(memory_type_index);
        let memory = match unsafe { device.allocate_memory(&alloc_info, None) } {
            Ok(memory) => memory,
            Err(e) => {
                unsafe { device.destroy_image(image, None) };
                return Err(DeviceError::Allocation {
                    bytes: requirements.size as usize,
                    reason: format!("{e:?}"),
                });
            }
        };

        if let Err(e) = unsafe { device.bind_image_memory(image, memory, 0) } {
            unsafe {
                device.destroy_image(image, None);
                device.free_memory(memory, None);
            }
            return Err(backend_err(e));
        }

        Ok(Self {
            device: device.clone(),
            image,
            memory,
        })
    }
}

impl Drop for DepthImage {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_image(self.image, None);
            self.device.free_memory(self.memory, None);
        }
    }
}

/// The active rendering device.
///
/// Created with a single graphics+present queue and one recorded frame at a
/// time, matching the engine's single-threaded frame loop.
pub struct VulkanDevice {
    instance: ash::Instance,
    physical_device: vk::PhysicalDevice,
    surface_loader: Surface,
    surface: vk::SurfaceKHR,
    queue_family_index: u32,
    device: ash::Device,
    queue: vk::Queue,
    command_pool: vk::CommandPool,
    command_buffer: vk::CommandBuffer,
    image_available: vk::Semaphore,
    render_finished: vk::Semaphore,
    in_flight: vk::Fence,
    swapchain: Option<Swapchain>,
    depth: Option<DepthImage>,
    memory_properties: vk::PhysicalDeviceMemoryProperties,
    cooperative: CooperativeLevel,
    acquired_image: Option<u32>,
    pending_clear: Option<PendingClear>,
    frame_state: FrameRenderState,
    recording: bool,
    submitted: bool,
}

impl VulkanDevice {
    /// Create the logical device, frame resources, and initial swapchain
    pub fn new(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        queue_family_index: u32,
        surface_loader: Surface,
        surface: vk::SurfaceKHR,
        params: &PresentationParameters,
    ) -> Result<Self, DeviceError> {
        let priorities = [1.0_f32];
        let queue_info = vk::DeviceQueueCreateInfo::builder()
            .queue_family_index(queue_family_index)
            .queue_priorities(&priorities);
        let queue_infos = [queue_info.build()];
        let extensions = [SwapchainLoader::name().as_ptr()];
        let features = vk::PhysicalDeviceFeatures::default();

        let device_info = vk::DeviceCreateInfo::builder()
            .queue_create_infos(&queue_infos)
            .enabled_extension_names(&extensions)
            .enabled_features(&features);

        let device = unsafe { instance.create_device(physical_device, &device_info, None) }
            .map_err(backend_err)?;
        let queue = unsafe { device.get_device_queue(queue_family_index, 0) };
        let memory_properties =
            unsafe { instance.get_physical_device_memory_properties(physical_device) };

        // Resources are filled in below; on any failure the partially
        // built device is torn down by Drop.
        let mut this = Self {
            instance: instance.clone(),
            physical_device,
            surface_loader,
            surface,
            queue_family_index,
            device,
            queue,
            command_pool: vk::CommandPool::null(),
            command_buffer: vk::CommandBuffer::null(),
            image_available: vk::Semaphore::null(),
            render_finished: vk::Semaphore::null(),
            in_flight: vk::Fence::null(),
            swapchain: None,
            depth: None,
            memory_properties,
            cooperative: CooperativeLevel::Ready,
            acquired_image: None,
            pending_clear: None,
            frame_state: FrameRenderState::default(),
            recording: false,
            submitted: false,
        };
        this.create_frame_resources(params)?;
        Ok(this)
    }

    fn create_frame_resources(
        &mut self,
        params: &PresentationParameters,
    ) -> Result<(), DeviceError> {
        let pool_info = vk::CommandPoolCreateInfo::builder()
            .queue_family_index(self.queue_family_index)
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
        self.command_pool = unsafe { self.device.create_command_pool(&pool_info, None) }
            .map_err(backend_err)?;

        let alloc_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(self.command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);
        self.command_buffer = unsafe { self.device.allocate_command_buffers(&alloc_info) }
            .map_err(backend_err)?
            .first()
            .copied()
            .ok_or_else(|| DeviceError::Backend("no command buffer allocated".to_string()))?;

        let semaphore_info = vk::SemaphoreCreateInfo::default();
        self.image_available = unsafe { self.device.create_semaphore(&semaphore_info, None) }
            .map_err(backend_err)?;
        self.render_finished = unsafe { self.device.create_semaphore(&semaphore_info, None) }
            .map_err(backend_err)?;

        // Starts signaled so the first frame doesn't wait on anything
        let fence_info = vk::FenceCreateInfo::builder().flags(vk::FenceCreateFlags::SIGNALED);
        self.in_flight =
            unsafe { self.device.create_fence(&fence_info, None) }.map_err(backend_err)?;

        let swapchain = Swapchain::new(
            &self.instance,
            &self.device,
            self.surface,
            &self.surface_loader,
            self.physical_device,
            params,
            vk::SwapchainKHR::null(),
        )
        .map_err(backend_err)?;

        if params.enable_auto_depth_stencil {
            self.depth = Some(DepthImage::new(
                &self.device,
                swapchain.extent(),
                &self.memory_properties,
            )?);
        }
        self.swapchain = Some(swapchain);
        Ok(())
    }

    /// The render state most recently applied for this frame; consumed when
    /// sprite pipelines are built
    pub fn frame_state(&self) -> &FrameRenderState {
        &self.frame_state
    }

    fn transition_image(
        &self,
        image: vk::Image,
        range: vk::ImageSubresourceRange,
        old_layout: vk::ImageLayout,
        new_layout: vk::ImageLayout,
        src_access: vk::AccessFlags,
        dst_access: vk::AccessFlags,
        src_stage: vk::PipelineStageFlags,
        dst_stage: vk::PipelineStageFlags,
    ) {
        let barrier = vk::ImageMemoryBarrier::builder()
            .old_layout(old_layout)
            .new_layout(new_layout)
            .src_access_mask(src_access)
            .dst_access_mask(dst_access)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(image)
            .subresource_range(range);

        unsafe {
            self.device.cmd_pipeline_barrier(
                self.command_buffer,
                src_stage,
                dst_stage,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[barrier.build()],
            );
        }
    }
}

impl RenderDevice for VulkanDevice {
    fn test_cooperative_level(&mut self) -> CooperativeLevel {
        self.cooperative
    }

    fn reset(&mut self, params: &PresentationParameters) -> Result<(), ResetError> {
        unsafe { self.device.device_wait_idle() }
            .map_err(|e| ResetError::TryAgain(format!("wait idle: {e:?}")))?;

        // Depth references the outgoing extent; rebuild it after the
        // swapchain settles.
        self.depth = None;

        let old = self.swapchain.take();
        let old_handle = old
            .as_ref()
            .map_or_else(vk::SwapchainKHR::null, Swapchain::handle);
        let result = Swapchain::new(
            &self.instance,
            &self.device,
            self.surface,
            &self.surface_loader,
            self.physical_device,
            params,
            old_handle,
        );
        drop(old);

        let swapchain = match result {
            Ok(swapchain) => swapchain,
            Err(vk::Result::ERROR_SURFACE_LOST_KHR | vk::Result::ERROR_DEVICE_LOST) => {
                return Err(ResetError::DeviceRemoved(
                    "surface or device lost during reset".to_string(),
                ));
            }
            Err(e) => {
                self.cooperative = CooperativeLevel::NeedsReset;
                return Err(ResetError::TryAgain(format!("{e:?}")));
            }
        };

        if params.enable_auto_depth_stencil {
            self.depth = Some(
                DepthImage::new(&self.device, swapchain.extent(), &self.memory_properties)
                    .map_err(|e| ResetError::TryAgain(e.to_string()))?,
            );
        }
        self.swapchain = Some(swapchain);

        self.cooperative = CooperativeLevel::Ready;
        self.acquired_image = None;
        self.pending_clear = None;
        self.recording = false;
        self.submitted = false;
        Ok(())
    }

    fn clear(
        &mut self,
        flags: ClearFlags,
        color: [f32; 4],
        depth: f32,
        stencil: u32,
    ) -> Result<(), DeviceError> {
        // Recorded when the scene opens; clears always precede drawing
        self.pending_clear = Some(PendingClear {
            flags,
            color,
            depth,
            stencil,
        });
        Ok(())
    }

    fn begin_scene(&mut self) -> Result<(), DeviceError> {
        let Some(swapchain) = self.swapchain.as_ref() else {
            return Err(DeviceError::SceneOpen("no swapchain exists".to_string()));
        };

        unsafe { self.device.wait_for_fences(&[self.in_flight], true, u64::MAX) }
            .map_err(|e| DeviceError::SceneOpen(format!("fence wait: {e:?}")))?;

        let image_index = match unsafe {
            swapchain.loader().acquire_next_image(
                swapchain.handle(),
                u64::MAX,
                self.image_available,
                vk::Fence::null(),
            )
        } {
            Ok((index, _suboptimal)) => index,
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                self.cooperative = CooperativeLevel::NeedsReset;
                return Err(DeviceError::SceneOpen("swapchain out of date".to_string()));
            }
            Err(vk::Result::ERROR_SURFACE_LOST_KHR | vk::Result::ERROR_DEVICE_LOST) => {
                self.cooperative = CooperativeLevel::Lost;
                return Err(DeviceError::SceneOpen("device lost".to_string()));
            }
            Err(e) => return Err(DeviceError::SceneOpen(format!("{e:?}"))),
        };

        let image = swapchain
            .images()
            .get(image_index as usize)
            .copied()
            .ok_or_else(|| DeviceError::SceneOpen("acquired image out of range".to_string()))?;

        let begin_info = vk::CommandBufferBeginInfo::builder()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        unsafe { self.device.begin_command_buffer(self.command_buffer, &begin_info) }
            .map_err(|e| DeviceError::SceneOpen(format!("command buffer begin: {e:?}")))?;

        self.transition_image(
            image,
            COLOR_RANGE,
            vk::ImageLayout::UNDEFINED,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            vk::AccessFlags::empty(),
            vk::AccessFlags::TRANSFER_WRITE,
            vk::PipelineStageFlags::TOP_OF_PIPE,
            vk::PipelineStageFlags::TRANSFER,
        );

        if let Some(clear) = self.pending_clear.take() {
            if clear.flags.contains(ClearFlags::TARGET) {
                let value = vk::ClearColorValue {
                    float32: clear.color,
                };
                unsafe {
                    self.device.cmd_clear_color_image(
                        self.command_buffer,
                        image,
                        vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                        &value,
                        &[COLOR_RANGE],
                    );
                }
            }
            if clear.flags.contains(ClearFlags::DEPTH) {
                if let Some(depth_image) = self.depth.as_ref() {
                    self.transition_image(
                        depth_image.image,
                        DEPTH_RANGE,
                        vk::ImageLayout::UNDEFINED,
                        vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                        vk::AccessFlags::empty(),
                        vk::AccessFlags::TRANSFER_WRITE,
                        vk::PipelineStageFlags::TOP_OF_PIPE,
                        vk::PipelineStageFlags::TRANSFER,
                    );
                    let value = vk::ClearDepthStencilValue {
                        depth: clear.depth,
                        stencil: clear.stencil,
                    };
                    unsafe {
                        self.device.cmd_clear_depth_stencil_image(
                            self.command_buffer,
                            depth_image.image,
                            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                            &value,
                            &[DEPTH_RANGE],
                        );
                    }
                }
            }
        }

        self.acquired_image = Some(image_index);
        self.recording = true;
        self.submitted = false;
        Ok(())
    }

    fn apply_render_state(&mut self, state: &FrameRenderState) {
        self.frame_state = *state;
    }

    fn end_scene(&mut self) -> Result<(), DeviceError> {
        if !self.recording {
            return Ok(());
        }
        self.recording = false;

        let image = self
            .swapchain
            .as_ref()
            .zip(self.acquired_image)
            .and_then(|(swapchain, index)| swapchain.images().get(index as usize).copied())
            .ok_or_else(|| DeviceError::Backend("no acquired image to finish".to_string()))?;

        self.transition_image(
            image,
            COLOR_RANGE,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            vk::ImageLayout::PRESENT_SRC_KHR,
            vk::AccessFlags::TRANSFER_WRITE,
            vk::AccessFlags::empty(),
            vk::PipelineStageFlags::TRANSFER,
            vk::PipelineStageFlags::BOTTOM_OF_PIPE,
        );

        unsafe { self.device.end_command_buffer(self.command_buffer) }.map_err(backend_err)?;

        // Reset the fence only now that a submission is certain
        unsafe { self.device.reset_fences(&[self.in_flight]) }.map_err(backend_err)?;

        let wait_semaphores = [self.image_available];
        let wait_stages = [vk::PipelineStageFlags::TRANSFER];
        let command_buffers = [self.command_buffer];
        let signal_semaphores = [self.render_finished];
        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        match unsafe {
            self.device
                .queue_submit(self.queue, &[submit_info.build()], self.in_flight)
        } {
            Ok(()) => {
                self.submitted = true;
                Ok(())
            }
            Err(vk::Result::ERROR_DEVICE_LOST) => {
                self.cooperative = CooperativeLevel::Lost;
                Err(backend_err(vk::Result::ERROR_DEVICE_LOST))
            }
            Err(e) => Err(backend_err(e)),
        }
    }

    fn present(&mut self) {
        if !self.submitted {
            self.acquired_image = None;
            return;
        }
        self.submitted = false;

        let (Some(swapchain), Some(image_index)) =
            (self.swapchain.as_ref(), self.acquired_image.take())
        else {
            return;
        };

        let wait_semaphores = [self.render_finished];
        let swapchains = [swapchain.handle()];
        let image_indices = [image_index];
        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        match unsafe { swapchain.loader().queue_present(self.queue, &present_info) } {
            Ok(false) => {}
            Ok(true) => {
                // Suboptimal: still presented, but the buffers no longer
                // match the surface
                self.cooperative = CooperativeLevel::NeedsReset;
            }
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                warn!("swapchain out of date during present");
                self.cooperative = CooperativeLevel::NeedsReset;
            }
            Err(vk::Result::ERROR_SURFACE_LOST_KHR | vk::Result::ERROR_DEVICE_LOST) => {
                warn!("device lost during present");
                self.cooperative = CooperativeLevel::Lost;
            }
            Err(e) => warn!("present failed: {e:?}"),
        }
    }

    fn create_vertex_buffer(
        &mut self,
        capacity: u32,
    ) -> Result<Box<dyn GpuVertexBuffer>, DeviceError> {
        let buffer = VulkanVertexBuffer::new(self.device.clone(), &self.memory_properties, capacity)?;
        Ok(Box::new(buffer))
    }

    fn available_texture_memory(&self) -> Option<u64> {
        let heaps = &self.memory_properties.memory_heaps
            [..self.memory_properties.memory_heap_count as usize];
        Some(
            heaps
                .iter()
                .filter(|heap| heap.flags.contains(vk::MemoryHeapFlags::DEVICE_LOCAL))
                .map(|heap| heap.size)
                .sum(),
        )
    }
}

impl Drop for VulkanDevice {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();
        }
        // Child resources first; they hold clones of the logical device
        self.depth = None;
        self.swapchain = None;
        unsafe {
            if self.in_flight != vk::Fence::null() {
                self.device.destroy_fence(self.in_flight, None);
            }
            if self.render_finished != vk::Semaphore::null() {
                self.device.destroy_semaphore(self.render_finished, None);
            }
            if self.image_available != vk::Semaphore::null() {
                self.device.destroy_semaphore(self.image_available, None);
            }
            if self.command_pool != vk::CommandPool::null() {
                self.device.destroy_command_pool(self.command_pool, None);
            }
            self.device.destroy_device(None);
        }
    }
}

/// Host-visible, write-only vertex buffer
pub struct VulkanVertexBuffer {
    device: ash::Device,
    buffer: vk::Buffer,
    memory: vk::DeviceMemory,
    capacity: u32,
}

impl VulkanVertexBuffer {
    fn new(
        device: ash::Device,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
        capacity: u32,
    ) -> Result<Self, DeviceError> {
        let size = u64::from(capacity) * SpriteVertex::STRIDE as u64;
        let buffer_info = vk::BufferCreateInfo::builder()
            .size(size)
            .usage(vk::BufferUsageFlags::VERTEX_BUFFER)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer =
            unsafe { device.create_buffer(&buffer_info, None) }.map_err(backend_err)?;

        let requirements = unsafe { device.get_buffer_memory_requirements(buffer) };
        let Some(memory_type_index) = find_memory_type(
            requirements.memory_type_bits,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
            memory_properties,
        ) else {
            unsafe { device.destroy_buffer(buffer, None) };
            return Err(DeviceError::Allocation {
                bytes: size as usize,
                reason: "no suitable memory type for vertex buffer".to_string(),
            });
        };

        let alloc_info = vk::MemoryAllocateInfo::builder()
            .allocation_size(requirements.size)
            .memory_type_index(memory_type_index);
        let memory = match unsafe { device.allocate_memory(&alloc_info, None) } {
            Ok(memory) => memory,
            Err(e) => {
                unsafe { device.destroy_buffer(buffer, None) };
                return Err(DeviceError::Allocation {
                    bytes: size as usize,
                    reason: format!("{e:?}"),
                });
            }
        };

        if let Err(e) = unsafe { device.bind_buffer_memory(buffer, memory, 0) } {
            unsafe {
                device.destroy_buffer(buffer, None);
                device.free_memory(memory, None);
            }
            return Err(backend_err(e));
        }

        Ok(Self {
            device,
            buffer,
            memory,
            capacity,
        })
    }

    /// Get buffer handle
    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }
}

impl GpuVertexBuffer for VulkanVertexBuffer {
    fn capacity(&self) -> u32 {
        self.capacity
    }

    fn write(&mut self, vertices: &[SpriteVertex]) -> Result<(), DeviceError> {
        if vertices.len() > self.capacity as usize {
            return Err(DeviceError::Backend(format!(
                "vertex count {} exceeds buffer capacity {}",
                vertices.len(),
                self.capacity
            )));
        }

        let bytes: &[u8] = bytemuck::cast_slice(vertices);
        let mapped = unsafe {
            self.device.map_memory(
                self.memory,
                0,
                bytes.len() as u64,
                vk::MemoryMapFlags::empty(),
            )
        }
        .map_err(backend_err)?;

        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), mapped.cast::<u8>(), bytes.len());
            self.device.unmap_memory(self.memory);
        }
        Ok(())
    }
}

impl Drop for VulkanVertexBuffer {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_buffer(self.buffer, None);
            self.device.free_memory(self.memory, None);
        }
    }
}
