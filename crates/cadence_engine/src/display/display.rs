//! Display lifecycle and frame controller
//!
//! [`Display`] is the single owner of the adapter, the rendering device,
//! and the device's presentation parameters. Mode switches and frame
//! operations all run on the rendering thread; nothing here locks, and the
//! caller's frame loop enforces ordering.

use log::{debug, error, trace, warn};

use crate::display::backend::{CooperativeLevel, DisplayAdapter, GpuVertexBuffer, RenderDevice};
use crate::display::caps::{DeviceCaps, DisplayMode};
use crate::display::error::{DisplayError, NegotiationError, ResetError};
use crate::display::formats;
use crate::display::presentation::PresentationParameters;
use crate::display::state::{ClearFlags, FrameRenderState};
use crate::display::vertex::MAX_SPRITE_VERTICES;
use crate::foundation::time::TimeSource;

/// Outcome of a per-frame operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// The operation completed and rendering may proceed
    Ready,
    /// The device is temporarily unusable; poll again later, typically
    /// after the window regains focus
    DeviceLost,
    /// The device needs a mode switch or reset before rendering can resume
    NeedsReset,
    /// Opening the scene failed; this frame is abandoned
    SceneOpenFailed,
}

/// The display and device manager.
///
/// The device is lazily created by the first successful
/// [`switch_display_mode`](Self::switch_display_mode) and survives later
/// switches via reset. There is no exposed "created but broken" state: the
/// device is either absent or valid-and-resettable.
pub struct Display {
    // Field order is drop order: GPU resources before the device that
    // allocated them, the device before the adapter's instance.
    vertex_buffer: Option<Box<dyn GpuVertexBuffer>>,
    device: Option<Box<dyn RenderDevice>>,
    adapter: Box<dyn DisplayAdapter>,
    clock: Box<dyn TimeSource>,
    caps: DeviceCaps,
    desktop_mode: DisplayMode,
    params: Option<PresentationParameters>,
    scene_open: bool,
    last_fps_sample: f32,
    frames_since_sample: u32,
    fps: f32,
}

impl Display {
    /// Probe the adapter and build the display manager.
    ///
    /// Queries capability limits (failure is fatal), logs the adapter's
    /// supported modes (unreadable entries are skipped), and captures the
    /// desktop mode for windowed-format selection. No device is created
    /// yet.
    pub fn new(
        adapter: Box<dyn DisplayAdapter>,
        clock: Box<dyn TimeSource>,
    ) -> Result<Self, DisplayError> {
        trace!("Display::new()");

        let caps = adapter
            .capabilities()
            .map_err(|e| DisplayError::CapabilityQuery(e.to_string()))?;

        trace!(
            "Video card info:\n \
             - max texture width is {}\n \
             - max texture height is {}\n \
             - max texture blend stages is {}\n \
             - max simultaneous textures is {}",
            caps.max_texture_width,
            caps.max_texture_height,
            caps.max_texture_blend_stages,
            caps.max_simultaneous_textures,
        );

        trace!("This display adapter supports the following modes:");
        for index in 0..adapter.adapter_mode_count() {
            if let Some(mode) = adapter.adapter_mode(index) {
                trace!(
                    "  {}x{} {}Hz, format {:?}",
                    mode.width,
                    mode.height,
                    mode.refresh_hz,
                    mode.format
                );
            }
        }

        let desktop_mode = adapter
            .desktop_mode()
            .map_err(|e| DisplayError::DesktopModeQuery(e.to_string()))?;

        let start = clock.seconds_since_start();
        Ok(Self {
            vertex_buffer: None,
            device: None,
            adapter,
            clock,
            caps,
            desktop_mode,
            params: None,
            scene_open: false,
            last_fps_sample: start,
            frames_since_sample: 0,
            fps: 0.0,
        })
    }

    /// Switch to a new display mode.
    ///
    /// Returns `Ok(true)` when the mode took effect, `Ok(false)` for
    /// recoverable failures (no compatible format, creation or reset
    /// refused) with the prior display state left intact, and `Err` only
    /// for the fatal vertex-buffer allocation path.
    pub fn switch_display_mode(
        &mut self,
        windowed: bool,
        width: u32,
        height: u32,
        bpp: u32,
        fullscreen_hz: u32,
    ) -> Result<bool, DisplayError> {
        trace!(
            "Display::switch_display_mode({windowed}, {width}, {height}, {bpp}, {fullscreen_hz})"
        );

        let negotiated = match formats::negotiate(
            self.adapter.as_ref(),
            &self.desktop_mode,
            windowed,
            width,
            height,
            bpp,
        ) {
            Ok(negotiated) => negotiated,
            Err(e @ NegotiationError::UnsupportedBitDepth { .. }) => {
                error!("{e}");
                return Ok(false);
            }
            Err(e) => {
                warn!("{e}");
                return Ok(false);
            }
        };

        let params =
            PresentationParameters::for_mode(&negotiated, windowed, width, height, fullscreen_hz);
        trace!("Present parameters: {params:?}");

        if let Some(mut device) = self.device.take() {
            // Device already exists; just reset it.
            match device.reset(&params) {
                Ok(()) => {
                    self.device = Some(device);
                }
                Err(ResetError::TryAgain(e)) => {
                    warn!("failed to reset device: {windowed}, {width}, {height}, {bpp}: {e}");
                    self.device = Some(device);
                    return Ok(false);
                }
                Err(ResetError::DeviceRemoved(e)) => {
                    // The next switch recreates from scratch.
                    warn!("device removed during reset: {e}");
                    self.vertex_buffer = None;
                    return Ok(false);
                }
            }
        } else {
            match self.adapter.identifier() {
                Ok(id) => trace!("Driver: {}.  Description: {}.", id.driver, id.description),
                Err(e) => {
                    warn!("adapter identifier query failed: {e}");
                    return Ok(false);
                }
            }

            let device = match self.adapter.create_device(&params) {
                Ok(device) => device,
                Err(e) => {
                    warn!("failed to create device: {windowed}, {width}, {height}, {bpp}: {e}");
                    return Ok(false);
                }
            };
            if let Some(bytes) = device.available_texture_memory() {
                trace!("Video card info:\n - available texture mem is {bytes}");
            }
            self.device = Some(device);

            if self.vertex_buffer.is_none() {
                self.create_vertex_buffer()?;
            }
        }

        self.params = Some(params);
        trace!("Mode change was successful.");

        // Run one full frame cycle so leftover video memory from the
        // previous mode never reaches the screen.
        self.begin_frame();
        self.end_frame();
        self.show_frame();

        Ok(true)
    }

    /// Reapply the current presentation parameters to the device.
    ///
    /// Used by recovery flows after a [`FrameStatus::NeedsReset`] poll when
    /// the mode itself has not changed.
    pub fn reset(&mut self) -> Result<(), ResetError> {
        let Some(params) = self.params.clone() else {
            return Err(ResetError::TryAgain(
                "no presentation parameters negotiated yet".to_string(),
            ));
        };
        let Some(mut device) = self.device.take() else {
            return Err(ResetError::TryAgain("no device to reset".to_string()));
        };

        match device.reset(&params) {
            Ok(()) => {
                self.device = Some(device);
                Ok(())
            }
            Err(ResetError::TryAgain(e)) => {
                self.device = Some(device);
                Err(ResetError::TryAgain(e))
            }
            Err(ResetError::DeviceRemoved(e)) => {
                warn!("device removed during reset: {e}");
                self.vertex_buffer = None;
                Err(ResetError::DeviceRemoved(e))
            }
        }
    }

    /// Start a frame: poll device readiness, clear, and open the scene.
    ///
    /// A lost or reset-pending device returns early with nothing touched;
    /// the caller polls on its own schedule. On success the fixed per-frame
    /// render state is applied unconditionally, so state clobbered between
    /// frames never carries over.
    pub fn begin_frame(&mut self) -> FrameStatus {
        let Some(device) = self.device.as_mut() else {
            // No device yet; a mode switch is the bootstrap path.
            return FrameStatus::NeedsReset;
        };

        match device.test_cooperative_level() {
            CooperativeLevel::Lost => return FrameStatus::DeviceLost,
            CooperativeLevel::NeedsReset => return FrameStatus::NeedsReset,
            CooperativeLevel::Ready => {}
        }

        if let Err(e) = device.clear(
            ClearFlags::TARGET | ClearFlags::DEPTH,
            [0.0, 0.0, 0.0, 1.0],
            1.0,
            0,
        ) {
            error!("frame clear failed: {e}");
            return FrameStatus::SceneOpenFailed;
        }

        if let Err(e) = device.begin_scene() {
            error!("scene open failed: {e}");
            return FrameStatus::SceneOpenFailed;
        }
        self.scene_open = true;

        device.apply_render_state(&FrameRenderState::default());

        FrameStatus::Ready
    }

    /// Close the scene and roll the frames-per-second counter.
    ///
    /// Once per wall-clock second (never more often) the accumulated frame
    /// count is snapshotted as the rate, the counter resets, and one
    /// diagnostic line is emitted.
    pub fn end_frame(&mut self) -> FrameStatus {
        if self.scene_open {
            if let Some(device) = self.device.as_mut() {
                if let Err(e) = device.end_scene() {
                    warn!("scene close failed: {e}");
                }
            }
            self.scene_open = false;
        }

        self.frames_since_sample += 1;
        let now = self.clock.seconds_since_start();
        if now - self.last_fps_sample > 1.0 {
            self.fps = self.frames_since_sample as f32;
            self.frames_since_sample = 0;
            self.last_fps_sample = now;
            debug!("FPS: {:.0}", self.fps);
        }

        FrameStatus::Ready
    }

    /// Present the completed frame if a device exists; never fails the
    /// caller
    pub fn show_frame(&mut self) -> FrameStatus {
        if let Some(device) = self.device.as_mut() {
            device.present();
        }
        FrameStatus::Ready
    }

    /// Suspend hook for OS-level focus loss; a success no-op here,
    /// an extension point for subclasses of the frame loop
    pub fn invalidate(&mut self) -> FrameStatus {
        FrameStatus::Ready
    }

    /// Resume hook paired with [`invalidate`](Self::invalidate)
    pub fn restore(&mut self) -> FrameStatus {
        FrameStatus::Ready
    }

    /// Allocate the engine's vertex buffer if it does not already exist.
    ///
    /// Allocation failure is fatal: vertex rendering is impossible without
    /// the buffer and there is no degraded mode.
    pub fn create_vertex_buffer(&mut self) -> Result<(), DisplayError> {
        if self.vertex_buffer.is_some() {
            return Ok(());
        }
        let Some(device) = self.device.as_mut() else {
            return Err(DisplayError::VertexBufferAllocation(
                "no device exists".to_string(),
            ));
        };
        let buffer = device
            .create_vertex_buffer(MAX_SPRITE_VERTICES)
            .map_err(|e| DisplayError::VertexBufferAllocation(e.to_string()))?;
        self.vertex_buffer = Some(buffer);
        Ok(())
    }

    /// Release the vertex buffer; safe to call when none is allocated
    pub fn release_vertex_buffer(&mut self) {
        self.vertex_buffer = None;
    }

    /// The vertex buffer, if allocated
    pub fn vertex_buffer_mut(&mut self) -> Option<&mut (dyn GpuVertexBuffer + 'static)> {
        self.vertex_buffer.as_deref_mut()
    }

    /// Adapter capability limits queried at startup
    pub fn caps(&self) -> &DeviceCaps {
        &self.caps
    }

    /// Desktop display mode captured at startup
    pub fn desktop_mode(&self) -> &DisplayMode {
        &self.desktop_mode
    }

    /// Parameters of the last successfully applied mode, if any
    pub fn presentation_parameters(&self) -> Option<&PresentationParameters> {
        self.params.as_ref()
    }

    /// Whether a rendering device currently exists
    pub fn has_device(&self) -> bool {
        self.device.is_some()
    }

    /// Most recent frames-per-second sample
    pub fn fps(&self) -> f32 {
        self.fps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use crate::display::backend::GpuVertexBuffer;
    use crate::display::caps::AdapterIdentifier;
    use crate::display::error::DeviceError;
    use crate::display::formats::PixelFormat;
    use crate::display::vertex::SpriteVertex;

    /// Shared journal of backend activity, inspected after the display has
    /// consumed the fakes
    struct Journal {
        devices_created: u32,
        buffers_created: u32,
        resets: u32,
        clears: u32,
        scene_opens: u32,
        scene_closes: u32,
        presents: u32,
        state_applications: u32,
        calls: Vec<&'static str>,
        cooperative_level: CooperativeLevel,
        fail_reset: Option<fn() -> ResetError>,
        fail_scene_open: bool,
        fail_buffer_allocation: bool,
        fail_device_creation: bool,
    }

    impl Default for Journal {
        fn default() -> Self {
            Self {
                devices_created: 0,
                buffers_created: 0,
                resets: 0,
                clears: 0,
                scene_opens: 0,
                scene_closes: 0,
                presents: 0,
                state_applications: 0,
                calls: Vec::new(),
                cooperative_level: CooperativeLevel::Ready,
                fail_reset: None,
                fail_scene_open: false,
                fail_buffer_allocation: false,
                fail_device_creation: false,
            }
        }
    }

    struct FakeVertexBuffer;

    impl GpuVertexBuffer for FakeVertexBuffer {
        fn capacity(&self) -> u32 {
            MAX_SPRITE_VERTICES
        }

        fn write(&mut self, _vertices: &[SpriteVertex]) -> Result<(), DeviceError> {
            Ok(())
        }
    }

    struct FakeDevice {
        journal: Rc<RefCell<Journal>>,
    }

    impl RenderDevice for FakeDevice {
        fn test_cooperative_level(&mut self) -> CooperativeLevel {
            self.journal.borrow().cooperative_level
        }

        fn reset(&mut self, _params: &PresentationParameters) -> Result<(), ResetError> {
            let mut journal = self.journal.borrow_mut();
            journal.resets += 1;
            if let Some(make_error) = journal.fail_reset {
                return Err(make_error());
            }
            Ok(())
        }

        fn clear(
            &mut self,
            _flags: ClearFlags,
            _color: [f32; 4],
            _depth: f32,
            _stencil: u32,
        ) -> Result<(), DeviceError> {
            let mut journal = self.journal.borrow_mut();
            journal.clears += 1;
            journal.calls.push("clear");
            Ok(())
        }

        fn begin_scene(&mut self) -> Result<(), DeviceError> {
            let mut journal = self.journal.borrow_mut();
            if journal.fail_scene_open {
                return Err(DeviceError::SceneOpen("scripted failure".to_string()));
            }
            journal.scene_opens += 1;
            journal.calls.push("begin_scene");
            Ok(())
        }

        fn apply_render_state(&mut self, state: &FrameRenderState) {
            assert_eq!(*state, FrameRenderState::default());
            let mut journal = self.journal.borrow_mut();
            journal.state_applications += 1;
            journal.calls.push("apply_render_state");
        }

        fn end_scene(&mut self) -> Result<(), DeviceError> {
            let mut journal = self.journal.borrow_mut();
            journal.scene_closes += 1;
            journal.calls.push("end_scene");
            Ok(())
        }

        fn present(&mut self) {
            let mut journal = self.journal.borrow_mut();
            journal.presents += 1;
            journal.calls.push("present");
        }

        fn create_vertex_buffer(
            &mut self,
            _capacity: u32,
        ) -> Result<Box<dyn GpuVertexBuffer>, DeviceError> {
            let mut journal = self.journal.borrow_mut();
            if journal.fail_buffer_allocation {
                return Err(DeviceError::Allocation {
                    bytes: MAX_SPRITE_VERTICES as usize * SpriteVertex::STRIDE,
                    reason: "scripted failure".to_string(),
                });
            }
            journal.buffers_created += 1;
            Ok(Box::new(FakeVertexBuffer))
        }
    }

    /// Adapter accepting every format pair, creating journaled fake devices
    struct FakeAdapter {
        journal: Rc<RefCell<Journal>>,
    }

    impl DisplayAdapter for FakeAdapter {
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
                driver: "fake".to_string(),
                description: "journaled test adapter".to_string(),
            })
        }

        fn check_device_format(
            &self,
            _display: PixelFormat,
            _back_buffer: PixelFormat,
            _windowed: bool,
        ) -> bool {
            true
        }

        fn create_device(
            &mut self,
            _params: &PresentationParameters,
        ) -> Result<Box<dyn RenderDevice>, DeviceError> {
            if self.journal.borrow().fail_device_creation {
                return Err(DeviceError::Backend("scripted failure".to_string()));
            }
            self.journal.borrow_mut().devices_created += 1;
            Ok(Box::new(FakeDevice {
                journal: Rc::clone(&self.journal),
            }))
        }
    }

    /// Clock advanced by hand from the tests
    struct ManualClock {
        now: Rc<Cell<f32>>,
    }

    impl TimeSource for ManualClock {
        fn seconds_since_start(&self) -> f32 {
            self.now.get()
        }
    }

    fn display_with_journal() -> (Display, Rc<RefCell<Journal>>, Rc<Cell<f32>>) {
        let journal = Rc::new(RefCell::new(Journal::default()));
        let now = Rc::new(Cell::new(0.0_f32));
        let adapter = FakeAdapter {
            journal: Rc::clone(&journal),
        };
        let clock = ManualClock {
            now: Rc::clone(&now),
        };
        let display = Display::new(Box::new(adapter), Box::new(clock)).unwrap();
        (display, journal, now)
    }

    #[test]
    fn test_first_switch_creates_device_and_buffer() {
        let (mut display, journal, _) = display_with_journal();

        assert!(!display.has_device());
        let ok = display.switch_display_mode(true, 640, 480, 16, 0).unwrap();
        assert!(ok);
        assert!(display.has_device());

        let journal = journal.borrow();
        assert_eq!(journal.devices_created, 1);
        assert_eq!(journal.buffers_created, 1);
        // One full frame cycle flushed stale framebuffer contents.
        assert_eq!(journal.clears, 1);
        assert_eq!(journal.presents, 1);
    }

    #[test]
    fn test_frame_cycle_after_first_switch_is_ready() {
        let (mut display, journal, _) = display_with_journal();
        display.switch_display_mode(true, 640, 480, 16, 0).unwrap();

        assert_eq!(display.begin_frame(), FrameStatus::Ready);
        assert_eq!(display.end_frame(), FrameStatus::Ready);
        assert_eq!(display.show_frame(), FrameStatus::Ready);

        // clear before scene open, state applied after, then close and present
        let journal = journal.borrow();
        let frame = &journal.calls[journal.calls.len() - 5..];
        assert_eq!(
            frame,
            ["clear", "begin_scene", "apply_render_state", "end_scene", "present"]
        );
    }

    #[test]
    fn test_invalid_fullscreen_depth_allocates_no_device() {
        let (mut display, journal, _) = display_with_journal();

        let ok = display.switch_display_mode(false, 640, 480, 24, 0).unwrap();
        assert!(!ok);
        assert!(!display.has_device());
        assert!(display.presentation_parameters().is_none());
        assert_eq!(journal.borrow().devices_created, 0);
    }

    #[test]
    fn test_failed_creation_leaves_no_partial_state() {
        let (mut display, journal, _) = display_with_journal();
        journal.borrow_mut().fail_device_creation = true;

        let ok = display.switch_display_mode(true, 640, 480, 16, 0).unwrap();
        assert!(!ok);
        assert!(!display.has_device());
        assert!(display.presentation_parameters().is_none());
    }

    #[test]
    fn test_second_switch_resets_rather_than_recreates() {
        let (mut display, journal, _) = display_with_journal();
        display.switch_display_mode(true, 640, 480, 16, 0).unwrap();

        let ok = display.switch_display_mode(false, 800, 600, 32, 60).unwrap();
        assert!(ok);

        let journal = journal.borrow();
        assert_eq!(journal.devices_created, 1);
        assert_eq!(journal.resets, 1);
        assert_eq!(journal.buffers_created, 1);
    }

    #[test]
    fn test_failed_reset_keeps_device_and_prior_parameters() {
        let (mut display, journal, _) = display_with_journal();
        display.switch_display_mode(true, 640, 480, 16, 0).unwrap();

        journal.borrow_mut().fail_reset =
            Some(|| ResetError::TryAgain("scripted failure".to_string()));
        let ok = display.switch_display_mode(true, 800, 600, 16, 0).unwrap();
        assert!(!ok);

        // Device survives and the last good mode is still in force.
        assert!(display.has_device());
        let params = display.presentation_parameters().unwrap();
        assert_eq!(params.back_buffer_width, 640);
        assert_eq!(params.back_buffer_height, 480);

        // Corrected parameters go through on the retry.
        journal.borrow_mut().fail_reset = None;
        assert!(display.switch_display_mode(true, 800, 600, 16, 0).unwrap());
        let params = display.presentation_parameters().unwrap();
        assert_eq!(params.back_buffer_width, 800);
    }

    #[test]
    fn test_removed_device_is_recreated_on_next_switch() {
        let (mut display, journal, _) = display_with_journal();
        display.switch_display_mode(true, 640, 480, 16, 0).unwrap();

        journal.borrow_mut().fail_reset =
            Some(|| ResetError::DeviceRemoved("scripted removal".to_string()));
        let ok = display.switch_display_mode(true, 800, 600, 16, 0).unwrap();
        assert!(!ok);
        assert!(!display.has_device());
        assert!(display.vertex_buffer_mut().is_none());

        journal.borrow_mut().fail_reset = None;
        assert!(display.switch_display_mode(true, 800, 600, 16, 0).unwrap());
        assert_eq!(journal.borrow().devices_created, 2);
        assert_eq!(journal.borrow().buffers_created, 2);
    }

    #[test]
    fn test_begin_frame_without_device_needs_reset() {
        let (mut display, _, _) = display_with_journal();
        assert_eq!(display.begin_frame(), FrameStatus::NeedsReset);
    }

    #[test]
    fn test_begin_frame_while_lost_touches_nothing() {
        let (mut display, journal, _) = display_with_journal();
        display.switch_display_mode(true, 640, 480, 16, 0).unwrap();
        let clears_before = journal.borrow().clears;

        journal.borrow_mut().cooperative_level = CooperativeLevel::Lost;
        assert_eq!(display.begin_frame(), FrameStatus::DeviceLost);
        assert_eq!(journal.borrow().clears, clears_before);
        assert_eq!(journal.borrow().scene_opens, 1);

        // Device comes back; a successful switch resumes normal frames.
        journal.borrow_mut().cooperative_level = CooperativeLevel::Ready;
        assert!(display.switch_display_mode(true, 640, 480, 16, 0).unwrap());
        assert_eq!(display.begin_frame(), FrameStatus::Ready);
    }

    #[test]
    fn test_begin_frame_reports_needs_reset() {
        let (mut display, journal, _) = display_with_journal();
        display.switch_display_mode(true, 640, 480, 16, 0).unwrap();

        journal.borrow_mut().cooperative_level = CooperativeLevel::NeedsReset;
        assert_eq!(display.begin_frame(), FrameStatus::NeedsReset);

        journal.borrow_mut().cooperative_level = CooperativeLevel::Ready;
        assert!(display.reset().is_ok());
        assert_eq!(display.begin_frame(), FrameStatus::Ready);
    }

    #[test]
    fn test_scene_open_failure_aborts_frame() {
        let (mut display, journal, _) = display_with_journal();
        display.switch_display_mode(true, 640, 480, 16, 0).unwrap();

        journal.borrow_mut().fail_scene_open = true;
        assert_eq!(display.begin_frame(), FrameStatus::SceneOpenFailed);
        // The frame was cleared but never opened, so nothing to close.
        assert_eq!(journal.borrow().scene_closes, 1);
        display.end_frame();
        assert_eq!(journal.borrow().scene_closes, 1);
    }

    #[test]
    fn test_render_state_reapplied_every_frame() {
        let (mut display, journal, _) = display_with_journal();
        display.switch_display_mode(true, 640, 480, 16, 0).unwrap();

        for _ in 0..3 {
            display.begin_frame();
            display.end_frame();
            display.show_frame();
        }
        // 3 explicit frames plus the post-switch flush frame
        assert_eq!(journal.borrow().state_applications, 4);
    }

    #[test]
    fn test_release_vertex_buffer_is_idempotent() {
        let (mut display, _, _) = display_with_journal();
        display.switch_display_mode(true, 640, 480, 16, 0).unwrap();
        assert!(display.vertex_buffer_mut().is_some());

        display.release_vertex_buffer();
        assert!(display.vertex_buffer_mut().is_none());
        display.release_vertex_buffer();
        assert!(display.vertex_buffer_mut().is_none());
    }

    #[test]
    fn test_vertex_buffer_allocation_failure_is_fatal() {
        let (mut display, journal, _) = display_with_journal();
        journal.borrow_mut().fail_buffer_allocation = true;

        let result = display.switch_display_mode(true, 640, 480, 16, 0);
        assert!(matches!(
            result,
            Err(DisplayError::VertexBufferAllocation(_))
        ));
    }

    #[test]
    fn test_fps_window_counts_frames_per_second() {
        let (mut display, _, now) = display_with_journal();
        display.switch_display_mode(true, 640, 480, 16, 0).unwrap();

        // The post-switch flush frame already ran at t=0; it lands in the
        // first sampling window like any other frame.
        for _ in 0..4 {
            display.begin_frame();
            display.end_frame();
        }
        assert_relative_eq!(display.fps(), 0.0);

        now.set(1.5);
        display.begin_frame();
        display.end_frame();
        assert_relative_eq!(display.fps(), 6.0);

        // Counter reset: frames inside the next window don't re-sample early.
        now.set(2.0);
        display.begin_frame();
        display.end_frame();
        assert_relative_eq!(display.fps(), 6.0);

        now.set(2.6);
        display.begin_frame();
        display.end_frame();
        assert_relative_eq!(display.fps(), 2.0);
    }

    #[test]
    fn test_show_frame_without_device_is_a_no_op() {
        let (mut display, journal, _) = display_with_journal();
        assert_eq!(display.show_frame(), FrameStatus::Ready);
        assert_eq!(journal.borrow().presents, 0);
    }

    #[test]
    fn test_invalidate_and_restore_succeed() {
        let (mut display, _, _) = display_with_journal();
        assert_eq!(display.invalidate(), FrameStatus::Ready);
        assert_eq!(display.restore(), FrameStatus::Ready);
    }
}
