//! Frame orchestration
//!
//! Drives one frame through `Ready -> FrameAcquired -> RenderPassActive ->
//! FrameAcquired -> Ready`, owns the current frame slot index, and handles
//! every recoverable surface condition (out-of-date, suboptimal, resize,
//! minimized window) internally so callers only ever see fatal errors.
//!
//! The GPU side sits behind [`FrameBackend`] and the window behind
//! [`SurfaceProvider`].

use super::error::{RenderError, RenderResult};
use super::recording::DrawCommands;
use crate::render::vulkan::VulkanResult;
use ash::vk;

/// Attachment formats the pipelines were built against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapchainFormats {
    /// Swapchain image format
    pub color: vk::Format,
    /// Depth attachment format
    pub depth: vk::Format,
}

/// Result of asking the swapchain for the next image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// An image is ready; `suboptimal` images may still be rendered to
    Acquired {
        /// Swapchain image index
        image_index: u32,
        /// Surface no longer matches the swapchain exactly
        suboptimal: bool,
    },
    /// The swapchain must be recreated before anything can be presented
    OutOfDate,
}

/// Result of submitting and presenting a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    /// Presented normally
    Presented,
    /// Presented, but the swapchain should be recreated
    Suboptimal,
    /// Not presented; the swapchain must be recreated
    OutOfDate,
}

/// GPU-side operations for one frame
pub trait FrameBackend {
    /// Number of frame slots
    fn frames_in_flight(&self) -> usize;

    /// Block until the slot's previous submission has finished executing
    fn wait_for_slot(&mut self, slot: usize) -> VulkanResult<()>;

    /// Acquire the next swapchain image; non-recoverable failures become [`RenderError::AcquireFailed`]
    fn acquire_next_image(&mut self, slot: usize) -> RenderResult<AcquireOutcome>;

    /// Reset and begin the slot's command buffer
    fn begin_commands(&mut self, slot: usize) -> VulkanResult<()>;

    /// Begin the render pass on `image_index` and set viewport and scissor
    fn begin_render_pass(&mut self, slot: usize, image_index: u32);

    /// End the render pass
    fn end_render_pass(&mut self, slot: usize);

    /// End recording, submit, and present; non-recoverable failures become [`RenderError::PresentFailed`]
    fn submit_and_present(&mut self, slot: usize, image_index: u32) -> RenderResult<PresentOutcome>;

    /// Wait for the device to finish all submitted work
    fn wait_idle(&mut self) -> VulkanResult<()>;

    /// Rebuild the swapchain and everything sized by it
    fn recreate_swapchain(&mut self, extent: vk::Extent2D) -> VulkanResult<SwapchainFormats>;

    /// Current swapchain extent
    fn extent(&self) -> vk::Extent2D;

    /// Recording sink for the slot's command buffer
    fn commands(&mut self, slot: usize) -> &mut dyn DrawCommands;
}

/// Window-side information the orchestrator polls
pub trait SurfaceProvider {
    /// Current drawable size in pixels
    fn framebuffer_extent(&self) -> vk::Extent2D;

    /// Return and clear the resize flag
    fn take_resized(&mut self) -> bool;

    /// Block until the window system delivers an event
    fn wait_events(&mut self);
}

/// A frame slot whose previous submission has finished executing
///
/// Only [`FrameOrchestrator::begin_frame`] issues one, after waiting on the
/// slot's fence, and [`FrameOrchestrator::end_frame`] takes it back. Anything
/// that resets or writes per-slot resources takes it as a parameter.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "the slot must be handed back to end_frame"]
pub struct FrameSlot {
    index: usize,
}

impl FrameSlot {
    /// Slot index into per-frame resource arrays
    pub fn index(&self) -> usize {
        self.index
    }

    /// A slot for driving per-slot resources without an orchestrator
    #[cfg(test)]
    pub(crate) fn idle(index: usize) -> Self {
        Self { index }
    }
}

/// Orchestrator state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    /// Between frames
    Ready,
    /// Image acquired and command buffer recording, outside a render pass
    FrameAcquired,
    /// Inside the render pass
    RenderPassActive,
}

/// Frame loop state machine
pub struct FrameOrchestrator<B: FrameBackend> {
    backend: B,
    state: FrameState,
    current_slot: usize,
    image_index: u32,
    formats: Option<SwapchainFormats>,
}

impl<B: FrameBackend> FrameOrchestrator<B> {
    /// Wrap a backend and build the initial swapchain
    pub fn new(backend: B, surface: &mut dyn SurfaceProvider) -> RenderResult<Self> {
        debug_assert!(backend.frames_in_flight() > 0, "at least one frame slot is required");
        let mut orchestrator = Self {
            backend,
            state: FrameState::Ready,
            current_slot: 0,
            image_index: 0,
            formats: None,
        };
        orchestrator.recreate_swapchain(surface)?;
        Ok(orchestrator)
    }

    /// Start a frame
    ///
    /// Returns the frame slot whose resources the caller may now update, or
    /// `None` when the surface could not be rendered to and the swapchain was
    /// rebuilt instead. On `None` the caller skips the rest of the frame.
    pub fn begin_frame(&mut self, surface: &mut dyn SurfaceProvider) -> RenderResult<Option<FrameSlot>> {
        debug_assert_eq!(self.state, FrameState::Ready, "begin_frame called while a frame is in progress");

        if is_zero_extent(surface.framebuffer_extent()) {
            self.recreate_swapchain(surface)?;
            return Ok(None);
        }

        let slot = self.current_slot;
        self.backend.wait_for_slot(slot)?;

        match self.backend.acquire_next_image(slot)? {
            AcquireOutcome::OutOfDate => {
                log::debug!("Swapchain out of date on acquire, skipping frame");
                self.recreate_swapchain(surface)?;
                Ok(None)
            }
            AcquireOutcome::Acquired { image_index, suboptimal } => {
                if suboptimal {
                    log::trace!("Acquired suboptimal swapchain image {image_index}");
                }
                self.backend.begin_commands(slot)?;
                self.image_index = image_index;
                self.state = FrameState::FrameAcquired;
                Ok(Some(FrameSlot { index: slot }))
            }
        }
    }

    /// Open the render pass on the acquired image
    pub fn begin_render_pass(&mut self) {
        debug_assert_eq!(
            self.state,
            FrameState::FrameAcquired,
            "begin_render_pass requires an acquired frame outside a render pass"
        );
        self.backend.begin_render_pass(self.current_slot, self.image_index);
        self.state = FrameState::RenderPassActive;
    }

    /// Close the render pass
    pub fn end_render_pass(&mut self) {
        debug_assert_eq!(
            self.state,
            FrameState::RenderPassActive,
            "end_render_pass called without an active render pass"
        );
        self.backend.end_render_pass(self.current_slot);
        self.state = FrameState::FrameAcquired;
    }

    /// Submit, present and advance to the next slot
    ///
    /// A suboptimal or out-of-date present, or a pending resize, rebuilds the
    /// swapchain after presenting. A failed submit or present leaves the
    /// slot index where it was.
    pub fn end_frame(&mut self, surface: &mut dyn SurfaceProvider, slot: FrameSlot) -> RenderResult<()> {
        debug_assert_eq!(
            self.state,
            FrameState::FrameAcquired,
            "end_frame requires an acquired frame with its render pass closed"
        );
        debug_assert_eq!(slot.index, self.current_slot, "end_frame given a slot from another frame");

        let outcome = self.backend.submit_and_present(self.current_slot, self.image_index)?;
        self.state = FrameState::Ready;
        self.current_slot = (self.current_slot + 1) % self.backend.frames_in_flight();

        let resized = surface.take_resized();
        if resized || outcome != PresentOutcome::Presented {
            log::debug!("Recreating swapchain after present (resized: {resized}, outcome: {outcome:?})");
            self.recreate_swapchain(surface)?;
        }
        Ok(())
    }

    fn recreate_swapchain(&mut self, surface: &mut dyn SurfaceProvider) -> RenderResult<()> {
        let mut extent = surface.framebuffer_extent();
        while is_zero_extent(extent) {
            surface.wait_events();
            extent = surface.framebuffer_extent();
        }

        self.backend.wait_idle()?;
        let formats = self.backend.recreate_swapchain(extent)?;

        match self.formats {
            Some(old) if old != formats => {
                log::error!("Swapchain formats changed from {old:?} to {formats:?}");
                Err(RenderError::SwapchainFormatChanged {
                    old_color: old.color,
                    new_color: formats.color,
                    old_depth: old.depth,
                    new_depth: formats.depth,
                })
            }
            _ => {
                log::info!("Swapchain ready at {}x{}", extent.width, extent.height);
                self.formats = Some(formats);
                Ok(())
            }
        }
    }

    /// Recording sink for the current frame
    pub fn commands(&mut self) -> &mut dyn DrawCommands {
        debug_assert_ne!(self.state, FrameState::Ready, "no frame is being recorded");
        self.backend.commands(self.current_slot)
    }

    /// Slot of the frame being recorded, or of the next frame when idle
    pub fn current_slot(&self) -> usize {
        self.current_slot
    }

    /// Current state
    pub fn state(&self) -> FrameState {
        self.state
    }

    /// Width over height of the swapchain
    pub fn aspect_ratio(&self) -> f32 {
        let extent = self.backend.extent();
        extent.width as f32 / extent.height.max(1) as f32
    }

    /// Formats the current swapchain was built with
    pub fn formats(&self) -> Option<SwapchainFormats> {
        self.formats
    }

    /// Number of frame slots
    pub fn frames_in_flight(&self) -> usize {
        self.backend.frames_in_flight()
    }

    /// The backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The backend, mutably
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Wait for all submitted work to finish
    pub fn wait_idle(&mut self) -> VulkanResult<()> {
        self.backend.wait_idle()
    }
}

fn is_zero_extent(extent: vk::Extent2D) -> bool {
    extent.width == 0 || extent.height == 0
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::render::recording::recorder::RecordingCommands;
    use approx::assert_relative_eq;
    use std::collections::VecDeque;

    const COLOR: vk::Format = vk::Format::B8G8R8A8_SRGB;
    const DEPTH: vk::Format = vk::Format::D32_SFLOAT;

    #[derive(Debug, Clone, PartialEq)]
    pub(crate) enum Event {
        WaitSlot(usize),
        Acquire(usize),
        BeginCommands(usize),
        BeginPass(usize, u32),
        EndPass(usize),
        SubmitPresent(usize, u32),
        WaitIdle,
        Recreate(u32, u32),
    }

    pub(crate) struct MockBackend {
        frames: usize,
        pub(crate) events: Vec<Event>,
        acquire: VecDeque<AcquireOutcome>,
        present: VecDeque<PresentOutcome>,
        acquire_error: Option<vk::Result>,
        present_error: Option<vk::Result>,
        formats: VecDeque<SwapchainFormats>,
        in_flight: Vec<bool>,
        extent: vk::Extent2D,
        next_image: u32,
        commands: RecordingCommands,
    }

    impl MockBackend {
        pub(crate) fn new(frames: usize) -> Self {
            Self {
                frames,
                events: Vec::new(),
                acquire: VecDeque::new(),
                present: VecDeque::new(),
                acquire_error: None,
                present_error: None,
                formats: VecDeque::new(),
                in_flight: vec![false; frames],
                extent: vk::Extent2D::default(),
                next_image: 0,
                commands: RecordingCommands::inside_pass(),
            }
        }

        fn recreations(&self) -> Vec<(u32, u32)> {
            self.events
                .iter()
                .filter_map(|e| match e {
                    Event::Recreate(w, h) => Some((*w, *h)),
                    _ => None,
                })
                .collect()
        }
    }

    impl FrameBackend for MockBackend {
        fn frames_in_flight(&self) -> usize {
            self.frames
        }

        fn wait_for_slot(&mut self, slot: usize) -> VulkanResult<()> {
            self.in_flight[slot] = false;
            self.events.push(Event::WaitSlot(slot));
            Ok(())
        }

        fn acquire_next_image(&mut self, slot: usize) -> RenderResult<AcquireOutcome> {
            self.events.push(Event::Acquire(slot));
            if let Some(result) = self.acquire_error {
                return Err(RenderError::AcquireFailed(result));
            }
            let image_index = self.next_image;
            self.next_image = (self.next_image + 1) % 3;
            Ok(self.acquire.pop_front().unwrap_or(AcquireOutcome::Acquired {
                image_index,
                suboptimal: false,
            }))
        }

        fn begin_commands(&mut self, slot: usize) -> VulkanResult<()> {
            assert!(!self.in_flight[slot], "recording into a slot the GPU may still be reading");
            self.events.push(Event::BeginCommands(slot));
            Ok(())
        }

        fn begin_render_pass(&mut self, slot: usize, image_index: u32) {
            self.commands.in_pass = true;
            self.events.push(Event::BeginPass(slot, image_index));
        }

        fn end_render_pass(&mut self, slot: usize) {
            self.commands.in_pass = false;
            self.events.push(Event::EndPass(slot));
        }

        fn submit_and_present(&mut self, slot: usize, image_index: u32) -> RenderResult<PresentOutcome> {
            self.in_flight[slot] = true;
            self.events.push(Event::SubmitPresent(slot, image_index));
            if let Some(result) = self.present_error {
                return Err(RenderError::PresentFailed(result));
            }
            Ok(self.present.pop_front().unwrap_or(PresentOutcome::Presented))
        }

        fn wait_idle(&mut self) -> VulkanResult<()> {
            self.in_flight.iter_mut().for_each(|f| *f = false);
            self.events.push(Event::WaitIdle);
            Ok(())
        }

        fn recreate_swapchain(&mut self, extent: vk::Extent2D) -> VulkanResult<SwapchainFormats> {
            assert!(extent.width > 0 && extent.height > 0, "zero-area swapchain");
            assert!(self.in_flight.iter().all(|f| !f), "recreated while frames were in flight");
            self.events.push(Event::Recreate(extent.width, extent.height));
            self.extent = extent;
            Ok(self.formats.pop_front().unwrap_or(SwapchainFormats { color: COLOR, depth: DEPTH }))
        }

        fn extent(&self) -> vk::Extent2D {
            self.extent
        }

        fn commands(&mut self, _slot: usize) -> &mut dyn DrawCommands {
            &mut self.commands
        }
    }

    pub(crate) struct MockSurface {
        extents: VecDeque<(u32, u32)>,
        resized: bool,
        waits: usize,
    }

    impl MockSurface {
        pub(crate) fn fixed(width: u32, height: u32) -> Self {
            Self {
                extents: VecDeque::from([(width, height)]),
                resized: false,
                waits: 0,
            }
        }
    }

    impl SurfaceProvider for MockSurface {
        fn framebuffer_extent(&self) -> vk::Extent2D {
            let (width, height) = self.extents.front().copied().unwrap_or((0, 0));
            vk::Extent2D { width, height }
        }

        fn take_resized(&mut self) -> bool {
            std::mem::take(&mut self.resized)
        }

        fn wait_events(&mut self) {
            self.waits += 1;
            if self.extents.len() > 1 {
                self.extents.pop_front();
            }
        }
    }

    fn run_frame(orchestrator: &mut FrameOrchestrator<MockBackend>, surface: &mut MockSurface) -> Option<usize> {
        let slot = orchestrator.begin_frame(surface).expect("begin_frame")?;
        let index = slot.index();
        orchestrator.begin_render_pass();
        orchestrator.commands().draw(3, 1);
        orchestrator.end_render_pass();
        orchestrator.end_frame(surface, slot).expect("end_frame");
        Some(index)
    }

    #[test]
    fn test_frame_cycle_advances_slot_modulo() {
        let mut surface = MockSurface::fixed(800, 600);
        let mut orchestrator = FrameOrchestrator::new(MockBackend::new(2), &mut surface).expect("orchestrator");
        assert_relative_eq!(orchestrator.aspect_ratio(), 800.0 / 600.0);

        let slots: Vec<_> = (0..5).map(|_| run_frame(&mut orchestrator, &mut surface)).collect();
        assert_eq!(slots, vec![Some(0), Some(1), Some(0), Some(1), Some(0)]);
        assert_eq!(orchestrator.state(), FrameState::Ready);

        let first_frame: Vec<_> = orchestrator.backend().events[2..8].to_vec();
        assert_eq!(
            first_frame,
            vec![
                Event::WaitSlot(0),
                Event::Acquire(0),
                Event::BeginCommands(0),
                Event::BeginPass(0, 0),
                Event::EndPass(0),
                Event::SubmitPresent(0, 0),
            ]
        );
    }

    #[test]
    fn test_minimized_surface_blocks_instead_of_rendering() {
        let mut surface = MockSurface::fixed(800, 600);
        let mut orchestrator = FrameOrchestrator::new(MockBackend::new(2), &mut surface).expect("orchestrator");

        surface.extents = VecDeque::from([(0, 0), (0, 0), (1024, 768)]);
        let result = orchestrator.begin_frame(&mut surface).expect("begin_frame");

        assert_eq!(result, None);
        assert_eq!(surface.waits, 2);
        assert_eq!(orchestrator.backend().recreations(), vec![(800, 600), (1024, 768)]);
        assert!(!orchestrator.backend().events.contains(&Event::Acquire(0)));
        assert_eq!(orchestrator.state(), FrameState::Ready);

        assert_eq!(run_frame(&mut orchestrator, &mut surface), Some(0));
    }

    #[test]
    fn test_out_of_date_acquire_skips_frame() {
        let mut surface = MockSurface::fixed(800, 600);
        let mut backend = MockBackend::new(2);
        backend.acquire.push_back(AcquireOutcome::OutOfDate);
        let mut orchestrator = FrameOrchestrator::new(backend, &mut surface).expect("orchestrator");

        assert_eq!(orchestrator.begin_frame(&mut surface).expect("begin_frame"), None);
        assert_eq!(orchestrator.state(), FrameState::Ready);
        assert_eq!(orchestrator.current_slot(), 0);
        assert_eq!(orchestrator.backend().recreations().len(), 2);

        assert_eq!(run_frame(&mut orchestrator, &mut surface), Some(0));
    }

    #[test]
    fn test_suboptimal_present_recreates_after_present() {
        let mut surface = MockSurface::fixed(800, 600);
        let mut backend = MockBackend::new(2);
        backend.present.push_back(PresentOutcome::Suboptimal);
        let mut orchestrator = FrameOrchestrator::new(backend, &mut surface).expect("orchestrator");

        run_frame(&mut orchestrator, &mut surface);
        let events = &orchestrator.backend().events;
        let present = events.iter().position(|e| matches!(e, Event::SubmitPresent(..))).expect("present");
        let recreate = events.iter().rposition(|e| matches!(e, Event::Recreate(..))).expect("recreate");
        assert!(recreate > present);
        assert_eq!(events[recreate - 1], Event::WaitIdle);
    }

    #[test]
    fn test_resize_flag_recreates_after_present() {
        let mut surface = MockSurface::fixed(800, 600);
        let mut orchestrator = FrameOrchestrator::new(MockBackend::new(2), &mut surface).expect("orchestrator");

        surface.extents = VecDeque::from([(640, 480)]);
        surface.resized = true;
        run_frame(&mut orchestrator, &mut surface);

        assert_eq!(orchestrator.backend().recreations(), vec![(800, 600), (640, 480)]);
        assert!(!surface.resized);
    }

    #[test]
    fn test_format_change_is_fatal() {
        let mut surface = MockSurface::fixed(800, 600);
        let mut backend = MockBackend::new(2);
        backend.formats.push_back(SwapchainFormats { color: COLOR, depth: DEPTH });
        backend.formats.push_back(SwapchainFormats {
            color: vk::Format::R8G8B8A8_UNORM,
            depth: DEPTH,
        });
        backend.present.push_back(PresentOutcome::OutOfDate);
        let mut orchestrator = FrameOrchestrator::new(backend, &mut surface).expect("orchestrator");

        let slot = orchestrator.begin_frame(&mut surface).expect("begin_frame").expect("frame");
        orchestrator.begin_render_pass();
        orchestrator.end_render_pass();
        let result = orchestrator.end_frame(&mut surface, slot);
        assert!(matches!(
            result,
            Err(RenderError::SwapchainFormatChanged {
                old_color: COLOR,
                new_color: vk::Format::R8G8B8A8_UNORM,
                ..
            })
        ));
    }

    #[test]
    fn test_failed_acquire_is_fatal_without_recreating() {
        let mut surface = MockSurface::fixed(800, 600);
        let mut orchestrator = FrameOrchestrator::new(MockBackend::new(2), &mut surface).expect("orchestrator");
        orchestrator.backend_mut().acquire_error = Some(vk::Result::ERROR_DEVICE_LOST);

        let result = orchestrator.begin_frame(&mut surface);
        assert!(matches!(result, Err(RenderError::AcquireFailed(vk::Result::ERROR_DEVICE_LOST))));
        assert_eq!(orchestrator.backend().recreations(), vec![(800, 600)]);
        assert!(!orchestrator.backend().events.contains(&Event::BeginCommands(0)));
        assert_eq!(orchestrator.state(), FrameState::Ready);
    }

    #[test]
    fn test_failed_present_is_fatal_and_keeps_slot() {
        let mut surface = MockSurface::fixed(800, 600);
        let mut orchestrator = FrameOrchestrator::new(MockBackend::new(2), &mut surface).expect("orchestrator");
        assert_eq!(run_frame(&mut orchestrator, &mut surface), Some(0));
        orchestrator.backend_mut().present_error = Some(vk::Result::ERROR_SURFACE_LOST_KHR);

        let slot = orchestrator.begin_frame(&mut surface).expect("begin_frame").expect("frame");
        orchestrator.begin_render_pass();
        orchestrator.end_render_pass();
        let result = orchestrator.end_frame(&mut surface, slot);

        assert!(matches!(result, Err(RenderError::PresentFailed(vk::Result::ERROR_SURFACE_LOST_KHR))));
        assert_eq!(orchestrator.current_slot(), 1);
        assert_eq!(orchestrator.backend().recreations(), vec![(800, 600)]);
    }

    #[test]
    fn test_resize_storm_never_reuses_busy_slot() {
        let mut surface = MockSurface::fixed(800, 600);
        let mut backend = MockBackend::new(3);
        for i in 0..300 {
            backend.present.push_back(match i % 7 {
                0 => PresentOutcome::Suboptimal,
                3 => PresentOutcome::OutOfDate,
                _ => PresentOutcome::Presented,
            });
            if i % 11 == 0 {
                backend.acquire.push_back(AcquireOutcome::OutOfDate);
            }
        }
        let mut orchestrator = FrameOrchestrator::new(backend, &mut surface).expect("orchestrator");

        let mut rendered = 0;
        for i in 0..300u32 {
            surface.resized = i % 5 == 0;
            surface.extents = VecDeque::from([(800 + i % 4, 600)]);
            if run_frame(&mut orchestrator, &mut surface).is_some() {
                rendered += 1;
            }
        }
        assert!(rendered > 200);

        // Every submitted slot is waited on before it is recorded into again.
        let mut pending = [false; 3];
        for event in &orchestrator.backend().events {
            match *event {
                Event::SubmitPresent(slot, _) => pending[slot] = true,
                Event::WaitSlot(slot) => pending[slot] = false,
                Event::WaitIdle => pending = [false; 3],
                Event::BeginCommands(slot) => assert!(!pending[slot]),
                _ => {}
            }
        }
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "begin_render_pass requires an acquired frame")]
    fn test_render_pass_before_acquire_panics() {
        let mut surface = MockSurface::fixed(800, 600);
        let mut orchestrator = FrameOrchestrator::new(MockBackend::new(2), &mut surface).expect("orchestrator");
        orchestrator.begin_render_pass();
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "end_frame requires an acquired frame")]
    fn test_end_frame_inside_render_pass_panics() {
        let mut surface = MockSurface::fixed(800, 600);
        let mut orchestrator = FrameOrchestrator::new(MockBackend::new(2), &mut surface).expect("orchestrator");
        let slot = orchestrator.begin_frame(&mut surface).expect("begin_frame").expect("frame");
        orchestrator.begin_render_pass();
        let _ = orchestrator.end_frame(&mut surface, slot);
    }
}
