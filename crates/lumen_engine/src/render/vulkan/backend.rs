//! Vulkan implementation of the frame backend
//!
//! Owns the swapchain and everything sized by it, plus one command buffer
//! and one set of synchronization objects per frame slot.

use super::commands::{CommandPool, CommandRecorder};
use super::context::VulkanContext;
use super::framebuffer::RenderTargets;
use super::render_pass::RenderPass;
use super::swapchain::Swapchain;
use super::sync::{wait_for_fence, FrameSync, ImagesInFlight};
use crate::render::error::{RenderError, RenderResult};
use crate::render::orchestrator::{AcquireOutcome, FrameBackend, PresentOutcome, SwapchainFormats};
use crate::render::recording::DrawCommands;
use crate::render::vulkan::{VulkanError, VulkanResult};
use ash::vk;
use std::sync::Arc;

/// Swapchain, render targets and per-slot command recording
pub struct VulkanFrameBackend {
    // Field order is drop order: framebuffers before the swapchain images
    // they view, everything before the context
    targets: Option<RenderTargets>,
    swapchain: Option<Swapchain>,
    render_pass: RenderPass,
    frame_sync: Vec<FrameSync>,
    recorders: Vec<CommandRecorder>,
    command_pool: CommandPool,
    images_in_flight: ImagesInFlight,
    clear_color: [f32; 4],
    context: Arc<VulkanContext>,
}

impl VulkanFrameBackend {
    /// Create the initial swapchain, the render pass that matches it, and per-slot resources
    pub fn new(
        context: Arc<VulkanContext>,
        window_extent: vk::Extent2D,
        frames_in_flight: usize,
        clear_color: [f32; 4],
    ) -> VulkanResult<Self> {
        let device = context.raw_device();
        let swapchain = Swapchain::new(&context, window_extent, None)?;
        let render_pass =
            RenderPass::new_forward_pass(device.clone(), swapchain.format().format, context.find_depth_format()?)?;
        let targets = RenderTargets::new(&context, &render_pass, &swapchain)?;

        let command_pool = CommandPool::new(device.clone(), context.graphics_queue_family())?;
        let recorders = command_pool
            .allocate_command_buffers(frames_in_flight as u32)?
            .into_iter()
            .map(|command_buffer| CommandRecorder::new(command_buffer, device.clone()))
            .collect();
        let frame_sync = (0..frames_in_flight)
            .map(|_| FrameSync::new(device.clone()))
            .collect::<VulkanResult<Vec<_>>>()?;

        log::info!(
            "Frame backend ready: {} frames in flight, {} swapchain images",
            frames_in_flight,
            swapchain.image_count()
        );

        Ok(Self {
            images_in_flight: ImagesInFlight::new(swapchain.image_count()),
            targets: Some(targets),
            swapchain: Some(swapchain),
            render_pass,
            frame_sync,
            recorders,
            command_pool,
            clear_color,
            context,
        })
    }

    /// Render pass the pipelines are built against
    pub fn render_pass(&self) -> &RenderPass {
        &self.render_pass
    }

    /// Command pool for one-off uploads on the graphics queue
    pub fn command_pool(&self) -> &CommandPool {
        &self.command_pool
    }

    fn swapchain(&self) -> VulkanResult<&Swapchain> {
        self.swapchain.as_ref().ok_or_else(|| VulkanError::InvalidOperation {
            reason: "swapchain has not been created".to_string(),
        })
    }
}

impl FrameBackend for VulkanFrameBackend {
    fn frames_in_flight(&self) -> usize {
        self.frame_sync.len()
    }

    fn wait_for_slot(&mut self, slot: usize) -> VulkanResult<()> {
        self.frame_sync[slot].in_flight.wait()
    }

    fn acquire_next_image(&mut self, slot: usize) -> RenderResult<AcquireOutcome> {
        let sync = &self.frame_sync[slot];
        let acquired = self.swapchain()?.acquire_next_image(sync.image_available.handle());
        match acquired {
            Ok((image_index, suboptimal)) => {
                if let Some(fence) = self.images_in_flight.claim(image_index, sync.in_flight.handle()) {
                    wait_for_fence(self.context.device(), fence)?;
                }
                Ok(AcquireOutcome::Acquired { image_index, suboptimal })
            }
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(AcquireOutcome::OutOfDate),
            Err(e) => Err(RenderError::AcquireFailed(e)),
        }
    }

    fn begin_commands(&mut self, slot: usize) -> VulkanResult<()> {
        self.recorders[slot].begin()
    }

    fn begin_render_pass(&mut self, slot: usize, image_index: u32) {
        let Some(targets) = &self.targets else {
            debug_assert!(false, "render targets missing");
            return;
        };
        let [r, g, b, a] = self.clear_color;
        let clear_values = [
            vk::ClearValue {
                color: vk::ClearColorValue { float32: [r, g, b, a] },
            },
            vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue { depth: 1.0, stencil: 0 },
            },
        ];
        let extent = self.extent();
        self.recorders[slot].begin_render_pass(
            self.render_pass.handle(),
            targets.framebuffer(image_index),
            extent,
            &clear_values,
        );
    }

    fn end_render_pass(&mut self, slot: usize) {
        self.recorders[slot].end_render_pass();
    }

    fn submit_and_present(&mut self, slot: usize, image_index: u32) -> RenderResult<PresentOutcome> {
        let command_buffer = self.recorders[slot].end()?;
        let sync = &self.frame_sync[slot];

        let wait_semaphores = [sync.image_available.handle()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let signal_semaphores = [sync.render_finished.handle()];
        let command_buffers = [command_buffer];
        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores)
            .build();

        sync.in_flight.reset()?;
        unsafe {
            self.context
                .device()
                .queue_submit(self.context.graphics_queue(), &[submit_info], sync.in_flight.handle())
                .map_err(VulkanError::Api)?;
        }

        let presented = self.swapchain()?.present(
            self.context.present_queue(),
            image_index,
            sync.render_finished.handle(),
        );
        match presented {
            Ok(false) => Ok(PresentOutcome::Presented),
            Ok(true) => Ok(PresentOutcome::Suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(PresentOutcome::OutOfDate),
            Err(e) => Err(RenderError::PresentFailed(e)),
        }
    }

    fn wait_idle(&mut self) -> VulkanResult<()> {
        self.context.wait_idle()
    }

    fn recreate_swapchain(&mut self, extent: vk::Extent2D) -> VulkanResult<SwapchainFormats> {
        self.targets = None;
        let swapchain = Swapchain::new(&self.context, extent, self.swapchain.as_ref())?;
        let formats = SwapchainFormats {
            color: swapchain.format().format,
            depth: self.render_pass.depth_format(),
        };

        if formats.color == self.render_pass.color_format() {
            self.targets = Some(RenderTargets::new(&self.context, &self.render_pass, &swapchain)?);
        } else {
            log::warn!(
                "Swapchain colour format {:?} no longer matches render pass format {:?}",
                formats.color,
                self.render_pass.color_format()
            );
        }

        self.images_in_flight.reset(swapchain.image_count());
        self.swapchain = Some(swapchain);
        Ok(formats)
    }

    fn extent(&self) -> vk::Extent2D {
        self.swapchain
            .as_ref()
            .map_or(vk::Extent2D { width: 0, height: 0 }, Swapchain::extent)
    }

    fn commands(&mut self, slot: usize) -> &mut dyn DrawCommands {
        &mut self.recorders[slot]
    }
}

impl Drop for VulkanFrameBackend {
    fn drop(&mut self) {
        if let Err(e) = self.context.wait_idle() {
            log::warn!("Failed to wait for device idle during shutdown: {e}");
        }
    }
}
