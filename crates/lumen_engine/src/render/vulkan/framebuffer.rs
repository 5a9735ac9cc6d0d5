//! Framebuffers and the depth attachment, rebuilt with the swapchain

use super::context::VulkanContext;
use super::image::GpuImage;
use super::render_pass::RenderPass;
use super::swapchain::Swapchain;
use crate::render::vulkan::{VulkanError, VulkanResult};
use ash::{vk, Device};

/// Framebuffer wrapper with RAII cleanup
pub struct Framebuffer {
    device: Device,
    framebuffer: vk::Framebuffer,
}

impl Framebuffer {
    /// Create a framebuffer over `attachments`
    pub fn new(
        device: Device,
        render_pass: vk::RenderPass,
        attachments: &[vk::ImageView],
        extent: vk::Extent2D,
    ) -> VulkanResult<Self> {
        let framebuffer_create_info = vk::FramebufferCreateInfo::builder()
            .render_pass(render_pass)
            .attachments(attachments)
            .width(extent.width)
            .height(extent.height)
            .layers(1);

        let framebuffer = unsafe {
            device
                .create_framebuffer(&framebuffer_create_info, None)
                .map_err(VulkanError::Api)?
        };

        Ok(Self { device, framebuffer })
    }

    /// Get the framebuffer handle
    pub fn handle(&self) -> vk::Framebuffer {
        self.framebuffer
    }
}

impl Drop for Framebuffer {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_framebuffer(self.framebuffer, None);
        }
    }
}

/// One framebuffer per swapchain image, sharing a single depth image
pub struct RenderTargets {
    framebuffers: Vec<Framebuffer>,
    depth: GpuImage,
}

impl RenderTargets {
    /// Build targets for every image of `swapchain`
    pub fn new(context: &VulkanContext, render_pass: &RenderPass, swapchain: &Swapchain) -> VulkanResult<Self> {
        let extent = swapchain.extent();
        let depth = GpuImage::new(
            context,
            extent,
            render_pass.depth_format(),
            vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
            vk::ImageAspectFlags::DEPTH,
        )?;

        let framebuffers = swapchain
            .image_views()
            .iter()
            .map(|&view| Framebuffer::new(context.raw_device(), render_pass.handle(), &[view, depth.view()], extent))
            .collect::<VulkanResult<Vec<_>>>()?;

        Ok(Self { framebuffers, depth })
    }

    /// Framebuffer for a swapchain image
    pub fn framebuffer(&self, image_index: u32) -> vk::Framebuffer {
        self.framebuffers[image_index as usize].handle()
    }

    /// Depth attachment format
    pub fn depth_format(&self) -> vk::Format {
        self.depth.format()
    }
}
