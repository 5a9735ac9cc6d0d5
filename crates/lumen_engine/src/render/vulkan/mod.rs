//! Vulkan rendering backend
//!
//! RAII wrappers over ash: every type here owns its Vulkan object and
//! destroys it on drop. Nothing outside this module calls `ash` entry points
//! directly except the descriptor layer.

pub mod backend;
pub mod buffer;
pub mod commands;
pub mod context;
pub mod framebuffer;
pub mod image;
pub mod mesh;
pub mod pipeline;
pub mod render_pass;
pub mod swapchain;
pub mod sync;
pub mod texture;
pub mod window;

pub use backend::VulkanFrameBackend;
pub use buffer::Buffer;
pub use commands::{CommandPool, CommandRecorder};
pub use context::{PhysicalDeviceInfo, VulkanContext, VulkanError, VulkanResult};
pub use framebuffer::{Framebuffer, RenderTargets};
pub use image::GpuImage;
pub use mesh::GpuMesh;
pub use pipeline::{BlendMode, GraphicsPipeline, PipelineConfig, ShaderModule, VertexInput};
pub use render_pass::RenderPass;
pub use swapchain::Swapchain;
pub use sync::{Fence, FrameSync, Semaphore};
pub use texture::Texture;
pub use window::{Window, WindowError, WindowResult};
