//! Rendering
//!
//! The frame loop is split in two halves that never reference each other:
//!
//! - [`FrameOrchestrator`] owns the swapchain side of a frame (acquire,
//!   render pass boundaries, submit and present, recreation) and hands out a
//!   frame slot index.
//! - [`SceneRenderer`] owns everything indexed by that slot (uniform buffers
//!   and descriptor pools) and records the opaque and light passes.
//!
//! GPU work is expressed through small traits ([`HostBuffer`],
//! [`DescriptorDevice`], [`DrawCommands`], [`FrameBackend`]) so the frame
//! logic can be exercised without a device.

pub mod camera;
pub mod descriptors;
pub mod error;
pub mod frame;
pub mod orchestrator;
pub mod recording;
pub mod renderer;
pub mod systems;
pub mod uniforms;
pub mod vulkan;

pub use camera::Camera;
pub use descriptors::{
    DescriptorDevice, DescriptorPool, DescriptorResourceManager, DescriptorSetLayout, DescriptorWriter,
};
pub use error::{RenderError, RenderResult};
pub use frame::{FrameInfo, GlobalUniforms, ObjectUniforms, PointLightUniform, MAX_LIGHTS};
pub use orchestrator::{FrameBackend, FrameOrchestrator, FrameSlot, FrameState, SurfaceProvider, SwapchainFormats};
pub use recording::DrawCommands;
pub use renderer::{SceneRenderer, SetLayouts, UniformBuffers};
pub use systems::{PipelineHandles, PointLightSystem, SimpleRenderSystem};
pub use uniforms::{FrameUniformBufferSet, HostBuffer, InstanceLayout};
