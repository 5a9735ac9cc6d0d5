//! Render systems recorded inside the main render pass
//!
//! The opaque pass always records before the light pass: light billboards
//! blend over geometry that is already in the colour and depth attachments.

pub mod point_light;
pub mod simple_render;

pub use point_light::{PointLightPushConstants, PointLightSystem};
pub use simple_render::{ObjectBindings, SimpleRenderSystem};

use ash::vk;

/// Raw handles a system records with; the pipeline objects are owned elsewhere
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineHandles {
    /// Graphics pipeline
    pub pipeline: vk::Pipeline,
    /// Layout used for descriptor binds and push constants
    pub layout: vk::PipelineLayout,
}
