//! Command recording sink used by the render systems
//!
//! Systems record through [`DrawCommands`] rather than a raw command buffer so
//! the draw order they produce can be inspected without a device.

use ash::vk;

/// The subset of `vkCmd*` the render systems use
pub trait DrawCommands {
    /// Whether a render pass is currently open on this command buffer
    fn in_render_pass(&self) -> bool;

    /// Bind a graphics pipeline
    fn bind_pipeline(&mut self, pipeline: vk::Pipeline);

    /// Bind descriptor sets starting at `first_set`
    fn bind_descriptor_sets(&mut self, layout: vk::PipelineLayout, first_set: u32, sets: &[vk::DescriptorSet]);

    /// Update push constants
    fn push_constants(&mut self, layout: vk::PipelineLayout, stages: vk::ShaderStageFlags, offset: u32, data: &[u8]);

    /// Bind a vertex buffer at binding 0
    fn bind_vertex_buffer(&mut self, buffer: vk::Buffer);

    /// Bind a 32-bit index buffer
    fn bind_index_buffer(&mut self, buffer: vk::Buffer);

    /// Non-indexed draw
    fn draw(&mut self, vertex_count: u32, instance_count: u32);

    /// Indexed draw
    fn draw_indexed(&mut self, index_count: u32, instance_count: u32);
}
