//! Meshes uploaded to device-local memory

use super::buffer::Buffer;
use super::commands::CommandPool;
use super::context::VulkanContext;
use crate::assets::{MeshData, MeshDraw};
use crate::render::recording::DrawCommands;
use crate::render::vulkan::{VulkanError, VulkanResult};
use ash::vk;

/// Vertex and index buffers for one mesh
pub struct GpuMesh {
    vertex_buffer: Buffer,
    index_buffer: Option<Buffer>,
    vertex_count: u32,
    index_count: u32,
}

impl GpuMesh {
    /// Upload `data` through staging buffers
    pub fn upload(context: &VulkanContext, command_pool: &CommandPool, data: &MeshData) -> VulkanResult<Self> {
        if data.vertices.is_empty() {
            return Err(VulkanError::InvalidOperation {
                reason: "cannot upload a mesh with no vertices".to_string(),
            });
        }

        let vertex_buffer = Buffer::device_local_with_data(
            context,
            command_pool,
            data.vertex_bytes(),
            vk::BufferUsageFlags::VERTEX_BUFFER,
        )?;
        let index_buffer = if data.indices.is_empty() {
            None
        } else {
            Some(Buffer::device_local_with_data(
                context,
                command_pool,
                data.index_bytes(),
                vk::BufferUsageFlags::INDEX_BUFFER,
            )?)
        };

        log::debug!(
            "Uploaded mesh with {} vertices and {} indices",
            data.vertices.len(),
            data.indices.len()
        );

        Ok(Self {
            vertex_buffer,
            index_buffer,
            vertex_count: data.vertices.len() as u32,
            index_count: data.indices.len() as u32,
        })
    }
}

impl MeshDraw for GpuMesh {
    fn bind(&self, commands: &mut dyn DrawCommands) {
        commands.bind_vertex_buffer(self.vertex_buffer.handle());
        if let Some(index_buffer) = &self.index_buffer {
            commands.bind_index_buffer(index_buffer.handle());
        }
    }

    fn draw(&self, commands: &mut dyn DrawCommands) {
        if self.index_buffer.is_some() {
            commands.draw_indexed(self.index_count, 1);
        } else {
            commands.draw(self.vertex_count, 1);
        }
    }
}
