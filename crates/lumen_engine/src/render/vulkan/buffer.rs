//! GPU buffers
//!
//! [`Buffer`] owns a `VkBuffer` and its memory. Host-visible buffers can be
//! persistently mapped and then implement [`HostBuffer`] for the uniform
//! buffer sets. Mesh data goes through a staging buffer into device-local
//! memory.

use super::commands::CommandPool;
use super::context::VulkanContext;
use crate::render::uniforms::HostBuffer;
use crate::render::vulkan::{VulkanError, VulkanResult};
use ash::{vk, Device};
use std::ptr::NonNull;

/// Buffer wrapper with memory management
pub struct Buffer {
    device: Device,
    buffer: vk::Buffer,
    memory: vk::DeviceMemory,
    size: vk::DeviceSize,
    properties: vk::MemoryPropertyFlags,
    mapped: Option<NonNull<u8>>,
}

impl Buffer {
    /// Create a buffer and bind freshly allocated memory to it
    pub fn new(
        context: &VulkanContext,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        properties: vk::MemoryPropertyFlags,
    ) -> VulkanResult<Self> {
        let device = context.raw_device();
        let buffer_info = vk::BufferCreateInfo::builder()
            .size(size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe { device.create_buffer(&buffer_info, None).map_err(VulkanError::Api)? };

        let requirements = unsafe { device.get_buffer_memory_requirements(buffer) };
        let memory_type_index = match context.find_memory_type(requirements.memory_type_bits, properties) {
            Ok(index) => index,
            Err(e) => {
                unsafe { device.destroy_buffer(buffer, None) };
                return Err(e);
            }
        };

        let alloc_info = vk::MemoryAllocateInfo::builder()
            .allocation_size(requirements.size)
            .memory_type_index(memory_type_index);

        let memory = match unsafe { device.allocate_memory(&alloc_info, None) } {
            Ok(memory) => memory,
            Err(e) => {
                unsafe { device.destroy_buffer(buffer, None) };
                return Err(VulkanError::Api(e));
            }
        };

        let result = Self {
            device,
            buffer,
            memory,
            size,
            properties,
            mapped: None,
        };
        unsafe {
            result
                .device
                .bind_buffer_memory(buffer, memory, 0)
                .map_err(VulkanError::Api)?;
        }
        Ok(result)
    }

    /// Host-visible uniform buffer, mapped for its whole lifetime
    ///
    /// Memory is host-visible but not necessarily coherent, so writes must be
    /// flushed.
    pub fn mapped_uniform(context: &VulkanContext, size: vk::DeviceSize) -> VulkanResult<Self> {
        let mut buffer = Self::new(
            context,
            size,
            vk::BufferUsageFlags::UNIFORM_BUFFER,
            vk::MemoryPropertyFlags::HOST_VISIBLE,
        )?;
        buffer.map()?;
        Ok(buffer)
    }

    /// Device-local buffer filled with `bytes` through a staging copy
    pub fn device_local_with_data(
        context: &VulkanContext,
        command_pool: &CommandPool,
        bytes: &[u8],
        usage: vk::BufferUsageFlags,
    ) -> VulkanResult<Self> {
        let size = bytes.len() as vk::DeviceSize;
        let mut staging = Self::new(
            context,
            size,
            vk::BufferUsageFlags::TRANSFER_SRC,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )?;
        staging.map()?;
        staging.write_bytes(bytes, 0)?;

        let buffer = Self::new(
            context,
            size,
            usage | vk::BufferUsageFlags::TRANSFER_DST,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        )?;

        command_pool.submit_single_time(context.graphics_queue(), |device, command_buffer| {
            let region = vk::BufferCopy {
                src_offset: 0,
                dst_offset: 0,
                size,
            };
            unsafe { device.cmd_copy_buffer(command_buffer, staging.handle(), buffer.handle(), &[region]) };
        })?;

        Ok(buffer)
    }

    /// Map the whole buffer; a no-op when already mapped
    pub fn map(&mut self) -> VulkanResult<()> {
        if self.mapped.is_some() {
            return Ok(());
        }
        let ptr = unsafe {
            self.device
                .map_memory(self.memory, 0, vk::WHOLE_SIZE, vk::MemoryMapFlags::empty())
                .map_err(VulkanError::Api)?
        };
        self.mapped = NonNull::new(ptr.cast::<u8>());
        Ok(())
    }

    /// Unmap the buffer
    pub fn unmap(&mut self) {
        if self.mapped.take().is_some() {
            unsafe { self.device.unmap_memory(self.memory) };
        }
    }

    /// Get buffer handle
    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    fn is_coherent(&self) -> bool {
        self.properties.contains(vk::MemoryPropertyFlags::HOST_COHERENT)
    }
}

impl HostBuffer for Buffer {
    fn size(&self) -> vk::DeviceSize {
        self.size
    }

    fn write_bytes(&mut self, bytes: &[u8], offset: vk::DeviceSize) -> VulkanResult<()> {
        let Some(mapped) = self.mapped else {
            return Err(VulkanError::InvalidOperation {
                reason: "buffer is not mapped".to_string(),
            });
        };
        if offset + bytes.len() as vk::DeviceSize > self.size {
            return Err(VulkanError::InvalidOperation {
                reason: format!("write of {} bytes at {} overflows buffer of {}", bytes.len(), offset, self.size),
            });
        }
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), mapped.as_ptr().add(offset as usize), bytes.len());
        }
        Ok(())
    }

    fn flush_range(&self, offset: vk::DeviceSize, size: vk::DeviceSize) -> VulkanResult<()> {
        if self.is_coherent() || self.mapped.is_none() {
            return Ok(());
        }
        let range = vk::MappedMemoryRange::builder()
            .memory(self.memory)
            .offset(offset)
            .size(size)
            .build();
        unsafe {
            self.device
                .flush_mapped_memory_ranges(&[range])
                .map_err(VulkanError::Api)
        }
    }

    fn handle(&self) -> vk::Buffer {
        self.buffer
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        self.unmap();
        unsafe {
            self.device.destroy_buffer(self.buffer, None);
            self.device.free_memory(self.memory, None);
        }
    }
}
