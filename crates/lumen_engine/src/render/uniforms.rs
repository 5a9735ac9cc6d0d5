//! Frame uniform buffer set
//!
//! One host-visible buffer per frame slot. The slot index handed out by the
//! frame orchestrator is the only way to reach a buffer, and the orchestrator
//! only hands out a slot after its fence has signalled, so the host never
//! writes memory the GPU is still reading.
//!
//! A buffer may hold several instances of the same record (the per-object
//! buffer holds one per scene object). Instances are placed at a stride that
//! satisfies both `minUniformBufferOffsetAlignment` (so each can be bound as
//! its own descriptor range) and `nonCoherentAtomSize` (so each can be
//! flushed on its own).

use crate::render::vulkan::{VulkanError, VulkanResult};
use ash::vk;

/// Host-visible, persistently mapped GPU buffer
pub trait HostBuffer {
    /// Size of the buffer in bytes
    fn size(&self) -> vk::DeviceSize;

    /// Copy `bytes` into mapped memory at `offset`
    fn write_bytes(&mut self, bytes: &[u8], offset: vk::DeviceSize) -> VulkanResult<()>;

    /// Make host writes in the range visible to the device
    ///
    /// `size` may be `vk::WHOLE_SIZE`. Required for non-coherent memory and a
    /// no-op in effect for coherent memory.
    fn flush_range(&self, offset: vk::DeviceSize, size: vk::DeviceSize) -> VulkanResult<()>;

    /// Raw handle for descriptor writes
    fn handle(&self) -> vk::Buffer;
}

/// Round `size` up to a multiple of `alignment` (no-op for alignment 0 or 1)
pub fn aligned_size(size: vk::DeviceSize, alignment: vk::DeviceSize) -> vk::DeviceSize {
    if alignment <= 1 {
        size
    } else {
        size.div_ceil(alignment) * alignment
    }
}

fn gcd(mut a: vk::DeviceSize, mut b: vk::DeviceSize) -> vk::DeviceSize {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Instance stride alignment that keeps every instance independently bindable and flushable
pub fn uniform_instance_alignment(min_uniform_offset: vk::DeviceSize, non_coherent_atom: vk::DeviceSize) -> vk::DeviceSize {
    let (a, b) = (min_uniform_offset.max(1), non_coherent_atom.max(1));
    a / gcd(a, b) * b
}

/// Placement of fixed-size records inside a uniform buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstanceLayout {
    /// Size of one record in bytes
    pub instance_size: vk::DeviceSize,
    /// Number of records
    pub instance_count: u32,
    /// Distance between consecutive records
    pub stride: vk::DeviceSize,
}

impl InstanceLayout {
    /// Layout for `instance_count` records of `instance_size` bytes with the given alignment
    pub fn new(instance_size: vk::DeviceSize, instance_count: u32, min_offset_alignment: vk::DeviceSize) -> Self {
        Self {
            instance_size,
            instance_count,
            stride: aligned_size(instance_size, min_offset_alignment),
        }
    }

    /// Layout for a single record of type `T`
    pub fn single<T>() -> Self {
        Self::new(std::mem::size_of::<T>() as vk::DeviceSize, 1, 1)
    }

    /// Bytes a buffer needs to hold every record
    pub fn buffer_size(&self) -> vk::DeviceSize {
        self.stride * vk::DeviceSize::from(self.instance_count)
    }

    /// Byte offset of record `index`
    pub fn offset_of(&self, index: u32) -> vk::DeviceSize {
        self.stride * vk::DeviceSize::from(index)
    }
}

struct UniformSlot<B> {
    buffer: B,
    unflushed: bool,
}

/// One uniform buffer per frame slot
pub struct FrameUniformBufferSet<B: HostBuffer> {
    slots: Vec<UniformSlot<B>>,
    layout: InstanceLayout,
}

impl<B: HostBuffer> FrameUniformBufferSet<B> {
    /// Wrap already-allocated buffers, one per frame slot
    pub fn from_buffers(buffers: Vec<B>, layout: InstanceLayout) -> VulkanResult<Self> {
        if buffers.is_empty() {
            return Err(VulkanError::InvalidOperation {
                reason: "uniform buffer set needs at least one frame slot".to_string(),
            });
        }
        if let Some(small) = buffers.iter().find(|b| b.size() < layout.buffer_size()) {
            return Err(VulkanError::InvalidOperation {
                reason: format!(
                    "uniform buffer of {} bytes cannot hold {} bytes",
                    small.size(),
                    layout.buffer_size()
                ),
            });
        }

        log::debug!(
            "Uniform buffer set: {} slot(s), {} instance(s) of {} bytes at stride {}",
            buffers.len(),
            layout.instance_count,
            layout.instance_size,
            layout.stride
        );

        Ok(Self {
            slots: buffers
                .into_iter()
                .map(|buffer| UniformSlot { buffer, unflushed: false })
                .collect(),
            layout,
        })
    }

    /// Number of frame slots
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Record placement inside each buffer
    pub fn layout(&self) -> InstanceLayout {
        self.layout
    }

    /// Copy a record into instance 0 of the slot's buffer
    pub fn write<T: bytemuck::Pod>(&mut self, slot: usize, data: &T) -> VulkanResult<()> {
        self.write_index(slot, 0, data)
    }

    /// Copy a record into instance `index` of the slot's buffer
    pub fn write_index<T: bytemuck::Pod>(&mut self, slot: usize, index: u32, data: &T) -> VulkanResult<()> {
        let bytes = bytemuck::bytes_of(data);
        if bytes.len() as vk::DeviceSize > self.layout.instance_size {
            return Err(VulkanError::InvalidOperation {
                reason: format!(
                    "record of {} bytes exceeds instance size {}",
                    bytes.len(),
                    self.layout.instance_size
                ),
            });
        }
        if index >= self.layout.instance_count {
            return Err(VulkanError::InvalidOperation {
                reason: format!("instance {index} out of range ({} instances)", self.layout.instance_count),
            });
        }

        let offset = self.layout.offset_of(index);
        let entry = self.slot_mut(slot);
        entry.buffer.write_bytes(bytes, offset)?;
        entry.unflushed = true;
        Ok(())
    }

    /// Make every write to the slot visible to the device
    pub fn flush(&mut self, slot: usize) -> VulkanResult<()> {
        let entry = self.slot_mut(slot);
        entry.buffer.flush_range(0, vk::WHOLE_SIZE)?;
        entry.unflushed = false;
        Ok(())
    }

    /// Whether the slot has writes that have not been flushed since
    pub fn has_unflushed_writes(&self, slot: usize) -> bool {
        self.slots[slot].unflushed
    }

    /// Descriptor range covering instance 0 of the slot's buffer
    pub fn descriptor_info(&self, slot: usize) -> vk::DescriptorBufferInfo {
        self.descriptor_info_for_index(slot, 0)
    }

    /// Descriptor range covering instance `index` of the slot's buffer
    pub fn descriptor_info_for_index(&self, slot: usize, index: u32) -> vk::DescriptorBufferInfo {
        vk::DescriptorBufferInfo {
            buffer: self.slots[slot].buffer.handle(),
            offset: self.layout.offset_of(index),
            range: self.layout.instance_size,
        }
    }

    #[cfg(test)]
    pub(crate) fn buffer(&self, slot: usize) -> &B {
        &self.slots[slot].buffer
    }

    fn slot_mut(&mut self, slot: usize) -> &mut UniformSlot<B> {
        assert!(slot < self.slots.len(), "frame slot {slot} out of range ({} slots)", self.slots.len());
        &mut self.slots[slot]
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use ash::vk::Handle;
    use std::cell::RefCell;

    /// In-memory stand-in for a mapped buffer that tracks what reached the "device"
    pub(crate) struct MemoryBuffer {
        pub host: Vec<u8>,
        pub device: RefCell<Vec<u8>>,
        pub flushes: RefCell<Vec<(vk::DeviceSize, vk::DeviceSize)>>,
        pub raw: u64,
    }

    impl MemoryBuffer {
        pub(crate) fn new(size: usize, raw: u64) -> Self {
            Self {
                host: vec![0; size],
                device: RefCell::new(vec![0; size]),
                flushes: RefCell::new(Vec::new()),
                raw,
            }
        }
    }

    impl HostBuffer for MemoryBuffer {
        fn size(&self) -> vk::DeviceSize {
            self.host.len() as vk::DeviceSize
        }

        fn write_bytes(&mut self, bytes: &[u8], offset: vk::DeviceSize) -> VulkanResult<()> {
            let start = offset as usize;
            self.host[start..start + bytes.len()].copy_from_slice(bytes);
            Ok(())
        }

        fn flush_range(&self, offset: vk::DeviceSize, size: vk::DeviceSize) -> VulkanResult<()> {
            let start = offset as usize;
            let end = if size == vk::WHOLE_SIZE { self.host.len() } else { start + size as usize };
            self.device.borrow_mut()[start..end].copy_from_slice(&self.host[start..end]);
            self.flushes.borrow_mut().push((offset, size));
            Ok(())
        }

        fn handle(&self) -> vk::Buffer {
            vk::Buffer::from_raw(self.raw)
        }
    }

    fn set_of(slots: usize, layout: InstanceLayout) -> FrameUniformBufferSet<MemoryBuffer> {
        let buffers = (0..slots)
            .map(|i| MemoryBuffer::new(layout.buffer_size() as usize, 100 + i as u64))
            .collect();
        FrameUniformBufferSet::from_buffers(buffers, layout).expect("uniform set")
    }

    #[test]
    fn test_aligned_size() {
        assert_eq!(aligned_size(100, 0), 100);
        assert_eq!(aligned_size(100, 64), 128);
        assert_eq!(aligned_size(128, 64), 128);
        assert_eq!(aligned_size(1, 256), 256);
    }

    #[test]
    fn test_instance_alignment_is_lcm() {
        assert_eq!(uniform_instance_alignment(256, 64), 256);
        assert_eq!(uniform_instance_alignment(16, 64), 64);
        assert_eq!(uniform_instance_alignment(0, 0), 1);
        assert_eq!(uniform_instance_alignment(48, 64), 192);
    }

    #[test]
    fn test_instance_layout_offsets() {
        let layout = InstanceLayout::new(128, 10, 256);
        assert_eq!(layout.stride, 256);
        assert_eq!(layout.buffer_size(), 2560);
        assert_eq!(layout.offset_of(3), 768);
    }

    #[test]
    fn test_write_is_invisible_until_flushed() {
        let mut set = set_of(2, InstanceLayout::single::<[f32; 4]>());
        set.write(0, &[1.0f32, 2.0, 3.0, 4.0]).expect("write");

        assert!(set.has_unflushed_writes(0));
        assert!(set.slots[0].buffer.device.borrow().iter().all(|&b| b == 0));

        set.flush(0).expect("flush");
        assert!(!set.has_unflushed_writes(0));
        let expected = bytemuck::bytes_of(&[1.0f32, 2.0, 3.0, 4.0]).to_vec();
        assert_eq!(*set.slots[0].buffer.device.borrow(), expected);
    }

    #[test]
    fn test_slots_are_independent() {
        let mut set = set_of(3, InstanceLayout::single::<u32>());
        set.write(1, &7u32).expect("write");
        set.flush(1).expect("flush");

        assert_eq!(set.slots[0].buffer.host, vec![0; 4]);
        assert_eq!(set.slots[2].buffer.host, vec![0; 4]);
        assert_eq!(set.slots[1].buffer.host, 7u32.to_ne_bytes().to_vec());
        assert!(set.slots[0].buffer.flushes.borrow().is_empty());
        assert!(!set.has_unflushed_writes(2));
    }

    #[test]
    fn test_indexed_writes_land_at_stride() {
        let layout = InstanceLayout::new(4, 4, 16);
        let mut set = set_of(1, layout);
        set.write_index(0, 2, &0xABCD_u32).expect("write");
        set.flush(0).expect("flush");

        let host = &set.slots[0].buffer.host;
        assert_eq!(&host[32..36], &0xABCD_u32.to_ne_bytes());
        assert_eq!(&set.slots[0].buffer.device.borrow()[32..36], &0xABCD_u32.to_ne_bytes());

        let info = set.descriptor_info_for_index(0, 2);
        assert_eq!(info.offset, 32);
        assert_eq!(info.range, 4);
        assert_eq!(info.buffer.as_raw(), 100);
    }

    #[test]
    fn test_rejects_oversized_record_and_bad_index() {
        let mut set = set_of(1, InstanceLayout::new(4, 2, 4));
        assert!(set.write(0, &[0u32; 2]).is_err());
        assert!(set.write_index(0, 2, &0u32).is_err());
    }

    #[test]
    fn test_rejects_undersized_buffers() {
        let layout = InstanceLayout::new(64, 2, 64);
        let result = FrameUniformBufferSet::from_buffers(vec![MemoryBuffer::new(64, 1)], layout);
        assert!(result.is_err());
        assert!(FrameUniformBufferSet::<MemoryBuffer>::from_buffers(Vec::new(), layout).is_err());
    }
}
