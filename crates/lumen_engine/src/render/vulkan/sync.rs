//! Synchronization primitives
//!
//! Each frame slot owns one [`FrameSync`]: a semaphore signalled when its
//! swapchain image is ready, one signalled when rendering finishes, and a
//! fence the host waits on before reusing the slot. [`ImagesInFlight`]
//! remembers which slot fence last rendered to each swapchain image, since
//! the presentation engine may hand images back in any order.

use crate::render::vulkan::{VulkanError, VulkanResult};
use ash::{vk, Device};

/// GPU-GPU synchronization primitive
pub struct Semaphore {
    device: Device,
    semaphore: vk::Semaphore,
}

impl Semaphore {
    /// Create a new semaphore
    pub fn new(device: Device) -> VulkanResult<Self> {
        let create_info = vk::SemaphoreCreateInfo::builder();

        let semaphore = unsafe { device.create_semaphore(&create_info, None).map_err(VulkanError::Api)? };

        Ok(Self { device, semaphore })
    }

    /// Get the semaphore handle
    pub fn handle(&self) -> vk::Semaphore {
        self.semaphore
    }
}

impl Drop for Semaphore {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_semaphore(self.semaphore, None);
        }
    }
}

/// Host-GPU synchronization primitive
pub struct Fence {
    device: Device,
    fence: vk::Fence,
}

impl Fence {
    /// Create a fence, optionally already signalled
    pub fn new(device: Device, signaled: bool) -> VulkanResult<Self> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };

        let create_info = vk::FenceCreateInfo::builder().flags(flags);

        let fence = unsafe { device.create_fence(&create_info, None).map_err(VulkanError::Api)? };

        Ok(Self { device, fence })
    }

    /// Block until the fence is signalled
    pub fn wait(&self) -> VulkanResult<()> {
        wait_for_fence(&self.device, self.fence)
    }

    /// Return the fence to the unsignalled state
    pub fn reset(&self) -> VulkanResult<()> {
        unsafe { self.device.reset_fences(&[self.fence]).map_err(VulkanError::Api) }
    }

    /// Get the fence handle
    pub fn handle(&self) -> vk::Fence {
        self.fence
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_fence(self.fence, None);
        }
    }
}

/// Synchronization objects for one frame slot
pub struct FrameSync {
    /// Signalled by acquire, waited on by the submit
    pub image_available: Semaphore,
    /// Signalled by the submit, waited on by present
    pub render_finished: Semaphore,
    /// Signalled when the slot's submission completes; starts signalled
    pub in_flight: Fence,
}

impl FrameSync {
    /// Create frame synchronization objects
    pub fn new(device: Device) -> VulkanResult<Self> {
        let image_available = Semaphore::new(device.clone())?;
        let render_finished = Semaphore::new(device.clone())?;
        let in_flight = Fence::new(device, true)?;

        Ok(Self {
            image_available,
            render_finished,
            in_flight,
        })
    }
}

/// Block until `fence` is signalled
pub fn wait_for_fence(device: &Device, fence: vk::Fence) -> VulkanResult<()> {
    unsafe { device.wait_for_fences(&[fence], true, u64::MAX).map_err(VulkanError::Api) }
}

/// Slot fence that last rendered to each swapchain image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagesInFlight {
    fences: Vec<vk::Fence>,
}

impl ImagesInFlight {
    /// Track `image_count` images, none of them in use
    pub fn new(image_count: usize) -> Self {
        Self {
            fences: vec![vk::Fence::null(); image_count],
        }
    }

    /// Record that `slot_fence` now owns `image_index`
    ///
    /// Returns the fence of a different slot that may still be rendering to
    /// the image; the caller must wait on it before submitting.
    pub fn claim(&mut self, image_index: u32, slot_fence: vk::Fence) -> Option<vk::Fence> {
        let previous = std::mem::replace(&mut self.fences[image_index as usize], slot_fence);
        (previous != vk::Fence::null() && previous != slot_fence).then_some(previous)
    }

    /// Forget all owners, e.g. after the swapchain was rebuilt with `image_count` images
    pub fn reset(&mut self, image_count: usize) {
        self.fences.clear();
        self.fences.resize(image_count, vk::Fence::null());
    }

    /// Number of tracked images
    pub fn image_count(&self) -> usize {
        self.fences.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;

    #[test]
    fn test_first_claim_needs_no_wait() {
        let mut images = ImagesInFlight::new(3);
        assert_eq!(images.claim(1, vk::Fence::from_raw(10)), None);
    }

    #[test]
    fn test_claim_by_other_slot_returns_previous_owner() {
        let mut images = ImagesInFlight::new(2);
        let slot_a = vk::Fence::from_raw(10);
        let slot_b = vk::Fence::from_raw(11);

        images.claim(0, slot_a);
        assert_eq!(images.claim(0, slot_b), Some(slot_a));
        // Same slot coming back to its own image does not wait on itself
        assert_eq!(images.claim(0, slot_b), None);
    }

    #[test]
    fn test_reset_forgets_owners_and_resizes() {
        let mut images = ImagesInFlight::new(2);
        images.claim(0, vk::Fence::from_raw(10));
        images.reset(4);
        assert_eq!(images.image_count(), 4);
        assert_eq!(images.claim(0, vk::Fence::from_raw(11)), None);
    }
}
