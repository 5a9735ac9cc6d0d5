//! Renderer error taxonomy
//!
//! Everything here is fatal once it reaches the caller. Recoverable surface
//! conditions (out-of-date, suboptimal, resize) are handled inside the frame
//! orchestrator and never become a `RenderError`.

use super::vulkan::VulkanError;
use ash::vk;
use thiserror::Error;

/// Renderer errors
#[derive(Error, Debug)]
pub enum RenderError {
    /// Device, resource or pipeline creation failed
    #[error(transparent)]
    Vulkan(#[from] VulkanError),

    /// The scene has more point lights than the uniform block can hold
    #[error("Point lights exceed maximum of {max}")]
    LightBudgetExceeded {
        /// Size of the light array
        max: usize,
    },

    /// A frame slot's descriptor pool ran out of space
    #[error("Descriptor pool for frame slot {slot:?} exhausted (capacity {capacity} sets)")]
    DescriptorPoolExhausted {
        /// Frame slot whose pool is full; `None` for the long-lived global pool
        slot: Option<usize>,
        /// Maximum sets the pool was created with
        capacity: u32,
    },

    /// A descriptor write used a type the layout does not declare for that binding
    #[error("Descriptor binding {binding} expects {expected:?} but was written as {actual:?}")]
    DescriptorTypeMismatch {
        /// Binding index
        binding: u32,
        /// Type declared in the layout
        expected: vk::DescriptorType,
        /// Type implied by the write
        actual: vk::DescriptorType,
    },

    /// Swapchain recreation produced different attachment formats
    #[error("Swapchain formats changed on recreation: color {old_color:?} -> {new_color:?}, depth {old_depth:?} -> {new_depth:?}")]
    SwapchainFormatChanged {
        /// Previous colour format
        old_color: vk::Format,
        /// New colour format
        new_color: vk::Format,
        /// Previous depth format
        old_depth: vk::Format,
        /// New depth format
        new_depth: vk::Format,
    },

    /// Image acquisition failed with something other than out-of-date
    #[error("Failed to acquire swapchain image: {0:?}")]
    AcquireFailed(vk::Result),

    /// Submission or presentation failed with something other than out-of-date/suboptimal
    #[error("Failed to present swapchain image: {0:?}")]
    PresentFailed(vk::Result),

    /// A scene object referenced an asset handle that is not loaded
    #[error("Missing asset: {0}")]
    MissingAsset(String),
}

/// Result type for renderer operations
pub type RenderResult<T> = Result<T, RenderError>;
