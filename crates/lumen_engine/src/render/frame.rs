//! Per-frame data: GPU uniform records and the context handed to render systems
//!
//! The records are `#[repr(C)]` with explicit padding so they match the
//! std140 blocks in the shaders byte for byte and can be `Pod`.

use super::camera::Camera;
use super::error::{RenderError, RenderResult};
use super::orchestrator::FrameSlot;
use crate::foundation::math::{mat3_to_cols_array, Mat4, Mat4Ext, Vec3};
use crate::scene::Transform;
use ash::vk;

/// Capacity of the light array in [`GlobalUniforms`]; must match the shaders
pub const MAX_LIGHTS: usize = 10;

/// One entry of the light array
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PointLightUniform {
    /// World position (w ignored)
    pub position: [f32; 4],
    /// Colour in xyz, intensity in w
    pub color: [f32; 4],
}

unsafe impl bytemuck::Pod for PointLightUniform {}
unsafe impl bytemuck::Zeroable for PointLightUniform {}

/// Per-frame uniform block bound at set 0, binding 0
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct GlobalUniforms {
    /// Projection matrix
    pub projection: [[f32; 4]; 4],
    /// View matrix
    pub view: [[f32; 4]; 4],
    /// Inverse view matrix (camera position in column 3)
    pub inverse_view: [[f32; 4]; 4],
    /// Ambient colour in xyz, intensity in w
    pub ambient_light_color: [f32; 4],
    /// Active lights occupy `point_lights[..num_lights]`
    pub point_lights: [PointLightUniform; MAX_LIGHTS],
    /// Number of valid entries in `point_lights`
    pub num_lights: i32,
    _padding: [i32; 3],
}

unsafe impl bytemuck::Pod for GlobalUniforms {}
unsafe impl bytemuck::Zeroable for GlobalUniforms {}

impl Default for GlobalUniforms {
    fn default() -> Self {
        let identity = Mat4::identity().to_cols_array();
        Self {
            projection: identity,
            view: identity,
            inverse_view: identity,
            ambient_light_color: [1.0, 1.0, 1.0, 0.02],
            point_lights: [PointLightUniform::default(); MAX_LIGHTS],
            num_lights: 0,
            _padding: [0; 3],
        }
    }
}

impl GlobalUniforms {
    /// Start a frame's block from the camera matrices, with no lights
    pub fn from_camera(camera: &Camera) -> Self {
        Self {
            projection: camera.projection().to_cols_array(),
            view: camera.view().to_cols_array(),
            inverse_view: camera.inverse_view().to_cols_array(),
            ..Self::default()
        }
    }

    /// Append a light; overflowing the fixed array is an error, never a silent drop
    pub fn push_light(&mut self, position: Vec3, color: Vec3, intensity: f32) -> RenderResult<()> {
        let index = self.light_count();
        if index >= MAX_LIGHTS {
            return Err(RenderError::LightBudgetExceeded { max: MAX_LIGHTS });
        }
        self.point_lights[index] = PointLightUniform {
            position: [position.x, position.y, position.z, 1.0],
            color: [color.x, color.y, color.z, intensity],
        };
        self.num_lights = index as i32 + 1;
        Ok(())
    }

    /// Number of lights written this frame
    pub fn light_count(&self) -> usize {
        self.num_lights.max(0) as usize
    }

    /// Lights written this frame
    pub fn lights(&self) -> &[PointLightUniform] {
        &self.point_lights[..self.light_count()]
    }
}

/// Per-object uniform record bound at set 1, binding 0
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ObjectUniforms {
    /// Model matrix
    pub model_matrix: [[f32; 4]; 4],
    /// Normal matrix padded to mat4
    pub normal_matrix: [[f32; 4]; 4],
}

unsafe impl bytemuck::Pod for ObjectUniforms {}
unsafe impl bytemuck::Zeroable for ObjectUniforms {}

impl From<&Transform> for ObjectUniforms {
    fn from(transform: &Transform) -> Self {
        Self {
            model_matrix: transform.matrix().to_cols_array(),
            normal_matrix: mat3_to_cols_array(&transform.normal_matrix()),
        }
    }
}

/// Context shared by the render systems while recording one frame
pub struct FrameInfo<'a> {
    slot: usize,
    /// Seconds since the previous frame
    pub frame_time: f32,
    /// Camera used for this frame
    pub camera: &'a Camera,
    /// Set 0 for this slot: the [`GlobalUniforms`] buffer
    pub global_descriptor_set: vk::DescriptorSet,
}

impl<'a> FrameInfo<'a> {
    /// Frame context for a slot the orchestrator has handed out
    pub fn new(
        slot: &FrameSlot,
        frame_time: f32,
        camera: &'a Camera,
        global_descriptor_set: vk::DescriptorSet,
    ) -> Self {
        Self {
            slot: slot.index(),
            frame_time,
            camera,
            global_descriptor_set,
        }
    }

    /// Active frame slot
    pub fn slot(&self) -> usize {
        self.slot
    }
}
