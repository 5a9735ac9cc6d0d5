//! Point light pass
//!
//! `update` orbits every light and fills the light array of the frame's
//! [`GlobalUniforms`]. `render` draws one blended billboard per light, far to
//! near, after the opaque geometry.

use super::PipelineHandles;
use crate::foundation::math::{Mat4, Mat4Ext, Vec3};
use crate::render::error::RenderResult;
use crate::render::frame::{FrameInfo, GlobalUniforms};
use crate::render::recording::DrawCommands;
use crate::scene::{ring_axis, ObjectId, SceneObjectStore};
use ash::vk;
use std::collections::BTreeMap;

/// Per-draw parameters of one light billboard
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PointLightPushConstants {
    /// World position (w ignored)
    pub position: [f32; 4],
    /// Colour in xyz, intensity in w
    pub color: [f32; 4],
    /// Billboard radius
    pub radius: f32,
    _padding: [f32; 3],
}

unsafe impl bytemuck::Pod for PointLightPushConstants {}
unsafe impl bytemuck::Zeroable for PointLightPushConstants {}

impl PointLightPushConstants {
    /// Stages that read the block
    pub const STAGES: vk::ShaderStageFlags =
        vk::ShaderStageFlags::from_raw(vk::ShaderStageFlags::VERTEX.as_raw() | vk::ShaderStageFlags::FRAGMENT.as_raw());

    /// Push constant range for the pipeline layout
    pub fn range() -> vk::PushConstantRange {
        vk::PushConstantRange {
            stage_flags: Self::STAGES,
            offset: 0,
            size: std::mem::size_of::<Self>() as u32,
        }
    }
}

/// Billboard draw for point lights
pub struct PointLightSystem {
    pipeline: PipelineHandles,
    angular_speed: f32,
}

impl PointLightSystem {
    /// Create the system; `angular_speed` is the orbit speed in radians per second
    pub fn new(pipeline: PipelineHandles, angular_speed: f32) -> Self {
        Self { pipeline, angular_speed }
    }

    /// Orbit the lights and append them to `ubo` in store order
    ///
    /// `ubo` is expected to start the frame with no lights. Fails when the
    /// scene has more lights than the uniform block holds.
    pub fn update(&self, frame: &FrameInfo, scene: &mut SceneObjectStore, ubo: &mut GlobalUniforms) -> RenderResult<()> {
        let rotation = Mat4::rotation_about(ring_axis(), self.angular_speed * frame.frame_time);

        for object in scene.iter_mut() {
            let Some(light) = object.light else { continue };

            let position = rotation * object.transform.translation.push(1.0);
            object.transform.translation = position.xyz();
            ubo.push_light(object.transform.translation, object.color, light.intensity)?;
        }
        Ok(())
    }

    /// Light IDs from farthest to nearest
    ///
    /// Equal distances are ordered by descending ID.
    pub fn draw_order(camera_position: Vec3, scene: &SceneObjectStore) -> Vec<ObjectId> {
        // Squared distances are non-negative, so their bit patterns order like the values
        let sorted: BTreeMap<(u32, ObjectId), ObjectId> = scene
            .iter()
            .filter(|object| object.light.is_some())
            .map(|object| {
                let distance_squared = (object.transform.translation - camera_position).norm_squared();
                ((distance_squared.to_bits(), object.id()), object.id())
            })
            .collect();

        sorted.into_values().rev().collect()
    }

    /// Record one billboard per light; must run inside the render pass, after opaque geometry
    pub fn render(&self, frame: &FrameInfo, scene: &SceneObjectStore, commands: &mut dyn DrawCommands) {
        debug_assert!(commands.in_render_pass(), "point lights must be recorded inside a render pass");

        let order = Self::draw_order(frame.camera.position(), scene);
        if order.is_empty() {
            return;
        }

        commands.bind_pipeline(self.pipeline.pipeline);
        commands.bind_descriptor_sets(self.pipeline.layout, 0, &[frame.global_descriptor_set]);

        for object in order.into_iter().filter_map(|id| scene.get(id)) {
            let Some(light) = object.light else { continue };
            let p = object.transform.translation;
            let push = PointLightPushConstants {
                position: [p.x, p.y, p.z, 1.0],
                color: [object.color.x, object.color.y, object.color.z, light.intensity],
                radius: light.radius,
                _padding: [0.0; 3],
            };
            commands.push_constants(
                self.pipeline.layout,
                PointLightPushConstants::STAGES,
                0,
                bytemuck::bytes_of(&push),
            );
            commands.draw(6, 1);
        }
    }
}
