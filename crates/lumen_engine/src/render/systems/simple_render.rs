//! Opaque pass
//!
//! Draws every renderable object with its mesh and texture. Each object gets
//! a descriptor set (set 1) from the frame slot's pool, pointing at its record
//! in the per-object uniform buffer and at its texture.

use super::PipelineHandles;
use crate::assets::RenderAssets;
use crate::render::descriptors::{DescriptorPool, DescriptorSetLayout, DescriptorWriter};
use crate::render::error::{RenderError, RenderResult};
use crate::render::frame::{FrameInfo, ObjectUniforms};
use crate::render::recording::DrawCommands;
use crate::render::uniforms::{FrameUniformBufferSet, HostBuffer};
use crate::scene::SceneObjectStore;

/// Per-frame resources the opaque pass binds for each object
pub struct ObjectBindings<'a, B: HostBuffer> {
    /// Layout of set 1
    pub layout: &'a DescriptorSetLayout,
    /// The frame slot's pool, already reset
    pub pool: &'a mut DescriptorPool,
    /// Per-object uniform buffers
    pub uniforms: &'a FrameUniformBufferSet<B>,
}

/// Opaque geometry pass
pub struct SimpleRenderSystem {
    pipeline: PipelineHandles,
}

impl SimpleRenderSystem {
    /// Create the system
    pub fn new(pipeline: PipelineHandles) -> Self {
        Self { pipeline }
    }

    /// Write every object's model and normal matrix into the slot's per-object buffer
    pub fn update<B: HostBuffer>(
        &self,
        frame: &FrameInfo,
        scene: &SceneObjectStore,
        uniforms: &mut FrameUniformBufferSet<B>,
    ) -> RenderResult<()> {
        for (index, object) in scene.iter_indexed() {
            uniforms.write_index(frame.slot(), index, &ObjectUniforms::from(&object.transform))?;
        }
        uniforms.flush(frame.slot())?;
        Ok(())
    }

    /// Record every renderable object
    ///
    /// Objects without a texture are drawn with the registry's fallback
    /// texture. A missing mesh, or no texture at all, is an error.
    pub fn render<B: HostBuffer>(
        &self,
        frame: &FrameInfo,
        scene: &SceneObjectStore,
        assets: &RenderAssets,
        bindings: ObjectBindings<'_, B>,
        commands: &mut dyn DrawCommands,
    ) -> RenderResult<()> {
        debug_assert!(commands.in_render_pass(), "opaque geometry must be recorded inside a render pass");

        commands.bind_pipeline(self.pipeline.pipeline);
        commands.bind_descriptor_sets(self.pipeline.layout, 0, &[frame.global_descriptor_set]);

        for (index, object) in scene.iter_indexed() {
            let Some(renderable) = object.renderable else { continue };

            let mesh = assets
                .mesh(renderable.mesh)
                .ok_or_else(|| RenderError::MissingAsset(format!("mesh of object {}", object.id())))?;
            let image_info = assets
                .texture_info(renderable.texture)
                .ok_or_else(|| RenderError::MissingAsset(format!("texture of object {}", object.id())))?;

            let set = DescriptorWriter::new(bindings.layout)
                .write_buffer(0, bindings.uniforms.descriptor_info_for_index(frame.slot(), index))
                .write_image(1, image_info)
                .build(bindings.pool)?;

            commands.bind_descriptor_sets(self.pipeline.layout, 1, &[set.raw()]);
            mesh.bind(commands);
            mesh.draw(commands);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::fake::{FakeMesh, FakeTexture};
    use crate::assets::MeshHandle;
    use crate::foundation::math::Vec3;
    use crate::render::camera::Camera;
    use crate::render::descriptors::fake::FakeDescriptorDevice;
    use crate::render::descriptors::{DescriptorDevice, DescriptorPoolConfig, DescriptorResource};
    use crate::render::orchestrator::FrameSlot;
    use crate::render::recording::recorder::{Command, RecordingCommands};
    use crate::render::renderer::SetLayouts;
    use crate::render::uniforms::tests::MemoryBuffer;
    use crate::render::uniforms::InstanceLayout;
    use ash::vk::{self, Handle};
    use slotmap::SlotMap;
    use std::sync::Arc;

    struct Fixture {
        device: Arc<FakeDescriptorDevice>,
        layout: DescriptorSetLayout,
        pool: DescriptorPool,
        uniforms: FrameUniformBufferSet<MemoryBuffer>,
        assets: RenderAssets,
        mesh: MeshHandle,
    }

    fn fixture(capacity: u32) -> Fixture {
        let device = Arc::new(FakeDescriptorDevice::default());
        let dyn_device = Arc::clone(&device) as Arc<dyn DescriptorDevice>;
        let layout = SetLayouts::new(Arc::clone(&dyn_device)).expect("layouts").object;
        let pool = DescriptorPool::new(dyn_device, DescriptorPoolConfig::new(capacity), Some(1)).expect("pool");

        let instance = InstanceLayout::new(std::mem::size_of::<ObjectUniforms>() as u64, 8, 256);
        let buffers = (0..2).map(|i| MemoryBuffer::new(instance.buffer_size() as usize, 50 + i)).collect();
        let uniforms = FrameUniformBufferSet::from_buffers(buffers, instance).expect("uniforms");

        let mut assets = RenderAssets::new();
        let mesh = assets.add_mesh(Box::new(FakeMesh { buffer: 900, index_count: 36 }));
        let white = assets.add_texture(Box::new(FakeTexture(1)));
        assets.set_fallback_texture(white);

        Fixture {
            device,
            layout,
            pool,
            uniforms,
            assets,
            mesh,
        }
    }

    fn frame(camera: &Camera) -> FrameInfo<'_> {
        FrameInfo::new(&FrameSlot::idle(1), 0.0, camera, vk::DescriptorSet::from_raw(77))
    }

    #[test]
    fn test_objects_bind_their_own_record_and_texture() {
        let mut fx = fixture(8);
        let brick = fx.assets.add_texture(Box::new(FakeTexture(2)));

        let mut scene = SceneObjectStore::new(8);
        scene.make_point_light(1.0, 0.1, Vec3::new(1.0, 1.0, 1.0)).expect("light");
        let plain = scene.create_renderable(fx.mesh).expect("plain").id();
        let textured = scene.create_renderable(fx.mesh).expect("textured");
        if let Some(renderable) = textured.renderable.as_mut() {
            renderable.texture = Some(brick);
        }

        let camera = Camera::new();
        let mut commands = RecordingCommands::inside_pass();
        let system = SimpleRenderSystem::new(PipelineHandles::default());
        let bindings = ObjectBindings {
            layout: &fx.layout,
            pool: &mut fx.pool,
            uniforms: &fx.uniforms,
        };
        system
            .render(&frame(&camera), &scene, &fx.assets, bindings, &mut commands)
            .expect("render");

        let object_sets: Vec<vk::DescriptorSet> = commands
            .commands
            .iter()
            .filter_map(|c| match c {
                Command::BindDescriptorSets { first_set: 1, sets } => Some(sets[0]),
                _ => None,
            })
            .collect();
        assert_eq!(object_sets.len(), 2);
        assert_eq!(fx.pool.allocated(), 2);

        let stride = fx.uniforms.layout().stride;
        for (set, (instance, view)) in object_sets.iter().zip([(1u64, 1u64), (2, 2)]) {
            let writes = fx.device.writes_for(*set);
            assert_eq!(writes.len(), 2);
            for (binding, _, resource) in writes {
                match (binding, resource) {
                    (0, DescriptorResource::Buffer(info)) => {
                        assert_eq!(info.buffer.as_raw(), 51);
                        assert_eq!(info.offset, instance * stride);
                    }
                    (1, DescriptorResource::Image(info)) => assert_eq!(info.image_view.as_raw(), view),
                    other => panic!("unexpected write {other:?}"),
                }
            }
        }
        assert_eq!(scene.instance_index(plain), Some(1));

        let indexed_draws = commands
            .commands
            .iter()
            .filter(|c| matches!(c, Command::DrawIndexed { index_count: 36, .. }))
            .count();
        assert_eq!(indexed_draws, 2);
        assert_eq!(
            commands.commands[1],
            Command::BindDescriptorSets {
                first_set: 0,
                sets: vec![vk::DescriptorSet::from_raw(77)]
            }
        );
    }

    #[test]
    fn test_missing_mesh_is_reported() {
        let mut fx = fixture(8);
        let mut keys: SlotMap<MeshHandle, ()> = SlotMap::with_key();
        keys.insert(());
        let foreign = keys.insert(());

        let mut scene = SceneObjectStore::new(4);
        scene.create_renderable(foreign).expect("renderable");

        let camera = Camera::new();
        let bindings = ObjectBindings {
            layout: &fx.layout,
            pool: &mut fx.pool,
            uniforms: &fx.uniforms,
        };
        let result = SimpleRenderSystem::new(PipelineHandles::default()).render(
            &frame(&camera),
            &scene,
            &fx.assets,
            bindings,
            &mut RecordingCommands::inside_pass(),
        );
        assert!(matches!(result, Err(RenderError::MissingAsset(_))));
    }

    #[test]
    fn test_pool_exhaustion_surfaces() {
        let mut fx = fixture(1);
        let mut scene = SceneObjectStore::new(4);
        scene.create_renderable(fx.mesh).expect("first");
        scene.create_renderable(fx.mesh).expect("second");

        let camera = Camera::new();
        let bindings = ObjectBindings {
            layout: &fx.layout,
            pool: &mut fx.pool,
            uniforms: &fx.uniforms,
        };
        let result = SimpleRenderSystem::new(PipelineHandles::default()).render(
            &frame(&camera),
            &scene,
            &fx.assets,
            bindings,
            &mut RecordingCommands::inside_pass(),
        );
        assert!(matches!(
            result,
            Err(RenderError::DescriptorPoolExhausted { slot: Some(1), capacity: 1 })
        ));
    }

    #[test]
    fn test_update_writes_every_object_and_flushes() {
        let mut fx = fixture(8);
        let mut scene = SceneObjectStore::new(8);
        scene.create().expect("a");
        let b = scene.create_renderable(fx.mesh).expect("b");
        b.transform.translation = Vec3::new(1.0, 2.0, 3.0);

        let camera = Camera::new();
        SimpleRenderSystem::new(PipelineHandles::default())
            .update(&frame(&camera), &scene, &mut fx.uniforms)
            .expect("update");

        assert!(!fx.uniforms.has_unflushed_writes(1));
        let stride = fx.uniforms.layout().stride as usize;
        let size = std::mem::size_of::<ObjectUniforms>();
        let device = fx.uniforms.buffer(1).device.borrow().clone();
        let record: ObjectUniforms = bytemuck::pod_read_unaligned(&device[stride..stride + size]);
        assert_eq!(record.model_matrix[3], [1.0, 2.0, 3.0, 1.0]);
    }
}
