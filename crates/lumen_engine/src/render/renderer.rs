//! Per-frame scene rendering
//!
//! [`SceneRenderer`] owns everything indexed by frame slot (the global and
//! per-object uniform buffers and the descriptor pools) and runs the two
//! render systems against it. It never touches the swapchain: the caller
//! gets a slot from the frame orchestrator, and every method here only uses
//! that slot's resources.

use super::descriptors::{
    AllocatedSet, DescriptorDevice, DescriptorResourceManager, DescriptorSetLayout, DescriptorWriter,
};
use super::error::RenderResult;
use super::frame::{FrameInfo, GlobalUniforms};
use super::orchestrator::FrameSlot;
use super::recording::DrawCommands;
use super::systems::{ObjectBindings, PointLightSystem, SimpleRenderSystem};
use super::uniforms::{FrameUniformBufferSet, HostBuffer, InstanceLayout};
use crate::assets::RenderAssets;
use crate::config::DescriptorBudget;
use crate::render::vulkan::VulkanResult;
use crate::scene::SceneObjectStore;
use ash::vk;
use std::sync::Arc;

/// The two descriptor set layouts shared by the pipelines
pub struct SetLayouts {
    /// Set 0: [`GlobalUniforms`]
    pub global: DescriptorSetLayout,
    /// Set 1: per-object uniforms and diffuse texture
    pub object: DescriptorSetLayout,
}

impl SetLayouts {
    /// Create both layouts
    pub fn new(device: Arc<dyn DescriptorDevice>) -> VulkanResult<Self> {
        let global = DescriptorSetLayout::builder()
            .add_uniform_buffer(0, vk::ShaderStageFlags::ALL_GRAPHICS)
            .build(Arc::clone(&device))?;
        let object = DescriptorSetLayout::builder()
            .add_uniform_buffer(0, vk::ShaderStageFlags::ALL_GRAPHICS)
            .add_combined_image_sampler(1, vk::ShaderStageFlags::FRAGMENT)
            .build(device)?;
        Ok(Self { global, object })
    }

    /// Layouts for the opaque pipeline, in set order
    pub fn opaque(&self) -> [vk::DescriptorSetLayout; 2] {
        [self.global.handle(), self.object.handle()]
    }

    /// Layouts for the light pipeline
    pub fn lights(&self) -> [vk::DescriptorSetLayout; 1] {
        [self.global.handle()]
    }
}

/// Host buffers backing the uniform sets, one of each per frame slot
pub struct UniformBuffers<B: HostBuffer> {
    /// Buffers holding one [`GlobalUniforms`]
    pub global: Vec<B>,
    /// Buffers holding one record per scene object
    pub objects: Vec<B>,
    /// Placement of object records
    pub object_layout: InstanceLayout,
}

/// Frame-slot resources plus the render systems that use them
pub struct SceneRenderer<B: HostBuffer> {
    simple: SimpleRenderSystem,
    lights: PointLightSystem,
    global_uniforms: FrameUniformBufferSet<B>,
    object_uniforms: FrameUniformBufferSet<B>,
    global_sets: Vec<AllocatedSet>,
    descriptors: DescriptorResourceManager,
    layouts: SetLayouts,
}

impl<B: HostBuffer> SceneRenderer<B> {
    /// Build the uniform sets, descriptor pools and one global set per slot
    pub fn new(
        device: Arc<dyn DescriptorDevice>,
        layouts: SetLayouts,
        buffers: UniformBuffers<B>,
        budget: &DescriptorBudget,
        systems: (SimpleRenderSystem, PointLightSystem),
    ) -> RenderResult<Self> {
        let frames_in_flight = buffers.global.len();
        let global_uniforms = FrameUniformBufferSet::from_buffers(buffers.global, InstanceLayout::single::<GlobalUniforms>())?;
        let object_uniforms = FrameUniformBufferSet::from_buffers(buffers.objects, buffers.object_layout)?;

        let mut descriptors = DescriptorResourceManager::new(device, frames_in_flight, frames_in_flight as u32, budget)?;
        let global_sets = (0..frames_in_flight)
            .map(|slot| {
                DescriptorWriter::new(&layouts.global)
                    .write_buffer(0, global_uniforms.descriptor_info(slot))
                    .build(descriptors.global_pool())
            })
            .collect::<RenderResult<Vec<_>>>()?;

        let (simple, lights) = systems;
        Ok(Self {
            simple,
            lights,
            global_uniforms,
            object_uniforms,
            global_sets,
            descriptors,
            layouts,
        })
    }

    /// Number of frame slots
    pub fn frames_in_flight(&self) -> usize {
        self.global_sets.len()
    }

    /// Recycle the slot's descriptor pool
    pub fn begin_frame(&mut self, slot: &FrameSlot) -> VulkanResult<()> {
        self.descriptors.reset(slot.index())
    }

    /// Set 0 for the slot
    pub fn global_set(&self, slot: usize) -> vk::DescriptorSet {
        self.global_sets[slot].raw()
    }

    /// Move the lights and upload this frame's global and per-object uniforms
    pub fn update(&mut self, frame: &FrameInfo, scene: &mut SceneObjectStore) -> RenderResult<()> {
        let mut ubo = GlobalUniforms::from_camera(frame.camera);
        self.lights.update(frame, scene, &mut ubo)?;
        self.global_uniforms.write(frame.slot(), &ubo)?;
        self.global_uniforms.flush(frame.slot())?;

        self.simple.update(frame, scene, &mut self.object_uniforms)
    }

    /// Record the opaque pass, then the light pass
    pub fn record(
        &mut self,
        frame: &FrameInfo,
        scene: &SceneObjectStore,
        assets: &RenderAssets,
        commands: &mut dyn DrawCommands,
    ) -> RenderResult<()> {
        let bindings = ObjectBindings {
            layout: &self.layouts.object,
            pool: self.descriptors.frame_pool(frame.slot()),
            uniforms: &self.object_uniforms,
        };
        self.simple.render(frame, scene, assets, bindings, commands)?;
        self.lights.render(frame, scene, commands);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::fake::{FakeMesh, FakeTexture};
    use crate::foundation::math::Vec3;
    use crate::render::camera::Camera;
    use crate::render::descriptors::fake::FakeDescriptorDevice;
    use crate::render::frame::ObjectUniforms;
    use crate::render::orchestrator::tests::{Event, MockBackend, MockSurface};
    use crate::render::orchestrator::FrameOrchestrator;
    use crate::render::recording::recorder::{Command, RecordingCommands};
    use crate::render::systems::PipelineHandles;
    use crate::render::uniforms::tests::MemoryBuffer;
    use ash::vk::Handle;

    fn handles(raw: u64) -> PipelineHandles {
        PipelineHandles {
            pipeline: vk::Pipeline::from_raw(raw),
            layout: vk::PipelineLayout::from_raw(raw + 1),
        }
    }

    fn renderer(frames: usize) -> SceneRenderer<MemoryBuffer> {
        let device = Arc::new(FakeDescriptorDevice::default()) as Arc<dyn DescriptorDevice>;
        let layouts = SetLayouts::new(Arc::clone(&device)).expect("layouts");
        let global_size = std::mem::size_of::<GlobalUniforms>();
        let object_layout = InstanceLayout::new(std::mem::size_of::<ObjectUniforms>() as u64, 16, 256);
        let buffers = UniformBuffers {
            global: (0..frames).map(|i| MemoryBuffer::new(global_size, 10 + i as u64)).collect(),
            objects: (0..frames)
                .map(|i| MemoryBuffer::new(object_layout.buffer_size() as usize, 20 + i as u64))
                .collect(),
            object_layout,
        };
        let budget = DescriptorBudget {
            max_sets: 16,
            uniform_buffers: 16,
            combined_image_samplers: 16,
        };
        let systems = (
            SimpleRenderSystem::new(handles(100)),
            PointLightSystem::new(handles(200), 0.5),
        );
        SceneRenderer::new(device, layouts, buffers, &budget, systems).expect("renderer")
    }

    fn assets() -> RenderAssets {
        let mut assets = RenderAssets::new();
        let white = assets.add_texture(Box::new(FakeTexture(1)));
        assets.set_fallback_texture(white);
        assets
    }

    #[test]
    fn test_frame_records_opaque_before_lights() {
        let mut renderer = renderer(2);
        let mut assets = assets();
        let mesh = assets.add_mesh(Box::new(FakeMesh { buffer: 500, index_count: 6 }));

        let mut scene = SceneObjectStore::new(16);
        scene
            .make_light_ring(&[Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0)], 1.0, 0.1, Vec3::new(-1.0, -1.0, -1.0))
            .expect("lights");
        scene.create_renderable(mesh).expect("cube");

        let camera = Camera::new();
        let slot = FrameSlot::idle(0);
        renderer.begin_frame(&slot).expect("begin");
        let frame = FrameInfo::new(&slot, 0.016, &camera, renderer.global_set(0));
        renderer.update(&frame, &mut scene).expect("update");

        let mut commands = RecordingCommands::inside_pass();
        renderer.record(&frame, &scene, &assets, &mut commands).expect("record");

        let last_opaque = commands
            .commands
            .iter()
            .rposition(|c| matches!(c, Command::DrawIndexed { .. }))
            .expect("opaque draw");
        let first_light = commands
            .commands
            .iter()
            .position(|c| matches!(c, Command::Draw { vertex_count: 6, .. }))
            .expect("light draw");
        assert!(last_opaque < first_light);
        assert_eq!(commands.commands[0], Command::BindPipeline(vk::Pipeline::from_raw(100)));
        assert!(commands.commands.contains(&Command::BindPipeline(vk::Pipeline::from_raw(200))));
    }

    #[test]
    fn test_update_writes_only_the_active_slot() {
        let mut renderer = renderer(2);
        let mut scene = SceneObjectStore::new(16);
        scene
            .make_light_ring(&[Vec3::new(1.0, 1.0, 1.0); 3], 1.0, 0.1, Vec3::new(-1.0, -1.0, -1.0))
            .expect("lights");

        let camera = Camera::new();
        let frame = FrameInfo::new(&FrameSlot::idle(1), 0.0, &camera, renderer.global_set(1));
        renderer.update(&frame, &mut scene).expect("update");

        let read = |slot: usize| -> GlobalUniforms {
            let bytes = renderer.global_uniforms.buffer(slot).device.borrow().clone();
            bytemuck::pod_read_unaligned(&bytes[..std::mem::size_of::<GlobalUniforms>()])
        };
        assert_eq!(read(1).num_lights, 3);
        assert_eq!(read(0).num_lights, 0);
    }

    #[test]
    fn test_each_slot_has_its_own_global_set() {
        let renderer = renderer(3);
        assert_eq!(renderer.frames_in_flight(), 3);
        let sets: Vec<_> = (0..3).map(|slot| renderer.global_set(slot)).collect();
        assert_ne!(sets[0], sets[1]);
        assert_ne!(sets[1], sets[2]);
    }

    #[test]
    fn test_slot_resources_change_only_after_their_fence_wait() {
        let frames = 2;
        let mut renderer = renderer(frames);
        let mut surface = MockSurface::fixed(800, 600);
        let mut orchestrator = FrameOrchestrator::new(MockBackend::new(frames), &mut surface).expect("orchestrator");
        let mut scene = SceneObjectStore::new(16);
        scene
            .make_light_ring(&[Vec3::new(1.0, 1.0, 1.0); 2], 1.0, 0.1, Vec3::new(-1.0, -1.0, -1.0))
            .expect("lights");
        let camera = Camera::new();

        let flushes = |renderer: &SceneRenderer<MemoryBuffer>, slot: usize| {
            renderer.global_uniforms.buffer(slot).flushes.borrow().len()
        };

        for _ in 0..6 {
            let before: Vec<_> = (0..frames).map(|slot| flushes(&renderer, slot)).collect();
            let slot = orchestrator.begin_frame(&mut surface).expect("begin_frame").expect("frame");
            let k = slot.index();

            // The slot's last submission has been waited on before it was handed out
            let events = &orchestrator.backend().events;
            let last_wait = events.iter().rposition(|e| *e == Event::WaitSlot(k)).expect("wait");
            let last_submit = events.iter().rposition(|e| matches!(e, Event::SubmitPresent(s, _) if *s == k));
            assert!(last_submit.map_or(true, |submit| submit < last_wait));

            renderer.begin_frame(&slot).expect("reset");
            let frame = FrameInfo::new(&slot, 0.016, &camera, renderer.global_set(k));
            renderer.update(&frame, &mut scene).expect("update");

            for other in (0..frames).filter(|&other| other != k) {
                assert_eq!(flushes(&renderer, other), before[other]);
            }
            assert!(flushes(&renderer, k) > before[k]);

            orchestrator.begin_render_pass();
            let mut commands = RecordingCommands::inside_pass();
            renderer.record(&frame, &scene, &assets(), &mut commands).expect("record");
            orchestrator.end_render_pass();
            orchestrator.end_frame(&mut surface, slot).expect("end_frame");
        }
    }
}
