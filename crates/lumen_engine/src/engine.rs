//! Engine setup and main loop
//!
//! [`Engine::run`] is the single entry point for executables: it builds the
//! window, device, pipelines, scene and per-frame resources from a
//! [`LumenConfig`], then drives frames until the window closes. Every fatal
//! condition comes back as an [`EngineError`].

use crate::application::Application;
use crate::assets::obj_loader::ObjError;
use crate::assets::{AssetError, ImageData, MeshData, MeshHandle, ObjLoader, RenderAssets, TextureHandle};
use crate::config::{ConfigError, LumenConfig, MeshSource, ModelSettings};
use crate::foundation::math::{utils, Vec3};
use crate::foundation::time::FrameTimer;
use crate::render::descriptors::DescriptorDevice;
use crate::render::frame::{FrameInfo, GlobalUniforms, ObjectUniforms};
use crate::render::orchestrator::{FrameOrchestrator, SurfaceProvider};
use crate::render::renderer::{SceneRenderer, SetLayouts, UniformBuffers};
use crate::render::systems::{PointLightPushConstants, PointLightSystem, SimpleRenderSystem};
use crate::render::uniforms::{uniform_instance_alignment, InstanceLayout};
use crate::render::vulkan::{
    Buffer, GpuMesh, GraphicsPipeline, PipelineConfig, Texture, VulkanContext, VulkanError, VulkanFrameBackend,
    Window, WindowError,
};
use crate::render::{Camera, RenderError};
use crate::scene::{SceneError, SceneObjectStore};
use std::sync::Arc;
use thiserror::Error;

/// Engine-level errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// Window or surface creation failed
    #[error("Window error: {0}")]
    Window(#[from] WindowError),

    /// Device or resource creation failed
    #[error("Vulkan error: {0}")]
    Vulkan(#[from] VulkanError),

    /// A frame could not be rendered
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// The scene outgrew its capacity
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    /// An image could not be loaded
    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),

    /// A mesh could not be loaded
    #[error("Mesh error: {0}")]
    Mesh(#[from] ObjError),

    /// The configuration is unusable
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Window, device, scene and renderer
///
/// Field order is drop order: everything holding GPU objects comes before the
/// context, and the context before the window that owns the surface's window.
pub struct Engine {
    renderer: SceneRenderer<Buffer>,
    assets: RenderAssets,
    _light_pipeline: GraphicsPipeline,
    _opaque_pipeline: GraphicsPipeline,
    orchestrator: FrameOrchestrator<VulkanFrameBackend>,
    scene: SceneObjectStore,
    camera: Camera,
    timer: FrameTimer,
    config: LumenConfig,
    context: Arc<VulkanContext>,
    window: Window,
}

impl Engine {
    /// Build everything described by `config`
    pub fn new(config: LumenConfig) -> Result<Self, EngineError> {
        config.validate()?;
        log::info!("Initializing engine...");

        let mut window = Window::new(&config.window)?;
        let context = Arc::new(VulkanContext::new(
            &window,
            &config.renderer.application_name,
            config.renderer.validation_enabled(),
        )?);

        let frames_in_flight = config.renderer.max_frames_in_flight;
        let backend = VulkanFrameBackend::new(
            Arc::clone(&context),
            window.framebuffer_extent(),
            frames_in_flight,
            config.renderer.clear_color,
        )?;

        let descriptor_device: Arc<dyn DescriptorDevice> = Arc::new(context.raw_device());
        let layouts = SetLayouts::new(descriptor_device.clone())?;
        let render_pass = backend.render_pass().handle();
        let opaque_layouts = layouts.opaque();
        let opaque_pipeline = GraphicsPipeline::new(
            context.raw_device(),
            render_pass,
            &PipelineConfig::opaque(&config.renderer.opaque_shaders, &opaque_layouts),
        )?;
        let light_layouts = layouts.lights();
        let light_push_constants = [PointLightPushConstants::range()];
        let light_pipeline = GraphicsPipeline::new(
            context.raw_device(),
            render_pass,
            &PipelineConfig::billboard(&config.renderer.light_shaders, &light_layouts, &light_push_constants),
        )?;

        let mut assets = RenderAssets::new();
        let mut scene = SceneObjectStore::new(config.scene.object_capacity);
        let fallback_image = match &config.scene.default_texture {
            Some(path) => ImageData::from_file(path)?,
            None => ImageData::solid_color(1, 1, [255, 255, 255, 255]),
        };
        let fallback = assets.add_texture(Box::new(Texture::upload(&context, backend.command_pool(), &fallback_image)?));
        assets.set_fallback_texture(fallback);
        scene.set_default_texture(Some(fallback));

        let buffers = Self::create_uniform_buffers(&context, frames_in_flight, config.scene.object_capacity)?;
        let systems = (
            SimpleRenderSystem::new(opaque_pipeline.handles()),
            PointLightSystem::new(light_pipeline.handles(), config.renderer.light_angular_speed),
        );
        let renderer = SceneRenderer::new(descriptor_device, layouts, buffers, &config.descriptors, systems)?;

        let orchestrator = FrameOrchestrator::new(backend, &mut window)?;

        let mut camera = Camera::new();
        camera.set_view_target(Vec3::from(config.camera.position), Vec3::zeros(), Vec3::new(0.0, -1.0, 0.0));

        let mut engine = Self {
            renderer,
            assets,
            _light_pipeline: light_pipeline,
            _opaque_pipeline: opaque_pipeline,
            orchestrator,
            scene,
            camera,
            timer: FrameTimer::new(),
            config,
            context,
            window,
        };
        engine.populate_scene()?;
        Ok(engine)
    }

    /// Run `app` until the window closes
    pub fn run<A: Application>(config: LumenConfig, app: &mut A) -> Result<(), EngineError> {
        let mut engine = Self::new(config)?;
        app.initialize(&mut engine)?;

        log::info!("Starting main loop with {} scene objects", engine.scene.len());
        while !engine.window.should_close() {
            engine.window.poll_events();
            let frame_time = engine.timer.tick();
            app.update(&mut engine, frame_time);
            engine.render_frame(frame_time)?;
        }

        engine.orchestrator.wait_idle()?;
        log::info!(
            "Engine shutdown after {} frames ({:.1} fps average)",
            engine.timer.frame_count(),
            engine.timer.average_fps()
        );
        Ok(())
    }

    fn render_frame(&mut self, frame_time: f32) -> Result<(), EngineError> {
        let Some(slot) = self.orchestrator.begin_frame(&mut self.window)? else {
            return Ok(());
        };

        let camera_settings = &self.config.camera;
        self.camera.set_perspective_projection(
            utils::deg_to_rad(camera_settings.fov_y_degrees),
            self.orchestrator.aspect_ratio(),
            camera_settings.near,
            camera_settings.far,
        );

        self.renderer.begin_frame(&slot)?;
        let frame = FrameInfo::new(&slot, frame_time, &self.camera, self.renderer.global_set(slot.index()));
        self.renderer.update(&frame, &mut self.scene)?;

        self.orchestrator.begin_render_pass();
        self.renderer
            .record(&frame, &self.scene, &self.assets, self.orchestrator.commands())?;
        self.orchestrator.end_render_pass();
        self.orchestrator.end_frame(&mut self.window, slot)?;
        Ok(())
    }

    fn create_uniform_buffers(
        context: &VulkanContext,
        frames_in_flight: usize,
        object_capacity: u32,
    ) -> Result<UniformBuffers<Buffer>, EngineError> {
        let limits = context.limits();
        let alignment =
            uniform_instance_alignment(limits.min_uniform_buffer_offset_alignment, limits.non_coherent_atom_size);
        let global_layout = InstanceLayout::new(std::mem::size_of::<GlobalUniforms>() as u64, 1, alignment);
        let object_layout = InstanceLayout::new(std::mem::size_of::<ObjectUniforms>() as u64, object_capacity, alignment);

        let global = (0..frames_in_flight)
            .map(|_| Buffer::mapped_uniform(context, global_layout.buffer_size()))
            .collect::<Result<Vec<_>, _>>()?;
        let objects = (0..frames_in_flight)
            .map(|_| Buffer::mapped_uniform(context, object_layout.buffer_size()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(UniformBuffers {
            global,
            objects,
            object_layout,
        })
    }

    /// Models and the light ring named by the configuration
    fn populate_scene(&mut self) -> Result<(), EngineError> {
        let models = self.config.scene.models.clone();
        for model in &models {
            self.add_model(model)?;
        }

        let ring = &self.config.scene.lights;
        let colors: Vec<Vec3> = ring.colors.iter().copied().map(Vec3::from).collect();
        let lights = self
            .scene
            .make_light_ring(&colors, ring.intensity, ring.radius, Vec3::from(ring.offset))?;

        log::info!("Scene built: {} models, {} point lights", models.len(), lights.len());
        Ok(())
    }

    /// Load a model's mesh and texture and place it in the scene
    pub fn add_model(&mut self, model: &ModelSettings) -> Result<(), EngineError> {
        let mesh = self.load_mesh(&mesh_data(&model.mesh)?)?;
        let texture = model.texture.as_ref().map(|path| self.load_texture(path)).transpose()?;

        let object = self.scene.create_renderable(mesh)?;
        object.transform.translation = Vec3::from(model.translation);
        object.transform.scale = Vec3::from(model.scale);
        object.transform.rotation = Vec3::from(model.rotation);
        if texture.is_some() {
            if let Some(renderable) = object.renderable.as_mut() {
                renderable.texture = texture;
            }
        }
        Ok(())
    }

    /// Upload mesh data to the GPU
    pub fn load_mesh(&mut self, data: &MeshData) -> Result<MeshHandle, EngineError> {
        let mesh = GpuMesh::upload(&self.context, self.orchestrator.backend().command_pool(), data)?;
        Ok(self.assets.add_mesh(Box::new(mesh)))
    }

    /// Load a PNG and upload it to the GPU
    pub fn load_texture(&mut self, path: &str) -> Result<TextureHandle, EngineError> {
        let image = ImageData::from_file(path)?;
        let texture = Texture::upload(&self.context, self.orchestrator.backend().command_pool(), &image)?;
        Ok(self.assets.add_texture(Box::new(texture)))
    }

    /// The window, for input polling
    pub fn window(&self) -> &Window {
        &self.window
    }

    /// The window, for closing it
    pub fn window_mut(&mut self) -> &mut Window {
        &mut self.window
    }

    /// Camera used for the next frame; the engine sets its projection, the application its view
    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    /// Scene objects
    pub fn scene(&self) -> &SceneObjectStore {
        &self.scene
    }

    /// Scene objects, for the update phase
    pub fn scene_mut(&mut self) -> &mut SceneObjectStore {
        &mut self.scene
    }

    /// Active configuration
    pub fn config(&self) -> &LumenConfig {
        &self.config
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if let Err(e) = self.orchestrator.wait_idle() {
            log::warn!("Failed to wait for device idle during shutdown: {e}");
        }
    }
}

/// CPU-side geometry for a configured mesh source
pub fn mesh_data(source: &MeshSource) -> Result<MeshData, ObjError> {
    match source {
        MeshSource::Cube => Ok(MeshData::cube()),
        MeshSource::Quad => Ok(MeshData::quad()),
        MeshSource::Obj(path) => ObjLoader::load_obj(path),
    }
}
