//! # Viewer Settings
//!
//! Every section has a default matching the built-in demo, so a partial file
//! only needs to name what it changes.

use super::{Config, ConfigError};
use crate::render::MAX_LIGHTS;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration for the renderer and its demo scene
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LumenConfig {
    /// Window creation parameters
    pub window: WindowSettings,
    /// Vulkan renderer parameters
    pub renderer: RendererSettings,
    /// Camera projection and controller parameters
    pub camera: CameraSettings,
    /// Scene contents
    pub scene: SceneSettings,
    /// Per-frame descriptor pool budget
    pub descriptors: DescriptorBudget,
}

impl Config for LumenConfig {}

impl LumenConfig {
    /// Check value ranges that would otherwise fail deep inside Vulkan
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.window.validate()?;
        self.renderer.validate()?;
        self.camera.validate()?;
        self.scene.validate()?;
        self.descriptors.validate()?;
        self.descriptors.covers(self.scene.max_renderables())
    }
}

/// Window creation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSettings {
    /// Window title
    pub title: String,
    /// Initial width in screen coordinates
    pub width: u32,
    /// Initial height in screen coordinates
    pub height: u32,
    /// Whether the user may resize the window
    pub resizable: bool,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            title: "Lumen".to_string(),
            width: 800,
            height: 600,
            resizable: true,
        }
    }
}

impl WindowSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "window extent must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

/// Paths to a vertex/fragment SPIR-V pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShaderPaths {
    /// Path to the vertex shader SPIR-V file
    pub vertex: String,
    /// Path to the fragment shader SPIR-V file
    pub fragment: String,
}

impl ShaderPaths {
    /// Locate a shader pair by trying the directories a developer is likely to run from
    pub fn with_path_resolution(base_vertex: &str, base_fragment: &str) -> Self {
        let shader_dirs = ["target/shaders/", "../target/shaders/", "shaders/", "./"];

        let find = |name: &str| {
            shader_dirs
                .iter()
                .map(|dir| format!("{dir}{name}"))
                .find(|candidate| Path::new(candidate).exists())
                .unwrap_or_else(|| format!("target/shaders/{name}"))
        };

        Self {
            vertex: find(base_vertex),
            fragment: find(base_fragment),
        }
    }

    /// Fail early when a shader file is missing
    pub fn validate(&self) -> Result<(), ConfigError> {
        for path in [&self.vertex, &self.fragment] {
            if !Path::new(path).exists() {
                return Err(ConfigError::Invalid(format!("shader not found: {path}")));
            }
        }
        Ok(())
    }
}

/// Vulkan renderer parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererSettings {
    /// Application name for Vulkan instance creation
    pub application_name: String,
    /// Validation layers; `None` enables them in debug builds only
    pub enable_validation: Option<bool>,
    /// Number of frame slots the host may prepare ahead of the GPU
    pub max_frames_in_flight: usize,
    /// Colour the swapchain image is cleared to
    pub clear_color: [f32; 4],
    /// Shaders for the opaque pass
    pub opaque_shaders: ShaderPaths,
    /// Shaders for the light billboard pass
    pub light_shaders: ShaderPaths,
    /// Orbit speed of point lights in radians per second
    pub light_angular_speed: f32,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            application_name: "Lumen".to_string(),
            enable_validation: None,
            max_frames_in_flight: 2,
            clear_color: [0.01, 0.01, 0.01, 1.0],
            opaque_shaders: ShaderPaths::with_path_resolution("simple_shader.vert.spv", "simple_shader.frag.spv"),
            light_shaders: ShaderPaths::with_path_resolution("point_light.vert.spv", "point_light.frag.spv"),
            light_angular_speed: 0.5,
        }
    }
}

impl RendererSettings {
    /// Largest supported number of frames in flight
    pub const MAX_FRAMES_IN_FLIGHT_LIMIT: usize = 3;

    /// Validation layer setting after resolving the build-type default
    pub fn validation_enabled(&self) -> bool {
        self.enable_validation.unwrap_or(cfg!(debug_assertions))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.application_name.is_empty() {
            return Err(ConfigError::Invalid("application name cannot be empty".to_string()));
        }
        if !(1..=Self::MAX_FRAMES_IN_FLIGHT_LIMIT).contains(&self.max_frames_in_flight) {
            return Err(ConfigError::Invalid(format!(
                "max_frames_in_flight must be between 1 and {}, got {}",
                Self::MAX_FRAMES_IN_FLIGHT_LIMIT,
                self.max_frames_in_flight
            )));
        }
        Ok(())
    }
}

/// Camera projection and controller parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    /// Vertical field of view in degrees
    pub fov_y_degrees: f32,
    /// Near clip plane
    pub near: f32,
    /// Far clip plane
    pub far: f32,
    /// Translation speed in units per second
    pub move_speed: f32,
    /// Rotation speed in radians per second
    pub look_speed: f32,
    /// Starting position of the viewer
    pub position: [f32; 3],
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            fov_y_degrees: 50.0,
            near: 0.1,
            far: 100.0,
            move_speed: 3.0,
            look_speed: 1.5,
            position: [0.0, 0.0, -2.5],
        }
    }
}

impl CameraSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.near <= 0.0 || self.far <= self.near {
            return Err(ConfigError::Invalid(format!(
                "clip planes must satisfy 0 < near < far, got near={} far={}",
                self.near, self.far
            )));
        }
        if !(1.0..179.0).contains(&self.fov_y_degrees) {
            return Err(ConfigError::Invalid(format!("fov_y_degrees out of range: {}", self.fov_y_degrees)));
        }
        Ok(())
    }
}

/// Where a model's geometry comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeshSource {
    /// Built-in unit cube
    Cube,
    /// Built-in unit quad in the XZ plane
    Quad,
    /// Wavefront OBJ file
    Obj(String),
}

/// One renderable object in the scene
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSettings {
    /// Geometry source
    pub mesh: MeshSource,
    /// World position
    #[serde(default)]
    pub translation: [f32; 3],
    /// Per-axis scale
    #[serde(default = "unit_scale")]
    pub scale: [f32; 3],
    /// Tait-Bryan angles in radians
    #[serde(default)]
    pub rotation: [f32; 3],
    /// PNG texture; the default white texture is used when absent
    #[serde(default)]
    pub texture: Option<String>,
}

fn unit_scale() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

/// Ring of point lights placed around the scene origin
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LightRingSettings {
    /// One light per colour
    pub colors: Vec<[f32; 3]>,
    /// Intensity of every light
    pub intensity: f32,
    /// Billboard radius of every light
    pub radius: f32,
    /// Position of the first light; the rest are rotated about the vertical axis
    pub offset: [f32; 3],
}

impl Default for LightRingSettings {
    fn default() -> Self {
        Self {
            colors: vec![[2.0, 0.2, 0.2], [2.0, 2.0, 0.2], [0.2, 2.0, 2.0], [2.0, 2.0, 2.0]],
            intensity: 1.0,
            radius: 0.1,
            offset: [-1.0, -1.0, -1.0],
        }
    }
}

/// Scene contents
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneSettings {
    /// Maximum number of scene objects
    pub object_capacity: u32,
    /// PNG used for models without a texture; a 1x1 white image when absent
    pub default_texture: Option<String>,
    /// Models to load
    pub models: Vec<ModelSettings>,
    /// Point light ring
    pub lights: LightRingSettings,
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self {
            object_capacity: 1000,
            default_texture: None,
            models: vec![
                ModelSettings {
                    mesh: MeshSource::Cube,
                    translation: [0.0, 0.0, 0.0],
                    scale: [0.5, 0.5, 0.5],
                    rotation: [0.0, 0.0, 0.0],
                    texture: None,
                },
                ModelSettings {
                    mesh: MeshSource::Quad,
                    translation: [0.0, 0.5, 0.0],
                    scale: [6.0, 1.0, 6.0],
                    rotation: [0.0, 0.0, 0.0],
                    texture: None,
                },
            ],
            lights: LightRingSettings::default(),
        }
    }
}

impl SceneSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.object_capacity == 0 {
            return Err(ConfigError::Invalid("object_capacity must be non-zero".to_string()));
        }
        if self.lights.colors.len() > MAX_LIGHTS {
            return Err(ConfigError::Invalid(format!(
                "light ring has {} lights but at most {MAX_LIGHTS} are supported",
                self.lights.colors.len()
            )));
        }
        let required = self.models.len() + self.lights.colors.len();
        if required > self.object_capacity as usize {
            return Err(ConfigError::Invalid(format!(
                "scene needs {required} objects but object_capacity is {}",
                self.object_capacity
            )));
        }
        Ok(())
    }

    /// Renderable objects the store can still hold once the light ring is placed
    fn max_renderables(&self) -> u32 {
        self.object_capacity.saturating_sub(self.lights.colors.len() as u32)
    }
}

/// Static budget for each frame slot's descriptor pool
///
/// Exhausting it mid-frame is a deployment bug, so the numbers are
/// configuration rather than something grown at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DescriptorBudget {
    /// Maximum descriptor sets per slot per frame
    pub max_sets: u32,
    /// Uniform buffer descriptors per slot per frame
    pub uniform_buffers: u32,
    /// Combined image sampler descriptors per slot per frame
    pub combined_image_samplers: u32,
}

impl Default for DescriptorBudget {
    fn default() -> Self {
        Self {
            max_sets: 1000,
            uniform_buffers: 1000,
            combined_image_samplers: 1000,
        }
    }
}

impl DescriptorBudget {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_sets == 0 || self.uniform_buffers == 0 || self.combined_image_samplers == 0 {
            return Err(ConfigError::Invalid("descriptor budget entries must be non-zero".to_string()));
        }
        Ok(())
    }

    /// Each renderable takes one set with one uniform buffer and one sampler per frame
    fn covers(&self, renderables: u32) -> Result<(), ConfigError> {
        let smallest = self.max_sets.min(self.uniform_buffers).min(self.combined_image_samplers);
        if smallest < renderables {
            return Err(ConfigError::Invalid(format!(
                "descriptor budget ({} sets, {} uniform buffers, {} samplers) cannot cover {renderables} renderable objects",
                self.max_sets, self.uniform_buffers, self.combined_image_samplers
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigFormat;

    #[test]
    fn test_defaults_are_valid() {
        let config = LumenConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.renderer.max_frames_in_flight, 2);
        assert_eq!(config.scene.lights.colors.len(), 4);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let text = r#"
            [window]
            width = 1280

            [[scene.models]]
            mesh = { obj = "models/vase.obj" }
            translation = [0.5, 0.5, 0.0]
        "#;
        let config = LumenConfig::from_str_as(text, ConfigFormat::Toml).expect("parse");
        assert_eq!(config.window.width, 1280);
        assert_eq!(config.window.height, 600);
        assert_eq!(config.scene.models.len(), 1);
        assert_eq!(config.scene.models[0].mesh, MeshSource::Obj("models/vase.obj".to_string()));
        assert_eq!(config.scene.models[0].scale, [1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_ron_parse() {
        let text = "(renderer: (max_frames_in_flight: 3), window: (title: \"ron\"))";
        let config = LumenConfig::from_str_as(text, ConfigFormat::Ron).expect("parse");
        assert_eq!(config.renderer.max_frames_in_flight, 3);
        assert_eq!(config.window.title, "ron");
    }

    #[test]
    fn test_rejects_bad_frames_in_flight() {
        let mut config = LumenConfig::default();
        config.renderer.max_frames_in_flight = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        config.renderer.max_frames_in_flight = 4;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_scene_larger_than_capacity() {
        let mut config = LumenConfig::default();
        config.scene.object_capacity = 3;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_light_ring_over_budget() {
        let mut config = LumenConfig::default();
        config.scene.lights.colors = vec![[1.0, 1.0, 1.0]; MAX_LIGHTS];
        assert!(config.validate().is_ok());

        config.scene.lights.colors.push([1.0, 0.0, 0.0]);
        let err = config.validate().expect_err("too many lights");
        assert!(err.to_string().contains("light ring"));
    }

    #[test]
    fn test_descriptor_budget_must_cover_renderables() {
        let mut config = LumenConfig::default();
        config.scene.object_capacity = 64;
        config.descriptors.combined_image_samplers = 60;
        assert!(config.validate().is_ok());

        config.descriptors.combined_image_samplers = 59;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.descriptors.combined_image_samplers = 64;
        config.descriptors.max_sets = 10;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_clip_planes() {
        let mut config = LumenConfig::default();
        config.camera.near = 0.0;
        assert!(config.validate().is_err());
    }
}
