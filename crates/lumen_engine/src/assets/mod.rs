//! Asset registry and CPU-side loaders
//!
//! Scene objects refer to GPU meshes and textures through [`MeshHandle`] and
//! [`TextureHandle`]. The registry owns the GPU objects behind trait objects so
//! render systems only see `bind`/`draw` and a descriptor image.

pub mod image_loader;
pub mod mesh_data;
pub mod obj_loader;

pub use image_loader::ImageData;
pub use mesh_data::{MeshData, Vertex};
pub use obj_loader::ObjLoader;

use crate::render::recording::DrawCommands;
use ash::vk;
use slotmap::{new_key_type, SlotMap};
use thiserror::Error;

new_key_type! {
    /// Handle to a mesh in [`RenderAssets`]
    pub struct MeshHandle;
    /// Handle to a texture in [`RenderAssets`]
    pub struct TextureHandle;
}

/// Asset loading errors
#[derive(Error, Debug)]
pub enum AssetError {
    /// Asset not found
    #[error("Asset not found: {0}")]
    NotFound(String),

    /// Failed to load asset
    #[error("Failed to load asset: {0}")]
    LoadFailed(String),

    /// IO error during asset loading
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// A mesh resident on the GPU
pub trait MeshDraw {
    /// Bind vertex (and index) buffers
    fn bind(&self, commands: &mut dyn DrawCommands);

    /// Draw the whole mesh; must follow [`MeshDraw::bind`]
    fn draw(&self, commands: &mut dyn DrawCommands);
}

/// A sampled image usable at a combined image sampler binding
pub trait TextureBinding {
    /// Image view, sampler and layout
    fn descriptor_info(&self) -> vk::DescriptorImageInfo;
}

/// Owns every loaded mesh and texture
#[derive(Default)]
pub struct RenderAssets {
    meshes: SlotMap<MeshHandle, Box<dyn MeshDraw>>,
    textures: SlotMap<TextureHandle, Box<dyn TextureBinding>>,
    fallback_texture: Option<TextureHandle>,
}

impl RenderAssets {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a mesh
    pub fn add_mesh(&mut self, mesh: Box<dyn MeshDraw>) -> MeshHandle {
        self.meshes.insert(mesh)
    }

    /// Register a texture
    pub fn add_texture(&mut self, texture: Box<dyn TextureBinding>) -> TextureHandle {
        self.textures.insert(texture)
    }

    /// Look up a mesh
    pub fn mesh(&self, handle: MeshHandle) -> Option<&dyn MeshDraw> {
        self.meshes.get(handle).map(|m| m.as_ref())
    }

    /// Look up a texture
    pub fn texture(&self, handle: TextureHandle) -> Option<&dyn TextureBinding> {
        self.textures.get(handle).map(|t| t.as_ref())
    }

    /// Texture bound for renderables that have none
    pub fn set_fallback_texture(&mut self, handle: TextureHandle) {
        self.fallback_texture = Some(handle);
    }

    /// Image info for `texture`, or for the fallback texture when `None`
    pub fn texture_info(&self, texture: Option<TextureHandle>) -> Option<vk::DescriptorImageInfo> {
        texture
            .or(self.fallback_texture)
            .and_then(|handle| self.texture(handle))
            .map(TextureBinding::descriptor_info)
    }
}


#[cfg(test)]
mod tests {
    use super::fake::FakeTexture;
    use super::*;
    use ash::vk::Handle;

    #[test]
    fn test_texture_info_falls_back() {
        let mut assets = RenderAssets::new();
        assert!(assets.texture_info(None).is_none());

        let white = assets.add_texture(Box::new(FakeTexture(1)));
        let brick = assets.add_texture(Box::new(FakeTexture(2)));
        assets.set_fallback_texture(white);

        let view = |t| assets.texture_info(t).map(|info| info.image_view.as_raw());
        assert_eq!(view(None), Some(1));
        assert_eq!(view(Some(brick)), Some(2));
    }

    #[test]
    fn test_handles_from_another_registry_do_not_resolve() {
        let mut other = RenderAssets::new();
        other.add_texture(Box::new(FakeTexture(6)));
        let foreign = other.add_texture(Box::new(FakeTexture(7)));

        let mut assets = RenderAssets::new();
        assets.add_texture(Box::new(FakeTexture(1)));
        assert!(assets.texture(foreign).is_none());
        assert!(assets.texture_info(Some(foreign)).is_none());
    }
}
