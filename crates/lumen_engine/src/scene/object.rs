//! Scene object data
//!
//! Objects are plain data. Anything the renderer derives per object (such as
//! its slot in the per-object uniform buffer) lives in the store's side
//! tables keyed by [`ObjectId`], never in the object itself.

use super::transform::Transform;
use crate::assets::{MeshHandle, TextureHandle};
use crate::foundation::math::Vec3;

/// Stable, process-unique object identifier
pub type ObjectId = u32;

/// Point light role
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    /// Multiplier applied to the object's colour
    pub intensity: f32,
    /// Billboard radius in world units
    pub radius: f32,
}

/// Renderable role: geometry plus an optional diffuse texture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Renderable {
    /// Mesh to draw
    pub mesh: MeshHandle,
    /// Diffuse texture; the renderer's fallback texture is bound when absent
    pub texture: Option<TextureHandle>,
}

/// An object in the flat scene
#[derive(Debug, Clone)]
pub struct SceneObject {
    id: ObjectId,
    /// World transform (mutated only during the update phase)
    pub transform: Transform,
    /// Base colour; for lights this is the emitted colour
    pub color: Vec3,
    /// Drawn by the opaque pass when present
    pub renderable: Option<Renderable>,
    /// Drawn by the light pass and written to the light array when present
    pub light: Option<PointLight>,
}

impl SceneObject {
    pub(super) fn new(id: ObjectId) -> Self {
        Self {
            id,
            transform: Transform::default(),
            color: Vec3::new(1.0, 1.0, 1.0),
            renderable: None,
            light: None,
        }
    }

    /// The object's identifier
    pub fn id(&self) -> ObjectId {
        self.id
    }
}
