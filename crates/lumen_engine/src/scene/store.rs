//! Scene object store
//!
//! Create-only storage with insertion-ordered iteration. IDs come from a
//! process-wide counter, so they are never reused even across stores. Each
//! object also gets a dense instance index, used to place its record in the
//! per-object uniform buffer.

use super::object::{ObjectId, PointLight, Renderable, SceneObject};
use crate::assets::{MeshHandle, TextureHandle};
use crate::foundation::math::{constants, Mat4, Mat4Ext, Vec3};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use thiserror::Error;

static NEXT_OBJECT_ID: AtomicU32 = AtomicU32::new(0);

/// Scene errors
#[derive(Error, Debug)]
pub enum SceneError {
    /// More objects were created than the configured capacity allows
    #[error("Scene object capacity of {capacity} exceeded")]
    CapacityExceeded {
        /// Configured capacity
        capacity: u32,
    },
}

/// Result type for scene operations
pub type SceneResult<T> = Result<T, SceneError>;

/// Axis the light ring is laid out around
pub fn ring_axis() -> Vec3 {
    Vec3::new(0.0, -1.0, 0.0)
}

/// Position of light `index` of `count` evenly spaced around [`ring_axis`], starting at `offset`
pub fn ring_position(index: usize, count: usize, offset: Vec3) -> Vec3 {
    if count == 0 {
        return offset;
    }
    let angle = index as f32 * constants::TAU / count as f32;
    let rotated = Mat4::rotation_about(ring_axis(), angle) * offset.push(1.0);
    rotated.xyz()
}

/// Owns every scene object
pub struct SceneObjectStore {
    objects: Vec<SceneObject>,
    index_of: HashMap<ObjectId, u32>,
    capacity: u32,
    default_texture: Option<TextureHandle>,
}

impl SceneObjectStore {
    /// Create an empty store holding at most `capacity` objects
    pub fn new(capacity: u32) -> Self {
        Self {
            objects: Vec::new(),
            index_of: HashMap::new(),
            capacity,
            default_texture: None,
        }
    }

    /// Texture assigned to renderables created through [`Self::create_renderable`]
    pub fn set_default_texture(&mut self, texture: Option<TextureHandle>) {
        self.default_texture = texture;
    }

    /// Create an object with a fresh ID and no roles
    pub fn create(&mut self) -> SceneResult<&mut SceneObject> {
        let index = self.objects.len() as u32;
        if index >= self.capacity {
            return Err(SceneError::CapacityExceeded { capacity: self.capacity });
        }

        let id = NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed);
        self.index_of.insert(id, index);
        self.objects.push(SceneObject::new(id));
        log::trace!("Created scene object {id} at instance {index}");

        Ok(&mut self.objects[index as usize])
    }

    /// Create an object drawn with `mesh` and the store's default texture
    pub fn create_renderable(&mut self, mesh: MeshHandle) -> SceneResult<&mut SceneObject> {
        let texture = self.default_texture;
        let object = self.create()?;
        object.renderable = Some(Renderable { mesh, texture });
        Ok(object)
    }

    /// Create an object with only the light role
    pub fn make_point_light(&mut self, intensity: f32, radius: f32, color: Vec3) -> SceneResult<&mut SceneObject> {
        let object = self.create()?;
        object.color = color;
        object.light = Some(PointLight { intensity, radius });
        Ok(object)
    }

    /// Create one light per colour, spaced evenly on a ring through `offset`
    pub fn make_light_ring(
        &mut self,
        colors: &[Vec3],
        intensity: f32,
        radius: f32,
        offset: Vec3,
    ) -> SceneResult<Vec<ObjectId>> {
        colors
            .iter()
            .enumerate()
            .map(|(i, &color)| {
                let light = self.make_point_light(intensity, radius, color)?;
                light.transform.translation = ring_position(i, colors.len(), offset);
                Ok(light.id())
            })
            .collect()
    }

    /// Look up an object
    pub fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        self.index_of.get(&id).map(|&i| &self.objects[i as usize])
    }

    /// Look up an object for mutation
    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.index_of.get(&id).map(|&i| &mut self.objects[i as usize])
    }

    /// Dense index of an object's record in per-object buffers
    pub fn instance_index(&self, id: ObjectId) -> Option<u32> {
        self.index_of.get(&id).copied()
    }

    /// Objects in creation order
    pub fn iter(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects.iter()
    }

    /// Objects in creation order, mutable
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut SceneObject> {
        self.objects.iter_mut()
    }

    /// Objects with their instance index, in creation order
    pub fn iter_indexed(&self) -> impl Iterator<Item = (u32, &SceneObject)> {
        self.objects.iter().enumerate().map(|(i, o)| (i as u32, o))
    }

    /// Number of objects
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Maximum number of objects
    pub fn capacity(&self) -> u32 {
        self.capacity
    }
}
