//! Flat scene: transforms, objects and the store that owns them

pub mod object;
pub mod store;
pub mod transform;

pub use object::{ObjectId, PointLight, Renderable, SceneObject};
pub use store::{ring_axis, ring_position, SceneError, SceneObjectStore, SceneResult};
pub use transform::Transform;
