//! # Lumen Engine
//!
//! A small forward renderer on Vulkan.
//!
//! ## Features
//!
//! - **Frames in flight**: per-slot uniform buffers and descriptor pools, reused only after the slot's fence signals
//! - **Point lights**: orbiting lights written to a fixed-size uniform array and drawn as blended billboards, far to near
//! - **Robust presentation**: out-of-date, suboptimal, resized and minimized surfaces handled inside the frame loop
//! - **Configuration**: TOML or RON scene and renderer settings
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lumen_engine::prelude::*;
//!
//! struct Viewer;
//!
//! impl Application for Viewer {
//!     fn update(&mut self, engine: &mut Engine, _frame_time: f32) {
//!         engine
//!             .camera_mut()
//!             .set_view_target(Vec3::new(0.0, -1.0, -3.0), Vec3::zeros(), Vec3::new(0.0, -1.0, 0.0));
//!     }
//! }
//!
//! fn main() -> Result<(), EngineError> {
//!     lumen_engine::foundation::logging::init();
//!     Engine::run(LumenConfig::default(), &mut Viewer)
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod assets;
pub mod config;
pub mod foundation;
pub mod render;
pub mod scene;

mod application;
mod engine;

pub use application::Application;
pub use engine::{mesh_data, Engine, EngineError};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        assets::{ImageData, MeshData, MeshHandle, TextureHandle},
        config::{Config, LumenConfig},
        foundation::{
            math::{Mat4, Vec3},
            time::FrameTimer,
        },
        render::{vulkan::Window, Camera},
        scene::{ObjectId, SceneObjectStore, Transform},
        Application, Engine, EngineError,
    };
}
