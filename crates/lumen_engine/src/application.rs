//! Application hooks called by the engine loop

use crate::engine::{Engine, EngineError};

/// Application lifecycle trait
///
/// Implement this to drive the camera or add scene content. The engine owns
/// the loop; the application only sees it between frames.
pub trait Application {
    /// Called once after the configured scene has been built
    ///
    /// Use this to add objects or assets beyond what the configuration names.
    fn initialize(&mut self, engine: &mut Engine) -> Result<(), EngineError> {
        let _ = engine;
        Ok(())
    }

    /// Called every frame before the renderer's update phase
    ///
    /// This is the only place scene transforms may be changed by the
    /// application.
    fn update(&mut self, engine: &mut Engine, frame_time: f32);
}
