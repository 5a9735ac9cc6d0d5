//! Lumen viewer
//!
//! Loads `lumen.toml` (or the path given as the first argument), builds the
//! configured scene and renders it with a keyboard-driven camera.

mod movement;

use glfw::Key;
use lumen_engine::config::{Config, LumenConfig};
use lumen_engine::foundation::logging;
use lumen_engine::foundation::math::Vec3;
use lumen_engine::scene::Transform;
use lumen_engine::{Application, Engine, EngineError};
use movement::{KeyInput, KeyboardMovementController};

const DEFAULT_CONFIG_PATH: &str = "lumen.toml";

/// Moves the camera from keyboard input
struct Viewer {
    controller: KeyboardMovementController,
    viewer: Transform,
}

impl Viewer {
    fn new(config: &LumenConfig) -> Self {
        Self {
            controller: KeyboardMovementController::new(config.camera.move_speed, config.camera.look_speed),
            viewer: Transform::from_translation(Vec3::from(config.camera.position)),
        }
    }
}

impl Application for Viewer {
    fn update(&mut self, engine: &mut Engine, frame_time: f32) {
        if engine.window().is_pressed(Key::Escape) {
            engine.window_mut().set_should_close(true);
        }

        self.controller
            .move_in_plane_xz(engine.window(), frame_time, &mut self.viewer);
        engine
            .camera_mut()
            .set_view_yxz(self.viewer.translation, self.viewer.rotation);
    }
}

fn run() -> Result<(), EngineError> {
    let path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = LumenConfig::load_or_default(&path)?;

    let mut viewer = Viewer::new(&config);
    Engine::run(config, &mut viewer)
}

fn main() {
    logging::init();
    log::info!("Starting Lumen viewer");

    if let Err(e) = run() {
        log::error!("Fatal error: {e}");
        std::process::exit(1);
    }
    log::info!("Lumen viewer exited cleanly");
}
