//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the engine:
//! - Math type aliases and angle helpers
//! - Frame timing
//! - Logging setup

pub mod math;
pub mod time;
pub mod logging;
