//! JSON render configuration.

use anyhow::{Context, Result};
use prism_renderer::{Camera, RenderConfig, Vec3};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub look_from: [f32; 3],
    pub look_at: [f32; 3],
    pub vup: [f32; 3],
    /// Vertical field of view in degrees
    pub vfov: f32,
    pub aperture: f32,
    pub focus_dist: f32,
    /// Aperture blades, 0 for a round lens
    pub blades: u32,
    pub blade_rotation: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            look_from: [13.0, 2.0, 3.0],
            look_at: [0.0, 0.0, 0.0],
            vup: [0.0, 1.0, 0.0],
            vfov: 20.0,
            aperture: 0.1,
            focus_dist: 10.0,
            blades: 6,
            blade_rotation: 0.0,
        }
    }
}

impl CameraConfig {
    pub fn build(&self, width: u32, height: u32) -> Camera {
        let mut camera = Camera::new()
            .with_resolution(width, height)
            .with_position(
                Vec3::from_array(self.look_from),
                Vec3::from_array(self.look_at),
                Vec3::from_array(self.vup),
            )
            .with_lens(self.vfov, self.aperture, self.focus_dist)
            .with_bokeh(self.blades, self.blade_rotation);
        camera.initialize();
        camera
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub width: u32,
    pub height: u32,
    /// Seed for the demo scene layout
    pub scene_seed: u64,
    /// Distance fog over the demo scene
    pub fog: bool,
    pub camera: CameraConfig,
    pub render: RenderConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            width: 800,
            height: 450,
            scene_seed: 0,
            fog: false,
            camera: CameraConfig::default(),
            render: RenderConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
        let config = serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))?;
        log::info!("loaded config from {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = serde_json::from_str(
            r#"{ "width": 64, "camera": { "vfov": 40.0 }, "render": { "samples_per_pixel": 4, "threads": 2 } }"#,
        )
        .unwrap();
        assert_eq!(config.width, 64);
        assert_eq!(config.height, 450);
        assert_eq!(config.camera.vfov, 40.0);
        assert_eq!(config.camera.look_from, [13.0, 2.0, 3.0]);
        assert_eq!(config.render.samples_per_pixel, 4);
        assert_eq!(config.render.threads, 2);
        assert_eq!(config.render.samples_per_pass, RenderConfig::default().samples_per_pass);
    }

    #[test]
    fn test_camera_config_builds_initialized_camera() {
        let camera = CameraConfig::default().build(32, 16);
        assert_eq!(camera.image_width, 32);
        assert_eq!(camera.position(), Vec3::new(13.0, 2.0, 3.0));
    }
}
