//! Distance fog and haze applied along path segments and to the sky.

use crate::material::Color;

/// Distance at which a missed ray has fully faded into the atmosphere's
/// background color.
pub const BACKGROUND_FADE_DISTANCE: f32 = 1000.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Atmosphere {
    pub enabled: bool,
    /// Fog is zero before this distance
    pub fog_start: f32,
    pub fog_base: f32,
    /// Fog growth per unit distance past `fog_start`
    pub fog_factor: f32,
    /// Haze growth per unit distance from the camera
    pub haze: f32,
    pub fog_color: Color,
    pub haze_color: Color,
    /// Color far rays fade into
    pub background: Color,
}

impl Default for Atmosphere {
    fn default() -> Self {
        Self {
            enabled: false,
            fog_start: 10.0,
            fog_base: 0.0,
            fog_factor: 0.01,
            haze: 0.0,
            fog_color: Color::new(0.7, 0.75, 0.8),
            haze_color: Color::new(0.8, 0.8, 0.85),
            background: Color::new(0.5, 0.7, 1.0),
        }
    }
}

impl Atmosphere {
    /// Enabled fog starting at `start` and thickening by `factor` per unit.
    pub fn fog(start: f32, factor: f32, color: Color) -> Self {
        Self {
            enabled: true,
            fog_start: start.max(0.0),
            fog_factor: factor.max(0.0),
            fog_color: color,
            ..Default::default()
        }
    }

    pub fn with_haze(mut self, haze: f32, color: Color) -> Self {
        self.haze = haze.max(0.0);
        self.haze_color = color;
        self
    }

    pub fn with_background(mut self, background: Color) -> Self {
        self.background = background;
        self
    }

    pub fn fog_amount(&self, distance: f32) -> f32 {
        if distance <= self.fog_start {
            return 0.0;
        }
        (self.fog_base + (distance - self.fog_start) * self.fog_factor).clamp(0.0, 1.0)
    }

    pub fn haze_amount(&self, distance: f32) -> f32 {
        (distance * self.haze).clamp(0.0, 1.0)
    }

    /// Fraction of light surviving the segment `[start, end]`, from the
    /// average fog and haze over it. 1 when disabled.
    pub fn segment_transmittance(&self, start: f32, end: f32) -> f32 {
        if !self.enabled {
            return 1.0;
        }
        let fog = 0.5 * (self.fog_amount(start) + self.fog_amount(end));
        let haze = 0.5 * (self.haze_amount(start) + self.haze_amount(end));
        (1.0 - fog) * (1.0 - haze)
    }

    /// Fog and haze color gained over the segment `[start, end]`.
    pub fn segment_in_scatter(&self, start: f32, end: f32) -> Color {
        if !self.enabled {
            return Color::ZERO;
        }
        let fog = self.fog_amount(end) - self.fog_amount(start);
        let haze = self.haze_amount(end) - self.haze_amount(start);
        self.fog_color * fog.max(0.0) + self.haze_color * haze.max(0.0)
    }

    /// Sky seen after `distance` of travel: blended toward fog and haze, then
    /// toward the background as the distance approaches
    /// [`BACKGROUND_FADE_DISTANCE`].
    pub fn apply_to_sky(&self, sky: Color, distance: f32) -> Color {
        if !self.enabled {
            return sky;
        }
        let fog = self.fog_amount(distance);
        let haze = self.haze_amount(distance);
        let hazy = sky * ((1.0 - fog) * (1.0 - haze)) + self.fog_color * fog + self.haze_color * haze;
        let fade = (distance / BACKGROUND_FADE_DISTANCE).clamp(0.0, 1.0);
        hazy * (1.0 - fade) + self.background * fade
    }
}
