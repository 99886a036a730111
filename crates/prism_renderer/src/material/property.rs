use super::Color;
use prism_core::TextureSampler;
use prism_math::Vec2;
use std::fmt;
use std::sync::Arc;

/// UV placement applied before texture lookups.
///
/// Scale and rotation act around the texture center `(0.5, 0.5)`, then the
/// offset is added and the result multiplied by `tiling`. Wrapping outside
/// `[0, 1]` is left to the texture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureTransform {
    pub scale: Vec2,
    /// Counter-clockwise, in degrees
    pub rotation: f32,
    pub offset: Vec2,
    pub tiling: Vec2,
}

impl Default for TextureTransform {
    fn default() -> Self {
        Self {
            scale: Vec2::ONE,
            rotation: 0.0,
            offset: Vec2::ZERO,
            tiling: Vec2::ONE,
        }
    }
}

impl TextureTransform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scale(mut self, u: f32, v: f32) -> Self {
        self.scale = Vec2::new(u, v);
        self
    }

    pub fn with_rotation(mut self, degrees: f32) -> Self {
        self.rotation = degrees;
        self
    }

    pub fn with_offset(mut self, u: f32, v: f32) -> Self {
        self.offset = Vec2::new(u, v);
        self
    }

    pub fn with_tiling(mut self, u: f32, v: f32) -> Self {
        self.tiling = Vec2::new(u, v);
        self
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(&self, u: f32, v: f32) -> (f32, f32) {
        if self.is_identity() {
            return (u, v);
        }
        let centered = (Vec2::new(u, v) - 0.5) * self.scale;
        let rotated = Vec2::from_angle(self.rotation.to_radians()).rotate(centered);
        let placed = (rotated + 0.5 + self.offset) * self.tiling;
        (placed.x, placed.y)
    }
}

/// A material input: a flat color scaled by `intensity`, or a texture lookup
/// scaled the same way when a texture is bound.
#[derive(Clone)]
pub struct MaterialProperty {
    pub color: Color,
    pub intensity: f32,
    pub texture: Option<Arc<dyn TextureSampler>>,
}

impl MaterialProperty {
    pub fn new(color: Color) -> Self {
        Self {
            color,
            intensity: 1.0,
            texture: None,
        }
    }

    /// Scalar input stored in every channel.
    pub fn scalar(value: f32) -> Self {
        Self::new(Color::splat(value))
    }

    pub fn textured(texture: Arc<dyn TextureSampler>) -> Self {
        Self {
            color: Color::ONE,
            intensity: 1.0,
            texture: Some(texture),
        }
    }

    pub fn with_intensity(mut self, intensity: f32) -> Self {
        self.intensity = intensity;
        self
    }

    pub fn with_texture(mut self, texture: Arc<dyn TextureSampler>) -> Self {
        self.texture = Some(texture);
        self
    }

    pub fn evaluate(&self, u: f32, v: f32) -> Color {
        match &self.texture {
            Some(texture) => texture.get_color(u, v) * self.intensity,
            None => self.color * self.intensity,
        }
    }

    /// First channel of [`MaterialProperty::evaluate`], for grayscale inputs.
    pub fn evaluate_scalar(&self, u: f32, v: f32) -> f32 {
        self.evaluate(u, v).x
    }

    /// Texture alpha when a texture is bound, otherwise the flat first channel.
    pub fn alpha(&self, u: f32, v: f32) -> f32 {
        match &self.texture {
            Some(texture) => texture.get_alpha(u, v),
            None => self.color.x * self.intensity,
        }
        .clamp(0.0, 1.0)
    }

    pub fn is_black(&self) -> bool {
        self.texture.is_none() && (self.color * self.intensity).max_element() <= 0.0
    }
}

impl Default for MaterialProperty {
    fn default() -> Self {
        Self::new(Color::ZERO)
    }
}

impl From<Color> for MaterialProperty {
    fn from(color: Color) -> Self {
        Self::new(color)
    }
}

impl fmt::Debug for MaterialProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MaterialProperty")
            .field("color", &self.color)
            .field("intensity", &self.intensity)
            .field("textured", &self.texture.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_core::Texture;

    #[test]
    fn test_flat_property() {
        let prop = MaterialProperty::new(Color::new(0.5, 0.25, 1.0)).with_intensity(2.0);
        assert_eq!(prop.evaluate(0.3, 0.7), Color::new(1.0, 0.5, 2.0));
        assert_eq!(prop.evaluate_scalar(0.0, 0.0), 1.0);
        assert!(!prop.is_black());
        assert!(MaterialProperty::default().is_black());
    }

    #[test]
    fn test_textured_property() {
        let texture = Texture::new(1, 1, vec![[0.2, 0.4, 0.6, 0.5]]).unwrap();
        let prop = MaterialProperty::textured(Arc::new(texture)).with_intensity(0.5);
        let c = prop.evaluate(0.5, 0.5);
        assert!((c - Color::new(0.1, 0.2, 0.3)).abs().max_element() < 1e-6);
        assert!((prop.alpha(0.5, 0.5) - 0.5).abs() < 1e-6);
    }

    fn close(a: (f32, f32), b: (f32, f32)) -> bool {
        (a.0 - b.0).abs() < 1e-5 && (a.1 - b.1).abs() < 1e-5
    }

    #[test]
    fn test_texture_transform_identity() {
        let transform = TextureTransform::default();
        assert!(transform.is_identity());
        assert_eq!(transform.apply(0.3, 0.9), (0.3, 0.9));
    }

    #[test]
    fn test_texture_transform_components() {
        // Scaling keeps the center fixed
        let scaled = TextureTransform::new().with_scale(2.0, 0.5);
        assert!(close(scaled.apply(0.5, 0.5), (0.5, 0.5)));
        assert!(close(scaled.apply(0.75, 1.0), (1.0, 0.75)));

        // A quarter turn takes the right edge midpoint to the top
        let rotated = TextureTransform::new().with_rotation(90.0);
        assert!(close(rotated.apply(1.0, 0.5), (0.5, 1.0)));

        let moved = TextureTransform::new().with_offset(0.25, -0.1).with_tiling(2.0, 3.0);
        assert!(close(moved.apply(0.0, 0.5), (0.5, 1.2)));
    }
}
