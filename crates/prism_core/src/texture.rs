//! Texture sampling for materials and backgrounds.
//!
//! Materials only see the [`TextureSampler`] trait. [`Texture`] is the in-memory
//! implementation: linear RGBA floats, row-major, `(0, 0)` at the bottom-left in
//! UV space.

use prism_math::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum TextureError {
    #[error("texture dimensions must be non-zero, got {width}x{height}")]
    ZeroDimensions { width: u32, height: u32 },

    #[error("expected {expected} pixels for a {width}x{height} texture, got {actual}")]
    PixelCountMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}

pub type TextureResult<T> = Result<T, TextureError>;

/// Color and alpha lookup at surface coordinates.
pub trait TextureSampler: Send + Sync {
    fn get_color(&self, u: f32, v: f32) -> Vec3;

    /// Opacity in `[0, 1]`. Textures without an alpha channel are fully opaque.
    fn get_alpha(&self, _u: f32, _v: f32) -> f32 {
        1.0
    }
}

/// How UVs outside `[0, 1]` are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WrapMode {
    #[default]
    Clamp,
    Repeat,
}

impl WrapMode {
    fn apply(self, x: f32) -> f32 {
        match self {
            WrapMode::Clamp => x.clamp(0.0, 1.0),
            WrapMode::Repeat => x.rem_euclid(1.0),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Texture {
    pub width: u32,
    pub height: u32,
    /// `[R, G, B, A]` per pixel, linear, row-major from the top row.
    pub pixels: Vec<[f32; 4]>,
    pub wrap: WrapMode,
    /// Whether the alpha channel carries meaningful opacity.
    pub has_alpha: bool,
}

impl Texture {
    pub fn new(width: u32, height: u32, pixels: Vec<[f32; 4]>) -> TextureResult<Self> {
        if width == 0 || height == 0 {
            return Err(TextureError::ZeroDimensions { width, height });
        }
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(TextureError::PixelCountMismatch {
                width,
                height,
                expected,
                actual: pixels.len(),
            });
        }
        let has_alpha = pixels.iter().any(|p| p[3] < 1.0);
        Ok(Self {
            width,
            height,
            pixels,
            wrap: WrapMode::default(),
            has_alpha,
        })
    }

    /// Build from RGB triples; alpha is 1 everywhere.
    pub fn from_rgb(width: u32, height: u32, rgb: &[Vec3]) -> TextureResult<Self> {
        Self::new(width, height, rgb.iter().map(|c| [c.x, c.y, c.z, 1.0]).collect())
    }

    /// Build from 8-bit sRGB(A) bytes, converting color channels to linear.
    pub fn from_srgba8(width: u32, height: u32, bytes: &[u8]) -> TextureResult<Self> {
        let pixels = bytes
            .chunks_exact(4)
            .map(|px| {
                [
                    srgb_to_linear(px[0] as f32 / 255.0),
                    srgb_to_linear(px[1] as f32 / 255.0),
                    srgb_to_linear(px[2] as f32 / 255.0),
                    px[3] as f32 / 255.0,
                ]
            })
            .collect();
        Self::new(width, height, pixels)
    }

    /// 1x1 texture of a single color.
    pub fn solid_color(color: Vec3) -> Self {
        Self {
            width: 1,
            height: 1,
            pixels: vec![[color.x, color.y, color.z, 1.0]],
            wrap: WrapMode::Clamp,
            has_alpha: false,
        }
    }

    pub fn with_wrap(mut self, wrap: WrapMode) -> Self {
        self.wrap = wrap;
        self
    }

    /// Bilinearly filtered RGBA at `(u, v)`.
    pub fn sample(&self, u: f32, v: f32) -> [f32; 4] {
        let u = if u.is_finite() { self.wrap.apply(u) } else { 0.0 };
        let v = if v.is_finite() { self.wrap.apply(v) } else { 0.0 };

        let x = u * (self.width - 1) as f32;
        let y = (1.0 - v) * (self.height - 1) as f32;

        let x0 = (x.floor() as u32).min(self.width - 1);
        let y0 = (y.floor() as u32).min(self.height - 1);
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);
        let fx = x - x0 as f32;
        let fy = y - y0 as f32;

        let p00 = self.get_pixel(x0, y0);
        let p10 = self.get_pixel(x1, y0);
        let p01 = self.get_pixel(x0, y1);
        let p11 = self.get_pixel(x1, y1);

        std::array::from_fn(|c| {
            let top = p00[c] * (1.0 - fx) + p10[c] * fx;
            let bottom = p01[c] * (1.0 - fx) + p11[c] * fx;
            top * (1.0 - fy) + bottom * fy
        })
    }

    fn get_pixel(&self, x: u32, y: u32) -> [f32; 4] {
        let idx = y as usize * self.width as usize + x as usize;
        self.pixels.get(idx).copied().unwrap_or([0.0, 0.0, 0.0, 1.0])
    }

    pub fn size_bytes(&self) -> usize {
        self.pixels.len() * std::mem::size_of::<[f32; 4]>()
    }
}

impl TextureSampler for Texture {
    fn get_color(&self, u: f32, v: f32) -> Vec3 {
        let [r, g, b, _] = self.sample(u, v);
        Vec3::new(r, g, b)
    }

    fn get_alpha(&self, u: f32, v: f32) -> f32 {
        if !self.has_alpha {
            return 1.0;
        }
        self.sample(u, v)[3].clamp(0.0, 1.0)
    }
}

/// sRGB transfer function to linear.
pub fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}
