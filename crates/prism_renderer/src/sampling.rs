//! Random and quasi-random sampling helpers shared by materials, lights and the camera.

use prism_math::Vec3;
use rand::{Rng, RngCore};
use std::f32::consts::PI;
use std::sync::OnceLock;

/// Number of precomputed Halton points per base.
pub const HALTON_SAMPLES: usize = 1024;

struct HaltonTable {
    base2: Vec<f32>,
    base3: Vec<f32>,
}

fn halton_table() -> &'static HaltonTable {
    static TABLE: OnceLock<HaltonTable> = OnceLock::new();
    TABLE.get_or_init(|| HaltonTable {
        base2: (0..HALTON_SAMPLES).map(|i| radical_inverse(2, i as u32)).collect(),
        base3: (0..HALTON_SAMPLES).map(|i| radical_inverse(3, i as u32)).collect(),
    })
}

/// Van der Corput radical inverse of `index` in `base`, in `[0, 1)`.
pub fn radical_inverse(base: u32, mut index: u32) -> f32 {
    let inv_base = 1.0 / base as f64;
    let mut inv_bi = inv_base;
    let mut result = 0.0f64;
    while index > 0 {
        result += (index % base) as f64 * inv_bi;
        index /= base;
        inv_bi *= inv_base;
    }
    (result as f32).min(1.0 - f32::EPSILON)
}

/// Halton value for `index`: base 2 for dimension 0, base 3 otherwise.
/// Indices past the precomputed table are evaluated directly.
pub fn halton(index: usize, dimension: usize) -> f32 {
    let base = if dimension == 0 { 2 } else { 3 };
    if index >= HALTON_SAMPLES {
        return radical_inverse(base, index as u32);
    }
    let table = halton_table();
    if dimension == 0 {
        table.base2[index]
    } else {
        table.base3[index]
    }
}

/// Per-path cursor into the Halton sequence.
///
/// Each path starts at a random index and applies a random toroidal shift
/// (Cranley-Patterson rotation) per dimension, so every draw is uniformly
/// distributed while consecutive draws of one path stay well spread.
#[derive(Debug, Clone, Copy)]
pub struct QuasiSequence {
    index: usize,
    shift: [f32; 2],
}

impl QuasiSequence {
    pub fn new(rng: &mut dyn RngCore) -> Self {
        Self {
            index: rng.gen_range(0..HALTON_SAMPLES),
            shift: [rng.gen(), rng.gen()],
        }
    }

    /// Value of the sequence at `offset` past the current index.
    pub fn peek(&self, offset: usize, dimension: usize) -> f32 {
        let shift = self.shift[dimension.min(1)];
        let x = halton(self.index + offset, dimension) + shift;
        if x >= 1.0 {
            x - 1.0
        } else {
            x
        }
    }

    /// Next value in `dimension`, advancing the cursor.
    pub fn next(&mut self, dimension: usize) -> f32 {
        let x = self.peek(0, dimension);
        self.index = self.index.wrapping_add(1);
        x
    }
}

/// 2D stratified jitter for sample `index` inside a pixel, in `[0, 1)^2`.
pub fn stratified_halton(index: usize, jitter: [f32; 2]) -> (f32, f32) {
    let x = (halton(index, 0) + jitter[0]).fract();
    let y = (halton(index, 1) + jitter[1]).fract();
    (x, y)
}

pub fn random_in_unit_sphere(rng: &mut dyn RngCore) -> Vec3 {
    loop {
        let p = Vec3::new(
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
        );
        if p.length_squared() < 1.0 {
            return p;
        }
    }
}

pub fn random_unit_vector(rng: &mut dyn RngCore) -> Vec3 {
    let z: f32 = rng.gen_range(-1.0..1.0);
    let phi = 2.0 * PI * rng.gen::<f32>();
    let r = (1.0 - z * z).max(0.0).sqrt();
    Vec3::new(r * phi.cos(), r * phi.sin(), z)
}

/// Uniform direction on the hemisphere around `normal`.
pub fn random_in_hemisphere(normal: Vec3, rng: &mut dyn RngCore) -> Vec3 {
    let v = random_unit_vector(rng);
    if v.dot(normal) > 0.0 {
        v
    } else {
        -v
    }
}

/// Cosine-weighted direction around `normal`.
pub fn random_cosine_direction(normal: Vec3, rng: &mut dyn RngCore) -> Vec3 {
    let r1: f32 = rng.gen();
    let r2: f32 = rng.gen();
    let phi = 2.0 * PI * r1;
    let r = r2.sqrt();
    let local = Vec3::new(phi.cos() * r, phi.sin() * r, (1.0 - r2).max(0.0).sqrt());
    Onb::from_w(normal).local(local)
}

pub fn random_in_unit_disk(rng: &mut dyn RngCore) -> Vec3 {
    let r = rng.gen::<f32>().sqrt();
    let theta = 2.0 * PI * rng.gen::<f32>();
    Vec3::new(r * theta.cos(), r * theta.sin(), 0.0)
}

/// Uniform point inside a regular polygon with `blades` corners inscribed in
/// the unit circle (z = 0). Fewer than 3 blades samples the unit disk.
pub fn random_in_unit_polygon(blades: u32, rotation: f32, rng: &mut dyn RngCore) -> Vec3 {
    if blades < 3 {
        return random_in_unit_disk(rng);
    }
    let sector_angle = 2.0 * PI / blades as f32;
    let sector = rng.gen_range(0..blades) as f32;
    let a0 = rotation + sector * sector_angle;
    let a1 = a0 + sector_angle;
    let c0 = Vec3::new(a0.cos(), a0.sin(), 0.0);
    let c1 = Vec3::new(a1.cos(), a1.sin(), 0.0);

    // Uniform point in the triangle (center, c0, c1)
    let mut s: f32 = rng.gen();
    let mut t: f32 = rng.gen();
    if s + t > 1.0 {
        s = 1.0 - s;
        t = 1.0 - t;
    }
    c0 * s + c1 * t
}

/// Henyey-Greenstein phase function sample around `forward`.
/// `g` in `(-1, 1)`: positive values favor forward scattering.
pub fn sample_henyey_greenstein(forward: Vec3, g: f32, rng: &mut dyn RngCore) -> Vec3 {
    let g = g.clamp(-0.999, 0.999);
    let r1: f32 = rng.gen();
    let r2: f32 = rng.gen();
    let cos_theta = if g.abs() < 1e-3 {
        1.0 - 2.0 * r1
    } else {
        let sq = (1.0 - g * g) / (1.0 + g - 2.0 * g * r1);
        ((1.0 + g * g - sq * sq) / (2.0 * g)).clamp(-1.0, 1.0)
    };
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    let phi = 2.0 * PI * r2;
    let local = Vec3::new(sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta);
    Onb::from_w(forward).local(local)
}

/// Orthonormal basis with `w` as the "up" axis.
#[derive(Debug, Clone, Copy)]
pub struct Onb {
    pub u: Vec3,
    pub v: Vec3,
    pub w: Vec3,
}

impl Onb {
    /// Branchless construction (Duff et al. 2017). A zero or non-finite `n`
    /// falls back to the +Z basis.
    pub fn from_w(n: Vec3) -> Self {
        let w = prism_math::normalize_or(n, Vec3::Z);
        let sign = 1.0f32.copysign(w.z);
        let a = -1.0 / (sign + w.z);
        let b = w.x * w.y * a;
        let u = Vec3::new(1.0 + sign * w.x * w.x * a, sign * b, -sign * w.x);
        let v = Vec3::new(b, sign + w.y * w.y * a, -w.y);
        Self { u, v, w }
    }

    /// Basis around `n` with `u` along `tangent` projected onto the surface.
    /// A tangent parallel to `n` falls back to [`Onb::from_w`].
    pub fn from_tangent(n: Vec3, tangent: Vec3) -> Self {
        let w = prism_math::normalize_or(n, Vec3::Z);
        let projected = tangent - w * w.dot(tangent);
        if !projected.is_finite() || projected.length_squared() < 1e-8 {
            return Self::from_w(w);
        }
        let u = projected.normalize();
        Self { u, v: w.cross(u), w }
    }

    #[inline]
    pub fn local(&self, a: Vec3) -> Vec3 {
        a.x * self.u + a.y * self.v + a.z * self.w
    }
}
