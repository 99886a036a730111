//! Surface and volume materials.
//!
//! Materials are a closed set matched exhaustively. Each one answers two
//! questions at a hit: how much light it emits, and whether (and where) the
//! path continues together with the throughput multiplier for that bounce.

mod dielectric;
mod emissive;
mod metal;
pub mod occlusion;
mod principled;
mod property;
mod volumetric;

pub use dielectric::Dielectric;
pub use emissive::Emissive;
pub use metal::Metal;
pub use principled::Principled;
pub use property::{MaterialProperty, TextureTransform};
pub use volumetric::Volumetric;

use crate::hittable::{HitRecord, Hittable};
use prism_math::{Ray, Vec3};
use rand::RngCore;

/// Linear RGB color.
pub type Color = Vec3;

/// Material family, used by the integrator for depth caps, roulette and
/// whether direct lighting applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialKind {
    Principled,
    Metal,
    Dielectric,
    Volumetric,
    Emissive,
}

impl MaterialKind {
    /// Dielectric and volumetric bounces carry all their light through
    /// continued transport, so no shadow rays are cast from them.
    pub fn samples_direct_light(self) -> bool {
        matches!(self, MaterialKind::Principled | MaterialKind::Metal)
    }
}

/// Outgoing ray and throughput multiplier for one bounce.
#[derive(Debug, Clone, Copy)]
pub struct ScatterResult {
    pub attenuation: Color,
    pub scattered: Ray,
}

impl ScatterResult {
    pub fn new(attenuation: Color, scattered: Ray) -> Self {
        Self {
            attenuation,
            scattered,
        }
    }
}

/// Scene access a material may need while scattering.
pub struct ScatterContext<'a> {
    /// Geometry probed for ambient occlusion.
    pub world: &'a dyn Hittable,
    pub ambient_occlusion_samples: u32,
}

#[derive(Debug, Clone)]
pub enum Material {
    Principled(Principled),
    Metal(Metal),
    Dielectric(Dielectric),
    Volumetric(Volumetric),
    Emissive(Emissive),
}

impl Material {
    /// Scatter `ray_in` at `rec`. `None` means the path is absorbed.
    pub fn scatter(
        &self,
        ray_in: &Ray,
        rec: &HitRecord,
        ctx: &ScatterContext<'_>,
        rng: &mut dyn RngCore,
    ) -> Option<ScatterResult> {
        let result = match self {
            Material::Principled(m) => m.scatter(ray_in, rec, ctx, rng),
            Material::Metal(m) => m.scatter(ray_in, rec, ctx, rng),
            Material::Dielectric(m) => m.scatter(ray_in, rec, rng),
            Material::Volumetric(m) => m.scatter(ray_in, rec, rng),
            Material::Emissive(_) => None,
        }?;
        if result.attenuation.is_finite() && result.scattered.direction().is_finite() {
            Some(result)
        } else {
            log::debug!("dropping non-finite scatter from {:?} material", self.kind());
            None
        }
    }

    pub fn emitted(&self, u: f32, v: f32, p: Vec3) -> Color {
        match self {
            Material::Principled(m) => m.emission_at(u, v),
            Material::Volumetric(m) => m.emitted(p),
            Material::Emissive(m) => m.emission.evaluate(u, v),
            Material::Metal(_) | Material::Dielectric(_) => Color::ZERO,
        }
    }

    /// Shading normal at `rec`, after any normal map.
    pub fn shading_normal(&self, rec: &HitRecord) -> Vec3 {
        match self {
            Material::Principled(m) => m.shading_normal(rec.normal, rec.u, rec.v),
            _ => rec.normal,
        }
    }

    pub fn index_of_refraction(&self) -> f32 {
        match self {
            Material::Principled(m) => m.index_of_refraction(),
            Material::Metal(_) => 0.0,
            Material::Dielectric(m) => m.index_of_refraction(),
            Material::Volumetric(_) | Material::Emissive(_) => 1.0,
        }
    }

    /// Distance falloff applied to direct lighting after this bounce.
    pub fn scattering_factor(&self) -> f32 {
        match self {
            Material::Principled(_) | Material::Metal(_) => 0.01,
            Material::Dielectric(_) => 0.001,
            Material::Volumetric(m) => m.scattering_factor,
            Material::Emissive(_) => 0.0,
        }
    }

    pub fn kind(&self) -> MaterialKind {
        match self {
            Material::Principled(_) => MaterialKind::Principled,
            Material::Metal(_) => MaterialKind::Metal,
            Material::Dielectric(_) => MaterialKind::Dielectric,
            Material::Volumetric(_) => MaterialKind::Volumetric,
            Material::Emissive(_) => MaterialKind::Emissive,
        }
    }
}

impl From<Principled> for Material {
    fn from(m: Principled) -> Self {
        Material::Principled(m)
    }
}

impl From<Metal> for Material {
    fn from(m: Metal) -> Self {
        Material::Metal(m)
    }
}

impl From<Dielectric> for Material {
    fn from(m: Dielectric) -> Self {
        Material::Dielectric(m)
    }
}

impl From<Volumetric> for Material {
    fn from(m: Volumetric) -> Self {
        Material::Volumetric(m)
    }
}

impl From<Emissive> for Material {
    fn from(m: Emissive) -> Self {
        Material::Emissive(m)
    }
}

/// Mirror `v` about `n`.
#[inline]
pub fn reflect(v: Vec3, n: Vec3) -> Vec3 {
    v - 2.0 * v.dot(n) * n
}

/// Snell refraction of unit `uv` through unit normal `n` facing against it.
#[inline]
pub fn refract(uv: Vec3, n: Vec3, etai_over_etat: f32) -> Vec3 {
    let cos_theta = (-uv).dot(n).min(1.0);
    let r_out_perp = etai_over_etat * (uv + cos_theta * n);
    let r_out_parallel = -(1.0 - r_out_perp.length_squared()).abs().sqrt() * n;
    r_out_perp + r_out_parallel
}
