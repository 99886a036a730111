//! Refractive material with per-channel dispersion.

use super::{reflect, refract, Color, ScatterResult};
use crate::hittable::HitRecord;
use crate::microfacet::{fresnel_dielectric, lerp3};
use crate::sampling::random_in_unit_sphere;
use prism_math::{normalize_or, Ray, Vec3};
use rand::{Rng, RngCore};

const CAUSTIC_TINT: Color = Color::new(1.0, 1.0, 0.9);
/// Upper bound on the per-channel dispersion weight.
const MAX_CHANNEL_WEIGHT: f32 = 2.0;

#[derive(Debug, Clone)]
pub struct Dielectric {
    /// Base index of refraction (red channel)
    pub ior: f32,
    /// Relative IOR step between channels; green is `ior * (1 + d)`, blue `ior * (1 + 2d)`
    pub dispersion: f32,
    pub color: Color,
    pub tint: Color,
    pub tint_strength: f32,
    pub roughness: f32,
    /// Origin offset along the normal and travel length for absorption
    pub thickness: f32,
    pub absorption: f32,
    pub caustic_intensity: f32,
}

impl Dielectric {
    pub fn new(ior: f32) -> Self {
        Self {
            ior: ior.max(1.0),
            dispersion: 0.01,
            color: Color::new(0.95, 0.95, 1.0),
            tint: Color::new(0.8, 0.8, 0.85),
            tint_strength: 0.2,
            roughness: 0.0,
            thickness: 1e-3,
            absorption: 0.1,
            caustic_intensity: 0.1,
        }
    }

    /// Clear glass without tint, caustic boost or dispersion.
    pub fn clear(ior: f32) -> Self {
        Self {
            dispersion: 0.0,
            color: Color::ONE,
            tint_strength: 0.0,
            absorption: 0.0,
            caustic_intensity: 0.0,
            ..Self::new(ior)
        }
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn with_roughness(mut self, roughness: f32) -> Self {
        self.roughness = roughness.clamp(0.0, 1.0);
        self
    }

    pub fn with_dispersion(mut self, dispersion: f32) -> Self {
        self.dispersion = dispersion.max(0.0);
        self
    }

    pub fn with_thickness(mut self, thickness: f32) -> Self {
        self.thickness = thickness.max(0.0);
        self
    }

    pub fn channel_iors(&self) -> [f32; 3] {
        [
            self.ior,
            self.ior * (1.0 + self.dispersion),
            self.ior * (1.0 + 2.0 * self.dispersion),
        ]
    }

    /// IOR of the green channel, which drives the refracted direction.
    pub fn index_of_refraction(&self) -> f32 {
        self.channel_iors()[1]
    }

    pub(super) fn scatter(
        &self,
        ray_in: &Ray,
        rec: &HitRecord,
        rng: &mut dyn RngCore,
    ) -> Option<ScatterResult> {
        let n = rec.normal;
        let unit_dir = normalize_or(ray_in.direction(), -n);
        let cos_i = (-unit_dir).dot(n).clamp(0.0, 1.0);

        let eta = |ior: f32| if rec.front_face { 1.0 / ior } else { ior };
        let iors = self.channel_iors();
        let fresnel = Color::from_array(iors.map(|ior| fresnel_dielectric(cos_i, eta(ior))));
        let reflect_probability = fresnel.y;

        if rng.gen::<f32>() < reflect_probability {
            let mirror = reflect(unit_dir, n);
            let mut direction = self.perturb(mirror, rng);
            if direction.dot(n) <= 0.0 {
                direction = mirror;
            }
            let weight = (fresnel / reflect_probability).min(Color::splat(MAX_CHANNEL_WEIGHT));
            let origin = rec.p + n * self.thickness;
            return Some(ScatterResult::new(weight, Ray::new(origin, direction)));
        }

        let straight = normalize_or(refract(unit_dir, n, eta(iors[1])), unit_dir);
        let mut direction = self.perturb(straight, rng);
        if direction.dot(n) >= 0.0 {
            direction = straight;
        }

        let weight = ((Color::ONE - fresnel) / (1.0 - reflect_probability).max(1e-6))
            .min(Color::splat(MAX_CHANNEL_WEIGHT));

        let cos_t = (-direction).dot(n).clamp(0.0, 1.0);
        let sin2_t = 1.0 - cos_t * cos_t;
        let caustic = CAUSTIC_TINT * (sin2_t * self.caustic_intensity * (1.0 - cos_i));
        let body = self.color + caustic;
        let tinted = lerp3(body, body * self.tint, self.tint_strength);
        let transmitted = (tinted * (-self.absorption * self.thickness).exp()).min(Color::ONE);

        let origin = rec.p - n * self.thickness;
        Some(ScatterResult::new(transmitted * weight, Ray::new(origin, direction)))
    }

    fn perturb(&self, direction: Vec3, rng: &mut dyn RngCore) -> Vec3 {
        if self.roughness <= 0.0 {
            return direction;
        }
        normalize_or(direction + self.roughness * random_in_unit_sphere(rng), direction)
    }
}
