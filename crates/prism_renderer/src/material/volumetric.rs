//! Participating medium whose density falls off with distance from a center.

use super::{Color, ScatterResult};
use crate::hittable::HitRecord;
use crate::sampling::sample_henyey_greenstein;
use prism_math::{normalize_or, Ray, Vec3};
use rand::{Rng, RngCore};

#[derive(Debug, Clone)]
pub struct Volumetric {
    pub albedo: Color,
    pub density: f32,
    /// Absorption probability at the center
    pub absorption: f32,
    /// Henyey-Greenstein asymmetry, positive scatters forward
    pub anisotropy: f32,
    pub emission: Color,
    pub emission_strength: f32,
    pub center: Vec3,
    /// Distance from `center` at which density and absorption reach zero
    pub falloff_distance: f32,
    pub scattering_factor: f32,
}

impl Volumetric {
    pub fn new(albedo: Color, density: f32, absorption: f32) -> Self {
        Self {
            albedo,
            density: density.max(0.0),
            absorption: absorption.clamp(0.0, 1.0),
            anisotropy: 0.7,
            emission: Color::ZERO,
            emission_strength: 5.0,
            center: Vec3::ZERO,
            falloff_distance: 1.0,
            scattering_factor: 0.01,
        }
    }

    pub fn with_anisotropy(mut self, g: f32) -> Self {
        self.anisotropy = g.clamp(-0.999, 0.999);
        self
    }

    pub fn with_extent(mut self, center: Vec3, falloff_distance: f32) -> Self {
        self.center = center;
        self.falloff_distance = falloff_distance.max(1e-4);
        self
    }

    pub fn with_emission(mut self, emission: Color, strength: f32) -> Self {
        self.emission = emission;
        self.emission_strength = strength;
        self
    }

    pub fn with_scattering_factor(mut self, factor: f32) -> Self {
        self.scattering_factor = factor.max(0.0);
        self
    }

    fn falloff(&self, p: Vec3) -> f32 {
        (1.0 - p.distance(self.center) / self.falloff_distance).clamp(0.0, 1.0)
    }

    pub fn density_at(&self, p: Vec3) -> f32 {
        self.density * self.falloff(p)
    }

    pub fn absorption_at(&self, p: Vec3) -> f32 {
        (self.absorption * self.falloff(p)).min(1.0)
    }

    pub(super) fn emitted(&self, p: Vec3) -> Color {
        self.emission * self.albedo * (self.emission_strength * self.density_at(p))
    }

    pub(super) fn scatter(
        &self,
        ray_in: &Ray,
        rec: &HitRecord,
        rng: &mut dyn RngCore,
    ) -> Option<ScatterResult> {
        if rng.gen::<f32>() < self.absorption_at(rec.p) {
            return None;
        }
        let forward = normalize_or(ray_in.direction(), -rec.normal);
        let direction = sample_henyey_greenstein(forward, self.anisotropy, rng);
        Some(ScatterResult::new(self.albedo, Ray::new(rec.p, direction)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rec_at(p: Vec3) -> HitRecord {
        HitRecord {
            p,
            normal: -Vec3::X,
            face_normal: -Vec3::X,
            t: 1.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_absorption_probability() {
        let fog = Volumetric::new(Color::splat(0.9), 1.0, 0.5).with_extent(Vec3::ZERO, 10.0);
        let ray = Ray::new(Vec3::new(-5.0, 0.0, 0.0), Vec3::X);
        let mut rng = StdRng::seed_from_u64(9);
        let n = 4000;
        let absorbed = (0..n)
            .filter(|_| fog.scatter(&ray, &rec_at(Vec3::ZERO), &mut rng).is_none())
            .count();
        let rate = absorbed as f32 / n as f32;
        assert!((rate - 0.5).abs() < 0.05, "rate {}", rate);

        // Outside the falloff distance nothing is absorbed
        let absorbed_far = (0..200)
            .filter(|_| fog.scatter(&ray, &rec_at(Vec3::new(20.0, 0.0, 0.0)), &mut rng).is_none())
            .count();
        assert_eq!(absorbed_far, 0);
    }

    #[test]
    fn test_forward_scattering() {
        let fog = Volumetric::new(Color::ONE, 1.0, 0.0).with_anisotropy(0.8);
        let ray = Ray::new(Vec3::new(-5.0, 0.0, 0.0), Vec3::X);
        let mut rng = StdRng::seed_from_u64(10);
        let mean: f32 = (0..2000)
            .filter_map(|_| fog.scatter(&ray, &rec_at(Vec3::ZERO), &mut rng))
            .map(|r| r.scattered.direction().x)
            .sum::<f32>()
            / 2000.0;
        // Mean cosine of Henyey-Greenstein equals g
        assert!((mean - 0.8).abs() < 0.05, "mean {}", mean);
    }

    #[test]
    fn test_density_falloff_and_emission() {
        let fog = Volumetric::new(Color::ONE, 2.0, 0.2)
            .with_extent(Vec3::ZERO, 4.0)
            .with_emission(Color::new(1.0, 0.5, 0.0), 5.0);
        assert_eq!(fog.density_at(Vec3::ZERO), 2.0);
        assert!((fog.density_at(Vec3::new(2.0, 0.0, 0.0)) - 1.0).abs() < 1e-6);
        assert_eq!(fog.density_at(Vec3::new(0.0, 9.0, 0.0)), 0.0);
        assert_eq!(fog.emitted(Vec3::ZERO), Color::new(10.0, 5.0, 0.0));
    }
}
