//! Path integrator.
//!
//! [`ray_color`] follows one camera ray through the world: intersect, apply
//! the material's normal map, add emission, scatter and sample one light.
//! Paths end on a miss, on absorption, at a per-material depth cap or through
//! russian roulette. It touches no shared mutable state, so any number of
//! threads can call it on one [`World`].
//!
//! Two roulette stages run per bounce and are tuned separately:
//! - the distance stage, before intersection, kills paths whose throughput is
//!   small relative to how far they have travelled;
//! - the material stage, after an opaque or volumetric scatter, uses a
//!   probability band chosen by material family.

use crate::hittable::{HitRecord, Hittable};
use crate::light::Light;
use crate::material::occlusion::AO_SAMPLES;
use crate::material::{Color, MaterialKind, ScatterContext};
use crate::sampling::QuasiSequence;
use crate::scene::World;
use prism_math::{Interval, Ray, Vec3};
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

/// Bounces before either roulette stage may terminate a path.
pub const MIN_DEPTH: u32 = 3;

/// Near end of shadow ray intervals.
pub const SHADOW_EPSILON: f32 = 0.01;

/// Near end of camera and bounce ray intervals.
pub const PRIMARY_T_MIN: f32 = 1e-4;

/// Bounce caps per material family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepthLimits {
    pub dielectric: u32,
    pub volumetric: u32,
    pub metal: u32,
    pub principled: u32,
    pub emissive: u32,
}

impl Default for DepthLimits {
    fn default() -> Self {
        Self {
            dielectric: 15,
            volumetric: 20,
            metal: 6,
            principled: 6,
            emissive: 6,
        }
    }
}

impl DepthLimits {
    pub fn limit(&self, kind: MaterialKind) -> u32 {
        match kind {
            MaterialKind::Dielectric => self.dielectric,
            MaterialKind::Volumetric => self.volumetric,
            MaterialKind::Metal => self.metal,
            MaterialKind::Principled => self.principled,
            MaterialKind::Emissive => self.emissive,
        }
    }

    /// Deepest any path can go.
    pub fn max_depth(&self) -> u32 {
        self.dielectric
            .max(self.volumetric)
            .max(self.metal)
            .max(self.principled)
            .max(self.emissive)
    }
}

/// Continuation probability band `[min, max]` applied to the throughput's
/// largest channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityBand {
    pub min: f32,
    pub max: f32,
}

impl ProbabilityBand {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn probability(&self, max_channel: f32) -> f32 {
        max_channel.max(self.min).min(self.max).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouletteSettings {
    /// Distance stage, evaluated before each intersection
    pub distance_stage: bool,
    pub base_threshold: f32,
    /// Threshold growth per unit of travelled distance
    pub distance_factor: f32,
    pub max_continuation: f32,

    /// Material stage, evaluated after opaque and volumetric scatters
    pub material_stage: bool,
    /// Dielectric and volumetric band
    pub transmissive: ProbabilityBand,
    pub metal: ProbabilityBand,
    pub principled: ProbabilityBand,
}

impl Default for RouletteSettings {
    fn default() -> Self {
        Self {
            distance_stage: true,
            base_threshold: 0.01,
            distance_factor: 0.001,
            max_continuation: 0.95,
            material_stage: true,
            transmissive: ProbabilityBand::new(0.8, 0.99),
            metal: ProbabilityBand::new(0.5, 0.97),
            principled: ProbabilityBand::new(0.3, 0.95),
        }
    }
}

impl RouletteSettings {
    /// Continuation probability of the distance stage, or `None` when the
    /// throughput is below the distance-adjusted threshold.
    pub fn distance_probability(&self, max_channel: f32, total_distance: f32) -> Option<f32> {
        let threshold = self.base_threshold + total_distance * self.distance_factor;
        if max_channel < threshold {
            return None;
        }
        Some(max_channel.min(self.max_continuation).clamp(0.0, 1.0))
    }

    pub fn material_probability(&self, kind: MaterialKind, max_channel: f32) -> f32 {
        match kind {
            MaterialKind::Dielectric | MaterialKind::Volumetric => self.transmissive.probability(max_channel),
            MaterialKind::Metal => self.metal.probability(max_channel),
            MaterialKind::Principled | MaterialKind::Emissive => self.principled.probability(max_channel),
        }
    }
}

/// Survive with probability `probability` given a uniform draw `u`, returning
/// the compensated throughput.
#[inline]
pub fn russian_roulette(throughput: Color, probability: f32, u: f32) -> Option<Color> {
    if probability <= 0.0 || u > probability {
        None
    } else {
        Some(throughput / probability)
    }
}

/// Per-path integrator settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntegratorSettings {
    pub max_depth: u32,
    pub min_depth: u32,
    pub depth_limits: DepthLimits,
    pub roulette: RouletteSettings,
    pub ambient_occlusion_samples: u32,
}

impl Default for IntegratorSettings {
    fn default() -> Self {
        let depth_limits = DepthLimits::default();
        Self {
            max_depth: depth_limits.max_depth(),
            min_depth: MIN_DEPTH,
            depth_limits,
            roulette: RouletteSettings::default(),
            ambient_occlusion_samples: AO_SAMPLES,
        }
    }
}

/// Radiance carried by one camera ray plus its first-hit shading normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathSample {
    pub radiance: Color,
    pub normal: Option<Vec3>,
}

/// Radiance arriving along `ray`.
pub fn ray_color(ray: &Ray, world: &World, settings: &IntegratorSettings, rng: &mut dyn RngCore) -> Color {
    trace_path(ray, world, settings, rng).radiance
}

pub fn trace_path(ray: &Ray, world: &World, settings: &IntegratorSettings, rng: &mut dyn RngCore) -> PathSample {
    let max_depth = settings.max_depth.min(settings.depth_limits.max_depth());
    let roulette = &settings.roulette;
    let atmosphere = world.atmosphere();
    let ctx = ScatterContext {
        world,
        ambient_occlusion_samples: settings.ambient_occlusion_samples,
    };

    let sequence = QuasiSequence::new(rng);
    let mut throughput = Color::ONE;
    let mut radiance = Color::ZERO;
    let mut first_normal = None;
    let mut total_distance = 0.0f32;
    let mut current = *ray;

    for bounce in 0..max_depth {
        if roulette.distance_stage && bounce > settings.min_depth {
            let max_channel = throughput.max_element();
            let survived = roulette
                .distance_probability(max_channel, total_distance)
                .and_then(|p| russian_roulette(throughput, p, sequence.peek(bounce as usize, 0)));
            match survived {
                Some(t) => throughput = t,
                None => break,
            }
        }

        let mut rec = HitRecord::default();
        if !world.hit(&current, Interval::from_min(PRIMARY_T_MIN), &mut rec) {
            let sky = world.background().sample(current.direction());
            radiance += throughput * atmosphere.apply_to_sky(sky, total_distance);
            break;
        }
        let material = world.material(rec.material);
        rec.normal = material.shading_normal(&rec);
        if bounce == 0 {
            first_normal = Some(rec.normal);
        }

        let segment_start = total_distance;
        total_distance += rec.t * current.direction().length();
        if atmosphere.enabled {
            radiance += throughput * atmosphere.segment_in_scatter(segment_start, total_distance);
            throughput *= atmosphere.segment_transmittance(segment_start, total_distance);
        }

        let kind = material.kind();
        radiance += throughput * material.emitted(rec.u, rec.v, rec.p);

        if bounce >= settings.depth_limits.limit(kind) {
            break;
        }

        let Some(scatter) = material.scatter(&current, &rec, &ctx, rng) else {
            break;
        };

        if kind == MaterialKind::Dielectric {
            throughput *= scatter.attenuation;
            current = scatter.scattered;
            continue;
        }

        let falloff = 1.0 / (1.0 + total_distance * material.scattering_factor());
        if kind.samples_direct_light() {
            let direct = sample_direct_light(world, &rec, rng);
            radiance += throughput * scatter.attenuation * direct * falloff;
        }
        throughput *= scatter.attenuation * falloff;

        if roulette.material_stage && bounce > settings.min_depth {
            let p = roulette.material_probability(kind, throughput.max_element());
            match russian_roulette(throughput, p, sequence.peek(bounce as usize, 1)) {
                Some(t) => throughput = t,
                None => break,
            }
        }

        current = scatter.scattered;
    }

    PathSample {
        radiance,
        normal: first_normal,
    }
}

/// Unshadowed-light estimate at `rec` from one uniformly chosen light,
/// scaled by the number of lights.
pub fn sample_direct_light(world: &World, rec: &HitRecord, rng: &mut dyn RngCore) -> Color {
    let lights = world.lights();
    if lights.is_empty() {
        return Color::ZERO;
    }
    let light = &lights[rng.gen_range(0..lights.len())];
    light_contribution(world, light, rec, rng) * lights.len() as f32
}

/// Visible radiance from `light` at `rec`, averaged over the light's samples.
pub fn light_contribution(world: &dyn Hittable, light: &Light, rec: &HitRecord, rng: &mut dyn RngCore) -> Color {
    let samples = light.sample_count();
    let mut shadow_rec = HitRecord::default();
    let mut sum = Color::ZERO;
    for stratum in 0..samples {
        let sample = light.sample(rec.p, stratum, rng);
        let cos_theta = rec.normal.dot(sample.to_light).clamp(0.0, 1.0);
        if cos_theta <= 0.0 || sample.radiance.max_element() <= 0.0 {
            continue;
        }
        let shadow_ray = Ray::new(rec.p, sample.to_light);
        let shadow_t = Interval::new(SHADOW_EPSILON, sample.distance - SHADOW_EPSILON);
        if !world.hit(&shadow_ray, shadow_t, &mut shadow_rec) {
            sum += sample.radiance * cos_theta;
        }
    }
    sum / samples as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bvh::BvhBuildOptions;
    use crate::material::{Emissive, Principled};
    use crate::scene::{Background, Scene};
    use crate::sphere::Sphere;
    use prism_core::Texture;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Arc;

    fn floor_scene(light: Option<Light>, occluder: bool) -> World {
        let mut scene = Scene::new();
        let white = scene.add_material(Principled::diffuse(Color::ONE).with_ambient_occlusion(false));
        scene.add_primitive(Sphere::new(Vec3::new(0.0, -1000.0, 0.0), 1000.0, white));
        if occluder {
            scene.add_primitive(Sphere::new(Vec3::new(0.0, 2.0, 0.0), 0.5, white));
        }
        if let Some(light) = light {
            scene.add_light(light);
        }
        scene.build(BvhBuildOptions::sequential()).unwrap()
    }

    #[test]
    fn test_miss_returns_background() {
        let mut scene = Scene::new();
        let mat = scene.add_material(Principled::default());
        scene.add_primitive(Sphere::new(Vec3::new(0.0, 0.0, -5.0), 1.0, mat));
        scene.set_background(Background::Color(Color::new(0.2, 0.3, 0.4)));
        let world = scene.build(BvhBuildOptions::sequential()).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, 1.0));
        assert_eq!(ray_color(&ray, &world, &IntegratorSettings::default(), &mut rng), Color::new(0.2, 0.3, 0.4));
    }

    #[test]
    fn test_emitter_seen_directly() {
        let mut scene = Scene::new();
        let lamp = scene.add_material(Emissive::new(Color::new(1.0, 0.5, 0.25), 2.0));
        scene.add_primitive(Sphere::new(Vec3::new(0.0, 0.0, -5.0), 1.0, lamp));
        let world = scene.build(BvhBuildOptions::sequential()).unwrap();
        let mut rng = StdRng::seed_from_u64(2);
        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0));
        let sample = trace_path(&ray, &world, &IntegratorSettings::default(), &mut rng);
        assert_eq!(sample.radiance, Color::new(2.0, 1.0, 0.5));
        assert!((sample.normal.unwrap() - Vec3::Z).length() < 1e-5);
    }

    #[test]
    fn test_direct_light_and_shadow() {
        let lit = floor_scene(Some(Light::point(Vec3::new(0.0, 4.0, 0.0), Color::splat(16.0), 0.0)), false);
        let shadowed = floor_scene(Some(Light::point(Vec3::new(0.0, 4.0, 0.0), Color::splat(16.0), 0.0)), true);
        let rec = HitRecord {
            p: Vec3::ZERO,
            normal: Vec3::Y,
            face_normal: Vec3::Y,
            t: 1.0,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(3);
        let direct = sample_direct_light(&lit, &rec, &mut rng);
        assert!((direct - Color::ONE).abs().max_element() < 1e-4);
        assert_eq!(sample_direct_light(&shadowed, &rec, &mut rng), Color::ZERO);
    }

    #[test]
    fn test_lit_floor_is_bright_and_finite() {
        let world = floor_scene(Some(Light::point(Vec3::new(0.0, 4.0, 0.0), Color::splat(16.0), 0.0)), false);
        let mut rng = StdRng::seed_from_u64(4);
        let ray = Ray::new(Vec3::new(0.0, 1.0, 1.0), Vec3::new(0.0, -1.0, -1.0));
        let mut sum = Color::ZERO;
        for _ in 0..200 {
            let c = ray_color(&ray, &world, &IntegratorSettings::default(), &mut rng);
            assert!(c.is_finite());
            assert!(c.min_element() >= 0.0);
            sum += c;
        }
        assert!(sum.x / 200.0 > 0.1);
    }

    #[test]
    fn test_normal_map_tilts_first_hit_normal() {
        let tilt = Texture::new(1, 1, vec![[1.0, 0.5, 1.0, 1.0]]).unwrap();
        let mut scene = Scene::new();
        let bumpy = scene.add_material(Principled::diffuse(Color::ONE).with_normal_map(Arc::new(tilt), 1.0));
        scene.add_primitive(Sphere::new(Vec3::new(0.0, -1000.0, 0.0), 1000.0, bumpy));
        let world = scene.build(BvhBuildOptions::sequential()).unwrap();

        let mut rng = StdRng::seed_from_u64(6);
        let ray = Ray::new(Vec3::new(0.0, 1.0, 0.0), -Vec3::Y);
        let normal = trace_path(&ray, &world, &IntegratorSettings::default(), &mut rng).normal.unwrap();
        assert!((normal.length() - 1.0).abs() < 1e-4);
        assert!((normal.dot(Vec3::Y) - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-3);
    }

    #[test]
    fn test_depth_limit_stops_after_first_bounce() {
        let world = floor_scene(None, false);
        let settings = IntegratorSettings {
            max_depth: 1,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(5);
        // Background is black and nothing emits
        let ray = Ray::new(Vec3::new(0.0, 1.0, 0.0), -Vec3::Y);
        assert_eq!(ray_color(&ray, &world, &settings, &mut rng), Color::ZERO);
    }

    #[test]
    fn test_roulette_probabilities() {
        let roulette = RouletteSettings::default();
        assert_eq!(roulette.distance_probability(0.005, 0.0), None);
        assert_eq!(roulette.distance_probability(2.0, 0.0), Some(0.95));
        // Threshold grows with distance: 0.01 + 100 * 0.001
        assert_eq!(roulette.distance_probability(0.1, 100.0), None);
        assert_eq!(roulette.material_probability(MaterialKind::Dielectric, 0.1), 0.8);
        assert_eq!(roulette.material_probability(MaterialKind::Metal, 2.0), 0.97);
        assert_eq!(roulette.material_probability(MaterialKind::Principled, 0.5), 0.5);
        assert_eq!(russian_roulette(Color::ONE, 0.5, 0.7), None);
        assert_eq!(russian_roulette(Color::ONE, 0.5, 0.2), Some(Color::splat(2.0)));
        assert_eq!(russian_roulette(Color::ONE, 0.0, 0.0), None);
    }

    #[test]
    fn test_depth_limits() {
        let limits = DepthLimits::default();
        assert_eq!(limits.max_depth(), 20);
        assert_eq!(limits.limit(MaterialKind::Dielectric), 15);
        assert_eq!(limits.limit(MaterialKind::Metal), 6);
    }
}
