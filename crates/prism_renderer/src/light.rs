//! Scene lights and per-shading-point light sampling.

use crate::material::Color;
use crate::sampling::{random_in_unit_disk, random_in_unit_sphere, Onb};
use prism_math::{normalize_or, Vec3};
use rand::{Rng, RngCore};

/// Distance used for shadow rays toward directional lights.
pub const DIRECTIONAL_LIGHT_DISTANCE: f32 = 1000.0;

/// Stratified samples per area light per shading point (4x4 grid).
pub const AREA_LIGHT_SAMPLES: usize = 16;
const AREA_LIGHT_GRID: usize = 4;

/// Exponent of the cosine falloff inside a spot cone.
const SPOT_FALLOFF_EXPONENT: i32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightKind {
    Directional,
    Point,
    Spot,
    Area,
}

/// One light sample as seen from a shading point.
#[derive(Debug, Clone, Copy)]
pub struct LightSample {
    /// Unit direction from the shading point toward the sampled light point
    pub to_light: Vec3,
    /// Shadow ray length
    pub distance: f32,
    /// Incident radiance before the cosine term and visibility
    pub radiance: Color,
}

#[derive(Debug, Clone)]
pub enum Light {
    /// Infinitely distant light travelling along `direction`, softened by
    /// jittering over a disk of `radius` perpendicular to it.
    Directional {
        direction: Vec3,
        intensity: Color,
        radius: f32,
    },
    /// Spherical light of `radius` with inverse-square falloff.
    Point {
        position: Vec3,
        intensity: Color,
        radius: f32,
    },
    /// Point light restricted to a cone of half-angle `angle` (radians)
    /// around `direction`.
    Spot {
        position: Vec3,
        direction: Vec3,
        intensity: Color,
        angle: f32,
        radius: f32,
    },
    /// Rectangle spanned by `u * width` and `v * height` from `corner`.
    Area {
        corner: Vec3,
        u: Vec3,
        v: Vec3,
        width: f32,
        height: f32,
        intensity: Color,
    },
}

impl Light {
    pub fn directional(direction: Vec3, intensity: Color, radius: f32) -> Self {
        Light::Directional {
            direction: normalize_or(direction, -Vec3::Y),
            intensity,
            radius: radius.max(0.0),
        }
    }

    pub fn point(position: Vec3, intensity: Color, radius: f32) -> Self {
        Light::Point {
            position,
            intensity,
            radius: radius.max(0.0),
        }
    }

    /// `angle_degrees` is the cone half-angle.
    pub fn spot(position: Vec3, direction: Vec3, intensity: Color, angle_degrees: f32, radius: f32) -> Self {
        Light::Spot {
            position,
            direction: normalize_or(direction, -Vec3::Y),
            intensity,
            angle: angle_degrees.clamp(0.0, 180.0).to_radians(),
            radius: radius.max(0.0),
        }
    }

    pub fn area(corner: Vec3, u: Vec3, v: Vec3, width: f32, height: f32, intensity: Color) -> Self {
        Light::Area {
            corner,
            u: normalize_or(u, Vec3::X),
            v: normalize_or(v, Vec3::Z),
            width: width.max(0.0),
            height: height.max(0.0),
            intensity,
        }
    }

    pub fn kind(&self) -> LightKind {
        match self {
            Light::Directional { .. } => LightKind::Directional,
            Light::Point { .. } => LightKind::Point,
            Light::Spot { .. } => LightKind::Spot,
            Light::Area { .. } => LightKind::Area,
        }
    }

    /// Unit direction from `point` toward the light's center.
    pub fn direction(&self, point: Vec3) -> Vec3 {
        match self {
            Light::Directional { direction, .. } => -*direction,
            Light::Point { position, .. } | Light::Spot { position, .. } => {
                normalize_or(*position - point, Vec3::Y)
            }
            Light::Area { .. } => normalize_or(self.center() - point, Vec3::Y),
        }
    }

    /// Unshadowed radiance arriving at `point` from the light's center.
    pub fn intensity(&self, point: Vec3) -> Color {
        match self {
            Light::Directional { intensity, .. } => *intensity,
            Light::Point { position, intensity, .. } => {
                *intensity / position.distance_squared(point).max(1e-8)
            }
            Light::Spot { position, .. } => {
                let to_light = *position - point;
                let distance = to_light.length();
                self.spot_radiance(normalize_or(to_light, Vec3::Y), distance)
            }
            Light::Area { intensity, .. } => {
                *intensity / self.center().distance_squared(point).max(1e-8)
            }
        }
    }

    /// Uniform point on the light's emitting shape. For directional lights
    /// this is a point on the jitter disk placed far along the light.
    pub fn random_point(&self, rng: &mut dyn RngCore) -> Vec3 {
        match self {
            Light::Directional { direction, radius, .. } => {
                let disk = Onb::from_w(*direction).local(random_in_unit_disk(rng)) * *radius;
                -*direction * DIRECTIONAL_LIGHT_DISTANCE + disk
            }
            Light::Point { position, radius, .. } | Light::Spot { position, radius, .. } => {
                *position + random_in_unit_sphere(rng) * *radius
            }
            Light::Area { corner, u, v, width, height, .. } => {
                *corner + *u * (rng.gen::<f32>() * *width) + *v * (rng.gen::<f32>() * *height)
            }
        }
    }

    /// Number of shadow samples taken per shading point.
    pub fn sample_count(&self) -> usize {
        match self {
            Light::Area { .. } => AREA_LIGHT_SAMPLES,
            _ => 1,
        }
    }

    /// Sample the light from `point`. `stratum` selects the grid cell for
    /// area lights and is ignored otherwise.
    pub fn sample(&self, point: Vec3, stratum: usize, rng: &mut dyn RngCore) -> LightSample {
        match self {
            Light::Directional { intensity, .. } => LightSample {
                to_light: normalize_or(self.random_point(rng), Vec3::Y),
                distance: DIRECTIONAL_LIGHT_DISTANCE,
                radiance: *intensity,
            },
            Light::Point { intensity, .. } => {
                let (to_light, distance) = Self::toward(self.random_point(rng), point);
                LightSample {
                    to_light,
                    distance,
                    radiance: *intensity / (distance * distance).max(1e-8),
                }
            }
            Light::Spot { .. } => {
                let (to_light, distance) = Self::toward(self.random_point(rng), point);
                LightSample {
                    to_light,
                    distance,
                    radiance: self.spot_radiance(to_light, distance),
                }
            }
            Light::Area { corner, u, v, width, height, intensity } => {
                let cell = stratum % AREA_LIGHT_SAMPLES;
                let su = ((cell % AREA_LIGHT_GRID) as f32 + rng.gen::<f32>()) / AREA_LIGHT_GRID as f32;
                let sv = ((cell / AREA_LIGHT_GRID) as f32 + rng.gen::<f32>()) / AREA_LIGHT_GRID as f32;
                let target = *corner + *u * (su * *width) + *v * (sv * *height);
                let (to_light, distance) = Self::toward(target, point);
                LightSample {
                    to_light,
                    distance,
                    radiance: *intensity / (distance * distance).max(1e-8),
                }
            }
        }
    }

    fn toward(target: Vec3, point: Vec3) -> (Vec3, f32) {
        let delta = target - point;
        (normalize_or(delta, Vec3::Y), delta.length())
    }

    fn center(&self) -> Vec3 {
        match self {
            Light::Area { corner, u, v, width, height, .. } => {
                *corner + *u * (0.5 * *width) + *v * (0.5 * *height)
            }
            Light::Point { position, .. } | Light::Spot { position, .. } => *position,
            Light::Directional { direction, .. } => -*direction * DIRECTIONAL_LIGHT_DISTANCE,
        }
    }

    fn spot_radiance(&self, to_light: Vec3, distance: f32) -> Color {
        let Light::Spot { direction, intensity, angle, .. } = self else {
            return Color::ZERO;
        };
        let cos_theta = (-to_light).dot(*direction);
        if cos_theta <= angle.cos() {
            return Color::ZERO;
        }
        *intensity * cos_theta.powi(SPOT_FALLOFF_EXPONENT) / (distance * distance).max(1e-8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_point_light_inverse_square() {
        let light = Light::point(Vec3::new(0.0, 4.0, 0.0), Color::splat(16.0), 0.0);
        let mut rng = StdRng::seed_from_u64(1);
        let s = light.sample(Vec3::ZERO, 0, &mut rng);
        assert!((s.to_light - Vec3::Y).length() < 1e-6);
        assert!((s.distance - 4.0).abs() < 1e-6);
        assert!((s.radiance - Color::ONE).abs().max_element() < 1e-6);
        assert_eq!(light.intensity(Vec3::ZERO), Color::ONE);
        assert_eq!(light.direction(Vec3::ZERO), Vec3::Y);
        assert_eq!(light.kind(), LightKind::Point);
    }

    #[test]
    fn test_directional_light_far_and_jittered() {
        let light = Light::directional(Vec3::new(0.0, -1.0, 0.0), Color::ONE, 50.0);
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..100 {
            let s = light.sample(Vec3::ZERO, 0, &mut rng);
            assert_eq!(s.distance, DIRECTIONAL_LIGHT_DISTANCE);
            assert!((s.to_light.length() - 1.0).abs() < 1e-5);
            // Disk radius 50 at distance 1000 stays within ~3 degrees
            assert!(s.to_light.y > 0.998);
            assert_eq!(s.radiance, Color::ONE);
        }
        assert_eq!(light.direction(Vec3::ZERO), Vec3::Y);
    }

    #[test]
    fn test_spot_cone() {
        let light = Light::spot(Vec3::new(0.0, 2.0, 0.0), -Vec3::Y, Color::splat(4.0), 30.0, 0.0);
        let mut rng = StdRng::seed_from_u64(3);
        let inside = light.sample(Vec3::ZERO, 0, &mut rng);
        assert!((inside.radiance - Color::ONE).abs().max_element() < 1e-5);
        // 45 degrees off axis is outside a 30 degree half-angle
        let outside = light.sample(Vec3::new(2.0, 0.0, 0.0), 0, &mut rng);
        assert_eq!(outside.radiance, Color::ZERO);
        let edge = light.intensity(Vec3::new(0.5, 0.0, 0.0));
        assert!(edge.x > 0.0 && edge.x < 1.0);
    }

    #[test]
    fn test_area_light_strata_cover_rectangle() {
        let light = Light::area(Vec3::new(-1.0, 3.0, -1.0), Vec3::X, Vec3::Z, 2.0, 2.0, Color::splat(9.0));
        assert_eq!(light.sample_count(), AREA_LIGHT_SAMPLES);
        let mut rng = StdRng::seed_from_u64(4);
        let point = Vec3::ZERO;
        let mut quadrants = [0usize; 4];
        for stratum in 0..AREA_LIGHT_SAMPLES {
            let s = light.sample(point, stratum, &mut rng);
            let hit = point + s.to_light * s.distance;
            assert!((hit.y - 3.0).abs() < 1e-4);
            assert!(hit.x >= -1.0 - 1e-4 && hit.x <= 1.0 + 1e-4);
            assert!(hit.z >= -1.0 - 1e-4 && hit.z <= 1.0 + 1e-4);
            let q = (hit.x > 0.0) as usize + 2 * (hit.z > 0.0) as usize;
            quadrants[q] += 1;
        }
        // 4x4 strata put exactly four samples in each quadrant
        assert_eq!(quadrants, [4, 4, 4, 4]);
        assert!((light.intensity(point) - Color::ONE).abs().max_element() < 1e-5);
    }

    #[test]
    fn test_random_point_within_radius() {
        let light = Light::point(Vec3::new(1.0, 2.0, 3.0), Color::ONE, 0.5);
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..100 {
            assert!(light.random_point(&mut rng).distance(Vec3::new(1.0, 2.0, 3.0)) <= 0.5);
        }
    }
}
