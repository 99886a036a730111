//! Ambient occlusion probes used by the microfacet materials.

use crate::hittable::{HitRecord, Hittable};
use crate::sampling::random_in_hemisphere;
use prism_math::{Interval, Ray, Vec3};
use rand::RngCore;

pub const AO_SAMPLES: u32 = 16;
pub const AO_RADIUS: f32 = 0.5;
const AO_OFFSET: f32 = 1e-3;

/// Fraction of `samples` hemisphere probes around `n` that travel `radius`
/// without hitting anything. Returns 1 when `samples` is 0.
pub fn ambient_occlusion(
    world: &dyn Hittable,
    p: Vec3,
    n: Vec3,
    samples: u32,
    radius: f32,
    rng: &mut dyn RngCore,
) -> f32 {
    if samples == 0 {
        return 1.0;
    }
    let origin = p + n * AO_OFFSET;
    let mut rec = HitRecord::default();
    let unoccluded = (0..samples)
        .filter(|_| {
            let probe = Ray::new(origin, random_in_hemisphere(n, rng));
            !world.hit(&probe, Interval::new(AO_OFFSET, radius), &mut rec)
        })
        .count();
    unoccluded as f32 / samples as f32
}
