use super::occlusion::{ambient_occlusion, AO_RADIUS};
use super::{Color, MaterialProperty, ScatterContext, ScatterResult};
use crate::hittable::HitRecord;
use crate::microfacet::{lerp3, sample_ggx_reflection};
use prism_math::{normalize_or, Ray};
use rand::{Rng, RngCore};

/// Conductor with a GGX specular lobe only.
#[derive(Debug, Clone)]
pub struct Metal {
    pub albedo: MaterialProperty,
    pub roughness: f32,
    /// Blend of the reflectance at normal incidence from 0.04 toward `albedo`
    pub metallic: f32,
    pub ambient_occlusion: bool,
}

impl Metal {
    pub fn new(albedo: Color, roughness: f32) -> Self {
        Self {
            albedo: MaterialProperty::new(albedo),
            roughness: roughness.clamp(0.0, 1.0),
            metallic: 1.0,
            ambient_occlusion: true,
        }
    }

    pub fn with_albedo(mut self, albedo: MaterialProperty) -> Self {
        self.albedo = albedo;
        self
    }

    pub fn with_metallic(mut self, metallic: f32) -> Self {
        self.metallic = metallic.clamp(0.0, 1.0);
        self
    }

    pub fn with_ambient_occlusion(mut self, enabled: bool) -> Self {
        self.ambient_occlusion = enabled;
        self
    }

    pub(super) fn scatter(
        &self,
        ray_in: &Ray,
        rec: &HitRecord,
        ctx: &ScatterContext<'_>,
        rng: &mut dyn RngCore,
    ) -> Option<ScatterResult> {
        let n = rec.normal;
        let wo = normalize_or(-ray_in.direction(), n);
        let f0 = lerp3(Color::splat(0.04), self.albedo.evaluate(rec.u, rec.v), self.metallic);

        let (direction, weight) =
            sample_ggx_reflection(wo, n, self.roughness, f0, rng.gen(), rng.gen())?;

        let occlusion = if self.ambient_occlusion {
            ambient_occlusion(ctx.world, rec.p, n, ctx.ambient_occlusion_samples, AO_RADIUS, rng)
        } else {
            1.0
        };
        Some(ScatterResult::new(weight * occlusion, Ray::new(rec.p, direction)))
    }
}
