//! Principled BSDF.
//!
//! Burley diffuse with a subsurface approximation, a GGX specular lobe blended
//! by metallic, and an optional clearcoat lobe. One lobe is chosen per bounce
//! and its weight divided by the selection probability.
//!
//! Every texture lookup goes through the material's [`TextureTransform`]. A
//! normal map, when bound, tilts the shading normal before any lobe is sampled.

use super::occlusion::{ambient_occlusion, AO_RADIUS};
use super::{Color, MaterialProperty, ScatterContext, ScatterResult, TextureTransform};
use crate::hittable::HitRecord;
use crate::microfacet::{
    fresnel_schlick, lerp, lerp3, luminance, sample_anisotropic_ggx_reflection, sample_ggx_reflection,
    schlick_weight,
};
use crate::sampling::{random_cosine_direction, Onb};
use prism_core::TextureSampler;
use prism_math::{normalize_or, Ray, Vec3};
use rand::{Rng, RngCore};
use std::sync::Arc;

/// Offset applied to rays that pass through transparent texels.
const PASS_THROUGH_OFFSET: f32 = 1e-4;

#[derive(Debug, Clone)]
pub struct Principled {
    /// Albedo for dielectrics, reflectance for metals
    pub base_color: MaterialProperty,

    /// 0 = dielectric, 1 = metal (first channel)
    pub metallic: MaterialProperty,

    /// 0 = mirror-like, 1 = fully rough (first channel)
    pub roughness: MaterialProperty,

    /// Reflectance at normal incidence for the dielectric part, `0.08 * specular`
    pub specular: f32,

    /// Stretch of the specular lobe along `anisotropic_direction`, 0 = round
    pub anisotropic: f32,
    pub anisotropic_direction: Vec3,

    pub clearcoat: f32,
    pub clearcoat_roughness: f32,

    /// Blend from Burley diffuse toward the subsurface approximation
    pub subsurface: f32,
    pub subsurface_color: Color,

    /// Coverage; combined with the base texture's alpha
    pub opacity: MaterialProperty,

    pub emission: MaterialProperty,

    /// Tangent-space normal map, decoded as `2 * color - 1`
    pub normal_map: Option<MaterialProperty>,
    /// Scales the map's tangential tilt; 0 leaves the geometric normal
    pub normal_strength: f32,

    pub texture_transform: TextureTransform,

    /// Darken scattering by short-range hemisphere probes
    pub ambient_occlusion: bool,
}

impl Default for Principled {
    fn default() -> Self {
        Self {
            base_color: MaterialProperty::new(Color::splat(0.8)),
            metallic: MaterialProperty::scalar(0.0),
            roughness: MaterialProperty::scalar(0.5),
            specular: 0.5,
            anisotropic: 0.0,
            anisotropic_direction: Vec3::X,
            clearcoat: 0.0,
            clearcoat_roughness: 0.1,
            subsurface: 0.0,
            subsurface_color: Color::ONE,
            opacity: MaterialProperty::scalar(1.0),
            emission: MaterialProperty::default(),
            normal_map: None,
            normal_strength: 1.0,
            texture_transform: TextureTransform::default(),
            ambient_occlusion: true,
        }
    }
}

impl Principled {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fully rough, non-metallic surface.
    pub fn diffuse(color: Color) -> Self {
        Self {
            base_color: MaterialProperty::new(color),
            roughness: MaterialProperty::scalar(1.0),
            specular: 0.0,
            ..Default::default()
        }
    }

    pub fn plastic(color: Color, roughness: f32) -> Self {
        Self::default()
            .with_base_color(color)
            .with_roughness(roughness)
    }

    pub fn with_base_color(mut self, color: Color) -> Self {
        self.base_color = MaterialProperty::new(color);
        self
    }

    pub fn with_base_texture(mut self, texture: Arc<dyn TextureSampler>) -> Self {
        self.base_color = MaterialProperty::textured(texture);
        self
    }

    pub fn with_metallic(mut self, metallic: f32) -> Self {
        self.metallic = MaterialProperty::scalar(metallic.clamp(0.0, 1.0));
        self
    }

    pub fn with_roughness(mut self, roughness: f32) -> Self {
        self.roughness = MaterialProperty::scalar(roughness.clamp(0.0, 1.0));
        self
    }

    pub fn with_specular(mut self, specular: f32) -> Self {
        self.specular = specular.clamp(0.0, 1.0);
        self
    }

    /// Stretch the specular lobe along `direction`, projected onto the surface.
    pub fn with_anisotropic(mut self, amount: f32, direction: Vec3) -> Self {
        self.anisotropic = amount.clamp(0.0, 1.0);
        self.anisotropic_direction = direction;
        self
    }

    pub fn with_clearcoat(mut self, amount: f32, roughness: f32) -> Self {
        self.clearcoat = amount.clamp(0.0, 1.0);
        self.clearcoat_roughness = roughness.clamp(0.0, 1.0);
        self
    }

    pub fn with_subsurface(mut self, amount: f32, color: Color) -> Self {
        self.subsurface = amount.clamp(0.0, 1.0);
        self.subsurface_color = color;
        self
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = MaterialProperty::scalar(opacity.clamp(0.0, 1.0));
        self
    }

    pub fn with_emission(mut self, color: Color, strength: f32) -> Self {
        self.emission = MaterialProperty::new(color).with_intensity(strength);
        self
    }

    pub fn with_normal_map(mut self, texture: Arc<dyn TextureSampler>, strength: f32) -> Self {
        self.normal_map = Some(MaterialProperty::textured(texture));
        self.normal_strength = strength.max(0.0);
        self
    }

    pub fn with_texture_transform(mut self, transform: TextureTransform) -> Self {
        self.texture_transform = transform;
        self
    }

    pub fn with_ambient_occlusion(mut self, enabled: bool) -> Self {
        self.ambient_occlusion = enabled;
        self
    }

    /// IOR implied by the specular reflectance, `F0 = ((n - 1) / (n + 1))^2`.
    pub fn index_of_refraction(&self) -> f32 {
        let sqrt_f0 = (0.08 * self.specular).sqrt().min(0.99);
        (1.0 + sqrt_f0) / (1.0 - sqrt_f0)
    }

    pub fn emission_at(&self, u: f32, v: f32) -> Color {
        let (u, v) = self.texture_transform.apply(u, v);
        self.emission.evaluate(u, v)
    }

    /// `n` tilted by the normal map at `(u, v)`, or `n` itself without one.
    pub fn shading_normal(&self, n: Vec3, u: f32, v: f32) -> Vec3 {
        let Some(map) = &self.normal_map else {
            return n;
        };
        let (u, v) = self.texture_transform.apply(u, v);
        let m = 2.0 * map.evaluate(u, v) - Color::ONE;
        let tangent_space = Vec3::new(
            m.x * self.normal_strength,
            m.y * self.normal_strength,
            m.z.max(1e-3),
        );
        normalize_or(Onb::from_w(n).local(tangent_space), n)
    }

    fn coverage(&self, u: f32, v: f32) -> f32 {
        let texture_alpha = self
            .base_color
            .texture
            .as_ref()
            .map_or(1.0, |t| t.get_alpha(u, v));
        (self.opacity.alpha(u, v) * texture_alpha).clamp(0.0, 1.0)
    }

    pub(super) fn scatter(
        &self,
        ray_in: &Ray,
        rec: &HitRecord,
        ctx: &ScatterContext<'_>,
        rng: &mut dyn RngCore,
    ) -> Option<ScatterResult> {
        let (u, v) = self.texture_transform.apply(rec.u, rec.v);
        let n = rec.normal;

        let coverage = self.coverage(u, v);
        if coverage < 1.0 && rng.gen::<f32>() >= coverage {
            let dir = ray_in.direction();
            let origin = rec.p + normalize_or(dir, -n) * PASS_THROUGH_OFFSET;
            return Some(ScatterResult::new(Color::ONE, Ray::new(origin, dir)));
        }

        let wo = normalize_or(-ray_in.direction(), n);
        let n_dot_v = n.dot(wo).max(1e-4);
        let base = self.base_color.evaluate(u, v);
        let metallic = self.metallic.evaluate_scalar(u, v).clamp(0.0, 1.0);
        let roughness = self.roughness.evaluate_scalar(u, v).clamp(0.0, 1.0);

        let f0 = lerp3(Color::splat(0.08 * self.specular), base, metallic);
        let f_view = fresnel_schlick(n_dot_v, f0);

        let p_coat = (0.25 * self.clearcoat).min(0.5);
        let p_spec = (metallic + (1.0 - metallic) * luminance(f_view)).clamp(0.05, 1.0);

        let pick: f32 = rng.gen();
        let (direction, weight) = if pick < p_coat {
            let (wi, w) = sample_ggx_reflection(
                wo,
                n,
                self.clearcoat_roughness,
                Color::splat(0.04),
                rng.gen(),
                rng.gen(),
            )?;
            (wi, w * (0.25 * self.clearcoat / p_coat))
        } else if rng.gen::<f32>() < p_spec {
            let (wi, w) = if self.anisotropic > 0.0 {
                let frame = Onb::from_tangent(n, self.anisotropic_direction);
                sample_anisotropic_ggx_reflection(
                    wo,
                    &frame,
                    roughness,
                    self.anisotropic,
                    f0,
                    rng.gen(),
                    rng.gen(),
                )?
            } else {
                sample_ggx_reflection(wo, n, roughness, f0, rng.gen(), rng.gen())?
            };
            (wi, w / (p_spec * (1.0 - p_coat)))
        } else {
            let wi = normalize_or(random_cosine_direction(n, rng), n);
            let shape = self.diffuse_shape(wo, wi, n, n_dot_v, roughness);
            let tint = lerp3(base, base * self.subsurface_color, self.subsurface);
            let w = tint * (Color::ONE - f_view) * ((1.0 - metallic) * shape)
                / ((1.0 - p_spec) * (1.0 - p_coat));
            (wi, w)
        };

        let occlusion = if self.ambient_occlusion {
            ambient_occlusion(ctx.world, rec.p, n, ctx.ambient_occlusion_samples, AO_RADIUS, rng)
        } else {
            1.0
        };

        Some(ScatterResult::new(
            weight.max(Color::ZERO) * occlusion,
            Ray::new(rec.p, direction),
        ))
    }

    /// Burley retro-reflection blended toward the Hanrahan-Krueger style
    /// subsurface term. Equals 1 for a rough surface viewed head on.
    fn diffuse_shape(&self, wo: Vec3, wi: Vec3, n: Vec3, n_dot_v: f32, roughness: f32) -> f32 {
        let n_dot_l = n.dot(wi).max(1e-4);
        let h = normalize_or(wo + wi, n);
        let l_dot_h = wi.dot(h).clamp(0.0, 1.0);

        let fl = schlick_weight(n_dot_l);
        let fv = schlick_weight(n_dot_v);

        let fd90 = 0.5 + 2.0 * roughness * l_dot_h * l_dot_h;
        let fd = lerp(1.0, fd90, fl) * lerp(1.0, fd90, fv);
        if self.subsurface <= 0.0 {
            return fd;
        }

        let fss90 = roughness * l_dot_h * l_dot_h;
        let fss = lerp(1.0, fss90, fl) * lerp(1.0, fss90, fv);
        let ss = 1.25 * (fss * (1.0 / (n_dot_l + n_dot_v) - 0.5) + 0.5);
        lerp(fd, ss, self.subsurface)
    }
}
