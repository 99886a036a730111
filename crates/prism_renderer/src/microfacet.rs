//! Microfacet and Fresnel terms shared by the metal and principled BSDFs.

use crate::material::Color;
use crate::sampling::Onb;
use prism_math::Vec3;
use std::f32::consts::PI;

/// Roughness floor for sampling; below this GGX degenerates to a delta.
pub const MIN_ROUGHNESS: f32 = 0.02;

/// Rec. 709 luminance.
#[inline]
pub fn luminance(c: Color) -> f32 {
    0.2126 * c.x + 0.7152 * c.y + 0.0722 * c.z
}

#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + t.clamp(0.0, 1.0) * (b - a)
}

#[inline]
pub fn lerp3(a: Color, b: Color, t: f32) -> Color {
    a + t.clamp(0.0, 1.0) * (b - a)
}

/// `(1 - cos_theta)^5`
#[inline]
pub fn schlick_weight(cos_theta: f32) -> f32 {
    let x = (1.0 - cos_theta).clamp(0.0, 1.0);
    let x2 = x * x;
    x2 * x2 * x
}

/// Schlick Fresnel with a per-channel reflectance at normal incidence.
#[inline]
pub fn fresnel_schlick(cos_theta: f32, f0: Color) -> Color {
    f0 + (Color::ONE - f0) * schlick_weight(cos_theta)
}

/// Unpolarized Fresnel reflectance at a dielectric boundary.
///
/// `cos_i` is the cosine between the incident direction and the normal on the
/// incident side, `eta` is `n_incident / n_transmitted`. Total internal
/// reflection returns 1.
pub fn fresnel_dielectric(cos_i: f32, eta: f32) -> f32 {
    let cos_i = cos_i.clamp(0.0, 1.0);
    let sin2_t = eta * eta * (1.0 - cos_i * cos_i);
    if sin2_t >= 1.0 {
        return 1.0;
    }
    let cos_t = (1.0 - sin2_t).sqrt();
    let r_ortho = (eta * cos_i - cos_t) / (eta * cos_i + cos_t);
    let r_para = (cos_i - eta * cos_t) / (cos_i + eta * cos_t);
    (0.5 * (r_ortho * r_ortho + r_para * r_para)).clamp(0.0, 1.0)
}

/// Schlick-GGX shadowing for one direction.
#[inline]
pub fn geometry_schlick_ggx(n_dot_x: f32, k: f32) -> f32 {
    let n_dot_x = n_dot_x.clamp(0.0, 1.0);
    n_dot_x / (n_dot_x * (1.0 - k) + k).max(1e-7)
}

/// Smith shadowing-masking combining view and light directions.
#[inline]
pub fn geometry_smith(n_dot_v: f32, n_dot_l: f32, k: f32) -> f32 {
    geometry_schlick_ggx(n_dot_v, k) * geometry_schlick_ggx(n_dot_l, k)
}

/// Remapped roughness for direct lighting, `(r + 1)^2 / 8`.
#[inline]
pub fn k_direct(roughness: f32) -> f32 {
    let r = roughness + 1.0;
    r * r / 8.0
}

/// Importance sample a GGX half vector around `n` from two uniform numbers.
pub fn importance_sample_ggx(u1: f32, u2: f32, roughness: f32, n: Vec3) -> Vec3 {
    let a = roughness * roughness;
    let phi = 2.0 * PI * u1;
    let cos_theta = ((1.0 - u2) / (1.0 + (a * a - 1.0) * u2).max(1e-7))
        .clamp(0.0, 1.0)
        .sqrt();
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    let local = Vec3::new(sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta);
    Onb::from_w(n).local(local)
}

/// Roughness pair `(alpha_u, alpha_v)` for an anisotropy in `[0, 1]`,
/// stretching the lobe along the tangent.
pub fn anisotropic_alphas(roughness: f32, anisotropic: f32) -> (f32, f32) {
    let aspect = (1.0 - 0.9 * anisotropic.clamp(0.0, 1.0)).sqrt();
    let alpha = roughness * roughness;
    ((alpha / aspect).min(1.0), (alpha * aspect).max(1e-4))
}

/// Importance sample an anisotropic GGX half vector in `frame`.
/// Equal alphas reduce to [`importance_sample_ggx`].
pub fn importance_sample_anisotropic_ggx(u1: f32, u2: f32, alpha_u: f32, alpha_v: f32, frame: &Onb) -> Vec3 {
    let turn = 2.0 * PI * u1;
    let phi = (alpha_v * turn.sin()).atan2(alpha_u * turn.cos());
    let (sin_phi, cos_phi) = phi.sin_cos();
    let inv_alpha2 = (cos_phi / alpha_u).powi(2) + (sin_phi / alpha_v).powi(2);
    let u2 = u2.clamp(0.0, 1.0 - 1e-6);
    let tan2_theta = u2 / ((1.0 - u2) * inv_alpha2.max(1e-7));
    let cos_theta = 1.0 / (1.0 + tan2_theta).sqrt();
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    frame.local(Vec3::new(sin_theta * cos_phi, sin_theta * sin_phi, cos_theta))
}

/// Importance-sampled GGX reflection about `n` for the view direction `wo`.
///
/// Returns the reflected direction and the estimator weight
/// `F G (v.h) / ((n.v)(n.h))`, or `None` when the sample lands below the surface.
pub fn sample_ggx_reflection(wo: Vec3, n: Vec3, roughness: f32, f0: Color, u1: f32, u2: f32) -> Option<(Vec3, Color)> {
    let roughness = roughness.clamp(MIN_ROUGHNESS, 1.0);
    let h = importance_sample_ggx(u1, u2, roughness, n);
    reflect_about_half(wo, n, h, roughness, f0)
}

/// [`sample_ggx_reflection`] with the lobe stretched along `frame.u`.
pub fn sample_anisotropic_ggx_reflection(
    wo: Vec3,
    frame: &Onb,
    roughness: f32,
    anisotropic: f32,
    f0: Color,
    u1: f32,
    u2: f32,
) -> Option<(Vec3, Color)> {
    let roughness = roughness.clamp(MIN_ROUGHNESS, 1.0);
    let (alpha_u, alpha_v) = anisotropic_alphas(roughness, anisotropic);
    let h = importance_sample_anisotropic_ggx(u1, u2, alpha_u, alpha_v, frame);
    reflect_about_half(wo, frame.w, h, roughness, f0)
}

fn reflect_about_half(wo: Vec3, n: Vec3, h: Vec3, roughness: f32, f0: Color) -> Option<(Vec3, Color)> {
    let v_dot_h = wo.dot(h);
    if v_dot_h <= 0.0 {
        return None;
    }
    let wi = 2.0 * v_dot_h * h - wo;
    let n_dot_l = n.dot(wi);
    if n_dot_l <= 0.0 {
        return None;
    }
    let n_dot_v = n.dot(wo).max(1e-4);
    let n_dot_h = n.dot(h).max(1e-4);
    let fresnel = fresnel_schlick(v_dot_h, f0);
    let g = geometry_smith(n_dot_v, n_dot_l, k_direct(roughness));
    let weight = (fresnel * (g * v_dot_h / (n_dot_v * n_dot_h))).min(Color::ONE);
    Some((wi.normalize_or_zero(), weight))
}
