use prism_math::{Aabb, Interval, Ray, Vec3};

/// Index of a material in the scene's material arena.
pub type MaterialId = usize;

/// Result of a successful ray-primitive intersection.
///
/// `normal` is the shading normal, flipped to face against the incoming ray.
/// `face_normal` is the geometric normal as authored (outward), so callers can
/// recover which side was hit from `front_face`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitRecord {
    pub p: Vec3,
    pub normal: Vec3,
    pub face_normal: Vec3,
    pub t: f32,
    pub u: f32,
    pub v: f32,
    pub front_face: bool,
    pub material: MaterialId,
    pub smooth_group: u32,
}

impl HitRecord {
    /// Orient the shading normal against the ray, using the geometric normal to
    /// decide which side was hit. Both normals must be unit length.
    pub fn set_face_normal(&mut self, r: &Ray, outward_normal: Vec3, shading_normal: Vec3) {
        self.front_face = r.direction.dot(outward_normal) < 0.0;
        self.face_normal = outward_normal;
        self.normal = if self.front_face {
            shading_normal
        } else {
            -shading_normal
        };
    }

    /// Shading normal on the side it was authored, regardless of hit side.
    pub fn outward_normal(&self) -> Vec3 {
        if self.front_face {
            self.normal
        } else {
            -self.normal
        }
    }
}

impl Default for HitRecord {
    fn default() -> Self {
        Self {
            p: Vec3::ZERO,
            normal: Vec3::Z,
            face_normal: Vec3::Z,
            t: f32::INFINITY,
            u: 0.0,
            v: 0.0,
            front_face: true,
            material: 0,
            smooth_group: 0,
        }
    }
}

/// Anything a ray can be tested against.
///
/// Implementations write `rec` only when they return `true`.
pub trait Hittable: Send + Sync {
    fn hit(&self, r: &Ray, ray_t: Interval, rec: &mut HitRecord) -> bool;

    fn bounding_box(&self) -> Aabb;
}
