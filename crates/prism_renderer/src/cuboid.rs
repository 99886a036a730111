//! Box primitive. Stored as a unit cube plus an affine transform, so rotated
//! and non-uniformly scaled boxes intersect exactly.

use crate::hittable::{HitRecord, Hittable, MaterialId};
use prism_math::{Aabb, Interval, Mat4, Mat4Ext, Ray, Vec3};

const MIN_SIZE: f32 = 1e-6;

#[derive(Debug, Clone, PartialEq)]
pub struct Cuboid {
    to_world: Mat4,
    to_local: Mat4,
    material: MaterialId,
    bbox: Aabb,
}

impl Cuboid {
    /// Axis-aligned box centered at `center` with full extents `size`.
    pub fn new(center: Vec3, size: Vec3, material: MaterialId) -> Self {
        let size = size.abs().max(Vec3::splat(MIN_SIZE));
        Self::from_matrix(Mat4::from_scale_rotation_translation(size, Default::default(), center), material)
    }

    fn from_matrix(to_world: Mat4, material: MaterialId) -> Self {
        let unit = Aabb::from_points(Vec3::splat(-0.5), Vec3::splat(0.5));
        Self {
            to_world,
            to_local: to_world.inverse(),
            material,
            bbox: to_world.transform_aabb(&unit),
        }
    }

    pub fn center(&self) -> Vec3 {
        self.to_world.transform_point3(Vec3::ZERO)
    }

    pub fn material(&self) -> MaterialId {
        self.material
    }

    /// Compose `matrix` onto the current placement and recompute the bounding box.
    pub fn transform(&mut self, matrix: &Mat4) {
        let to_world = *matrix * self.to_world;
        if to_world.determinant().abs() <= f32::EPSILON {
            log::warn!("ignoring singular box transform");
            return;
        }
        *self = Self::from_matrix(to_world, self.material);
    }

    /// Planar UV on the face perpendicular to `axis`.
    fn face_uv(p: Vec3, axis: usize) -> (f32, f32) {
        let (a, b) = match axis {
            0 => (p.z, p.y),
            1 => (p.x, p.z),
            _ => (p.x, p.y),
        };
        ((a + 0.5).clamp(0.0, 1.0), (b + 0.5).clamp(0.0, 1.0))
    }
}

impl Hittable for Cuboid {
    fn hit(&self, ray: &Ray, ray_t: Interval, rec: &mut HitRecord) -> bool {
        let origin = self.to_local.transform_point3(ray.origin);
        let dir = self.to_local.transform_vector3(ray.direction);

        let inv = dir.recip();
        let t0 = (Vec3::splat(-0.5) - origin) * inv;
        let t1 = (Vec3::splat(0.5) - origin) * inv;
        let t_near = t0.min(t1).max_element();
        let t_far = t0.max(t1).min_element();
        if !(t_near <= t_far) {
            return false;
        }

        let root = if ray_t.surrounds(t_near) {
            t_near
        } else if ray_t.surrounds(t_far) {
            t_far
        } else {
            return false;
        };

        // Face is the dominant axis of the local hit point
        let local_p = origin + dir * root;
        let abs_p = local_p.abs();
        let axis = if abs_p.x >= abs_p.y && abs_p.x >= abs_p.z {
            0
        } else if abs_p.y >= abs_p.z {
            1
        } else {
            2
        };
        let mut local_n = Vec3::ZERO;
        local_n[axis] = 1.0f32.copysign(local_p[axis]);
        let outward = self.to_world.transform_normal(local_n);

        rec.t = root;
        rec.p = ray.at(root);
        rec.set_face_normal(ray, outward, outward);
        (rec.u, rec.v) = Self::face_uv(local_p, axis);
        rec.material = self.material;
        rec.smooth_group = 0;
        true
    }

    fn bounding_box(&self) -> Aabb {
        self.bbox
    }
}
