//! Sphere primitive.

use crate::hittable::{HitRecord, Hittable, MaterialId};
use prism_math::{Aabb, Interval, Mat4, Ray, Vec3};
use std::f32::consts::PI;

#[derive(Debug, Clone, PartialEq)]
pub struct Sphere {
    center: Vec3,
    radius: f32,
    material: MaterialId,
    bbox: Aabb,
}

impl Sphere {
    pub fn new(center: Vec3, radius: f32, material: MaterialId) -> Self {
        let radius = radius.max(0.0);
        Self {
            center,
            radius,
            material,
            bbox: Self::compute_bbox(center, radius),
        }
    }

    fn compute_bbox(center: Vec3, radius: f32) -> Aabb {
        let rvec = Vec3::splat(radius);
        Aabb::from_points(center - rvec, center + rvec)
    }

    pub fn center(&self) -> Vec3 {
        self.center
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn material(&self) -> MaterialId {
        self.material
    }

    /// Move the center through `matrix` and scale the radius by its largest axis scale.
    pub fn transform(&mut self, matrix: &Mat4) {
        let scale = matrix
            .x_axis
            .truncate()
            .length()
            .max(matrix.y_axis.truncate().length())
            .max(matrix.z_axis.truncate().length());
        self.center = matrix.transform_point3(self.center);
        self.radius *= scale;
        self.bbox = Self::compute_bbox(self.center, self.radius);
    }

    /// `(u, v)` for a point on the unit sphere: `u` around +Y from -X, `v` from -Y up.
    fn sphere_uv(p: Vec3) -> (f32, f32) {
        let theta = (-p.y).clamp(-1.0, 1.0).acos();
        let phi = (-p.z).atan2(p.x) + PI;
        (phi / (2.0 * PI), theta / PI)
    }
}

impl Hittable for Sphere {
    fn hit(&self, ray: &Ray, ray_t: Interval, rec: &mut HitRecord) -> bool {
        if self.radius <= 0.0 {
            return false;
        }
        let oc = self.center - ray.origin;
        let a = ray.direction.length_squared();
        if a <= 0.0 {
            return false;
        }
        let h = ray.direction.dot(oc);
        let c = oc.length_squared() - self.radius * self.radius;

        let discriminant = h * h - a * c;
        if discriminant < 0.0 {
            return false;
        }
        let sqrtd = discriminant.sqrt();

        // Nearest root inside the open interval
        let mut root = (h - sqrtd) / a;
        if !ray_t.surrounds(root) {
            root = (h + sqrtd) / a;
            if !ray_t.surrounds(root) {
                return false;
            }
        }

        let p = ray.at(root);
        let outward_normal = (p - self.center) / self.radius;
        rec.t = root;
        rec.p = p;
        rec.set_face_normal(ray, outward_normal, outward_normal);
        (rec.u, rec.v) = Self::sphere_uv(outward_normal);
        rec.material = self.material;
        rec.smooth_group = 0;
        true
    }

    fn bounding_box(&self) -> Aabb {
        self.bbox
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sphere_hit_front() {
        let sphere = Sphere::new(Vec3::new(0.0, 0.0, -1.0), 0.5, 3);
        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0));
        let mut rec = HitRecord::default();

        assert!(sphere.hit(&ray, Interval::new(0.001, f32::INFINITY), &mut rec));
        assert!((rec.t - 0.5).abs() < 1e-5);
        assert!(rec.front_face);
        assert_eq!(rec.normal, Vec3::new(0.0, 0.0, 1.0));
        assert_eq!(rec.material, 3);
    }

    #[test]
    fn test_sphere_hit_from_inside_uses_far_root() {
        let sphere = Sphere::new(Vec3::ZERO, 2.0, 0);
        let ray = Ray::new(Vec3::ZERO, Vec3::X);
        let mut rec = HitRecord::default();

        assert!(sphere.hit(&ray, Interval::new(0.001, f32::INFINITY), &mut rec));
        assert!((rec.t - 2.0).abs() < 1e-5);
        assert!(!rec.front_face);
        assert_eq!(rec.normal, -Vec3::X);
    }

    #[test]
    fn test_sphere_miss_leaves_record_untouched() {
        let sphere = Sphere::new(Vec3::new(0.0, 0.0, -1.0), 0.5, 0);
        let ray = Ray::new(Vec3::ZERO, Vec3::Y);
        let mut rec = HitRecord::default();

        assert!(!sphere.hit(&ray, Interval::new(0.001, f32::INFINITY), &mut rec));
        assert_eq!(rec, HitRecord::default());
    }

    #[test]
    fn test_sphere_respects_interval() {
        let sphere = Sphere::new(Vec3::new(0.0, 0.0, -5.0), 1.0, 0);
        let ray = Ray::new(Vec3::ZERO, -Vec3::Z);
        let mut rec = HitRecord::default();
        assert!(!sphere.hit(&ray, Interval::new(0.001, 3.0), &mut rec));
    }

    #[test]
    fn test_sphere_bbox_and_transform() {
        let mut sphere = Sphere::new(Vec3::new(1.0, 2.0, 3.0), 0.5, 0);
        let bbox = sphere.bounding_box();
        assert_eq!(bbox.min(), Vec3::new(0.5, 1.5, 2.5));
        assert_eq!(bbox.max(), Vec3::new(1.5, 2.5, 3.5));

        sphere.transform(&Mat4::from_scale_rotation_translation(
            Vec3::splat(2.0),
            Default::default(),
            Vec3::new(0.0, 10.0, 0.0),
        ));
        assert_eq!(sphere.center(), Vec3::new(2.0, 14.0, 6.0));
        assert_eq!(sphere.radius(), 1.0);
        assert_eq!(sphere.bounding_box().min(), Vec3::new(1.0, 13.0, 5.0));
    }

    #[test]
    fn test_sphere_uv_range() {
        let (u, v) = Sphere::sphere_uv(Vec3::new(1.0, 0.0, 0.0));
        assert!((u - 0.5).abs() < 1e-5);
        assert!((v - 0.5).abs() < 1e-5);
        let (_, v) = Sphere::sphere_uv(Vec3::Y);
        assert!((v - 1.0).abs() < 1e-5);
    }
}
