//! Un-accelerated primitive collection.
//!
//! A flat closest-hit scan. It serves as the reference the BVH must agree with
//! and as a cheap occluder set for small probe queries.

use crate::hittable::{HitRecord, Hittable};
use crate::primitive::Primitive;
use prism_math::{Aabb, Interval, Ray};

#[derive(Debug, Clone, Default)]
pub struct HittableList {
    objects: Vec<Primitive>,
    bbox: Aabb,
}

impl HittableList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_primitives(primitives: Vec<Primitive>) -> Self {
        let mut list = Self::new();
        for p in primitives {
            list.add(p);
        }
        list
    }

    pub fn add(&mut self, object: impl Into<Primitive>) {
        let object = object.into();
        self.bbox = Aabb::surrounding(&self.bbox, &object.bounding_box());
        self.objects.push(object);
    }

    pub fn clear(&mut self) {
        self.objects.clear();
        self.bbox = Aabb::EMPTY;
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn objects(&self) -> &[Primitive] {
        &self.objects
    }
}

impl Hittable for HittableList {
    fn hit(&self, ray: &Ray, ray_t: Interval, rec: &mut HitRecord) -> bool {
        let mut hit_anything = false;
        let mut closest_so_far = ray_t.max;

        for object in &self.objects {
            if object.hit(ray, ray_t.with_max(closest_so_far), rec) {
                hit_anything = true;
                closest_so_far = rec.t;
            }
        }

        hit_anything
    }

    fn bounding_box(&self) -> Aabb {
        self.bbox
    }
}
