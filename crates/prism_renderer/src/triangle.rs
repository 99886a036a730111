//! Triangle primitive with per-vertex normals and texture coordinates.

use crate::hittable::{HitRecord, Hittable, MaterialId};
use prism_math::{normalize_or, Aabb, Interval, Mat4, Mat4Ext, Ray, Vec2, Vec3};

/// Interpolated normals deviating from the face normal by more than 60 degrees
/// are replaced by the face normal.
pub const SMOOTH_NORMAL_COS_THRESHOLD: f32 = 0.5;

const DETERMINANT_EPSILON_SCALE: f32 = 1e-6;
const MIN_DETERMINANT_EPSILON: f32 = 1e-9;
const MAX_DETERMINANT_EPSILON: f32 = 1e-4;
const BBOX_PADDING: f32 = 2e-6;

#[derive(Debug, Clone, PartialEq)]
pub struct Triangle {
    vertices: [Vec3; 3],
    normals: [Vec3; 3],
    uvs: [Vec2; 3],
    material: MaterialId,
    smooth_group: u32,
    bbox: Aabb,
}

impl Triangle {
    /// Flat triangle; every vertex normal is the face normal.
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3, material: MaterialId) -> Self {
        let face = normalize_or((v1 - v0).cross(v2 - v0), Vec3::Z);
        Self {
            vertices: [v0, v1, v2],
            normals: [face; 3],
            uvs: [Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0)],
            material,
            smooth_group: 0,
            bbox: Self::compute_bbox(&[v0, v1, v2]),
        }
    }

    pub fn with_normals(mut self, normals: [Vec3; 3]) -> Self {
        let face = self.face_normal();
        self.normals = normals.map(|n| normalize_or(n, face));
        self
    }

    pub fn with_uvs(mut self, uvs: [Vec2; 3]) -> Self {
        self.uvs = uvs;
        self
    }

    pub fn with_smooth_group(mut self, group: u32) -> Self {
        self.smooth_group = group;
        self
    }

    fn compute_bbox(vertices: &[Vec3; 3]) -> Aabb {
        Aabb::enclosing(vertices.iter().copied()).padded(BBOX_PADDING)
    }

    pub fn vertices(&self) -> &[Vec3; 3] {
        &self.vertices
    }

    pub fn material(&self) -> MaterialId {
        self.material
    }

    pub fn face_normal(&self) -> Vec3 {
        let [v0, v1, v2] = self.vertices;
        normalize_or((v1 - v0).cross(v2 - v0), Vec3::Z)
    }

    pub fn area(&self) -> f32 {
        let [v0, v1, v2] = self.vertices;
        0.5 * (v1 - v0).cross(v2 - v0).length()
    }

    /// Apply `matrix` to vertices and normals and recompute the bounding box.
    pub fn transform(&mut self, matrix: &Mat4) {
        self.vertices = self.vertices.map(|v| matrix.transform_point3(v));
        self.normals = self.normals.map(|n| matrix.transform_normal(n));
        self.bbox = Self::compute_bbox(&self.vertices);
    }

    /// Determinant rejection threshold scaled by the longer of the two edges.
    fn adaptive_epsilon(edge1: Vec3, edge2: Vec3) -> f32 {
        let scale = edge1.length().max(edge2.length());
        (DETERMINANT_EPSILON_SCALE * scale).clamp(MIN_DETERMINANT_EPSILON, MAX_DETERMINANT_EPSILON)
    }
}

impl Hittable for Triangle {
    /// Moller-Trumbore intersection.
    fn hit(&self, ray: &Ray, ray_t: Interval, rec: &mut HitRecord) -> bool {
        let [v0, v1, v2] = self.vertices;
        let edge1 = v1 - v0;
        let edge2 = v2 - v0;

        let h = ray.direction.cross(edge2);
        let a = edge1.dot(h);
        if a.abs() < Self::adaptive_epsilon(edge1, edge2) || !a.is_finite() {
            return false;
        }

        let f = 1.0 / a;
        let s = ray.origin - v0;
        let u = f * s.dot(h);
        if !(0.0..=1.0).contains(&u) {
            return false;
        }

        let q = s.cross(edge1);
        let v = f * ray.direction.dot(q);
        if v < 0.0 || u + v > 1.0 {
            return false;
        }

        let t = f * edge2.dot(q);
        if !ray_t.surrounds(t) {
            return false;
        }

        let w = 1.0 - u - v;
        let face_normal = normalize_or(edge1.cross(edge2), Vec3::Z);
        let interpolated = normalize_or(
            w * self.normals[0] + u * self.normals[1] + v * self.normals[2],
            face_normal,
        );
        let shading_normal = if interpolated.dot(face_normal) >= SMOOTH_NORMAL_COS_THRESHOLD {
            interpolated
        } else {
            face_normal
        };
        let uv = w * self.uvs[0] + u * self.uvs[1] + v * self.uvs[2];

        rec.t = t;
        rec.p = ray.at(t);
        rec.set_face_normal(ray, face_normal, shading_normal);
        rec.u = uv.x;
        rec.v = uv.y;
        rec.material = self.material;
        rec.smooth_group = self.smooth_group;
        true
    }

    fn bounding_box(&self) -> Aabb {
        self.bbox
    }
}
