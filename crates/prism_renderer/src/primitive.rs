//! Closed set of geometric primitives stored in the scene arena.

use crate::cuboid::Cuboid;
use crate::hittable::{HitRecord, Hittable, MaterialId};
use crate::mesh::TriangleMesh;
use crate::sphere::Sphere;
use crate::triangle::Triangle;
use prism_math::{Aabb, Interval, Mat4, Ray};

#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Sphere(Sphere),
    Triangle(Triangle),
    Cuboid(Cuboid),
    Mesh(TriangleMesh),
}

impl Primitive {
    /// Material ids referenced by this primitive.
    pub fn materials(&self) -> Vec<MaterialId> {
        match self {
            Primitive::Sphere(s) => vec![s.material()],
            Primitive::Triangle(t) => vec![t.material()],
            Primitive::Cuboid(c) => vec![c.material()],
            Primitive::Mesh(m) => {
                let mut ids: Vec<_> = m.triangles().iter().map(Triangle::material).collect();
                ids.sort_unstable();
                ids.dedup();
                ids
            }
        }
    }

    /// Apply a transform; the bounding box is recomputed.
    pub fn transform(&mut self, matrix: &Mat4) {
        match self {
            Primitive::Sphere(s) => s.transform(matrix),
            Primitive::Triangle(t) => t.transform(matrix),
            Primitive::Cuboid(c) => c.transform(matrix),
            Primitive::Mesh(m) => m.transform(matrix),
        }
    }

    /// Meshes expand into their triangles, everything else passes through.
    pub fn flatten_into(self, out: &mut Vec<Primitive>) {
        match self {
            Primitive::Mesh(mesh) => out.extend(mesh.into_triangles().into_iter().map(Primitive::Triangle)),
            other => out.push(other),
        }
    }
}

impl Hittable for Primitive {
    #[inline]
    fn hit(&self, r: &Ray, ray_t: Interval, rec: &mut HitRecord) -> bool {
        match self {
            Primitive::Sphere(s) => s.hit(r, ray_t, rec),
            Primitive::Triangle(t) => t.hit(r, ray_t, rec),
            Primitive::Cuboid(c) => c.hit(r, ray_t, rec),
            Primitive::Mesh(m) => m.hit(r, ray_t, rec),
        }
    }

    fn bounding_box(&self) -> Aabb {
        match self {
            Primitive::Sphere(s) => s.bounding_box(),
            Primitive::Triangle(t) => t.bounding_box(),
            Primitive::Cuboid(c) => c.bounding_box(),
            Primitive::Mesh(m) => m.bounding_box(),
        }
    }
}

impl From<Sphere> for Primitive {
    fn from(s: Sphere) -> Self {
        Primitive::Sphere(s)
    }
}

impl From<Triangle> for Primitive {
    fn from(t: Triangle) -> Self {
        Primitive::Triangle(t)
    }
}

impl From<Cuboid> for Primitive {
    fn from(c: Cuboid) -> Self {
        Primitive::Cuboid(c)
    }
}

impl From<TriangleMesh> for Primitive {
    fn from(m: TriangleMesh) -> Self {
        Primitive::Mesh(m)
    }
}

/// Expand every mesh in `primitives` into individual triangles.
pub fn flatten(primitives: Vec<Primitive>) -> Vec<Primitive> {
    let mut out = Vec::with_capacity(primitives.len());
    for p in primitives {
        p.flatten_into(&mut out);
    }
    out
}
