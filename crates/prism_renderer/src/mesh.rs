//! Composite triangle mesh primitive.

use crate::hittable::{HitRecord, Hittable, MaterialId};
use crate::triangle::Triangle;
use prism_core::{Mesh, MeshResult};
use prism_math::{Aabb, Interval, Mat4, Ray, Vec2};

/// A mesh made of [`Triangle`]s sharing one material.
///
/// It can be hit directly (linear scan) or flattened with [`TriangleMesh::into_triangles`]
/// so the BVH sees individual triangles.
#[derive(Debug, Clone, PartialEq)]
pub struct TriangleMesh {
    triangles: Vec<Triangle>,
    bbox: Aabb,
}

impl TriangleMesh {
    pub fn new(triangles: Vec<Triangle>) -> Self {
        let bbox = triangles
            .iter()
            .fold(Aabb::EMPTY, |acc, tri| Aabb::surrounding(&acc, &tri.bounding_box()));
        Self { triangles, bbox }
    }

    /// Build from indexed mesh data. Missing normals are computed smooth.
    pub fn from_mesh(mesh: &Mesh, material: MaterialId) -> MeshResult<Self> {
        mesh.validate()?;
        let mut mesh = mesh.clone();
        mesh.ensure_normals();

        let triangles = mesh
            .faces()
            .map(|face| {
                let [p0, p1, p2] = face.positions;
                let mut tri = Triangle::new(p0, p1, p2, material).with_smooth_group(face.smooth_group);
                if let Some(normals) = face.normals {
                    tri = tri.with_normals(normals);
                }
                if let Some(uvs) = face.uvs {
                    tri = tri.with_uvs(uvs.map(Vec2::from));
                }
                tri
            })
            .collect::<Vec<_>>();

        log::debug!("mesh with {} triangles, material {}", triangles.len(), material);
        Ok(Self::new(triangles))
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn into_triangles(self) -> Vec<Triangle> {
        self.triangles
    }

    pub fn transform(&mut self, matrix: &Mat4) {
        for tri in &mut self.triangles {
            tri.transform(matrix);
        }
        *self = Self::new(std::mem::take(&mut self.triangles));
    }
}

impl Hittable for TriangleMesh {
    fn hit(&self, ray: &Ray, ray_t: Interval, rec: &mut HitRecord) -> bool {
        if !self.bbox.hit(ray, ray_t) {
            return false;
        }
        let mut hit_anything = false;
        let mut closest_so_far = ray_t.max;
        for tri in &self.triangles {
            if tri.hit(ray, ray_t.with_max(closest_so_far), rec) {
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
