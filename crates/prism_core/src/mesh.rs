//! Indexed triangle geometry handed to the renderer by scene importers.
//!
//! Winding is counter-clockwise: `(p1 - p0) x (p2 - p0)` is the outward face normal.

use prism_math::{Aabb, Mat4, Mat4Ext, Vec3};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum MeshError {
    #[error("index count {0} is not a multiple of 3")]
    IndexCount(usize),

    #[error("face {face} references vertex {index}, but the mesh has {vertex_count} vertices")]
    IndexOutOfRange {
        face: usize,
        index: u32,
        vertex_count: usize,
    },

    #[error("{attribute} has {actual} entries, expected {expected}")]
    AttributeLength {
        attribute: &'static str,
        expected: usize,
        actual: usize,
    },
}

pub type MeshResult<T> = Result<T, MeshError>;

#[derive(Clone, Debug)]
pub struct Mesh {
    pub positions: Vec<Vec3>,
    /// Per-vertex normals. Missing normals are computed on demand.
    pub normals: Option<Vec<Vec3>>,
    /// Per-vertex texture coordinates.
    pub uvs: Option<Vec<[f32; 2]>>,
    /// Every 3 indices form one triangle.
    pub indices: Vec<u32>,
    /// Per-face smoothing group tags (0 = no group).
    pub smooth_groups: Option<Vec<u32>>,
    pub bounds: Aabb,
}

/// One resolved triangle of a [`Mesh`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeshFace {
    pub positions: [Vec3; 3],
    pub normals: Option<[Vec3; 3]>,
    pub uvs: Option<[[f32; 2]; 3]>,
    pub smooth_group: u32,
}

impl Mesh {
    pub fn new(positions: Vec<Vec3>, indices: Vec<u32>, normals: Option<Vec<Vec3>>) -> Self {
        let bounds = Aabb::enclosing(positions.iter().copied());
        Self {
            positions,
            normals,
            uvs: None,
            indices,
            smooth_groups: None,
            bounds,
        }
    }

    pub fn with_uvs(mut self, uvs: Vec<[f32; 2]>) -> Self {
        self.uvs = Some(uvs);
        self
    }

    pub fn with_smooth_groups(mut self, groups: Vec<u32>) -> Self {
        self.smooth_groups = Some(groups);
        self
    }

    /// Check index ranges and attribute lengths.
    pub fn validate(&self) -> MeshResult<()> {
        if self.indices.len() % 3 != 0 {
            return Err(MeshError::IndexCount(self.indices.len()));
        }
        let vertex_count = self.positions.len();
        if let Some(i) = self.indices.iter().position(|&idx| idx as usize >= vertex_count) {
            return Err(MeshError::IndexOutOfRange {
                face: i / 3,
                index: self.indices[i],
                vertex_count,
            });
        }
        if let Some(normals) = &self.normals {
            check_len("normals", vertex_count, normals.len())?;
        }
        if let Some(uvs) = &self.uvs {
            check_len("uvs", vertex_count, uvs.len())?;
        }
        if let Some(groups) = &self.smooth_groups {
            check_len("smooth_groups", self.triangle_count(), groups.len())?;
        }
        Ok(())
    }

    /// Smooth vertex normals: each is the normalized sum of the area-weighted
    /// normals of every face sharing the vertex.
    pub fn compute_normals(&mut self) {
        let vertex_count = self.positions.len();
        let mut normals = vec![Vec3::ZERO; vertex_count];

        for face in self.indices.chunks_exact(3) {
            let [i0, i1, i2] = [face[0] as usize, face[1] as usize, face[2] as usize];
            if i0 >= vertex_count || i1 >= vertex_count || i2 >= vertex_count {
                continue;
            }
            let p0 = self.positions[i0];
            let face_normal = (self.positions[i1] - p0).cross(self.positions[i2] - p0);
            normals[i0] += face_normal;
            normals[i1] += face_normal;
            normals[i2] += face_normal;
        }

        for normal in &mut normals {
            *normal = prism_math::normalize_or(*normal, Vec3::Y);
        }

        self.normals = Some(normals);
    }

    /// Computes normals when they are missing or do not match the vertex count.
    pub fn ensure_normals(&mut self) {
        let stale = match &self.normals {
            None => true,
            Some(normals) => normals.len() != self.positions.len(),
        };
        if stale {
            if let Some(normals) = &self.normals {
                log::debug!(
                    "normal count ({}) does not match vertex count ({}), recomputing",
                    normals.len(),
                    self.positions.len()
                );
            }
            self.compute_normals();
        }
    }

    /// Bake a transform into positions and normals, then refresh the bounds.
    pub fn transform(&mut self, matrix: &Mat4) {
        for p in &mut self.positions {
            *p = matrix.transform_point3(*p);
        }
        if let Some(normals) = &mut self.normals {
            for n in normals.iter_mut() {
                *n = matrix.transform_normal(*n);
            }
        }
        self.bounds = Aabb::enclosing(self.positions.iter().copied());
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn has_normals(&self) -> bool {
        self.normals.is_some()
    }

    pub fn has_uvs(&self) -> bool {
        self.uvs.is_some()
    }

    /// Resolved faces. Faces with out-of-range indices are skipped with a warning.
    pub fn faces(&self) -> impl Iterator<Item = MeshFace> + '_ {
        self.indices
            .chunks_exact(3)
            .enumerate()
            .filter_map(move |(face, chunk)| {
                let idx = [chunk[0] as usize, chunk[1] as usize, chunk[2] as usize];
                if idx.iter().any(|&i| i >= self.positions.len()) {
                    log::warn!(
                        "skipping face {} with indices {:?}, vertex count {}",
                        face,
                        idx,
                        self.positions.len()
                    );
                    return None;
                }
                let normals = self
                    .normals
                    .as_ref()
                    .filter(|n| n.len() == self.positions.len())
                    .map(|n| idx.map(|i| n[i]));
                let uvs = self
                    .uvs
                    .as_ref()
                    .filter(|uv| uv.len() == self.positions.len())
                    .map(|uv| idx.map(|i| uv[i]));
                let smooth_group = self
                    .smooth_groups
                    .as_ref()
                    .and_then(|groups| groups.get(face).copied())
                    .unwrap_or(0);
                Some(MeshFace {
                    positions: idx.map(|i| self.positions[i]),
                    normals,
                    uvs,
                    smooth_group,
                })
            })
    }
}

fn check_len(attribute: &'static str, expected: usize, actual: usize) -> MeshResult<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(MeshError::AttributeLength {
            attribute,
            expected,
            actual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> Mesh {
        let positions = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
        ];
        Mesh::new(positions, vec![0, 1, 2, 1, 3, 2], None)
    }

    #[test]
    fn test_mesh_counts() {
        let mesh = quad();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.triangle_count(), 2);
        assert!(!mesh.has_normals());
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_compute_normals_ccw() {
        let mut mesh = quad();
        mesh.compute_normals();
        for normal in mesh.normals.as_ref().unwrap() {
            assert!((normal.z - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_validate_errors() {
        let mut mesh = quad();
        mesh.indices.push(0);
        assert_eq!(mesh.validate(), Err(MeshError::IndexCount(7)));

        let mut mesh = quad();
        mesh.indices[4] = 9;
        assert_eq!(
            mesh.validate(),
            Err(MeshError::IndexOutOfRange { face: 1, index: 9, vertex_count: 4 })
        );

        let mesh = quad().with_uvs(vec![[0.0, 0.0]; 3]);
        assert!(matches!(
            mesh.validate(),
            Err(MeshError::AttributeLength { attribute: "uvs", .. })
        ));
    }

    #[test]
    fn test_faces_resolve_attributes() {
        let mesh = quad()
            .with_uvs(vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]])
            .with_smooth_groups(vec![1, 2]);
        let faces: Vec<_> = mesh.faces().collect();

        assert_eq!(faces.len(), 2);
        assert_eq!(faces[1].positions[1], Vec3::new(1.0, 1.0, 0.0));
        assert_eq!(faces[1].uvs.unwrap()[1], [1.0, 1.0]);
        assert_eq!(faces[1].smooth_group, 2);
        assert!(faces[0].normals.is_none());
    }

    #[test]
    fn test_faces_skip_bad_indices() {
        let mut mesh = quad();
        mesh.indices[0] = 42;
        assert_eq!(mesh.faces().count(), 1);
    }

    #[test]
    fn test_transform_updates_bounds() {
        let mut mesh = quad();
        mesh.compute_normals();
        mesh.transform(&Mat4::from_translation(Vec3::new(0.0, 0.0, 5.0)));
        assert!((mesh.bounds.centroid().z - 5.0).abs() < 1e-4);
        assert!((mesh.normals.as_ref().unwrap()[0].z - 1.0).abs() < 1e-5);
    }
}
