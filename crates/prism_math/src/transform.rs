// Transform helpers layered on top of glam::Mat4.
//
// glam already provides transform_point3 / transform_vector3 / inverse; these
// add the pieces primitives need when a transform is applied to them.

use crate::Aabb;
use glam::{Mat3, Mat4, Vec3};

pub trait Mat4Ext {
    /// Transform a surface normal by the inverse transpose of the upper 3x3 block.
    /// Degenerate (non-invertible) matrices leave the direction unnormalized-but-finite
    /// by falling back to the plain linear transform.
    fn transform_normal(&self, normal: Vec3) -> Vec3;

    /// Bounding box of the 8 transformed corners.
    fn transform_aabb(&self, aabb: &Aabb) -> Aabb;
}

impl Mat4Ext for Mat4 {
    fn transform_normal(&self, normal: Vec3) -> Vec3 {
        let linear = Mat3::from_mat4(*self);
        let det = linear.determinant();
        let n = if det.abs() > f32::EPSILON {
            linear.inverse().transpose() * normal
        } else {
            linear * normal
        };
        crate::normalize_or(n, normal)
    }

    fn transform_aabb(&self, aabb: &Aabb) -> Aabb {
        if !aabb.is_valid() {
            return *aabb;
        }
        let (lo, hi) = (aabb.min(), aabb.max());
        let corners = (0..8).map(|i| {
            let corner = Vec3::new(
                if i & 1 == 0 { lo.x } else { hi.x },
                if i & 2 == 0 { lo.y } else { hi.y },
                if i & 4 == 0 { lo.z } else { hi.z },
            );
            self.transform_point3(corner)
        });
        Aabb::enclosing(corners)
    }
}
