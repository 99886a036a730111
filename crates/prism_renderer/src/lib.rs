//! Prism Renderer - CPU Path Tracing
//!
//! A Monte Carlo path tracer: scenes are flattened into a BVH built in
//! parallel, then rendered in progressive passes by workers on a rayon pool
//! sharing one immutable [`World`].

mod error;
mod hittable;
pub mod sampling;
pub mod microfacet;
mod sphere;
mod triangle;
mod cuboid;
mod mesh;
mod primitive;
mod hittable_list;
mod bvh;
pub mod material;
mod light;
mod atmosphere;
mod camera;
mod scene;
pub mod integrator;
mod renderer;

pub use error::{RenderError, RenderResult};
pub use hittable::{HitRecord, Hittable, MaterialId};
pub use sphere::Sphere;
pub use triangle::Triangle;
pub use cuboid::Cuboid;
pub use mesh::TriangleMesh;
pub use primitive::{flatten, Primitive};
pub use hittable_list::HittableList;
pub use bvh::{Bvh, BvhBuildOptions, BvhNode, BvhStats, DEFAULT_PARALLEL_THRESHOLD};
pub use material::{
    Color, Dielectric, Emissive, Material, MaterialKind, MaterialProperty, Metal, Principled, ScatterContext,
    ScatterResult, TextureTransform, Volumetric,
};
pub use light::{Light, LightKind, LightSample};
pub use atmosphere::Atmosphere;
pub use camera::Camera;
pub use scene::{equirect_uv, Background, Scene, World};
pub use integrator::{ray_color, trace_path, DepthLimits, IntegratorSettings, PathSample, RouletteSettings};
pub use renderer::{
    color_to_rgba, linear_to_gamma, render, render_into, ImageBuffer, RenderConfig, RenderContext, RenderStats,
};

/// Re-export Vec3 and common math types from prism_math
pub use prism_math::{Aabb, Interval, Mat4, Ray, Vec2, Vec3};
