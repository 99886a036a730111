//! Prism Core - scene-side data shared by importers and the renderer.
//!
//! This crate provides:
//!
//! - **Textures**: the [`TextureSampler`] contract materials sample through, and an
//!   in-memory [`Texture`] implementation with bilinear filtering
//! - **Meshes**: indexed triangle geometry ([`Mesh`]) with optional normals, UVs
//!   and smoothing groups
//!
//! Decoding images or model files is left to the caller; both types are built
//! from already-decoded buffers.

pub mod mesh;
pub mod texture;

pub use mesh::{Mesh, MeshError, MeshResult};
pub use texture::{srgb_to_linear, Texture, TextureError, TextureResult, TextureSampler, WrapMode};
