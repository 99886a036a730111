//! Scene description and the immutable world built from it.
//!
//! A [`Scene`] is an arena of materials, primitives and lights that callers
//! fill in any order. [`Scene::build`] validates material references, expands
//! meshes into triangles and builds the BVH, producing a [`World`] that every
//! render thread shares read-only.

use crate::atmosphere::Atmosphere;
use crate::bvh::{Bvh, BvhBuildOptions};
use crate::error::{RenderError, RenderResult};
use crate::hittable::{HitRecord, Hittable, MaterialId};
use crate::light::Light;
use crate::material::{Color, Material};
use crate::primitive::{flatten, Primitive};
use prism_core::TextureSampler;
use prism_math::{normalize_or, Aabb, Interval, Ray, Vec3};
use std::f32::consts::PI;
use std::fmt;
use std::sync::Arc;

/// What a ray sees when it leaves the scene.
#[derive(Clone)]
pub enum Background {
    Color(Color),
    /// Equirectangular environment map
    Texture(Arc<dyn TextureSampler>),
}

impl Background {
    pub fn sample(&self, direction: Vec3) -> Color {
        match self {
            Background::Color(color) => *color,
            Background::Texture(texture) => {
                let (u, v) = equirect_uv(direction);
                texture.get_color(u, v)
            }
        }
    }
}

impl Default for Background {
    fn default() -> Self {
        Background::Color(Color::ZERO)
    }
}

impl fmt::Debug for Background {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Background::Color(c) => f.debug_tuple("Color").field(c).finish(),
            Background::Texture(_) => f.write_str("Texture(..)"),
        }
    }
}

/// Longitude/latitude texture coordinates of a direction.
pub fn equirect_uv(direction: Vec3) -> (f32, f32) {
    let d = normalize_or(direction, Vec3::Y);
    let u = 0.5 + d.z.atan2(d.x) / (2.0 * PI);
    let v = 0.5 + d.y.clamp(-1.0, 1.0).asin() / PI;
    (u, v)
}

#[derive(Debug, Clone, Default)]
pub struct Scene {
    materials: Vec<Material>,
    primitives: Vec<Primitive>,
    lights: Vec<Light>,
    background: Background,
    atmosphere: Atmosphere,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a material and return its id.
    pub fn add_material(&mut self, material: impl Into<Material>) -> MaterialId {
        self.materials.push(material.into());
        self.materials.len() - 1
    }

    /// Add a primitive and return its index in the scene.
    pub fn add_primitive(&mut self, primitive: impl Into<Primitive>) -> usize {
        self.primitives.push(primitive.into());
        self.primitives.len() - 1
    }

    pub fn add_light(&mut self, light: Light) {
        self.lights.push(light);
    }

    pub fn set_background(&mut self, background: Background) {
        self.background = background;
    }

    pub fn set_atmosphere(&mut self, atmosphere: Atmosphere) {
        self.atmosphere = atmosphere;
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    pub fn primitives_mut(&mut self) -> &mut [Primitive] {
        &mut self.primitives
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    /// Check every material reference against the arena.
    pub fn validate(&self) -> RenderResult<()> {
        let count = self.materials.len();
        for (index, primitive) in self.primitives.iter().enumerate() {
            if let Some(&material) = primitive.materials().iter().find(|&&id| id >= count) {
                return Err(RenderError::InvalidMaterial {
                    primitive: index,
                    material,
                    count,
                });
            }
        }
        Ok(())
    }

    /// Validate, flatten meshes and build the acceleration structure.
    pub fn build(self, options: BvhBuildOptions) -> RenderResult<World> {
        self.validate()?;
        let primitives = flatten(self.primitives);
        log::info!(
            "building world: {} primitives, {} materials, {} lights",
            primitives.len(),
            self.materials.len(),
            self.lights.len()
        );
        let bvh = Bvh::build(primitives, options)?;
        Ok(World {
            bvh,
            materials: self.materials,
            lights: self.lights,
            background: self.background,
            atmosphere: self.atmosphere,
        })
    }
}

/// Immutable, render-ready scene.
#[derive(Debug, Clone)]
pub struct World {
    bvh: Bvh,
    materials: Vec<Material>,
    lights: Vec<Light>,
    background: Background,
    atmosphere: Atmosphere,
}

impl World {
    pub fn bvh(&self) -> &Bvh {
        &self.bvh
    }

    /// Material ids were validated when the world was built.
    pub fn material(&self, id: MaterialId) -> &Material {
        &self.materials[id]
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn background(&self) -> &Background {
        &self.background
    }

    pub fn atmosphere(&self) -> &Atmosphere {
        &self.atmosphere
    }
}

impl Hittable for World {
    fn hit(&self, r: &Ray, ray_t: Interval, rec: &mut HitRecord) -> bool {
        self.bvh.hit(r, ray_t, rec)
    }

    fn bounding_box(&self) -> Aabb {
        self.bvh.bounding_box()
    }
}
