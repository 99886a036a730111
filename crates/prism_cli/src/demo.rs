//! Built-in demo scene: a field of small spheres around three large ones.

use anyhow::Result;
use prism_core::{Mesh, Texture, WrapMode};
use prism_renderer::{
    Atmosphere, Background, Color, Cuboid, Dielectric, Light, Metal, Principled, Scene, Sphere, TextureTransform,
    TriangleMesh, Vec3, Volumetric,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::TAU;
use std::sync::Arc;

fn checker(size: u32, a: Color, b: Color) -> Result<Texture> {
    let pixels = (0..size * size)
        .map(|i| {
            let (x, y) = (i % size, i / size);
            let c = if (x + y) % 2 == 0 { a } else { b };
            [c.x, c.y, c.z, 1.0]
        })
        .collect();
    Ok(Texture::new(size, size, pixels)?.with_wrap(WrapMode::Repeat))
}

/// Tangent-space normal map of a sine bump grid, one bump per tile.
fn bumps(size: u32) -> Result<Texture> {
    let pixels = (0..size * size)
        .map(|i| {
            let (x, y) = ((i % size) as f32 / size as f32, (i / size) as f32 / size as f32);
            let n = Vec3::new(0.4 * (TAU * x).cos(), 0.4 * (TAU * y).cos(), 1.0).normalize();
            [0.5 * n.x + 0.5, 0.5 * n.y + 0.5, 0.5 * n.z + 0.5, 1.0]
        })
        .collect();
    Ok(Texture::new(size, size, pixels)?.with_wrap(WrapMode::Repeat))
}

fn tetrahedron(center: Vec3, size: f32) -> Mesh {
    let positions = [
        Vec3::new(1.0, 1.0, 1.0),
        Vec3::new(1.0, -1.0, -1.0),
        Vec3::new(-1.0, 1.0, -1.0),
        Vec3::new(-1.0, -1.0, 1.0),
    ]
    .iter()
    .map(|p| center + *p * size)
    .collect();
    Mesh::new(positions, vec![0, 1, 2, 0, 3, 1, 0, 2, 3, 1, 3, 2], None)
}

pub fn build(seed: u64, fog: bool) -> Result<Scene> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut scene = Scene::new();

    let ground = scene.add_material(
        Principled::diffuse(Color::splat(0.5))
            .with_base_texture(Arc::new(checker(64, Color::new(0.2, 0.3, 0.1), Color::splat(0.9))?)),
    );
    scene.add_primitive(Sphere::new(Vec3::new(0.0, -1000.0, 0.0), 1000.0, ground));

    let glass = scene.add_material(Dielectric::new(1.5));
    let clay = scene.add_material(Principled::plastic(Color::new(0.4, 0.2, 0.1), 0.4).with_clearcoat(0.5, 0.1));
    let steel = scene.add_material(Metal::new(Color::new(0.7, 0.6, 0.5), 0.05));
    scene.add_primitive(Sphere::new(Vec3::new(0.0, 1.0, 0.0), 1.0, glass));
    scene.add_primitive(Sphere::new(Vec3::new(-4.0, 1.0, 0.0), 1.0, clay));
    scene.add_primitive(Sphere::new(Vec3::new(4.0, 1.0, 0.0), 1.0, steel));

    let smoke = scene.add_material(
        Volumetric::new(Color::splat(0.8), 0.4, 0.1).with_extent(Vec3::new(-2.0, 0.6, 2.5), 0.6),
    );
    scene.add_primitive(Sphere::new(Vec3::new(-2.0, 0.6, 2.5), 0.6, smoke));

    let gold = scene.add_material(
        Principled::new()
            .with_base_color(Color::new(1.0, 0.78, 0.34))
            .with_metallic(1.0)
            .with_roughness(0.3)
            .with_anisotropic(0.6, Vec3::Y),
    );
    scene.add_primitive(TriangleMesh::from_mesh(&tetrahedron(Vec3::new(2.0, 0.5, 2.5), 0.35), gold)?);

    let brick = scene.add_material(
        Principled::diffuse(Color::new(0.6, 0.25, 0.2))
            .with_subsurface(0.3, Color::new(0.9, 0.5, 0.4))
            .with_normal_map(Arc::new(bumps(32)?), 0.8)
            .with_texture_transform(TextureTransform::new().with_tiling(4.0, 2.0)),
    );
    scene.add_primitive(Cuboid::new(Vec3::new(0.0, 0.3, 2.8), Vec3::new(0.8, 0.6, 0.4), brick));

    for a in -6..6 {
        for b in -6..6 {
            let center = Vec3::new(a as f32 + 0.9 * rng.gen::<f32>(), 0.2, b as f32 + 0.9 * rng.gen::<f32>());
            if (center - Vec3::new(4.0, 0.2, 0.0)).length() <= 0.9 || (center - Vec3::new(0.0, 0.2, 2.8)).length() <= 0.9 {
                continue;
            }
            let choose: f32 = rng.gen();
            let material = if choose < 0.75 {
                let albedo = Color::new(
                    rng.gen::<f32>() * rng.gen::<f32>(),
                    rng.gen::<f32>() * rng.gen::<f32>(),
                    rng.gen::<f32>() * rng.gen::<f32>(),
                );
                scene.add_material(Principled::diffuse(albedo))
            } else if choose < 0.9 {
                let albedo = Color::new(
                    0.5 + 0.5 * rng.gen::<f32>(),
                    0.5 + 0.5 * rng.gen::<f32>(),
                    0.5 + 0.5 * rng.gen::<f32>(),
                );
                scene.add_material(Metal::new(albedo, 0.5 * rng.gen::<f32>()))
            } else if choose < 0.97 {
                scene.add_material(Dielectric::clear(1.5))
            } else {
                let tint = Color::new(rng.gen(), rng.gen(), rng.gen());
                scene.add_material(Principled::diffuse(Color::ZERO).with_emission(tint, 3.0))
            };
            scene.add_primitive(Sphere::new(center, 0.2, material));
        }
    }

    scene.add_light(Light::directional(Vec3::new(-0.4, -1.0, -0.3), Color::new(1.0, 0.95, 0.85) * 2.5, 20.0));
    scene.add_light(Light::area(
        Vec3::new(-1.0, 5.0, -1.0),
        Vec3::X,
        Vec3::Z,
        2.0,
        2.0,
        Color::splat(40.0),
    ));
    scene.set_background(Background::Color(Color::new(0.5, 0.7, 1.0)));
    if fog {
        scene.set_atmosphere(
            Atmosphere::fog(8.0, 0.02, Color::new(0.7, 0.75, 0.8)).with_haze(0.002, Color::new(0.8, 0.8, 0.85)),
        );
    }

    log::info!("demo scene: {} primitives", scene.primitives().len());
    Ok(scene)
}
