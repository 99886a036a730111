//! End-to-end renders through the pass scheduler.

use prism_renderer::{
    integrator::russian_roulette, render, render_into, trace_path, Background, BvhBuildOptions, Camera, Color,
    Emissive, ImageBuffer, IntegratorSettings, Light, Metal, Principled, Ray, RenderConfig, RenderContext,
    RenderError, RouletteSettings, Scene, Sphere, Vec3, World,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn camera(width: u32, height: u32) -> Camera {
    let mut camera = Camera::new()
        .with_resolution(width, height)
        .with_position(Vec3::new(0.0, 1.0, 4.0), Vec3::new(0.0, 0.5, 0.0), Vec3::Y)
        .with_lens(45.0, 0.0, 4.0);
    camera.initialize();
    camera
}

fn lit_world() -> World {
    let mut scene = Scene::new();
    let floor = scene.add_material(Principled::diffuse(Color::splat(0.5)).with_ambient_occlusion(false));
    let chrome = scene.add_material(Metal::new(Color::new(0.9, 0.8, 0.7), 0.2));
    let lamp = scene.add_material(Emissive::new(Color::ONE, 4.0));
    scene.add_primitive(Sphere::new(Vec3::new(0.0, -1000.0, 0.0), 1000.0, floor));
    scene.add_primitive(Sphere::new(Vec3::new(0.0, 0.5, 0.0), 0.5, chrome));
    scene.add_primitive(Sphere::new(Vec3::new(1.5, 0.3, -0.5), 0.3, lamp));
    scene.add_light(Light::point(Vec3::new(2.0, 4.0, 2.0), Color::splat(30.0), 0.1));
    scene.set_background(Background::Color(Color::new(0.2, 0.25, 0.3)));
    scene.build(BvhBuildOptions::default()).unwrap()
}

fn small_config(threads: usize) -> RenderConfig {
    RenderConfig {
        samples_per_pixel: 8,
        samples_per_pass: 4,
        threads,
        chunk_rows: 3,
        seed: 99,
        ambient_occlusion_samples: 0,
        ..Default::default()
    }
}

#[test]
fn unlit_scene_renders_black() {
    init_logging();
    let mut scene = Scene::new();
    let grey = scene.add_material(Principled::diffuse(Color::splat(0.8)));
    let mirror = scene.add_material(Metal::new(Color::ONE, 0.0));
    scene.add_primitive(Sphere::new(Vec3::new(0.0, -1000.0, 0.0), 1000.0, grey));
    scene.add_primitive(Sphere::new(Vec3::new(0.0, 0.5, 0.0), 0.5, mirror));
    let world = scene.build(BvhBuildOptions::default()).unwrap();

    let image = render(&world, &camera(16, 12), &small_config(2)).unwrap();
    assert!(image.to_linear().iter().all(|&c| c == Color::ZERO));
    assert!(image.to_rgba8(2.0).chunks(4).all(|px| px == [0, 0, 0, 255]));
}

#[test]
fn render_accumulates_every_pass() {
    init_logging();
    let world = lit_world();
    let camera = camera(24, 16);
    let config = small_config(3);
    let ctx = RenderContext::new();
    let image = ImageBuffer::new(24, 16);

    let mut passes_seen = Vec::new();
    let stats = render_into(&world, &camera, &config, &ctx, &image, |pass, total, image| {
        passes_seen.push((pass, total));
        assert_eq!(image.samples(0, 0), (pass as u32 + 1) * 4);
    })
    .unwrap();

    assert_eq!(passes_seen, vec![(0, 2), (1, 2)]);
    assert_eq!(stats.passes, 2);
    assert_eq!(stats.threads, 3);
    assert!(ctx.is_complete());
    assert_eq!(ctx.passes_completed(), 2);

    let pixels = image.to_linear();
    assert!(pixels.iter().all(|c| c.is_finite() && c.min_element() >= 0.0));
    assert!(pixels.iter().any(|c| c.max_element() > 0.05));
    for y in 0..16 {
        for x in 0..24 {
            assert_eq!(image.samples(x, y), 8);
        }
    }
}

#[test]
fn render_does_not_depend_on_thread_count() {
    init_logging();
    let world = lit_world();
    let camera = camera(20, 10);
    let single = render(&world, &camera, &small_config(1)).unwrap();
    let many = render(&world, &camera, &small_config(4)).unwrap();
    assert_eq!(single.to_linear(), many.to_linear());
}

#[test]
fn render_runs_on_its_own_pool_inside_rayon() {
    init_logging();
    let world = lit_world();
    let camera = camera(12, 12);
    let reference = render(&world, &camera, &small_config(1)).unwrap();

    // A single-threaded outer pool must neither starve nor change a four-thread render
    let outer = rayon::ThreadPoolBuilder::new().num_threads(1).build().unwrap();
    let nested = outer.install(|| render(&world, &camera, &small_config(4))).unwrap();
    assert_eq!(nested.to_linear(), reference.to_linear());
}

#[test]
fn cancelling_keeps_completed_passes() {
    init_logging();
    let world = lit_world();
    let camera = camera(16, 16);
    let config = RenderConfig {
        samples_per_pixel: 16,
        ..small_config(2)
    };
    let ctx = RenderContext::new();
    let image = ImageBuffer::new(16, 16);

    let result = render_into(&world, &camera, &config, &ctx, &image, |pass, _, _| {
        if pass == 0 {
            ctx.cancel();
        }
    });
    assert_eq!(
        result.unwrap_err(),
        RenderError::Cancelled {
            passes_completed: 1,
            passes_total: 4
        }
    );
    assert!(!ctx.is_complete());
    assert_eq!(ctx.passes_completed(), 1);
    assert_eq!(image.samples(7, 7), 4);
    assert_eq!(image.samples(15, 15), 4);

    let early = RenderContext::new();
    early.cancel();
    let fresh = ImageBuffer::new(16, 16);
    let result = render_into(&world, &camera, &config, &early, &fresh, |_, _, _| {});
    assert_eq!(
        result.unwrap_err(),
        RenderError::Cancelled {
            passes_completed: 0,
            passes_total: 4
        }
    );
    assert_eq!(fresh.samples(0, 0), 0);
}

#[test]
fn zero_resolution_is_rejected() {
    init_logging();
    let world = lit_world();
    let mut camera = Camera::new().with_resolution(0, 10);
    camera.initialize();
    assert_eq!(
        render(&world, &camera, &RenderConfig::default()).unwrap_err(),
        RenderError::InvalidResolution { width: 0, height: 10 }
    );
}

#[test]
fn captured_normals_face_the_camera() {
    init_logging();
    let world = lit_world();
    let camera = camera(9, 9);
    let config = RenderConfig {
        capture_normals: true,
        ..small_config(2)
    };
    let image = render(&world, &camera, &config).unwrap();
    let normals = image.normals().unwrap();
    assert_eq!(normals.len(), 81);
    // Center pixel sees the front of the chrome sphere
    let center = normals[4 * 9 + 4];
    assert!(center.z > 0.8, "center normal {:?}", center);
}

#[test]
fn roulette_is_unbiased() {
    init_logging();
    let mut rng = StdRng::seed_from_u64(5);
    let throughput = Color::new(0.6, 0.3, 0.1);
    for p in [0.3, 0.5, 0.95] {
        let trials = 50_000;
        let mut sum = Color::ZERO;
        for _ in 0..trials {
            if let Some(t) = russian_roulette(throughput, p, rng.gen::<f32>()) {
                sum += t;
            }
        }
        let mean = sum / trials as f32;
        assert!((mean - throughput).abs().max_element() < 0.02, "p={} mean={:?}", p, mean);
    }
}

#[test]
fn path_roulette_preserves_mean_radiance() {
    init_logging();
    let mut scene = Scene::new();
    let floor = scene.add_material(Principled::diffuse(Color::splat(0.5)).with_ambient_occlusion(false));
    scene.add_primitive(Sphere::new(Vec3::new(0.0, -1000.0, 0.0), 1000.0, floor));
    scene.add_light(Light::point(Vec3::new(0.0, 3.0, 0.0), Color::splat(9.0), 0.0));
    scene.set_background(Background::Color(Color::splat(0.5)));
    let world = scene.build(BvhBuildOptions::sequential()).unwrap();

    let without = IntegratorSettings {
        min_depth: 0,
        roulette: RouletteSettings {
            distance_stage: false,
            material_stage: false,
            ..Default::default()
        },
        ..Default::default()
    };
    let with = IntegratorSettings {
        min_depth: 0,
        ..Default::default()
    };

    let ray = Ray::new(Vec3::new(0.0, 1.0, 1.0), Vec3::new(0.0, -1.0, -1.0));
    let mean = |settings: &IntegratorSettings, seed: u64| {
        let mut rng = StdRng::seed_from_u64(seed);
        let trials = 20_000;
        let mut sum = Color::ZERO;
        for _ in 0..trials {
            sum += trace_path(&ray, &world, settings, &mut rng).radiance;
        }
        sum / trials as f32
    };
    let reference = mean(&without, 1);
    let estimate = mean(&with, 2);
    assert!(
        (estimate - reference).abs().max_element() < 0.05 * reference.max_element(),
        "{:?} vs {:?}",
        estimate,
        reference
    );
}
