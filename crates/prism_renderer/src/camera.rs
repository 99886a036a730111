//! Thin-lens camera with polygonal bokeh.

use crate::sampling::random_in_unit_polygon;
use prism_math::{normalize_or, Ray, Vec3};
use rand::RngCore;

/// Camera for generating rays into the scene.
#[derive(Debug, Clone)]
pub struct Camera {
    // Image settings
    pub image_width: u32,
    pub image_height: u32,

    // Camera positioning
    look_from: Vec3,
    look_at: Vec3,
    vup: Vec3,

    // Lens settings
    vfov: f32,       // Vertical field of view in degrees
    aperture: f32,   // Lens diameter, 0 for a pinhole
    focus_dist: f32, // Distance from camera to plane of perfect focus
    blades: u32,     // Aperture blade count, fewer than 3 gives a round lens
    blade_rotation: f32,

    // Cached computed values (set by initialize())
    center: Vec3,
    lower_left: Vec3,
    horizontal: Vec3,
    vertical: Vec3,
    u: Vec3,
    v: Vec3,
    w: Vec3,
    lens_radius: f32,
}

impl Camera {
    /// Create a new camera with default settings.
    pub fn new() -> Self {
        let mut camera = Self {
            image_width: 800,
            image_height: 450,
            look_from: Vec3::ZERO,
            look_at: Vec3::new(0.0, 0.0, -1.0),
            vup: Vec3::Y,
            vfov: 90.0,
            aperture: 0.0,
            focus_dist: 1.0,
            blades: 0,
            blade_rotation: 0.0,
            center: Vec3::ZERO,
            lower_left: Vec3::ZERO,
            horizontal: Vec3::ZERO,
            vertical: Vec3::ZERO,
            u: Vec3::X,
            v: Vec3::Y,
            w: Vec3::Z,
            lens_radius: 0.0,
        };
        camera.initialize();
        camera
    }

    /// Set image resolution.
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.image_width = width;
        self.image_height = height;
        self
    }

    /// Set camera position.
    pub fn with_position(mut self, look_from: Vec3, look_at: Vec3, vup: Vec3) -> Self {
        self.look_from = look_from;
        self.look_at = look_at;
        self.vup = vup;
        self
    }

    /// Set lens settings.
    pub fn with_lens(mut self, vfov: f32, aperture: f32, focus_dist: f32) -> Self {
        self.vfov = vfov.clamp(1e-3, 179.0);
        self.aperture = aperture.max(0.0);
        self.focus_dist = focus_dist.max(1e-4);
        self
    }

    /// Set aperture shape.
    pub fn with_bokeh(mut self, blades: u32, rotation_degrees: f32) -> Self {
        self.blades = blades;
        self.blade_rotation = rotation_degrees.to_radians();
        self
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.image_width.max(1) as f32 / self.image_height.max(1) as f32
    }

    /// Recompute the cached basis and viewport. Call after changing settings.
    pub fn initialize(&mut self) {
        self.center = self.look_from;

        let h = (self.vfov.to_radians() / 2.0).tan();
        let viewport_height = 2.0 * h;
        let viewport_width = viewport_height * self.aspect_ratio();

        self.w = normalize_or(self.look_from - self.look_at, Vec3::Z);
        self.u = normalize_or(self.vup.cross(self.w), Vec3::X);
        self.v = self.w.cross(self.u);

        self.horizontal = self.focus_dist * viewport_width * self.u;
        self.vertical = self.focus_dist * viewport_height * self.v;
        self.lower_left =
            self.center - self.horizontal / 2.0 - self.vertical / 2.0 - self.focus_dist * self.w;
        self.lens_radius = self.aperture / 2.0;
    }

    /// Ray through image-plane coordinates `(s, t)` in `[0, 1]^2`, with `s`
    /// running left to right and `t` bottom to top.
    pub fn get_ray(&self, s: f32, t: f32, rng: &mut dyn RngCore) -> Ray {
        let origin = if self.lens_radius > 0.0 {
            let lens = self.lens_radius * random_in_unit_polygon(self.blades, self.blade_rotation, rng);
            self.center + self.u * lens.x + self.v * lens.y
        } else {
            self.center
        };
        let target = self.lower_left + s * self.horizontal + t * self.vertical;
        Ray::new(origin, target - origin)
    }

    pub fn position(&self) -> Vec3 {
        self.center
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_camera_initialize() {
        let mut camera = Camera::new()
            .with_resolution(800, 600)
            .with_position(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0), Vec3::Y)
            .with_lens(90.0, 0.0, 1.0);
        camera.initialize();

        assert_eq!(camera.position(), Vec3::ZERO);
        assert!((camera.w - Vec3::Z).length() < 0.001);
    }

    #[test]
    fn test_center_and_corner_rays() {
        let mut camera = Camera::new()
            .with_resolution(100, 100)
            .with_position(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0), Vec3::Y)
            .with_lens(90.0, 0.0, 1.0);
        camera.initialize();
        let mut rng = StdRng::seed_from_u64(42);

        let center = camera.get_ray(0.5, 0.5, &mut rng);
        assert!((center.direction().normalize() - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-5);

        // 90 degree fov on a square image reaches 45 degrees at the edges
        let top_right = camera.get_ray(1.0, 1.0, &mut rng);
        assert!((top_right.direction() - Vec3::new(1.0, 1.0, -1.0)).length() < 1e-5);
    }

    #[test]
    fn test_defocus_converges_on_focus_plane() {
        let mut camera = Camera::new()
            .with_resolution(64, 64)
            .with_position(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0), Vec3::Y)
            .with_lens(40.0, 0.5, 3.0)
            .with_bokeh(6, 15.0);
        camera.initialize();
        let mut rng = StdRng::seed_from_u64(7);

        let mut origins_differ = false;
        for _ in 0..50 {
            let ray = camera.get_ray(0.3, 0.6, &mut rng);
            assert!(ray.origin().length() <= 0.25 + 1e-5);
            assert!(ray.origin().z.abs() < 1e-6);
            origins_differ |= ray.origin().length() > 1e-4;
            // Every lens sample reaches the same point at the focus distance
            let focus = ray.at(1.0);
            assert!((focus.z + 3.0).abs() < 1e-4);
            let pinhole = camera.lower_left + 0.3 * camera.horizontal + 0.6 * camera.vertical;
            assert!((focus - pinhole).length() < 1e-4);
        }
        assert!(origins_differ);
    }
}
