//! Pass-based parallel renderer.
//!
//! A render runs `samples_per_pixel / samples_per_pass` passes in sequence.
//! Within a pass, workers on a rayon pool claim chunks of rows from an atomic
//! cursor, trace every pixel of each row and add the results to that row under
//! its own lock. Between passes a callback sees the partially converged image.

use crate::camera::Camera;
use crate::error::{RenderError, RenderResult};
use crate::integrator::{trace_path, DepthLimits, IntegratorSettings, RouletteSettings, MIN_DEPTH};
use crate::material::occlusion::AO_SAMPLES;
use crate::material::Color;
use crate::sampling::stratified_halton;
use crate::scene::World;
use prism_math::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Render configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Total samples per pixel
    pub samples_per_pixel: u32,
    /// Samples per pixel added by each pass
    pub samples_per_pass: u32,
    /// Global bounce cap, clamped to the deepest material limit
    pub max_depth: u32,
    /// Bounces before russian roulette may terminate a path
    pub min_depth: u32,
    /// Worker threads, 0 for one per hardware thread
    pub threads: usize,
    /// Rows claimed by a worker at a time
    pub chunk_rows: u32,
    pub seed: u64,
    pub ambient_occlusion_samples: u32,
    pub roulette: RouletteSettings,
    pub depth_limits: DepthLimits,
    /// Display gamma used by [`ImageBuffer::to_rgba8`]
    pub gamma: f32,
    /// Record first-hit shading normals during the first pass
    pub capture_normals: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        let depth_limits = DepthLimits::default();
        Self {
            samples_per_pixel: 64,
            samples_per_pass: 8,
            max_depth: depth_limits.max_depth(),
            min_depth: MIN_DEPTH,
            threads: 0,
            chunk_rows: 16,
            seed: 0,
            ambient_occlusion_samples: AO_SAMPLES,
            roulette: RouletteSettings::default(),
            depth_limits,
            gamma: 2.0,
            capture_normals: false,
        }
    }
}

impl RenderConfig {
    pub fn samples_per_pass(&self) -> u32 {
        match self.samples_per_pass {
            0 => self.samples_per_pixel,
            n => n.min(self.samples_per_pixel),
        }
    }

    pub fn passes(&self) -> usize {
        if self.samples_per_pixel == 0 {
            return 0;
        }
        self.samples_per_pixel.div_ceil(self.samples_per_pass()) as usize
    }

    pub fn thread_count(&self) -> usize {
        match self.threads {
            0 => std::thread::available_parallelism().map_or(1, |n| n.get()),
            n => n,
        }
    }

    pub fn integrator(&self) -> IntegratorSettings {
        IntegratorSettings {
            max_depth: self.max_depth,
            min_depth: self.min_depth,
            depth_limits: self.depth_limits,
            roulette: self.roulette,
            ambient_occlusion_samples: self.ambient_occlusion_samples,
        }
    }
}

/// Shared state of one render.
///
/// Writers: workers `fetch_add` the row cursor and the pass driver resets it;
/// any thread may set `cancelled`; only the pass driver writes
/// `passes_completed` and `complete`.
#[derive(Debug, Default)]
pub struct RenderContext {
    row_cursor: AtomicUsize,
    cancelled: AtomicBool,
    passes_completed: AtomicUsize,
    complete: AtomicBool,
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask workers to stop after their current row.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    pub fn passes_completed(&self) -> usize {
        self.passes_completed.load(Ordering::Acquire)
    }

    pub fn is_complete(&self) -> bool {
        self.complete.load(Ordering::Acquire)
    }

    fn claim_rows(&self, chunk: usize, height: usize) -> Option<Range<usize>> {
        let start = self.row_cursor.fetch_add(chunk, Ordering::Relaxed);
        (start < height).then(|| start..(start + chunk).min(height))
    }

    fn start_pass(&self) {
        self.row_cursor.store(0, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone)]
struct Row {
    sum: Vec<Color>,
    samples: Vec<u32>,
}

/// Accumulated linear radiance with one lock per row.
#[derive(Debug)]
pub struct ImageBuffer {
    width: u32,
    height: u32,
    rows: Vec<Mutex<Row>>,
    normals: Option<Mutex<Vec<Vec3>>>,
}

impl ImageBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        let row = Row {
            sum: vec![Color::ZERO; width as usize],
            samples: vec![0; width as usize],
        };
        Self {
            width,
            height,
            rows: (0..height).map(|_| Mutex::new(row.clone())).collect(),
            normals: None,
        }
    }

    /// Also keep a first-hit normal per pixel.
    pub fn with_normals(mut self) -> Self {
        let len = self.width as usize * self.height as usize;
        self.normals = Some(Mutex::new(vec![Vec3::ZERO; len]));
        self
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn row(&self, y: u32) -> MutexGuard<'_, Row> {
        self.rows[y as usize].lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add `samples` samples per pixel, summed in `colors`, to row `y`.
    pub fn accumulate_row(&self, y: u32, colors: &[Color], samples: u32) {
        let mut guard = self.row(y);
        let row = &mut *guard;
        for ((sum, count), color) in row.sum.iter_mut().zip(row.samples.iter_mut()).zip(colors) {
            *sum += *color;
            *count += samples;
        }
    }

    /// Average radiance of a pixel, black before any sample lands.
    pub fn pixel(&self, x: u32, y: u32) -> Color {
        let row = self.row(y);
        match row.samples[x as usize] {
            0 => Color::ZERO,
            n => row.sum[x as usize] / n as f32,
        }
    }

    pub fn samples(&self, x: u32, y: u32) -> u32 {
        self.row(y).samples[x as usize]
    }

    /// Averaged linear radiance, row-major from the top row.
    pub fn to_linear(&self) -> Vec<Color> {
        let mut out = Vec::with_capacity(self.width as usize * self.height as usize);
        for y in 0..self.height {
            let row = self.row(y);
            out.extend(row.sum.iter().zip(&row.samples).map(|(sum, &n)| match n {
                0 => Color::ZERO,
                n => *sum / n as f32,
            }));
        }
        out
    }

    /// Gamma-encoded 8-bit RGBA.
    pub fn to_rgba8(&self, gamma: f32) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.width as usize * self.height as usize * 4);
        for color in self.to_linear() {
            bytes.extend_from_slice(&color_to_rgba(color, gamma));
        }
        bytes
    }

    pub fn record_normals(&self, y: u32, normals: &[Vec3]) {
        if let Some(buffer) = &self.normals {
            let start = y as usize * self.width as usize;
            let mut buffer = buffer.lock().unwrap_or_else(PoisonError::into_inner);
            buffer[start..start + normals.len()].copy_from_slice(normals);
        }
    }

    /// First-hit shading normals, zero where the camera ray escaped.
    pub fn normals(&self) -> Option<Vec<Vec3>> {
        self.normals
            .as_ref()
            .map(|buffer| buffer.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }
}

/// Encode linear to display space with `gamma` (2.0 is a square root).
#[inline]
pub fn linear_to_gamma(linear: f32, gamma: f32) -> f32 {
    if linear <= 0.0 {
        0.0
    } else if gamma == 2.0 {
        linear.sqrt()
    } else {
        linear.powf(1.0 / gamma.max(1e-3))
    }
}

/// Convert a color to 8-bit RGBA.
pub fn color_to_rgba(color: Color, gamma: f32) -> [u8; 4] {
    let encode = |c: f32| (255.0 * linear_to_gamma(c, gamma).clamp(0.0, 1.0)).round() as u8;
    [encode(color.x), encode(color.y), encode(color.z), 255]
}

/// Summary of a finished render.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderStats {
    pub passes: usize,
    pub samples_per_pixel: u32,
    pub threads: usize,
    pub elapsed: Duration,
}

/// Render `world` through `camera` into a new image.
pub fn render(world: &World, camera: &Camera, config: &RenderConfig) -> RenderResult<ImageBuffer> {
    let mut image = ImageBuffer::new(camera.image_width, camera.image_height);
    if config.capture_normals {
        image = image.with_normals();
    }
    render_into(world, camera, config, &RenderContext::new(), &image, |_, _, _| {})?;
    Ok(image)
}

/// Render into `image`, calling `on_pass(pass_index, passes_total, image)`
/// after every pass. On cancellation the passes already completed stay in
/// `image` and [`RenderError::Cancelled`] is returned.
pub fn render_into<F>(
    world: &World,
    camera: &Camera,
    config: &RenderConfig,
    ctx: &RenderContext,
    image: &ImageBuffer,
    mut on_pass: F,
) -> RenderResult<RenderStats>
where
    F: FnMut(usize, usize, &ImageBuffer),
{
    let (width, height) = (camera.image_width, camera.image_height);
    if width == 0 || height == 0 || image.width() != width || image.height() != height {
        return Err(RenderError::InvalidResolution { width, height });
    }

    let started = Instant::now();
    let passes = config.passes();
    let threads = config.thread_count();
    let settings = config.integrator();
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("prism-render-{i}"))
        .build()
        .map_err(|err| RenderError::ThreadPool(err.to_string()))?;
    let job = PassJob {
        world,
        camera,
        settings: &settings,
        ctx,
        image,
        chunk_rows: config.chunk_rows.max(1) as usize,
        seed: config.seed,
        capture_normals: config.capture_normals,
    };
    log::info!(
        "rendering {}x{} at {} spp in {} passes on {} threads",
        width,
        height,
        config.samples_per_pixel,
        passes,
        threads
    );

    for pass in 0..passes {
        let pass_started = Instant::now();
        let first_sample = pass as u32 * config.samples_per_pass();
        let samples = config.samples_per_pass().min(config.samples_per_pixel - first_sample);

        ctx.start_pass();
        pool.scope(|scope| {
            for _ in 0..threads {
                scope.spawn(|_| job.run_worker(pass, first_sample, samples));
            }
        });

        if ctx.is_cancelled() {
            log::warn!("render cancelled during pass {}/{}", pass + 1, passes);
            return Err(RenderError::Cancelled {
                passes_completed: pass,
                passes_total: passes,
            });
        }
        ctx.passes_completed.store(pass + 1, Ordering::Release);
        log::info!("pass {}/{} finished in {:.2?}", pass + 1, passes, pass_started.elapsed());
        on_pass(pass, passes, image);
    }

    ctx.complete.store(true, Ordering::Release);
    let stats = RenderStats {
        passes,
        samples_per_pixel: config.samples_per_pixel,
        threads,
        elapsed: started.elapsed(),
    };
    log::info!("render finished in {:.2?}", stats.elapsed);
    Ok(stats)
}

/// Everything a worker needs for one pass.
struct PassJob<'a> {
    world: &'a World,
    camera: &'a Camera,
    settings: &'a IntegratorSettings,
    ctx: &'a RenderContext,
    image: &'a ImageBuffer,
    chunk_rows: usize,
    seed: u64,
    capture_normals: bool,
}

impl PassJob<'_> {
    fn run_worker(&self, pass: usize, first_sample: u32, samples: u32) {
        let height = self.image.height() as usize;
        while let Some(rows) = self.ctx.claim_rows(self.chunk_rows, height) {
            log::debug!("pass {} rows {:?}", pass, rows);
            for y in rows {
                if self.ctx.is_cancelled() {
                    return;
                }
                self.render_row(pass, y as u32, first_sample, samples);
            }
        }
    }

    fn render_row(&self, pass: usize, y: u32, first_sample: u32, samples: u32) {
        let width = self.image.width();
        let height = self.image.height();
        // Seeded per (pass, row) so the image does not depend on scheduling
        let mut rng = StdRng::seed_from_u64(row_seed(self.seed, pass, y));
        let capture = self.capture_normals && pass == 0;

        let mut colors = vec![Color::ZERO; width as usize];
        let mut normals = if capture { vec![Vec3::ZERO; width as usize] } else { Vec::new() };

        for x in 0..width {
            let jitter = [rng.gen::<f32>(), rng.gen::<f32>()];
            for k in 0..samples {
                let (jx, jy) = stratified_halton((first_sample + k) as usize, jitter);
                let s = (x as f32 + jx) / width as f32;
                let t = 1.0 - (y as f32 + jy) / height as f32;
                let ray = self.camera.get_ray(s, t, &mut rng);
                let sample = trace_path(&ray, self.world, self.settings, &mut rng);

                if sample.radiance.is_finite() {
                    colors[x as usize] += sample.radiance;
                } else {
                    log::debug!("discarding non-finite sample at ({}, {})", x, y);
                }
                if capture && k == 0 {
                    normals[x as usize] = sample.normal.unwrap_or(Vec3::ZERO);
                }
            }
        }

        self.image.accumulate_row(y, &colors, samples);
        if capture {
            self.image.record_normals(y, &normals);
        }
    }
}

fn row_seed(seed: u64, pass: usize, y: u32) -> u64 {
    seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ ((pass as u64) << 32) ^ y as u64
}
