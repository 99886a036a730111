mod config;
mod demo;
mod output;

use anyhow::Result;
use clap::Parser;
use config::Config;
use prism_renderer::{render_into, BvhBuildOptions, ImageBuffer, RenderContext};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "prism", about = "Render the Prism demo scene")]
struct Args {
    /// JSON config; missing fields use defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(short, long, default_value = "output.ppm")]
    output: PathBuf,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,

    /// Samples per pixel
    #[arg(long)]
    spp: Option<u32>,

    /// Worker threads, 0 for all cores
    #[arg(short, long)]
    threads: Option<usize>,

    #[arg(long)]
    seed: Option<u64>,

    #[arg(long)]
    fog: bool,

    /// Write the image after every pass
    #[arg(long)]
    progressive: bool,
}

impl Args {
    fn into_config(self) -> Result<(Config, PathBuf, bool)> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if let Some(spp) = self.spp {
            config.render.samples_per_pixel = spp;
        }
        if let Some(threads) = self.threads {
            config.render.threads = threads;
        }
        if let Some(seed) = self.seed {
            config.render.seed = seed;
        }
        config.fog |= self.fog;
        Ok((config, self.output, self.progressive))
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let (config, output_path, progressive) = Args::parse().into_config()?;
    log::info!("Starting Prism");

    let started = Instant::now();
    let world = demo::build(config.scene_seed, config.fog)?.build(BvhBuildOptions::default())?;
    log::info!("scene ready in {:.2?}", started.elapsed());

    let camera = config.camera.build(config.width, config.height);
    let mut image = ImageBuffer::new(config.width, config.height);
    if config.render.capture_normals {
        image = image.with_normals();
    }
    let ctx = RenderContext::new();
    let gamma = config.render.gamma;

    let stats = render_into(&world, &camera, &config.render, &ctx, &image, |pass, total, image| {
        if progressive && pass + 1 < total {
            if let Err(err) = output::save_ppm(image, gamma, &output_path) {
                log::warn!("could not write progress image: {:#}", err);
            }
        }
    })?;

    output::save_ppm(&image, gamma, &output_path)?;
    log::info!(
        "wrote {} ({} passes, {} spp, {} threads, {:.2?})",
        output_path.display(),
        stats.passes,
        stats.samples_per_pixel,
        stats.threads,
        stats.elapsed
    );
    Ok(())
}
