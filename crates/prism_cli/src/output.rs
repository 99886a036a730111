//! Image output.

use anyhow::{Context, Result};
use prism_renderer::ImageBuffer;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Write a binary PPM (P6).
pub fn write_ppm<W: Write>(image: &ImageBuffer, gamma: f32, writer: &mut W) -> std::io::Result<()> {
    write!(writer, "P6\n{} {}\n255\n", image.width(), image.height())?;
    for rgba in image.to_rgba8(gamma).chunks_exact(4) {
        writer.write_all(&rgba[..3])?;
    }
    Ok(())
}

pub fn save_ppm(image: &ImageBuffer, gamma: f32, path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    write_ppm(image, gamma, &mut writer)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_renderer::Color;

    #[test]
    fn test_ppm_layout() {
        let image = ImageBuffer::new(2, 1);
        image.accumulate_row(0, &[Color::ONE, Color::ZERO], 1);
        let mut bytes = Vec::new();
        write_ppm(&image, 2.0, &mut bytes).unwrap();
        assert_eq!(&bytes[..11], b"P6\n2 1\n255\n");
        assert_eq!(&bytes[11..], &[255, 255, 255, 0, 0, 0]);
    }
}
