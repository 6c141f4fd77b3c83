//! Render-to-raster flow: vector drawing into an in-memory bitmap, encoded as JPEG.
//!
//! The flow is a single sequential pass:
//!
//! 1. create a CPU render context and a raster surface of the requested size
//! 2. clear it and fill one rounded rectangle with a solid paint
//! 3. flush the context into the surface
//! 4. encode the surface as a single JPEG frame into a fresh file
//!
//! [`open_in_viewer`] optionally hands the result to the OS image viewer.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context as _, ensure};
use image::{RgbImage, codecs::jpeg::JpegEncoder};
use vello_cpu::{
    Pixmap, RenderContext,
    kurbo::{Rect, RoundedRect, Shape},
    peniko::Color,
};

/// Everything the raster flow needs to know. The defaults reproduce the
/// classic sample: a 512×512 `output.jpg` with a rounded rectangle in the middle.
#[derive(Clone, Debug, PartialEq)]
pub struct RasterSettings {
    pub width: u16,
    pub height: u16,
    /// Straight (non-premultiplied) RGBA clear colour.
    pub background: [u8; 4],
    /// Straight RGBA paint of the rounded rectangle.
    pub fill: [u8; 4],
    pub corner_radius: f64,
    /// Distance between the surface edge and the rectangle, in pixels.
    pub inset: f64,
    /// JPEG quality, 1 to 100.
    pub quality: u8,
    pub output: PathBuf,
}

impl Default for RasterSettings {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
            background: [255, 255, 255, 255],
            fill: [100, 149, 237, 255],
            corner_radius: 32.0,
            inset: 128.0,
            quality: 90,
            output: PathBuf::from("output.jpg"),
        }
    }
}

impl RasterSettings {
    /// The rectangle that gets filled.
    pub fn geometry(&self) -> RoundedRect {
        RoundedRect::new(
            self.inset,
            self.inset,
            f64::from(self.width) - self.inset,
            f64::from(self.height) - self.inset,
            self.corner_radius,
        )
    }
}

/// Draw the scene described by `settings` and return the surface as RGB.
pub fn rasterize(settings: &RasterSettings) -> anyhow::Result<RgbImage> {
    ensure!(
        settings.width > 0 && settings.height > 0,
        "raster surface must not be empty ({}x{})",
        settings.width,
        settings.height
    );
    ensure!(
        settings.inset >= 0.0
            && 2.0 * settings.inset < f64::from(settings.width)
            && 2.0 * settings.inset < f64::from(settings.height),
        "inset {} leaves no room on a {}x{} surface",
        settings.inset,
        settings.width,
        settings.height
    );

    let geometry = settings.geometry();
    let mut ctx = RenderContext::new(settings.width, settings.height);

    let [r, g, b, a] = settings.background;
    ctx.set_paint(Color::from_rgba8(r, g, b, a));
    ctx.fill_rect(&Rect::new(
        0.0,
        0.0,
        f64::from(settings.width),
        f64::from(settings.height),
    ));

    let [r, g, b, a] = settings.fill;
    ctx.set_paint(Color::from_rgba8(r, g, b, a));
    ctx.fill_path(&geometry.to_path(0.1));

    ctx.flush();
    let mut pixmap = Pixmap::new(settings.width, settings.height);
    ctx.render_to_pixmap(&mut pixmap);

    to_rgb(&pixmap, settings.width, settings.height)
}

/// Drop alpha from a premultiplied surface.
fn to_rgb(pixmap: &Pixmap, width: u16, height: u16) -> anyhow::Result<RgbImage> {
    let data = pixmap.data_as_u8_slice();
    let mut rgb = Vec::with_capacity(data.len() / 4 * 3);
    for px in data.chunks_exact(4) {
        let a = u16::from(px[3]);
        for &c in &px[..3] {
            let straight = if a == 0 {
                0
            } else {
                ((u16::from(c) * 255 + a / 2) / a).min(255) as u8
            };
            rgb.push(straight);
        }
    }
    RgbImage::from_raw(u32::from(width), u32::from(height), rgb)
        .context("surface size does not match its pixel data")
}

/// Encode `image` as one JPEG frame at `path`, replacing any existing file.
pub fn write_jpeg(image: &RgbImage, path: &Path, quality: u8) -> anyhow::Result<()> {
    if path.exists() {
        std::fs::remove_file(path)
            .with_context(|| format!("remove existing '{}'", path.display()))?;
        log::debug!("removed existing {}", path.display());
    }
    let file = File::create(path).with_context(|| format!("create '{}'", path.display()))?;
    let mut writer = BufWriter::new(file);
    let mut encoder = JpegEncoder::new_with_quality(&mut writer, quality.clamp(1, 100));
    encoder
        .encode_image(image)
        .with_context(|| format!("encode jpeg '{}'", path.display()))?;
    writer.flush()?;
    Ok(())
}

/// Run the whole flow and return the path of the written file.
pub fn render_to_file(settings: &RasterSettings) -> anyhow::Result<PathBuf> {
    let image = rasterize(settings)?;
    write_jpeg(&image, &settings.output, settings.quality)?;
    log::info!(
        "wrote {}x{} jpeg to {}",
        image.width(),
        image.height(),
        settings.output.display()
    );
    Ok(settings.output.clone())
}

/// Launch the OS default viewer for `path` without waiting for it.
pub fn open_in_viewer(path: &Path) -> anyhow::Result<()> {
    #[cfg(target_os = "windows")]
    let mut command = {
        let mut c = std::process::Command::new("cmd");
        c.args(["/C", "start", ""]);
        c
    };
    #[cfg(target_os = "macos")]
    let mut command = std::process::Command::new("open");
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    let mut command = std::process::Command::new("xdg-open");

    command
        .arg(path)
        .spawn()
        .with_context(|| format!("launch viewer for '{}'", path.display()))?;
    Ok(())
}
