use std::path::PathBuf;

use clap::Parser;
use tkmodel::render::{RasterSettings, open_in_viewer, render_to_file};

#[derive(Parser, Debug)]
#[command(name = "tk-raster", version)]
/// Draw a rounded rectangle on the CPU and save it as a JPEG.
struct Cli {
    /// Surface width in pixels.
    #[arg(long, default_value_t = 512)]
    width: u16,

    /// Surface height in pixels.
    #[arg(long, default_value_t = 512)]
    height: u16,

    /// Corner radius of the rectangle.
    #[arg(long, default_value_t = 32.0)]
    radius: f64,

    /// Distance between the surface edge and the rectangle.
    #[arg(long, default_value_t = 128.0)]
    inset: f64,

    /// JPEG quality (1-100).
    #[arg(long, default_value_t = 90)]
    quality: u8,

    /// Output JPEG path. An existing file is replaced.
    #[arg(long, default_value = "output.jpg")]
    out: PathBuf,

    /// Do not open the result in the default image viewer.
    #[arg(long)]
    no_view: bool,
}

fn main() -> anyhow::Result<()> {
    if let Err(e) = env_logger::try_init() {
        eprintln!("Warning: Could not initialize logger: {}", e);
    }
    let cli = Cli::parse();

    let settings = RasterSettings {
        width: cli.width,
        height: cli.height,
        corner_radius: cli.radius,
        inset: cli.inset,
        quality: cli.quality,
        output: cli.out,
        ..RasterSettings::default()
    };
    let path = render_to_file(&settings)?;
    eprintln!("wrote {}", path.display());

    if !cli.no_view {
        if let Err(e) = open_in_viewer(&path) {
            log::warn!("could not open viewer: {:#}", e);
        }
    }
    Ok(())
}
