//! Contour overlay command-line tool.
//!
//! Loads a raw float32 image (or synthesizes a star field), traces
//! isocontours, applies optional level adjustments and writes the overlay
//! as a PNG.

mod synthetic;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use contour_common::{PixelRect, Rgba};
use contour_engine::{
    data_range, generate_levels, ContourOverlay, ContourRequest, EngineConfig, RasterImage,
    SourceImage, ViewState,
};
use projection::{Projection, SkyCoord, TangentProjection};
use renderer::CanvasSink;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "contour-cli")]
#[command(about = "Trace isocontours of an astronomical image and render them to PNG")]
struct Args {
    /// Raw little-endian float32 image; a synthetic star field is used if omitted
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Image width in pixels
    #[arg(long, default_value = "512")]
    width: usize,

    /// Image height in pixels
    #[arg(long, default_value = "512")]
    height: usize,

    /// Number of stars in the synthetic field
    #[arg(long, default_value = "60")]
    stars: usize,

    /// Seed for the synthetic field
    #[arg(long, default_value = "1")]
    seed: u32,

    /// Contour levels
    #[arg(short, long, value_delimiter = ',')]
    levels: Vec<f64>,

    /// Number of evenly spaced levels to generate when --levels is not given
    #[arg(long, default_value = "5")]
    auto_levels: usize,

    /// Block-sum downsampling factor
    #[arg(short, long, default_value = "1")]
    smoothing: usize,

    /// Apply 2x2 box-average denoising
    #[arg(long)]
    denoise: bool,

    /// Restrict to a region: x,y,width,height
    #[arg(long)]
    viewport: Option<String>,

    /// Level adjustments applied after the full computation: index=value
    #[arg(long = "adjust")]
    adjustments: Vec<String>,

    /// Levels to hide
    #[arg(long = "hide", value_delimiter = ',')]
    hidden: Vec<usize>,

    /// Base color (hex or name)
    #[arg(long)]
    color: Option<String>,

    /// Display the overlay in a view whose reference pixel is offset by dx,dy
    #[arg(long)]
    view_offset: Option<String>,

    /// Plate scale in arcsec per pixel
    #[arg(long, default_value = "1.0")]
    pixel_scale: f64,

    /// Stroke width of the rendered contours
    #[arg(long, default_value = "1.5")]
    line_width: f32,

    /// Engine configuration (JSON); environment variables are used otherwise
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output PNG path
    #[arg(short, long, default_value = "contours.png")]
    output: PathBuf,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing; RUST_LOG takes precedence over --log-level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if args.json {
        builder.json().init();
    } else {
        builder.init();
    }

    let config = match &args.config {
        Some(path) => {
            let text = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            EngineConfig::from_json(&text)?
        }
        None => EngineConfig::from_env(),
    };
    config.validate().map_err(anyhow::Error::msg)?;

    let pixels = match &args.input {
        Some(path) => read_raw_f32(path, args.width, args.height).await?,
        None => {
            info!(stars = args.stars, seed = args.seed, "Generating synthetic star field");
            synthetic::star_field(args.width, args.height, args.stars, args.seed)
        }
    };

    let levels = if args.levels.is_empty() {
        let (min, max) = data_range(&pixels).context("Image has no finite pixels")?;
        generate_levels(min as f64, max as f64, args.auto_levels)
    } else {
        args.levels.clone()
    };

    let crpix = (args.width as f64 / 2.0, args.height as f64 / 2.0);
    let native: Arc<dyn Projection> = Arc::new(TangentProjection::from_scale(
        crpix,
        SkyCoord::new(83.822, -5.391),
        args.pixel_scale,
        0.0,
    )?);
    let view_projection = match &args.view_offset {
        Some(offset) => {
            let (dx, dy) = parse_pair(offset)?;
            Arc::new(TangentProjection::from_scale(
                (crpix.0 + dx, crpix.1 + dy),
                SkyCoord::new(83.822, -5.391),
                args.pixel_scale,
                0.0,
            )?) as Arc<dyn Projection>
        }
        None => Arc::clone(&native),
    };

    let source: Arc<dyn SourceImage> = Arc::new(RasterImage::new(args.width, args.height, pixels, native));
    let view = Arc::new(ViewState::new(view_projection));

    let mut builder = ContourOverlay::builder(source, view, CanvasSink::new(args.line_width)).config(config);
    if let Some(color) = &args.color {
        let color = Rgba::parse(color).with_context(|| format!("Unknown color '{}'", color))?;
        builder = builder.base_color(color);
    }
    let overlay = builder.build()?;

    let mut request = ContourRequest::new(levels);
    if args.smoothing > 1 {
        request = request.with_smoothing(args.smoothing);
    }
    request = request.with_denoise(args.denoise);
    if let Some(viewport) = &args.viewport {
        request = request.with_viewport(parse_rect(viewport)?);
    }

    info!(levels = ?request.levels, smoothing = args.smoothing, denoise = args.denoise, "Computing contours");
    overlay.compute_all(request)?;
    overlay.wait_ready().await?;

    if !args.adjustments.is_empty() {
        for adjustment in &args.adjustments {
            let (index, value) = parse_adjustment(adjustment)?;
            overlay.stage_adjustment(index, value)?;
        }
        overlay.apply_adjustments()?;
        overlay.wait_ready().await?;
        info!(levels = ?overlay.levels(), "Applied level adjustments");
    }

    for &index in &args.hidden {
        if let Err(e) = overlay.set_visible(index, false) {
            warn!(index, error = %e, "Cannot hide level");
        }
    }

    let (width, height) = (args.width as u32, args.height as u32);
    let png = overlay.with_sink(|sink| sink.render_png(width, height))?;
    tokio::fs::write(&args.output, &png)
        .await
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    let segments = overlay.with_sink(|sink| sink.segment_count());
    info!(
        path = %args.output.display(),
        bytes = png.len(),
        segments,
        "Wrote contour overlay"
    );

    Ok(())
}

/// Read a `width x height` raw little-endian float32 image.
async fn read_raw_f32(path: &Path, width: usize, height: usize) -> Result<Vec<f32>> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    decode_f32_le(&bytes, width, height)
}

fn decode_f32_le(bytes: &[u8], width: usize, height: usize) -> Result<Vec<f32>> {
    let expected = width * height * 4;
    if bytes.len() != expected {
        bail!(
            "expected {} bytes for a {}x{} float32 image, found {}",
            expected,
            width,
            height,
            bytes.len()
        );
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

fn parse_pair(s: &str) -> Result<(f64, f64)> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != 2 {
        bail!("expected dx,dy, got '{}'", s);
    }
    Ok((parts[0].parse()?, parts[1].parse()?))
}

fn parse_rect(s: &str) -> Result<PixelRect> {
    let parts = s
        .split(',')
        .map(|p| p.trim().parse::<i64>())
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Invalid viewport '{}'", s))?;
    match parts.as_slice() {
        [x, y, w, h] => Ok(PixelRect::new(*x, *y, *w, *h)),
        _ => bail!("expected x,y,width,height, got '{}'", s),
    }
}

fn parse_adjustment(s: &str) -> Result<(usize, f64)> {
    let (index, value) = s
        .split_once('=')
        .with_context(|| format!("expected index=value, got '{}'", s))?;
    Ok((index.trim().parse()?, value.trim().parse()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_adjustment() {
        assert_eq!(parse_adjustment("2=45.5").unwrap(), (2, 45.5));
        assert!(parse_adjustment("2").is_err());
        assert!(parse_adjustment("x=1").is_err());
    }

    #[test]
    fn test_parse_rect() {
        assert_eq!(parse_rect("10, 20, 30, 40").unwrap(), PixelRect::new(10, 20, 30, 40));
        assert!(parse_rect("1,2,3").is_err());
    }

    #[test]
    fn test_parse_pair() {
        assert_eq!(parse_pair("1.5,-2").unwrap(), (1.5, -2.0));
    }

    #[tokio::test]
    async fn test_read_raw_f32() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for v in [1.0f32, 2.5, -3.0, f32::NAN] {
            file.write_all(&v.to_le_bytes()).unwrap();
        }

        let data = read_raw_f32(file.path(), 2, 2).await.unwrap();
        assert_eq!(&data[..3], &[1.0, 2.5, -3.0]);
        assert!(data[3].is_nan());

        assert!(read_raw_f32(file.path(), 3, 2).await.is_err());
    }
}
