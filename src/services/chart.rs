use std::{path::Path, sync::OnceLock};

use chrono::DateTime;
use plotters::prelude::*;
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::models::{PriceSample, Thresholds};

const SIZE: (u32, u32) = (1024, 576);
const FONT_FAMILY: &str = "sans-serif";
static FONT: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");
static FONT_READY: OnceLock<bool> = OnceLock::new();

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("no samples to plot")]
    NoData,
    #[error("could not create chart file: {0}")]
    TempFile(#[from] std::io::Error),
    #[error("embedded chart font could not be loaded")]
    Font,
    #[error("render failed: {0}")]
    Render(String),
}

fn render_err<E: std::fmt::Display>(e: E) -> ChartError {
    ChartError::Render(e.to_string())
}

/// Plotters has no font of its own with `ab_glyph`; every family we draw with
/// must be registered once per process.
fn ensure_font() -> Result<(), ChartError> {
    let ok = *FONT_READY.get_or_init(|| {
        plotters::style::register_font(FONT_FAMILY, plotters::style::FontStyle::Normal, FONT)
            .is_ok()
    });
    if ok {
        Ok(())
    } else {
        Err(ChartError::Font)
    }
}

fn fmt_time(secs: f64) -> String {
    DateTime::from_timestamp(secs as i64, 0)
        .map(|t| t.format("%d/%m %H:%M").to_string())
        .unwrap_or_default()
}

/// Render `samples` (oldest first) into a PNG temp file. The file is removed
/// when the returned handle is dropped.
pub fn render_to_temp(
    asset: &str,
    samples: &[PriceSample],
    thresholds: &Thresholds,
) -> Result<NamedTempFile, ChartError> {
    let file = tempfile::Builder::new()
        .prefix("pricewatch-")
        .suffix(".png")
        .tempfile()?;
    render_history(asset, samples, thresholds, file.path())?;
    Ok(file)
}

/// Line chart of price over time with the sell and buy targets drawn as
/// horizontal lines.
pub fn render_history(
    asset: &str,
    samples: &[PriceSample],
    thresholds: &Thresholds,
    path: &Path,
) -> Result<(), ChartError> {
    let points: Vec<(f64, f64)> = samples
        .iter()
        .filter(|s| s.price.is_finite())
        .map(|s| (s.observed_at.timestamp() as f64, s.price))
        .collect();
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return Err(ChartError::NoData);
    };

    let (mut x0, mut x1) = (first.0, last.0);
    if x1 <= x0 {
        x0 -= 30.0;
        x1 = x0 + 60.0;
    }

    let (lo, hi) = points.iter().fold(
        (thresholds.buy(), thresholds.sell()),
        |(lo, hi), &(_, p)| (lo.min(p), hi.max(p)),
    );
    let pad = ((hi - lo) * 0.05).max(0.01);
    let (y0, y1) = (lo - pad, hi + pad);

    ensure_font()?;

    let root = BitMapBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(render_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(format!("{asset} - last {} samples", points.len()), (FONT_FAMILY, 24))
        .margin(16)
        .x_label_area_size(36)
        .y_label_area_size(64)
        .build_cartesian_2d(x0..x1, y0..y1)
        .map_err(render_err)?;

    chart
        .configure_mesh()
        .label_style((FONT_FAMILY, 14))
        .x_labels(6)
        .x_label_formatter(&|x| fmt_time(*x))
        .y_label_formatter(&|y| format!("{:.2}", y))
        .draw()
        .map_err(render_err)?;

    chart
        .draw_series(LineSeries::new(points.iter().copied(), &BLUE))
        .map_err(render_err)?;
    chart
        .draw_series(LineSeries::new([(x0, thresholds.sell()), (x1, thresholds.sell())], &RED))
        .map_err(render_err)?;
    chart
        .draw_series(LineSeries::new([(x0, thresholds.buy()), (x1, thresholds.buy())], &GREEN))
        .map_err(render_err)?;

    root.present().map_err(render_err)?;
    Ok(())
}
