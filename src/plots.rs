//! Actual-vs-predicted diagnostics.
//!
//! Two scatter plots for one trial: solar coloured by temperature and wind
//! coloured by windspeed, each with a fixed colour range and a colour bar.
//! Charts are written as SVG via plotters (optional `plots` feature).

use std::path::{Path, PathBuf};

#[cfg(feature = "plots")]
use plotters::prelude::*;

use crate::data::Matrix;
use crate::error::{PipelineError, Result};
use crate::training::TrialResult;

/// "ice" sequential palette, dark to light.
const ICE: [(u8, u8, u8); 12] = [
    (3, 5, 18),
    (25, 25, 51),
    (44, 42, 87),
    (58, 60, 125),
    (62, 83, 160),
    (62, 109, 178),
    (72, 134, 187),
    (89, 159, 196),
    (114, 184, 205),
    (149, 207, 216),
    (192, 229, 232),
    (234, 252, 253),
];

/// What one scatter chart shows.
#[derive(Debug, Clone, PartialEq)]
pub struct ScatterChart {
    pub file_name: &'static str,
    /// Target column plotted on both axes
    pub target: &'static str,
    /// Feature column driving point colour
    pub color_by: &'static str,
    pub color_range: (f64, f64),
    pub x_label: &'static str,
    pub y_label: &'static str,
}

/// Solar output coloured by temperature, range [-5, 25].
pub const SOLAR_SCATTER: ScatterChart = ScatterChart {
    file_name: "solar_scatter.svg",
    target: "solar_GW",
    color_by: "temperature",
    color_range: (-5.0, 25.0),
    x_label: "Actual Solar",
    y_label: "Predicted Solar",
};

/// Wind output coloured by windspeed, range [0, 8].
pub const WIND_SCATTER: ScatterChart = ScatterChart {
    file_name: "wind_scatter.svg",
    target: "wind_GW",
    color_by: "windspeed",
    color_range: (0.0, 8.0),
    x_label: "Actual Wind",
    y_label: "Predicted Wind",
};

/// Map `value` onto the ice palette over `[lo, hi]`, clamping outside it.
pub fn ice_color(value: f64, (lo, hi): (f64, f64)) -> (u8, u8, u8) {
    let t = if hi > lo && value.is_finite() {
        ((value - lo) / (hi - lo)).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let pos = t * (ICE.len() - 1) as f64;
    let i = (pos.floor() as usize).min(ICE.len() - 2);
    let frac = pos - i as f64;
    let (a, b) = (ICE[i], ICE[i + 1]);
    let lerp = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * frac).round() as u8;
    (lerp(a.0, b.0), lerp(a.1, b.1), lerp(a.2, b.2))
}

/// Points of one chart: (actual, predicted, colour value).
#[derive(Debug, Clone, PartialEq)]
pub struct ScatterData {
    pub points: Vec<(f64, f64, f64)>,
}

impl ScatterData {
    pub fn collect(
        chart: &ScatterChart,
        x_test: &Matrix,
        y_test: &Matrix,
        predictions: &Matrix,
    ) -> Result<Self> {
        let actual = y_test.column(chart.target)?;
        let predicted = predictions.column(chart.target)?;
        let color = x_test.column(chart.color_by)?;
        if actual.len() != predicted.len() || actual.len() != color.len() {
            return Err(PipelineError::ShapeMismatch(format!(
                "{} plot: {} actual, {} predicted, {} colour values",
                chart.target,
                actual.len(),
                predicted.len(),
                color.len()
            )));
        }

        let points = actual
            .into_iter()
            .zip(predicted)
            .zip(color)
            .map(|((a, p), c)| (a, p, c))
            .collect();
        Ok(Self { points })
    }

    /// Shared axis range covering both actual and predicted values.
    pub fn axis_range(&self) -> (f64, f64) {
        let (lo, hi) = self
            .points
            .iter()
            .flat_map(|(a, p, _)| [*a, *p])
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });
        if !lo.is_finite() || !hi.is_finite() {
            return (0.0, 1.0);
        }
        let pad = ((hi - lo) * 0.05).max(1e-3);
        (lo - pad, hi + pad)
    }
}

/// Render both diagnostics for `trial` into `out_dir`; returns the written
/// paths in plot order (solar, wind).
#[cfg(feature = "plots")]
pub fn render_diagnostics(
    trial: &TrialResult,
    x_test: &Matrix,
    y_test: &Matrix,
    out_dir: &Path,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(out_dir)?;

    [SOLAR_SCATTER, WIND_SCATTER]
        .iter()
        .map(|chart| {
            let data = ScatterData::collect(chart, x_test, y_test, &trial.predictions)?;
            let path = out_dir.join(chart.file_name);
            render_scatter(chart, &data, &path)?;
            tracing::info!(
                path = %path.display(),
                trial = trial.index,
                points = data.points.len(),
                "diagnostic plot written"
            );
            Ok(path)
        })
        .collect()
}

#[cfg(feature = "plots")]
fn render_scatter(chart: &ScatterChart, data: &ScatterData, path: &Path) -> Result<()> {
    draw_scatter(chart, data, path).map_err(|e| PipelineError::Plot(e.to_string()))
}

#[cfg(feature = "plots")]
fn draw_scatter(
    layout: &ScatterChart,
    data: &ScatterData,
    path: &Path,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let root = SVGBackend::new(path, (900, 700)).into_drawing_area();
    root.fill(&WHITE)?;

    let (plot_area, bar_area) = root.split_horizontally(790);
    let (lo, hi) = data.axis_range();

    let mut chart = ChartBuilder::on(&plot_area)
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(60)
        .build_cartesian_2d(lo..hi, lo..hi)?;

    chart
        .configure_mesh()
        .x_desc(layout.x_label)
        .y_desc(layout.y_label)
        .draw()?;

    chart.draw_series(data.points.iter().map(|&(a, p, c)| {
        let (r, g, b) = ice_color(c, layout.color_range);
        Circle::new((a, p), 3, RGBColor(r, g, b).mix(0.8).filled())
    }))?;

    // Colour bar
    let (c_lo, c_hi) = layout.color_range;
    let mut bar = ChartBuilder::on(&bar_area)
        .margin_top(15)
        .margin_bottom(60)
        .margin_right(10)
        .y_label_area_size(45)
        .caption(layout.color_by, ("sans-serif", 14))
        .build_cartesian_2d(0.0..1.0, c_lo..c_hi)?;

    bar.configure_mesh()
        .disable_mesh()
        .disable_x_axis()
        .y_labels(6)
        .draw()?;

    let steps = 100;
    let step = (c_hi - c_lo) / steps as f64;
    bar.draw_series((0..steps).map(|i| {
        let v0 = c_lo + i as f64 * step;
        let (r, g, b) = ice_color(v0 + step / 2.0, layout.color_range);
        Rectangle::new([(0.0, v0), (1.0, v0 + step)], RGBColor(r, g, b).filled())
    }))?;

    root.present()?;
    Ok(())
}

/// Without the plots feature nothing is written: the inputs are still
/// checked, and the returned path list is empty.
#[cfg(not(feature = "plots"))]
pub fn render_diagnostics(
    trial: &TrialResult,
    x_test: &Matrix,
    y_test: &Matrix,
    out_dir: &Path,
) -> Result<Vec<PathBuf>> {
    for chart in [SOLAR_SCATTER, WIND_SCATTER].iter() {
        ScatterData::collect(chart, x_test, y_test, &trial.predictions)?;
    }
    tracing::warn!(
        out_dir = %out_dir.display(),
        "plotting requires --features plots, no diagnostics written"
    );
    Ok(Vec::new())
}
