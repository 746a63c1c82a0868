//! PNG rendering of Mantel and classification agreement figures

use crate::grid::Grid;
use crate::mantel::{LinePanel, MantelLayout, Panel};
use anyhow::{anyhow, bail, Result};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::error::Error;
use std::path::Path;

type DrawResult<T> = std::result::Result<T, Box<dyn Error>>;

const PANEL_WIDTH: u32 = 600;
const PANEL_HEIGHT: u32 = 450;
const DASH_PIECES: usize = 8;
const MISSING: RGBColor = RGBColor(225, 225, 225);

/// One contour panel of the agreement figure
#[derive(Debug, Clone)]
pub struct AgreementPanel {
    pub title: String,
    pub grid: Grid,
}

fn genus_color(index: usize) -> RGBColor {
    const PALETTE: [RGBColor; 5] = [
        RGBColor(0, 0, 0),
        RGBColor(128, 128, 128),
        RGBColor(31, 119, 180),
        RGBColor(214, 39, 40),
        RGBColor(44, 160, 44),
    ];
    PALETTE[index % PALETTE.len()]
}

/// Blue (low) to red (high)
fn heat_color(value: f64, lo: f64, hi: f64) -> HSLColor {
    let t = if hi - lo <= 1e-12 {
        0.5
    } else {
        ((value - lo) / (hi - lo)).clamp(0.0, 1.0)
    };
    HSLColor((240.0 - 240.0 * t) / 360.0, 0.90, 0.45)
}

fn padded_range(lo: f64, hi: f64) -> std::ops::Range<f64> {
    if (hi - lo).abs() < 1e-12 {
        (lo - 0.5)..(hi + 0.5)
    } else {
        let pad = (hi - lo) * 0.05;
        (lo - pad)..(hi + pad)
    }
}

/// Split a polyline into alternating on/off pieces
fn dashes(points: &[(f64, f64)]) -> Vec<Vec<(f64, f64)>> {
    let mut pieces = Vec::new();
    for pair in points.windows(2) {
        let ((x0, y0), (x1, y1)) = (pair[0], pair[1]);
        for k in (0..DASH_PIECES).step_by(2) {
            let a = k as f64 / DASH_PIECES as f64;
            let b = (k + 1) as f64 / DASH_PIECES as f64;
            pieces.push(vec![
                (x0 + (x1 - x0) * a, y0 + (y1 - y0) * a),
                (x0 + (x1 - x0) * b, y0 + (y1 - y0) * b),
            ]);
        }
    }
    pieces
}

/// Render the three-row Mantel parameter figure
pub fn render_mantel_figure(path: &Path, layout: &MantelLayout) -> Result<()> {
    if layout.panel_count() == 0 {
        bail!("No Mantel results to plot");
    }
    let columns = layout.rows.iter().map(Vec::len).max().unwrap_or(1).max(1);
    let size = (
        PANEL_WIDTH * columns as u32,
        PANEL_HEIGHT * layout.rows.len() as u32,
    );

    draw_mantel(path, size, layout)
        .map_err(|e| anyhow!("Failed to render {}: {}", path.display(), e))?;
    log::info!("Mantel figure written to {}", path.display());
    Ok(())
}

fn draw_mantel(path: &Path, size: (u32, u32), layout: &MantelLayout) -> DrawResult<()> {
    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;

    let rows = root.split_evenly((layout.rows.len(), 1));
    for (row_area, panels) in rows.iter().zip(&layout.rows) {
        if panels.is_empty() {
            continue;
        }
        let areas = row_area.split_evenly((1, panels.len()));
        for (area, panel) in areas.iter().zip(panels) {
            match panel {
                Panel::Line(line) => draw_line_panel(area, line)?,
                Panel::Contour(contour) => draw_grid_panel(
                    area,
                    &contour.title,
                    &contour.grid,
                    "samples_at_least_threshold",
                    "most_abund_seq_cutoff",
                    false,
                )?,
            }
        }
    }

    root.present()?;
    Ok(())
}

fn draw_line_panel(area: &DrawingArea<BitMapBackend, Shift>, panel: &LinePanel) -> DrawResult<()> {
    let points = panel.lines.iter().flat_map(|l| l.points.iter());
    let (mut x_lo, mut x_hi, mut y_lo, mut y_hi) = (f64::MAX, f64::MIN, f64::MAX, f64::MIN);
    for (x, r) in points {
        x_lo = x_lo.min(*x);
        x_hi = x_hi.max(*x);
        y_lo = y_lo.min(r.coefficient);
        y_hi = y_hi.max(r.coefficient);
    }
    if x_lo > x_hi {
        area.titled(&format!("{} (no data)", panel.title), ("sans-serif", 18))?;
        return Ok(());
    }

    let mut chart = ChartBuilder::on(area)
        .caption(&panel.title, ("sans-serif", 18))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(padded_range(x_lo, x_hi), padded_range(y_lo, y_hi))?;
    chart
        .configure_mesh()
        .x_desc(panel.axis.label())
        .y_desc("Mantel coefficient")
        .draw()?;

    for line in &panel.lines {
        let color = genus_color(line.genus_index);
        let xy: Vec<(f64, f64)> = line.points.iter().map(|(x, r)| (*x, r.coefficient)).collect();
        let mut annotation = if line.dashed {
            chart.draw_series(
                dashes(&xy)
                    .into_iter()
                    .map(|piece| PathElement::new(piece, color.stroke_width(1))),
            )?
        } else {
            chart.draw_series(LineSeries::new(xy.clone(), color.stroke_width(2)))?
        };
        let width = if line.dashed { 1 } else { 2 };
        annotation
            .label(line.label.clone())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 18, y)], color.stroke_width(width)));

        // Hollow markers for results that are not significant
        chart.draw_series(line.points.iter().map(|(x, r)| {
            let style = if r.p_value < 0.05 {
                color.filled()
            } else {
                color.stroke_width(1)
            };
            Circle::new((*x, r.coefficient), 3, style)
        }))?;
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.85))
        .border_style(BLACK.mix(0.4))
        .label_font(("sans-serif", 11))
        .draw()?;
    Ok(())
}

/// Threshold × cutoff grid drawn in index space, one rectangle per cell
fn draw_grid_panel(
    area: &DrawingArea<BitMapBackend, Shift>,
    title: &str,
    grid: &Grid,
    x_desc: &str,
    y_desc: &str,
    mark_best: bool,
) -> DrawResult<()> {
    let (lo, hi) = match grid.value_range() {
        Some(range) => range,
        None => {
            area.titled(&format!("{} (no data)", title), ("sans-serif", 18))?;
            return Ok(());
        }
    };
    let rows = grid.rows();
    let columns = grid.columns();

    let caption = format!("{} [{:.3}, {:.3}]", title, lo, hi);
    let mut chart = ChartBuilder::on(area)
        .caption(caption, ("sans-serif", 18))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0f64..rows.len() as f64, 0f64..columns.len() as f64)?;

    let axis_label = |axis: &[f64], v: f64| -> String {
        let idx = v.floor();
        if idx < 0.0 || idx as usize >= axis.len() || (v - idx - 0.5).abs() > 0.25 {
            String::new()
        } else {
            format!("{}", axis[idx as usize])
        }
    };
    let x_fmt = |x: &f64| axis_label(rows, *x);
    let y_fmt = |y: &f64| axis_label(columns, *y);
    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc(x_desc)
        .y_desc(y_desc)
        .x_labels(rows.len() * 2 + 1)
        .y_labels(columns.len() * 2 + 1)
        .x_label_formatter(&x_fmt)
        .y_label_formatter(&y_fmt)
        .draw()?;

    for i in 0..rows.len() {
        for j in 0..columns.len() {
            let style = match grid.cell(i, j) {
                Some(v) => heat_color(v, lo, hi).filled(),
                None => MISSING.filled(),
            };
            chart.draw_series(std::iter::once(Rectangle::new(
                [(i as f64, j as f64), (i as f64 + 1.0, j as f64 + 1.0)],
                style,
            )))?;
        }
    }

    if mark_best {
        if let Some((x, y, v)) = grid.best() {
            if let (Some(i), Some(j)) = (
                rows.iter().position(|&r| r == x),
                columns.iter().position(|&c| c == y),
            ) {
                let centre = (i as f64 + 0.5, j as f64 + 0.5);
                chart.draw_series(std::iter::once(Cross::new(centre, 6, BLACK.stroke_width(2))))?;
                chart.draw_series(std::iter::once(Text::new(
                    format!("{:.3}", v),
                    (i as f64 + 0.55, j as f64 + 0.55),
                    ("sans-serif", 12),
                )))?;
            }
        }
    }
    Ok(())
}

/// Render one agreement contour per sweep panel, best cell marked
pub fn render_agreement_figure(path: &Path, panels: &[AgreementPanel]) -> Result<()> {
    if panels.is_empty() {
        bail!("No agreement panels to plot");
    }
    let columns = panels.len().min(3);
    let rows = (panels.len() + columns - 1) / columns;
    let size = (PANEL_WIDTH * columns as u32, PANEL_HEIGHT * rows as u32);

    draw_agreement(path, size, (rows, columns), panels)
        .map_err(|e| anyhow!("Failed to render {}: {}", path.display(), e))?;
    log::info!("Agreement figure written to {}", path.display());
    Ok(())
}

fn draw_agreement(
    path: &Path,
    size: (u32, u32),
    shape: (usize, usize),
    panels: &[AgreementPanel],
) -> DrawResult<()> {
    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;

    for (area, panel) in root.split_evenly(shape).iter().zip(panels) {
        draw_grid_panel(
            area,
            &panel.title,
            &panel.grid,
            "samples_at_least_threshold",
            "most_abund_seq_cutoff",
            true,
        )?;
    }

    root.present()?;
    Ok(())
}
