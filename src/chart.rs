//! PNG bar chart of an emotion distribution.
//!
//! The chart is derived output, regenerated on every summary view. The y axis
//! is fixed to [0, 1] so charts from different days compare directly.

use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

pub const CHART_WIDTH: u32 = 600;
pub const CHART_HEIGHT: u32 = 400;

const MARGIN: u32 = 40;
const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const AXIS: Rgb<u8> = Rgb([64, 64, 64]);
const GRID: Rgb<u8> = Rgb([225, 225, 225]);
const BAR: Rgb<u8> = Rgb([0x6C, 0x63, 0xFF]);

/// Render the distribution as a bar chart image, one bar per label in label order
pub fn render_distribution_chart(distribution: &BTreeMap<String, f64>) -> RgbImage {
    let mut img = RgbImage::from_pixel(CHART_WIDTH, CHART_HEIGHT, BACKGROUND);

    let plot_left = MARGIN as i32;
    let plot_top = (MARGIN / 2) as i32;
    let plot_width = CHART_WIDTH - MARGIN - MARGIN / 2;
    let plot_height = CHART_HEIGHT - MARGIN - MARGIN / 2;
    let plot_bottom = plot_top + plot_height as i32;

    // Quarter gridlines
    for step in 1..4 {
        let y = plot_bottom as f32 - plot_height as f32 * step as f32 / 4.0;
        draw_line_segment_mut(
            &mut img,
            (plot_left as f32, y),
            ((plot_left + plot_width as i32) as f32, y),
            GRID,
        );
    }

    if !distribution.is_empty() {
        // Slots narrower than a pixel overlap rather than spill past the plot
        let slot = plot_width as f64 / distribution.len() as f64;
        let bar_width = (slot * 2.0 / 3.0).floor().max(1.0);

        for (i, share) in distribution.values().enumerate() {
            let share = share.clamp(0.0, 1.0);
            let bar_height = (share * plot_height as f64).round() as u32;
            if bar_height == 0 {
                continue;
            }
            let offset = (i as f64 * slot + (slot - bar_width) / 2.0).max(0.0);
            let x = plot_left + offset.round() as i32;
            let y = plot_bottom - bar_height as i32;
            draw_filled_rect_mut(
                &mut img,
                Rect::at(x, y).of_size(bar_width as u32, bar_height),
                BAR,
            );
        }
    }

    draw_hollow_rect_mut(
        &mut img,
        Rect::at(plot_left, plot_top).of_size(plot_width, plot_height),
        AXIS,
    );

    img
}

/// Render and write the chart as PNG, creating parent directories
pub fn save_distribution_chart(distribution: &BTreeMap<String, f64>, output_path: &Path) -> Result<()> {
    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create chart directory {:?}", parent))?;
    }

    let img = render_distribution_chart(distribution);
    img.save_with_format(output_path, image::ImageFormat::Png)
        .with_context(|| format!("Failed to write chart to {:?}", output_path))?;

    debug!(
        "Saved distribution chart ({} labels) to {:?}",
        distribution.len(),
        output_path
    );
    Ok(())
}
