//! PNG rendering of the eroded terrain.
//!
//! The base layer colors elevation through a palette (procedural gradient or
//! a column sampled from a template image). Overlays for standing water,
//! outflow traces, flow vectors, droplet trails, and final droplet positions
//! can each be toggled independently.

use chrono::Local;
use image::{ImageBuffer, Rgb, RgbImage};

use crate::erosion::SimulationOutput;

const WATER_SHALLOW: [u8; 3] = [0x50, 0xc0, 0xf0];
const WATER_DEEP: [u8; 3] = [0x00, 0x60, 0xb0];
const TRACE_FAINT: [u8; 3] = [0xb0, 0xd2, 0xeb];
const TRACE_STRONG: [u8; 3] = [0x40, 0x72, 0xcb];
const TRAIL_COLOR: [u8; 3] = [0x99, 0xff, 0xff];
const DROPLET_COLOR: [u8; 3] = [0x50, 0xd6, 0xfe];
const ARROW_COLOR: [u8; 3] = [0x00, 0x00, 0xff];

/// Which layers to draw and how large to draw them.
#[derive(Clone, Debug)]
pub struct RenderOptions {
    pub zoom: usize,
    pub draw_water: bool,
    pub draw_outflow: bool,
    pub draw_vectors: bool,
    pub draw_trails: bool,
    pub draw_droplets: bool,
    pub palette_strip: bool,
    pub arrow_scale: f64,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            zoom: 1,
            draw_water: true,
            draw_outflow: true,
            draw_vectors: false,
            draw_trails: true,
            draw_droplets: true,
            palette_strip: true,
            arrow_scale: 3.0,
        }
    }
}

/// Build the default elevation palette: green lowlands through brown
/// midlands to white peaks.
pub fn procedural_palette(len: usize) -> Vec<[u8; 3]> {
    (0..len)
        .map(|i| {
            let t = i as f32 / (len - 1).max(1) as f32;
            if t < 0.35 {
                let k = t / 0.35;
                [
                    (40.0 + 60.0 * k) as u8,
                    (120.0 + 50.0 * k) as u8,
                    (40.0 + 20.0 * k) as u8,
                ]
            } else if t < 0.75 {
                let k = (t - 0.35) / 0.40;
                [
                    (100.0 + 60.0 * k) as u8,
                    (170.0 - 60.0 * k) as u8,
                    (60.0 + 20.0 * k) as u8,
                ]
            } else {
                let k = (t - 0.75) / 0.25;
                [
                    (160.0 + 95.0 * k) as u8,
                    (110.0 + 145.0 * k) as u8,
                    (80.0 + 175.0 * k) as u8,
                ]
            }
        })
        .collect()
}

/// Sample a palette from the first pixel column of a template image,
/// bottom row first so low elevations take the bottom colors.
pub fn load_palette(path: &str) -> Result<Vec<[u8; 3]>, image::ImageError> {
    let img = image::open(path)?.to_rgb8();
    let height = img.height();
    Ok((0..height)
        .map(|i| {
            let p = img.get_pixel(0, height - 1 - i);
            [p[0], p[1], p[2]]
        })
        .collect())
}

/// Output path `dir/stem-<YYYYmmdd-HHMMSS>.png`.
pub fn timestamped_path(dir: &str, stem: &str) -> String {
    format!("{}/{}-{}.png", dir, stem, Local::now().format("%Y%m%d-%H%M%S"))
}

fn lerp(a: [u8; 3], b: [u8; 3], t: f32) -> [u8; 3] {
    let t = t.clamp(0.0, 1.0);
    [
        (a[0] as f32 + (b[0] as f32 - a[0] as f32) * t) as u8,
        (a[1] as f32 + (b[1] as f32 - a[1] as f32) * t) as u8,
        (a[2] as f32 + (b[2] as f32 - a[2] as f32) * t) as u8,
    ]
}

fn shade(palette: &[[u8; 3]], value: f32, max_color: f32) -> Rgb<u8> {
    let last = palette.len() - 1;
    let idx = (last as f32 * (value / max_color.max(1.0))).clamp(0.0, last as f32) as usize;
    Rgb(palette[idx])
}

fn put_dot(img: &mut RgbImage, px: i64, py: i64, color: Rgb<u8>) {
    if px >= 0 && py >= 0 && (px as u32) < img.width() && (py as u32) < img.height() {
        img.put_pixel(px as u32, py as u32, color);
    }
}

/// Stepped line from `start` to `dest`; the final pixel takes `tip` so
/// arrows end in the terrain color of their source cell.
fn line_to(img: &mut RgbImage, start: (i64, i64), dest: (i64, i64), color: Rgb<u8>, tip: Rgb<u8>) {
    let steps = (dest.0 - start.0).abs().max((dest.1 - start.1).abs()).max(1);
    for i in 0..=steps {
        let x = start.0 + (dest.0 - start.0) * i / steps;
        let y = start.1 + (dest.1 - start.1) * i / steps;
        let c = if i == steps { tip } else { color };
        put_dot(img, x, y, c);
    }
}

/// Render the simulation output into an RGB image.
pub fn render_map(
    output: &SimulationOutput,
    palette: &[[u8; 3]],
    max_color: f32,
    opts: &RenderOptions,
) -> RgbImage {
    let width = output.elevation.width;
    let height = output.elevation.height;
    let zoom = opts.zoom.max(1);
    let mut img: RgbImage = ImageBuffer::new((width * zoom) as u32, (height * zoom) as u32);

    for y in 0..height {
        for x in 0..width {
            let color = shade(palette, *output.elevation.get(x, y) as f32, max_color);
            for zy in 0..zoom {
                for zx in 0..zoom {
                    img.put_pixel((x * zoom + zx) as u32, (y * zoom + zy) as u32, color);
                }
            }
        }
    }

    if opts.draw_water {
        for (x, y, &depth) in output.standing_water.iter() {
            if depth > 0 {
                let t = depth.min(5) as f32 / 5.0;
                let px = (x * zoom + zoom / 2) as i64 + 1;
                let py = (y * zoom + zoom / 2) as i64;
                put_dot(&mut img, px, py, Rgb(lerp(WATER_SHALLOW, WATER_DEEP, t)));
            }
        }
    }

    if opts.draw_outflow {
        for (x, y, &q) in output.outflow.iter() {
            if q > 0 {
                let t = q.min(50) as f32 / 50.0;
                let px = (x * zoom + zoom / 2) as i64 + 1;
                let py = (y * zoom + zoom / 2) as i64;
                put_dot(&mut img, px, py, Rgb(lerp(TRACE_FAINT, TRACE_STRONG, t)));
            }
        }
    }

    if opts.draw_vectors {
        let stride = (4 / zoom).max(1);
        for (x, y, &(fx, fy)) in output.flow_vectors.iter() {
            if (fx == 0.0 && fy == 0.0) || x % stride != 0 || y % stride != 0 {
                continue;
            }
            let sx = (x * zoom + zoom / 2) as i64;
            let sy = (y * zoom + zoom / 2) as i64;
            let dx = sx + (fx as f64 * zoom as f64 * opts.arrow_scale) as i64;
            let dy = sy + (fy as f64 * zoom as f64 * opts.arrow_scale) as i64;
            let tip = shade(palette, *output.elevation.get(x, y) as f32, max_color);
            line_to(&mut img, (sx, sy), (dx, dy), Rgb(ARROW_COLOR), tip);
        }
    }

    for droplet in &output.droplets {
        if opts.draw_trails {
            for &idx in &droplet.trail {
                let px = ((idx % width) * zoom + zoom / 2) as i64;
                let py = ((idx / width) * zoom + zoom / 2) as i64;
                put_dot(&mut img, px, py, Rgb(TRAIL_COLOR));
            }
        }
        if opts.draw_droplets {
            let px = (droplet.x.floor() as i64) * zoom as i64 + (zoom / 2) as i64;
            let py = (droplet.y.floor() as i64) * zoom as i64 + (zoom / 2) as i64;
            put_dot(&mut img, px, py, Rgb(DROPLET_COLOR));
        }
    }

    if opts.palette_strip {
        let img_w = img.width() as i64;
        let rows = palette.len().min(img.height() as usize);
        for i in 0..rows {
            let c = palette[palette.len() - 1 - i];
            for wi in 0..5 {
                put_dot(&mut img, img_w - 1 - wi, i as i64, Rgb(c));
            }
        }
        for wi in 0..5 {
            put_dot(&mut img, img_w - 1 - wi, rows as i64, Rgb([255, 255, 255]));
        }
    }

    img
}

/// Render and save in one step.
pub fn export_map(
    output: &SimulationOutput,
    palette: &[[u8; 3]],
    max_color: f32,
    opts: &RenderOptions,
    path: &str,
) -> Result<(), image::ImageError> {
    let img = render_map(output, palette, max_color, opts);
    img.save(path)
}
