//! Console rendering of the terrain grid.
//!
//! Maps elevation bands onto a character ramp for quick inspection without
//! opening the exported image. Cells holding standing water render as `~`.

use crate::tilemap::Tilemap;

pub const RAMP: &[u8] = b" .,:;=+*#%@";

/// Render the grids as one character per cell, rows separated by newlines.
pub fn render_ascii(elevation: &Tilemap<u8>, water: &Tilemap<u32>, max_elevation: u8) -> String {
    let last = RAMP.len() - 1;
    let scale = max_elevation.max(1) as usize;
    let mut out = String::with_capacity((elevation.width + 1) * elevation.height);
    for y in 0..elevation.height {
        for x in 0..elevation.width {
            if *water.get(x, y) > 0 {
                out.push('~');
            } else {
                let e = *elevation.get(x, y) as usize;
                out.push(RAMP[(e * last / scale).min(last)] as char);
            }
        }
        out.push('\n');
    }
    out
}

/// Dump the map to stdout.
pub fn print_map(elevation: &Tilemap<u8>, water: &Tilemap<u32>, max_elevation: u8) {
    print!("{}", render_ascii(elevation, water, max_elevation));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_shape() {
        let elevation = Tilemap::new_with(5, 3, 0u8);
        let water = Tilemap::new_with(5, 3, 0u32);
        let text = render_ascii(&elevation, &water, 10);
        assert_eq!(text.lines().count(), 3);
        assert!(text.lines().all(|line| line.len() == 5));
    }

    #[test]
    fn test_peak_uses_last_ramp_char() {
        let mut elevation = Tilemap::new_with(3, 3, 0u8);
        elevation.set(1, 1, 20);
        let water = Tilemap::new_with(3, 3, 0u32);
        let text = render_ascii(&elevation, &water, 20);
        assert_eq!(text.lines().nth(1).unwrap().chars().nth(1).unwrap(), '@');
    }

    #[test]
    fn test_water_overrides_elevation() {
        let mut elevation = Tilemap::new_with(3, 1, 9u8);
        elevation.set(2, 0, 9);
        let mut water = Tilemap::new_with(3, 1, 0u32);
        water.set(0, 0, 2);
        let text = render_ascii(&elevation, &water, 9);
        assert!(text.starts_with('~'));
        assert_ne!(text.chars().nth(1).unwrap(), '~');
    }
}
