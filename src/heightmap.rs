//! Terrain seeding: random hills, basins, ridge chains, and scattered bumps
//! rasterized into the initial elevation grid.

use std::f64::consts::TAU;
use std::fs;
use std::path::Path;

use rand::Rng;
use rayon::prelude::*;
use serde::Deserialize;

use crate::tilemap::Tilemap;

/// Median hill peak height; individual hills vary around it.
pub const HILL_HEIGHT_MEDIAN: i32 = 5;
/// Median ridge segment height.
pub const RIDGE_HEIGHT_MEDIAN: i32 = 7;

/// Angular modulation of a hill's footprint radius.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct PetalParams {
    /// 0 = plain circle, 1 = pointed lobes, 2 = round lobes, 3 = full lobes
    pub shape: u8,
    /// Number of lobes around the footprint
    pub lobes: f64,
    /// 0.0-1.0, how deeply the lobes cut into the circle
    pub sharpness: f64,
}

impl Default for PetalParams {
    fn default() -> Self {
        Self {
            shape: 2,
            lobes: 3.0,
            sharpness: 0.5,
        }
    }
}

/// A single terrain feature: a raised (or sunken, when `height` is negative)
/// mound with a lobed footprint.
#[derive(Clone, Copy, Debug)]
pub struct Hill {
    pub x: i32,
    pub y: i32,
    pub radius: i32,
    pub height: i32,
    pub tilt_dir: f64,
    pub tilt_len: i32,
}

impl Hill {
    /// Footprint radius as seen from (x, y): the plain radius modulated by
    /// the petal shape around `tilt_dir`. Never exceeds `self.radius`.
    pub fn petal_radius(&self, x: i32, y: i32, petal: &PetalParams) -> i32 {
        let diff_dir = ((y - self.y) as f64).atan2((x - self.x) as f64) - self.tilt_dir;
        let dist = match petal.shape {
            1 => 1.0 - (diff_dir * petal.lobes / 2.0).sin().abs() * petal.sharpness,
            2 => 1.0 - ((diff_dir * petal.lobes).sin() + 1.0) / 2.0 * petal.sharpness,
            3 => 1.0 - (1.0 - (diff_dir * petal.lobes / 2.0).sin().abs()) * petal.sharpness,
            _ => return self.radius,
        };
        (dist * self.radius as f64) as i32
    }
}

/// One batch of same-kind features in a layout.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct FeatureBatch {
    pub num: usize,
    pub wide: usize,
    pub len: usize,
}

/// A group of feature batches sharing one petal shape.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct FeatureGroup {
    pub list: Vec<FeatureBatch>,
    pub petal: PetalParams,
}

impl FeatureGroup {
    pub fn to_hills<R: Rng>(&self, width: usize, height: usize, rng: &mut R) -> Vec<Hill> {
        let mut hills = Vec::new();
        for batch in &self.list {
            hills.extend(make_hills(width, height, batch.wide, batch.num, rng));
        }
        hills
    }

    pub fn to_ridges<R: Rng>(&self, width: usize, height: usize, rng: &mut R) -> Vec<Hill> {
        let mut hills = Vec::new();
        for batch in &self.list {
            for _ in 0..batch.num {
                hills.extend(make_ridge(batch.len, batch.wide, width, height, rng));
            }
        }
        hills
    }
}

/// Terrain layout: hills, ridge chains, and flattening "stuck" zones.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub hill_group: FeatureGroup,
    pub ridge_group: FeatureGroup,
    pub stuck_group: FeatureGroup,
}

impl LayoutConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        let config: LayoutConfig = serde_json::from_str(&content)?;
        Ok(config)
    }
}

/// Random unit direction.
pub fn random_dir<R: Rng>(rng: &mut R) -> (f32, f32) {
    let dir = rng.gen::<f64>() * TAU;
    (dir.cos() as f32, dir.sin() as f32)
}

/// Place `num` random hills away from the map border. Every third hill is
/// inverted into a basin.
pub fn make_hills<R: Rng>(
    width: usize,
    height: usize,
    hill_wide: usize,
    num: usize,
    rng: &mut R,
) -> Vec<Hill> {
    let width_edge = (width / 9) as i32;
    let height_edge = (height / 9) as i32;
    let wide = hill_wide.max(1) as i32;
    let mut hills = Vec::with_capacity(num);
    for i in 0..num {
        let mut hill = Hill {
            x: rng.gen_range(0..(width as i32 - width_edge * 2).max(1)) + width_edge,
            y: rng.gen_range(0..(height as i32 - height_edge * 2).max(1)) + height_edge,
            height: rng.gen_range(0..HILL_HEIGHT_MEDIAN) + HILL_HEIGHT_MEDIAN / 2,
            tilt_dir: rng.gen::<f64>() * TAU,
            tilt_len: rng.gen_range(1..=20),
            radius: (rng.gen_range(0..wide * wide + 1) as f64).sqrt() as i32,
        };
        if i % 3 == 1 {
            hill.height = -hill.height;
        }
        hills.push(hill);
    }
    hills
}

/// Build a ridge as a chain of hills stepped along a drifting base direction,
/// keeping every segment center on the map.
pub fn make_ridge<R: Rng>(
    ridge_len: usize,
    ridge_wide: usize,
    width: usize,
    height: usize,
    rng: &mut R,
) -> Vec<Hill> {
    let width_edge = (width / 8) as i32;
    let height_edge = (height / 8) as i32;
    let wide = ridge_wide.max(1) as i32;

    let (dir_x, dir_y) = random_dir(rng);
    let toward_x = (dir_x * wide as f32) as i32;
    let toward_y = (dir_y * wide as f32) as i32;

    let mut hills: Vec<Hill> = Vec::with_capacity(ridge_len);
    for i in 0..ridge_len {
        let (x, y) = if i == 0 {
            (
                rng.gen_range(0..(width as i32 - width_edge * 2).max(1)) + width_edge,
                rng.gen_range(0..(height as i32 - height_edge * 2).max(1)) + height_edge,
            )
        } else {
            // Drift perpendicular to the base direction so the crest wanders.
            let prev = &hills[i - 1];
            let wave_y = if toward_x != 0 {
                rng.gen_range(0..toward_x.abs()) - rng.gen_range(0..toward_x.abs())
            } else {
                0
            };
            let wave_x = if toward_y != 0 {
                rng.gen_range(0..toward_y.abs()) - rng.gen_range(0..toward_y.abs())
            } else {
                0
            };
            (
                (prev.x + toward_x / 2 + wave_x).clamp(0, width as i32 - 1),
                (prev.y + toward_y / 2 + wave_y).clamp(0, height as i32 - 1),
            )
        };
        hills.push(Hill {
            x,
            y,
            radius: rng.gen_range(0..wide) / 2 + wide / 2,
            height: rng.gen_range(0..RIDGE_HEIGHT_MEDIAN) + RIDGE_HEIGHT_MEDIAN / 2,
            tilt_dir: rng.gen::<f64>() * TAU,
            tilt_len: rng.gen_range(1..=20),
        });
    }
    hills
}

/// Press hills under stuck zones: alternate stuck zones squash covered
/// features or nudge them up slightly, breaking uniform texture.
pub fn press_stucks(
    hills: &mut [Hill],
    ridges: &mut [Hill],
    stucks: &[Hill],
    stuck_petal: &PetalParams,
) {
    for (si, stuck) in stucks.iter().enumerate() {
        let mut pressed = 0usize;
        for hill in hills.iter_mut().chain(ridges.iter_mut()) {
            let dist_sq = (hill.x - stuck.x).pow(2) + (hill.y - stuck.y).pow(2);
            let stuck_r = stuck.petal_radius(hill.x, hill.y, stuck_petal);
            if dist_sq < stuck_r * stuck_r {
                pressed += 1;
                if si % 2 == 0 {
                    hill.height /= 4;
                } else {
                    hill.height += 2;
                }
            }
        }
        println!(
            "Stuck zone {} pressed {}/{} features",
            si,
            pressed,
            hills.len() + ridges.len()
        );
    }
}

/// Rasterize hills and ridges into a u8 elevation grid. Each feature
/// contributes a peak falling off toward its petal radius; overlapping
/// contributions accumulate, negative sums floor at 0.
pub fn rasterize(
    width: usize,
    height: usize,
    hills: &[Hill],
    hill_petal: &PetalParams,
    ridges: &[Hill],
    ridge_petal: &PetalParams,
) -> Tilemap<u8> {
    let rows: Vec<Vec<u8>> = (0..height)
        .into_par_iter()
        .map(|y| {
            let mut row = Vec::with_capacity(width);
            for x in 0..width {
                let mut level = 0.0f32;
                for (features, petal) in [(ridges, ridge_petal), (hills, hill_petal)] {
                    for hill in features {
                        let dist_sq = (x as i32 - hill.x).pow(2) + (y as i32 - hill.y).pow(2);
                        let r = hill.petal_radius(x as i32, y as i32, petal);
                        if r > 0 && dist_sq <= r * r {
                            let falloff =
                                (dist_sq as f64 / (r * r) as f64).sqrt().sqrt() as f32;
                            level += hill.height as f32 - hill.height as f32 * falloff;
                        }
                    }
                }
                row.push(level.clamp(0.0, u8::MAX as f32) as u8);
            }
            row
        })
        .collect();

    let mut map = Tilemap::new_with(width, height, 0u8);
    for (y, row) in rows.into_iter().enumerate() {
        for (x, value) in row.into_iter().enumerate() {
            map.set(x, y, value);
        }
    }
    map
}

/// Highest seeded elevation, used to scale the render palette.
pub fn max_elevation(map: &Tilemap<u8>) -> u8 {
    map.as_slice()
        .par_iter()
        .copied()
        .reduce(|| 0, u8::max)
        .max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_hill_raises_center_most() {
        let hill = Hill {
            x: 16,
            y: 16,
            radius: 8,
            height: 10,
            tilt_dir: 0.0,
            tilt_len: 1,
        };
        let petal = PetalParams {
            shape: 0,
            ..PetalParams::default()
        };
        let map = rasterize(32, 32, &[hill], &petal, &[], &petal);
        let center = *map.get(16, 16);
        assert!(center > 0);
        for (x, y, &v) in map.iter() {
            assert!(v <= center, "({}, {}) = {} exceeds center {}", x, y, v, center);
        }
        // Cells beyond the footprint stay untouched.
        assert_eq!(*map.get(0, 0), 0);
        assert_eq!(*map.get(31, 31), 0);
    }

    #[test]
    fn test_basin_floors_at_zero() {
        let basin = Hill {
            x: 8,
            y: 8,
            radius: 6,
            height: -10,
            tilt_dir: 0.0,
            tilt_len: 1,
        };
        let petal = PetalParams::default();
        let map = rasterize(16, 16, &[basin], &petal, &[], &petal);
        for (_, _, &v) in map.iter() {
            assert_eq!(v, 0);
        }
    }

    #[test]
    fn test_petal_radius_never_exceeds_base() {
        let hill = Hill {
            x: 0,
            y: 0,
            radius: 20,
            height: 5,
            tilt_dir: 1.3,
            tilt_len: 4,
        };
        for shape in 0..4u8 {
            let petal = PetalParams {
                shape,
                lobes: 4.0,
                sharpness: 0.8,
            };
            for (x, y) in [(5, 0), (0, 7), (-3, -9), (12, 12)] {
                let r = hill.petal_radius(x, y, &petal);
                assert!(r <= hill.radius);
                assert!(r >= 0);
            }
        }
    }

    #[test]
    fn test_make_hills_every_third_is_basin() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let hills = make_hills(100, 100, 10, 9, &mut rng);
        assert_eq!(hills.len(), 9);
        for (i, hill) in hills.iter().enumerate() {
            if i % 3 == 1 {
                assert!(hill.height <= 0);
            } else {
                assert!(hill.height >= 0);
            }
        }
    }

    #[test]
    fn test_ridge_segments_stay_in_bounds() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for _ in 0..10 {
            let ridge = make_ridge(30, 12, 80, 80, &mut rng);
            assert_eq!(ridge.len(), 30);
            for hill in &ridge {
                assert!(hill.x >= 0 && hill.x < 80);
                assert!(hill.y >= 0 && hill.y < 80);
            }
        }
    }

    #[test]
    fn test_max_elevation() {
        let mut map = Tilemap::new_with(8, 8, 0u8);
        map.set(3, 4, 17);
        assert_eq!(max_elevation(&map), 17);
        let flat = Tilemap::new_with(4, 4, 0u8);
        assert_eq!(max_elevation(&flat), 1);
    }

    #[test]
    fn test_layout_config_parses() {
        let json = r#"{
            "hill_group": {
                "list": [{ "num": 40, "wide": 12 }],
                "petal": { "shape": 2, "lobes": 4.0, "sharpness": 0.6 }
            },
            "ridge_group": {
                "list": [{ "num": 0, "wide": 8, "len": 20 }]
            }
        }"#;
        let config: LayoutConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.hill_group.list[0].num, 40);
        assert_eq!(config.hill_group.petal.shape, 2);
        assert_eq!(config.ridge_group.list[0].len, 20);
        assert!(config.stuck_group.list.is_empty());
    }
}
