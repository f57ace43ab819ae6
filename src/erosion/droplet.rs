//! Water droplet particles and the parallel tick loop.
//!
//! Each tick every droplet reads the shared grids, integrates its velocity,
//! and reports committed cell crossings to the flow mailbox. Droplets never
//! write grid state themselves except the outflow counter `q`.

use std::sync::mpsc::SyncSender;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::erosion::events::ErosionEvent;
use crate::erosion::flow_field::FlowField;
use crate::erosion::height_field::HeightField;
use crate::erosion::params::{
    ATTRACT_FALLOFF, COHESION_DIST_SQ, ENERGY_PER_DROP, SPAWN_ENERGY, SPEED_LIMIT_SQ,
};

#[derive(Clone, Debug)]
pub struct Droplet {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub fall_energy: i32,
    pub trail: Vec<usize>,
}

/// Indices sampled for cohesion this tick: one droplet out of every
/// aligned block of four, rotating through the block lane by lane.
fn cohesion_samples(count: usize, tick: usize) -> impl Iterator<Item = usize> {
    let lane = tick % 4;
    (0..count)
        .step_by(4)
        .map(move |base| base + lane)
        .filter(move |&idx| idx < count)
}

fn clamp_speed(vx: f32, vy: f32) -> (f32, f32) {
    let speed_sq = vx * vx + vy * vy;
    if speed_sq > SPEED_LIMIT_SQ {
        let scale = (speed_sq / SPEED_LIMIT_SQ).sqrt();
        (vx / scale, vy / scale)
    } else {
        (vx, vy)
    }
}

impl Droplet {
    /// Drop a new droplet on a random cell: it lands at the cell center,
    /// adds one unit of standing water there, and starts with a small
    /// random drift plus a fall-energy budget for escaping flats.
    pub fn spawn<R: Rng>(flow: &FlowField, rng: &mut R) -> Self {
        let idx = rng.gen_range(0..flow.len());
        let (x, y) = flow.anchor(idx);
        flow.raise_water(idx);
        let dir = rng.gen::<f64>() * std::f64::consts::TAU;
        Self {
            x,
            y,
            vx: dir.cos() as f32 / 2.0,
            vy: dir.sin() as f32 / 2.0,
            fall_energy: SPAWN_ENERGY,
            trail: vec![idx],
        }
    }

    /// One simulation tick for this droplet. `positions` is the start-of-tick
    /// snapshot of every droplet's position, so cohesion reads a consistent
    /// view while peers move concurrently.
    pub fn step<R: Rng>(
        &mut self,
        heights: &HeightField,
        flow: &FlowField,
        positions: &[(f32, f32)],
        tick: usize,
        rng: &mut R,
        flow_tx: &SyncSender<ErosionEvent>,
    ) {
        let cell_x = self.x.floor() as i32;
        let cell_y = self.y.floor() as i32;
        if cell_x < 0 || cell_x >= flow.width as i32 || cell_y < 0 || cell_y >= flow.height as i32 {
            return;
        }
        let old_idx = cell_y as usize * flow.width + cell_x as usize;

        let (fx, fy) = flow.vector(old_idx);
        self.vx += fx;
        self.vy += fy;
        flow.add_outflow(old_idx);

        for sample in cohesion_samples(positions.len(), tick) {
            let (ox, oy) = positions[sample];
            let dx = ox - self.x;
            let dy = oy - self.y;
            let dist_sq = dx * dx + dy * dy;
            if dist_sq < COHESION_DIST_SQ {
                let pull = dist_sq.sqrt() * ATTRACT_FALLOFF;
                self.vx += dx * pull;
                self.vy += dy * pull;
            }
        }

        // Stranded on a cell with no assigned flow: spend fall energy on a
        // random kick so the droplet can wander off the flat.
        if fx == 0.0 && fy == 0.0 && self.fall_energy > 0 {
            let roll: f32 = rng.gen();
            if roll < 0.5 {
                let dir = (rng.gen::<f64>() - rng.gen::<f64>()) * std::f64::consts::TAU;
                self.vx += dir.cos() as f32 / 4.0;
                self.vy += dir.sin() as f32 / 4.0;
                self.x += rng.gen::<f32>() - roll;
                self.y += rng.gen::<f32>() - roll;
            }
            self.fall_energy -= 1;
        }

        let (vx, vy) = clamp_speed(self.vx, self.vy);
        self.vx = vx;
        self.vy = vy;

        let next_x = self.x + self.vx;
        let next_y = self.y + self.vy;
        let next_cell_x = next_x.floor() as i32;
        let next_cell_y = next_y.floor() as i32;
        if next_cell_x < 0
            || next_cell_x >= flow.width as i32
            || next_cell_y < 0
            || next_cell_y >= flow.height as i32
        {
            return;
        }
        let new_idx = next_cell_y as usize * flow.width + next_cell_x as usize;
        if new_idx == old_idx {
            self.x = next_x;
            self.y = next_y;
            return;
        }

        // Water does not climb: a move to a higher surface is discarded.
        if flow.surface(new_idx, heights) > flow.surface(old_idx, heights) {
            return;
        }

        let e_old = heights.elevation(old_idx) as i32;
        let e_new = heights.elevation(new_idx) as i32;
        self.x = next_x;
        self.y = next_y;
        self.trail.push(new_idx);
        self.fall_energy += (e_old - e_new) * ENERGY_PER_DROP;
        let _ = flow_tx.send(ErosionEvent { old_idx, new_idx });
    }
}

/// Run the full tick loop over the droplet population. Each tick snapshots
/// positions, then steps every droplet in parallel with its own
/// deterministically seeded rng.
pub fn run_ticks(
    droplets: &mut [Droplet],
    heights: &HeightField,
    flow: &FlowField,
    flow_tx: &SyncSender<ErosionEvent>,
    ticks: usize,
    base_seed: u64,
) {
    let n = droplets.len();
    for tick in 1..=ticks {
        let positions: Vec<(f32, f32)> = droplets.iter().map(|d| (d.x, d.y)).collect();
        droplets
            .par_iter_mut()
            .enumerate()
            .for_each_with(flow_tx.clone(), |tx, (i, droplet)| {
                let mut rng =
                    ChaCha8Rng::seed_from_u64(base_seed.wrapping_add((tick * n + i) as u64));
                droplet.step(heights, flow, &positions, tick, &mut rng, tx);
            });
    }
}

/// Drop droplets that ended the run with zero velocity. Returns how many
/// were removed.
pub fn prune_inert(droplets: &mut Vec<Droplet>) -> usize {
    let before = droplets.len();
    droplets.retain(|d| d.vx != 0.0 || d.vy != 0.0);
    before - droplets.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tilemap::Tilemap;
    use std::sync::mpsc;

    fn flat_field(width: usize, height: usize, level: u8) -> (FlowField, HeightField) {
        let map = Tilemap::new_with(width, height, level);
        (FlowField::new(width, height), HeightField::from_tilemap(&map))
    }

    #[test]
    fn test_clamp_speed_preserves_direction() {
        let (vx, vy) = clamp_speed(3.0, 4.0);
        let speed_sq = vx * vx + vy * vy;
        assert!((speed_sq - SPEED_LIMIT_SQ).abs() < 1e-5);
        assert!((vx / vy - 3.0 / 4.0).abs() < 1e-5);

        let (vx, vy) = clamp_speed(0.5, -0.5);
        assert_eq!((vx, vy), (0.5, -0.5));
    }

    #[test]
    fn test_cohesion_samples_cover_all_lanes() {
        let count = 10;
        let mut seen = vec![false; count];
        for tick in 0..4 {
            let samples: Vec<usize> = cohesion_samples(count, tick).collect();
            assert!(samples.len() <= count / 4 + 1);
            for idx in samples {
                assert!(idx < count);
                seen[idx] = true;
            }
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_spawn_raises_water_and_seeds_trail() {
        let (flow, _) = flat_field(8, 8, 3);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let droplet = Droplet::spawn(&flow, &mut rng);

        assert_eq!(droplet.trail.len(), 1);
        assert_eq!(droplet.fall_energy, SPAWN_ENERGY);
        assert_eq!(flow.sum_standing_water(), 1);
        assert_eq!(flow.standing_water(droplet.trail[0]), 1);
        assert_eq!((droplet.x, droplet.y), flow.anchor(droplet.trail[0]));
        let speed = (droplet.vx * droplet.vx + droplet.vy * droplet.vy).sqrt();
        assert!((speed - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_committed_moves_never_climb() {
        let mut rng = ChaCha8Rng::seed_from_u64(41);
        let mut map = Tilemap::new_with(12, 12, 0u8);
        for y in 0..12 {
            for x in 0..12 {
                map.set(x, y, rng.gen_range(0..20));
            }
        }
        let flow = FlowField::new(12, 12);
        let heights = HeightField::from_tilemap(&map);
        flow.assign_vectors(&heights, 3);

        let mut droplets: Vec<Droplet> =
            (0..8).map(|_| Droplet::spawn(&flow, &mut rng)).collect();
        let (tx, rx) = mpsc::sync_channel(10_000);
        run_ticks(&mut droplets, &heights, &flow, &tx, 30, 1234);
        drop(tx);

        // No consumer ran, so surfaces are exactly as they were at commit
        // time for every event.
        let mut count = 0;
        for event in rx {
            assert!(flow.surface(event.new_idx, &heights) <= flow.surface(event.old_idx, &heights));
            count += 1;
        }
        let committed: usize = droplets.iter().map(|d| d.trail.len() - 1).sum();
        assert_eq!(count, committed);
    }

    #[test]
    fn test_prune_inert_keeps_moving_droplets() {
        let (flow, _) = flat_field(6, 6, 2);
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let mut droplets: Vec<Droplet> =
            (0..5).map(|_| Droplet::spawn(&flow, &mut rng)).collect();
        droplets[1].vx = 0.0;
        droplets[1].vy = 0.0;
        droplets[3].vx = 0.0;
        droplets[3].vy = 0.0;

        let removed = prune_inert(&mut droplets);

        assert_eq!(removed, 2);
        assert_eq!(droplets.len(), 3);
        assert!(droplets.iter().all(|d| d.vx != 0.0 || d.vy != 0.0));
    }

    #[test]
    fn test_flat_terrain_exhausts_fall_energy() {
        let (flow, heights) = flat_field(10, 10, 5);
        flow.assign_vectors(&heights, 3);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut droplets = vec![Droplet::spawn(&flow, &mut rng)];

        let (tx, rx) = mpsc::sync_channel(10_000);
        run_ticks(&mut droplets, &heights, &flow, &tx, 5, 77);
        drop(tx);

        // Two ticks of wandering burn the spawn budget, and flat moves grant
        // nothing back.
        assert_eq!(droplets[0].fall_energy, 0);
        assert_eq!(flow.sum_standing_water(), 1);
        let events: Vec<ErosionEvent> = rx.iter().collect();
        assert_eq!(events.len(), droplets[0].trail.len() - 1);
    }
}
