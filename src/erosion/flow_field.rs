//! Per-cell water state: flow-direction vectors, standing water, and the
//! cumulative outflow counter, plus the vector-assignment passes and the
//! flow-side erosion consumer.
//!
//! Vectors and counters live in atomics so droplet tasks can read them while
//! the consumer thread rewrites them. Only the consumer (and the one-shot
//! assignment before any droplet moves) writes vectors and water levels;
//! `q` is the single field droplet tasks increment directly.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::mpsc::{Receiver, SyncSender};
use std::sync::Arc;

use crate::erosion::events::ErosionEvent;
use crate::erosion::height_field::HeightField;
use crate::tilemap::{Tilemap, RING2_OFFSETS, RING3_OFFSETS};

/// Weight of the inner 8-neighbor ring relative to the outer ring.
const INNER_RING_WEIGHT: i32 = 4;

fn pack_vector(fx: f32, fy: f32) -> u64 {
    ((fx.to_bits() as u64) << 32) | fy.to_bits() as u64
}

fn unpack_vector(bits: u64) -> (f32, f32) {
    (
        f32::from_bits((bits >> 32) as u32),
        f32::from_bits(bits as u32),
    )
}

/// One water cell: immutable anchor at the cell center, a unit-or-zero flow
/// vector, standing-water depth, and the historical outflow count.
pub struct WaterCell {
    anchor_x: f32,
    anchor_y: f32,
    vector: AtomicU64,
    standing: AtomicU32,
    outflow: AtomicU32,
}

pub struct FlowField {
    pub width: usize,
    pub height: usize,
    cells: Vec<WaterCell>,
}

impl FlowField {
    pub fn new(width: usize, height: usize) -> Self {
        let mut cells = Vec::with_capacity(width * height);
        for idx in 0..width * height {
            cells.push(WaterCell {
                anchor_x: (idx % width) as f32 + 0.5,
                anchor_y: (idx / width) as f32 + 0.5,
                vector: AtomicU64::new(pack_vector(0.0, 0.0)),
                standing: AtomicU32::new(0),
                outflow: AtomicU32::new(0),
            });
        }
        Self {
            width,
            height,
            cells,
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn anchor(&self, idx: usize) -> (f32, f32) {
        (self.cells[idx].anchor_x, self.cells[idx].anchor_y)
    }

    pub fn vector(&self, idx: usize) -> (f32, f32) {
        unpack_vector(self.cells[idx].vector.load(Ordering::Relaxed))
    }

    fn set_vector(&self, idx: usize, fx: f32, fy: f32) {
        self.cells[idx].vector.store(pack_vector(fx, fy), Ordering::Relaxed);
    }

    pub fn standing_water(&self, idx: usize) -> u32 {
        self.cells[idx].standing.load(Ordering::Relaxed)
    }

    pub fn raise_water(&self, idx: usize) {
        self.cells[idx].standing.fetch_add(1, Ordering::Relaxed);
    }

    /// Drop one unit of standing water, stopping at zero.
    pub fn lower_water(&self, idx: usize) {
        let _ = self.cells[idx]
            .standing
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| v.checked_sub(1));
    }

    pub fn outflow(&self, idx: usize) -> u32 {
        self.cells[idx].outflow.load(Ordering::Relaxed)
    }

    /// Count one departure from this cell. Called directly from concurrent
    /// droplet tasks, hence the atomic add.
    pub fn add_outflow(&self, idx: usize) {
        self.cells[idx].outflow.fetch_add(1, Ordering::Relaxed);
    }

    /// Local surface height: bedrock elevation plus standing water.
    pub fn surface(&self, idx: usize, heights: &HeightField) -> i64 {
        heights.elevation(idx) as i64 + self.standing_water(idx) as i64
    }

    pub fn sum_standing_water(&self) -> u64 {
        self.cells
            .iter()
            .map(|c| c.standing.load(Ordering::Relaxed) as u64)
            .sum()
    }

    /// Copy the current standing-water depths into a plain grid.
    pub fn water_snapshot(&self) -> Tilemap<u32> {
        let mut map = Tilemap::new_with(self.width, self.height, 0u32);
        for idx in 0..self.cells.len() {
            let (x, y) = (idx % self.width, idx / self.width);
            map.set(x, y, self.standing_water(idx));
        }
        map
    }

    /// Copy the current flow vectors into a plain grid.
    pub fn vector_snapshot(&self) -> Tilemap<(f32, f32)> {
        let mut map = Tilemap::new_with(self.width, self.height, (0.0f32, 0.0f32));
        for idx in 0..self.cells.len() {
            let (x, y) = (idx % self.width, idx / self.width);
            map.set(x, y, self.vector(idx));
        }
        map
    }

    /// Copy the cumulative outflow counts into a plain grid.
    pub fn outflow_snapshot(&self) -> Tilemap<u32> {
        let mut map = Tilemap::new_with(self.width, self.height, 0u32);
        for idx in 0..self.cells.len() {
            let (x, y) = (idx % self.width, idx / self.width);
            map.set(x, y, self.outflow(idx));
        }
        map
    }

    /// Sum of the offsets toward the best-scoring in-bounds neighbors.
    /// Ties all contribute, so opposing ties cancel out.
    fn ring_bias<F>(&self, x: i32, y: i32, offsets: &[(i32, i32)], score: F, pick_max: bool) -> (i32, i32)
    where
        F: Fn(usize) -> i64,
    {
        let mut best: Option<i64> = None;
        let mut sum = (0i32, 0i32);
        for &(dx, dy) in offsets {
            let nx = x + dx;
            let ny = y + dy;
            if nx < 0 || nx >= self.width as i32 || ny < 0 || ny >= self.height as i32 {
                continue;
            }
            let value = score(ny as usize * self.width + nx as usize);
            let better = match best {
                None => true,
                Some(b) => {
                    if pick_max {
                        value > b
                    } else {
                        value < b
                    }
                }
            };
            if better {
                best = Some(value);
                sum = (dx, dy);
            } else if best == Some(value) {
                sum.0 += dx;
                sum.1 += dy;
            }
        }
        sum
    }

    fn bias_at<F>(&self, idx: usize, ring_depth: usize, score: &F, pick_max: bool) -> (i32, i32)
    where
        F: Fn(usize) -> i64,
    {
        let x = (idx % self.width) as i32;
        let y = (idx / self.width) as i32;
        let inner = self.ring_bias(x, y, &RING2_OFFSETS, score, pick_max);
        let mut bias = (inner.0 * INNER_RING_WEIGHT, inner.1 * INNER_RING_WEIGHT);
        if ring_depth >= 3 {
            let outer = self.ring_bias(x, y, &RING3_OFFSETS, score, pick_max);
            bias.0 += outer.0;
            bias.1 += outer.1;
        }
        bias
    }

    /// Point every cell's flow vector at its lowest surrounding surface.
    /// Cells with no directional bias keep their previous vector (zero at
    /// field creation). Must run before any droplet moves.
    pub fn assign_vectors(&self, heights: &HeightField, ring_depth: usize) {
        let score = |idx: usize| self.surface(idx, heights);
        for idx in 0..self.cells.len() {
            let (bx, by) = self.bias_at(idx, ring_depth, &score, false);
            if bx != 0 || by != 0 {
                let dir = (by as f64).atan2(bx as f64);
                self.set_vector(idx, dir.cos() as f32, dir.sin() as f32);
            }
        }
    }

    /// Bend every cell's flow vector toward its highest-outflow neighbors,
    /// rate-scaled and re-normalized to unit magnitude. Fired by the flow
    /// consumer every `feedback_interval` events.
    pub fn update_by_quantity(&self, ring_depth: usize, rate: f32) {
        let score = |idx: usize| self.outflow(idx) as i64;
        for idx in 0..self.cells.len() {
            let (bx, by) = self.bias_at(idx, ring_depth, &score, true);
            if bx == 0 && by == 0 {
                continue;
            }
            let dir = (by as f64).atan2(bx as f64);
            let (fx, fy) = self.vector(idx);
            let blended = (
                fx + dir.cos() as f32 * rate,
                fy + dir.sin() as f32 * rate,
            );
            let norm = (blended.0 * blended.0 + blended.1 * blended.1).sqrt();
            if norm > f32::EPSILON {
                self.set_vector(idx, blended.0 / norm, blended.1 / norm);
            } else {
                self.set_vector(idx, 0.0, 0.0);
            }
        }
    }
}

/// Consumer loop for the flow queue. Moves one unit of standing water per
/// event, forwards real lateral moves to the elevation queue, and fires the
/// outflow feedback pass on a fixed cadence. Returns (processed, forwarded).
pub fn run_consumer(
    flow: Arc<FlowField>,
    events: Receiver<ErosionEvent>,
    height_tx: SyncSender<ErosionEvent>,
    feedback_interval: u64,
    ring_depth: usize,
    feedback_rate: f32,
) -> (u64, u64) {
    let mut processed = 0u64;
    let mut forwarded = 0u64;
    for event in events {
        flow.raise_water(event.new_idx);
        flow.lower_water(event.old_idx);
        processed += 1;

        if event.old_idx != event.new_idx && height_tx.send(event).is_ok() {
            forwarded += 1;
        }

        if feedback_interval > 0 && processed % feedback_interval == 0 {
            flow.update_by_quantity(ring_depth, feedback_rate);
        }
    }
    (processed, forwarded)
}
