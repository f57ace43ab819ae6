//! Elevation grid and its erosion consumer.
//!
//! Elevation only ever decreases after seeding. All writes funnel through
//! the single consumer thread; droplet tasks read concurrently.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::Arc;

use crate::erosion::events::ErosionEvent;
use crate::tilemap::{Tilemap, RING2_OFFSETS};

pub struct HeightField {
    pub width: usize,
    pub height: usize,
    cells: Vec<AtomicU8>,
}

impl HeightField {
    pub fn from_tilemap(map: &Tilemap<u8>) -> Self {
        Self {
            width: map.width,
            height: map.height,
            cells: map.as_slice().iter().map(|&v| AtomicU8::new(v)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn elevation(&self, idx: usize) -> u8 {
        self.cells[idx].load(Ordering::Relaxed)
    }

    /// Lower a cell by one, stopping at zero.
    pub fn lower(&self, idx: usize) {
        let _ = self.cells[idx].fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| {
            v.checked_sub(1)
        });
    }

    /// Erode a cell and its in-bounds 8-neighborhood, approximating banks
    /// collapsing into the channel.
    pub fn erode_banks(&self, idx: usize) {
        self.lower(idx);
        let x = (idx % self.width) as i32;
        let y = (idx / self.width) as i32;
        for &(dx, dy) in RING2_OFFSETS.iter() {
            let nx = x + dx;
            let ny = y + dy;
            if nx >= 0 && nx < self.width as i32 && ny >= 0 && ny < self.height as i32 {
                self.lower(ny as usize * self.width + nx as usize);
            }
        }
    }

    /// Copy the current elevations into a plain grid.
    pub fn snapshot(&self) -> Tilemap<u8> {
        let mut map = Tilemap::new_with(self.width, self.height, 0u8);
        for idx in 0..self.cells.len() {
            let (x, y) = (idx % self.width, idx / self.width);
            map.set(x, y, self.cells[idx].load(Ordering::Relaxed));
        }
        map
    }
}

/// Consumer loop for the elevation queue. Runs until every sender is gone,
/// then reports how many events it processed.
pub fn run_consumer(field: Arc<HeightField>, events: Receiver<ErosionEvent>) -> u64 {
    let mut processed = 0u64;
    for event in events {
        field.erode_banks(event.old_idx);
        processed += 1;
    }
    processed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_lower_floors_at_zero() {
        let mut map = Tilemap::new_with(3, 3, 0u8);
        map.set(1, 1, 2);
        let field = HeightField::from_tilemap(&map);
        let idx = 4;
        field.lower(idx);
        assert_eq!(field.elevation(idx), 1);
        field.lower(idx);
        assert_eq!(field.elevation(idx), 0);
        field.lower(idx);
        assert_eq!(field.elevation(idx), 0);
    }

    #[test]
    fn test_erode_banks_hits_neighbors() {
        let map = Tilemap::new_with(5, 5, 10u8);
        let field = HeightField::from_tilemap(&map);
        field.erode_banks(field.width * 2 + 2);
        for y in 0..5 {
            for x in 0..5 {
                let expected = if (1..=3).contains(&x) && (1..=3).contains(&y) {
                    9
                } else {
                    10
                };
                assert_eq!(field.elevation(y * 5 + x), expected);
            }
        }
    }

    #[test]
    fn test_erode_banks_at_corner() {
        let map = Tilemap::new_with(4, 4, 5u8);
        let field = HeightField::from_tilemap(&map);
        // Corner cell: only 3 neighbors exist, nothing panics.
        field.erode_banks(0);
        assert_eq!(field.elevation(0), 4);
        assert_eq!(field.elevation(1), 4);
        assert_eq!(field.elevation(4), 4);
        assert_eq!(field.elevation(5), 4);
        assert_eq!(field.elevation(2), 5);
    }

    #[test]
    fn test_consumer_is_non_increasing() {
        let map = Tilemap::new_with(6, 6, 3u8);
        let field = Arc::new(HeightField::from_tilemap(&map));
        let before: Vec<u8> = (0..field.len()).map(|i| field.elevation(i)).collect();

        let (tx, rx) = mpsc::sync_channel(16);
        let worker = {
            let field = field.clone();
            std::thread::spawn(move || run_consumer(field, rx))
        };
        for idx in [7, 7, 14, 21, 7] {
            tx.send(ErosionEvent {
                old_idx: idx,
                new_idx: idx + 1,
            })
            .unwrap();
        }
        drop(tx);
        let processed = worker.join().unwrap();

        assert_eq!(processed, 5);
        for i in 0..field.len() {
            assert!(field.elevation(i) <= before[i]);
        }
    }
}
