/// A 2D tilemap grid with fixed rectangular bounds (no wrapping).
#[derive(Clone)]
pub struct Tilemap<T> {
    pub width: usize,
    pub height: usize,
    data: Vec<T>,
}

impl<T: Clone + Default> Tilemap<T> {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![T::default(); width * height],
        }
    }
}

impl<T: Clone> Tilemap<T> {
    pub fn new_with(width: usize, height: usize, value: T) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    pub fn get(&self, x: usize, y: usize) -> &T {
        &self.data[self.index(x, y)]
    }

    pub fn get_mut(&mut self, x: usize, y: usize) -> &mut T {
        let idx = self.index(x, y);
        &mut self.data[idx]
    }

    pub fn set(&mut self, x: usize, y: usize, value: T) {
        let idx = self.index(x, y);
        self.data[idx] = value;
    }

    /// Fill the entire map with a value.
    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && x < self.width as i32 && y >= 0 && y < self.height as i32
    }

    /// Flat index of a coordinate pair.
    pub fn idx_of(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    /// Coordinate pair of a flat index.
    pub fn coords_of(&self, idx: usize) -> (usize, usize) {
        (idx % self.width, idx / self.width)
    }

    /// Get 8-connected in-bounds neighbors (including diagonals).
    pub fn neighbors_8(&self, x: usize, y: usize) -> Vec<(usize, usize)> {
        let mut result = Vec::with_capacity(8);
        for &(dx, dy) in RING2_OFFSETS.iter() {
            let nx = x as i32 + dx;
            let ny = y as i32 + dy;
            if self.in_bounds(nx, ny) {
                result.push((nx as usize, ny as usize));
            }
        }
        result
    }

    /// Iterate over all cells with their coordinates.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &T)> {
        self.data.iter().enumerate().map(move |(idx, val)| {
            let x = idx % self.width;
            let y = idx / self.width;
            (x, y, val)
        })
    }

    /// Iterate mutably over all cells with their coordinates.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, usize, &mut T)> {
        let width = self.width;
        self.data.iter_mut().enumerate().map(move |(idx, val)| {
            let x = idx % width;
            let y = idx / width;
            (x, y, val)
        })
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }
}

/// Offsets of the 8 immediate neighbors (dx, dy), scanned counterclockwise
/// from east.
pub const RING2_OFFSETS: [(i32, i32); 8] = [
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Offsets of the 12-cell outer ring at distance 2, same scan direction.
pub const RING3_OFFSETS: [(i32, i32); 12] = [
    (2, 0),
    (2, -1),
    (1, -2),
    (0, -2),
    (-1, -2),
    (-2, -1),
    (-2, 0),
    (-2, 1),
    (-1, 2),
    (0, 2),
    (1, 2),
    (2, 1),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_round_trip() {
        let map = Tilemap::<u8>::new(7, 5);
        for idx in 0..7 * 5 {
            let (x, y) = map.coords_of(idx);
            assert_eq!(map.idx_of(x, y), idx);
        }
    }

    #[test]
    fn test_set_get() {
        let mut map = Tilemap::new_with(4, 4, 0u8);
        map.set(2, 3, 9);
        assert_eq!(*map.get(2, 3), 9);
        assert_eq!(*map.get(3, 2), 0);
    }

    #[test]
    fn test_corner_has_three_neighbors() {
        let map = Tilemap::<u8>::new(10, 10);
        assert_eq!(map.neighbors_8(0, 0).len(), 3);
        assert_eq!(map.neighbors_8(9, 9).len(), 3);
        assert_eq!(map.neighbors_8(5, 0).len(), 5);
        assert_eq!(map.neighbors_8(5, 5).len(), 8);
    }

    #[test]
    fn test_ring_offsets_distinct() {
        let mut seen = std::collections::HashSet::new();
        for &off in RING2_OFFSETS.iter().chain(RING3_OFFSETS.iter()) {
            assert!(seen.insert(off));
            assert_ne!(off, (0, 0));
        }
        // The outer ring sits strictly outside the inner one.
        for &(dx, dy) in RING3_OFFSETS.iter() {
            assert_eq!(dx.abs().max(dy.abs()), 2);
        }
    }
}
