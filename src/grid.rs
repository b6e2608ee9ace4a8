use std::collections::HashMap;

use geo::Point;

use crate::distance::grid_cell;

/// Uniform grid over decimal-degree space, bucketing arena slot numbers
/// by cell. Queries union the 3x3 block around the query point, so a
/// candidate is guaranteed to surface as long as the match radius stays
/// within one cell edge; the cell size is validated against the radius
/// when a run is configured. Cells do not wrap at the antimeridian.
pub struct SpatialIndex {
    cell_size_degrees: f64,
    cells: HashMap<(i64, i64), Vec<usize>>,
}

impl SpatialIndex {
    pub fn new(cell_size_degrees: f64) -> Self {
        Self {
            cell_size_degrees,
            cells: HashMap::new(),
        }
    }

    pub fn insert(&mut self, slot: usize, point: Point) {
        let cell = grid_cell(point, self.cell_size_degrees);
        self.cells.entry(cell).or_default().push(slot);
    }

    /// Slots bucketed in the cell containing `point` or one of its eight
    /// neighbours, in ascending slot order. Ascending order is what makes
    /// first-match-wins deterministic: earlier insertions are tried first.
    pub fn candidates_near(&self, point: Point) -> Vec<usize> {
        let (lat_cell, lon_cell) = grid_cell(point, self.cell_size_degrees);
        let mut slots = Vec::new();
        for dlat in -1..=1 {
            for dlon in -1..=1 {
                if let Some(bucket) = self.cells.get(&(lat_cell + dlat, lon_cell + dlon)) {
                    slots.extend_from_slice(bucket);
                }
            }
        }
        slots.sort_unstable();
        slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_neighbours_across_cell_edges() {
        let mut index = SpatialIndex::new(0.001);
        // either side of the 0.001 lon boundary
        index.insert(0, Point::new(0.00099, 0.0005));
        index.insert(1, Point::new(0.00101, 0.0005));
        assert_eq!(index.candidates_near(Point::new(0.00099, 0.0005)), vec![0, 1]);
        assert_eq!(index.candidates_near(Point::new(0.00101, 0.0005)), vec![0, 1]);
    }

    #[test]
    fn ignores_cells_beyond_the_block() {
        let mut index = SpatialIndex::new(0.001);
        index.insert(0, Point::new(0.0005, 0.0005));
        index.insert(1, Point::new(0.0045, 0.0005)); // four cells east
        assert_eq!(index.candidates_near(Point::new(0.0005, 0.0005)), vec![0]);
    }

    #[test]
    fn candidates_ascend() {
        let mut index = SpatialIndex::new(0.001);
        index.insert(7, Point::new(0.0011, 0.0));
        index.insert(2, Point::new(0.0009, 0.0));
        index.insert(5, Point::new(0.0010, 0.0));
        assert_eq!(index.candidates_near(Point::new(0.0010, 0.0)), vec![2, 5, 7]);
    }

    #[test]
    fn negative_coordinates_bucket_cleanly() {
        let mut index = SpatialIndex::new(0.001);
        index.insert(0, Point::new(-0.00001, -0.00001));
        index.insert(1, Point::new(0.00001, 0.00001));
        assert_eq!(index.candidates_near(Point::new(0.0, 0.0)), vec![0, 1]);
    }
}
