//! Assignment of RC samples to their nearest density grid point.

/// Index of the closest grid point for every sample.
///
/// Ties resolve to the lower index. Samples that compare with nothing
/// (NaN, or an empty grid) map to index zero.
pub fn nearest_grid_indices(values: &[f64], grid: &[f64]) -> Vec<usize> {
    values
        .iter()
        .map(|&v| {
            let mut best = 0;
            let mut best_dist = f64::INFINITY;
            for (j, &g) in grid.iter().enumerate() {
                let dist = (v - g).abs();
                if dist < best_dist {
                    best = j;
                    best_dist = dist;
                }
            }
            best
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nearest_indices() {
        let values = [0.0, 1.0, 2.0, 3.0, 4.0, 0.0, 1.0, 2.0, 3.0, 4.0];
        let grid = [0.7, 1.4, 2.1, 2.8];
        let expected = vec![0, 0, 2, 3, 3, 0, 0, 2, 3, 3];
        assert_eq!(nearest_grid_indices(&values, &grid), expected);
    }

    #[test]
    fn test_tie_takes_lower_index() {
        assert_eq!(nearest_grid_indices(&[1.75], &[1.5, 2.0]), vec![0]);
    }

    #[test]
    fn test_nan_maps_to_first_point() {
        assert_eq!(nearest_grid_indices(&[f64::NAN], &[0.0, 1.0]), vec![0]);
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(nearest_grid_indices(&[], &[1.0]), Vec::<usize>::new());
        assert_eq!(nearest_grid_indices(&[1.0, 2.0], &[]), vec![0, 0]);
    }
}
