//! Subset window geometry and zero-mean normalisation.
//!
//! A subset is stored as a flat buffer, x fastest, then y, then z. Two
//! window shapes are used:
//!
//! - ICGN windows are centred: `2r + 1` samples per axis, local coordinates
//!   `-r..=r`.
//! - FFT-CC windows have an even extent `2r` per axis so the transform size is
//!   even; local coordinates run over `-r..r`.
//!
//! 2D windows use a single z slice with radius 0.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubsetGrid {
    /// Half-size per axis.
    pub radius: [usize; 3],
    /// Number of samples per axis.
    pub extent: [usize; 3],
}

impl SubsetGrid {
    pub fn centered_2d(radius_x: usize, radius_y: usize) -> Self {
        Self {
            radius: [radius_x, radius_y, 0],
            extent: [2 * radius_x + 1, 2 * radius_y + 1, 1],
        }
    }

    pub fn centered_3d(radius: [usize; 3]) -> Self {
        Self {
            radius,
            extent: [2 * radius[0] + 1, 2 * radius[1] + 1, 2 * radius[2] + 1],
        }
    }

    pub fn even_2d(radius_x: usize, radius_y: usize) -> Self {
        Self {
            radius: [radius_x, radius_y, 0],
            extent: [2 * radius_x, 2 * radius_y, 1],
        }
    }

    pub fn even_3d(radius: [usize; 3]) -> Self {
        Self {
            radius,
            extent: [2 * radius[0], 2 * radius[1], 2 * radius[2]],
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.extent[0] * self.extent[1] * self.extent[2]
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flat index of the sample at grid position `(i, j, k)`.
    #[inline]
    pub fn flat(&self, i: usize, j: usize, k: usize) -> usize {
        (k * self.extent[1] + j) * self.extent[0] + i
    }

    /// Grid position of a flat index.
    #[inline]
    pub fn unravel(&self, flat: usize) -> [usize; 3] {
        let plane = self.extent[0] * self.extent[1];
        [
            flat % self.extent[0],
            (flat / self.extent[0]) % self.extent[1],
            flat / plane,
        ]
    }

    /// Local coordinate (relative to the subset centre) of a grid position.
    #[inline]
    pub fn local(&self, pos: [usize; 3]) -> [i64; 3] {
        [
            pos[0] as i64 - self.radius[0] as i64,
            pos[1] as i64 - self.radius[1] as i64,
            pos[2] as i64 - self.radius[2] as i64,
        ]
    }

    /// Visit every sample in storage order with its flat index and local coordinate.
    pub fn for_each_local(&self, mut f: impl FnMut(usize, [i64; 3])) {
        let mut n = 0;
        for k in 0..self.extent[2] {
            for j in 0..self.extent[1] {
                for i in 0..self.extent[0] {
                    f(n, self.local([i, j, k]));
                    n += 1;
                }
            }
        }
    }
}

/// Subtract the mean in place and return the sum of squared deviations.
pub fn zero_mean(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let mut sum_sq = 0.0;
    for v in values.iter_mut() {
        *v -= mean;
        sum_sq += *v * *v;
    }
    sum_sq
}

/// Subtract the mean in place and return the zero-mean norm `sqrt(Σ (f - f̄)²)`.
pub fn zero_mean_norm(values: &mut [f64]) -> f64 {
    zero_mean(values).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centered_windows_are_symmetric() {
        let grid = SubsetGrid::centered_2d(3, 2);
        assert_eq!(grid.extent, [7, 5, 1]);
        assert_eq!(grid.len(), 35);
        assert_eq!(grid.local(grid.unravel(0)), [-3, -2, 0]);
        assert_eq!(grid.local(grid.unravel(34)), [3, 2, 0]);
        assert_eq!(grid.local(grid.unravel(17)), [0, 0, 0]);
    }

    #[test]
    fn flat_and_unravel_agree_in_3d() {
        let grid = SubsetGrid::even_3d([2, 3, 4]);
        assert_eq!(grid.extent, [4, 6, 8]);
        for &pos in &[[0, 0, 0], [3, 5, 7], [1, 2, 3]] {
            let n = grid.flat(pos[0], pos[1], pos[2]);
            assert_eq!(grid.unravel(n), pos);
        }
        let mut visited = 0;
        grid.for_each_local(|n, local| {
            assert_eq!(grid.local(grid.unravel(n)), local);
            visited += 1;
        });
        assert_eq!(visited, grid.len());
    }

    #[test]
    fn zero_mean_norm_removes_offset() {
        let mut a = vec![1.0, 2.0, 3.0, 4.0];
        let mut b = vec![11.0, 12.0, 13.0, 14.0];
        let na = zero_mean_norm(&mut a);
        let nb = zero_mean_norm(&mut b);
        assert!((na - nb).abs() < 1e-12);
        assert!((na - 5.0f64.sqrt()).abs() < 1e-12);
        assert!(a.iter().sum::<f64>().abs() < 1e-12);
    }
}
