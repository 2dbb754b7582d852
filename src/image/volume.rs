//! Owned single-channel f32 volume, x fastest, then y, then z.

use super::traits::VolumeView;

#[derive(Clone, Debug)]
pub struct VolumeF32 {
    pub dim_x: usize,
    pub dim_y: usize,
    pub dim_z: usize,
    pub data: Vec<f32>,
}

impl VolumeF32 {
    /// Construct a zero-initialized volume of size `dim_x × dim_y × dim_z`.
    pub fn new(dim_x: usize, dim_y: usize, dim_z: usize) -> Self {
        Self {
            dim_x,
            dim_y,
            dim_z,
            data: vec![0.0; dim_x * dim_y * dim_z],
        }
    }

    /// Build a volume by evaluating `f(x, y, z)` at every voxel.
    pub fn from_fn(
        dim_x: usize,
        dim_y: usize,
        dim_z: usize,
        mut f: impl FnMut(usize, usize, usize) -> f32,
    ) -> Self {
        let mut vol = Self::new(dim_x, dim_y, dim_z);
        for z in 0..dim_z {
            for y in 0..dim_y {
                for x in 0..dim_x {
                    let i = vol.idx(x, y, z);
                    vol.data[i] = f(x, y, z);
                }
            }
        }
        vol
    }

    #[inline]
    pub fn idx(&self, x: usize, y: usize, z: usize) -> usize {
        (z * self.dim_y + y) * self.dim_x + x
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> f32 {
        self.data[self.idx(x, y, z)]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, z: usize, v: f32) {
        let i = self.idx(x, y, z);
        self.data[i] = v;
    }

    /// True when the integer box `lo..=hi` lies inside the volume.
    #[inline]
    pub fn contains_box(&self, lo: [i64; 3], hi: [i64; 3]) -> bool {
        lo.iter().all(|&v| v >= 0)
            && hi[0] < self.dim_x as i64
            && hi[1] < self.dim_y as i64
            && hi[2] < self.dim_z as i64
    }
}

impl VolumeView for VolumeF32 {
    type Voxel = f32;

    #[inline]
    fn dim_x(&self) -> usize {
        self.dim_x
    }
    #[inline]
    fn dim_y(&self) -> usize {
        self.dim_y
    }
    #[inline]
    fn dim_z(&self) -> usize {
        self.dim_z
    }
    #[inline]
    fn voxel(&self, x: usize, y: usize, z: usize) -> f32 {
        self.get(x, y, z)
    }
}
