/// Read-only access to a single-channel 2D grid stored row by row.
pub trait ImageView {
    type Pixel: Copy;

    fn width(&self) -> usize;
    fn height(&self) -> usize;
    fn stride(&self) -> usize;

    fn row(&self, y: usize) -> &[Self::Pixel];

    #[inline]
    fn pixel(&self, x: usize, y: usize) -> Self::Pixel {
        self.row(y)[x]
    }
}

pub trait ImageViewMut: ImageView {
    fn row_mut(&mut self, y: usize) -> &mut [Self::Pixel];
}

/// Read-only access to a single-channel 3D grid stored slice by slice
/// (x fastest, then y, then z).
pub trait VolumeView {
    type Voxel: Copy;

    fn dim_x(&self) -> usize;
    fn dim_y(&self) -> usize;
    fn dim_z(&self) -> usize;

    fn voxel(&self, x: usize, y: usize, z: usize) -> Self::Voxel;

    fn dims(&self) -> [usize; 3] {
        [self.dim_x(), self.dim_y(), self.dim_z()]
    }
}
