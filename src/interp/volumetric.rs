use super::{cubic_weights, split_coordinate, Interpolator3D, PAD};
use crate::image::VolumeF32;

fn padded_copy(volume: &VolumeF32) -> VolumeF32 {
    let [dx, dy, dz] = [volume.dim_x, volume.dim_y, volume.dim_z];
    if dx == 0 || dy == 0 || dz == 0 {
        return VolumeF32::new(0, 0, 0);
    }
    VolumeF32::from_fn(dx + 2 * PAD, dy + 2 * PAD, dz + 2 * PAD, |x, y, z| {
        volume.get(
            x.saturating_sub(PAD).min(dx - 1),
            y.saturating_sub(PAD).min(dy - 1),
            z.saturating_sub(PAD).min(dz - 1),
        )
    })
}

/// Separable Keys cubic convolution over a 4×4×4 neighbourhood.
pub struct TricubicInterpolator<'a> {
    source: &'a VolumeF32,
    padded: VolumeF32,
}

impl<'a> TricubicInterpolator<'a> {
    pub fn new(source: &'a VolumeF32) -> Self {
        Self {
            source,
            padded: VolumeF32::new(0, 0, 0),
        }
    }

    pub fn prepared(source: &'a VolumeF32) -> Self {
        let mut interp = Self::new(source);
        interp.prepare();
        interp
    }
}

impl Interpolator3D for TricubicInterpolator<'_> {
    fn prepare(&mut self) {
        self.padded = padded_copy(self.source);
    }

    fn sample(&self, x: f32, y: f32, z: f32) -> f32 {
        let p = &self.padded;
        if p.dim_x < 4 || p.dim_y < 4 || p.dim_z < 4 {
            return 0.0;
        }
        let (x0, tx) = split_coordinate(x, p.dim_x, 1, 2);
        let (y0, ty) = split_coordinate(y, p.dim_y, 1, 2);
        let (z0, tz) = split_coordinate(z, p.dim_z, 1, 2);
        let wx = cubic_weights(tx);
        let wy = cubic_weights(ty);
        let wz = cubic_weights(tz);
        let mut acc = 0.0f32;
        for (k, &wzk) in wz.iter().enumerate() {
            let mut plane = 0.0f32;
            for (j, &wyj) in wy.iter().enumerate() {
                let start = p.idx(x0 - 1, y0 + j - 1, z0 + k - 1);
                let line = &p.data[start..start + 4];
                let mut row = 0.0f32;
                for (value, &wxi) in line.iter().zip(wx.iter()) {
                    row += value * wxi;
                }
                plane += row * wyj;
            }
            acc += plane * wzk;
        }
        acc
    }
}

pub struct TrilinearInterpolator<'a> {
    source: &'a VolumeF32,
    padded: VolumeF32,
}

impl<'a> TrilinearInterpolator<'a> {
    pub fn new(source: &'a VolumeF32) -> Self {
        Self {
            source,
            padded: VolumeF32::new(0, 0, 0),
        }
    }

    pub fn prepared(source: &'a VolumeF32) -> Self {
        let mut interp = Self::new(source);
        interp.prepare();
        interp
    }
}

impl Interpolator3D for TrilinearInterpolator<'_> {
    fn prepare(&mut self) {
        self.padded = padded_copy(self.source);
    }

    fn sample(&self, x: f32, y: f32, z: f32) -> f32 {
        let p = &self.padded;
        if p.dim_x < 2 || p.dim_y < 2 || p.dim_z < 2 {
            return 0.0;
        }
        let (x0, tx) = split_coordinate(x, p.dim_x, 0, 1);
        let (y0, ty) = split_coordinate(y, p.dim_y, 0, 1);
        let (z0, tz) = split_coordinate(z, p.dim_z, 0, 1);
        let lerp = |a: f32, b: f32, t: f32| a * (1.0 - t) + b * t;
        let plane = |zz: usize| {
            let c00 = lerp(p.get(x0, y0, zz), p.get(x0 + 1, y0, zz), tx);
            let c10 = lerp(p.get(x0, y0 + 1, zz), p.get(x0 + 1, y0 + 1, zz), tx);
            lerp(c00, c10, ty)
        };
        lerp(plane(z0), plane(z0 + 1), tz)
    }
}
