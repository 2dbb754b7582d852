use super::{cubic_weights, split_coordinate, Interpolator2D, PAD};
use crate::image::{ImageF32, ImageView, ImageViewMut};

/// Copy of `image` with a `PAD`-pixel replicated border.
fn padded_copy(image: &ImageF32) -> ImageF32 {
    if image.w == 0 || image.h == 0 {
        return ImageF32::new(0, 0);
    }
    let pw = image.w + 2 * PAD;
    let ph = image.h + 2 * PAD;
    let mut out = ImageF32::new(pw, ph);
    for y in 0..ph {
        let src_y = y.saturating_sub(PAD).min(image.h - 1);
        let src = image.row(src_y);
        let dst = out.row_mut(y);
        for (x, value) in dst.iter_mut().enumerate() {
            let src_x = x.saturating_sub(PAD).min(image.w - 1);
            *value = src[src_x];
        }
    }
    out
}

/// Keys cubic-convolution interpolation over a 4×4 neighbourhood.
pub struct BicubicInterpolator<'a> {
    source: &'a ImageF32,
    padded: ImageF32,
}

impl<'a> BicubicInterpolator<'a> {
    pub fn new(source: &'a ImageF32) -> Self {
        Self {
            source,
            padded: ImageF32::new(0, 0),
        }
    }

    /// Convenience: construct and prepare in one step.
    pub fn prepared(source: &'a ImageF32) -> Self {
        let mut interp = Self::new(source);
        interp.prepare();
        interp
    }
}

impl Interpolator2D for BicubicInterpolator<'_> {
    fn prepare(&mut self) {
        self.padded = padded_copy(self.source);
    }

    fn sample(&self, x: f32, y: f32) -> f32 {
        let p = &self.padded;
        if p.w < 4 || p.h < 4 {
            return 0.0;
        }
        let (x0, tx) = split_coordinate(x, p.w, 1, 2);
        let (y0, ty) = split_coordinate(y, p.h, 1, 2);
        let wx = cubic_weights(tx);
        let wy = cubic_weights(ty);
        let mut acc = 0.0f32;
        for (j, &wyj) in wy.iter().enumerate() {
            let row = p.row(y0 + j - 1);
            let line = &row[x0 - 1..x0 + 3];
            let mut row_acc = 0.0f32;
            for (value, &wxi) in line.iter().zip(wx.iter()) {
                row_acc += value * wxi;
            }
            acc += row_acc * wyj;
        }
        acc
    }
}

/// Bilinear interpolation; cheaper but biased for sub-pixel matching.
pub struct BilinearInterpolator<'a> {
    source: &'a ImageF32,
    padded: ImageF32,
}

impl<'a> BilinearInterpolator<'a> {
    pub fn new(source: &'a ImageF32) -> Self {
        Self {
            source,
            padded: ImageF32::new(0, 0),
        }
    }

    pub fn prepared(source: &'a ImageF32) -> Self {
        let mut interp = Self::new(source);
        interp.prepare();
        interp
    }
}

impl Interpolator2D for BilinearInterpolator<'_> {
    fn prepare(&mut self) {
        self.padded = padded_copy(self.source);
    }

    fn sample(&self, x: f32, y: f32) -> f32 {
        let p = &self.padded;
        if p.w < 2 || p.h < 2 {
            return 0.0;
        }
        let (x0, tx) = split_coordinate(x, p.w, 0, 1);
        let (y0, ty) = split_coordinate(y, p.h, 0, 1);
        let r0 = p.row(y0);
        let r1 = p.row(y0 + 1);
        let top = r0[x0] * (1.0 - tx) + r0[x0 + 1] * tx;
        let bottom = r1[x0] * (1.0 - tx) + r1[x0 + 1] * tx;
        top * (1.0 - ty) + bottom * ty
    }
}
