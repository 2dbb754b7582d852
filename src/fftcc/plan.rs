//! Separable N-dimensional complex FFT over a fixed subset extent.
//!
//! The x axis is contiguous and transformed in one batched call; the y and z
//! axes are gathered into a line buffer, transformed and scattered back.
//! Axes of extent 1 are skipped, so the same plan serves 2D and 3D subsets.
//! Like FFTW, the inverse transform is unnormalised.
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

pub struct CorrelationPlan {
    dims: [usize; 3],
    forward: [Option<Arc<dyn Fft<f64>>>; 3],
    inverse: [Option<Arc<dyn Fft<f64>>>; 3],
    line: Vec<Complex<f64>>,
    scratch: Vec<Complex<f64>>,
}

impl CorrelationPlan {
    pub fn new(planner: &mut FftPlanner<f64>, dims: [usize; 3]) -> Self {
        let mut forward: [Option<Arc<dyn Fft<f64>>>; 3] = [None, None, None];
        let mut inverse: [Option<Arc<dyn Fft<f64>>>; 3] = [None, None, None];
        let mut scratch_len = 0;
        for axis in 0..3 {
            if dims[axis] > 1 {
                let f = planner.plan_fft_forward(dims[axis]);
                let i = planner.plan_fft_inverse(dims[axis]);
                scratch_len = scratch_len
                    .max(f.get_inplace_scratch_len())
                    .max(i.get_inplace_scratch_len());
                forward[axis] = Some(f);
                inverse[axis] = Some(i);
            }
        }
        let line_len = dims.iter().copied().max().unwrap_or(0);
        Self {
            dims,
            forward,
            inverse,
            line: vec![Complex::new(0.0, 0.0); line_len],
            scratch: vec![Complex::new(0.0, 0.0); scratch_len],
        }
    }

    /// Number of samples covered by the plan.
    pub fn len(&self) -> usize {
        self.dims.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn forward(&mut self, data: &mut [Complex<f64>]) {
        for axis in 0..3 {
            if let Some(fft) = self.forward[axis].clone() {
                self.transform_axis(data, axis, fft.as_ref());
            }
        }
    }

    pub fn inverse(&mut self, data: &mut [Complex<f64>]) {
        for axis in 0..3 {
            if let Some(fft) = self.inverse[axis].clone() {
                self.transform_axis(data, axis, fft.as_ref());
            }
        }
    }

    fn transform_axis(&mut self, data: &mut [Complex<f64>], axis: usize, fft: &dyn Fft<f64>) {
        debug_assert_eq!(data.len(), self.len());
        let [dx, dy, dz] = self.dims;
        let scratch = &mut self.scratch[..fft.get_inplace_scratch_len()];
        if axis == 0 {
            fft.process_with_scratch(data, scratch);
            return;
        }
        let (n, stride, outer, inner, outer_step) = if axis == 1 {
            (dy, dx, dz, dx, dx * dy)
        } else {
            (dz, dx * dy, dy, dx, dx)
        };
        let line = &mut self.line[..n];
        for o in 0..outer {
            for i in 0..inner {
                let base = o * outer_step + i;
                for (t, value) in line.iter_mut().enumerate() {
                    *value = data[base + t * stride];
                }
                fft.process_with_scratch(line, scratch);
                for (t, value) in line.iter().enumerate() {
                    data[base + t * stride] = *value;
                }
            }
        }
    }
}
