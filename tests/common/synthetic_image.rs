#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use subset_dic::image::{ImageF32, VolumeF32};

/// Random Gaussian speckle pattern that can be evaluated at any real position.
pub struct SpeckleField {
    blobs: Vec<([f64; 3], f64)>,
    sigma: f64,
}

impl SpeckleField {
    /// `count` speckles of width `sigma` scattered over a `w × h` plane.
    pub fn planar(w: usize, h: usize, count: usize, sigma: f64, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let blobs = (0..count)
            .map(|_| {
                let c = [
                    rng.gen_range(-4.0..w as f64 + 4.0),
                    rng.gen_range(-4.0..h as f64 + 4.0),
                    0.0,
                ];
                (c, rng.gen_range(40.0..120.0))
            })
            .collect();
        Self { blobs, sigma }
    }

    /// `count` speckles scattered over a `d × d × d` volume.
    pub fn volumetric(d: usize, count: usize, sigma: f64, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let blobs = (0..count)
            .map(|_| {
                let c = [
                    rng.gen_range(-3.0..d as f64 + 3.0),
                    rng.gen_range(-3.0..d as f64 + 3.0),
                    rng.gen_range(-3.0..d as f64 + 3.0),
                ];
                (c, rng.gen_range(40.0..120.0))
            })
            .collect();
        Self { blobs, sigma }
    }

    pub fn value(&self, p: [f64; 3]) -> f64 {
        let cutoff = 4.0 * self.sigma;
        let inv = 1.0 / (2.0 * self.sigma * self.sigma);
        let mut acc = 20.0;
        for (c, amp) in &self.blobs {
            let d = [p[0] - c[0], p[1] - c[1], p[2] - c[2]];
            if d[0].abs() > cutoff || d[1].abs() > cutoff || d[2].abs() > cutoff {
                continue;
            }
            acc += amp * (-(d[0] * d[0] + d[1] * d[1] + d[2] * d[2]) * inv).exp();
        }
        acc
    }
}

/// Position in the reference that a target position `p` came from, given the
/// displacement field `u` of reference positions (`p = x + u(x)`).
fn source_of(p: [f64; 3], u: &impl Fn([f64; 3]) -> [f64; 3]) -> [f64; 3] {
    let mut x = p;
    for _ in 0..50 {
        let d = u(x);
        x = [p[0] - d[0], p[1] - d[1], p[2] - d[2]];
    }
    x
}

/// Render the field deformed by `u`; pass a zero field for the reference.
pub fn render_2d(
    field: &SpeckleField,
    w: usize,
    h: usize,
    u: impl Fn([f64; 3]) -> [f64; 3],
) -> ImageF32 {
    ImageF32::from_fn(w, h, |x, y| {
        field.value(source_of([x as f64, y as f64, 0.0], &u)) as f32
    })
}

pub fn render_3d(
    field: &SpeckleField,
    d: usize,
    u: impl Fn([f64; 3]) -> [f64; 3],
) -> VolumeF32 {
    VolumeF32::from_fn(d, d, d, |x, y, z| {
        field.value(source_of([x as f64, y as f64, z as f64], &u)) as f32
    })
}

pub fn no_displacement(_: [f64; 3]) -> [f64; 3] {
    [0.0; 3]
}

/// Smooth pattern whose period divides 32 on both axes.
pub fn periodic_2d(x: f64, y: f64) -> f64 {
    use std::f64::consts::PI;
    100.0
        + 30.0 * (2.0 * PI * x / 32.0 + 0.3).cos()
        + 20.0 * (2.0 * PI * y / 32.0 + 1.1).sin()
        + 15.0 * (2.0 * PI * (x + y) / 16.0).cos()
}

/// Smooth pattern whose period divides 16 on every axis.
pub fn periodic_3d(x: f64, y: f64, z: f64) -> f64 {
    use std::f64::consts::PI;
    100.0
        + 30.0 * (2.0 * PI * x / 16.0).cos()
        + 25.0 * (2.0 * PI * y / 16.0 + 0.4).sin()
        + 20.0 * (2.0 * PI * z / 16.0 + 1.0).cos()
        + 10.0 * (2.0 * PI * (x + y + z) / 8.0).cos()
}
