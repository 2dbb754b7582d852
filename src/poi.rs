//! Points of interest: the unit of work of the correlation engines.
//!
//! A POI carries its position, the current deformation estimate and the
//! diagnostics written by the last engine that processed it. The engines
//! mutate POIs in place; ownership stays with the caller's queue.
//!
//! Deformation parameters are Taylor coefficients of the displacement field
//! around the POI. Their canonical array order (used by the shape functions)
//! is, per displacement component, constant term first, then first-order
//! terms, then second-order terms:
//!
//! - 2D: `[u, ux, uy, uxx, uxy, uyy, v, vx, vy, vxx, vxy, vyy]`
//! - 3D: `[u, ux, uy, uz, uxx, uxy, uxz, uyy, uyz, uzz, v, …, w, …]`
use serde::{Deserialize, Serialize};

/// Quality score written to a POI that could not be processed.
pub const INVALID_ZNCC: f32 = -1.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f32,
    pub y: f32,
}

impl Point2D {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point3D {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point3D {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Second-order deformation parameters of a 2D subset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Deformation2D {
    pub u: f32,
    pub ux: f32,
    pub uy: f32,
    pub uxx: f32,
    pub uxy: f32,
    pub uyy: f32,
    pub v: f32,
    pub vx: f32,
    pub vy: f32,
    pub vxx: f32,
    pub vxy: f32,
    pub vyy: f32,
}

impl Deformation2D {
    pub const LEN: usize = 12;

    pub fn translation(u: f32, v: f32) -> Self {
        Self {
            u,
            v,
            ..Default::default()
        }
    }

    pub fn to_array(&self) -> [f32; 12] {
        [
            self.u, self.ux, self.uy, self.uxx, self.uxy, self.uyy, self.v, self.vx, self.vy,
            self.vxx, self.vxy, self.vyy,
        ]
    }

    pub fn from_array(p: &[f32; 12]) -> Self {
        Self {
            u: p[0],
            ux: p[1],
            uy: p[2],
            uxx: p[3],
            uxy: p[4],
            uyy: p[5],
            v: p[6],
            vx: p[7],
            vy: p[8],
            vxx: p[9],
            vxy: p[10],
            vyy: p[11],
        }
    }
}

/// Second-order deformation parameters of a 3D subset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Deformation3D {
    pub u: f32,
    pub ux: f32,
    pub uy: f32,
    pub uz: f32,
    pub uxx: f32,
    pub uxy: f32,
    pub uxz: f32,
    pub uyy: f32,
    pub uyz: f32,
    pub uzz: f32,
    pub v: f32,
    pub vx: f32,
    pub vy: f32,
    pub vz: f32,
    pub vxx: f32,
    pub vxy: f32,
    pub vxz: f32,
    pub vyy: f32,
    pub vyz: f32,
    pub vzz: f32,
    pub w: f32,
    pub wx: f32,
    pub wy: f32,
    pub wz: f32,
    pub wxx: f32,
    pub wxy: f32,
    pub wxz: f32,
    pub wyy: f32,
    pub wyz: f32,
    pub wzz: f32,
}

impl Deformation3D {
    pub const LEN: usize = 30;

    pub fn translation(u: f32, v: f32, w: f32) -> Self {
        Self {
            u,
            v,
            w,
            ..Default::default()
        }
    }

    pub fn to_array(&self) -> [f32; 30] {
        [
            self.u, self.ux, self.uy, self.uz, self.uxx, self.uxy, self.uxz, self.uyy, self.uyz,
            self.uzz, self.v, self.vx, self.vy, self.vz, self.vxx, self.vxy, self.vxz, self.vyy,
            self.vyz, self.vzz, self.w, self.wx, self.wy, self.wz, self.wxx, self.wxy, self.wxz,
            self.wyy, self.wyz, self.wzz,
        ]
    }

    pub fn from_array(p: &[f32; 30]) -> Self {
        Self {
            u: p[0],
            ux: p[1],
            uy: p[2],
            uz: p[3],
            uxx: p[4],
            uxy: p[5],
            uxz: p[6],
            uyy: p[7],
            uyz: p[8],
            uzz: p[9],
            v: p[10],
            vx: p[11],
            vy: p[12],
            vz: p[13],
            vxx: p[14],
            vxy: p[15],
            vxz: p[16],
            vyy: p[17],
            vyz: p[18],
            vzz: p[19],
            w: p[20],
            wx: p[21],
            wy: p[22],
            wz: p[23],
            wxx: p[24],
            wxy: p[25],
            wxz: p[26],
            wyy: p[27],
            wyz: p[28],
            wzz: p[29],
        }
    }
}

/// Diagnostics of the last engine run on a 2D POI.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PoiResult2D {
    /// Initial guess of `u` consumed by the engine.
    pub u0: f32,
    /// Initial guess of `v` consumed by the engine.
    pub v0: f32,
    /// Match quality in [-1, 1]; `-1` marks an unusable POI.
    pub zncc: f32,
    /// Gauss-Newton iterations consumed (0 for FFT-CC or rejected POIs).
    pub iteration: u32,
    /// Final convergence norm of the last increment.
    pub convergence: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PoiResult3D {
    pub u0: f32,
    pub v0: f32,
    pub w0: f32,
    pub zncc: f32,
    pub iteration: u32,
    pub convergence: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Poi2D {
    pub x: f32,
    pub y: f32,
    pub deformation: Deformation2D,
    pub result: PoiResult2D,
}

impl Poi2D {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            ..Default::default()
        }
    }

    pub fn at(point: Point2D) -> Self {
        Self::new(point.x, point.y)
    }

    pub fn position(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }

    /// True when an engine marked this POI as unusable.
    pub fn is_rejected(&self) -> bool {
        self.result.zncc <= INVALID_ZNCC
    }

    pub(crate) fn reject(&mut self) {
        self.result.zncc = INVALID_ZNCC;
        self.result.iteration = 0;
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Poi3D {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub deformation: Deformation3D,
    pub result: PoiResult3D,
}

impl Poi3D {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            x,
            y,
            z,
            ..Default::default()
        }
    }

    pub fn at(point: Point3D) -> Self {
        Self::new(point.x, point.y, point.z)
    }

    pub fn position(&self) -> Point3D {
        Point3D::new(self.x, self.y, self.z)
    }

    pub fn is_rejected(&self) -> bool {
        self.result.zncc <= INVALID_ZNCC
    }

    pub(crate) fn reject(&mut self) {
        self.result.zncc = INVALID_ZNCC;
        self.result.iteration = 0;
    }
}

/// Regular grid of 2D POIs, row by row starting at `upper_left`.
pub fn grid_2d(upper_left: Point2D, count: [usize; 2], spacing: f32) -> Vec<Poi2D> {
    let mut pois = Vec::with_capacity(count[0] * count[1]);
    for j in 0..count[1] {
        for i in 0..count[0] {
            pois.push(Poi2D::new(
                upper_left.x + i as f32 * spacing,
                upper_left.y + j as f32 * spacing,
            ));
        }
    }
    pois
}

/// Regular grid of 3D POIs, x fastest, then y, then z.
pub fn grid_3d(upper_left: Point3D, count: [usize; 3], spacing: f32) -> Vec<Poi3D> {
    let mut pois = Vec::with_capacity(count[0] * count[1] * count[2]);
    for k in 0..count[2] {
        for j in 0..count[1] {
            for i in 0..count[0] {
                pois.push(Poi3D::new(
                    upper_left.x + i as f32 * spacing,
                    upper_left.y + j as f32 * spacing,
                    upper_left.z + k as f32 * spacing,
                ));
            }
        }
    }
    pois
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deformation_arrays_follow_canonical_order() {
        let mut d = Deformation2D::translation(1.5, -2.0);
        d.uxy = 0.25;
        d.vyy = -0.125;
        let arr = d.to_array();
        assert_eq!(arr[0], 1.5);
        assert_eq!(arr[4], 0.25);
        assert_eq!(arr[6], -2.0);
        assert_eq!(arr[11], -0.125);
        assert_eq!(Deformation2D::from_array(&arr), d);

        let mut d3 = Deformation3D::translation(1.0, 2.0, 3.0);
        d3.wz = 0.01;
        let arr3 = d3.to_array();
        assert_eq!(arr3[10], 2.0);
        assert_eq!(arr3[20], 3.0);
        assert_eq!(arr3[23], 0.01);
        assert_eq!(Deformation3D::from_array(&arr3), d3);
    }

    #[test]
    fn grid_generators_walk_x_fastest() {
        let pois = grid_2d(Point2D::new(10.0, 20.0), [3, 2], 5.0);
        assert_eq!(pois.len(), 6);
        assert_eq!(pois[1].position(), Point2D::new(15.0, 20.0));
        assert_eq!(pois[3].position(), Point2D::new(10.0, 25.0));

        let pois3 = grid_3d(Point3D::new(0.0, 0.0, 0.0), [2, 2, 2], 1.0);
        assert_eq!(pois3.len(), 8);
        assert_eq!(pois3[4].position(), Point3D::new(0.0, 0.0, 1.0));
    }
}
