mod common;

use common::synthetic_image::{no_displacement, render_2d, SpeckleField};
use subset_dic::config::parse_config;
use subset_dic::gradient::Gradient2D;
use subset_dic::interp::BicubicInterpolator;
use subset_dic::{Fftcc2D, Frame2D, Icgn2D1, Poi2D};

/// Uniform stretch of 0.5 % in x on top of a (2.4, -1.6) px translation.
fn stretch(p: [f64; 3]) -> [f64; 3] {
    [2.4 + 0.005 * (p[0] - 60.0), -1.6, 0.0]
}

#[test]
fn fftcc_then_icgn_recovers_a_stretched_field() {
    let _ = env_logger::builder().is_test(true).try_init();
    let field = SpeckleField::planar(120, 120, 600, 2.5, 42);
    let reference = render_2d(&field, 120, 120, no_displacement);
    let target = render_2d(&field, 120, 120, stretch);

    let config = parse_config(
        r#"{
            "reference": "ref.bmp",
            "target": "tar.bmp",
            "subset_radius": [14, 14],
            "poi_grid": { "upper_left": [48, 48], "count": [3, 3], "spacing": 12 },
            "icgn": { "order": 1 },
            "workers": 2
        }"#,
    )
    .expect("config");
    let mut pois = config.poi_grid.build();
    pois.push(Poi2D::new(3.0, 60.0));
    let [rx, ry] = config.subset_radius;

    let fftcc = Fftcc2D::new(rx, ry, config.worker_count()).expect("fftcc");
    let coarse = fftcc.compute_batch(&reference, &target, &mut pois).expect("fftcc batch");
    assert_eq!(coarse.total, 10);
    assert_eq!(coarse.rejected, 1);
    // Zero-guess circular correlation may land a pixel or so short of the
    // true shift; ICGN takes it from there.
    for poi in &pois[..9] {
        assert!(!poi.is_rejected(), "{poi:?}");
        assert!(poi.deformation.u.fract() == 0.0 && poi.deformation.v.fract() == 0.0);
    }

    let gradient = Gradient2D::new(&reference);
    let interp = BicubicInterpolator::prepared(&target);
    let frame = Frame2D { reference: &reference, gradient: &gradient, target: &interp };
    let icgn = Icgn2D1::new(rx, ry, config.icgn.options.clone(), config.worker_count())
        .expect("icgn");
    let mut single = pois.clone();
    let fine = icgn.compute_batch(&frame, &mut pois).expect("icgn batch");

    assert_eq!(fine.valid, 9);
    assert!(fine.mean_iterations >= 1.0);
    for poi in &pois[..9] {
        let [u, v, _] = stretch([f64::from(poi.x), f64::from(poi.y), 0.0]);
        assert!((f64::from(poi.deformation.u) - u).abs() < 0.03, "{poi:?}");
        assert!((f64::from(poi.deformation.v) - v).abs() < 0.03, "{poi:?}");
        assert!((poi.deformation.ux - 0.005).abs() < 2e-3, "{poi:?}");
        assert!(poi.result.zncc > 0.99, "{poi:?}");
    }
    assert!(pois[9].is_rejected());

    for poi in &mut single {
        icgn.compute(1, &frame, poi).expect("compute");
    }
    assert_eq!(single, pois);
}
