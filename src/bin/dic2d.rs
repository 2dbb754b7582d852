use serde::Serialize;
use std::env;
use std::path::PathBuf;
use std::time::Instant;
use subset_dic::config::{load_config, RunConfig};
use subset_dic::diagnostics::timing::elapsed_ms;
use subset_dic::diagnostics::{BatchStats, TimingBreakdown};
use subset_dic::gradient::Gradient2D;
use subset_dic::image::io::{load_image_pair, write_json_file};
use subset_dic::image::ImageF32;
use subset_dic::interp::BicubicInterpolator;
use subset_dic::{Fftcc2D, Frame2D, Icgn2D1, Icgn2D2, Poi2D};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RunReport {
    workers: usize,
    subset_radius: [usize; 2],
    icgn_order: u8,
    speckle_size: Option<[f32; 2]>,
    fftcc: BatchStats,
    icgn: BatchStats,
    timing: TimingBreakdown,
    pois: Vec<Poi2D>,
}

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .ok_or_else(|| "Usage: dic2d <config.json>".to_string())?;
    let config = load_config(&path)?;
    let start = Instant::now();
    let mut timing = TimingBreakdown::default();

    let (reference, target) = load_image_pair(&config.reference, &config.target)?;
    let mut pois = config.poi_grid.build();
    let workers = config.worker_count();
    let [rx, ry] = config.subset_radius;

    let fftcc = Fftcc2D::new(rx, ry, workers).map_err(|e| e.to_string())?;
    let speckle_size = match &config.speckle {
        Some(speckle) => speckle_at_center(&fftcc, &reference, &pois, speckle.half_peak_ratio)?,
        None => None,
    };
    let fftcc_stats = timing
        .measure("fftcc", || fftcc.compute_batch(&reference, &target, &mut pois))
        .map_err(|e| e.to_string())?;
    drop(fftcc);

    let icgn_stats = timing
        .measure("icgn", || refine(&config, &reference, &target, &mut pois))
        .map_err(|e| e.to_string())?;
    timing.total_ms = elapsed_ms(start);

    print_summary(&config, &fftcc_stats, &icgn_stats, &timing, speckle_size);

    if let Some(out) = &config.output.json_out {
        let report = RunReport {
            workers,
            subset_radius: config.subset_radius,
            icgn_order: config.icgn.order,
            speckle_size,
            fftcc: fftcc_stats,
            icgn: icgn_stats,
            timing,
            pois,
        };
        write_json_file(out, &report)?;
        println!("JSON report written to {}", out.display());
    }
    Ok(())
}

/// Speckle size around the POI closest to the middle of the grid.
fn speckle_at_center(
    fftcc: &Fftcc2D,
    reference: &ImageF32,
    pois: &[Poi2D],
    half_peak_ratio: f32,
) -> Result<Option<[f32; 2]>, String> {
    let Some(poi) = pois.get(pois.len() / 2) else {
        return Ok(None);
    };
    fftcc
        .speckle_size(0, reference, poi, half_peak_ratio)
        .map_err(|e| e.to_string())
}

fn refine(
    config: &RunConfig,
    reference: &ImageF32,
    target: &ImageF32,
    pois: &mut [Poi2D],
) -> Result<BatchStats, subset_dic::DicError> {
    let gradient = Gradient2D::new(reference);
    let interp = BicubicInterpolator::prepared(target);
    let frame = Frame2D {
        reference,
        gradient: &gradient,
        target: &interp,
    };
    let [rx, ry] = config.subset_radius;
    let options = config.icgn.options.clone();
    let workers = config.worker_count();
    if config.icgn.order == 2 {
        Icgn2D2::new(rx, ry, options, workers)?.compute_batch(&frame, pois)
    } else {
        Icgn2D1::new(rx, ry, options, workers)?.compute_batch(&frame, pois)
    }
}

fn print_summary(
    config: &RunConfig,
    fftcc: &BatchStats,
    icgn: &BatchStats,
    timing: &TimingBreakdown,
    speckle_size: Option<[f32; 2]>,
) {
    println!("DIC summary");
    println!("  reference: {}", config.reference.display());
    println!("  target: {}", config.target.display());
    println!(
        "  subset radius: {:?}, ICGN order: {}, workers: {}",
        config.subset_radius,
        config.icgn.order,
        config.worker_count()
    );
    if let Some([sx, sy]) = speckle_size {
        println!("  speckle size: {sx:.2} x {sy:.2} px");
    }
    println!(
        "  FFT-CC: {}/{} valid in {:.1} ms",
        fftcc.valid, fftcc.total, fftcc.elapsed_ms
    );
    println!(
        "  ICGN: {}/{} valid, mean iterations {:.2}, {:.1} ms",
        icgn.valid, icgn.total, icgn.mean_iterations, icgn.elapsed_ms
    );
    for stage in &timing.stages {
        println!("  [{}] {:.1} ms", stage.label, stage.elapsed_ms);
    }
    println!("  total: {:.1} ms", timing.total_ms);
}
