//! Disk I/O for the demo driver: grayscale image pairs in, JSON reports out.
use super::ImageF32;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Decode any format the `image` crate knows into 8-bit luma intensities
/// stored as f32 (0..255).
pub fn load_grayscale_f32(path: &Path) -> Result<ImageF32, String> {
    let luma = image::open(path)
        .map_err(|e| format!("Failed to open {}: {e}", path.display()))?
        .into_luma8();
    let (w, h) = (luma.width() as usize, luma.height() as usize);
    let data = luma.into_raw().into_iter().map(f32::from).collect();
    ImageF32::from_vec(w, h, data)
        .ok_or_else(|| format!("Decoded buffer size mismatch for {}", path.display()))
}

/// Load a reference/target pair; both frames must share their dimensions.
pub fn load_image_pair(reference: &Path, target: &Path) -> Result<(ImageF32, ImageF32), String> {
    let r = load_grayscale_f32(reference)?;
    let t = load_grayscale_f32(target)?;
    if (r.w, r.h) != (t.w, t.h) {
        return Err(format!(
            "Reference {} is {}x{} but target {} is {}x{}",
            reference.display(),
            r.w,
            r.h,
            target.display(),
            t.w,
            t.h
        ));
    }
    Ok((r, t))
}

/// Pretty-print `value` as JSON to `path`, creating parent directories.
pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<(), String> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create {}: {e}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| format!("Failed to serialize JSON for {}: {e}", path.display()))?;
    fs::write(path, json).map_err(|e| format!("Failed to write {}: {e}", path.display()))
}
