// This file is part of dem_tile_engine.
//
// dem_tile_engine is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// dem_tile_engine is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with dem_tile_engine.  If not, see <http://www.gnu.org/licenses/>.
use crate::config::InterpolationMethod;
use image::{imageops, ImageBuffer, Luma};

/// Resamples a square padded coarse-DEM patch up (or down) to fine
/// resolution and trims the source padding back off in target pixels.
///
/// `patch` is row-major `patch_side x patch_side`. `scale_factor` is
/// `source_resolution / resolution`. `source_padding` is `P_c`, the
/// padding present in `patch` on every edge. Returns a row-major
/// `target_side x target_side` patch with `target_side =
/// round(patch_side * scale_factor) - 2 * floor(source_padding * scale_factor)`.
pub fn interpolate(
    patch: &[f32],
    patch_side: usize,
    source_padding: i64,
    scale_factor: f64,
    method: InterpolationMethod,
) -> Vec<f32> {
    debug_assert_eq!(patch.len(), patch_side * patch_side);

    let resampled_side = ((patch_side as f64) * scale_factor).round() as usize;
    let resampled = resample(patch, patch_side, resampled_side, method);

    let trim = ((source_padding as f64) * scale_factor).floor() as usize;
    trim_edges(&resampled, resampled_side, trim)
}

fn resample(patch: &[f32], patch_side: usize, target_side: usize, method: InterpolationMethod) -> Vec<f32> {
    if method == InterpolationMethod::Area {
        return resample_area(patch, patch_side, target_side);
    }

    let filter = match method {
        InterpolationMethod::Nearest => imageops::FilterType::Nearest,
        InterpolationMethod::Linear => imageops::FilterType::Triangle,
        InterpolationMethod::Bicubic => imageops::FilterType::CatmullRom,
        InterpolationMethod::Area => unreachable!(),
    };

    let source: ImageBuffer<Luma<f32>, Vec<f32>> =
        ImageBuffer::from_raw(patch_side as u32, patch_side as u32, patch.to_vec())
            .expect("patch buffer matches advertised side");
    let resized = imageops::resize(&source, target_side as u32, target_side as u32, filter);
    resized.into_raw()
}

/// Box-filter average, analogous to `cv2.INTER_AREA`: each output pixel is
/// the mean of the input region it covers under the linear scale mapping.
fn resample_area(patch: &[f32], patch_side: usize, target_side: usize) -> Vec<f32> {
    if target_side == 0 {
        return Vec::new();
    }
    let scale = patch_side as f64 / target_side as f64;
    let mut out = vec![0.0f32; target_side * target_side];
    for ox in 0..target_side {
        let x_lo = ((ox as f64) * scale).floor() as usize;
        let x_hi = (((ox + 1) as f64) * scale).ceil().min(patch_side as f64) as usize;
        let x_hi = x_hi.max(x_lo + 1).min(patch_side);
        for oy in 0..target_side {
            let y_lo = ((oy as f64) * scale).floor() as usize;
            let y_hi = (((oy + 1) as f64) * scale).ceil().min(patch_side as f64) as usize;
            let y_hi = y_hi.max(y_lo + 1).min(patch_side);

            let mut sum = 0.0f64;
            let mut count = 0u32;
            for ix in x_lo..x_hi {
                for iy in y_lo..y_hi {
                    sum += patch[ix * patch_side + iy] as f64;
                    count += 1;
                }
            }
            out[ox * target_side + oy] = (sum / count.max(1) as f64) as f32;
        }
    }
    out
}

fn trim_edges(data: &[f32], side: usize, trim: usize) -> Vec<f32> {
    if trim == 0 {
        return data.to_vec();
    }
    let new_side = side.saturating_sub(2 * trim);
    let mut out = vec![0.0f32; new_side * new_side];
    for x in 0..new_side {
        for y in 0..new_side {
            out[x * new_side + y] = data[(x + trim) * side + (y + trim)];
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_shape_is_exact_for_every_method() {
        let patch_side = 6usize; // T_c=2, P_c=2
        let patch = vec![1.0f32; patch_side * patch_side];
        for method in [
            InterpolationMethod::Nearest,
            InterpolationMethod::Linear,
            InterpolationMethod::Bicubic,
            InterpolationMethod::Area,
        ] {
            let out = interpolate(&patch, patch_side, 2, 5.0, method);
            // resampled_side = 30, trim = floor(2*5)=10, target = 10
            assert_eq!(out.len(), 10 * 10, "method {:?}", method);
        }
    }

    #[test]
    fn identity_at_unit_scale_for_nearest_and_linear() {
        let patch_side = 6usize;
        let mut patch = vec![0.0f32; patch_side * patch_side];
        for x in 0..patch_side {
            for y in 0..patch_side {
                patch[x * patch_side + y] = (x * 10 + y) as f32;
            }
        }
        for method in [InterpolationMethod::Nearest, InterpolationMethod::Linear] {
            let out = interpolate(&patch, patch_side, 2, 1.0, method);
            let new_side = patch_side - 4;
            assert_eq!(out.len(), new_side * new_side);
            for x in 0..new_side {
                for y in 0..new_side {
                    assert_eq!(
                        out[x * new_side + y],
                        patch[(x + 2) * patch_side + (y + 2)],
                        "at ({x},{y}) method {:?}",
                        method
                    );
                }
            }
        }
    }

    #[test]
    fn nearest_round_trips_integer_values() {
        let patch_side = 4usize;
        let patch: Vec<f32> = (0..patch_side * patch_side).map(|v| v as f32).collect();
        let out = interpolate(&patch, patch_side, 0, 3.0, InterpolationMethod::Nearest);
        for &v in &out {
            assert_eq!(v.fract(), 0.0);
        }
    }
}
