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
use crate::error::ConfigError;

/// Resampling method used by the interpolation kernel, mirroring the cv2
/// interpolation flags the original generator forwarded.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InterpolationMethod {
    Nearest,
    Linear,
    Area,
    Bicubic,
}

impl InterpolationMethod {
    fn parse(s: &str) -> Result<Self, ConfigError> {
        match s.to_lowercase().as_str() {
            "nearest" => Ok(Self::Nearest),
            "linear" => Ok(Self::Linear),
            "area" => Ok(Self::Area),
            "bicubic" => Ok(Self::Bicubic),
            other => Err(ConfigError::UnknownInterpolationMethod(other.to_owned())),
        }
    }
}

/// Immutable parameters describing the window geometry and the resampling
/// pipeline. Constructed once and shared for the lifetime of a
/// [`crate::engine::TileEngine`].
#[derive(Clone, Debug)]
pub struct WindowConfig {
    /// Half-window size, in tiles, not counting the one-tile padding ring.
    pub num_blocks: i64,
    /// Tile side length, in world units.
    pub block_size: f64,
    /// Rasterization padding forwarded to the crater builder collaborator, in world units.
    pub pad_size: f64,
    /// Fine-DEM pixel pitch, in world units.
    pub resolution: f64,
    /// Coarse-DEM pixel pitch, in world units.
    pub source_resolution: f64,
    /// Interpolation method applied to coarse-DEM patches.
    pub interpolation_method: InterpolationMethod,
    /// Edge margin, in coarse pixels, retained around each patch before trimming.
    pub interpolation_padding: i64,
}

impl WindowConfig {
    /// Validates and normalizes a raw set of parameters into a `WindowConfig`.
    ///
    /// Non-positive sizes and an unknown `interpolation_method` are fatal
    /// (`Err`). A `interpolation_padding` smaller than 2, or a method whose
    /// natural scaling direction mismatches `source_resolution/resolution`,
    /// is a warning: the value is coerced and construction proceeds.
    pub fn new(
        num_blocks: i64,
        block_size: f64,
        pad_size: f64,
        resolution: f64,
        source_resolution: f64,
        interpolation_method: &str,
        interpolation_padding: i64,
    ) -> Result<Self, ConfigError> {
        if num_blocks < 1 {
            return Err(ConfigError::NumBlocksTooSmall(num_blocks));
        }
        for (field, value) in [
            ("block_size", block_size),
            ("resolution", resolution),
            ("source_resolution", source_resolution),
        ] {
            if value <= 0.0 {
                return Err(ConfigError::NonPositiveSize { field, value });
            }
        }

        let method = InterpolationMethod::parse(interpolation_method)?;

        let mut padding = interpolation_padding;
        if padding < 2 {
            log::warn!(
                "interpolation_padding {} may be too small for interpolation, coercing to 2",
                padding
            );
            padding = 2;
        }

        let scale = source_resolution / resolution;
        if scale < 1.0 && method == InterpolationMethod::Bicubic {
            log::warn!(
                "bicubic interpolation with downscaling (factor {:.4}); consider a different method",
                scale
            );
        }
        if scale > 1.0 && method == InterpolationMethod::Area {
            log::warn!(
                "area interpolation with upscaling (factor {:.4}); consider a different method",
                scale
            );
        }

        Ok(Self {
            num_blocks,
            block_size,
            pad_size,
            resolution,
            source_resolution,
            interpolation_method: method,
            interpolation_padding: padding,
        })
    }

    /// Number of tiles on a side of the window, including the padding ring.
    pub fn window_span(&self) -> i64 {
        self.num_blocks * 2 + 3
    }

    /// Pixel side length of one tile at fine resolution (`T` in the design doc).
    pub fn tile_pixels(&self) -> i64 {
        (self.block_size / self.resolution).round() as i64
    }

    /// Pixel side length of one tile at coarse resolution (`T_c`).
    pub fn coarse_tile_pixels(&self) -> i64 {
        (self.block_size / self.source_resolution).round() as i64
    }

    /// Side length of the raster buffer, in pixels (`S`).
    pub fn raster_side(&self) -> i64 {
        self.window_span() * self.tile_pixels()
    }

    /// Ratio between source and target resolution (`f` in the design doc).
    pub fn scale_factor(&self) -> f64 {
        self.source_resolution / self.resolution
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_method() {
        let err = WindowConfig::new(1, 10.0, 1.0, 1.0, 5.0, "lanczos", 2).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownInterpolationMethod(_)));
    }

    #[test]
    fn rejects_non_positive_sizes() {
        assert!(WindowConfig::new(1, 0.0, 1.0, 1.0, 5.0, "nearest", 2).is_err());
        assert!(WindowConfig::new(1, 10.0, 1.0, -1.0, 5.0, "nearest", 2).is_err());
    }

    #[test]
    fn rejects_too_few_blocks() {
        assert!(WindowConfig::new(0, 10.0, 1.0, 1.0, 5.0, "nearest", 2).is_err());
    }

    #[test]
    fn coerces_small_padding() {
        let cfg = WindowConfig::new(1, 10.0, 1.0, 1.0, 5.0, "nearest", 1).unwrap();
        assert_eq!(cfg.interpolation_padding, 2);
    }

    #[test]
    fn derives_expected_geometry() {
        let cfg = WindowConfig::new(1, 10.0, 1.0, 1.0, 5.0, "bicubic", 2).unwrap();
        assert_eq!(cfg.window_span(), 5);
        assert_eq!(cfg.tile_pixels(), 10);
        assert_eq!(cfg.coarse_tile_pixels(), 2);
        assert_eq!(cfg.raster_side(), 50);
        assert!((cfg.scale_factor() - 5.0).abs() < 1e-9);
    }
}
