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
use crate::grid::WorldBlock;

/// Axis-aligned region in world units, used to ask the crater metadata
/// collaborator to ensure coverage over the window plus its padding ring.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BoundingBox {
    pub x_min: i64,
    pub x_max: i64,
    pub y_min: i64,
    pub y_max: i64,
}

/// The crater metadata/database subsystem, treated as an external
/// collaborator: the tile engine only needs it to ensure coverage over a
/// region, report whether a block has metadata, and hand back that block's
/// metadata payload for rasterization.
pub trait CraterMetadataSource: Send + Sync {
    /// Opaque per-block payload handed to a [`CraterRasterizer`].
    type Metadata: Send + 'static;

    /// Ensures metadata exists for every block anchor within `region`.
    fn sample_by_region(&self, region: BoundingBox);

    /// Whether metadata has been generated for the block at `anchor`.
    fn block_exists(&self, anchor: WorldBlock) -> bool;

    /// The metadata payload for `anchor`. Only called when `block_exists` is true.
    fn block_data(&self, anchor: WorldBlock) -> Self::Metadata;
}

/// The crater rasterization kernel: converts a block's crater metadata into
/// an additive elevation delta. Implementations are cloned once per worker
/// lane by the crater build pool, so any mutable scratch state must be
/// cheap to duplicate.
pub trait CraterRasterizer: Clone + Send + 'static {
    type Metadata: Send + 'static;

    /// Builds a `tile_px x tile_px`, row-major additive raster for `anchor`
    /// from `metadata`. Errors are carried back to the caller through the
    /// pool's result envelope rather than panicking.
    fn build(&self, metadata: Self::Metadata, anchor: WorldBlock) -> anyhow::Result<Vec<f32>>;
}

/// The coarse DEM: a dense, read-only 2-D array of elevations at
/// `source_resolution` world units per pixel, with `[center().0,
/// center().1]` corresponding to world origin `(0, 0)`.
pub trait CoarseDem: Send + Sync {
    /// `(rows, cols)`.
    fn shape(&self) -> (i64, i64);

    /// Pixel indices corresponding to world origin `(0, 0)`.
    fn center(&self) -> (i64, i64);

    /// Elevation at pixel `(i, j)`, or `None` if out of bounds.
    fn get(&self, i: i64, j: i64) -> Option<f32>;
}
