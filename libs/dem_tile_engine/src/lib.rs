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

//! A streaming high-resolution DEM tile engine.
//!
//! Keeps a fixed-size window of fine-resolution terrain, centered on a
//! moving agent, in sync as the agent moves: tiles that fall out of view are
//! dropped, tiles that come into view are synthesized from a coarse DEM (by
//! interpolation) and a crater metadata collaborator (by rasterization), and
//! the results are composited into one dense raster buffer in place.
//!
//! See [`engine::TileEngine`] for the orchestrator and
//! [`config::WindowConfig`] for the parameters that describe a window.

pub mod collaborators;
pub mod config;
pub mod crater_pool;
pub mod engine;
pub mod error;
pub mod grid;
pub mod interp;
pub mod interp_pool;
pub mod pool;
pub mod raster;

pub use collaborators::{BoundingBox, CoarseDem, CraterMetadataSource, CraterRasterizer};
pub use config::{InterpolationMethod, WindowConfig};
pub use engine::TileEngine;
pub use error::{ConfigError, EngineError};
pub use grid::{BlockGrid, BlockState, LocalOffset, WorldBlock};
pub use pool::{PoolResult, WorkerPool};
pub use raster::RasterBuffer;
