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
use thiserror::Error;

/// Fatal problems detected while validating a [`crate::config::WindowConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unrecognized interpolation method: {0}")]
    UnknownInterpolationMethod(String),

    #[error("num_blocks must be >= 1, got {0}")]
    NumBlocksTooSmall(i64),

    #[error("{field} must be positive, got {value}")]
    NonPositiveSize { field: &'static str, value: f64 },
}

/// Errors surfaced by [`crate::engine::TileEngine`] at its public seams.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("operation attempted on a TileEngine after shutdown()")]
    ShutdownAfterUse,
}
