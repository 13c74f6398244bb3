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
use std::collections::HashMap;

/// World-space block anchor, in integer multiples of `block_size`.
pub type WorldBlock = (i64, i64);

/// Window-relative tile offset, dimensionless, in `[-(num_blocks+1), num_blocks+1]`.
pub type LocalOffset = (i64, i64);

/// Rounds a floating-point world coordinate to its nearest integer
/// representation. The single conversion point every `block_size`-scaled
/// computation in this crate funnels through, so that the grid's own
/// offset arithmetic and the engine's block-alignment floor can never
/// round a fractional `block_size` differently and disagree on a world
/// anchor.
pub fn round_world(x: f64) -> i64 {
    x.round() as i64
}

/// Floors `x` down to the nearest lower multiple of `block_size`, as an
/// integer world coordinate. `block_size` need not be an integer; the
/// floor is taken before rounding so fractional block sizes still land on
/// a consistent block boundary.
pub fn floor_to_block(x: f64, block_size: f64) -> i64 {
    round_world((x / block_size).floor() * block_size)
}

/// World anchor for the tile at `offset` blocks away from `center`, along
/// one axis. Mirrors `floor_to_block`'s rounding so that a center produced
/// by `floor_to_block` plus an integer block offset always reproduces the
/// same world coordinate `floor_to_block` itself would compute for it.
fn offset_world(center: i64, offset: i64, block_size: f64) -> i64 {
    round_world(center as f64 + offset as f64 * block_size)
}

/// Per-tile synthesis progress. Flags are monotonic within a tile's lifetime:
/// once set, a flag is only cleared by the tile leaving the window (at which
/// point its `BlockState` is dropped entirely, not reset).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct BlockState {
    pub has_crater_metadata: bool,
    pub has_crater_raster: bool,
    pub has_terrain_raster: bool,
    pub is_padding: bool,
}

/// Bookkeeping for the set of tiles currently in view: which local offset
/// each world anchor currently occupies, and what synthesis state each
/// occupied offset has reached.
pub struct BlockGrid {
    num_blocks: i64,
    state_by_local: HashMap<LocalOffset, BlockState>,
    local_by_world: HashMap<WorldBlock, LocalOffset>,
    center: WorldBlock,
}

impl BlockGrid {
    /// Builds a fresh window centered at `center`, with every tile's flags cleared.
    pub fn rebuild(num_blocks: i64, block_size: f64, center: WorldBlock) -> Self {
        let mut grid = Self {
            num_blocks,
            state_by_local: HashMap::new(),
            local_by_world: HashMap::new(),
            center,
        };
        let margin = num_blocks + 1;
        for dx in -margin..=margin {
            for dy in -margin..=margin {
                let local = (dx, dy);
                let world = (
                    offset_world(center.0, dx, block_size),
                    offset_world(center.1, dy, block_size),
                );
                let mut state = BlockState::default();
                state.is_padding = Self::is_padding_offset(num_blocks, local);
                grid.state_by_local.insert(local, state);
                grid.local_by_world.insert(world, local);
            }
        }
        grid
    }

    /// Shifts the window to a new block-aligned center, carrying over the
    /// state of any tile whose world anchor is still present, and discarding
    /// the rest. `is_padding` is recomputed against the *new* mapping only.
    pub fn shift(&mut self, block_size: f64, new_center: WorldBlock) {
        let num_blocks = self.num_blocks;
        let margin = num_blocks + 1;
        let mut new_state_by_local = HashMap::new();
        let mut new_local_by_world = HashMap::new();

        for dx in -margin..=margin {
            for dy in -margin..=margin {
                let local = (dx, dy);
                let world = (
                    offset_world(new_center.0, dx, block_size),
                    offset_world(new_center.1, dy, block_size),
                );
                let mut state = match self.local_by_world.get(&world) {
                    Some(prior_local) => self
                        .state_by_local
                        .get(prior_local)
                        .copied()
                        .unwrap_or_default(),
                    None => BlockState::default(),
                };
                state.is_padding = Self::is_padding_offset(num_blocks, local);
                new_state_by_local.insert(local, state);
                new_local_by_world.insert(world, local);
            }
        }

        self.state_by_local = new_state_by_local;
        self.local_by_world = new_local_by_world;
        self.center = new_center;
    }

    fn is_padding_offset(num_blocks: i64, local: LocalOffset) -> bool {
        let margin = num_blocks + 1;
        local.0.abs().max(local.1.abs()) == margin
    }

    pub fn center(&self) -> WorldBlock {
        self.center
    }

    pub fn num_blocks(&self) -> i64 {
        self.num_blocks
    }

    pub fn local_of(&self, world: WorldBlock) -> Option<LocalOffset> {
        self.local_by_world.get(&world).copied()
    }

    pub fn state(&self, local: LocalOffset) -> Option<&BlockState> {
        self.state_by_local.get(&local)
    }

    pub fn state_mut(&mut self, local: LocalOffset) -> Option<&mut BlockState> {
        self.state_by_local.get_mut(&local)
    }

    /// Iterates every `(world_anchor, local_offset)` pair currently tracked.
    pub fn iter_world(&self) -> impl Iterator<Item = (&WorldBlock, &LocalOffset)> {
        self.local_by_world.iter()
    }

    pub fn len(&self) -> usize {
        self.state_by_local.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state_by_local.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expected_tile_count(num_blocks: i64) -> usize {
        let span = (num_blocks * 2 + 3) as usize;
        span * span
    }

    #[test]
    fn rebuild_produces_expected_tile_count() {
        let grid = BlockGrid::rebuild(1, 10.0, (0, 0));
        assert_eq!(grid.len(), expected_tile_count(1));
    }

    #[test]
    fn padding_is_pure_function_of_offset() {
        let grid = BlockGrid::rebuild(2, 10.0, (0, 0));
        for dx in -3..=3i64 {
            for dy in -3..=3i64 {
                let expected = dx.abs().max(dy.abs()) == 3;
                assert_eq!(
                    grid.state((dx, dy)).unwrap().is_padding,
                    expected,
                    "offset ({dx},{dy})"
                );
            }
        }
    }

    #[test]
    fn shift_preserves_tile_count() {
        let mut grid = BlockGrid::rebuild(1, 10.0, (0, 0));
        grid.shift(10.0, (10, 0));
        assert_eq!(grid.len(), expected_tile_count(1));
        grid.shift(10.0, (1000, 1000));
        assert_eq!(grid.len(), expected_tile_count(1));
    }

    #[test]
    fn shift_carries_over_surviving_state() {
        let mut grid = BlockGrid::rebuild(1, 10.0, (0, 0));
        // Mark the tile at world (10, 0) — which survives a +1 block shift — as fully synthesized.
        let local = grid.local_of((10, 0)).unwrap();
        {
            let state = grid.state_mut(local).unwrap();
            state.has_crater_metadata = true;
            state.has_crater_raster = true;
            state.has_terrain_raster = true;
        }
        grid.shift(10.0, (10, 0));
        let new_local = grid.local_of((10, 0)).unwrap();
        let state = grid.state(new_local).unwrap();
        assert!(state.has_crater_metadata);
        assert!(state.has_crater_raster);
        assert!(state.has_terrain_raster);
    }

    #[test]
    fn shift_past_window_drops_all_prior_state() {
        let mut grid = BlockGrid::rebuild(1, 10.0, (0, 0));
        let local = grid.local_of((0, 0)).unwrap();
        grid.state_mut(local).unwrap().has_terrain_raster = true;
        grid.shift(10.0, (1000, 1000));
        assert!(grid.local_of((0, 0)).is_none());
        for (_, local) in grid.iter_world() {
            let state = grid.state(*local).unwrap();
            if !state.is_padding {
                assert!(!state.has_terrain_raster);
            }
        }
    }

    #[test]
    fn newly_padding_tile_is_flagged_after_shift() {
        // A tile that was interior before the shift but falls into the new margin
        // must be marked as padding against the *new* grid, not the old one.
        let mut grid = BlockGrid::rebuild(1, 10.0, (0, 0));
        grid.shift(10.0, (10, 0));
        // World anchor (0,0) was the old center (interior); after shifting +1 block
        // in x it becomes the new offset (-1, 0), which is interior still (num_blocks=1).
        let local = grid.local_of((0, 0)).unwrap();
        assert!(!grid.state(local).unwrap().is_padding);
        // World anchor (-10, 0) was interior before (offset (-1,0)); after the shift
        // it becomes offset (-2, 0), the new padding margin.
        let local = grid.local_of((-10, 0)).unwrap();
        assert!(grid.state(local).unwrap().is_padding);
    }
}
