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
use crate::collaborators::{BoundingBox, CoarseDem, CraterMetadataSource, CraterRasterizer};
use crate::config::WindowConfig;
use crate::crater_pool::CraterBuildPool;
use crate::error::EngineError;
use crate::grid::{floor_to_block, BlockGrid, WorldBlock};
use crate::interp_pool::{CoarsePatch, InterpolationPool};
use crate::raster::RasterBuffer;

const CRATER_WORKERS: usize = 8;
const CRATER_INTAKE: usize = 400;
const CRATER_OUTPUT: usize = 16;
const CRATER_WORKER_QUEUE: usize = 2;

const INTERP_WORKERS: usize = 1;
const INTERP_INTAKE: usize = 400;
const INTERP_OUTPUT: usize = 30;
const INTERP_WORKER_QUEUE: usize = 200;

/// Orchestrates the streaming tile window: owns the grid tracker, the
/// composite raster buffer, and both worker pools. `S`/`B` share a metadata
/// type so the payload the metadata source hands out is exactly what the
/// rasterizer consumes.
pub struct TileEngine<S, B, D>
where
    S: CraterMetadataSource,
    B: CraterRasterizer<Metadata = S::Metadata>,
    D: CoarseDem,
{
    config: WindowConfig,
    grid: BlockGrid,
    raster: RasterBuffer,
    coarse_dem: D,
    crater_source: S,
    // Declared after `crater_pool` so it drops (and shuts down) first,
    // giving a reverse-of-construction shutdown order.
    interp_pool: InterpolationPool,
    crater_pool: CraterBuildPool<S::Metadata>,
    pending_terrain_errors: Vec<(WorldBlock, String)>,
    shut_down: bool,
}

impl<S, B, D> TileEngine<S, B, D>
where
    S: CraterMetadataSource,
    B: CraterRasterizer<Metadata = S::Metadata>,
    D: CoarseDem,
{
    pub fn new(coarse_dem: D, crater_source: S, crater_builder: B, config: WindowConfig) -> Self {
        let raster = RasterBuffer::new(config.raster_side() as usize);
        let grid = BlockGrid::rebuild(config.num_blocks, config.block_size, (0, 0));
        let crater_pool = CraterBuildPool::new(
            CRATER_WORKERS,
            CRATER_INTAKE,
            CRATER_OUTPUT,
            CRATER_WORKER_QUEUE,
            crater_builder,
        );
        let interp_pool = InterpolationPool::new(
            INTERP_WORKERS,
            INTERP_INTAKE,
            INTERP_OUTPUT,
            INTERP_WORKER_QUEUE,
            config.interpolation_padding,
            config.scale_factor(),
            config.interpolation_method,
        );
        Self {
            config,
            grid,
            raster,
            coarse_dem,
            crater_source,
            interp_pool,
            crater_pool,
            pending_terrain_errors: Vec::new(),
            shut_down: false,
        }
    }

    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    pub fn raster(&self) -> &RasterBuffer {
        &self.raster
    }

    pub fn center(&self) -> WorldBlock {
        self.grid.center()
    }

    /// Moves the window to cover `world_xy`, reusing tiles still in view and
    /// queuing synthesis for the rest. Always completes its raster
    /// translation and job submission before returning.
    pub fn shift(&mut self, world_xy: (f64, f64)) -> Result<(), EngineError> {
        if self.shut_down {
            return Err(EngineError::ShutdownAfterUse);
        }

        let new_center = (
            floor_to_block(world_xy.0, self.config.block_size),
            floor_to_block(world_xy.1, self.config.block_size),
        );
        let old_center = self.grid.center();
        let delta = (new_center.0 - old_center.0, new_center.1 - old_center.1);
        let pixel_delta = (
            -((delta.0 as f64) / self.config.resolution).round() as i64,
            -((delta.1 as f64) / self.config.resolution).round() as i64,
        );

        log::debug!(
            "shift: {:?} -> {:?}, pixel delta {:?}",
            old_center,
            new_center,
            pixel_delta
        );

        self.grid.shift(self.config.block_size, new_center);
        self.raster.translate(pixel_delta.0, pixel_delta.1);

        let margin = self.config.num_blocks + 2;
        let region = BoundingBox {
            x_min: new_center.0 - margin * self.config.block_size as i64,
            x_max: new_center.0 + margin * self.config.block_size as i64,
            y_min: new_center.1 - margin * self.config.block_size as i64,
            y_max: new_center.1 + margin * self.config.block_size as i64,
        };
        self.crater_source.sample_by_region(region);

        let world_anchors: Vec<(WorldBlock, (i64, i64))> = self
            .grid
            .iter_world()
            .map(|(&w, &l)| (w, l))
            .collect();

        for &(anchor, local) in &world_anchors {
            if self.crater_source.block_exists(anchor) {
                self.grid.state_mut(local).unwrap().has_crater_metadata = true;
            } else {
                log::warn!("block {:?} does not have crater metadata yet", anchor);
            }
        }

        for &(anchor, local) in &world_anchors {
            let state = *self.grid.state(local).unwrap();
            if !state.has_crater_raster && state.has_crater_metadata {
                let metadata = self.crater_source.block_data(anchor);
                self.crater_pool.submit(anchor, metadata);
            }
            if !state.has_terrain_raster {
                match self.extract_patch(anchor) {
                    Ok(patch) => self.interp_pool.submit(anchor, patch),
                    Err(message) => {
                        log::error!("terrain patch extraction failed for {:?}: {}", anchor, message);
                        self.pending_terrain_errors.push((anchor, message));
                    }
                }
            }
        }

        Ok(())
    }

    fn extract_patch(&self, anchor: WorldBlock) -> Result<CoarsePatch, String> {
        let (cx, cy) = self.coarse_dem.center();
        let src_res = self.config.source_resolution;
        let tc = self.config.coarse_tile_pixels();
        let pc = self.config.interpolation_padding;

        let px = (anchor.0 as f64 / src_res).floor() as i64 + cx;
        let py = (anchor.1 as f64 / src_res).floor() as i64 + cy;

        let side = (tc + 2 * pc) as usize;
        let mut data = vec![0.0f32; side * side];
        for oi in 0..side {
            let i = px - pc + oi as i64;
            for oj in 0..side {
                let j = py - pc + oj as i64;
                match self.coarse_dem.get(i, j) {
                    Some(v) => data[oi * side + oj] = v,
                    None => {
                        return Err(format!(
                            "coarse DEM index ({i},{j}) out of range for block {anchor:?}"
                        ))
                    }
                }
            }
        }
        Ok(CoarsePatch { data, side })
    }

    /// Drains both pools and composites whatever is immediately available;
    /// never blocks waiting for more. Safe to call repeatedly.
    pub fn collect(&mut self) -> Result<(), EngineError> {
        if self.shut_down {
            return Err(EngineError::ShutdownAfterUse);
        }

        for (anchor, message) in self.pending_terrain_errors.drain(..) {
            log::error!("terrain synthesis failed for {:?}: {}", anchor, message);
        }

        let tile_px = self.config.tile_pixels() as usize;
        let num_blocks = self.config.num_blocks;

        for (anchor, result) in self.crater_pool.drain() {
            let Some(local) = self.grid.local_of(anchor) else {
                continue;
            };
            match result {
                Ok(raster) => {
                    self.raster.add_tile(num_blocks, tile_px, local, &raster);
                    self.grid.state_mut(local).unwrap().has_crater_raster = true;
                }
                Err(message) => {
                    log::error!("crater build failed for {:?}: {}", anchor, message);
                }
            }
        }

        for (anchor, result) in self.interp_pool.drain() {
            let Some(local) = self.grid.local_of(anchor) else {
                continue;
            };
            match result {
                Ok(raster) => {
                    self.raster.add_tile(num_blocks, tile_px, local, &raster);
                    self.grid.state_mut(local).unwrap().has_terrain_raster = true;
                }
                Err(message) => {
                    log::error!("terrain interpolation failed for {:?}: {}", anchor, message);
                }
            }
        }

        Ok(())
    }

    /// Cascades shutdown to both pools, in reverse construction order.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.interp_pool.shutdown();
        self.crater_pool.shutdown();
        self.shut_down = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    struct GradientDem {
        rows: i64,
        cols: i64,
        center: (i64, i64),
        data: Vec<f32>,
    }

    impl GradientDem {
        fn new(rows: i64, cols: i64, center: (i64, i64)) -> Self {
            let mut data = vec![0.0f32; (rows * cols) as usize];
            for i in 0..rows {
                for j in 0..cols {
                    data[(i * cols + j) as usize] = (i * 1000 + j) as f32;
                }
            }
            Self {
                rows,
                cols,
                center,
                data,
            }
        }
    }

    impl CoarseDem for GradientDem {
        fn shape(&self) -> (i64, i64) {
            (self.rows, self.cols)
        }
        fn center(&self) -> (i64, i64) {
            self.center
        }
        fn get(&self, i: i64, j: i64) -> Option<f32> {
            if i < 0 || j < 0 || i >= self.rows || j >= self.cols {
                None
            } else {
                Some(self.data[(i * self.cols + j) as usize])
            }
        }
    }

    struct AlwaysCraterSource;

    impl CraterMetadataSource for AlwaysCraterSource {
        type Metadata = ();
        fn sample_by_region(&self, _region: BoundingBox) {}
        fn block_exists(&self, _anchor: WorldBlock) -> bool {
            true
        }
        fn block_data(&self, _anchor: WorldBlock) {}
    }

    #[derive(Clone)]
    struct ConstantCraterBuilder {
        tile_px: usize,
        value: f32,
    }

    impl CraterRasterizer for ConstantCraterBuilder {
        type Metadata = ();
        fn build(&self, _metadata: (), _anchor: WorldBlock) -> anyhow::Result<Vec<f32>> {
            Ok(vec![self.value; self.tile_px * self.tile_px])
        }
    }

    fn test_config() -> WindowConfig {
        WindowConfig::new(1, 10.0, 1.0, 1.0, 5.0, "nearest", 2).unwrap()
    }

    type TestEngine = TileEngine<AlwaysCraterSource, ConstantCraterBuilder, GradientDem>;

    fn new_engine() -> TestEngine {
        let config = test_config();
        let dem = GradientDem::new(81, 81, (40, 40));
        TileEngine::new(dem, AlwaysCraterSource, ConstantCraterBuilder { tile_px: 10, value: 2.0 }, config)
    }

    fn drain_until_quiescent(engine: &mut TestEngine, expected_tiles: usize) {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            engine.collect().unwrap();
            if tiles_fully_synthesized(engine) >= expected_tiles || Instant::now() > deadline {
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    fn tiles_fully_synthesized(engine: &TestEngine) -> usize {
        let margin = engine.config.num_blocks + 1;
        let mut count = 0;
        for dx in -margin..=margin {
            for dy in -margin..=margin {
                if let Some(state) = engine.grid.state((dx, dy)) {
                    if state.has_crater_raster && state.has_terrain_raster {
                        count += 1;
                    }
                }
            }
        }
        count
    }

    #[test]
    fn initial_placement_synthesizes_every_tile() {
        let mut engine = new_engine();
        engine.shift((0.0, 0.0)).unwrap();
        let expected = (engine.config.window_span() * engine.config.window_span()) as usize;
        drain_until_quiescent(&mut engine, expected);
        assert_eq!(tiles_fully_synthesized(&engine), expected);
        // Crater contribution (2.0) must be present everywhere a tile landed.
        let side = engine.raster().side();
        let mut nonzero = 0;
        for x in 0..side {
            for y in 0..side {
                if engine.raster().get(x, y) != 0.0 {
                    nonzero += 1;
                }
            }
        }
        assert_eq!(nonzero, side * side);
    }

    #[test]
    fn zero_shift_is_a_no_op_on_flags_and_raster() {
        let mut engine = new_engine();
        engine.shift((0.0, 0.0)).unwrap();
        let expected = (engine.config.window_span() * engine.config.window_span()) as usize;
        drain_until_quiescent(&mut engine, expected);
        let before = engine.raster().as_slice().to_vec();

        engine.shift((0.0, 0.0)).unwrap();
        engine.collect().unwrap();
        // no new jobs should have been queued, so an immediate collect is a no-op
        assert_eq!(engine.raster().as_slice(), before.as_slice());
    }

    #[test]
    fn sub_block_shift_does_not_advance_window() {
        let mut engine = new_engine();
        engine.shift((0.0, 0.0)).unwrap();
        let expected = (engine.config.window_span() * engine.config.window_span()) as usize;
        drain_until_quiescent(&mut engine, expected);

        engine.shift((4.0, 0.0)).unwrap();
        assert_eq!(engine.center(), (0, 0));
    }

    #[test]
    fn one_block_shift_advances_window_and_retains_count() {
        let mut engine = new_engine();
        engine.shift((0.0, 0.0)).unwrap();
        let expected = (engine.config.window_span() * engine.config.window_span()) as usize;
        drain_until_quiescent(&mut engine, expected);

        engine.shift((10.0, 0.0)).unwrap();
        assert_eq!(engine.center(), (10, 0));
        drain_until_quiescent(&mut engine, expected);
        assert_eq!(tiles_fully_synthesized(&engine), expected);
    }

    #[test]
    fn diagonal_shift_past_window_replaces_everything() {
        let mut engine = new_engine();
        engine.shift((0.0, 0.0)).unwrap();
        let expected = (engine.config.window_span() * engine.config.window_span()) as usize;
        drain_until_quiescent(&mut engine, expected);

        engine.shift((1000.0, 1000.0)).unwrap();
        assert_eq!(engine.center(), (1000, 1000));
        // The coarse DEM does not extend out there, so terrain extraction
        // fails for every tile; craters are still built (unaffected by the
        // coarse DEM failure) since the crater collaborator is a separate
        // external system.
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            engine.collect().unwrap();
            let margin = engine.config.num_blocks + 1;
            let all_crater_done = (-margin..=margin).all(|dx| {
                (-margin..=margin).all(|dy| engine.grid.state((dx, dy)).unwrap().has_crater_raster)
            });
            if all_crater_done || Instant::now() > deadline {
                assert!(all_crater_done, "craters should complete even when terrain cannot");
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        let margin = engine.config.num_blocks + 1;
        for dx in -margin..=margin {
            for dy in -margin..=margin {
                assert!(!engine.grid.state((dx, dy)).unwrap().has_terrain_raster);
            }
        }
    }

    #[test]
    fn returning_to_origin_reproduces_original_raster() {
        let mut engine = new_engine();
        engine.shift((0.0, 0.0)).unwrap();
        let expected = (engine.config.window_span() * engine.config.window_span()) as usize;
        drain_until_quiescent(&mut engine, expected);
        let original = engine.raster().as_slice().to_vec();

        engine.shift((10.0, 0.0)).unwrap();
        drain_until_quiescent(&mut engine, expected);
        engine.shift((0.0, 0.0)).unwrap();
        drain_until_quiescent(&mut engine, expected);

        assert_eq!(engine.raster().as_slice(), original.as_slice());
    }

    #[test]
    fn shutdown_then_shift_is_an_error() {
        let mut engine = new_engine();
        engine.shift((0.0, 0.0)).unwrap();
        engine.shutdown();
        assert!(matches!(
            engine.shift((0.0, 0.0)),
            Err(EngineError::ShutdownAfterUse)
        ));
        assert!(matches!(engine.collect(), Err(EngineError::ShutdownAfterUse)));
    }

    #[test]
    fn shutdown_is_idempotent() {
        let mut engine = new_engine();
        engine.shutdown();
        engine.shutdown();
    }
}
