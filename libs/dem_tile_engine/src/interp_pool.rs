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
use crate::grid::WorldBlock;
use crate::interp::interpolate;
use crate::pool::{PoolResult, WorkerPool};

/// A coarse-DEM patch, row-major, alongside its side length — plain enough
/// to cross a channel by value, mirroring the original design's "workers
/// receive their patches by value" contract.
#[derive(Clone)]
pub struct CoarsePatch {
    pub data: Vec<f32>,
    pub side: usize,
}

/// Parallelizes the interpolation kernel (§4.3) over a small number of
/// worker lanes. The pool is deliberately capped at a low worker count by
/// its caller: the resampling kernel is CPU-bound and any internal
/// vectorization it performs should not be multiplied by excess lanes.
pub struct InterpolationPool {
    inner: WorkerPool<WorldBlock, CoarsePatch, Vec<f32>>,
}

impl InterpolationPool {
    pub fn new(
        num_workers: usize,
        intake_capacity: usize,
        output_capacity: usize,
        worker_capacity: usize,
        source_padding: i64,
        scale_factor: f64,
        method: InterpolationMethod,
    ) -> Self {
        let inner = WorkerPool::new(
            num_workers,
            intake_capacity,
            output_capacity,
            worker_capacity,
            move |_anchor, patch: CoarsePatch| {
                Ok(interpolate(
                    &patch.data,
                    patch.side,
                    source_padding,
                    scale_factor,
                    method,
                ))
            },
        );
        Self { inner }
    }

    pub fn submit(&self, anchor: WorldBlock, patch: CoarsePatch) {
        self.inner.submit(anchor, patch);
    }

    pub fn drain(&self) -> Vec<PoolResult<WorldBlock, Vec<f32>>> {
        self.inner.drain()
    }

    pub fn shutdown(&mut self) {
        self.inner.shutdown();
    }
}
