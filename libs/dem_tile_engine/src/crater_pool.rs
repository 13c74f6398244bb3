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
use crate::collaborators::CraterRasterizer;
use crate::grid::WorldBlock;
use crate::pool::{PoolResult, WorkerPool};

/// Parallelizes a [`CraterRasterizer`] over many worker lanes. Pure
/// plumbing: the kernel is the rasterizer's own `build`.
pub struct CraterBuildPool<M> {
    inner: WorkerPool<WorldBlock, M, Vec<f32>>,
}

impl<M: Send + 'static> CraterBuildPool<M> {
    pub fn new<B>(
        num_workers: usize,
        intake_capacity: usize,
        output_capacity: usize,
        worker_capacity: usize,
        builder: B,
    ) -> Self
    where
        B: CraterRasterizer<Metadata = M>,
    {
        let inner = WorkerPool::new(
            num_workers,
            intake_capacity,
            output_capacity,
            worker_capacity,
            move |anchor, metadata| {
                builder
                    .build(metadata, anchor)
                    .map_err(|e| format!("{e:#}"))
            },
        );
        Self { inner }
    }

    pub fn submit(&self, anchor: WorldBlock, metadata: M) {
        self.inner.submit(anchor, metadata);
    }

    pub fn drain(&self) -> Vec<PoolResult<WorldBlock, Vec<f32>>> {
        self.inner.drain()
    }

    pub fn shutdown(&mut self) {
        self.inner.shutdown();
    }
}
