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

//! Drives a [`dem_tile_engine::TileEngine`] through a simulated rover
//! traverse over synthetic terrain, printing progress and optionally
//! dumping the final composite raster to a PNG.

use anyhow::Result;
use dem_tile_engine::{
    BoundingBox, CoarseDem, CraterMetadataSource, CraterRasterizer, TileEngine, WindowConfig,
    WorldBlock,
};
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "dem-demo",
    about = "Simulate a rover traverse over synthetic terrain, streaming DEM tiles as it moves."
)]
struct Opt {
    /// Number of traverse steps to simulate.
    #[structopt(long, default_value = "12")]
    steps: usize,

    /// World units moved per step.
    #[structopt(long, default_value = "40.0")]
    step_size: f64,

    /// Interpolation method: nearest, linear, area, or bicubic.
    #[structopt(long, default_value = "bicubic")]
    method: String,

    /// Dump the final composite raster to this PNG path.
    #[structopt(long)]
    dump_png: Option<PathBuf>,
}

/// A smooth, deterministic synthetic coarse DEM: a sum of a few sine waves,
/// sampled on a dense grid wide enough to cover the whole traverse.
struct SyntheticHeightField {
    rows: i64,
    cols: i64,
    center: (i64, i64),
    data: Vec<f32>,
}

impl SyntheticHeightField {
    fn new(rows: i64, cols: i64, center: (i64, i64)) -> Self {
        let mut data = vec![0.0f32; (rows * cols) as usize];
        for i in 0..rows {
            for j in 0..cols {
                let x = (i - center.0) as f64;
                let y = (j - center.1) as f64;
                let elevation = 12.0 * (x / 37.0).sin() * (y / 29.0).cos()
                    + 4.0 * (x / 11.0).cos()
                    + 0.02 * x;
                data[(i * cols + j) as usize] = elevation as f32;
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

impl CoarseDem for SyntheticHeightField {
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

/// One synthetic crater: center offset within its block, radius, and depth,
/// all in world units.
#[derive(Clone, Copy, Debug)]
struct Crater {
    x: f64,
    y: f64,
    radius: f64,
    depth: f64,
}

/// A deterministic stand-in for a real crater database: generates between
/// zero and three craters per block the first time it is asked about, seeded
/// from the block's own coordinates so repeated queries are stable.
struct SyntheticCraterDatabase {
    block_size: f64,
    generated: Mutex<HashMap<WorldBlock, Vec<Crater>>>,
}

impl SyntheticCraterDatabase {
    fn new(block_size: f64) -> Self {
        Self {
            block_size,
            generated: Mutex::new(HashMap::new()),
        }
    }

    fn seed_for(anchor: WorldBlock) -> u64 {
        // A cheap, stable hash; not cryptographic, just deterministic per block.
        let x = anchor.0 as u64;
        let y = anchor.1 as u64;
        x.wrapping_mul(0x9E3779B97F4A7C15)
            ^ y.wrapping_mul(0xC2B2AE3D27D4EB4F)
    }

    fn generate(&self, anchor: WorldBlock) -> Vec<Crater> {
        let mut rng = StdRng::seed_from_u64(Self::seed_for(anchor));
        let count = rng.gen_range(0..=3);
        (0..count)
            .map(|_| Crater {
                x: rng.gen_range(0.0..self.block_size),
                y: rng.gen_range(0.0..self.block_size),
                radius: rng.gen_range(3.0..12.0),
                depth: rng.gen_range(0.5..4.0),
            })
            .collect()
    }
}

impl CraterMetadataSource for SyntheticCraterDatabase {
    type Metadata = Vec<Crater>;

    fn sample_by_region(&self, region: BoundingBox) {
        let mut generated = self.generated.lock().unwrap();
        let block_size = self.block_size as i64;
        let mut x = (region.x_min / block_size) * block_size;
        while x <= region.x_max {
            let mut y = (region.y_min / block_size) * block_size;
            while y <= region.y_max {
                generated.entry((x, y)).or_insert_with(|| self.generate((x, y)));
                y += block_size;
            }
            x += block_size;
        }
    }

    fn block_exists(&self, anchor: WorldBlock) -> bool {
        self.generated.lock().unwrap().contains_key(&anchor)
    }

    fn block_data(&self, anchor: WorldBlock) -> Vec<Crater> {
        self.generated
            .lock()
            .unwrap()
            .get(&anchor)
            .cloned()
            .unwrap_or_default()
    }
}

/// Rasterizes a block's craters as additive (negative) paraboloid bowls.
#[derive(Clone)]
struct BowlCraterRasterizer {
    tile_px: usize,
    block_size: f64,
}

impl CraterRasterizer for BowlCraterRasterizer {
    type Metadata = Vec<Crater>;

    fn build(&self, metadata: Vec<Crater>, _anchor: WorldBlock) -> Result<Vec<f32>> {
        let mut out = vec![0.0f32; self.tile_px * self.tile_px];
        let step = self.block_size / self.tile_px as f64;
        for crater in metadata {
            for ix in 0..self.tile_px {
                for iy in 0..self.tile_px {
                    let px = (ix as f64 + 0.5) * step;
                    let py = (iy as f64 + 0.5) * step;
                    let dist = ((px - crater.x).powi(2) + (py - crater.y).powi(2)).sqrt();
                    if dist < crater.radius {
                        let depth = crater.depth * (1.0 - (dist / crater.radius).powi(2));
                        out[ix * self.tile_px + iy] -= depth as f32;
                    }
                }
            }
        }
        Ok(out)
    }
}

fn dump_png(path: &PathBuf, data: &[f32], side: usize) -> Result<()> {
    let min = data.iter().cloned().fold(f32::INFINITY, f32::min);
    let max = data.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let span = (max - min).max(1e-6);
    let mut buffer = image::GrayImage::new(side as u32, side as u32);
    for x in 0..side {
        for y in 0..side {
            let normalized = ((data[x * side + y] - min) / span * 255.0) as u8;
            buffer.put_pixel(y as u32, x as u32, image::Luma([normalized]));
        }
    }
    buffer.save(path)?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let opt = Opt::from_args();

    let config = WindowConfig::new(2, 64.0, 8.0, 1.0, 8.0, &opt.method, 2)?;
    let coarse_dem = SyntheticHeightField::new(2048, 2048, (1024, 1024));
    let crater_source = SyntheticCraterDatabase::new(config.block_size);
    let crater_builder = BowlCraterRasterizer {
        tile_px: config.tile_pixels() as usize,
        block_size: config.block_size,
    };
    let mut engine = TileEngine::new(coarse_dem, crater_source, crater_builder, config);

    let start = Instant::now();
    let mut position = (0.0f64, 0.0f64);
    for step in 0..opt.steps {
        let heading = (step as f64 * 0.4).sin();
        position.0 += opt.step_size * heading.cos();
        position.1 += opt.step_size * heading.sin();

        engine.shift(position)?;

        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            engine.collect()?;
            if Instant::now() > deadline {
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }

        log::info!(
            "step {step}: position {:?}, window center {:?}, elapsed {:?}",
            position,
            engine.center(),
            start.elapsed()
        );
    }

    if let Some(path) = opt.dump_png.as_ref() {
        dump_png(path, engine.raster().as_slice(), engine.raster().side())?;
        log::info!("wrote composite raster to {}", path.display());
    }

    engine.shutdown();
    Ok(())
}
