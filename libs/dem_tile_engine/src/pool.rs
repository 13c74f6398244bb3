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
use crossbeam::channel::{bounded, Receiver, Sender};
use std::thread::{self, JoinHandle};

/// A job submitted to a [`WorkerPool`]: `None` is the shutdown sentinel that
/// walks intake -> dispatcher -> every worker lane.
type Job<K, I> = Option<(K, I)>;

/// Result envelope returned by a worker: `Ok(output)` on success, or the
/// kernel's error message on failure. The pool never panics on a kernel
/// error; it is carried here for the caller to inspect via `drain`.
pub type PoolResult<K, O> = (K, Result<O, String>);

/// A generic bounded-queue parallel executor. `submit` pushes `(key, input)`
/// onto the intake queue (blocking if full); a dispatcher thread routes each
/// job onto whichever worker lane currently has the shortest queue; each
/// worker applies `kernel` and pushes `(key, Result<output, String>)` onto
/// the shared output queue. `drain` returns everything currently available
/// without blocking. `shutdown` (or `Drop`) injects the sentinel and joins
/// every thread.
pub struct WorkerPool<K, I, O> {
    intake_tx: Sender<Job<K, I>>,
    output_rx: Receiver<PoolResult<K, O>>,
    worker_txs: Vec<Sender<Job<K, I>>>,
    dispatcher: Option<JoinHandle<()>>,
    workers: Vec<JoinHandle<()>>,
    shut_down: bool,
}

impl<K, I, O> WorkerPool<K, I, O>
where
    K: Clone + Send + 'static,
    I: Send + 'static,
    O: Send + 'static,
{
    /// Spawns `num_workers` worker lanes plus one dispatcher thread. `kernel`
    /// is cloned once per worker so each lane owns an independent copy of
    /// whatever mutable scratch state the kernel carries.
    pub fn new<Kern>(
        num_workers: usize,
        intake_capacity: usize,
        output_capacity: usize,
        worker_capacity: usize,
        kernel: Kern,
    ) -> Self
    where
        Kern: Fn(K, I) -> Result<O, String> + Clone + Send + 'static,
    {
        assert!(num_workers >= 1, "a worker pool needs at least one worker");

        let (intake_tx, intake_rx) = bounded::<Job<K, I>>(intake_capacity);
        let (output_tx, output_rx) = bounded::<PoolResult<K, O>>(output_capacity);

        let mut worker_txs = Vec::with_capacity(num_workers);
        let mut worker_rxs = Vec::with_capacity(num_workers);
        for _ in 0..num_workers {
            let (tx, rx) = bounded::<Job<K, I>>(worker_capacity);
            worker_txs.push(tx);
            worker_rxs.push(rx);
        }

        let workers = worker_rxs
            .into_iter()
            .enumerate()
            .map(|(lane, rx)| {
                let kernel = kernel.clone();
                let output_tx = output_tx.clone();
                thread::Builder::new()
                    .name(format!("dem-pool-worker-{lane}"))
                    .spawn(move || Self::worker_loop(rx, output_tx, kernel))
                    .expect("spawn worker thread")
            })
            .collect();

        let dispatch_worker_txs = worker_txs.clone();
        let dispatcher = thread::Builder::new()
            .name("dem-pool-dispatcher".to_string())
            .spawn(move || Self::dispatch_loop(intake_rx, dispatch_worker_txs))
            .expect("spawn dispatcher thread");

        Self {
            intake_tx,
            output_rx,
            worker_txs,
            dispatcher: Some(dispatcher),
            workers,
            shut_down: false,
        }
    }

    fn dispatch_loop(intake_rx: Receiver<Job<K, I>>, worker_txs: Vec<Sender<Job<K, I>>>) {
        while let Ok(job) = intake_rx.recv() {
            match job {
                None => {
                    for tx in &worker_txs {
                        let _ = tx.send(None);
                    }
                    break;
                }
                Some((key, input)) => {
                    let shortest = worker_txs
                        .iter()
                        .enumerate()
                        .min_by_key(|(_, tx)| tx.len())
                        .map(|(idx, _)| idx)
                        .unwrap_or(0);
                    let _ = worker_txs[shortest].send(Some((key, input)));
                }
            }
        }
    }

    fn worker_loop<Kern>(rx: Receiver<Job<K, I>>, output_tx: Sender<PoolResult<K, O>>, kernel: Kern)
    where
        Kern: Fn(K, I) -> Result<O, String>,
    {
        while let Ok(job) = rx.recv() {
            match job {
                None => break,
                Some((key, input)) => {
                    let envelope_key = key.clone();
                    let result = kernel(key, input);
                    let _ = output_tx.send((envelope_key, result));
                }
            }
        }
    }

    /// Blocks if the intake queue is full; returns once the job is accepted.
    pub fn submit(&self, key: K, input: I) {
        self.intake_tx
            .send(Some((key, input)))
            .expect("pool dispatcher thread is alive");
    }

    /// Returns every `(key, result)` pair currently available, without
    /// blocking for more to arrive.
    pub fn drain(&self) -> Vec<PoolResult<K, O>> {
        self.output_rx.try_iter().collect()
    }

    /// Current queue depth for each worker lane, for diagnostics/tests.
    pub fn load_per_worker(&self) -> Vec<usize> {
        self.worker_txs.iter().map(|tx| tx.len()).collect()
    }

    /// Injects the shutdown sentinel and joins every thread. Idempotent.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        let _ = self.intake_tx.send(None);
        if let Some(handle) = self.dispatcher.take() {
            let _ = handle.join();
        }
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

impl<K, I, O> Drop for WorkerPool<K, I, O> {
    fn drop(&mut self) {
        if !self.shut_down {
            self.shut_down = true;
            let _ = self.intake_tx.send(None);
            if let Some(handle) = self.dispatcher.take() {
                let _ = handle.join();
            }
            for handle in self.workers.drain(..) {
                let _ = handle.join();
            }
        }
    }
}
