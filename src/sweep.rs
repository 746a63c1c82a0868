//! Cache-aware parameter sweep scheduler
//!
//! For one panel of the agreement figure (fixed genus, distance method and
//! island) the scheduler:
//! 1. probes the result cache for every sweep coordinate,
//! 2. queues the misses on a pending-work channel followed by one shutdown
//!    sentinel per worker,
//! 3. runs a fixed pool of workers that call the agreement oracle,
//! 4. drains the completed-work channel until every dispatched item is back,
//! 5. assembles cached and computed results into a [`Grid`].
//!
//! Workers share nothing with the coordinator but the two channels.

use crate::cache::{ResultCache, ResultRecord};
use crate::coordinate::SweepCoordinate;
use crate::grid::{Exclusions, Grid, GridKey};
use crate::oracle::{AgreementOracle, WorkItem};
use anyhow::{anyhow, bail, Context, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Message on the pending-work channel
#[derive(Debug)]
enum Job {
    Compute(WorkItem),
    /// One per worker, queued after all real work
    Shutdown,
}

/// Message on the completed-work channel
#[derive(Debug)]
enum Completion {
    Computed(ResultRecord),
    Failed {
        coordinate: SweepCoordinate,
        error: anyhow::Error,
    },
    WorkerFinished(usize),
}

/// Accumulates cached and computed results, refusing duplicate positions
#[derive(Debug, Default)]
pub struct SweepAccumulator {
    records: Vec<ResultRecord>,
    index: HashMap<GridKey, usize>,
}

impl SweepAccumulator {
    pub fn fold(&mut self, record: ResultRecord) -> Result<()> {
        let key = GridKey::of(&record);
        if let Some(&i) = self.index.get(&key) {
            bail!(
                "Two results for grid position ({}, {}): {} and {}",
                record.x,
                record.y,
                self.records[i].metric,
                record.metric
            );
        }
        self.index.insert(key, self.records.len());
        self.records.push(record);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[ResultRecord] {
        &self.records
    }

    /// Record with the highest finite metric (first folded wins ties)
    pub fn best(&self) -> Option<&ResultRecord> {
        self.records
            .iter()
            .filter(|r| r.metric.is_finite())
            .fold(None, |best: Option<&ResultRecord>, r| match best {
                Some(b) if b.metric >= r.metric => Some(b),
                _ => Some(r),
            })
    }
}

/// Result of one sweep
#[derive(Debug, Clone)]
pub struct SweepOutcome {
    pub grid: Grid,
    /// All records folded into the grid, cached first, then in arrival order
    pub records: Vec<ResultRecord>,
    /// Best parameter combination (threshold, cutoff, label)
    pub best: Option<ResultRecord>,
    pub cached: usize,
    pub dispatched: usize,
    pub excluded: usize,
    pub workers_started: usize,
    /// "Worker finished" markers received
    pub workers_finished: usize,
}

/// Runs sweeps against a result cache with a fixed-size worker pool
pub struct SweepScheduler {
    cache: ResultCache,
    oracle: Arc<dyn AgreementOracle>,
    worker_count: usize,
    exclusions: Exclusions,
    /// Where distance artifacts live and the oracle writes results
    output_dir: PathBuf,
    cache_dir: PathBuf,
}

impl SweepScheduler {
    pub fn new(cache: ResultCache, oracle: Arc<dyn AgreementOracle>, worker_count: usize) -> Self {
        let output_dir = cache.dir().to_path_buf();
        SweepScheduler {
            cache_dir: output_dir.clone(),
            output_dir,
            cache,
            oracle,
            worker_count,
            exclusions: Exclusions::default(),
        }
    }

    pub fn with_exclusions(mut self, exclusions: Exclusions) -> Self {
        self.exclusions = exclusions;
        self
    }

    pub fn with_cache_dir(mut self, cache_dir: PathBuf) -> Self {
        self.cache_dir = cache_dir;
        self
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    fn work_item(&self, coordinate: SweepCoordinate) -> WorkItem {
        WorkItem {
            artifact: self.output_dir.join(coordinate.distance_artifact_name()),
            coordinate,
            output_dir: self.output_dir.clone(),
            cache_dir: self.cache_dir.clone(),
        }
    }

    /// Run one sweep over `coordinates`.
    ///
    /// All coordinates must map to distinct (threshold, cutoff) positions.
    pub fn run(&self, coordinates: Vec<SweepCoordinate>) -> Result<SweepOutcome> {
        if self.worker_count == 0 {
            bail!("Sweep worker count must be at least 1");
        }

        let total = coordinates.len();
        let mut excluded = 0;
        let mut positions: HashMap<GridKey, SweepCoordinate> = HashMap::with_capacity(total);
        let mut kept = Vec::with_capacity(total);
        for coordinate in coordinates {
            if self
                .exclusions
                .excludes_cutoff(coordinate.most_abund_seq_cutoff.value())
            {
                log::debug!("Excluded cutoff: {}", coordinate);
                excluded += 1;
                continue;
            }
            let key = GridKey::new(
                coordinate.samples_at_least_threshold.value(),
                coordinate.most_abund_seq_cutoff.value(),
            );
            if let Some(previous) = positions.insert(key, coordinate.clone()) {
                bail!(
                    "Inconsistent sweep: {} and {} share a grid position",
                    previous,
                    coordinate
                );
            }
            kept.push(coordinate);
        }

        let (job_tx, job_rx) = unbounded::<Job>();
        let (done_tx, done_rx) = unbounded::<Completion>();

        let mut accumulator = SweepAccumulator::default();
        let mut cached = 0;
        let mut dispatched = 0;
        for coordinate in kept {
            match self.cache.probe(&coordinate)? {
                Some(record) => {
                    accumulator.fold(record)?;
                    cached += 1;
                }
                None => {
                    job_tx
                        .send(Job::Compute(self.work_item(coordinate)))
                        .map_err(|_| anyhow!("Pending-work queue closed"))?;
                    dispatched += 1;
                }
            }
        }

        log::info!(
            "Sweep ({}): {} coordinates, {} cached, {} to compute, {} excluded",
            self.oracle.name(),
            total,
            cached,
            dispatched,
            excluded
        );

        if dispatched == 0 {
            return Self::outcome(accumulator, cached, 0, excluded, 0, 0);
        }

        for _ in 0..self.worker_count {
            job_tx
                .send(Job::Shutdown)
                .map_err(|_| anyhow!("Pending-work queue closed"))?;
        }

        let handles = self.spawn_workers(&job_rx, &done_tx)?;
        drop(done_tx);

        let pb = ProgressBar::new(dispatched as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} coordinates ({percent}%) ETA: {eta}")
                .unwrap()
                .progress_chars("=>-"),
        );
        pb.set_message("Classification agreement");

        let mut received = 0;
        let mut finished = 0;
        let mut failure: Option<anyhow::Error> = None;
        while received < dispatched {
            match done_rx.recv() {
                Ok(Completion::Computed(record)) => {
                    received += 1;
                    pb.inc(1);
                    log::info!(
                        "[{}/{}] threshold {} cutoff {}: {:.4} (k={})",
                        received,
                        dispatched,
                        record.x,
                        record.y,
                        record.metric,
                        record.label
                    );
                    if let Err(e) = accumulator.fold(record) {
                        failure = Some(e);
                        break;
                    }
                }
                Ok(Completion::WorkerFinished(id)) => {
                    log::debug!("Sweep worker {} finished", id);
                    finished += 1;
                }
                Ok(Completion::Failed { coordinate, error }) => {
                    failure = Some(error.context(format!("Agreement oracle failed for {}", coordinate)));
                    break;
                }
                Err(_) => {
                    failure = Some(anyhow!(
                        "All sweep workers exited with {} of {} results outstanding",
                        dispatched - received,
                        dispatched
                    ));
                    break;
                }
            }
        }

        if failure.is_some() {
            // Discard queued work (and the sentinels behind it), then re-issue
            // one sentinel per worker so every worker still exits cleanly.
            let discarded = job_rx
                .try_iter()
                .filter(|job| matches!(job, Job::Compute(_)))
                .count();
            for _ in 0..self.worker_count {
                let _ = job_tx.send(Job::Shutdown);
            }
            log::warn!(
                "Aborting sweep: {} queued coordinates discarded, waiting for {} workers",
                discarded,
                self.worker_count
            );
        }

        for (id, handle) in handles.into_iter().enumerate() {
            if handle.join().is_err() && failure.is_none() {
                failure = Some(anyhow!("Sweep worker {} panicked", id));
            }
        }
        finished += done_rx
            .try_iter()
            .filter(|c| matches!(c, Completion::WorkerFinished(_)))
            .count();

        if let Some(error) = failure {
            pb.abandon_with_message("Classification agreement aborted");
            return Err(error);
        }
        pb.finish_with_message("Classification agreement complete");

        Self::outcome(
            accumulator,
            cached,
            dispatched,
            excluded,
            self.worker_count,
            finished,
        )
    }

    fn spawn_workers(
        &self,
        jobs: &Receiver<Job>,
        done: &Sender<Completion>,
    ) -> Result<Vec<JoinHandle<()>>> {
        (0..self.worker_count)
            .map(|id| {
                let oracle = Arc::clone(&self.oracle);
                let jobs = jobs.clone();
                let done = done.clone();
                thread::Builder::new()
                    .name(format!("sweep-worker-{}", id))
                    .spawn(move || run_worker(id, oracle, jobs, done))
                    .with_context(|| format!("Failed to spawn sweep worker {}", id))
            })
            .collect()
    }

    fn outcome(
        accumulator: SweepAccumulator,
        cached: usize,
        dispatched: usize,
        excluded: usize,
        workers_started: usize,
        workers_finished: usize,
    ) -> Result<SweepOutcome> {
        let grid = Grid::assemble(accumulator.records())?;
        let best = accumulator.best().cloned();
        Ok(SweepOutcome {
            grid,
            records: accumulator.records,
            best,
            cached,
            dispatched,
            excluded,
            workers_started,
            workers_finished,
        })
    }
}

/// Worker loop: compute until the shutdown sentinel, then report finished
fn run_worker(
    id: usize,
    oracle: Arc<dyn AgreementOracle>,
    jobs: Receiver<Job>,
    done: Sender<Completion>,
) {
    while let Ok(job) = jobs.recv() {
        let item = match job {
            Job::Shutdown => break,
            Job::Compute(item) => item,
        };

        log::debug!("Worker {} computing {}", id, item.coordinate);
        let message = match oracle.compute(&item) {
            Ok(agreement) => Completion::Computed(ResultRecord::for_coordinate(
                &item.coordinate,
                agreement.value,
                agreement.label,
            )),
            Err(error) => Completion::Failed {
                coordinate: item.coordinate,
                error,
            },
        };
        if done.send(message).is_err() {
            return;
        }
    }
    let _ = done.send(Completion::WorkerFinished(id));
}
