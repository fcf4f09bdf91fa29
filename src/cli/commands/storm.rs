//! Storm command: many threads submit equal-key tasks at the same instant.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use clap::Args;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::time::{Duration, Instant};
use tracing::info;

use crate::cli::output::{key_value_table, output, CommandOutput};
use crate::domain::models::{Config, DedupPolicy};
use crate::domain::ports::Task;
use crate::infrastructure::pool::TokioWorkerPool;
use crate::services::{ExecutorStats, FoldingExecutor, TaskHandle};

#[derive(Args, Debug)]
pub struct StormArgs {
    /// Number of submitting threads
    #[arg(short, long, default_value_t = 100)]
    pub threads: usize,

    /// Number of distinct fold keys the threads spread over
    #[arg(short, long, default_value_t = 1)]
    pub keys: usize,

    /// Dedup policy (overrides configuration)
    #[arg(short, long)]
    pub policy: Option<DedupPolicy>,

    /// Simulated work per generation, in milliseconds
    #[arg(long, default_value_t = 50)]
    pub work_ms: u64,

    /// Worker pool concurrency (overrides configuration)
    #[arg(long)]
    pub max_concurrency: Option<usize>,
}

/// Task submitted by every storm thread; yields the submitter whose body ran.
#[derive(Debug)]
struct StormTask {
    key: String,
    submitter: usize,
    work: Duration,
}

#[async_trait]
impl Task for StormTask {
    type Key = String;
    type Output = usize;

    fn fold_key(&self) -> String {
        self.key.clone()
    }

    async fn run(self) -> Result<usize> {
        if !self.work.is_zero() {
            tokio::time::sleep(self.work).await;
        }
        Ok(self.submitter)
    }
}

type StormExecutor = FoldingExecutor<StormTask, TokioWorkerPool>;

#[derive(Debug, Serialize)]
pub struct StormReport {
    pub policy: DedupPolicy,
    pub threads: usize,
    pub keys: usize,
    /// Distinct entries the submissions were folded into
    pub generations: usize,
    /// Submitters whose task body actually ran
    pub winners: usize,
    pub completed: usize,
    pub failed: usize,
    pub elapsed_ms: u128,
    pub stats: ExecutorStats,
}

impl CommandOutput for StormReport {
    fn to_human(&self) -> String {
        let fold_ratio = if self.threads == 0 {
            0.0
        } else {
            #[allow(clippy::cast_precision_loss)]
            let ratio = self.stats.folded as f64 / self.threads as f64;
            ratio * 100.0
        };

        key_value_table([
            ("policy", self.policy.to_string()),
            ("threads", self.threads.to_string()),
            ("keys", self.keys.to_string()),
            ("generations", self.generations.to_string()),
            ("winners", self.winners.to_string()),
            ("completed", self.completed.to_string()),
            ("failed", self.failed.to_string()),
            ("submitted", self.stats.submitted.to_string()),
            ("folded", format!("{} ({fold_ratio:.1}%)", self.stats.folded)),
            ("spawned", self.stats.spawned.to_string()),
            ("evicted", self.stats.evicted.to_string()),
            ("rejected", self.stats.rejected.to_string()),
            ("elapsed", format!("{}ms", self.elapsed_ms)),
        ])
        .to_string()
    }
}

pub async fn execute(args: StormArgs, config: &Config, json_mode: bool) -> Result<()> {
    if args.threads == 0 {
        return Err(anyhow!("--threads must be at least 1"));
    }
    let keys = args.keys.max(1);

    let mut config = config.clone();
    if let Some(policy) = args.policy {
        config.policy = policy;
    }
    if let Some(max_concurrency) = args.max_concurrency {
        config.pool.max_concurrency = max_concurrency;
        config.pool.queue_capacity = config.pool.queue_capacity.max(max_concurrency);
    }

    let pool = TokioWorkerPool::current(&config.pool)?;
    let executor = Arc::new(StormExecutor::from_config(&config, pool));
    let work = Duration::from_millis(args.work_ms);
    let threads = args.threads;

    info!(threads, keys, policy = %config.policy, "starting storm");
    let started = Instant::now();

    let submitter = Arc::clone(&executor);
    let handles = tokio::task::spawn_blocking(move || storm(&submitter, threads, keys, work))
        .await
        .context("storm submitters did not finish")??;

    let generations = handles
        .iter()
        .map(TaskHandle::entry_id)
        .collect::<HashSet<_>>()
        .len();

    let mut winners = HashSet::new();
    let mut completed = 0;
    let mut failed = 0;
    for handle in &handles {
        match handle.await {
            Ok(submitter) => {
                completed += 1;
                winners.insert(submitter);
            }
            Err(_) => failed += 1,
        }
    }

    executor.shutdown();
    if !executor.await_termination(Duration::from_secs(30)).await {
        return Err(anyhow!("worker pool did not drain within 30s"));
    }

    let report = StormReport {
        policy: config.policy,
        threads,
        keys,
        generations,
        winners: winners.len(),
        completed,
        failed,
        elapsed_ms: started.elapsed().as_millis(),
        stats: executor.stats(),
    };
    info!(generations, spawned = report.stats.spawned, "storm finished");

    output(&report, json_mode);
    Ok(())
}

/// Release `threads` submitters through a barrier and collect their handles.
fn storm(
    executor: &StormExecutor,
    threads: usize,
    keys: usize,
    work: Duration,
) -> Result<Vec<TaskHandle<usize>>> {
    let barrier = Barrier::new(threads);

    std::thread::scope(|scope| {
        let workers: Vec<_> = (0..threads)
            .map(|submitter| {
                let barrier = &barrier;
                scope.spawn(move || {
                    barrier.wait();
                    executor.submit(StormTask {
                        key: format!("key-{}", submitter % keys),
                        submitter,
                        work,
                    })
                })
            })
            .collect();

        workers
            .into_iter()
            .map(|worker| {
                worker
                    .join()
                    .map_err(|_| anyhow!("submitter thread panicked"))?
                    .map_err(anyhow::Error::from)
            })
            .collect()
    })
}
