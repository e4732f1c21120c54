// THEORY:
// `ParallelHarness` is the in-process driver: split the manifest once, then run
// one worker per partition file. Every worker gets its own analyzer instance and
// its own blocking task, shares nothing with its siblings and may finish in any
// order. Results come back indexed by partition so the caller can line them up
// with the plan.
//
// There is no work stealing and no rebalancing. A partition is assigned exactly
// once, when the plan is made. A worker that fails (or panics) only loses its own
// partition; the others still report.

use std::path::PathBuf;

use futures::future::join_all;
use tracing::{error, info};

use crate::core_modules::partitioner::{DEFAULT_STEM, PartitionPlan, Partitioner};
use crate::error::{Error, Result};
use crate::harness::{run_partition, Analyzer, PartitionReport};

/// Settings for one harness run.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Manifest listing every test case.
    pub manifest: PathBuf,
    /// Existing directory that receives the partition files.
    pub output_dir: PathBuf,
    /// Requested number of workers. The realized count may be lower.
    pub parallelism: usize,
    /// Partition files are named `<stem>.<index>`.
    pub stem: String,
    /// Base directory for relative image paths in the manifest.
    pub image_root: Option<PathBuf>,
}

impl HarnessConfig {
    /// Defaults to one worker per logical CPU.
    pub fn new(manifest: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            manifest: manifest.into(),
            output_dir: output_dir.into(),
            parallelism: num_cpus::get(),
            stem: DEFAULT_STEM.to_string(),
            image_root: None,
        }
    }

    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism;
        self
    }

    pub fn with_stem(mut self, stem: impl Into<String>) -> Self {
        self.stem = stem.into();
        self
    }

    pub fn with_image_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.image_root = Some(root.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.parallelism == 0 {
            return Err(Error::Configuration(
                "parallelism must be at least 1".to_string(),
            ));
        }
        if self.stem.is_empty() || self.stem.contains(std::path::is_separator) {
            return Err(Error::Configuration(format!(
                "invalid partition file stem {:?}",
                self.stem
            )));
        }
        Ok(())
    }
}

pub struct ParallelHarness {
    config: HarnessConfig,
    partitioner: Partitioner,
}

impl ParallelHarness {
    pub fn new(config: HarnessConfig) -> Result<Self> {
        config.validate()?;
        let partitioner = Partitioner::new(config.output_dir.clone()).with_stem(config.stem.clone());
        Ok(Self {
            config,
            partitioner,
        })
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Writes the partition files without running anything.
    pub async fn split(&self) -> Result<PartitionPlan> {
        let partitioner = self.partitioner.clone();
        let manifest = self.config.manifest.clone();
        let parallelism = self.config.parallelism;

        tokio::task::spawn_blocking(move || partitioner.split(manifest, parallelism))
            .await
            .map_err(|e| Error::Worker {
                partition: None,
                reason: e.to_string(),
            })?
    }

    /// Splits the manifest and runs one worker per partition.
    ///
    /// `make_analyzer` is called once per partition with its index. The outer
    /// error covers the split; each worker's own outcome is reported separately.
    pub async fn run<A, F>(&self, make_analyzer: F) -> Result<Vec<Result<PartitionReport>>>
    where
        A: Analyzer + Send + 'static,
        F: Fn(usize) -> A,
    {
        let plan = self.split().await?;
        if plan.files.is_empty() {
            info!(manifest = %self.config.manifest.display(), "manifest is empty, nothing to run");
            return Ok(Vec::new());
        }

        let workers = plan.files.into_iter().enumerate().map(|(index, path)| {
            let mut analyzer = make_analyzer(index);
            let image_root = self.config.image_root.clone();
            tokio::task::spawn_blocking(move || {
                run_partition(index, &path, image_root.as_deref(), &mut analyzer)
            })
        });

        let results = join_all(workers)
            .await
            .into_iter()
            .enumerate()
            .map(|(index, joined)| {
                let result = joined.map_err(|e| Error::Worker {
                    partition: Some(index),
                    reason: e.to_string(),
                })?;
                if let Err(err) = &result {
                    error!(partition = index, error = %err, "worker failed");
                }
                result
            })
            .collect::<Vec<_>>();

        info!(workers = results.len(), "all workers finished");
        Ok(results)
    }
}
