// THEORY:
// The `harness` module is what one worker does with one partition. It is the
// only place where the two halves of the crate meet:
//
// 1.  Read the partition file line by line.
// 2.  Tokenize each line into a `TestCase` (id, image path, extra fields).
// 3.  Decode the referenced image with the PPM decoder.
// 4.  Hand the decoded `Image` to the algorithm under test through `Analyzer`.
//
// A failing test case is recorded with its status and the worker moves on; the
// failure is never turned into a success. Failing to read the partition file
// itself is fatal for the worker and is returned as an error.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::core_modules::ppm;
use crate::core_modules::raster::Image;
use crate::core_modules::status::{ReturnCode, ReturnStatus};
use crate::core_modules::tokenizer::split;
use crate::error::{Error, Result};

/// One manifest line, broken into fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub id: String,
    pub image_path: PathBuf,
    /// Any fields after the image path, untouched.
    pub extra: Vec<String>,
}

impl TestCase {
    /// Parses a space-separated manifest line. A single-field line names both
    /// the case and its image.
    pub fn parse(line: &str) -> Self {
        let mut fields = split(line.trim_end_matches(['\r', '\n']), ' ').into_iter();
        let id = fields.next().unwrap_or_default();
        let image_path = PathBuf::from(fields.next().unwrap_or_else(|| id.clone()));
        Self {
            id,
            image_path,
            extra: fields.collect(),
        }
    }

    /// Resolves the image path against `base` when it is relative.
    pub fn resolve_image(&self, base: Option<&Path>) -> PathBuf {
        match base {
            Some(base) if self.image_path.is_relative() => base.join(&self.image_path),
            _ => self.image_path.clone(),
        }
    }
}

/// The algorithm under test, called once per decoded test case.
pub trait Analyzer {
    fn analyze(&mut self, case: &TestCase, image: &Image) -> ReturnStatus;
}

impl<F> Analyzer for F
where
    F: FnMut(&TestCase, &Image) -> ReturnStatus,
{
    fn analyze(&mut self, case: &TestCase, image: &Image) -> ReturnStatus {
        self(case, image)
    }
}

/// Analyzer that only confirms the image decoded into a usable raster.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecodeCheck;

impl Analyzer for DecodeCheck {
    fn analyze(&mut self, _case: &TestCase, image: &Image) -> ReturnStatus {
        if image.size() == 0 {
            return ReturnStatus::new(ReturnCode::RefuseInput, "image has no pixels");
        }
        ReturnStatus::success()
    }
}

/// What happened to one test case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseOutcome {
    pub id: String,
    pub status: ReturnStatus,
}

/// Per-partition tally returned by a worker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionReport {
    pub partition: usize,
    pub outcomes: Vec<CaseOutcome>,
}

impl PartitionReport {
    pub fn cases(&self) -> usize {
        self.outcomes.len()
    }

    pub fn failures(&self) -> impl Iterator<Item = &CaseOutcome> {
        self.outcomes.iter().filter(|o| !o.status.is_success())
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }
}

/// Runs `analyzer` over every line of one partition file.
///
/// Relative image paths are resolved against `image_root` when given.
pub fn run_partition<A: Analyzer + ?Sized>(
    partition: usize,
    path: &Path,
    image_root: Option<&Path>,
    analyzer: &mut A,
) -> Result<PartitionReport> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let mut reader = BufReader::new(file);
    let mut report = PartitionReport {
        partition,
        outcomes: Vec::new(),
    };

    // Manifest lines are opaque bytes; a stray non-UTF-8 byte costs one case, not the partition.
    let mut raw = Vec::new();
    loop {
        raw.clear();
        let read = reader
            .read_until(b'\n', &mut raw)
            .map_err(|e| Error::io(path, e))?;
        if read == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&raw);
        if line.trim().is_empty() {
            continue;
        }

        let case = TestCase::parse(&line);
        let status = match ppm::decode(case.resolve_image(image_root)) {
            Ok(image) => analyzer.analyze(&case, &image),
            Err(err) => ReturnStatus::from(&err),
        };

        if status.is_success() {
            debug!(partition, case = %case.id, "case passed");
        } else {
            warn!(partition, case = %case.id, status = %status, "case failed");
        }
        report.outcomes.push(CaseOutcome {
            id: case.id,
            status,
        });
    }

    Ok(report)
}
