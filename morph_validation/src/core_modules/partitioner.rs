// THEORY:
// The `partitioner` decides how a manifest of test cases is divided between
// workers. It is a static split: each partition is assigned once, up front, and
// nothing is rebalanced afterwards.
//
// Key architectural principles:
// 1.  **Contiguity**: every partition is a run of consecutive manifest lines.
//     Concatenating the partition files in the returned order reproduces the
//     manifest, with no line duplicated or dropped.
// 2.  **Balance**: partitions hold `ceil(N / P)` lines each, except the last,
//     which takes the remainder.
// 3.  **No empty partitions**: the requested parallelism is clamped to the line
//     count, and the partition count is then re-derived from the per-partition
//     size. Both roundings are ceilings, and the second one can come out smaller
//     than the request (10 lines over 6 workers is 2 lines each, so 5
//     partitions). Re-deriving it keeps every partition non-empty.
// 4.  **Scoped files**: the manifest is opened once and rewound for the second
//     pass; each partition file is opened, filled and flushed before the next one
//     is created.
//
// The arithmetic lives in `PartitionLayout` so it can be exercised without
// touching the filesystem.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Seek, Write};
use std::ops::Range;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Error, Result};

/// File stem used for partition files unless overridden.
pub const DEFAULT_STEM: &str = "input.txt";

/// How `total_lines` are spread over partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionLayout {
    /// Number of lines in the manifest.
    pub total_lines: usize,
    /// Lines assigned to every partition but the last.
    pub lines_per_partition: usize,
    /// Number of partitions actually produced.
    pub parallelism: usize,
}

impl PartitionLayout {
    /// Lays out `total_lines` over at most `requested` partitions.
    pub fn new(total_lines: usize, requested: usize) -> Result<Self> {
        check_requested(requested)?;
        if total_lines == 0 {
            return Ok(Self {
                total_lines,
                lines_per_partition: 0,
                parallelism: 0,
            });
        }

        let clamped = requested.min(total_lines);
        let lines_per_partition = total_lines.div_ceil(clamped);
        let parallelism = total_lines.div_ceil(lines_per_partition);

        Ok(Self {
            total_lines,
            lines_per_partition,
            parallelism,
        })
    }

    /// The manifest line indices held by partition `index`.
    pub fn range(&self, index: usize) -> Range<usize> {
        let start = index
            .saturating_mul(self.lines_per_partition)
            .min(self.total_lines);
        let end = start
            .saturating_add(self.lines_per_partition)
            .min(self.total_lines);
        start..end
    }

    /// Line count of every partition, in order.
    pub fn sizes(&self) -> Vec<usize> {
        (0..self.parallelism).map(|i| self.range(i).len()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.parallelism == 0
    }
}

fn check_requested(requested: usize) -> Result<()> {
    if requested == 0 {
        return Err(Error::Configuration(
            "requested parallelism must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// Convenience wrapper around [`PartitionLayout::new`].
pub fn layout(total_lines: usize, requested: usize) -> Result<PartitionLayout> {
    PartitionLayout::new(total_lines, requested)
}

/// The outcome of splitting a manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionPlan {
    pub layout: PartitionLayout,
    /// Partition files in manifest order.
    pub files: Vec<PathBuf>,
}

impl PartitionPlan {
    /// Realized parallelism, i.e. the number of partition files.
    pub fn parallelism(&self) -> usize {
        self.files.len()
    }
}

/// Splits manifests into `<stem>.<index>` files inside an existing directory.
#[derive(Debug, Clone)]
pub struct Partitioner {
    output_dir: PathBuf,
    stem: String,
}

impl Partitioner {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            stem: DEFAULT_STEM.to_string(),
        }
    }

    pub fn with_stem(mut self, stem: impl Into<String>) -> Self {
        self.stem = stem.into();
        self
    }

    /// Path of partition file `index`.
    pub fn partition_path(&self, index: usize) -> PathBuf {
        self.output_dir.join(format!("{}.{}", self.stem, index))
    }

    /// Splits `manifest` into at most `requested` partition files.
    ///
    /// Files already written are left in place if a later one fails; callers
    /// re-running a split should start from an empty output directory.
    pub fn split(&self, manifest: impl AsRef<Path>, requested: usize) -> Result<PartitionPlan> {
        let manifest = manifest.as_ref();
        // Reject before the manifest is opened; the layout only exists after the count pass.
        check_requested(requested)?;

        let file = File::open(manifest).map_err(|e| Error::io(manifest, e))?;
        let mut reader = BufReader::new(file);

        let total_lines = count_lines(&mut reader).map_err(|e| Error::io(manifest, e))?;
        let layout = PartitionLayout::new(total_lines, requested)?;
        debug!(
            manifest = %manifest.display(),
            total_lines,
            requested,
            lines_per_partition = layout.lines_per_partition,
            parallelism = layout.parallelism,
            "computed partition layout"
        );

        reader.rewind().map_err(|e| Error::io(manifest, e))?;

        let mut files = Vec::with_capacity(layout.parallelism);
        let mut line = Vec::new();
        for index in 0..layout.parallelism {
            let path = self.partition_path(index);
            let output = File::create(&path).map_err(|e| Error::io(&path, e))?;
            let mut writer = BufWriter::new(output);

            let mut written = 0;
            while written < layout.lines_per_partition {
                line.clear();
                let read = reader
                    .read_until(b'\n', &mut line)
                    .map_err(|e| Error::io(manifest, e))?;
                if read == 0 {
                    break;
                }
                if line.last() != Some(&b'\n') {
                    line.push(b'\n');
                }
                writer.write_all(&line).map_err(|e| Error::io(&path, e))?;
                written += 1;
            }
            writer.flush().map_err(|e| Error::io(&path, e))?;

            debug!(partition = index, lines = written, path = %path.display(), "wrote partition");
            files.push(path);
        }

        info!(
            manifest = %manifest.display(),
            lines = total_lines,
            partitions = files.len(),
            "split manifest"
        );
        Ok(PartitionPlan { layout, files })
    }
}

/// Splits `manifest` into `input.txt.<index>` files under `output_dir`.
pub fn partition(
    manifest: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    requested: usize,
) -> Result<PartitionPlan> {
    Partitioner::new(output_dir.as_ref()).split(manifest, requested)
}

/// Counts lines with a full scan. A final line without a terminator still counts.
fn count_lines<R: BufRead>(reader: &mut R) -> std::io::Result<usize> {
    let mut lines = 0;
    let mut last = None;
    loop {
        let buf = match reader.fill_buf() {
            Ok(buf) => buf,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        if buf.is_empty() {
            break;
        }
        lines += buf.iter().filter(|&&b| b == b'\n').count();
        last = buf.last().copied();
        let len = buf.len();
        reader.consume(len);
    }
    if matches!(last, Some(byte) if byte != b'\n') {
        lines += 1;
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn seven_lines_over_three_workers() {
        let layout = PartitionLayout::new(7, 3).expect("valid request");
        assert_eq!(layout.lines_per_partition, 3);
        assert_eq!(layout.parallelism, 3);
        assert_eq!(layout.sizes(), vec![3, 3, 1]);
    }

    #[test]
    fn request_above_line_count_gives_one_line_each() {
        let layout = PartitionLayout::new(4, 16).expect("valid request");
        assert_eq!(layout.parallelism, 4);
        assert_eq!(layout.sizes(), vec![1, 1, 1, 1]);
    }

    #[test]
    fn second_rounding_drops_would_be_empty_partition() {
        // ceil(10 / 6) = 2 lines each, which only needs 5 partitions.
        let layout = PartitionLayout::new(10, 6).expect("valid request");
        assert_eq!(layout.parallelism, 5);
        assert_eq!(layout.sizes(), vec![2, 2, 2, 2, 2]);
    }

    #[test]
    fn empty_manifest_has_no_partitions() {
        let layout = PartitionLayout::new(0, 4).expect("valid request");
        assert!(layout.is_empty());
        assert!(layout.sizes().is_empty());
    }

    #[test]
    fn zero_parallelism_is_a_configuration_error() {
        assert!(matches!(
            PartitionLayout::new(5, 0),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn ranges_tile_the_manifest() {
        let layout = layout(11, 4).expect("valid request");
        let ranges: Vec<_> = (0..layout.parallelism).map(|i| layout.range(i)).collect();
        assert_eq!(ranges, vec![0..3, 3..6, 6..9, 9..11]);
    }

    #[test]
    fn out_of_range_index_is_an_empty_range() {
        let layout = layout(7, 3).expect("valid request");
        assert!(layout.range(3).is_empty());
        assert_eq!(layout.range(usize::MAX), 7..7);
    }

    #[test]
    fn counts_unterminated_final_line() {
        assert_eq!(count_lines(&mut Cursor::new(b"a\nb\nc".to_vec())).unwrap(), 3);
        assert_eq!(count_lines(&mut Cursor::new(b"a\nb\nc\n".to_vec())).unwrap(), 3);
        assert_eq!(count_lines(&mut Cursor::new(Vec::new())).unwrap(), 0);
        assert_eq!(count_lines(&mut Cursor::new(b"\n\n".to_vec())).unwrap(), 2);
    }

    #[test]
    fn partition_files_are_index_suffixed() {
        let partitioner = Partitioner::new("/tmp/out").with_stem("cases.lst");
        assert_eq!(
            partitioner.partition_path(3),
            PathBuf::from("/tmp/out/cases.lst.3")
        );
        assert_eq!(
            Partitioner::new("/tmp/out").partition_path(0),
            PathBuf::from("/tmp/out/input.txt.0")
        );
    }
}
