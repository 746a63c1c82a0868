//! Result cache probe
//!
//! Classification agreement results are written by the agreement oracle into
//! the results directory, one file per sweep coordinate. This module only
//! reads them: a missing file is a normal cache miss, a malformed one is fatal.

use crate::coordinate::{ResultKind, SweepCoordinate};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One observation for the grid: metric at (x, y) plus the label of the
/// parameter that maximised it (e.g. the best k)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub metric: f64,
    /// Samples-at-least threshold
    pub x: f64,
    /// Most-abundant-sequence cutoff
    pub y: f64,
    pub label: String,
}

impl ResultRecord {
    /// Place a metric at the coordinate's threshold/cutoff position
    pub fn for_coordinate(coordinate: &SweepCoordinate, metric: f64, label: String) -> Self {
        ResultRecord {
            metric,
            x: coordinate.samples_at_least_threshold.value(),
            y: coordinate.most_abund_seq_cutoff.value(),
            label,
        }
    }
}

/// Read-only view of the classification result cache
#[derive(Debug, Clone)]
pub struct ResultCache {
    dir: PathBuf,
}

impl ResultCache {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        ResultCache {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the cache slot for a coordinate
    pub fn slot_path(&self, coordinate: &SweepCoordinate) -> PathBuf {
        self.dir
            .join(coordinate.result_file_name(ResultKind::Classification))
    }

    /// Look up a cached result. `Ok(None)` means the slot is empty.
    pub fn probe(&self, coordinate: &SweepCoordinate) -> Result<Option<ResultRecord>> {
        let path = self.slot_path(coordinate);
        if !path.is_file() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read cached result: {}", path.display()))?;
        let (metric, label) = parse_result_line(&content)
            .with_context(|| format!("Malformed cached result: {}", path.display()))?;

        log::debug!("Cache hit: {} = {} ({})", coordinate, metric, label);
        Ok(Some(ResultRecord::for_coordinate(coordinate, metric, label)))
    }
}

/// Parse a single `value,label` line (a tab is accepted in place of the comma)
pub fn parse_result_line(content: &str) -> Result<(f64, String)> {
    let line = content.trim();
    if line.is_empty() {
        bail!("Empty result");
    }
    if line.lines().count() > 1 {
        bail!("Expected a single line, found {}", line.lines().count());
    }

    let delimiter = if line.contains(',') { ',' } else { '\t' };
    let parts: Vec<&str> = line.split(delimiter).map(str::trim).collect();
    if parts.len() != 2 {
        bail!("Expected 2 fields, found {}: '{}'", parts.len(), line);
    }

    let metric: f64 = parts[0]
        .parse()
        .with_context(|| format!("Invalid metric value: '{}'", parts[0]))?;
    if parts[1].is_empty() {
        bail!("Missing label in '{}'", line);
    }
    Ok((metric, parts[1].to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinate::{DistanceMethod, SweepValue};

    fn coordinate(threshold: &str, cutoff: u32) -> SweepCoordinate {
        SweepCoordinate::new("Porites", DistanceMethod::BrayCurtis)
            .with_threshold(threshold.parse().unwrap())
            .with_cutoff(SweepValue::from(cutoff))
            .with_island(Some("I01".to_string()))
    }

    #[test]
    fn test_parse_result_line() {
        assert_eq!(parse_result_line("0.83,4\n").unwrap(), (0.83, "4".to_string()));
        assert_eq!(parse_result_line("0.5\t2").unwrap(), (0.5, "2".to_string()));
        assert!(parse_result_line("").is_err());
        assert!(parse_result_line("0.5").is_err());
        assert!(parse_result_line("abc,3").is_err());
        assert!(parse_result_line("0.5,3,extra").is_err());
        assert!(parse_result_line("0.5,3\n0.6,4").is_err());
    }

    #[test]
    fn test_probe_miss_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResultCache::new(dir.path());
        assert!(cache.probe(&coordinate("0.2", 1)).unwrap().is_none());
    }

    #[test]
    fn test_probe_hit() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResultCache::new(dir.path());
        let coord = coordinate("0.2", 1);
        std::fs::write(cache.slot_path(&coord), "0.75,5\n").unwrap();

        let record = cache.probe(&coord).unwrap().unwrap();
        assert_eq!(record.metric, 0.75);
        assert_eq!(record.x, 0.2);
        assert_eq!(record.y, 1.0);
        assert_eq!(record.label, "5");
    }

    #[test]
    fn test_probe_malformed_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResultCache::new(dir.path());
        let coord = coordinate("0.2", 1);
        std::fs::write(cache.slot_path(&coord), "not a result").unwrap();
        assert!(cache.probe(&coord).is_err());
    }
}
