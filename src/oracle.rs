//! Classification agreement oracle
//!
//! The agreement computation (clustering the samples at each k and scoring
//! agreement with the SNP-based classification) lives outside this crate.
//! Workers only see the [`AgreementOracle`] trait; the production
//! implementation runs an external program once per work item.

use crate::cache::parse_result_line;
use crate::coordinate::SweepCoordinate;
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Oracle output: best agreement and the parameter that achieved it
#[derive(Debug, Clone, PartialEq)]
pub struct Agreement {
    pub value: f64,
    pub label: String,
}

/// One unit of uncached work, owned by exactly one worker
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub coordinate: SweepCoordinate,
    /// Distance matrix or PCoA coordinates for this coordinate
    pub artifact: PathBuf,
    /// Directory the oracle writes its result file into
    pub output_dir: PathBuf,
    /// Shared cache of upstream intermediates
    pub cache_dir: PathBuf,
}

/// Expensive, opaque agreement computation
pub trait AgreementOracle: Send + Sync {
    /// Human-readable name for logs
    fn name(&self) -> &str;

    fn compute(&self, item: &WorkItem) -> Result<Agreement>;
}

/// Runs an external program per work item.
///
/// The program receives the work item as flags and must print a single
/// `value,label` line on stdout. Running it as a child process keeps its own
/// thread fan-out out of this process.
#[derive(Debug, Clone)]
pub struct CommandOracle {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandOracle {
    pub fn new<P: AsRef<Path>>(program: P, args: Vec<String>) -> Self {
        CommandOracle {
            program: program.as_ref().to_path_buf(),
            args,
        }
    }

    fn command(&self, item: &WorkItem) -> Command {
        let coord = &item.coordinate;
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg("--distance-method")
            .arg(coord.distance_method.as_str())
            .arg("--artifact")
            .arg(&item.artifact)
            .arg("--island")
            .arg(coord.island_label())
            .arg("--genus")
            .arg(&coord.genus)
            .arg("--threshold")
            .arg(coord.samples_at_least_threshold.as_str())
            .arg("--cutoff")
            .arg(coord.most_abund_seq_cutoff.as_str())
            .arg("--cache-dir")
            .arg(&item.cache_dir)
            .arg("--output-dir")
            .arg(&item.output_dir);
        cmd
    }
}

impl AgreementOracle for CommandOracle {
    fn name(&self) -> &str {
        self.program.to_str().unwrap_or("agreement oracle")
    }

    fn compute(&self, item: &WorkItem) -> Result<Agreement> {
        let output = self
            .command(item)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .with_context(|| format!("Failed to run agreement oracle: {}", self.program.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: Vec<&str> = stderr.lines().rev().take(5).collect();
            bail!(
                "Agreement oracle exited with {} for {}: {}",
                output.status,
                item.coordinate,
                tail.into_iter().rev().collect::<Vec<_>>().join(" | ")
            );
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let line = stdout
            .lines()
            .rev()
            .find(|l| !l.trim().is_empty())
            .with_context(|| format!("Agreement oracle printed nothing for {}", item.coordinate))?;
        let (value, label) = parse_result_line(line)
            .with_context(|| format!("Unreadable oracle output for {}", item.coordinate))?;

        Ok(Agreement { value, label })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinate::DistanceMethod;

    fn item() -> WorkItem {
        let coordinate = SweepCoordinate::new("Porites", DistanceMethod::Unifrac)
            .with_island(Some("I04".to_string()));
        WorkItem {
            artifact: PathBuf::from("/tmp").join(coordinate.distance_artifact_name()),
            coordinate,
            output_dir: PathBuf::from("/tmp/out"),
            cache_dir: PathBuf::from("/tmp/cache"),
        }
    }

    #[test]
    fn test_command_flags() {
        let oracle = CommandOracle::new("agree", vec!["--fast".to_string()]);
        let cmd = oracle.command(&item());
        let args: Vec<String> = cmd
            .get_args()
            .map(|a| a.to_string_lossy().to_string())
            .collect();
        assert_eq!(args[0], "--fast");
        let island = args.iter().position(|a| a == "--island").unwrap();
        assert_eq!(args[island + 1], "I04");
        let method = args.iter().position(|a| a == "--distance-method").unwrap();
        assert_eq!(args[method + 1], "unifrac");
    }

    #[cfg(unix)]
    #[test]
    fn test_command_oracle_reads_last_line() {
        let oracle = CommandOracle::new(
            "sh",
            vec!["-c".to_string(), "echo progress; echo 0.42,5".to_string(), "oracle".to_string()],
        );
        let agreement = oracle.compute(&item()).unwrap();
        assert_eq!(agreement.value, 0.42);
        assert_eq!(agreement.label, "5");
    }

    #[cfg(unix)]
    #[test]
    fn test_command_oracle_failure_is_error() {
        let oracle = CommandOracle::new(
            "sh",
            vec!["-c".to_string(), "echo boom >&2; exit 3".to_string(), "oracle".to_string()],
        );
        let err = oracle.compute(&item()).unwrap_err();
        assert!(err.to_string().contains("boom"));
    }
}
